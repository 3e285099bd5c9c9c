use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};
use stage_forge::dsl;
use stage_forge::linker::{LinkedProgram, PassKind};
use tracing_subscriber::EnvFilter;

#[derive(Debug, Default, Clone)]
struct Cli {
    program_json: Option<PathBuf>,
    output_dir: Option<PathBuf>,
    annotate: bool,
}

fn parse_cli(args: &[String]) -> Result<Cli> {
    let mut cli = Cli::default();
    let mut i = 0;
    while i < args.len() {
        match args[i].as_str() {
            "--program-json" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --program-json"));
                };
                cli.program_json = Some(PathBuf::from(v));
                i += 2;
            }
            "--outputdir" | "--output-dir" => {
                let Some(v) = args.get(i + 1) else {
                    return Err(anyhow!("missing value for --output-dir"));
                };
                cli.output_dir = Some(PathBuf::from(v));
                i += 2;
            }
            "--annotate" => {
                cli.annotate = true;
                i += 1;
            }
            other => {
                return Err(anyhow!(
                    "unknown argument: {other} \
                     (supported: --program-json <file>, --output-dir <dir>, --annotate)"
                ));
            }
        }
    }
    Ok(cli)
}

fn pass_text(linked: &LinkedProgram, kind: PassKind, annotate: bool) -> String {
    if annotate {
        linked.annotated_source(kind)
    } else {
        linked.source(kind).to_string()
    }
}

fn write_outputs(linked: &LinkedProgram, output_dir: &Path, annotate: bool) -> Result<()> {
    std::fs::create_dir_all(output_dir)
        .with_context(|| format!("failed to create {}", output_dir.display()))?;

    let report = serde_json::to_string_pretty(&linked.report())?;
    let files = [
        (format!("{}.vert", linked.name), pass_text(linked, PassKind::Vertex, annotate)),
        (format!("{}.frag", linked.name), pass_text(linked, PassKind::Fragment, annotate)),
        (format!("{}.link.json", linked.name), report),
    ];
    for (file_name, text) in files {
        let path = output_dir.join(file_name);
        std::fs::write(&path, text)
            .with_context(|| format!("failed to write {}", path.display()))?;
        println!("[stage-forge] wrote: {}", path.display());
    }
    Ok(())
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let argv: Vec<String> = std::env::args().skip(1).collect();
    let cli = parse_cli(&argv)?;

    let program_json = cli
        .program_json
        .ok_or_else(|| anyhow!("--program-json <program.json> is required"))?;
    let desc = dsl::load_program_from_path(&program_json)?;
    let linked = desc.link()?;

    match cli.output_dir {
        Some(dir) => write_outputs(&linked, &dir, cli.annotate)?,
        None => {
            println!("// {}.vert", linked.name);
            print!("{}", pass_text(&linked, PassKind::Vertex, cli.annotate));
            println!("\n// {}.frag", linked.name);
            print!("{}", pass_text(&linked, PassKind::Fragment, cli.annotate));
            println!("\n{}", serde_json::to_string_pretty(&linked.report())?);
        }
    }
    Ok(())
}
