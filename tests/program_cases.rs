use std::path::{Path, PathBuf};

use serde::Deserialize;
use stage_forge::dsl;

#[derive(Debug, Default, Deserialize)]
#[serde(default)]
struct Expect {
    error: Option<String>,
    varyings: Vec<String>,
    uniforms: Vec<String>,
    texture_bindings: Vec<String>,
    vertex_contains: Vec<String>,
    fragment_contains: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct CaseFile {
    #[serde(default)]
    expect: Expect,
}

fn case_dir() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR"))
        .join("tests")
        .join("cases")
}

fn list_json_cases(dir: &Path) -> Vec<PathBuf> {
    let mut cases = Vec::new();
    let Ok(rd) = std::fs::read_dir(dir) else {
        return cases;
    };
    for entry in rd.flatten() {
        let path = entry.path();
        if path
            .extension()
            .and_then(|s| s.to_str())
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
        {
            cases.push(path);
        }
    }
    cases.sort_by(|a, b| a.file_name().cmp(&b.file_name()));
    cases
}

fn check_case(path: &Path) {
    let case_name = path.file_stem().and_then(|s| s.to_str()).unwrap_or("case");
    let text = std::fs::read_to_string(path)
        .unwrap_or_else(|e| panic!("[{case_name}] failed to read case: {e}"));
    let case: CaseFile = serde_json::from_str(&text)
        .unwrap_or_else(|e| panic!("[{case_name}] invalid expectations: {e}"));
    let desc = dsl::parse_program_json(&text)
        .unwrap_or_else(|e| panic!("[{case_name}] invalid program: {e:#}"));
    let expect = case.expect;

    let result = desc.link();
    if let Some(expected_error) = expect.error.as_deref() {
        match result {
            Ok(_) => panic!("[{case_name}] expected link error `{expected_error}`"),
            Err(e) => {
                let message = format!("{e:#}");
                assert!(
                    message.contains(expected_error),
                    "[{case_name}] error `{message}` does not mention `{expected_error}`"
                );
            }
        }
        return;
    }

    let linked = result.unwrap_or_else(|e| panic!("[{case_name}] link failed: {e:#}"));
    assert_eq!(linked.varyings.names(), expect.varyings, "[{case_name}] varyings");
    assert_eq!(linked.uniforms.names(), expect.uniforms, "[{case_name}] uniforms");
    assert_eq!(
        linked.texture_bindings, expect.texture_bindings,
        "[{case_name}] texture bindings"
    );
    for needle in &expect.vertex_contains {
        assert!(
            linked.vertex_source.contains(needle.as_str()),
            "[{case_name}] vertex source lacks `{needle}`:\n{}",
            linked.vertex_source
        );
    }
    for needle in &expect.fragment_contains {
        assert!(
            linked.fragment_source.contains(needle.as_str()),
            "[{case_name}] fragment source lacks `{needle}`:\n{}",
            linked.fragment_source
        );
    }

    let relinked = desc
        .link()
        .unwrap_or_else(|e| panic!("[{case_name}] second link failed: {e:#}"));
    assert_eq!(
        relinked.vertex_source, linked.vertex_source,
        "[{case_name}] unstable vertex source"
    );
    assert_eq!(
        relinked.fragment_source, linked.fragment_source,
        "[{case_name}] unstable fragment source"
    );
}

#[test]
fn json_program_cases() {
    let cases = list_json_cases(&case_dir());
    assert!(!cases.is_empty(), "no cases under {}", case_dir().display());
    for path in cases {
        check_case(&path);
    }
}

#[test]
fn load_program_reports_path_on_missing_file() {
    let err = dsl::load_program_from_path(case_dir().join("does_not_exist.json")).unwrap_err();
    assert!(format!("{err:#}").contains("does_not_exist.json"));
}
