//! Cross-stage variable resolution.
//!
//! Resolution is a pure forward walk over the stages of one pass. It decides,
//! for every value a stage reads, whether it is a built-in, a vertex attribute,
//! a value imported from the predecessor pass, a value produced by an earlier
//! stage, or a uniform supplied from outside the program. Emission only reads
//! the resulting [`Linkage`].

use std::collections::HashSet;

use tracing::trace;

use crate::error::Result;
use super::stage::Stage;
use super::types::PassKind;
use super::variable::VariableSet;

/// How a value read inside a pass is supplied.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Classification {
    Builtin,
    Attribute,
    Imported,
    Uniform,
    Produced,
}

/// Classification sets of one resolved pass.
#[derive(Clone, Debug)]
pub struct Linkage {
    pub kind: PassKind,
    /// Vertex attributes declared by the stages of this pass.
    pub attributes: VariableSet,
    /// Values with no producer anywhere in the program.
    pub uniforms: VariableSet,
    /// Values taken from the predecessor pass. For the vertex pass these are
    /// attributes pulled from the vertex stream only to be forwarded.
    pub imported: VariableSet,
    /// Values the successor pass imports from this one.
    pub exported: VariableSet,
    /// Values written by some stage of this pass (built-ins excluded).
    pub produced: VariableSet,
    pub builtins: VariableSet,
}

impl Linkage {
    /// How a value read in this pass is supplied, or `None` if nothing in the
    /// pass touches it.
    pub fn classify(&self, name: &str) -> Option<Classification> {
        if self.builtins.contains(name) {
            Some(Classification::Builtin)
        } else if self.attributes.contains(name) {
            Some(Classification::Attribute)
        } else if self.imported.contains(name) {
            Some(Classification::Imported)
        } else if self.uniforms.contains(name) {
            Some(Classification::Uniform)
        } else if self.produced.contains(name) {
            Some(Classification::Produced)
        } else {
            None
        }
    }

    /// Values a successor pass may import from this pass.
    ///
    /// Uniforms are excluded: a uniform read by both passes stays a single
    /// program-wide uniform instead of becoming a varying.
    pub fn successor_view(&self) -> Result<VariableSet> {
        let mut view = VariableSet::new();
        for var in self
            .attributes
            .iter()
            .chain(self.imported.iter())
            .chain(self.produced.iter())
        {
            if var.ty.is_varying_compatible() {
                view.insert(var)?;
            }
        }
        Ok(view)
    }

    /// Names already available when `main()` starts: nothing in this set
    /// needs a local declaration.
    pub fn defined_at_entry(&self) -> HashSet<String> {
        self.builtins
            .iter()
            .chain(self.attributes.iter())
            .chain(self.uniforms.iter())
            .chain(self.imported.iter())
            .map(|v| v.name.clone())
            .collect()
    }
}

/// Resolve one pass.
///
/// * `builtins` – explicitly defined values (e.g. `gl_Position`).
/// * `predecessor` – what the previous pass offers (its successor view).
/// * `forwarded` – vertex pass only: attributes the successor asked for that
///   no vertex stage declares or produces.
pub fn resolve_pass(
    kind: PassKind,
    stages: &[Stage],
    builtins: &VariableSet,
    predecessor: Option<&VariableSet>,
    forwarded: &VariableSet,
) -> Result<Linkage> {
    let mut attributes = VariableSet::new();
    if kind == PassKind::Vertex {
        for stage in stages {
            for var in stage.parameters.iter().filter(|v| v.is_attribute) {
                attributes.insert(var)?;
            }
        }
    }

    let mut defined = builtins.clone();
    defined.extend_from(&attributes)?;

    let mut imported = VariableSet::new();
    if kind == PassKind::Vertex {
        let written: HashSet<&str> = stages
            .iter()
            .flat_map(|s| s.writes())
            .map(|v| v.name.as_str())
            .collect();
        for var in forwarded {
            if defined.contains(&var.name) || written.contains(var.name.as_str()) {
                continue;
            }
            imported.insert(var)?;
            defined.insert(var)?;
        }
    }

    let mut available = VariableSet::new();
    if let Some(predecessor) = predecessor {
        for var in predecessor {
            if !defined.contains(&var.name) {
                available.insert(var)?;
            }
        }
    }

    let mut uniforms = VariableSet::new();
    let mut produced = VariableSet::new();

    for stage in stages {
        for var in stage.reads() {
            if kind == PassKind::Vertex && var.is_attribute {
                continue;
            }
            if let Some(existing) = defined.get(&var.name) {
                if existing.conflicts_with(var) {
                    return Err(existing.conflict_error(var));
                }
                continue;
            }
            if let Some(offered) = available.get(&var.name) {
                if offered.conflicts_with(var) {
                    return Err(offered.conflict_error(var));
                }
                trace!(pass = kind.label(), stage = %stage.name, name = %var.name, "import");
                imported.insert(offered)?;
                continue;
            }
            trace!(pass = kind.label(), stage = %stage.name, name = %var.name, "uniform");
            uniforms.insert(var)?;
            defined.insert(var)?;
        }

        for var in stage.writes() {
            defined.insert(var)?;
            if !builtins.contains(&var.name) {
                produced.insert(var)?;
            }
            // A local write shadows whatever the predecessor offers.
            available.remove(&var.name);
        }
    }

    Ok(Linkage {
        kind,
        attributes,
        uniforms,
        imported,
        exported: VariableSet::new(),
        produced,
        builtins: builtins.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::LinkError;
    use crate::linker::types::GlslType;
    use crate::linker::variable::Variable;

    fn no_builtins() -> VariableSet {
        VariableSet::new()
    }

    #[test]
    fn test_chain_produces_no_uniforms_or_imports() {
        let stages = vec![
            Stage::new("a", vec![Variable::output(GlslType::Float, "x")], "x = 1.0;"),
            Stage::new(
                "b",
                vec![
                    Variable::input(GlslType::Float, "x"),
                    Variable::output(GlslType::Float, "y"),
                ],
                "y = x * 2.0;",
            ),
            Stage::new(
                "c",
                vec![
                    Variable::input(GlslType::Float, "y"),
                    Variable::output(GlslType::Float, "z"),
                ],
                "z = y;",
            ),
        ];
        let linkage = resolve_pass(
            PassKind::Fragment,
            &stages,
            &no_builtins(),
            Some(&VariableSet::new()),
            &VariableSet::new(),
        )
        .unwrap();
        assert!(linkage.uniforms.is_empty());
        assert!(linkage.imported.is_empty());
        assert_eq!(linkage.produced.names(), vec!["x", "y", "z"]);
    }

    #[test]
    fn test_read_before_write_becomes_uniform() {
        let stages = vec![
            Stage::new("a", vec![Variable::input(GlslType::Vec3, "tint")], ""),
            Stage::new("b", vec![Variable::output(GlslType::Vec3, "tint")], ""),
        ];
        let linkage =
            resolve_pass(PassKind::Fragment, &stages, &no_builtins(), None, &VariableSet::new())
                .unwrap();
        assert_eq!(linkage.uniforms.names(), vec!["tint"]);
        assert_eq!(linkage.classify("tint"), Some(Classification::Uniform));
    }

    #[test]
    fn test_local_write_shadows_predecessor() {
        let mut predecessor = VariableSet::new();
        predecessor.insert(&Variable::output(GlslType::Vec3, "normal")).unwrap();
        predecessor.insert(&Variable::output(GlslType::Vec2, "uv")).unwrap();

        let stages = vec![
            Stage::new("override", vec![Variable::output(GlslType::Vec3, "normal")], ""),
            Stage::new(
                "use",
                vec![
                    Variable::input(GlslType::Vec3, "normal"),
                    Variable::input(GlslType::Vec2, "uv"),
                ],
                "",
            ),
        ];
        let linkage = resolve_pass(
            PassKind::Fragment,
            &stages,
            &no_builtins(),
            Some(&predecessor),
            &VariableSet::new(),
        )
        .unwrap();
        assert_eq!(linkage.imported.names(), vec!["uv"]);
        assert_eq!(linkage.classify("normal"), Some(Classification::Produced));
    }

    #[test]
    fn test_import_registered_once_for_many_readers() {
        let mut predecessor = VariableSet::new();
        predecessor.insert(&Variable::output(GlslType::Vec3, "worldPos")).unwrap();
        let reader = |n: &str| Stage::new(n, vec![Variable::input(GlslType::Vec3, "worldPos")], "");
        let stages = vec![reader("a"), reader("b")];
        let linkage = resolve_pass(
            PassKind::Fragment,
            &stages,
            &no_builtins(),
            Some(&predecessor),
            &VariableSet::new(),
        )
        .unwrap();
        assert_eq!(linkage.imported.len(), 1);
    }

    #[test]
    fn test_import_type_mismatch_is_conflict() {
        let mut predecessor = VariableSet::new();
        predecessor.insert(&Variable::output(GlslType::Vec3, "worldPos")).unwrap();
        let stages = vec![Stage::new(
            "a",
            vec![Variable::input(GlslType::Vec4, "worldPos")],
            "",
        )];
        let err = resolve_pass(
            PassKind::Fragment,
            &stages,
            &no_builtins(),
            Some(&predecessor),
            &VariableSet::new(),
        )
        .unwrap_err();
        assert!(matches!(err, LinkError::TypeConflict { .. }));
    }

    #[test]
    fn test_vertex_attributes_and_forwarding() {
        let stages = vec![Stage::new(
            "transform",
            vec![
                Variable::attribute(GlslType::Vec3, "coords"),
                Variable::input(GlslType::Mat4, "transform"),
                Variable::output(GlslType::Vec3, "worldPos"),
            ],
            "",
        )];
        let mut forwarded = VariableSet::new();
        forwarded.insert(&Variable::attribute(GlslType::Vec2, "uv")).unwrap();
        forwarded.insert(&Variable::attribute(GlslType::Vec3, "coords")).unwrap();

        let linkage =
            resolve_pass(PassKind::Vertex, &stages, &no_builtins(), None, &forwarded).unwrap();
        assert_eq!(linkage.attributes.names(), vec!["coords"]);
        assert_eq!(linkage.imported.names(), vec!["uv"]);
        assert_eq!(linkage.uniforms.names(), vec!["transform"]);

        let view = linkage.successor_view().unwrap();
        assert_eq!(view.names(), vec!["coords", "uv", "worldPos"]);
    }

    #[test]
    fn test_builtins_are_not_produced() {
        let mut builtins = VariableSet::new();
        builtins.insert(&Variable::output(GlslType::Vec4, "gl_Position")).unwrap();
        let stages = vec![Stage::new(
            "pos",
            vec![Variable::output(GlslType::Vec4, "gl_Position")],
            "gl_Position = vec4(0.0);",
        )];
        let linkage =
            resolve_pass(PassKind::Vertex, &stages, &builtins, None, &VariableSet::new()).unwrap();
        assert!(linkage.produced.is_empty());
        assert_eq!(linkage.classify("gl_Position"), Some(Classification::Builtin));
    }
}
