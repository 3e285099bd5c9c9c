//! Stages: opaque GLSL body text plus a declared variable interface.

use serde::{Deserialize, Serialize};

use super::types::{Direction, GlslType};
use super::variable::Variable;

/// Auxiliary function a stage needs, keyed by a stable signature key so that
/// several stages can share one definition.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ShaderFunction {
    pub key: String,
    pub body: String,
}

impl ShaderFunction {
    pub fn new(key: impl Into<String>, body: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            body: body.into(),
        }
    }
}

/// Unit of shading code. The body may only reference its parameters and
/// built-ins; this is not checked here and surfaces as a driver compile error.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Stage {
    pub name: String,
    #[serde(default, rename = "params")]
    pub parameters: Vec<Variable>,
    #[serde(default)]
    pub body: String,
    #[serde(default)]
    pub functions: Vec<ShaderFunction>,
    #[serde(default)]
    pub defines: Vec<String>,
}

impl Stage {
    pub fn new(
        name: impl Into<String>,
        parameters: Vec<Variable>,
        body: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            parameters,
            body: body.into(),
            functions: Vec::new(),
            defines: Vec::new(),
        }
    }

    pub fn with_parameter(mut self, var: Variable) -> Self {
        self.parameters.push(var);
        self
    }

    pub fn with_function(mut self, key: impl Into<String>, body: impl Into<String>) -> Self {
        self.functions.push(ShaderFunction::new(key, body));
        self
    }

    pub fn with_define(mut self, symbol: impl Into<String>) -> Self {
        self.defines.push(symbol.into());
        self
    }

    /// Parameters read by the body (`In` and `InOut`).
    pub fn reads(&self) -> impl Iterator<Item = &Variable> {
        self.parameters.iter().filter(|v| v.direction.reads())
    }

    /// Parameters written by the body (`Out` and `InOut`).
    pub fn writes(&self) -> impl Iterator<Item = &Variable> {
        self.parameters.iter().filter(|v| v.direction.writes())
    }

    /// Shorthand for a stage that only writes one value from a constant
    /// expression, e.g. a material default.
    pub fn constant(name: impl Into<String>, ty: GlslType, var: &str, expr: &str) -> Self {
        Self::new(
            name,
            vec![Variable::new(Direction::Out, ty, var)],
            format!("{var} = {expr};"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_reads_and_writes() {
        let stage = Stage::new(
            "blend",
            vec![
                Variable::input(GlslType::Vec3, "a"),
                Variable::in_out(GlslType::Vec3, "b"),
                Variable::output(GlslType::Vec3, "c"),
            ],
            "b += a; c = b;",
        );
        let reads: Vec<&str> = stage.reads().map(|v| v.name.as_str()).collect();
        let writes: Vec<&str> = stage.writes().map(|v| v.name.as_str()).collect();
        assert_eq!(reads, vec!["a", "b"]);
        assert_eq!(writes, vec!["b", "c"]);
    }

    #[test]
    fn test_builder_helpers() {
        let stage = Stage::constant("alpha", GlslType::Float, "finalAlpha", "1.0")
            .with_define("HAS_ALPHA")
            .with_function("float sq(float)", "float sq(float x) { return x * x; }");
        assert_eq!(stage.body, "finalAlpha = 1.0;");
        assert_eq!(stage.defines, vec!["HAS_ALPHA"]);
        assert_eq!(stage.functions[0].key, "float sq(float)");
        assert_eq!(stage.writes().next().map(|v| v.ty), Some(GlslType::Float));
    }
}
