//! Accumulates the ordered stages of one pass.

use tracing::trace;

use crate::error::Result;
use crate::layers::LayerLayout;
use super::emit::{EmitContext, emit_pass, needs_signal_fallback};
use super::functions::FunctionTable;
use super::program::LinkOptions;
use super::resolve::{Linkage, resolve_pass};
use super::stage::Stage;
use super::types::{Direction, GlslType, PassKind};
use super::variable::{Variable, VariableSet};

/// Ordered stages of a vertex or fragment pass plus everything derived from
/// their declarations that does not depend on other passes.
#[derive(Clone, Debug)]
pub struct PassBuilder {
    kind: PassKind,
    stages: Vec<Stage>,
    builtins: VariableSet,
    /// Every variable any stage of this pass declares; keeps names and types
    /// consistent across stages.
    declared: VariableSet,
    functions: FunctionTable,
    defines: Vec<String>,
}

impl PassBuilder {
    pub fn new(kind: PassKind) -> Self {
        let mut builtins = VariableSet::new();
        for (name, ty) in kind.builtins() {
            // Built-in names are unique per pass.
            let _ = builtins.insert(&Variable::new(Direction::InOut, *ty, *name));
        }
        Self {
            kind,
            stages: Vec::new(),
            declared: builtins.clone(),
            builtins,
            functions: FunctionTable::new(),
            defines: Vec::new(),
        }
    }

    pub fn kind(&self) -> PassKind {
        self.kind
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    pub fn builtins(&self) -> &VariableSet {
        &self.builtins
    }

    /// Every variable declared by a stage of this pass, plus built-ins.
    pub fn declared(&self) -> &VariableSet {
        &self.declared
    }

    pub fn functions(&self) -> &FunctionTable {
        &self.functions
    }

    pub fn defines(&self) -> &[String] {
        &self.defines
    }

    /// Treat `var` as defined without any stage producing it, e.g. a value
    /// provided by a host-specific preamble.
    pub fn define_builtin(&mut self, var: Variable) -> Result<()> {
        self.declared.insert(&var)?;
        self.builtins.insert(&var)?;
        Ok(())
    }

    /// Append `stage`. The pass is left untouched when the stage conflicts
    /// with what is already declared.
    pub fn add_stage(&mut self, stage: Stage) -> Result<()> {
        let mut declared = self.declared.clone();
        for var in &stage.parameters {
            declared.insert(var)?;
        }
        self.functions.check(&stage.functions)?;

        for func in &stage.functions {
            self.functions.insert(func)?;
        }
        for define in &stage.defines {
            if !self.defines.contains(define) {
                self.defines.push(define.clone());
            }
        }
        self.declared = declared;
        trace!(pass = self.kind.label(), stage = %stage.name, "stage added");
        self.stages.push(stage);
        Ok(())
    }

    pub fn add_stages(&mut self, stages: impl IntoIterator<Item = Stage>) -> Result<()> {
        for stage in stages {
            self.add_stage(stage)?;
        }
        Ok(())
    }

    /// Attribute-flagged parameters the pass reads before any of its own
    /// stages writes them, in declaration order. In a fragment pass these
    /// are requests for the vertex pass to forward.
    pub fn attribute_requests(&self) -> Result<VariableSet> {
        let mut requested = VariableSet::new();
        for stage in &self.stages {
            for var in stage.parameters.iter().filter(|v| v.is_attribute) {
                requested.insert(var)?;
            }
        }
        if requested.is_empty() {
            return Ok(requested);
        }

        let provisional = self.resolve(Some(&requested), &VariableSet::new())?;
        let mut out = VariableSet::new();
        for var in requested.iter() {
            if provisional.imported.contains(&var.name) {
                out.insert(var)?;
            }
        }
        Ok(out)
    }

    /// Check that the values the fragment tail consumes have the types it
    /// writes them with: every packed layer variable, the alpha signal when
    /// it fills empty channels, and the color and alpha signals when the
    /// single output falls back to them.
    pub fn check_outputs(&self, layers: Option<&LayerLayout>, options: &LinkOptions) -> Result<()> {
        if self.kind != PassKind::Fragment {
            return Ok(());
        }
        let alpha = Variable::output(GlslType::Float, options.alpha_signal.clone());
        match layers {
            Some(layout) => {
                for layer in layout.layers() {
                    self.check_declared(&Variable::output(
                        layer.glsl_type(),
                        layer.variable.clone(),
                    ))?;
                }
                if !layout.empty_channels.is_empty() {
                    self.check_declared(&alpha)?;
                }
            }
            None if needs_signal_fallback(self) => {
                if let Some(existing) = self.declared.get(&options.color_signal) {
                    let color_ok = matches!(existing.ty, GlslType::Vec3 | GlslType::Vec4)
                        && !existing.is_array();
                    if !color_ok {
                        let expected =
                            Variable::output(GlslType::Vec3, options.color_signal.clone());
                        return Err(existing.conflict_error(&expected));
                    }
                }
                self.check_declared(&alpha)?;
            }
            None => {}
        }
        Ok(())
    }

    fn check_declared(&self, expected: &Variable) -> Result<()> {
        match self.declared.get(&expected.name) {
            Some(existing) if existing.conflicts_with(expected) => {
                Err(existing.conflict_error(expected))
            }
            _ => Ok(()),
        }
    }

    pub fn resolve(
        &self,
        predecessor: Option<&VariableSet>,
        forwarded: &VariableSet,
    ) -> Result<Linkage> {
        resolve_pass(self.kind, &self.stages, &self.builtins, predecessor, forwarded)
    }

    pub fn emit(
        &self,
        linkage: &Linkage,
        varyings: &VariableSet,
        layers: Option<&LayerLayout>,
        options: &LinkOptions,
    ) -> String {
        emit_pass(
            self,
            &EmitContext {
                linkage,
                varyings,
                layers,
                options,
            },
        )
    }
}
