//! Program Model
//!
//! A [`Program`] is the CPU-side description of one generated shader stage:
//! the parameters it declares, the function invocations of its entry point and
//! the function libraries it includes. Sub-render-states fill a
//! [`ProgramSet`] (vertex + fragment) which is then written to source and
//! compiled by the [`ProgramManager`](super::program_manager::ProgramManager).
//!
//! All `resolve_*` methods are get-or-create: two sub-render-states that ask
//! for the same stage output receive the same [`ParameterPtr`], which is how
//! their contributions are chained together.

use crate::errors::{Result, ShaderGenError};

use super::function::FunctionInvocation;
use super::parameter::{
    AutoConstant, GpuConstantType, ParameterFactory, ParameterKind, ParameterPtr, Semantic,
};

/// Pipeline stage of a generated program.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GpuProgramType {
    Vertex,
    Fragment,
}

impl GpuProgramType {
    #[must_use]
    pub fn name(self) -> &'static str {
        match self {
            Self::Vertex => "vertex",
            Self::Fragment => "fragment",
        }
    }

    /// Short suffix used in generated program names.
    #[must_use]
    pub fn suffix(self) -> &'static str {
        match self {
            Self::Vertex => "vs",
            Self::Fragment => "fs",
        }
    }
}

/// One generated shader stage.
#[derive(Debug, Clone)]
pub struct Program {
    program_type: GpuProgramType,
    uniforms: Vec<ParameterPtr>,
    textures: Vec<ParameterPtr>,
    inputs: Vec<ParameterPtr>,
    outputs: Vec<ParameterPtr>,
    locals: Vec<ParameterPtr>,
    invocations: Vec<FunctionInvocation>,
    dependencies: Vec<String>,
}

fn check_type(existing: &ParameterPtr, requested: GpuConstantType) -> Result<ParameterPtr> {
    if existing.constant_type() == requested {
        Ok(existing.clone())
    } else {
        Err(ShaderGenError::ParameterConflict {
            name: existing.name().to_string(),
            existing: existing.constant_type().wgsl(),
            requested: requested.wgsl(),
        })
    }
}

impl Program {
    #[must_use]
    pub fn new(program_type: GpuProgramType) -> Self {
        Self {
            program_type,
            uniforms: Vec::new(),
            textures: Vec::new(),
            inputs: Vec::new(),
            outputs: Vec::new(),
            locals: Vec::new(),
            invocations: Vec::new(),
            dependencies: Vec::new(),
        }
    }

    #[inline]
    #[must_use]
    pub fn program_type(&self) -> GpuProgramType {
        self.program_type
    }

    // ── Parameter resolution ────────────────────────────────────────────────

    /// Resolves a uniform filled in by the engine.
    pub fn resolve_auto_uniform(&mut self, constant: AutoConstant) -> Result<ParameterPtr> {
        let name = constant.uniform_name();
        if let Some(existing) = self.uniforms.iter().find(|p| p.name() == name) {
            return check_type(existing, constant.constant_type());
        }
        let param = ParameterFactory::create_auto_uniform(constant);
        self.uniforms.push(param.clone());
        Ok(param)
    }

    /// Resolves a custom uniform by name.
    pub fn resolve_uniform(&mut self, name: &str, ty: GpuConstantType) -> Result<ParameterPtr> {
        if let Some(existing) = self.uniforms.iter().find(|p| p.name() == name) {
            return check_type(existing, ty);
        }
        let param = ParameterFactory::create_uniform(name, ty);
        self.uniforms.push(param.clone());
        Ok(param)
    }

    /// Resolves a stage input by semantic.
    pub fn resolve_input(
        &mut self,
        semantic: Semantic,
        index: u8,
        ty: GpuConstantType,
    ) -> Result<ParameterPtr> {
        if let Some(existing) = self
            .inputs
            .iter()
            .find(|p| p.semantic() == Some((semantic, index)))
        {
            return check_type(existing, ty);
        }
        let param = ParameterFactory::create_in(semantic, index, ty);
        self.inputs.push(param.clone());
        Ok(param)
    }

    /// Resolves a stage output by semantic.
    pub fn resolve_output(
        &mut self,
        semantic: Semantic,
        index: u8,
        ty: GpuConstantType,
    ) -> Result<ParameterPtr> {
        if let Some(existing) = self
            .outputs
            .iter()
            .find(|p| p.semantic() == Some((semantic, index)))
        {
            return check_type(existing, ty);
        }
        let param = ParameterFactory::create_out(semantic, index, ty);
        self.outputs.push(param.clone());
        Ok(param)
    }

    /// Resolves a local variable of the entry point by name.
    pub fn resolve_local(&mut self, name: &str, ty: GpuConstantType) -> Result<ParameterPtr> {
        if let Some(existing) = self.locals.iter().find(|p| p.name() == name) {
            return check_type(existing, ty);
        }
        let param = ParameterFactory::create_local(name, ty);
        self.locals.push(param.clone());
        Ok(param)
    }

    /// Resolves the texture and sampler of a texture unit.
    pub fn resolve_texture_unit(&mut self, unit: u32) -> (ParameterPtr, ParameterPtr) {
        let find = |textures: &[ParameterPtr], sampler: bool| {
            textures
                .iter()
                .find(|p| match p.kind() {
                    ParameterKind::Texture { unit: u } => !sampler && *u == unit,
                    ParameterKind::Sampler { unit: u } => sampler && *u == unit,
                    _ => false,
                })
                .cloned()
        };

        let texture = find(&self.textures, false).unwrap_or_else(|| {
            let p = ParameterFactory::create_texture(unit);
            self.textures.push(p.clone());
            p
        });
        let sampler = find(&self.textures, true).unwrap_or_else(|| {
            let p = ParameterFactory::create_sampler(unit);
            self.textures.push(p.clone());
            p
        });
        (texture, sampler)
    }

    // ── Code ────────────────────────────────────────────────────────────────

    pub fn add_invocation(&mut self, invocation: FunctionInvocation) {
        self.invocations.push(invocation);
    }

    /// Adds a function library this program includes. Duplicates are ignored.
    pub fn add_dependency(&mut self, library: &str) {
        if !self.dependencies.iter().any(|d| d == library) {
            self.dependencies.push(library.to_string());
        }
    }

    // ── Accessors ───────────────────────────────────────────────────────────

    #[must_use]
    pub fn uniforms(&self) -> &[ParameterPtr] {
        &self.uniforms
    }

    #[must_use]
    pub fn textures(&self) -> &[ParameterPtr] {
        &self.textures
    }

    #[must_use]
    pub fn inputs(&self) -> &[ParameterPtr] {
        &self.inputs
    }

    #[must_use]
    pub fn outputs(&self) -> &[ParameterPtr] {
        &self.outputs
    }

    #[must_use]
    pub fn locals(&self) -> &[ParameterPtr] {
        &self.locals
    }

    /// Invocations in insertion order.
    #[must_use]
    pub fn invocations(&self) -> &[FunctionInvocation] {
        &self.invocations
    }

    #[must_use]
    pub fn dependencies(&self) -> &[String] {
        &self.dependencies
    }

    /// Invocations in emission order: by group, insertion order within a group.
    #[must_use]
    pub fn sorted_invocations(&self) -> Vec<&FunctionInvocation> {
        let mut sorted: Vec<_> = self.invocations.iter().collect();
        sorted.sort_by_key(|inv| inv.group());
        sorted
    }
}

/// The vertex and fragment program of one target render state.
#[derive(Debug, Clone)]
pub struct ProgramSet {
    vertex: Program,
    fragment: Program,
}

impl Default for ProgramSet {
    fn default() -> Self {
        Self::new()
    }
}

impl ProgramSet {
    #[must_use]
    pub fn new() -> Self {
        Self {
            vertex: Program::new(GpuProgramType::Vertex),
            fragment: Program::new(GpuProgramType::Fragment),
        }
    }

    #[inline]
    #[must_use]
    pub fn program(&self, ty: GpuProgramType) -> &Program {
        match ty {
            GpuProgramType::Vertex => &self.vertex,
            GpuProgramType::Fragment => &self.fragment,
        }
    }

    #[inline]
    pub fn program_mut(&mut self, ty: GpuProgramType) -> &mut Program {
        match ty {
            GpuProgramType::Vertex => &mut self.vertex,
            GpuProgramType::Fragment => &mut self.fragment,
        }
    }

    #[inline]
    #[must_use]
    pub fn vertex(&self) -> &Program {
        &self.vertex
    }

    #[inline]
    pub fn vertex_mut(&mut self) -> &mut Program {
        &mut self.vertex
    }

    #[inline]
    #[must_use]
    pub fn fragment(&self) -> &Program {
        &self.fragment
    }

    #[inline]
    pub fn fragment_mut(&mut self) -> &mut Program {
        &mut self.fragment
    }
}
