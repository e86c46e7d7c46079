//! Program Compilation
//!
//! Generated source is handed to a [`ProgramCompiler`] before it is cached.
//! The default [`NagaCompiler`] parses WGSL with naga, validates the module
//! and checks that it exposes the expected entry point. Programs targeting
//! GLSL are generated as WGSL and translated from the validated module.

use crate::errors::{Result, ShaderGenError};

use super::program::GpuProgramType;

/// Entry point name of every generated program.
pub const ENTRY_POINT: &str = "main";

/// Desktop GLSL version emitted for the `"glsl"` target.
pub const GLSL_VERSION: u16 = 450;

/// Compiles generated program source.
pub trait ProgramCompiler: Send + Sync {
    fn supports_language(&self, language: &str) -> bool;

    /// Compiles `source`, returning the validated module.
    fn compile(&self, name: &str, program_type: GpuProgramType, source: &str)
    -> Result<naga::Module>;
}

/// WGSL front end and validator from naga.
#[derive(Debug, Default, Clone, Copy)]
pub struct NagaCompiler;

impl NagaCompiler {
    fn stage(program_type: GpuProgramType) -> naga::ShaderStage {
        match program_type {
            GpuProgramType::Vertex => naga::ShaderStage::Vertex,
            GpuProgramType::Fragment => naga::ShaderStage::Fragment,
        }
    }
}

impl ProgramCompiler for NagaCompiler {
    fn supports_language(&self, language: &str) -> bool {
        language.eq_ignore_ascii_case("wgsl") || language.eq_ignore_ascii_case("glsl")
    }

    fn compile(
        &self,
        name: &str,
        program_type: GpuProgramType,
        source: &str,
    ) -> Result<naga::Module> {
        let failed = |message: String| ShaderGenError::Compilation {
            program: name.to_string(),
            message,
        };

        let module = naga::front::wgsl::parse_str(source)
            .map_err(|e| failed(format!("WGSL parse error: {}", e.emit_to_string(source))))?;

        let mut validator = naga::valid::Validator::new(
            naga::valid::ValidationFlags::all(),
            naga::valid::Capabilities::all(),
        );
        validator
            .validate(&module)
            .map_err(|e| failed(format!("Validation error: {}", e.emit_to_string(source))))?;

        let stage = Self::stage(program_type);
        if !module
            .entry_points
            .iter()
            .any(|ep| ep.name == ENTRY_POINT && ep.stage == stage)
        {
            return Err(failed(format!(
                "Entry point '{ENTRY_POINT}' for {} stage not found",
                program_type.name()
            )));
        }

        log::debug!("Compiled program '{name}'");
        Ok(module)
    }
}

/// Translates a compiled module to `language`.
///
/// Returns `None` for WGSL, whose generated source is used as is.
pub(crate) fn translate_module(
    name: &str,
    program_type: GpuProgramType,
    module: &naga::Module,
    language: &str,
) -> Result<Option<String>> {
    if !language.eq_ignore_ascii_case("glsl") {
        return Ok(None);
    }
    let failed = |message: String| ShaderGenError::Compilation {
        program: name.to_string(),
        message,
    };

    let info = naga::valid::Validator::new(
        naga::valid::ValidationFlags::all(),
        naga::valid::Capabilities::all(),
    )
    .validate(module)
    .map_err(|e| failed(format!("Validation error: {e}")))?;

    // group 0 holds the uniform block, group 1 texture/sampler pairs
    let binding_map = module
        .global_variables
        .iter()
        .filter_map(|(_, var)| var.binding.clone())
        .map(|binding| {
            let slot = (binding.group * 16 + binding.binding) as u8;
            (binding, slot)
        })
        .collect();

    let options = naga::back::glsl::Options {
        version: naga::back::glsl::Version::Desktop(GLSL_VERSION),
        binding_map,
        ..Default::default()
    };
    let pipeline_options = naga::back::glsl::PipelineOptions {
        shader_stage: NagaCompiler::stage(program_type),
        entry_point: ENTRY_POINT.to_string(),
        multiview: None,
    };

    let mut source = String::new();
    {
        let mut writer = naga::back::glsl::Writer::new(
            &mut source,
            module,
            &info,
            &options,
            &pipeline_options,
            naga::proc::BoundsCheckPolicies::default(),
        )
        .map_err(|e| failed(format!("GLSL error: {e}")))?;
        writer
            .write()
            .map_err(|e| failed(format!("GLSL error: {e}")))?;
    }

    log::debug!("Translated program '{name}' to GLSL {GLSL_VERSION}");
    Ok(Some(source))
}
