#![warn(clippy::all)]
#![warn(clippy::pedantic)]
#![allow(clippy::module_name_repetitions)]
#![allow(clippy::missing_errors_doc)]
#![allow(clippy::missing_panics_doc)]

pub mod errors;
pub mod generator;
pub mod material;
pub mod settings;
pub mod shader;

pub use errors::{Result, ShaderGenError};
pub use generator::ShaderGenerator;
pub use material::{Material, MaterialHandle, MaterialManager, MaterialSerializer, Pass, Technique};
pub use settings::ShaderGeneratorSettings;
pub use shader::ffp::{FfpColour, FfpLighting, FfpTexturing, FfpTransform};
pub use shader::{
    FunctionInvocation, GpuProgram, GpuProgramType, ProgramManager, RenderState, SubRenderState,
    TargetRenderState,
};
