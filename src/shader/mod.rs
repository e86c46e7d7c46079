//! Run-time shader generation.
//!
//! The pipeline, leaves first:
//!
//! - [`parameter`] / [`function`]: typed values and the calls that use them
//! - [`program`]: one generated stage (parameters, invocations, libraries)
//! - [`sub_render_state`] / [`ffp`]: composable units filling a [`ProgramSet`]
//! - [`render_state`]: template lists and per-pass instance lists
//! - [`writer`] / [`compiler`]: source emission and validation
//! - [`program_manager`]: content-addressed cache of compiled programs

pub mod compiler;
pub mod ffp;
pub mod function;
pub mod parameter;
pub mod program;
pub mod program_manager;
pub mod render_state;
pub mod sub_render_state;
pub mod writer;

pub use compiler::{NagaCompiler, ProgramCompiler};
pub use function::FunctionInvocation;
pub use parameter::{
    AutoConstant, GpuConstantType, Operand, OperandMask, OperandSemantic, Parameter,
    ParameterFactory, ParameterPtr, Semantic,
};
pub use program::{GpuProgramType, Program, ProgramSet};
pub use program_manager::{GpuProgram, ProgramManager};
pub use render_state::{RenderState, TargetRenderState};
pub use sub_render_state::SubRenderState;
pub use writer::{ProgramWriter, WgslProgramWriter};
