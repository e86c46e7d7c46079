//! Sub-Render-States
//!
//! A sub-render-state is one composable unit of generated shading: transform,
//! vertex colour, lighting, texturing. Each one contributes parameters,
//! library dependencies and function invocations to a [`ProgramSet`].
//!
//! Sub-render-states are used in two roles:
//! - as *templates* registered in a
//!   [`RenderState`](super::render_state::RenderState), configured once per
//!   scheme or per material pass;
//! - as *instances* owned by a
//!   [`TargetRenderState`](super::render_state::TargetRenderState), cloned from
//!   the templates and specialised for one source pass.

use std::fmt::Debug;

use crate::errors::{Result, ShaderGenError};
use crate::material::{Pass, ScriptWriter};

use super::parameter::ParameterPtr;
use super::program::ProgramSet;

pub trait SubRenderState: Send + Sync + Debug {
    /// Type name, also the keyword written to material scripts.
    fn type_name(&self) -> &'static str;

    /// Specialises the instance for `src_pass`.
    ///
    /// Returning `false` drops the instance from the target render state.
    fn pre_add_to_render_state(&mut self, _src_pass: &Pass) -> bool {
        true
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<()>;

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<()>;

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<()>;

    fn clone_box(&self) -> Box<dyn SubRenderState>;

    /// Writes the script form of this sub-render-state.
    fn write_script(&self, writer: &mut ScriptWriter) {
        writer.write_line(self.type_name());
    }

    /// Runs the three program building phases in order.
    fn create_cpu_sub_programs(&mut self, programs: &mut ProgramSet) -> Result<()> {
        self.resolve_parameters(programs)?;
        self.resolve_dependencies(programs)?;
        self.add_function_invocations(programs)
    }
}

impl Clone for Box<dyn SubRenderState> {
    fn clone(&self) -> Self {
        self.clone_box()
    }
}

/// Returns a parameter resolved in an earlier phase.
pub(crate) fn resolved(
    param: Option<&ParameterPtr>,
    kind: &'static str,
    what: &str,
) -> Result<ParameterPtr> {
    param.cloned().ok_or_else(|| ShaderGenError::SubRenderState {
        kind,
        reason: format!("{what} used before resolve_parameters"),
    })
}
