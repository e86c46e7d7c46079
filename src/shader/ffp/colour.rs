use glam::Vec4;

use crate::errors::Result;
use crate::material::{Pass, TrackVertexColour};
use crate::shader::function::{FunctionInvocation, groups};
use crate::shader::parameter::{
    GpuConstantType, OperandSemantic, ParameterFactory, ParameterPtr, Semantic,
};
use crate::shader::program::ProgramSet;
use crate::shader::sub_render_state::{SubRenderState, resolved};

/// Diffuse colour flow from the vertex stage to the render target.
///
/// The vertex stage writes either the vertex colour (when the pass tracks
/// its diffuse colour from the vertex) or white; the fragment stage copies
/// the interpolated colour to render target 0. Later stages (lighting,
/// texturing) modulate the same outputs.
#[derive(Debug, Clone, Default)]
pub struct FfpColour {
    track_vertex_diffuse: bool,
    vs_colour_in: Option<ParameterPtr>,
    vs_colour_out: Option<ParameterPtr>,
    ps_colour_in: Option<ParameterPtr>,
    ps_colour_out: Option<ParameterPtr>,
}

impl FfpColour {
    pub const TYPE: &'static str = "colour_stage";

    #[must_use]
    pub fn tracks_vertex_diffuse(&self) -> bool {
        self.track_vertex_diffuse
    }
}

impl SubRenderState for FfpColour {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn pre_add_to_render_state(&mut self, src_pass: &Pass) -> bool {
        self.track_vertex_diffuse = src_pass
            .vertex_colour_tracking
            .contains(TrackVertexColour::DIFFUSE);
        true
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let vs = programs.vertex_mut();
        self.vs_colour_in = if self.track_vertex_diffuse {
            Some(vs.resolve_input(Semantic::Colour, 0, GpuConstantType::Float4)?)
        } else {
            Some(ParameterFactory::create_const_vec4(Vec4::ONE))
        };
        self.vs_colour_out = Some(vs.resolve_output(Semantic::Colour, 0, GpuConstantType::Float4)?);

        let ps = programs.fragment_mut();
        self.ps_colour_in = Some(ps.resolve_input(Semantic::Colour, 0, GpuConstantType::Float4)?);
        self.ps_colour_out = Some(ps.resolve_output(Semantic::Colour, 0, GpuConstantType::Float4)?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<()> {
        programs.vertex_mut().add_dependency("FFPLib_Common");
        programs.fragment_mut().add_dependency("FFPLib_Common");
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<()> {
        programs.vertex_mut().add_invocation(
            FunctionInvocation::new("FFP_Assign", groups::VS_COLOUR)
                .with_operand(
                    resolved(self.vs_colour_in.as_ref(), Self::TYPE, "vertex colour")?,
                    OperandSemantic::In,
                )
                .with_operand(
                    resolved(self.vs_colour_out.as_ref(), Self::TYPE, "vertex colour output")?,
                    OperandSemantic::Out,
                ),
        );

        programs.fragment_mut().add_invocation(
            FunctionInvocation::new("FFP_Assign", groups::PS_COLOUR_BEGIN)
                .with_operand(
                    resolved(self.ps_colour_in.as_ref(), Self::TYPE, "interpolated colour")?,
                    OperandSemantic::In,
                )
                .with_operand(
                    resolved(self.ps_colour_out.as_ref(), Self::TYPE, "fragment colour output")?,
                    OperandSemantic::Out,
                ),
        );
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        Box::new(self.clone())
    }
}
