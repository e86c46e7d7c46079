use crate::errors::Result;
use crate::shader::function::{FunctionInvocation, groups};
use crate::shader::parameter::{AutoConstant, GpuConstantType, OperandSemantic, ParameterPtr, Semantic};
use crate::shader::program::ProgramSet;
use crate::shader::sub_render_state::{SubRenderState, resolved};

/// Object space position to clip space.
#[derive(Debug, Clone, Default)]
pub struct FfpTransform {
    world_view_proj: Option<ParameterPtr>,
    position_in: Option<ParameterPtr>,
    position_out: Option<ParameterPtr>,
}

impl FfpTransform {
    pub const TYPE: &'static str = "transform_stage";
}

impl SubRenderState for FfpTransform {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let vs = programs.vertex_mut();
        self.world_view_proj = Some(vs.resolve_auto_uniform(AutoConstant::WorldViewProjMatrix)?);
        self.position_in = Some(vs.resolve_input(Semantic::Position, 0, GpuConstantType::Float4)?);
        self.position_out = Some(vs.resolve_output(Semantic::Position, 0, GpuConstantType::Float4)?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<()> {
        programs.vertex_mut().add_dependency("FFPLib_Transform");
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let wvp = resolved(self.world_view_proj.as_ref(), Self::TYPE, "world view projection matrix")?;
        let pos_in = resolved(self.position_in.as_ref(), Self::TYPE, "input position")?;
        let pos_out = resolved(self.position_out.as_ref(), Self::TYPE, "output position")?;

        programs.vertex_mut().add_invocation(
            FunctionInvocation::new("FFP_Transform", groups::VS_TRANSFORM)
                .with_operand(wvp, OperandSemantic::In)
                .with_operand(pos_in, OperandSemantic::In)
                .with_operand(pos_out, OperandSemantic::Out),
        );
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        Box::new(self.clone())
    }
}
