use crate::errors::Result;
use crate::material::{Pass, ScriptWriter};
use crate::shader::function::{FunctionInvocation, groups};
use crate::shader::parameter::{
    AutoConstant, GpuConstantType, OperandMask, OperandSemantic, ParameterPtr, Semantic,
};
use crate::shader::program::ProgramSet;
use crate::shader::sub_render_state::{SubRenderState, resolved};

#[derive(Debug, Clone)]
struct LightParams {
    direction: ParameterPtr,
    diffuse: ParameterPtr,
}

/// Per-vertex diffuse lighting from directional lights.
///
/// Lit colour = derived scene colour + Σ light diffuse × max(N·-L, 0), which
/// then modulates the vertex colour output.
#[derive(Debug, Clone)]
pub struct FfpLighting {
    light_count: u32,
    normal_matrix: Option<ParameterPtr>,
    normal_in: Option<ParameterPtr>,
    normal: Option<ParameterPtr>,
    scene_colour: Option<ParameterPtr>,
    lit: Option<ParameterPtr>,
    colour_out: Option<ParameterPtr>,
    lights: Vec<LightParams>,
}

impl Default for FfpLighting {
    fn default() -> Self {
        Self::new(1)
    }
}

impl FfpLighting {
    pub const TYPE: &'static str = "lighting_stage";

    #[must_use]
    pub fn new(light_count: u32) -> Self {
        Self {
            light_count,
            normal_matrix: None,
            normal_in: None,
            normal: None,
            scene_colour: None,
            lit: None,
            colour_out: None,
            lights: Vec::new(),
        }
    }

    #[must_use]
    pub fn light_count(&self) -> u32 {
        self.light_count
    }

    pub fn set_light_count(&mut self, light_count: u32) {
        self.light_count = light_count;
    }
}

impl SubRenderState for FfpLighting {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn pre_add_to_render_state(&mut self, src_pass: &Pass) -> bool {
        src_pass.lighting_enabled
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let vs = programs.vertex_mut();

        self.normal_matrix = Some(vs.resolve_auto_uniform(AutoConstant::NormalMatrix)?);
        self.scene_colour = Some(vs.resolve_auto_uniform(AutoConstant::DerivedSceneColour)?);
        self.normal_in = Some(vs.resolve_input(Semantic::Normal, 0, GpuConstantType::Float3)?);
        self.normal = Some(vs.resolve_local("l_normal", GpuConstantType::Float3)?);
        self.lit = Some(vs.resolve_local("l_lit", GpuConstantType::Float4)?);
        self.colour_out = Some(vs.resolve_output(Semantic::Colour, 0, GpuConstantType::Float4)?);

        self.lights = (0..self.light_count)
            .map(|i| -> Result<LightParams> {
                Ok(LightParams {
                    direction: vs.resolve_auto_uniform(AutoConstant::LightDirectionViewSpace(i))?,
                    diffuse: vs.resolve_auto_uniform(AutoConstant::DerivedLightDiffuseColour(i))?,
                })
            })
            .collect::<Result<_>>()?;
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let vs = programs.vertex_mut();
        vs.add_dependency("FFPLib_Common");
        vs.add_dependency("FFPLib_Transform");
        vs.add_dependency("FFPLib_Lighting");
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let normal = resolved(self.normal.as_ref(), Self::TYPE, "view space normal")?;
        let lit = resolved(self.lit.as_ref(), Self::TYPE, "lit colour")?;
        let colour_out = resolved(self.colour_out.as_ref(), Self::TYPE, "vertex colour output")?;

        let vs = programs.vertex_mut();

        vs.add_invocation(
            FunctionInvocation::new("FFP_TransformNormal", groups::VS_LIGHTING)
                .with_operand(
                    resolved(self.normal_matrix.as_ref(), Self::TYPE, "normal matrix")?,
                    OperandSemantic::In,
                )
                .with_operand(
                    resolved(self.normal_in.as_ref(), Self::TYPE, "input normal")?,
                    OperandSemantic::In,
                )
                .with_operand(normal.clone(), OperandSemantic::Out),
        );

        vs.add_invocation(
            FunctionInvocation::new("FFP_Assign", groups::VS_LIGHTING)
                .with_operand(
                    resolved(self.scene_colour.as_ref(), Self::TYPE, "scene colour")?,
                    OperandSemantic::In,
                )
                .with_operand(lit.clone(), OperandSemantic::Out),
        );

        for light in &self.lights {
            vs.add_invocation(
                FunctionInvocation::new("FFP_Light_Directional_Diffuse", groups::VS_LIGHTING)
                    .with_operand(normal.clone(), OperandSemantic::In)
                    .with_masked_operand(light.direction.clone(), OperandSemantic::In, OperandMask::XYZ)
                    .with_masked_operand(light.diffuse.clone(), OperandSemantic::In, OperandMask::XYZ)
                    .with_masked_operand(lit.clone(), OperandSemantic::InOut, OperandMask::XYZ),
            );
        }

        vs.add_invocation(
            FunctionInvocation::new("FFP_Modulate", groups::VS_LIGHTING)
                .with_operand(lit, OperandSemantic::In)
                .with_operand(colour_out.clone(), OperandSemantic::In)
                .with_operand(colour_out, OperandSemantic::Out),
        );
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        Box::new(self.clone())
    }

    fn write_script(&self, writer: &mut ScriptWriter) {
        writer.write_attribute(Self::TYPE, &["per_vertex", &self.light_count.to_string()]);
    }
}
