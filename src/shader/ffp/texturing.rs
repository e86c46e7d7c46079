use crate::errors::{Result, ShaderGenError};
use crate::material::{LayerBlendOperation, Pass, ScriptWriter};
use crate::shader::function::{FunctionInvocation, groups};
use crate::shader::parameter::{GpuConstantType, OperandSemantic, ParameterPtr, Semantic};
use crate::shader::program::ProgramSet;
use crate::shader::sub_render_state::{SubRenderState, resolved};

#[derive(Debug, Clone)]
struct TextureUnitParams {
    tex_coord_set: u8,
    colour_op: LayerBlendOperation,
    vs_tex_coord_in: Option<ParameterPtr>,
    vs_tex_coord_out: Option<ParameterPtr>,
    ps_tex_coord_in: Option<ParameterPtr>,
    texture: Option<ParameterPtr>,
    sampler: Option<ParameterPtr>,
    texel: Option<ParameterPtr>,
}

/// Samples every texture unit of the pass and blends it into the colour.
#[derive(Debug, Clone, Default)]
pub struct FfpTexturing {
    units: Vec<TextureUnitParams>,
    colour_out: Option<ParameterPtr>,
}

impl FfpTexturing {
    pub const TYPE: &'static str = "texturing_stage";

    #[must_use]
    pub fn unit_count(&self) -> usize {
        self.units.len()
    }

    fn blend_function(op: LayerBlendOperation) -> &'static str {
        match op {
            LayerBlendOperation::Replace => "FFP_Assign",
            LayerBlendOperation::Add => "FFP_Add",
            LayerBlendOperation::Modulate => "FFP_Modulate",
            LayerBlendOperation::Subtract => "FFP_Subtract",
        }
    }
}

impl SubRenderState for FfpTexturing {
    fn type_name(&self) -> &'static str {
        Self::TYPE
    }

    fn pre_add_to_render_state(&mut self, src_pass: &Pass) -> bool {
        self.units = src_pass
            .texture_units
            .iter()
            .map(|unit| TextureUnitParams {
                tex_coord_set: unit.tex_coord_set,
                colour_op: unit.colour_op,
                vs_tex_coord_in: None,
                vs_tex_coord_out: None,
                ps_tex_coord_in: None,
                texture: None,
                sampler: None,
                texel: None,
            })
            .collect();
        !self.units.is_empty()
    }

    fn resolve_parameters(&mut self, programs: &mut ProgramSet) -> Result<()> {
        for (i, unit) in self.units.iter_mut().enumerate() {
            let index = u8::try_from(i).map_err(|_| ShaderGenError::SubRenderState {
                kind: Self::TYPE,
                reason: format!("too many texture units ({i})"),
            })?;

            let vs = programs.vertex_mut();
            unit.vs_tex_coord_in =
                Some(vs.resolve_input(Semantic::TexCoord, unit.tex_coord_set, GpuConstantType::Float2)?);
            unit.vs_tex_coord_out =
                Some(vs.resolve_output(Semantic::TexCoord, index, GpuConstantType::Float2)?);

            let ps = programs.fragment_mut();
            unit.ps_tex_coord_in =
                Some(ps.resolve_input(Semantic::TexCoord, index, GpuConstantType::Float2)?);
            let (texture, sampler) = ps.resolve_texture_unit(u32::from(index));
            unit.texture = Some(texture);
            unit.sampler = Some(sampler);
            unit.texel = Some(ps.resolve_local(&format!("l_texel{i}"), GpuConstantType::Float4)?);
        }

        self.colour_out = Some(programs.fragment_mut().resolve_output(
            Semantic::Colour,
            0,
            GpuConstantType::Float4,
        )?);
        Ok(())
    }

    fn resolve_dependencies(&mut self, programs: &mut ProgramSet) -> Result<()> {
        programs.vertex_mut().add_dependency("FFPLib_Common");
        let ps = programs.fragment_mut();
        ps.add_dependency("FFPLib_Common");
        ps.add_dependency("FFPLib_Texturing");
        Ok(())
    }

    fn add_function_invocations(&mut self, programs: &mut ProgramSet) -> Result<()> {
        let colour_out = resolved(self.colour_out.as_ref(), Self::TYPE, "fragment colour output")?;

        for unit in &self.units {
            let texel = resolved(unit.texel.as_ref(), Self::TYPE, "texel")?;

            programs.vertex_mut().add_invocation(
                FunctionInvocation::new("FFP_Assign2", groups::VS_TEXTURING)
                    .with_operand(
                        resolved(unit.vs_tex_coord_in.as_ref(), Self::TYPE, "vertex texcoord")?,
                        OperandSemantic::In,
                    )
                    .with_operand(
                        resolved(unit.vs_tex_coord_out.as_ref(), Self::TYPE, "texcoord output")?,
                        OperandSemantic::Out,
                    ),
            );

            let ps = programs.fragment_mut();
            ps.add_invocation(
                FunctionInvocation::new("FFP_SampleTexture", groups::PS_SAMPLING)
                    .with_operand(
                        resolved(unit.texture.as_ref(), Self::TYPE, "texture")?,
                        OperandSemantic::In,
                    )
                    .with_operand(
                        resolved(unit.sampler.as_ref(), Self::TYPE, "sampler")?,
                        OperandSemantic::In,
                    )
                    .with_operand(
                        resolved(unit.ps_tex_coord_in.as_ref(), Self::TYPE, "interpolated texcoord")?,
                        OperandSemantic::In,
                    )
                    .with_operand(texel.clone(), OperandSemantic::Out),
            );

            let mut blend =
                FunctionInvocation::new(Self::blend_function(unit.colour_op), groups::PS_TEXTURING);
            blend.push_operand(texel, OperandSemantic::In);
            if unit.colour_op != LayerBlendOperation::Replace {
                blend.push_operand(colour_out.clone(), OperandSemantic::In);
            }
            blend.push_operand(colour_out.clone(), OperandSemantic::Out);
            ps.add_invocation(blend);
        }
        Ok(())
    }

    fn clone_box(&self) -> Box<dyn SubRenderState> {
        Box::new(self.clone())
    }

    fn write_script(&self, writer: &mut ScriptWriter) {
        writer.write_attribute(Self::TYPE, &[&self.units.len().to_string()]);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::TextureUnitState;

    #[test]
    fn test_pass_without_units_is_skipped() {
        assert!(!FfpTexturing::default().pre_add_to_render_state(&Pass::default()));
    }

    #[test]
    fn test_colour_op_selects_blend_function() {
        let mut pass = Pass::default();
        pass.add_texture_unit(TextureUnitState::new("base.png"));
        pass.add_texture_unit(TextureUnitState::new("detail.png")).colour_op = LayerBlendOperation::Add;

        let mut state = FfpTexturing::default();
        assert!(state.pre_add_to_render_state(&pass));
        assert_eq!(state.unit_count(), 2);

        let mut programs = ProgramSet::new();
        state.create_cpu_sub_programs(&mut programs).unwrap();

        let names: Vec<_> = programs
            .fragment()
            .sorted_invocations()
            .iter()
            .map(|inv| inv.function_name())
            .collect();
        assert_eq!(
            names,
            ["FFP_SampleTexture", "FFP_SampleTexture", "FFP_Modulate", "FFP_Add"]
        );
        assert_eq!(programs.fragment().textures().len(), 4);
    }
}
