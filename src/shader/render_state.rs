//! Render States
//!
//! [`RenderState`] is a list of configured sub-render-state *templates*,
//! kept per scheme and per material pass. [`TargetRenderState`] owns the
//! *instances* built for one concrete pass and turns them into programs.

use crate::errors::Result;
use crate::material::Pass;

use super::program::ProgramSet;
use super::program_manager::ProgramManager;
use super::sub_render_state::SubRenderState;

/// Ordered sub-render-state templates, at most one per type.
#[derive(Debug, Default, Clone)]
pub struct RenderState {
    templates: Vec<Box<dyn SubRenderState>>,
}

impl RenderState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a template. A template of the same type is replaced in place.
    pub fn add_template_sub_render_state(&mut self, template: Box<dyn SubRenderState>) {
        match self
            .templates
            .iter_mut()
            .find(|t| t.type_name() == template.type_name())
        {
            Some(existing) => *existing = template,
            None => self.templates.push(template),
        }
    }

    /// Removes the template of the given type. Returns whether one existed.
    pub fn remove_template_sub_render_state(&mut self, type_name: &str) -> bool {
        let before = self.templates.len();
        self.templates.retain(|t| t.type_name() != type_name);
        self.templates.len() != before
    }

    #[must_use]
    pub fn templates(&self) -> &[Box<dyn SubRenderState>] {
        &self.templates
    }

    #[must_use]
    pub fn template(&self, type_name: &str) -> Option<&dyn SubRenderState> {
        self.templates
            .iter()
            .find(|t| t.type_name() == type_name)
            .map(AsRef::as_ref)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.templates.is_empty()
    }

    pub fn clear(&mut self) {
        self.templates.clear();
    }
}

/// The sub-render-state instances of one pass.
#[derive(Debug, Default)]
pub struct TargetRenderState {
    instances: Vec<Box<dyn SubRenderState>>,
}

impl TargetRenderState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Takes ownership of an already configured instance.
    pub fn add_sub_render_state_instance(&mut self, instance: Box<dyn SubRenderState>) {
        self.instances.push(instance);
    }

    /// Instantiates `templates` for `src_pass`.
    ///
    /// Each template is cloned and specialised for the pass. An instance of
    /// the same type already present is replaced in place; templates that
    /// reject the pass are left out.
    pub fn link(&mut self, templates: &RenderState, src_pass: &Pass) {
        for template in templates.templates() {
            let mut instance = template.clone_box();
            if !instance.pre_add_to_render_state(src_pass) {
                log::debug!("Sub-render-state '{}' skipped for pass", instance.type_name());
                continue;
            }

            match self
                .instances
                .iter_mut()
                .find(|i| i.type_name() == instance.type_name())
            {
                Some(existing) => *existing = instance,
                None => self.instances.push(instance),
            }
        }
    }

    #[must_use]
    pub fn instances(&self) -> &[Box<dyn SubRenderState>] {
        &self.instances
    }

    /// Builds the vertex and fragment programs from every instance, in order.
    pub fn create_program_set(&mut self) -> Result<ProgramSet> {
        let mut programs = ProgramSet::new();
        for instance in &mut self.instances {
            instance.create_cpu_sub_programs(&mut programs)?;
        }
        Ok(programs)
    }

    /// Builds the programs and attaches compiled GPU programs to `pass`.
    pub fn acquire_programs(&mut self, pass: &mut Pass, manager: &mut ProgramManager) -> Result<()> {
        let programs = self.create_program_set()?;
        manager.acquire_gpu_programs(&programs, pass)
    }

    pub fn release_programs(&self, pass: &mut Pass, manager: &mut ProgramManager) {
        manager.release_gpu_programs(pass);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shader::ffp::{FfpColour, FfpLighting, FfpTransform};

    #[test]
    fn test_template_of_same_type_is_replaced() {
        let mut state = RenderState::new();
        state.add_template_sub_render_state(Box::new(FfpTransform::default()));
        state.add_template_sub_render_state(Box::new(FfpLighting::new(1)));
        state.add_template_sub_render_state(Box::new(FfpLighting::new(4)));

        assert_eq!(state.templates().len(), 2);
        assert_eq!(state.templates()[1].type_name(), FfpLighting::TYPE);
        assert!(state.remove_template_sub_render_state(FfpLighting::TYPE));
        assert!(!state.remove_template_sub_render_state(FfpLighting::TYPE));
    }

    #[test]
    fn test_link_drops_rejected_templates() {
        let mut templates = RenderState::new();
        templates.add_template_sub_render_state(Box::new(FfpTransform::default()));
        templates.add_template_sub_render_state(Box::new(FfpLighting::default()));
        templates.add_template_sub_render_state(Box::new(FfpColour::default()));

        let mut pass = Pass::default();
        pass.lighting_enabled = false;

        let mut target = TargetRenderState::new();
        target.link(&templates, &pass);

        let names: Vec<_> = target.instances().iter().map(|i| i.type_name()).collect();
        assert_eq!(names, [FfpTransform::TYPE, FfpColour::TYPE]);
    }

    #[test]
    fn test_program_set_collects_every_instance() {
        let mut target = TargetRenderState::new();
        target.add_sub_render_state_instance(Box::new(FfpTransform::default()));
        target.add_sub_render_state_instance(Box::new(FfpColour::default()));

        let programs = target.create_program_set().unwrap();
        assert_eq!(programs.vertex().invocations().len(), 2);
        assert_eq!(programs.fragment().invocations().len(), 1);
    }
}
