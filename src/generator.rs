//! Shader Generator
//!
//! [`ShaderGenerator`] is the entry point of the crate. It keeps, per material
//! scheme, the materials registered for shader generation and builds for each
//! of them an additional technique whose passes use generated programs.
//!
//! # Workflow
//!
//! ```rust,ignore
//! use myth_shadergen::{MaterialManager, ShaderGenerator, ShaderGeneratorSettings};
//! use myth_shadergen::material::DEFAULT_RESOURCE_GROUP;
//!
//! let mut generator = ShaderGenerator::new(ShaderGeneratorSettings::default())?;
//! let mut materials = MaterialManager::new();
//! let handle = materials.create("Rock", DEFAULT_RESOURCE_GROUP)?;
//!
//! // 1. Register technique 0 of the material for the "Generated" scheme
//! generator.create_shader_based_technique(materials.get(handle).unwrap(), 0, "Generated");
//!
//! // 2. Build the generated technique (technique 1)
//! generator.validate_material(&mut materials, "Generated", "Rock", DEFAULT_RESOURCE_GROUP)?;
//! ```
//!
//! # Template composition
//!
//! The sub-render-states of a generated pass are linked in three layers, later
//! layers replacing same-typed entries of earlier ones:
//!
//! 1. the fixed-function emulation derived from the source pass
//!    (transform, lighting, colour, texturing);
//! 2. the scheme-wide templates of [`get_render_state`](ShaderGenerator::get_render_state);
//! 3. the per-pass templates of
//!    [`get_material_render_state`](ShaderGenerator::get_material_render_state).

use std::any::Any;

use rustc_hash::FxHashMap;

use crate::errors::Result;
use crate::material::{
    Material, MaterialHandle, MaterialManager, MaterialSerializerListener, Pass, ScriptWriter,
    Technique, TechniqueId,
};
use crate::material::serializer::quoted;
use crate::settings::ShaderGeneratorSettings;
use crate::shader::compiler::ProgramCompiler;
use crate::shader::ffp::{self, FfpColour, FfpLighting, FfpTexturing, FfpTransform};
use crate::shader::program_manager::ProgramManager;
use crate::shader::render_state::{RenderState, TargetRenderState};
use crate::shader::sub_render_state::SubRenderState;

/// A material registered in a scheme.
#[derive(Debug)]
struct SgMaterial {
    name: String,
    group: String,
    src_technique: TechniqueId,
    dst_technique: Option<TechniqueId>,
    /// Custom templates per source pass.
    pass_states: Vec<Option<RenderState>>,
    build_required: bool,
}

impl SgMaterial {
    fn is(&self, name: &str, group: &str) -> bool {
        self.name == name && self.group == group
    }

    /// The generated technique is no longer on `material`, which happens when
    /// the material was removed and created again under the same name.
    fn lost_generated_technique(&self, material: &Material, scheme: &str) -> bool {
        self.dst_technique.is_some_and(|id| {
            material
                .technique_by_id(id)
                .is_none_or(|t| t.scheme_name() != scheme)
        })
    }

    fn is_stale(&self, material: &Material, scheme: &str) -> bool {
        material.technique_by_id(self.src_technique).is_none()
            || self.lost_generated_technique(material, scheme)
    }
}

#[derive(Debug, Default)]
struct SgScheme {
    render_state: RenderState,
    materials: Vec<SgMaterial>,
}

/// Generates shader based techniques for registered materials.
#[derive(Debug)]
pub struct ShaderGenerator {
    settings: ShaderGeneratorSettings,
    program_manager: ProgramManager,
    ffp_render_state: RenderState,
    schemes: FxHashMap<String, SgScheme>,
}

impl ShaderGenerator {
    /// Creates a generator compiling through naga.
    pub fn new(settings: ShaderGeneratorSettings) -> Result<Self> {
        let program_manager = ProgramManager::new(&settings.target_language)?;
        Ok(Self::from_parts(settings, program_manager))
    }

    /// Creates a generator with a custom program compiler.
    pub fn with_compiler(
        settings: ShaderGeneratorSettings,
        compiler: Box<dyn ProgramCompiler>,
    ) -> Result<Self> {
        let program_manager = ProgramManager::with_compiler(&settings.target_language, compiler)?;
        Ok(Self::from_parts(settings, program_manager))
    }

    fn from_parts(settings: ShaderGeneratorSettings, mut program_manager: ProgramManager) -> Self {
        program_manager.set_cache_path(settings.shader_cache_path.clone());
        program_manager.set_log_source(settings.log_generated_source);

        let mut ffp_render_state = RenderState::new();
        ffp_render_state.add_template_sub_render_state(Box::new(FfpTransform::default()));
        ffp_render_state.add_template_sub_render_state(Box::new(FfpLighting::new(settings.light_count)));
        ffp_render_state.add_template_sub_render_state(Box::new(FfpColour::default()));
        ffp_render_state.add_template_sub_render_state(Box::new(FfpTexturing::default()));

        Self {
            settings,
            program_manager,
            ffp_render_state,
            schemes: FxHashMap::default(),
        }
    }

    #[must_use]
    pub fn settings(&self) -> &ShaderGeneratorSettings {
        &self.settings
    }

    #[must_use]
    pub fn target_language(&self) -> &str {
        &self.settings.target_language
    }

    /// Switches the shading language. Every scheme is invalidated.
    pub fn set_target_language(&mut self, language: &str) -> Result<()> {
        self.program_manager.set_target_language(language)?;
        self.settings.target_language = language.to_string();
        for scheme in self.schemes.keys().cloned().collect::<Vec<_>>() {
            self.invalidate_scheme(&scheme);
        }
        Ok(())
    }

    #[must_use]
    pub fn program_manager(&self) -> &ProgramManager {
        &self.program_manager
    }

    pub fn program_manager_mut(&mut self) -> &mut ProgramManager {
        &mut self.program_manager
    }

    // ========================================================================
    // Sub-render-states
    // ========================================================================

    /// Creates a sub-render-state configured from the generator settings.
    #[must_use]
    pub fn create_sub_render_state<T: SubRenderState + Default + 'static>(&self) -> Box<T> {
        let mut state = Box::new(T::default());
        let any: &mut dyn Any = &mut *state;
        if let Some(lighting) = any.downcast_mut::<FfpLighting>() {
            lighting.set_light_count(self.settings.light_count);
        }
        state
    }

    /// Creates a sub-render-state from its type name, e.g. `colour_stage`.
    pub fn create_sub_render_state_by_type(&self, type_name: &str) -> Result<Box<dyn SubRenderState>> {
        if type_name == FfpLighting::TYPE {
            return Ok(Box::new(FfpLighting::new(self.settings.light_count)));
        }
        ffp::create_by_type(type_name)
    }

    // ========================================================================
    // Technique management
    // ========================================================================

    /// Registers technique `technique_index` of `material` for generation in
    /// `scheme`.
    ///
    /// Returns `false` when the technique does not exist or already uses GPU
    /// programs, when the material already has a technique in `scheme`, or
    /// when the material is already registered for `scheme`.
    pub fn create_shader_based_technique(
        &mut self,
        material: &Material,
        technique_index: usize,
        scheme: &str,
    ) -> bool {
        let Some(technique) = material.technique(technique_index) else {
            log::warn!(
                "Material '{}' has no technique {technique_index}",
                material.name()
            );
            return false;
        };

        if technique.is_programmable() {
            log::warn!(
                "Technique {technique_index} of material '{}' already uses GPU programs",
                material.name()
            );
            return false;
        }

        if material
            .techniques()
            .iter()
            .any(|t| t.scheme_name() == scheme)
        {
            log::warn!(
                "Material '{}' already has a technique in scheme '{scheme}'",
                material.name()
            );
            return false;
        }

        let entry = self.schemes.entry(scheme.to_string()).or_default();
        if let Some(position) = entry
            .materials
            .iter()
            .position(|m| m.is(material.name(), material.group()))
        {
            if !entry.materials[position].is_stale(material, scheme) {
                log::warn!(
                    "Material '{}' is already registered in scheme '{scheme}'",
                    material.name()
                );
                return false;
            }
            log::debug!(
                "Dropping stale registration of material '{}' in scheme '{scheme}'",
                material.name()
            );
            entry.materials.remove(position);
            self.program_manager.evict_orphaned();
        }

        entry.materials.push(SgMaterial {
            name: material.name().to_string(),
            group: material.group().to_string(),
            src_technique: technique.id(),
            dst_technique: None,
            pass_states: vec![None; technique.passes().len()],
            build_required: true,
        });

        log::debug!(
            "Registered material '{}' technique {technique_index} for scheme '{scheme}'",
            material.name()
        );
        true
    }

    /// Whether technique `technique_index` of `material` is registered in `scheme`.
    #[must_use]
    pub fn has_shader_based_technique(
        &self,
        material: &Material,
        technique_index: usize,
        scheme: &str,
    ) -> bool {
        let Some(technique) = material.technique(technique_index) else {
            return false;
        };
        self.schemes.get(scheme).is_some_and(|s| {
            s.materials.iter().any(|m| {
                m.is(material.name(), material.group()) && m.src_technique == technique.id()
            })
        })
    }

    /// Removes the generated technique of `material` in `scheme` and
    /// unregisters the material. Source techniques are never touched.
    pub fn remove_shader_based_technique(
        &mut self,
        material: &mut Material,
        technique_index: usize,
        scheme: &str,
    ) -> bool {
        let Some(src_id) = material.technique(technique_index).map(Technique::id) else {
            return false;
        };
        let Some(entry) = self.schemes.get_mut(scheme) else {
            return false;
        };
        let Some(position) = entry.materials.iter().position(|m| {
            m.is(material.name(), material.group()) && m.src_technique == src_id
        }) else {
            return false;
        };

        let removed = entry.materials.remove(position);
        if let Some(dst) = removed.dst_technique {
            Self::destroy_technique(&mut self.program_manager, material, dst, scheme);
        }

        log::debug!(
            "Removed shader based technique of material '{}' from scheme '{scheme}'",
            material.name()
        );
        true
    }

    /// Removes every generated technique of every scheme.
    pub fn remove_all_shader_based_techniques(&mut self, materials: &mut MaterialManager) {
        let schemes: Vec<String> = self.schemes.keys().cloned().collect();
        for scheme in schemes {
            self.remove_scheme(materials, &scheme);
        }
    }

    /// Removes a material from `materials` after destroying its generated
    /// techniques and dropping its registrations in every scheme.
    ///
    /// Removing a registered material straight from the [`MaterialManager`]
    /// keeps its programs cached until the registration is found stale.
    pub fn remove_material(
        &mut self,
        materials: &mut MaterialManager,
        handle: MaterialHandle,
    ) -> Option<Material> {
        let material = materials.get_mut(handle)?;
        for (scheme, entry) in &mut self.schemes {
            entry.materials.retain(|registered| {
                if !registered.is(material.name(), material.group()) {
                    return true;
                }
                if let Some(dst) = registered.dst_technique {
                    Self::destroy_technique(&mut self.program_manager, material, dst, scheme);
                }
                log::debug!(
                    "Unregistered material '{}' from scheme '{scheme}'",
                    registered.name
                );
                false
            });
        }
        materials.remove(handle)
    }

    /// Removes generated technique `id` unless it was replaced by a technique
    /// of another scheme.
    fn destroy_technique(
        program_manager: &mut ProgramManager,
        material: &mut Material,
        id: TechniqueId,
        scheme: &str,
    ) {
        if material
            .technique_by_id(id)
            .is_none_or(|t| t.scheme_name() != scheme)
        {
            return;
        }
        if let Some(mut technique) = material.remove_technique_by_id(id) {
            for pass in technique.passes_mut() {
                program_manager.release_gpu_programs(pass);
            }
        }
    }

    // ========================================================================
    // Schemes
    // ========================================================================

    /// Scheme names in alphabetical order.
    #[must_use]
    pub fn scheme_names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.schemes.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// Scheme-wide templates, creating the scheme if needed.
    pub fn get_render_state(&mut self, scheme: &str) -> &mut RenderState {
        &mut self.schemes.entry(scheme.to_string()).or_default().render_state
    }

    /// Custom templates of one pass of a registered material.
    ///
    /// The material is rebuilt on its next validation. Returns `None` when the
    /// material is not registered in `scheme` or has no such pass.
    pub fn get_material_render_state(
        &mut self,
        scheme: &str,
        name: &str,
        group: &str,
        pass_index: usize,
    ) -> Option<&mut RenderState> {
        let entry = self
            .schemes
            .get_mut(scheme)?
            .materials
            .iter_mut()
            .find(|m| m.is(name, group))?;

        entry.build_required = true;
        entry
            .pass_states
            .get_mut(pass_index)
            .map(|state| state.get_or_insert_with(RenderState::new))
    }

    /// Marks every material of `scheme` for rebuilding.
    pub fn invalidate_scheme(&mut self, scheme: &str) -> bool {
        let Some(entry) = self.schemes.get_mut(scheme) else {
            return false;
        };
        for material in &mut entry.materials {
            material.build_required = true;
        }
        true
    }

    /// Marks one material of `scheme` for rebuilding.
    pub fn invalidate_material(&mut self, scheme: &str, name: &str, group: &str) -> bool {
        let Some(material) = self
            .schemes
            .get_mut(scheme)
            .and_then(|s| s.materials.iter_mut().find(|m| m.is(name, group)))
        else {
            return false;
        };
        material.build_required = true;
        true
    }

    /// Validates every material registered in `scheme`.
    ///
    /// Stops at the first material that fails to build.
    pub fn validate_scheme(&mut self, materials: &mut MaterialManager, scheme: &str) -> Result<bool> {
        let Some(entry) = self.schemes.get(scheme) else {
            return Ok(false);
        };
        let registered: Vec<(String, String)> = entry
            .materials
            .iter()
            .map(|m| (m.name.clone(), m.group.clone()))
            .collect();

        let mut all_valid = true;
        for (name, group) in registered {
            all_valid &= self.validate_material(materials, scheme, &name, &group)?;
        }
        Ok(all_valid)
    }

    /// Removes the generated techniques of `scheme` and forgets the scheme.
    pub fn remove_scheme(&mut self, materials: &mut MaterialManager, scheme: &str) -> bool {
        let Some(entry) = self.schemes.remove(scheme) else {
            return false;
        };
        for registered in entry.materials {
            let (Some(dst), Some(material)) = (
                registered.dst_technique,
                materials.get_by_name_mut(&registered.name, &registered.group),
            ) else {
                continue;
            };
            Self::destroy_technique(&mut self.program_manager, material, dst, scheme);
        }
        log::debug!("Removed scheme '{scheme}'");
        true
    }

    // ========================================================================
    // Validation
    // ========================================================================

    /// Builds the generated technique of a registered material.
    ///
    /// Returns `Ok(false)` when the material is not registered in `scheme` or
    /// does not exist anymore. Up to date materials are not rebuilt; a
    /// material whose generated technique disappeared is. On error
    /// the material keeps the techniques it had.
    pub fn validate_material(
        &mut self,
        materials: &mut MaterialManager,
        scheme: &str,
        name: &str,
        group: &str,
    ) -> Result<bool> {
        let Some(entry) = self.schemes.get_mut(scheme) else {
            return Ok(false);
        };
        let Some(registered) = entry.materials.iter_mut().find(|m| m.is(name, group)) else {
            return Ok(false);
        };
        let Some(material) = materials.get_by_name_mut(name, group) else {
            log::warn!("Registered material '{name}' ({group}) does not exist");
            return Ok(false);
        };

        if registered.lost_generated_technique(material, scheme) {
            log::warn!(
                "Generated technique of material '{name}' in scheme '{scheme}' is gone, rebuilding"
            );
            registered.dst_technique = None;
            registered.build_required = true;
            self.program_manager.evict_orphaned();
        }
        if !registered.build_required {
            return Ok(true);
        }
        let Some(src) = material.technique_by_id(registered.src_technique) else {
            log::warn!("Source technique of material '{name}' was removed");
            return Ok(false);
        };

        let passes = Self::build_passes(
            &mut self.program_manager,
            &self.ffp_render_state,
            &entry.render_state,
            &registered.pass_states,
            src.passes(),
        )?;

        if let Some(previous) = registered.dst_technique.take() {
            Self::destroy_technique(&mut self.program_manager, material, previous, scheme);
        }

        let technique = material.create_technique();
        technique.set_scheme_name(scheme);
        for pass in passes {
            technique.add_pass(pass);
        }
        registered.dst_technique = Some(technique.id());
        registered.build_required = false;

        log::info!("Built shader based technique for material '{name}' in scheme '{scheme}'");
        Ok(true)
    }

    fn build_passes(
        program_manager: &mut ProgramManager,
        ffp_state: &RenderState,
        scheme_state: &RenderState,
        pass_states: &[Option<RenderState>],
        src_passes: &[Pass],
    ) -> Result<Vec<Pass>> {
        let mut built: Vec<Pass> = Vec::with_capacity(src_passes.len());

        for (index, src_pass) in src_passes.iter().enumerate() {
            let mut target = TargetRenderState::new();
            target.link(ffp_state, src_pass);
            target.link(scheme_state, src_pass);
            if let Some(Some(custom)) = pass_states.get(index) {
                target.link(custom, src_pass);
            }

            let mut pass = src_pass.clone_state();
            if let Err(err) = target.acquire_programs(&mut pass, program_manager) {
                for pass in &mut built {
                    program_manager.release_gpu_programs(pass);
                }
                return Err(err);
            }
            built.push(pass);
        }

        Ok(built)
    }

    // ========================================================================
    // Serialization
    // ========================================================================

    /// Listener hiding generated techniques from exported scripts and writing
    /// the custom sub-render-states of registered passes.
    #[must_use]
    pub fn material_serializer_listener(&self) -> Box<dyn MaterialSerializerListener + '_> {
        Box::new(SgSerializerListener { generator: self })
    }
}

struct SgSerializerListener<'a> {
    generator: &'a ShaderGenerator,
}

impl MaterialSerializerListener for SgSerializerListener<'_> {
    fn skip_technique(&self, material: &Material, technique: &Technique) -> bool {
        self.generator.schemes.values().any(|scheme| {
            scheme.materials.iter().any(|m| {
                m.is(material.name(), material.group()) && m.dst_technique == Some(technique.id())
            })
        })
    }

    fn write_pass_attributes(
        &self,
        writer: &mut ScriptWriter,
        material: &Material,
        technique: &Technique,
        pass_index: usize,
    ) {
        for scheme in self.generator.scheme_names() {
            let Some(state) = self.generator.schemes[scheme]
                .materials
                .iter()
                .filter(|m| {
                    m.is(material.name(), material.group()) && m.src_technique == technique.id()
                })
                .find_map(|m| m.pass_states.get(pass_index).and_then(Option::as_ref))
            else {
                continue;
            };
            if state.is_empty() {
                continue;
            }

            writer.begin_section(&format!("rtshader_system {}", quoted(scheme)));
            for template in state.templates() {
                template.write_script(writer);
            }
            writer.end_section();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::material::DEFAULT_RESOURCE_GROUP;

    fn setup() -> (ShaderGenerator, MaterialManager) {
        let generator = ShaderGenerator::new(ShaderGeneratorSettings::default()).unwrap();
        let mut materials = MaterialManager::new();
        materials.create("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
        (generator, materials)
    }

    #[test]
    fn test_register_twice_fails() {
        let (mut generator, materials) = setup();
        let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();

        assert!(generator.create_shader_based_technique(material, 0, "MyScheme"));
        assert!(!generator.create_shader_based_technique(material, 0, "MyScheme"));
        assert!(generator.has_shader_based_technique(material, 0, "MyScheme"));
        assert!(!generator.has_shader_based_technique(material, 0, "Other"));
    }

    #[test]
    fn test_invalid_technique_index_fails() {
        let (mut generator, materials) = setup();
        let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
        assert!(!generator.create_shader_based_technique(material, 3, "MyScheme"));
        assert!(generator.scheme_names().is_empty());
    }

    #[test]
    fn test_unregistered_material_does_not_validate() {
        let (mut generator, mut materials) = setup();
        assert!(
            !generator
                .validate_material(&mut materials, "MyScheme", "TestMat", DEFAULT_RESOURCE_GROUP)
                .unwrap()
        );
    }

    #[test]
    fn test_created_lighting_follows_settings() {
        let settings = ShaderGeneratorSettings {
            light_count: 3,
            ..Default::default()
        };
        let generator = ShaderGenerator::new(settings).unwrap();
        assert_eq!(generator.create_sub_render_state::<FfpLighting>().light_count(), 3);
    }

    #[test]
    fn test_material_render_state_needs_registration() {
        let (mut generator, materials) = setup();
        assert!(
            generator
                .get_material_render_state("MyScheme", "TestMat", DEFAULT_RESOURCE_GROUP, 0)
                .is_none()
        );

        let material = materials.get_by_name("TestMat", DEFAULT_RESOURCE_GROUP).unwrap();
        generator.create_shader_based_technique(material, 0, "MyScheme");
        assert!(
            generator
                .get_material_render_state("MyScheme", "TestMat", DEFAULT_RESOURCE_GROUP, 0)
                .is_some()
        );
        assert!(
            generator
                .get_material_render_state("MyScheme", "TestMat", DEFAULT_RESOURCE_GROUP, 1)
                .is_none()
        );
    }
}
