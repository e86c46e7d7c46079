//! Material Model
//!
//! The minimal material / technique / pass object model the shader generator
//! works against. A [`Material`] holds [`Technique`]s; each technique belongs
//! to a material scheme and owns its [`Pass`]es. A pass describes fixed
//! function state (lighting, colours, vertex colour tracking, texture units)
//! and has one program slot per stage that generated programs are attached to.
//!
//! Materials live in a [`MaterialManager`] and are addressed either through a
//! [`MaterialHandle`] or by `(name, group)`.

pub mod serializer;

use std::sync::Arc;

use bitflags::bitflags;
use glam::Vec4;
use rustc_hash::FxHashMap;
use slotmap::{SlotMap, new_key_type};

use crate::errors::{Result, ShaderGenError};
use crate::shader::program::GpuProgramType;
use crate::shader::program_manager::GpuProgram;

pub use serializer::{MaterialSerializer, MaterialSerializerListener, ScriptWriter};

/// Resource group used when none is given.
pub const DEFAULT_RESOURCE_GROUP: &str = "General";

/// Scheme of techniques created by default.
pub const DEFAULT_SCHEME_NAME: &str = "Default";

new_key_type! {
    pub struct MaterialHandle;
}

bitflags! {
    /// Which surface colours are taken from the vertex colour.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Default)]
    pub struct TrackVertexColour: u8 {
        const AMBIENT  = 1 << 0;
        const DIFFUSE  = 1 << 1;
        const SPECULAR = 1 << 2;
        const EMISSIVE = 1 << 3;
    }
}

/// How a texture unit combines with the colour computed so far.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum LayerBlendOperation {
    Replace,
    Add,
    #[default]
    Modulate,
    Subtract,
}

impl LayerBlendOperation {
    #[must_use]
    pub fn script_name(self) -> &'static str {
        match self {
            Self::Replace => "replace",
            Self::Add => "add",
            Self::Modulate => "modulate",
            Self::Subtract => "subtract",
        }
    }
}

/// A texture layer of a pass.
#[derive(Debug, Clone, PartialEq)]
pub struct TextureUnitState {
    pub texture_name: String,
    pub tex_coord_set: u8,
    pub colour_op: LayerBlendOperation,
}

impl TextureUnitState {
    #[must_use]
    pub fn new(texture_name: impl Into<String>) -> Self {
        Self {
            texture_name: texture_name.into(),
            tex_coord_set: 0,
            colour_op: LayerBlendOperation::default(),
        }
    }
}

// ─── Pass ────────────────────────────────────────────────────────────────────

/// One rendering pass.
#[derive(Debug, Clone)]
pub struct Pass {
    pub lighting_enabled: bool,
    pub ambient: Vec4,
    pub diffuse: Vec4,
    pub specular: Vec4,
    pub emissive: Vec4,
    pub shininess: f32,
    pub vertex_colour_tracking: TrackVertexColour,
    pub texture_units: Vec<TextureUnitState>,
    vertex_program: Option<Arc<GpuProgram>>,
    fragment_program: Option<Arc<GpuProgram>>,
}

impl Default for Pass {
    fn default() -> Self {
        Self {
            lighting_enabled: true,
            ambient: Vec4::ONE,
            diffuse: Vec4::ONE,
            specular: Vec4::new(0.0, 0.0, 0.0, 1.0),
            emissive: Vec4::new(0.0, 0.0, 0.0, 1.0),
            shininess: 0.0,
            vertex_colour_tracking: TrackVertexColour::empty(),
            texture_units: Vec::new(),
            vertex_program: None,
            fragment_program: None,
        }
    }
}

impl Pass {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_texture_unit(&mut self, unit: TextureUnitState) -> &mut TextureUnitState {
        self.texture_units.push(unit);
        let last = self.texture_units.len() - 1;
        &mut self.texture_units[last]
    }

    #[must_use]
    pub fn has_gpu_program(&self, ty: GpuProgramType) -> bool {
        self.gpu_program(ty).is_some()
    }

    #[must_use]
    pub fn gpu_program(&self, ty: GpuProgramType) -> Option<&Arc<GpuProgram>> {
        match ty {
            GpuProgramType::Vertex => self.vertex_program.as_ref(),
            GpuProgramType::Fragment => self.fragment_program.as_ref(),
        }
    }

    /// Replaces the program of a stage, returning the previous one.
    pub fn set_gpu_program(
        &mut self,
        ty: GpuProgramType,
        program: Option<Arc<GpuProgram>>,
    ) -> Option<Arc<GpuProgram>> {
        let slot = match ty {
            GpuProgramType::Vertex => &mut self.vertex_program,
            GpuProgramType::Fragment => &mut self.fragment_program,
        };
        std::mem::replace(slot, program)
    }

    /// A copy of the fixed function state without any attached program.
    #[must_use]
    pub fn clone_state(&self) -> Self {
        Self {
            vertex_program: None,
            fragment_program: None,
            ..self.clone()
        }
    }
}

// ─── Technique ───────────────────────────────────────────────────────────────

/// Identifier of a technique, stable across removals of other techniques.
pub type TechniqueId = u32;

#[derive(Debug, Clone)]
pub struct Technique {
    id: TechniqueId,
    scheme_name: String,
    passes: Vec<Pass>,
}

impl Technique {
    #[inline]
    #[must_use]
    pub fn id(&self) -> TechniqueId {
        self.id
    }

    #[must_use]
    pub fn scheme_name(&self) -> &str {
        &self.scheme_name
    }

    pub fn set_scheme_name(&mut self, scheme: impl Into<String>) {
        self.scheme_name = scheme.into();
    }

    #[must_use]
    pub fn passes(&self) -> &[Pass] {
        &self.passes
    }

    pub fn passes_mut(&mut self) -> &mut [Pass] {
        &mut self.passes
    }

    pub fn create_pass(&mut self) -> &mut Pass {
        self.add_pass(Pass::new())
    }

    pub fn add_pass(&mut self, pass: Pass) -> &mut Pass {
        self.passes.push(pass);
        let last = self.passes.len() - 1;
        &mut self.passes[last]
    }

    /// Whether any pass already uses a GPU program.
    #[must_use]
    pub fn is_programmable(&self) -> bool {
        self.passes.iter().any(|pass| {
            pass.has_gpu_program(GpuProgramType::Vertex)
                || pass.has_gpu_program(GpuProgramType::Fragment)
        })
    }
}

// ─── Material ────────────────────────────────────────────────────────────────

#[derive(Debug)]
pub struct Material {
    name: String,
    group: String,
    techniques: Vec<Technique>,
    next_technique_id: TechniqueId,
}

impl Material {
    /// Creates a material with one default technique holding one pass.
    #[must_use]
    pub fn new(name: impl Into<String>, group: impl Into<String>) -> Self {
        let mut material = Self {
            name: name.into(),
            group: group.into(),
            techniques: Vec::new(),
            next_technique_id: 0,
        };
        material.create_technique().create_pass();
        material
    }

    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[must_use]
    pub fn group(&self) -> &str {
        &self.group
    }

    #[must_use]
    pub fn techniques(&self) -> &[Technique] {
        &self.techniques
    }

    pub fn techniques_mut(&mut self) -> &mut [Technique] {
        &mut self.techniques
    }

    #[must_use]
    pub fn technique(&self, index: usize) -> Option<&Technique> {
        self.techniques.get(index)
    }

    pub fn technique_mut(&mut self, index: usize) -> Option<&mut Technique> {
        self.techniques.get_mut(index)
    }

    #[must_use]
    pub fn technique_by_id(&self, id: TechniqueId) -> Option<&Technique> {
        self.techniques.iter().find(|t| t.id == id)
    }

    pub fn technique_by_id_mut(&mut self, id: TechniqueId) -> Option<&mut Technique> {
        self.techniques.iter_mut().find(|t| t.id == id)
    }

    /// Appends an empty technique in the default scheme.
    pub fn create_technique(&mut self) -> &mut Technique {
        let id = self.next_technique_id;
        self.next_technique_id += 1;
        self.techniques.push(Technique {
            id,
            scheme_name: DEFAULT_SCHEME_NAME.to_string(),
            passes: Vec::new(),
        });
        let last = self.techniques.len() - 1;
        &mut self.techniques[last]
    }

    /// Removes a technique, returning it so its programs can be released.
    pub fn remove_technique_by_id(&mut self, id: TechniqueId) -> Option<Technique> {
        let index = self.techniques.iter().position(|t| t.id == id)?;
        Some(self.techniques.remove(index))
    }
}

// ─── MaterialManager ─────────────────────────────────────────────────────────

/// Owns every material, addressable by handle or by `(name, group)`.
#[derive(Debug, Default)]
pub struct MaterialManager {
    materials: SlotMap<MaterialHandle, Material>,
    lookup: FxHashMap<(String, String), MaterialHandle>,
}

impl MaterialManager {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Creates a material with a default technique and pass.
    pub fn create(&mut self, name: &str, group: &str) -> Result<MaterialHandle> {
        let key = (name.to_string(), group.to_string());
        if self.lookup.contains_key(&key) {
            return Err(ShaderGenError::DuplicateMaterial {
                name: key.0,
                group: key.1,
            });
        }
        let handle = self.materials.insert(Material::new(name, group));
        self.lookup.insert(key, handle);
        Ok(handle)
    }

    #[must_use]
    pub fn get(&self, handle: MaterialHandle) -> Option<&Material> {
        self.materials.get(handle)
    }

    pub fn get_mut(&mut self, handle: MaterialHandle) -> Option<&mut Material> {
        self.materials.get_mut(handle)
    }

    #[must_use]
    pub fn handle_of(&self, name: &str, group: &str) -> Option<MaterialHandle> {
        self.lookup
            .get(&(name.to_string(), group.to_string()))
            .copied()
    }

    #[must_use]
    pub fn get_by_name(&self, name: &str, group: &str) -> Option<&Material> {
        self.handle_of(name, group).and_then(|h| self.materials.get(h))
    }

    pub fn get_by_name_mut(&mut self, name: &str, group: &str) -> Option<&mut Material> {
        let handle = self.handle_of(name, group)?;
        self.materials.get_mut(handle)
    }

    pub fn remove(&mut self, handle: MaterialHandle) -> Option<Material> {
        let material = self.materials.remove(handle)?;
        self.lookup
            .remove(&(material.name.clone(), material.group.clone()));
        Some(material)
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.materials.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.materials.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (MaterialHandle, &Material)> {
        self.materials.iter()
    }
}
