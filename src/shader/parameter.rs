//! Operand / Parameter Model
//!
//! Parameters are the typed values generated code reads and writes: uniforms,
//! literal constants, stage inputs and outputs, locals and texture bindings.
//! An [`Operand`] wraps a parameter with its usage inside a single function
//! invocation and an optional component mask.
//!
//! Parameters are immutable once built and are shared through [`ParameterPtr`]
//! so that several invocations (and several sub-render-states) can refer to
//! the same value.

use std::fmt::Write as _;
use std::sync::Arc;

use bitflags::bitflags;
use glam::{Vec2, Vec3, Vec4};

// ─── Types ───────────────────────────────────────────────────────────────────

/// Data type of a shader parameter.
///
/// The declaration order is significant: it is the order used when function
/// invocations are compared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum GpuConstantType {
    Float1,
    Float2,
    Float3,
    Float4,
    Matrix3x3,
    Matrix4x4,
    Texture2d,
    Sampler,
}

impl GpuConstantType {
    /// Number of float components for scalar / vector types.
    #[must_use]
    pub fn float_count(self) -> Option<u32> {
        match self {
            Self::Float1 => Some(1),
            Self::Float2 => Some(2),
            Self::Float3 => Some(3),
            Self::Float4 => Some(4),
            _ => None,
        }
    }

    /// The scalar / vector type with `count` float components.
    #[must_use]
    pub fn float_of(count: u32) -> Option<Self> {
        match count {
            1 => Some(Self::Float1),
            2 => Some(Self::Float2),
            3 => Some(Self::Float3),
            4 => Some(Self::Float4),
            _ => None,
        }
    }

    /// Returns the WGSL type name.
    #[must_use]
    pub fn wgsl(self) -> &'static str {
        match self {
            Self::Float1 => "f32",
            Self::Float2 => "vec2f",
            Self::Float3 => "vec3f",
            Self::Float4 => "vec4f",
            Self::Matrix3x3 => "mat3x3f",
            Self::Matrix4x4 => "mat4x4f",
            Self::Texture2d => "texture_2d<f32>",
            Self::Sampler => "sampler",
        }
    }
}

/// Vertex attribute / varying meaning of a stage input or output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Semantic {
    Position,
    Normal,
    Tangent,
    Colour,
    TexCoord,
}

impl Semantic {
    /// Struct member name used for this semantic in stage interface structs.
    #[must_use]
    pub fn member_name(self, index: u8) -> String {
        match self {
            Self::Position => "position".to_string(),
            Self::Normal => "normal".to_string(),
            Self::Tangent => "tangent".to_string(),
            Self::Colour => format!("colour{index}"),
            Self::TexCoord => format!("texcoord{index}"),
        }
    }
}

/// Uniform values the engine fills in automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AutoConstant {
    WorldViewProjMatrix,
    /// Inverse transpose of the upper 3x3 of the world-view matrix.
    NormalMatrix,
    /// Scene ambient × surface ambient + surface emissive.
    DerivedSceneColour,
    SurfaceDiffuseColour,
    /// View space direction of directional light `n`.
    LightDirectionViewSpace(u32),
    /// Light `n` diffuse × surface diffuse.
    DerivedLightDiffuseColour(u32),
}

impl AutoConstant {
    /// Name of the uniform struct member that carries this constant.
    #[must_use]
    pub fn uniform_name(self) -> String {
        match self {
            Self::WorldViewProjMatrix => "world_view_proj_matrix".to_string(),
            Self::NormalMatrix => "normal_matrix".to_string(),
            Self::DerivedSceneColour => "derived_scene_colour".to_string(),
            Self::SurfaceDiffuseColour => "surface_diffuse_colour".to_string(),
            Self::LightDirectionViewSpace(n) => format!("light_direction_view_space{n}"),
            Self::DerivedLightDiffuseColour(n) => format!("derived_light_diffuse_colour{n}"),
        }
    }

    #[must_use]
    pub fn constant_type(self) -> GpuConstantType {
        match self {
            Self::WorldViewProjMatrix => GpuConstantType::Matrix4x4,
            Self::NormalMatrix => GpuConstantType::Matrix3x3,
            _ => GpuConstantType::Float4,
        }
    }
}

/// Literal value of a constant parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConstValue {
    Float(f32),
    Vec2(Vec2),
    Vec3(Vec3),
    Vec4(Vec4),
}

impl ConstValue {
    #[must_use]
    pub fn constant_type(self) -> GpuConstantType {
        match self {
            Self::Float(_) => GpuConstantType::Float1,
            Self::Vec2(_) => GpuConstantType::Float2,
            Self::Vec3(_) => GpuConstantType::Float3,
            Self::Vec4(_) => GpuConstantType::Float4,
        }
    }

    /// Renders the value as a WGSL literal expression.
    #[must_use]
    pub fn wgsl_literal(self) -> String {
        fn vector(ty: &str, components: &[f32]) -> String {
            let mut out = format!("{ty}(");
            for (i, c) in components.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                let _ = write!(out, "{c:?}");
            }
            out.push(')');
            out
        }

        match self {
            Self::Float(v) => format!("{v:?}"),
            Self::Vec2(v) => vector("vec2f", &v.to_array()),
            Self::Vec3(v) => vector("vec3f", &v.to_array()),
            Self::Vec4(v) => vector("vec4f", &v.to_array()),
        }
    }
}

// ─── Parameter ───────────────────────────────────────────────────────────────

/// Where a parameter lives in the generated program.
#[derive(Debug, Clone, PartialEq)]
pub enum ParameterKind {
    /// Member of the stage uniform block.
    Uniform(Option<AutoConstant>),
    /// Literal value, never declared.
    Constant(ConstValue),
    /// Stage input (vertex attribute or interpolated varying).
    Input { semantic: Semantic, index: u8 },
    /// Stage output (varying or render target).
    Output { semantic: Semantic, index: u8 },
    /// Function-local variable.
    Local,
    /// Texture of a texture unit.
    Texture { unit: u32 },
    /// Sampler of a texture unit.
    Sampler { unit: u32 },
}

/// A typed value used by generated code.
#[derive(Debug, Clone, PartialEq)]
pub struct Parameter {
    name: String,
    ty: GpuConstantType,
    kind: ParameterKind,
}

/// Shared handle to a [`Parameter`].
pub type ParameterPtr = Arc<Parameter>;

impl Parameter {
    #[must_use]
    pub fn new(name: impl Into<String>, ty: GpuConstantType, kind: ParameterKind) -> Self {
        Self {
            name: name.into(),
            ty,
            kind,
        }
    }

    #[inline]
    #[must_use]
    pub fn name(&self) -> &str {
        &self.name
    }

    #[inline]
    #[must_use]
    pub fn constant_type(&self) -> GpuConstantType {
        self.ty
    }

    #[inline]
    #[must_use]
    pub fn kind(&self) -> &ParameterKind {
        &self.kind
    }

    /// Stage interface semantic, for inputs and outputs.
    #[must_use]
    pub fn semantic(&self) -> Option<(Semantic, u8)> {
        match self.kind {
            ParameterKind::Input { semantic, index } | ParameterKind::Output { semantic, index } => {
                Some((semantic, index))
            }
            _ => None,
        }
    }

    /// Whether generated code may write to this parameter.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        matches!(self.kind, ParameterKind::Output { .. } | ParameterKind::Local)
    }
}

/// Constructors for the different parameter kinds.
pub struct ParameterFactory;

impl ParameterFactory {
    #[must_use]
    pub fn create_const_float(value: f32) -> ParameterPtr {
        Self::create_const(ConstValue::Float(value))
    }

    #[must_use]
    pub fn create_const_vec2(value: Vec2) -> ParameterPtr {
        Self::create_const(ConstValue::Vec2(value))
    }

    #[must_use]
    pub fn create_const_vec3(value: Vec3) -> ParameterPtr {
        Self::create_const(ConstValue::Vec3(value))
    }

    #[must_use]
    pub fn create_const_vec4(value: Vec4) -> ParameterPtr {
        Self::create_const(ConstValue::Vec4(value))
    }

    #[must_use]
    pub fn create_const(value: ConstValue) -> ParameterPtr {
        Arc::new(Parameter::new(
            value.wgsl_literal(),
            value.constant_type(),
            ParameterKind::Constant(value),
        ))
    }

    #[must_use]
    pub fn create_uniform(name: impl Into<String>, ty: GpuConstantType) -> ParameterPtr {
        Arc::new(Parameter::new(name, ty, ParameterKind::Uniform(None)))
    }

    #[must_use]
    pub fn create_auto_uniform(constant: AutoConstant) -> ParameterPtr {
        Arc::new(Parameter::new(
            constant.uniform_name(),
            constant.constant_type(),
            ParameterKind::Uniform(Some(constant)),
        ))
    }

    #[must_use]
    pub fn create_in(semantic: Semantic, index: u8, ty: GpuConstantType) -> ParameterPtr {
        Arc::new(Parameter::new(
            semantic.member_name(index),
            ty,
            ParameterKind::Input { semantic, index },
        ))
    }

    #[must_use]
    pub fn create_out(semantic: Semantic, index: u8, ty: GpuConstantType) -> ParameterPtr {
        Arc::new(Parameter::new(
            format!("o_{}", semantic.member_name(index)),
            ty,
            ParameterKind::Output { semantic, index },
        ))
    }

    #[must_use]
    pub fn create_local(name: impl Into<String>, ty: GpuConstantType) -> ParameterPtr {
        Arc::new(Parameter::new(name, ty, ParameterKind::Local))
    }

    #[must_use]
    pub fn create_texture(unit: u32) -> ParameterPtr {
        Arc::new(Parameter::new(
            format!("t_texture{unit}"),
            GpuConstantType::Texture2d,
            ParameterKind::Texture { unit },
        ))
    }

    #[must_use]
    pub fn create_sampler(unit: u32) -> ParameterPtr {
        Arc::new(Parameter::new(
            format!("s_texture{unit}"),
            GpuConstantType::Sampler,
            ParameterKind::Sampler { unit },
        ))
    }
}

// ─── Operand ─────────────────────────────────────────────────────────────────

bitflags! {
    /// Component selection applied to an operand.
    #[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
    pub struct OperandMask: u8 {
        const X    = 1 << 0;
        const Y    = 1 << 1;
        const Z    = 1 << 2;
        const W    = 1 << 3;
        const XY   = Self::X.bits() | Self::Y.bits();
        const XYZ  = Self::XY.bits() | Self::Z.bits();
        const XYZW = Self::XYZ.bits() | Self::W.bits();
    }
}

impl OperandMask {
    /// Number of selected components.
    #[inline]
    #[must_use]
    pub fn component_count(self) -> u32 {
        self.bits().count_ones()
    }

    /// Selected component letters in `xyzw` order.
    #[must_use]
    pub fn components(self) -> Vec<char> {
        [(Self::X, 'x'), (Self::Y, 'y'), (Self::Z, 'z'), (Self::W, 'w')]
            .into_iter()
            .filter(|(flag, _)| self.contains(*flag))
            .map(|(_, c)| c)
            .collect()
    }

    /// Swizzle suffix, e.g. `.xy`.
    #[must_use]
    pub fn swizzle(self) -> String {
        let mut out = String::from(".");
        out.extend(self.components());
        out
    }
}

/// How an invocation uses an operand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum OperandSemantic {
    In,
    Out,
    InOut,
}

impl OperandSemantic {
    /// Whether the invocation writes to the operand.
    #[inline]
    #[must_use]
    pub fn is_write(self) -> bool {
        matches!(self, Self::Out | Self::InOut)
    }
}

/// A parameter as used by one function invocation.
#[derive(Debug, Clone)]
pub struct Operand {
    parameter: ParameterPtr,
    semantic: OperandSemantic,
    mask: Option<OperandMask>,
}

impl Operand {
    /// `mask` of `None` selects the whole parameter.
    #[must_use]
    pub fn new(parameter: ParameterPtr, semantic: OperandSemantic, mask: Option<OperandMask>) -> Self {
        Self {
            parameter,
            semantic,
            mask: mask.filter(|m| !m.is_empty()),
        }
    }

    #[inline]
    #[must_use]
    pub fn parameter(&self) -> &ParameterPtr {
        &self.parameter
    }

    #[inline]
    #[must_use]
    pub fn semantic(&self) -> OperandSemantic {
        self.semantic
    }

    #[inline]
    #[must_use]
    pub fn mask(&self) -> Option<OperandMask> {
        self.mask
    }

    /// The type the called function sees for this operand.
    ///
    /// A mask turns the operand into the float vector with as many components
    /// as it selects; unmasked operands keep the parameter type.
    #[must_use]
    pub fn effective_type(&self) -> GpuConstantType {
        let ty = self.parameter.constant_type();
        match self.mask {
            Some(mask) if ty.float_count().is_some() => {
                GpuConstantType::float_of(mask.component_count()).unwrap_or(ty)
            }
            _ => ty,
        }
    }
}
