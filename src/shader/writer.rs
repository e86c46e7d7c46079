//! Program Writers
//!
//! Turns a CPU-side [`Program`] into shader source text. The WGSL writer
//! renders the `program` template with the minijinja engine and inlines the
//! `FFPLib_*` function libraries the program depends on. Templates and
//! libraries are embedded into the binary with `rust-embed`.
//!
//! Writing is deterministic: stage interface members are ordered by semantic,
//! uniforms and locals by name, and invocations by group (insertion order
//! within a group). Two programs describing the same code therefore produce
//! byte-identical source, which is what the content-addressed program cache
//! relies on.

use std::borrow::Cow;
use std::collections::BTreeSet;
use std::sync::OnceLock;

use minijinja::{Environment, Error, ErrorKind, syntax::SyntaxConfig};
use rust_embed::RustEmbed;
use serde::Serialize;

use crate::errors::{Result, ShaderGenError};

use super::function::FunctionInvocation;
use super::parameter::{
    AutoConstant, GpuConstantType, Operand, OperandMask, OperandSemantic, ParameterKind,
    ParameterPtr, Semantic,
};
use super::program::{GpuProgramType, Program};

pub static SHADER_ENV: OnceLock<Environment<'static>> = OnceLock::new();

#[derive(RustEmbed)]
#[folder = "src/shader/shaders"]
struct ShaderAssets;

/// Shared template environment.
pub fn get_env() -> &'static Environment<'static> {
    SHADER_ENV.get_or_init(|| {
        let mut env = Environment::new();

        let syntax = SyntaxConfig::builder()
            .block_delimiters("{$", "$}")
            .variable_delimiters("{{", "}}")
            .line_statement_prefix("$$")
            .build()
            .expect("Failed to configure Jinja2 syntax");

        env.set_syntax(syntax);
        env.set_trim_blocks(true);
        env.set_lstrip_blocks(true);
        env.set_undefined_behavior(minijinja::UndefinedBehavior::SemiStrict);

        env.set_loader(shader_loader);

        env
    })
}

fn shader_loader(name: &str) -> std::result::Result<Option<String>, Error> {
    let filename = if std::path::Path::new(name)
        .extension()
        .is_some_and(|ext| ext.eq_ignore_ascii_case("wgsl"))
    {
        Cow::Borrowed(name)
    } else {
        Cow::Owned(format!("{name}.wgsl"))
    };

    match ShaderAssets::get(&filename) {
        Some(file) => std::str::from_utf8(file.data.as_ref())
            .map(|source| Some(source.to_string()))
            .map_err(|e| {
                Error::new(
                    ErrorKind::TemplateNotFound,
                    format!("Template '{filename}' is not valid UTF-8: {e}"),
                )
            }),
        None => Ok(None),
    }
}

/// Returns the source of an embedded function library, e.g. `FFPLib_Common`.
pub fn load_library(name: &str) -> Result<String> {
    ShaderAssets::get(&format!("lib/{name}.wgsl"))
        .and_then(|file| std::str::from_utf8(file.data.as_ref()).ok().map(str::to_string))
        .ok_or_else(|| ShaderGenError::LibraryNotFound(name.to_string()))
}

// ─── Writer trait ────────────────────────────────────────────────────────────

/// A uniform declared by a written program.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UniformInfo {
    pub name: String,
    pub ty: GpuConstantType,
    pub auto_constant: Option<AutoConstant>,
}

/// Output of a [`ProgramWriter`].
#[derive(Debug, Clone)]
pub struct ProgramSource {
    pub source: String,
    /// Uniform block members in declaration order.
    pub uniforms: Vec<UniformInfo>,
}

/// Emits source code for one shading language.
pub trait ProgramWriter: Send + Sync {
    /// Language identifier, e.g. `"wgsl"`.
    fn target_language(&self) -> &str;

    fn write_source(&self, program: &Program) -> Result<ProgramSource>;
}

/// Returns the writer for a shading language.
///
/// GLSL programs are written as WGSL and translated after compilation.
pub fn writer_for_language(language: &str) -> Result<Box<dyn ProgramWriter>> {
    if language.eq_ignore_ascii_case(WgslProgramWriter::LANGUAGE)
        || language.eq_ignore_ascii_case("glsl")
    {
        Ok(Box::new(WgslProgramWriter))
    } else {
        Err(ShaderGenError::UnsupportedLanguage(language.to_string()))
    }
}

// ─── Declarations ────────────────────────────────────────────────────────────

/// Every parameter a program needs declared, whether resolved through the
/// program or only referenced by an invocation operand.
#[derive(Default)]
struct Declarations {
    uniforms: Vec<ParameterPtr>,
    textures: Vec<ParameterPtr>,
    inputs: Vec<ParameterPtr>,
    outputs: Vec<ParameterPtr>,
    locals: Vec<ParameterPtr>,
}

impl Declarations {
    fn collect(program: &Program) -> Result<Self> {
        let mut decl = Self::default();

        let declared = program
            .uniforms()
            .iter()
            .chain(program.textures())
            .chain(program.inputs())
            .chain(program.outputs())
            .chain(program.locals());
        let referenced = program
            .invocations()
            .iter()
            .flat_map(|inv| inv.operands().iter().map(Operand::parameter));

        for param in declared.chain(referenced) {
            decl.insert(param)?;
        }

        decl.uniforms.sort_by(|a, b| a.name().cmp(b.name()));
        decl.locals.sort_by(|a, b| a.name().cmp(b.name()));
        decl.inputs.sort_by_key(|p| p.semantic());
        decl.outputs.sort_by_key(|p| p.semantic());
        decl.textures.sort_by_key(texture_binding);

        Ok(decl)
    }

    fn insert(&mut self, param: &ParameterPtr) -> Result<()> {
        let list = match param.kind() {
            ParameterKind::Constant(_) => return Ok(()),
            ParameterKind::Uniform(_) => &mut self.uniforms,
            ParameterKind::Input { .. } => &mut self.inputs,
            ParameterKind::Output { .. } => &mut self.outputs,
            ParameterKind::Local => &mut self.locals,
            ParameterKind::Texture { .. } | ParameterKind::Sampler { .. } => &mut self.textures,
        };

        if let Some(existing) = list.iter().find(|p| p.name() == param.name()) {
            if existing.constant_type() != param.constant_type() {
                return Err(ShaderGenError::ParameterConflict {
                    name: param.name().to_string(),
                    existing: existing.constant_type().wgsl(),
                    requested: param.constant_type().wgsl(),
                });
            }
            return Ok(());
        }

        list.push(param.clone());
        Ok(())
    }
}

fn texture_binding(param: &ParameterPtr) -> u32 {
    match param.kind() {
        ParameterKind::Texture { unit } => unit * 2,
        ParameterKind::Sampler { unit } => unit * 2 + 1,
        _ => u32::MAX,
    }
}

// ─── Stage interface locations ───────────────────────────────────────────────

fn vertex_attribute_location(semantic: Semantic, index: u8) -> Option<u32> {
    let index = u32::from(index);
    match semantic {
        Semantic::Position if index == 0 => Some(0),
        Semantic::Normal if index == 0 => Some(1),
        Semantic::Tangent if index == 0 => Some(2),
        Semantic::Colour if index < 2 => Some(3 + index),
        Semantic::TexCoord if index < 8 => Some(5 + index),
        _ => None,
    }
}

fn varying_location(semantic: Semantic, index: u8) -> Option<u32> {
    let index = u32::from(index);
    match semantic {
        Semantic::Colour if index < 2 => Some(index),
        Semantic::TexCoord if index < 8 => Some(2 + index),
        Semantic::Normal if index == 0 => Some(10),
        Semantic::Tangent if index == 0 => Some(11),
        _ => None,
    }
}

// ─── WGSL ────────────────────────────────────────────────────────────────────

#[derive(Serialize)]
struct Member {
    name: String,
    ty: &'static str,
    attribute: String,
    source: Option<String>,
}

#[derive(Serialize)]
struct Variable {
    name: String,
    ty: &'static str,
}

#[derive(Serialize)]
struct TextureBinding {
    name: String,
    ty: &'static str,
    binding: u32,
}

#[derive(Serialize)]
struct ProgramContext {
    stage: &'static str,
    signatures: Vec<String>,
    libraries: Vec<String>,
    uniforms: Vec<Variable>,
    uniform_binding: u32,
    textures: Vec<TextureBinding>,
    input_struct: &'static str,
    inputs: Vec<Member>,
    output_struct: &'static str,
    outputs: Vec<Member>,
    locals: Vec<Variable>,
    body: Vec<String>,
}

/// Writes WGSL source.
#[derive(Debug, Default, Clone, Copy)]
pub struct WgslProgramWriter;

impl WgslProgramWriter {
    pub const LANGUAGE: &'static str = "wgsl";

    fn interface_member(
        param: &ParameterPtr,
        program_type: GpuProgramType,
        is_output: bool,
    ) -> Result<Member> {
        let (semantic, index) = param.semantic().unwrap_or((Semantic::Position, 0));

        let location = |loc: u32| format!("@location({loc})");
        let attribute = match (program_type, is_output) {
            (GpuProgramType::Vertex, false) => vertex_attribute_location(semantic, index).map(location),
            (GpuProgramType::Fragment, true) => {
                (semantic == Semantic::Colour).then(|| location(u32::from(index)))
            }
            _ if semantic == Semantic::Position => Some("@builtin(position)".to_string()),
            _ => varying_location(semantic, index).map(location),
        };

        let attribute = attribute.ok_or_else(|| ShaderGenError::UnsupportedSemantic {
            semantic: semantic.member_name(index),
            stage: program_type.name(),
            direction: if is_output { "output" } else { "input" },
        })?;

        Ok(Member {
            name: semantic.member_name(index),
            ty: param.constant_type().wgsl(),
            attribute,
            source: is_output.then(|| param.name().to_string()),
        })
    }

    fn read_expression(operand: &Operand, function: &str) -> Result<String> {
        let param = operand.parameter();
        let base = match param.kind() {
            ParameterKind::Uniform(_) => format!("u.{}", param.name()),
            ParameterKind::Input { .. } => format!("input.{}", param.name()),
            _ => param.name().to_string(),
        };

        match Self::checked_mask(operand, function)? {
            Some(mask) => Ok(format!("{base}{}", mask.swizzle())),
            None => Ok(base),
        }
    }

    /// The operand mask, or `None` when the whole parameter is used.
    fn checked_mask(
        operand: &Operand,
        function: &str,
    ) -> Result<Option<OperandMask>> {
        let Some(mask) = operand.mask() else {
            return Ok(None);
        };
        let param = operand.parameter();

        let Some(count) = param.constant_type().float_count() else {
            return Err(ShaderGenError::InvalidOperand {
                function: function.to_string(),
                parameter: param.name().to_string(),
                reason: "component masks only apply to scalar and vector parameters",
            });
        };

        // Highest selected component must exist in the parameter.
        let highest = u8::BITS - mask.bits().leading_zeros();
        if highest > count {
            return Err(ShaderGenError::InvalidOperand {
                function: function.to_string(),
                parameter: param.name().to_string(),
                reason: "mask selects components the parameter does not have",
            });
        }

        // Scalars cannot be swizzled.
        Ok((count > 1).then_some(mask))
    }

    fn write_invocation(
        invocation: &FunctionInvocation,
        temp_counter: &mut usize,
        body: &mut Vec<String>,
    ) -> Result<()> {
        let function = invocation.function_name();
        let mut args = Vec::with_capacity(invocation.operands().len());
        let mut write_backs = Vec::new();

        for operand in invocation.operands() {
            let param = operand.parameter();

            if !operand.semantic().is_write() {
                args.push(Self::read_expression(operand, function)?);
                continue;
            }

            if !param.is_writable() {
                return Err(ShaderGenError::InvalidOperand {
                    function: function.to_string(),
                    parameter: param.name().to_string(),
                    reason: "only outputs and locals can be written",
                });
            }

            match Self::checked_mask(operand, function)? {
                None => args.push(format!("&{}", param.name())),
                Some(mask) => {
                    // Pointers cannot address a swizzle: go through a temporary
                    // and copy the selected components back afterwards.
                    let temp = format!("tmp{temp_counter}");
                    *temp_counter += 1;
                    let ty = operand.effective_type().wgsl();

                    if operand.semantic() == OperandSemantic::InOut {
                        body.push(format!("var {temp}: {ty} = {}{};", param.name(), mask.swizzle()));
                    } else {
                        body.push(format!("var {temp}: {ty};"));
                    }
                    args.push(format!("&{temp}"));

                    let components = mask.components();
                    if components.len() == 1 {
                        write_backs.push(format!("{}.{} = {temp};", param.name(), components[0]));
                    } else {
                        for (src, dst) in ['x', 'y', 'z', 'w'].iter().zip(components.iter()) {
                            write_backs.push(format!("{}.{dst} = {temp}.{src};", param.name()));
                        }
                    }
                }
            }
        }

        body.push(format!("{function}({});", args.join(", ")));
        body.extend(write_backs);
        Ok(())
    }
}

impl ProgramWriter for WgslProgramWriter {
    fn target_language(&self) -> &str {
        Self::LANGUAGE
    }

    fn write_source(&self, program: &Program) -> Result<ProgramSource> {
        let program_type = program.program_type();
        let decl = Declarations::collect(program)?;

        // Libraries and the functions they provide
        let libraries = program
            .dependencies()
            .iter()
            .map(|name| load_library(name))
            .collect::<Result<Vec<_>>>()?;

        let signatures: BTreeSet<&FunctionInvocation> = program.invocations().iter().collect();
        for invocation in &signatures {
            let needle = format!("fn {}(", invocation.function_name());
            if !libraries.iter().any(|lib| lib.contains(&needle)) {
                return Err(ShaderGenError::UnresolvedFunction {
                    function: invocation.function_name().to_string(),
                    stage: program_type.name(),
                });
            }
        }

        // Stage interface
        let inputs = decl
            .inputs
            .iter()
            .map(|p| Self::interface_member(p, program_type, false))
            .collect::<Result<Vec<_>>>()?;
        let mut outputs = decl
            .outputs
            .iter()
            .map(|p| Self::interface_member(p, program_type, true))
            .collect::<Result<Vec<_>>>()?;

        if program_type == GpuProgramType::Vertex
            && !outputs.iter().any(|m| m.attribute == "@builtin(position)")
        {
            outputs.insert(
                0,
                Member {
                    name: "position".to_string(),
                    ty: GpuConstantType::Float4.wgsl(),
                    attribute: "@builtin(position)".to_string(),
                    source: None,
                },
            );
        }

        // Entry point body
        let mut body = Vec::new();
        let mut temp_counter = 0;
        for invocation in program.sorted_invocations() {
            Self::write_invocation(invocation, &mut temp_counter, &mut body)?;
        }

        let locals = decl
            .outputs
            .iter()
            .chain(decl.locals.iter())
            .map(|p| Variable {
                name: p.name().to_string(),
                ty: p.constant_type().wgsl(),
            })
            .collect();

        let uniforms: Vec<UniformInfo> = decl
            .uniforms
            .iter()
            .map(|p| UniformInfo {
                name: p.name().to_string(),
                ty: p.constant_type(),
                auto_constant: match p.kind() {
                    ParameterKind::Uniform(auto) => *auto,
                    _ => None,
                },
            })
            .collect();

        let (input_struct, output_struct, uniform_binding) = match program_type {
            GpuProgramType::Vertex => ("VertexIn", "VertexOut", 0),
            GpuProgramType::Fragment => ("FragmentIn", "FragmentOut", 1),
        };

        let ctx = ProgramContext {
            stage: program_type.name(),
            signatures: signatures.iter().map(|inv| inv.signature()).collect(),
            libraries,
            uniforms: uniforms
                .iter()
                .map(|u| Variable {
                    name: u.name.clone(),
                    ty: u.ty.wgsl(),
                })
                .collect(),
            uniform_binding,
            textures: decl
                .textures
                .iter()
                .map(|p| TextureBinding {
                    name: p.name().to_string(),
                    ty: p.constant_type().wgsl(),
                    binding: texture_binding(p),
                })
                .collect(),
            input_struct,
            inputs,
            output_struct,
            outputs,
            locals,
            body,
        };

        let template = get_env().get_template("program")?;
        let source = template.render(&ctx)?;

        Ok(ProgramSource { source, uniforms })
    }
}
