//! Material script export.
//!
//! Writes materials in a brace-delimited script format. Listeners can skip
//! techniques and append attributes to passes; the shader generator uses this
//! to hide the techniques it generated and to record custom sub-render-states.

use std::borrow::Cow;
use std::fmt::Write as _;
use std::path::Path;

use glam::Vec4;

use crate::errors::Result;

use super::{DEFAULT_SCHEME_NAME, Material, Pass, Technique, TextureUnitState};

/// Indentation aware line writer.
#[derive(Debug, Default)]
pub struct ScriptWriter {
    buffer: String,
    indent: usize,
}

impl ScriptWriter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn write_line(&mut self, line: &str) {
        for _ in 0..self.indent {
            self.buffer.push('\t');
        }
        self.buffer.push_str(line);
        self.buffer.push('\n');
    }

    /// Writes `key value value ...`.
    pub fn write_attribute(&mut self, key: &str, values: &[&str]) {
        let mut line = key.to_string();
        for value in values {
            line.push(' ');
            line.push_str(value);
        }
        self.write_line(&line);
    }

    /// Writes `header` and opens a brace block.
    pub fn begin_section(&mut self, header: &str) {
        self.write_line(header);
        self.write_line("{");
        self.indent += 1;
    }

    pub fn end_section(&mut self) {
        self.indent = self.indent.saturating_sub(1);
        self.write_line("}");
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.buffer
    }

    #[must_use]
    pub fn into_string(self) -> String {
        self.buffer
    }
}

/// Hooks into material export.
pub trait MaterialSerializerListener {
    /// Return `true` to leave `technique` out of the output.
    fn skip_technique(&self, _material: &Material, _technique: &Technique) -> bool {
        false
    }

    /// Called after the built-in attributes of a pass have been written.
    fn write_pass_attributes(
        &self,
        _writer: &mut ScriptWriter,
        _material: &Material,
        _technique: &Technique,
        _pass_index: usize,
    ) {
    }
}

/// Accumulates material scripts for export.
#[derive(Default)]
pub struct MaterialSerializer<'a> {
    listeners: Vec<Box<dyn MaterialSerializerListener + 'a>>,
    queue: String,
}

impl<'a> MaterialSerializer<'a> {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add_listener(&mut self, listener: Box<dyn MaterialSerializerListener + 'a>) {
        self.listeners.push(listener);
    }

    /// Serializes `material` and appends it to the export queue.
    pub fn queue_for_export(&mut self, material: &Material) {
        let mut writer = ScriptWriter::new();
        self.write_material(&mut writer, material);
        if !self.queue.is_empty() {
            self.queue.push('\n');
        }
        self.queue.push_str(writer.as_str());
    }

    #[must_use]
    pub fn queued_as_string(&self) -> &str {
        &self.queue
    }

    /// Writes the queued scripts to `path` and clears the queue.
    pub fn export_queued(&mut self, path: impl AsRef<Path>) -> Result<()> {
        std::fs::write(path.as_ref(), &self.queue)?;
        log::info!("Exported materials to {}", path.as_ref().display());
        self.clear_queue();
        Ok(())
    }

    pub fn clear_queue(&mut self) {
        self.queue.clear();
    }

    fn write_material(&self, writer: &mut ScriptWriter, material: &Material) {
        writer.begin_section(&format!("material {}", quoted(material.name())));

        for technique in material.techniques() {
            if self
                .listeners
                .iter()
                .any(|l| l.skip_technique(material, technique))
            {
                continue;
            }
            self.write_technique(writer, material, technique);
        }

        writer.end_section();
    }

    fn write_technique(&self, writer: &mut ScriptWriter, material: &Material, technique: &Technique) {
        writer.begin_section("technique");
        if technique.scheme_name() != DEFAULT_SCHEME_NAME {
            writer.write_attribute("scheme", &[&*quoted(technique.scheme_name())]);
        }

        for (index, pass) in technique.passes().iter().enumerate() {
            writer.begin_section("pass");
            write_pass(writer, pass);
            for listener in &self.listeners {
                listener.write_pass_attributes(writer, material, technique, index);
            }
            writer.end_section();
        }

        writer.end_section();
    }
}

/// Quotes names that would otherwise split into several tokens.
pub(crate) fn quoted(name: &str) -> Cow<'_, str> {
    let needs_quotes = name.is_empty()
        || name
            .chars()
            .any(|c| c.is_whitespace() || matches!(c, '{' | '}' | '"' | '\\'));
    if !needs_quotes {
        return Cow::Borrowed(name);
    }

    let mut out = String::with_capacity(name.len() + 2);
    out.push('"');
    for c in name.chars() {
        if matches!(c, '"' | '\\') {
            out.push('\\');
        }
        out.push(c);
    }
    out.push('"');
    Cow::Owned(out)
}

fn colour(value: Vec4) -> String {
    format!("{} {} {} {}", value.x, value.y, value.z, value.w)
}

fn write_pass(writer: &mut ScriptWriter, pass: &Pass) {
    let defaults = Pass::default();

    if pass.lighting_enabled != defaults.lighting_enabled {
        writer.write_attribute("lighting", &["off"]);
    }

    for (key, value, default) in [
        ("ambient", pass.ambient, defaults.ambient),
        ("diffuse", pass.diffuse, defaults.diffuse),
        ("emissive", pass.emissive, defaults.emissive),
    ] {
        if value != default {
            writer.write_attribute(key, &[&colour(value)]);
        }
    }
    if pass.specular != defaults.specular || (pass.shininess - defaults.shininess).abs() > f32::EPSILON {
        let mut line = colour(pass.specular);
        let _ = write!(line, " {}", pass.shininess);
        writer.write_attribute("specular", &[&line]);
    }

    if !pass.vertex_colour_tracking.is_empty() {
        let names: Vec<&str> = pass
            .vertex_colour_tracking
            .iter_names()
            .map(|(name, _)| name)
            .collect();
        writer.write_attribute("colour_tracking", &[&names.join(" ").to_lowercase()]);
    }

    for unit in &pass.texture_units {
        write_texture_unit(writer, unit);
    }
}

fn write_texture_unit(writer: &mut ScriptWriter, unit: &TextureUnitState) {
    writer.begin_section("texture_unit");
    writer.write_attribute("texture", &[&*quoted(&unit.texture_name)]);
    if unit.tex_coord_set != 0 {
        writer.write_attribute("tex_coord_set", &[&unit.tex_coord_set.to_string()]);
    }
    writer.write_attribute("colour_op", &[unit.colour_op.script_name()]);
    writer.end_section();
}
