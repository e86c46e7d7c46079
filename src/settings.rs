//! Shader Generator Settings
//!
//! Configuration for the [`ShaderGenerator`](crate::ShaderGenerator).
//!
//! # Quick Start
//!
//! ```rust,ignore
//! use myth_shadergen::{ShaderGenerator, ShaderGeneratorSettings};
//!
//! // Default: WGSL output, one per-vertex directional light
//! let settings = ShaderGeneratorSettings::default();
//!
//! // Dump every generated program to disk for inspection
//! let settings = ShaderGeneratorSettings {
//!     shader_cache_path: Some("target/shader_cache".into()),
//!     ..Default::default()
//! };
//!
//! let generator = ShaderGenerator::new(settings)?;
//! ```
//!
//! Settings can also be loaded from JSON; missing fields fall back to their
//! defaults:
//!
//! ```json
//! { "target_language": "wgsl", "light_count": 2 }
//! ```

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::errors::Result;

/// Target language produced when nothing else is configured.
pub const DEFAULT_TARGET_LANGUAGE: &str = "wgsl";

/// Configuration for shader generation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ShaderGeneratorSettings {
    /// Shading language identifier handed to the program writer and compiler.
    pub target_language: String,

    /// Number of directional lights evaluated by the lighting stage.
    pub light_count: u32,

    /// When set, every newly written program source is also saved to this
    /// directory as `<program name>.<language>`.
    pub shader_cache_path: Option<PathBuf>,

    /// Log the full generated source of each program at debug level.
    pub log_generated_source: bool,
}

impl Default for ShaderGeneratorSettings {
    fn default() -> Self {
        Self {
            target_language: DEFAULT_TARGET_LANGUAGE.to_string(),
            light_count: 1,
            shader_cache_path: None,
            log_generated_source: false,
        }
    }
}

impl ShaderGeneratorSettings {
    /// Parses settings from a JSON string.
    pub fn from_json_str(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }

    /// Reads settings from a JSON file.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self> {
        let json = std::fs::read_to_string(path)?;
        Self::from_json_str(&json)
    }
}
