//! Error Types
//!
//! This module defines the error types used throughout the shader generator.
//!
//! # Overview
//!
//! The main error type [`ShaderGenError`] covers the failure modes of program
//! generation:
//! - Source emission failures (templates, libraries, operands)
//! - Compilation failures reported by the program compiler
//! - Configuration and I/O errors
//!
//! Requests that are merely rejected (creating a technique for a scheme that
//! already exists, removing one that does not) are not errors: those
//! operations return `false` and log a warning.
//!
//! # Usage
//!
//! ```rust,ignore
//! use myth_shadergen::errors::{ShaderGenError, Result};
//!
//! fn build() -> Result<()> {
//!     Ok(())
//! }
//! ```

use thiserror::Error;

/// The main error type for the shader generator.
#[derive(Error, Debug)]
pub enum ShaderGenError {
    // ========================================================================
    // Source Emission Errors
    // ========================================================================
    /// No program writer exists for the requested shading language.
    #[error("Unsupported target language: {0}")]
    UnsupportedLanguage(String),

    /// Template loading or rendering failed.
    #[error("Shader template error: {0}")]
    Template(#[from] minijinja::Error),

    /// A program depends on a function library that is not embedded.
    #[error("Shader library not found: {0}")]
    LibraryNotFound(String),

    /// An invocation calls a function no included library provides.
    #[error("Function '{function}' is not provided by any library of the {stage} program")]
    UnresolvedFunction {
        /// Name of the called function
        function: String,
        /// Stage of the program being written
        stage: &'static str,
    },

    /// An operand cannot be used the way the invocation requires.
    #[error("Invalid operand '{parameter}' in call to '{function}': {reason}")]
    InvalidOperand {
        /// Name of the called function
        function: String,
        /// Name of the offending parameter
        parameter: String,
        /// What is wrong with it
        reason: &'static str,
    },

    /// A stage interface parameter uses a semantic the stage cannot express.
    #[error("Semantic {semantic} is not supported as a {stage} program {direction}")]
    UnsupportedSemantic {
        /// Semantic and index, e.g. `colour3`
        semantic: String,
        /// Stage of the program being written
        stage: &'static str,
        /// `input` or `output`
        direction: &'static str,
    },

    /// Two requests resolved the same parameter with different types.
    #[error("Parameter '{name}' already declared as {existing}, requested as {requested}")]
    ParameterConflict {
        /// Parameter name
        name: String,
        /// WGSL type of the existing declaration
        existing: &'static str,
        /// WGSL type of the new request
        requested: &'static str,
    },

    /// A sub-render-state could not resolve what it needs.
    #[error("Sub-render-state '{kind}' failed: {reason}")]
    SubRenderState {
        /// Type name of the sub-render-state
        kind: &'static str,
        /// Description of the failure
        reason: String,
    },

    /// No sub-render-state is registered under the given type name.
    #[error("Unknown sub-render-state type: {0}")]
    UnknownSubRenderState(String),

    // ========================================================================
    // Compilation Errors
    // ========================================================================
    /// The program compiler rejected the generated source.
    #[error("Failed to compile program '{program}':\n{message}")]
    Compilation {
        /// Name of the program being compiled
        program: String,
        /// Compiler diagnostics
        message: String,
    },

    // ========================================================================
    // Material Errors
    // ========================================================================
    /// A material with the same name already exists in the group.
    #[error("Material '{name}' already exists in group '{group}'")]
    DuplicateMaterial {
        /// Material name
        name: String,
        /// Resource group
        group: String,
    },

    // ========================================================================
    // Configuration & I/O Errors
    // ========================================================================
    /// File I/O error.
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// JSON parsing error.
    #[error("JSON parse error: {0}")]
    JsonError(#[from] serde_json::Error),
}

/// Alias for `Result<T, ShaderGenError>`.
pub type Result<T> = std::result::Result<T, ShaderGenError>;
