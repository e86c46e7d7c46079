//! Fixed-function pipeline emulation.
//!
//! Built-in sub-render-states reproducing the classic fixed-function stages.
//! Emission groups come from [`groups`](super::function::groups), so the
//! relative order of their code does not depend on the order they were added.

mod colour;
mod lighting;
mod texturing;
mod transform;

pub use colour::FfpColour;
pub use lighting::FfpLighting;
pub use texturing::FfpTexturing;
pub use transform::FfpTransform;

use crate::errors::{Result, ShaderGenError};

use super::sub_render_state::SubRenderState;

/// Type names of every built-in sub-render-state.
pub const BUILTIN_TYPES: [&str; 4] = [
    FfpTransform::TYPE,
    FfpLighting::TYPE,
    FfpColour::TYPE,
    FfpTexturing::TYPE,
];

/// Creates a built-in sub-render-state from its type name.
pub fn create_by_type(type_name: &str) -> Result<Box<dyn SubRenderState>> {
    match type_name {
        FfpTransform::TYPE => Ok(Box::new(FfpTransform::default())),
        FfpColour::TYPE => Ok(Box::new(FfpColour::default())),
        FfpLighting::TYPE => Ok(Box::new(FfpLighting::default())),
        FfpTexturing::TYPE => Ok(Box::new(FfpTexturing::default())),
        other => Err(ShaderGenError::UnknownSubRenderState(other.to_string())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_by_type_round_trips_names() {
        for name in BUILTIN_TYPES {
            assert_eq!(create_by_type(name).unwrap().type_name(), name);
        }
        assert!(matches!(
            create_by_type("fog_stage"),
            Err(ShaderGenError::UnknownSubRenderState(_))
        ));
    }
}
