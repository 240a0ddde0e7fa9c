//! Decodes Xenos vertex/pixel shader microcode and emits portable HLSL-like
//! shader source text plus the feature-flag bitmask the translated source
//! depends on (`§1`, `§4`).

pub mod decode;
pub mod emit;
pub mod error;
pub mod symbols;
pub mod translator;

pub use error::TranslateError;
pub use translator::{TranslateOutput, Translator};

use bitflags::bitflags;

bitflags! {
    /// Runtime feature bits the caller must set as specialization constants
    /// or pipeline state to match what the translated source assumes
    /// (`§4.2`, `§6`).
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
    pub struct FeatureMask: u32 {
        const R11G11B10_NORMAL = 1;
        const ALPHA_TEST = 2;
        const BICUBIC_GI_FILTER = 4;
    }
}

/// Behavior toggle matching the original tool's `UNLEASHED_RECOMP`-gated
/// heuristics: name-matching well-known constants, the bicubic GI filter
/// branch, and alpha testing (`§3.2`, Open Questions).
#[derive(Debug, Clone, Copy, Default)]
pub struct TranslateOptions {
    pub extended_profile: bool,
}

/// Top-level entry point: parses a shader container and produces translated
/// source text plus the feature mask that source depends on.
pub fn translate(shader_bytes: &[u8], options: TranslateOptions) -> Result<TranslateOutput, TranslateError> {
    Translator::new(options).translate(shader_bytes)
}
