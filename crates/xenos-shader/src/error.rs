use thiserror::Error;
use xenos_container::ContainerError;

/// Errors surfaced by the translator (`§7`). All are fatal to the current
/// shader; the core never retries.
#[derive(Debug, Error)]
pub enum TranslateError {
    #[error("invalid container: {0}")]
    InvalidContainer(#[from] ContainerError),

    #[error("truncated microcode stream at instruction address {address}")]
    TruncatedInput { address: u32 },

    #[error("vertex fetch at instruction address {address} has no declared vertex element")]
    MissingVertexElement { address: u32 },

    #[error("instruction field at address {address} does not correspond to any emitter rule: {detail}")]
    UnknownOpcode { address: u32, detail: String },
}
