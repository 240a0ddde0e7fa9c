use thiserror::Error;

/// Errors raised while parsing a Xenos shader container.
///
/// Every variant carries the byte offset (and, where useful, the offending
/// value) so a caller can report exactly where a malformed container
/// diverged from the expected layout.
#[derive(Debug, Error)]
pub enum ContainerError {
    #[error("truncated input at offset {offset}: needed {needed} bytes, {available} available")]
    TruncatedInput {
        offset: usize,
        needed: usize,
        available: usize,
    },

    #[error("string at offset {offset} is not valid UTF-8")]
    MalformedString { offset: usize },

    #[error("bad container flags 0x{flags:08X} at offset {offset}: expected high byte pattern 0x102A11xx")]
    BadFlags { offset: usize, flags: u32 },

    #[error("constant table offset is zero")]
    MissingConstantTable,

    #[error("reserved header field at offset {offset} is non-zero: 0x{value:08X}")]
    NonZeroReserved { offset: usize, value: u32 },

    #[error("unknown register set value {value} for constant {index} at offset {offset}")]
    UnknownRegisterSet {
        index: usize,
        offset: usize,
        value: u16,
    },
}
