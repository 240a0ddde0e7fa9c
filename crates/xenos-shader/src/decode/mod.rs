//! Turns 96-bit instruction triplets into tagged records for the four
//! instruction families the microcode stream can hold.

pub mod alu;
pub mod control_flow;
pub mod texture_fetch;
pub mod vertex_fetch;

pub use alu::AluInstruction;
pub use control_flow::ControlFlowInstruction;
pub use texture_fetch::{TextureDimension, TextureFetchInstruction};
pub use vertex_fetch::VertexFetchInstruction;

use crate::error::TranslateError;

/// One decoded instruction slot: either a fetch (vertex or texture) or an
/// ALU co-issue. Which family a slot holds is decided by the enclosing
/// control-flow instruction's `sequence` bits, not by anything in the words
/// themselves (§4.3).
#[derive(Debug, Clone)]
pub enum FetchOrAlu {
    VertexFetch(VertexFetchInstruction),
    TextureFetch(TextureFetchInstruction),
    Alu(AluInstruction),
}

/// Decodes one instruction slot, given whether the enclosing control-flow
/// instruction's `sequence` bits mark it as a fetch. Vertex vs. texture
/// fetch is then decided by the shared opcode field within the slot itself.
/// `address` is the instruction's slot index, carried only to label a
/// [`TranslateError::UnknownOpcode`] if the ALU opcode fields are
/// out of range.
pub fn decode_instruction(words: [u32; 3], is_fetch: bool, address: u32) -> Result<FetchOrAlu, TranslateError> {
    if is_fetch {
        if vertex_fetch::is_vertex_fetch(words) {
            Ok(FetchOrAlu::VertexFetch(vertex_fetch::decode(words)))
        } else {
            Ok(FetchOrAlu::TextureFetch(texture_fetch::decode(words)))
        }
    } else {
        alu::decode(words).map(FetchOrAlu::Alu).ok_or_else(|| TranslateError::UnknownOpcode {
            address,
            detail: "ALU vector or scalar opcode field out of range".into(),
        })
    }
}

/// Extracts `len` bits starting at bit `start` from a 96-bit instruction
/// triplet, treated as a single little-endian-assembled `u128` (word0 in the
/// low 32 bits, word2 in the high 32).
pub fn bits128(words: [u32; 3], start: u32, len: u32) -> u128 {
    let word = (words[0] as u128) | ((words[1] as u128) << 32) | ((words[2] as u128) << 64);
    (word >> start) & ((1u128 << len) - 1)
}
