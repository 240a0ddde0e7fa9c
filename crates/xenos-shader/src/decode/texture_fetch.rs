//! Texture-fetch instruction decode (`§4.3`, `§4.4.4`).
//!
//! Shares the fetch-family opcode field with vertex fetch (`§4.3`): any
//! value other than [`super::vertex_fetch::VERTEX_FETCH_OPCODE`] belongs
//! here.

use super::bits128;
use super::vertex_fetch::{FetchDestSwizzlePack, VERTEX_FETCH_OPCODE};
use xenos_container::reader::sign_extend;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureFetchOpcode {
    TextureFetch,
    GetTextureWeights,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TextureDimension {
    D1,
    D2,
    D3,
    Cube,
}

impl TextureDimension {
    pub fn suffix(self) -> &'static str {
        match self {
            Self::D1 => "1D",
            Self::D2 => "2D",
            Self::D3 => "3D",
            Self::Cube => "Cube",
        }
    }

    pub fn component_count(self) -> usize {
        match self {
            Self::D1 => 1,
            Self::D2 => 2,
            Self::D3 | Self::Cube => 3,
        }
    }
}

#[derive(Debug, Clone, Copy)]
pub struct TextureFetchInstruction {
    pub opcode: TextureFetchOpcode,
    pub dimension: TextureDimension,
    pub dst_register: u32,
    pub dst_swizzle: FetchDestSwizzlePack,
    pub src_register: u32,
    pub src_swizzle: u32,
    pub const_index: u32,
    pub offset_x: i32,
    pub offset_y: i32,
    pub is_predicated: bool,
    pub pred_condition: bool,
}

const OPCODE_BITS: u32 = 5;
const DIMENSION_START: u32 = OPCODE_BITS;
const DIMENSION_BITS: u32 = 2;
const DST_REGISTER_START: u32 = DIMENSION_START + DIMENSION_BITS;
const DST_REGISTER_BITS: u32 = 5;
const DST_SWIZZLE_START: u32 = DST_REGISTER_START + DST_REGISTER_BITS;
const DST_SWIZZLE_BITS: u32 = 12;
const IS_PREDICATED_START: u32 = DST_SWIZZLE_START + DST_SWIZZLE_BITS;
const PRED_CONDITION_START: u32 = IS_PREDICATED_START + 1;

const SRC_REGISTER_START: u32 = 32;
const SRC_REGISTER_BITS: u32 = 5;
const SRC_SWIZZLE_START: u32 = SRC_REGISTER_START + SRC_REGISTER_BITS;
const SRC_SWIZZLE_BITS: u32 = 8;
const CONST_INDEX_START: u32 = SRC_SWIZZLE_START + SRC_SWIZZLE_BITS;
const CONST_INDEX_BITS: u32 = 8;
const OFFSET_X_START: u32 = CONST_INDEX_START + CONST_INDEX_BITS;
const OFFSET_X_BITS: u32 = 8;
const OFFSET_Y_START: u32 = 64;
const OFFSET_Y_BITS: u32 = 8;

pub fn is_texture_fetch(words: [u32; 3]) -> bool {
    bits128(words, 0, OPCODE_BITS) as u32 != VERTEX_FETCH_OPCODE
}

fn opcode_from_raw(raw: u32) -> TextureFetchOpcode {
    if raw == 2 {
        TextureFetchOpcode::GetTextureWeights
    } else {
        TextureFetchOpcode::TextureFetch
    }
}

fn dimension_from_raw(raw: u32) -> TextureDimension {
    match raw & 0x3 {
        0 => TextureDimension::D1,
        1 => TextureDimension::D2,
        2 => TextureDimension::D3,
        _ => TextureDimension::Cube,
    }
}

pub fn decode(words: [u32; 3]) -> TextureFetchInstruction {
    TextureFetchInstruction {
        opcode: opcode_from_raw(bits128(words, 0, OPCODE_BITS) as u32),
        dimension: dimension_from_raw(bits128(words, DIMENSION_START, DIMENSION_BITS) as u32),
        dst_register: bits128(words, DST_REGISTER_START, DST_REGISTER_BITS) as u32,
        dst_swizzle: FetchDestSwizzlePack(bits128(words, DST_SWIZZLE_START, DST_SWIZZLE_BITS) as u32),
        src_register: bits128(words, SRC_REGISTER_START, SRC_REGISTER_BITS) as u32,
        src_swizzle: bits128(words, SRC_SWIZZLE_START, SRC_SWIZZLE_BITS) as u32,
        const_index: bits128(words, CONST_INDEX_START, CONST_INDEX_BITS) as u32,
        offset_x: sign_extend(bits128(words, OFFSET_X_START, OFFSET_X_BITS) as u32, OFFSET_X_BITS),
        offset_y: sign_extend(bits128(words, OFFSET_Y_START, OFFSET_Y_BITS) as u32, OFFSET_Y_BITS),
        is_predicated: bits128(words, IS_PREDICATED_START, 1) != 0,
        pred_condition: bits128(words, PRED_CONDITION_START, 1) != 0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decodes_2d_fetch_with_offsets() {
        let word0 = 1u32 // opcode = TextureFetch-ish (non-zero, non-GetTextureWeights)
            | (1 << DIMENSION_START) // 2D
            | (7 << DST_REGISTER_START);
        let word1 = (2u32 << (SRC_REGISTER_START - 32))
            | (5u32 << (CONST_INDEX_START - 32))
            | (2i32 as u32 & 0xFF) << (OFFSET_X_START - 32);
        let word2 = 2i32 as u32 & 0xFF;
        let words = [word0, word1, word2];
        assert!(is_texture_fetch(words));
        let instr = decode(words);
        assert_eq!(instr.dimension, TextureDimension::D2);
        assert_eq!(instr.dst_register, 7);
        assert_eq!(instr.const_index, 5);
        assert_eq!(instr.offset_x, 2);
        assert_eq!(instr.offset_y, 2);
    }
}
