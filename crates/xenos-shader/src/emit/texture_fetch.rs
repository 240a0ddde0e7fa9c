//! Texture-fetch instruction emission (`§4.4.4`, `§8.3`).

use super::buffer::{print_to, println_to, EmitBuffer};
use crate::decode::texture_fetch::{TextureDimension, TextureFetchInstruction, TextureFetchOpcode};
use crate::decode::vertex_fetch::FetchDestSwizzle;
use crate::error::TranslateError;
use crate::symbols::SymbolEnvironment;
use crate::{FeatureMask, TranslateOptions};

const SWIZZLES: [char; 4] = ['x', 'y', 'z', 'w'];

/// Sampler register that selects the bicubic GI filter path under the
/// extended profile (`§4.4.4`).
const BICUBIC_GI_SAMPLER_INDEX: u32 = 10;

fn src_coord(instr: &TextureFetchInstruction) -> String {
    let mut s = format!("r{}.", instr.src_register);
    for i in 0..instr.dimension.component_count() as u32 {
        s.push(SWIZZLES[(((instr.src_swizzle >> (i * 2)) + i) & 0x3) as usize]);
    }
    s
}

fn dst_swizzle(buf: &mut EmitBuffer, instr: &TextureFetchInstruction) {
    buf.push('.');
    for lane in 0..4 {
        if let Some(ch) = match instr.dst_swizzle.lane(lane) {
            FetchDestSwizzle::X => Some('x'),
            FetchDestSwizzle::Y => Some('y'),
            FetchDestSwizzle::Z => Some('z'),
            FetchDestSwizzle::W => Some('w'),
            _ => None,
        } {
            buf.push(ch);
        }
    }
}

fn sampler_name(symbols: &SymbolEnvironment, const_index: u32) -> String {
    symbols.samplers.get(&const_index).cloned().unwrap_or_else(|| format!("g_Sampler{const_index}"))
}

/// Emits the `tfetch{Dim}(sampler, coord[, float2(offset)])` call shape,
/// appending the halved texel offset as a trailing argument rather than
/// folding it into the coordinate expression.
fn emit_regular_fetch(buf: &mut EmitBuffer, instr: &TextureFetchInstruction, sampler: &str, coord: &str, has_offset: bool) {
    buf.indent();
    print_to!(buf, "r{}", instr.dst_register);
    dst_swizzle(buf, instr);
    buf.push_str(" = ");
    print_to!(buf, "tfetch{suffix}({sampler}, {coord}", suffix = instr.dimension.suffix());
    if has_offset {
        print_to!(buf, ", float2({:.1}, {:.1})", instr.offset_x as f32 / 2.0, instr.offset_y as f32 / 2.0);
    }
    buf.push_str(");\n");
}

/// Ports the `recompile(const TextureFetchInstruction&)` family. Offsets are
/// stored in half-texel units on the wire and halved again here to land in
/// normalized texture space (`§8.3` scenario 3).
pub fn emit(
    buf: &mut EmitBuffer,
    instr: &TextureFetchInstruction,
    symbols: &SymbolEnvironment,
    options: &TranslateOptions,
    feature_mask: &mut FeatureMask,
) -> Result<(), TranslateError> {
    if instr.opcode == TextureFetchOpcode::GetTextureWeights {
        // Not used by any currently supported material path; keep the fetch
        // predicated-guard structure symmetric but emit nothing further.
        return Ok(());
    }

    if instr.is_predicated {
        buf.indent();
        println_to!(buf, "if ({}p0)", if instr.pred_condition { "" } else { "!" });
        buf.open_brace();
    }

    let sampler = sampler_name(symbols, instr.const_index);
    let coord = src_coord(instr);
    let has_offset = instr.offset_x != 0 || instr.offset_y != 0;

    match instr.dimension {
        TextureDimension::Cube => {
            buf.indent();
            print_to!(buf, "r{}", instr.dst_register);
            dst_swizzle(buf, instr);
            println_to!(buf, " = {sampler}.Sample(g_Sampler, cubeMapData.xyz);");
        }
        _ if options.extended_profile && instr.const_index == BICUBIC_GI_SAMPLER_INDEX => {
            feature_mask.insert(FeatureMask::BICUBIC_GI_FILTER);
            buf.indent();
            buf.push_str("if (g_SpecConstants() & SPEC_CONSTANT_BICUBIC_GI_FILTER)\n");
            buf.open_brace();
            buf.indent();
            print_to!(buf, "r{}", instr.dst_register);
            dst_swizzle(buf, instr);
            println_to!(buf, " = sampleBicubic({sampler}, g_Sampler, {coord});");
            buf.close_brace();
            buf.indent();
            buf.push_str("else\n");
            buf.open_brace();
            emit_regular_fetch(buf, instr, &sampler, &coord, has_offset);
            buf.close_brace();
        }
        _ => emit_regular_fetch(buf, instr, &sampler, &coord, has_offset),
    }

    if instr.is_predicated {
        buf.close_brace();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::texture_fetch::decode;

    #[test]
    fn halves_fetch_offset_for_2d_sample() {
        const DIMENSION_START: u32 = 5;
        const DST_REGISTER_START: u32 = 7;
        const SRC_REGISTER_START: u32 = 32;
        const CONST_INDEX_START: u32 = 45;
        const OFFSET_X_START: u32 = 53;
        const OFFSET_Y_START: u32 = 64;

        let word0 = (1u32 << DIMENSION_START) | (7u32 << DST_REGISTER_START);
        let word1 = ((2u32) << (SRC_REGISTER_START - 32))
            | (3u32 << (CONST_INDEX_START - 32))
            | ((4i32 as u32 & 0xFF) << (OFFSET_X_START - 32));
        let word2 = 2i32 as u32 & 0xFF;
        let instr = decode([word0, word1, word2]);

        let symbols = SymbolEnvironment::default();
        let options = TranslateOptions { extended_profile: false };
        let mut mask = FeatureMask::empty();
        let mut buf = EmitBuffer::new();
        emit(&mut buf, &instr, &symbols, &options, &mut mask).unwrap();
        assert!(buf.text.contains("tfetch2D("));
        assert!(buf.text.contains("float2(2.0, 1.0)"));
    }

    #[test]
    fn half_texel_offset_matches_pinned_literal() {
        const DIMENSION_START: u32 = 5;
        const DST_REGISTER_START: u32 = 7;
        const SRC_REGISTER_START: u32 = 32;
        const CONST_INDEX_START: u32 = 45;
        const OFFSET_X_START: u32 = 53;
        const OFFSET_Y_START: u32 = 64;

        let word0 = (1u32 << DIMENSION_START) | (3u32 << DST_REGISTER_START);
        let word1 = ((0u32) << (SRC_REGISTER_START - 32))
            | (5u32 << (CONST_INDEX_START - 32))
            | ((1i32 as u32 & 0xFF) << (OFFSET_X_START - 32));
        let word2 = 1i32 as u32 & 0xFF;
        let instr = decode([word0, word1, word2]);

        let symbols = SymbolEnvironment::default();
        let options = TranslateOptions { extended_profile: false };
        let mut mask = FeatureMask::empty();
        let mut buf = EmitBuffer::new();
        emit(&mut buf, &instr, &symbols, &options, &mut mask).unwrap();
        assert!(buf.text.contains("tfetch2D("));
        assert!(buf.text.contains(", float2(0.5, 0.5))"));
    }
}
