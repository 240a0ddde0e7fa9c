//! Vertex-fetch instruction emission (`§4.4.2`).

use super::buffer::{print_to, println_to, EmitBuffer};
use super::prologue::input_field_name;
use crate::decode::vertex_fetch::{FetchDestSwizzle, VertexFetchInstruction};
use crate::error::TranslateError;
use crate::{FeatureMask, TranslateOptions};
use xenos_container::shader::VertexElement;

fn dst_swizzle_letters(instr: &VertexFetchInstruction) -> String {
    let mut s = String::new();
    for lane in 0..4 {
        if let Some(ch) = match instr.dst_swizzle.lane(lane) {
            FetchDestSwizzle::X => Some('x'),
            FetchDestSwizzle::Y => Some('y'),
            FetchDestSwizzle::Z => Some('z'),
            FetchDestSwizzle::W => Some('w'),
            FetchDestSwizzle::Zero | FetchDestSwizzle::One | FetchDestSwizzle::Skip => None,
        } {
            s.push(ch);
        }
    }
    s
}

/// Ports the `recompile(const VertexFetchInstruction&)` family: dispatches on
/// the element's declared usage to decide whether the fetched value needs the
/// `R11G11B10` normal-unpack path or a straight passthrough.
pub fn emit(
    buf: &mut EmitBuffer,
    instr: &VertexFetchInstruction,
    element: Option<&VertexElement>,
    options: &TranslateOptions,
    feature_mask: &mut FeatureMask,
    address: u32,
) -> Result<(), TranslateError> {
    let element = element.ok_or(TranslateError::MissingVertexElement { address })?;

    if instr.is_predicated {
        buf.indent();
        println_to!(buf, "if ({}p0)", if instr.predicate_condition { "" } else { "!" });
        buf.open_brace();
    }

    let swizzle = dst_swizzle_letters(instr);
    let field = format!("input.{}", input_field_name(element.usage, element.usage_index));

    buf.indent();
    print_to!(buf, "r{}.{}", instr.dst_register, swizzle);
    buf.push_str(" = ");

    if is_normal_usage(element.usage) && options.extended_profile {
        feature_mask.insert(FeatureMask::R11G11B10_NORMAL);
        println_to!(buf, "(float4)(tfetchR11G11B10((uint4)({field}))).{swizzle};");
    } else {
        println_to!(buf, "(float4)({field}).{swizzle};");
    }

    if instr.is_predicated {
        buf.close_brace();
    }

    Ok(())
}

fn is_normal_usage(usage: xenos_container::shader::DeclUsage) -> bool {
    matches!(usage, xenos_container::shader::DeclUsage::Normal)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::vertex_fetch::decode;
    use xenos_container::shader::DeclUsage;

    #[test]
    fn normal_fetch_sets_feature_bit_under_extended_profile() {
        // dst_register=1, identity xyzw swizzle (3 bits/lane: x=0,y=1,z=2,w=3)
        const DST_REGISTER_START: u32 = 5;
        const DST_SWIZZLE_START: u32 = 10;
        let swizzle = 0u32 | (1 << 3) | (2 << 6) | (3 << 9);
        let word0 = (1u32 << DST_REGISTER_START) | (swizzle << DST_SWIZZLE_START);
        let instr = decode([word0, 0, 0]);
        let element = VertexElement { usage: DeclUsage::Normal, usage_index: 0, fetch_slot: 2 };
        let mut mask = FeatureMask::empty();
        let mut buf = EmitBuffer::new();
        let options = TranslateOptions { extended_profile: true };
        emit(&mut buf, &instr, Some(&element), &options, &mut mask, 0).unwrap();
        assert!(mask.contains(FeatureMask::R11G11B10_NORMAL));
        assert!(buf.text.contains("r1.xyzw = (float4)(tfetchR11G11B10((uint4)(input.iNormal0))).xyzw;"));
    }
}
