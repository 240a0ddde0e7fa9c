//! Shader prologue: backend-guarded preamble macros, I/O struct
//! declarations, and literal constant array patching from the definition
//! table (`§4.2`, `§4.4`).

use xenos_container::shader::{DeclUsage, Interpolator, VertexElement};
use xenos_container::{DefinitionTable, ShaderKind};

use super::buffer::{print_to, println_to, EmitBuffer};
use crate::error::TranslateError;
use crate::symbols::SymbolEnvironment;

fn usage_location(usage: DeclUsage, usage_index: u8) -> String {
    let name = match usage {
        DeclUsage::Position => "POSITION",
        DeclUsage::BlendWeight => "BLENDWEIGHT",
        DeclUsage::BlendIndices => "BLENDINDICES",
        DeclUsage::Normal => "NORMAL",
        DeclUsage::PointSize => "PSIZE",
        DeclUsage::Texcoord => "TEXCOORD",
        DeclUsage::Tangent => "TANGENT",
        DeclUsage::Binormal => "BINORMAL",
        DeclUsage::TessFactor => "TESSFACTOR",
        DeclUsage::PositionT => "POSITIONT",
        DeclUsage::Color => "COLOR",
        DeclUsage::Fog => "FOG",
        DeclUsage::Depth => "DEPTH",
        DeclUsage::Sample => "SAMPLE",
    };
    format!("{name}{usage_index}")
}

/// Identifier-style name for a vertex input field, e.g. `iNormal0`. Distinct
/// from [`usage_location`]'s uppercase `NORMAL0`-style semantic string used
/// for the HLSL `:` annotation — instruction emission reads the field back
/// through `input.iNormal0`, not through the semantic.
pub fn input_field_name(usage: DeclUsage, usage_index: u8) -> String {
    let name = match usage {
        DeclUsage::Position => "Position",
        DeclUsage::BlendWeight => "BlendWeight",
        DeclUsage::BlendIndices => "BlendIndices",
        DeclUsage::Normal => "Normal",
        DeclUsage::PointSize => "PointSize",
        DeclUsage::Texcoord => "Texcoord",
        DeclUsage::Tangent => "Tangent",
        DeclUsage::Binormal => "Binormal",
        DeclUsage::TessFactor => "TessFactor",
        DeclUsage::PositionT => "PositionT",
        DeclUsage::Color => "Color",
        DeclUsage::Fog => "Fog",
        DeclUsage::Depth => "Depth",
        DeclUsage::Sample => "Sample",
    };
    format!("i{name}{usage_index}")
}

/// Emits the `#ifdef`-guarded backend preamble: each target language gets
/// its own block behind a compiler-defined macro, so the same translated
/// text compiles under an HLSL, MSL, or SPIR-V (GLSL-flavored) front end.
pub fn emit_backend_guards(buf: &mut EmitBuffer) {
    buf.push_str("#if defined(__hlsl__)\n");
    buf.push_str("#define BACKEND_TARGET \"hlsl\"\n");
    buf.push_str("#elif defined(__air__)\n");
    buf.push_str("#define BACKEND_TARGET \"msl\"\n");
    buf.push_str("#elif defined(__spirv__)\n");
    buf.push_str("#define BACKEND_TARGET \"spirv\"\n");
    buf.push_str("#else\n");
    buf.push_str("#error \"unsupported shader backend\"\n");
    buf.push_str("#endif\n\n");
}

/// Emits the vertex input / pixel output struct for the given shader kind.
pub fn emit_vertex_input_struct(buf: &mut EmitBuffer, elements: &[VertexElement]) {
    buf.push_str("struct VertexInput\n");
    buf.open_brace();
    for element in elements {
        buf.indent();
        println_to!(
            buf,
            "float4 {} : {};",
            input_field_name(element.usage, element.usage_index),
            usage_location(element.usage, element.usage_index)
        );
    }
    buf.indentation = buf.indentation.saturating_sub(1);
    buf.push_str("};\n\n");
    buf.indentation += 1;
}

pub fn emit_interpolator_struct(buf: &mut EmitBuffer, name: &str, interpolators: &[Interpolator], include_position: bool) {
    print_to!(buf, "struct {name}\n");
    buf.open_brace();
    if include_position {
        buf.indent();
        buf.push_str("float4 oPos : SV_Position;\n");
    }
    for interpolator in interpolators {
        buf.indent();
        println_to!(
            buf,
            "float4 oTexCoord{} : {};",
            interpolator.register,
            usage_location(interpolator.usage, interpolator.usage_index)
        );
    }
    buf.indentation = buf.indentation.saturating_sub(1);
    buf.push_str("};\n\n");
    buf.indentation += 1;
}

pub fn emit_pixel_output_struct(buf: &mut EmitBuffer, has_depth: bool) {
    buf.push_str("struct PixelOutput\n");
    buf.open_brace();
    for i in 0..4u32 {
        buf.indent();
        println_to!(buf, "float4 oC{} : SV_Target{};", i, i);
    }
    if has_depth {
        buf.indent();
        buf.push_str("float oDepth : SV_Depth;\n");
    }
    buf.indentation = buf.indentation.saturating_sub(1);
    buf.push_str("};\n\n");
    buf.indentation += 1;
}

/// Declares a `static const float4` array per multi-register float4 binding
/// and patches its values in from the definition table's raw bytes (`§4.2`).
pub fn emit_literal_constants(
    buf: &mut EmitBuffer,
    data: &[u8],
    definitions: &DefinitionTable,
    symbols: &SymbolEnvironment,
) -> Result<(), TranslateError> {
    for def in &definitions.float4 {
        let register_index = def.register_index as u32;
        let count = def.count as u32;
        let Some(binding) = symbols.float4_constants.get(&register_index) else {
            continue;
        };
        buf.indent();
        print_to!(buf, "static const float4 {}[{}] = {{ ", binding.name, count);
        for i in 0..count {
            let offset = def.physical_offset as usize + i as usize * 16;
            let mut lanes = [0u32; 4];
            for (lane, value) in lanes.iter_mut().enumerate() {
                let start = offset + lane * 4;
                let bytes: [u8; 4] = data
                    .get(start..start + 4)
                    .ok_or(TranslateError::TruncatedInput { address: start as u32 })?
                    .try_into()
                    .unwrap();
                *value = u32::from_be_bytes(bytes);
            }
            if i > 0 {
                buf.push_str(", ");
            }
            print_to!(
                buf,
                "asfloat(uint4(0x{:08X}, 0x{:08X}, 0x{:08X}, 0x{:08X}))",
                lanes[0],
                lanes[1],
                lanes[2],
                lanes[3]
            );
        }
        buf.push_str(" };\n");
    }

    for def in &definitions.int4 {
        for (i, packed) in def.values.iter().enumerate() {
            let bytes = packed.to_be_bytes();
            buf.indent();
            println_to!(
                buf,
                "static const int4 i{} = int4({}, {}, {}, {});",
                def.register_index as u32 + i as u32,
                bytes[0] as i32,
                bytes[1] as i32,
                bytes[2] as i32,
                bytes[3] as i32
            );
        }
    }

    Ok(())
}

pub fn emit_entry_point_open(buf: &mut EmitBuffer, kind: ShaderKind, output_struct: &str, input_struct: &str) {
    match kind {
        ShaderKind::Vertex => print_to!(buf, "{output_struct} main(VertexInput input)\n"),
        ShaderKind::Pixel => print_to!(buf, "{output_struct} main({input_struct} input)\n"),
    }
    buf.open_brace();
    buf.indent();
    println_to!(buf, "{output_struct} output = ({output_struct})0;");
    match kind {
        ShaderKind::Vertex => {
            buf.indent();
            buf.push_str("float4 oPos = float4(0, 0, 0, 0);\n");
        }
        ShaderKind::Pixel => {}
    }
    buf.indent();
    buf.push_str("float4 r[64] = (float4[64])0;\n");
    buf.indent();
    buf.push_str("int a0 = 0;\n");
    buf.indent();
    buf.push_str("int aL = 0;\n");
    buf.indent();
    buf.push_str("bool p0 = false;\n");
    buf.indent();
    buf.push_str("float ps = 0.0;\n\n");
}
