use crate::error::ContainerError;
use crate::reader::ByteReader;

/// Semantic usage of a vertex shader input or interpolator, matching the
/// fixed-function D3D9 declaration usages the Xenos toolchain inherited.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DeclUsage {
    Position,
    BlendWeight,
    BlendIndices,
    Normal,
    PointSize,
    Texcoord,
    Tangent,
    Binormal,
    TessFactor,
    PositionT,
    Color,
    Fog,
    Depth,
    Sample,
}

impl DeclUsage {
    fn from_raw(raw: u8) -> Option<Self> {
        match raw {
            0 => Some(Self::Position),
            1 => Some(Self::BlendWeight),
            2 => Some(Self::BlendIndices),
            3 => Some(Self::Normal),
            4 => Some(Self::PointSize),
            5 => Some(Self::Texcoord),
            6 => Some(Self::Tangent),
            7 => Some(Self::Binormal),
            8 => Some(Self::TessFactor),
            9 => Some(Self::PositionT),
            10 => Some(Self::Color),
            11 => Some(Self::Fog),
            12 => Some(Self::Depth),
            13 => Some(Self::Sample),
            _ => None,
        }
    }
}

/// One fetch-shader vertex input declaration: which semantic this fetch
/// constant feeds and which `vfetch` slot reads it.
#[derive(Debug, Clone, Copy)]
pub struct VertexElement {
    pub usage: DeclUsage,
    pub usage_index: u8,
    pub fetch_slot: u8,
}

/// One interpolator export: which register a vertex shader's output lands
/// in, for consumption by `export` instructions and the matching pixel
/// shader's input decode.
#[derive(Debug, Clone, Copy)]
pub struct Interpolator {
    pub register: u8,
    pub usage: DeclUsage,
    pub usage_index: u8,
}

const VERTEX_ELEMENT_SIZE: usize = 4;
const INTERPOLATOR_SIZE: usize = 4;

/// Fields common to both vertex and pixel shaders: everything needed to
/// reach the microcode stream itself.
#[derive(Debug, Clone)]
pub struct ShaderCommon {
    pub instruction_count: u32,
    pub microcode_offset: u32,
}

impl ShaderCommon {
    pub fn parse(data: &[u8], base: usize) -> Result<Self, ContainerError> {
        let mut r = ByteReader::at(data, base);
        let instruction_count = r.read_u32()?;
        let microcode_offset = r.read_u32()?;
        Ok(Self { instruction_count, microcode_offset })
    }

    /// Returns the `index`-th 96-bit instruction slot as three big-endian
    /// words, in on-disk order.
    pub fn instruction_words(&self, data: &[u8], index: u32) -> Result<[u32; 3], ContainerError> {
        let offset = self.microcode_offset as usize + index as usize * 12;
        let mut r = ByteReader::at(data, offset);
        Ok([r.read_u32()?, r.read_u32()?, r.read_u32()?])
    }
}

#[derive(Debug, Clone)]
pub struct VertexShader {
    pub common: ShaderCommon,
    pub elements: Vec<VertexElement>,
    pub interpolators: Vec<Interpolator>,
}

impl VertexShader {
    pub fn parse(data: &[u8], base: usize) -> Result<Self, ContainerError> {
        let common = ShaderCommon::parse(data, base)?;

        let mut r = ByteReader::at(data, base + 8);
        let element_count = r.read_u32()? as usize;
        let element_offset = r.read_u32()? as usize;
        let interpolator_count = r.read_u32()? as usize;
        let interpolator_offset = r.read_u32()? as usize;

        let mut elements = Vec::with_capacity(element_count);
        for i in 0..element_count {
            let mut er = ByteReader::at(data, element_offset + i * VERTEX_ELEMENT_SIZE);
            let usage_raw = er.read_u8()?;
            let usage_index = er.read_u8()?;
            let fetch_slot = er.read_u8()?;
            let _reserved = er.read_u8()?;
            let usage = DeclUsage::from_raw(usage_raw).unwrap_or(DeclUsage::Texcoord);
            elements.push(VertexElement { usage, usage_index, fetch_slot });
        }

        let mut interpolators = Vec::with_capacity(interpolator_count);
        for i in 0..interpolator_count {
            let mut ir = ByteReader::at(data, interpolator_offset + i * INTERPOLATOR_SIZE);
            let register = ir.read_u8()?;
            let usage_raw = ir.read_u8()?;
            let usage_index = ir.read_u8()?;
            let _reserved = ir.read_u8()?;
            let usage = DeclUsage::from_raw(usage_raw).unwrap_or(DeclUsage::Texcoord);
            interpolators.push(Interpolator { register, usage, usage_index });
        }

        Ok(Self { common, elements, interpolators })
    }
}

#[derive(Debug, Clone)]
pub struct PixelShader {
    pub common: ShaderCommon,
    pub interpolators: Vec<Interpolator>,
    /// `(field_c >> 8) & 0xFF`: identifies which interpolator register, if
    /// any, carries the fragment position. `0xFF` means none.
    pub position_register: u8,
}

impl PixelShader {
    pub fn parse(data: &[u8], base: usize) -> Result<Self, ContainerError> {
        let common = ShaderCommon::parse(data, base)?;

        let mut r = ByteReader::at(data, base + 8);
        let interpolator_count = r.read_u32()? as usize;
        let interpolator_offset = r.read_u32()? as usize;
        let field_c = r.read_u32()?;

        let mut interpolators = Vec::with_capacity(interpolator_count);
        for i in 0..interpolator_count {
            let mut ir = ByteReader::at(data, interpolator_offset + i * INTERPOLATOR_SIZE);
            let register = ir.read_u8()?;
            let usage_raw = ir.read_u8()?;
            let usage_index = ir.read_u8()?;
            let _reserved = ir.read_u8()?;
            let usage = DeclUsage::from_raw(usage_raw).unwrap_or(DeclUsage::Texcoord);
            interpolators.push(Interpolator { register, usage, usage_index });
        }

        let position_register = ((field_c >> 8) & 0xFF) as u8;

        Ok(Self { common, interpolators, position_register })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ContainerBuilder;

    #[test]
    fn parses_vertex_elements_and_interpolators() {
        let mut builder = ContainerBuilder::new_vertex();
        builder.add_vertex_element(DeclUsage::Position, 0, 0);
        builder.add_vertex_element(DeclUsage::Texcoord, 0, 1);
        builder.add_interpolator(0, DeclUsage::Texcoord, 0);
        let bytes = builder.build();
        let container = crate::container::ShaderContainer::parse(&bytes).unwrap();
        let vs = VertexShader::parse(&bytes, container.shader_offset as usize).unwrap();

        assert_eq!(vs.elements.len(), 2);
        assert_eq!(vs.elements[0].usage, DeclUsage::Position);
        assert_eq!(vs.interpolators.len(), 1);
    }

    #[test]
    fn pixel_shader_extracts_position_register_from_field_c() {
        let mut builder = ContainerBuilder::new_pixel();
        builder.field_c = 0x0000_0300; // register 3 in bits [8:15]
        let bytes = builder.build();
        let container = crate::container::ShaderContainer::parse(&bytes).unwrap();
        let ps = PixelShader::parse(&bytes, container.shader_offset as usize).unwrap();
        assert_eq!(ps.position_register, 3);
    }
}
