use crate::error::ContainerError;
use crate::reader::ByteReader;

/// A literal patch for a contiguous run of `float4` constant registers.
///
/// The compiler folds constant-valued `float4` literals directly into the
/// shader binary rather than relying on the constant table at runtime; the
/// prologue generator replays these patches as static initializers.
#[derive(Debug, Clone, Copy)]
pub struct Float4Definition {
    pub register_index: u16,
    pub count: u16,
    pub physical_offset: u32,
}

/// A literal patch for a run of `int4` (really 4 packed bytes per register)
/// constants, with the packed values stored inline in the definition table.
#[derive(Debug, Clone)]
pub struct Int4Definition {
    pub register_index: u16,
    pub count: u16,
    pub values: Vec<u32>,
}

/// The parsed definition table: two zero-terminated sequences back to back,
/// `Float4Definition`s followed by `Int4Definition`s.
#[derive(Debug, Clone, Default)]
pub struct DefinitionTable {
    pub float4: Vec<Float4Definition>,
    pub int4: Vec<Int4Definition>,
}

impl DefinitionTable {
    /// `base` is the absolute offset of the definition table
    /// (`container.definition_table_offset`) within `data`. A `base` of 0
    /// means the shader carries no definition table at all.
    pub fn parse(data: &[u8], base: usize) -> Result<Self, ContainerError> {
        if base == 0 {
            return Ok(Self::default());
        }

        let mut r = ByteReader::at(data, base);
        let mut float4 = Vec::new();
        loop {
            let header = r.peek_u32()?;
            if header == 0 {
                r.skip(4);
                break;
            }
            let register_index = r.read_u16()?;
            let count = r.read_u16()?;
            let physical_offset = r.read_u32()?;
            float4.push(Float4Definition { register_index, count, physical_offset });
        }

        let mut int4 = Vec::new();
        loop {
            let header = r.peek_u32()?;
            if header == 0 {
                r.skip(4);
                break;
            }
            let register_index = r.read_u16()?;
            let count = r.read_u16()?;
            let _reserved = r.read_u32()?;
            let mut values = Vec::with_capacity(count as usize);
            for _ in 0..count {
                values.push(r.read_u32()?);
            }
            int4.push(Int4Definition { register_index, count, values });
        }

        Ok(Self { float4, int4 })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ContainerBuilder;

    #[test]
    fn empty_definition_table() {
        let builder = ContainerBuilder::new_vertex();
        let bytes = builder.build();
        let container = crate::container::ShaderContainer::parse(&bytes).unwrap();
        let defs = DefinitionTable::parse(&bytes, container.definition_table_offset as usize).unwrap();
        assert!(defs.float4.is_empty());
        assert!(defs.int4.is_empty());
    }

    #[test]
    fn parses_float4_and_int4_definitions() {
        let mut builder = ContainerBuilder::new_vertex();
        builder.add_float4_definition(0, 1, 0x1000);
        builder.add_int4_definition(4, vec![0x0101_0101, 0x0202_0202]);
        let bytes = builder.build();
        let container = crate::container::ShaderContainer::parse(&bytes).unwrap();
        let defs = DefinitionTable::parse(&bytes, container.definition_table_offset as usize).unwrap();

        assert_eq!(defs.float4.len(), 1);
        assert_eq!(defs.float4[0].physical_offset, 0x1000);
        assert_eq!(defs.int4.len(), 1);
        assert_eq!(defs.int4[0].values, vec![0x0101_0101, 0x0202_0202]);
    }
}
