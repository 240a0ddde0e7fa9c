use crate::error::ContainerError;
use crate::reader::ByteReader;

/// Which register file a constant lives in.
///
/// Numbering mirrors the D3D9 constant-table convention the Xenos toolchain
/// inherited from its Direct3D-based shader compiler front end.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RegisterSet {
    Bool,
    Int4,
    Float4,
    Sampler,
}

impl RegisterSet {
    fn from_raw(raw: u16) -> Option<Self> {
        match raw {
            0 => Some(Self::Bool),
            1 => Some(Self::Int4),
            2 => Some(Self::Float4),
            3 => Some(Self::Sampler),
            _ => None,
        }
    }
}

/// One entry of the constant table: a named register range in a single
/// register set.
#[derive(Debug, Clone)]
pub struct ConstantInfo {
    pub name: String,
    pub register_set: RegisterSet,
    pub register_index: u16,
    pub register_count: u16,
}

pub const CONSTANT_INFO_SIZE: usize = 12;

/// The parsed constant table: every named constant declared by the shader,
/// independent of whether the compiler actually packed a definition for it
/// (see [`crate::definitions`]).
#[derive(Debug, Clone)]
pub struct ConstantTable {
    pub constants: Vec<ConstantInfo>,
}

impl ConstantTable {
    /// `base` is the absolute offset of the constant table header
    /// (`container.constant_table_offset`) within `data`.
    pub fn parse(data: &[u8], base: usize) -> Result<Self, ContainerError> {
        let mut header = ByteReader::at(data, base);
        let constant_count = header.read_u32()? as usize;
        let constant_info_offset = header.read_u32()? as usize;

        let mut constants = Vec::with_capacity(constant_count);
        for i in 0..constant_count {
            let entry_offset = constant_info_offset + i * CONSTANT_INFO_SIZE;
            let mut r = ByteReader::at(data, entry_offset);
            let name_offset = r.read_u32()? as usize;
            let register_set_raw = r.read_u16()?;
            let register_index = r.read_u16()?;
            let register_count = r.read_u16()?;
            let _reserved = r.read_u16()?;

            let register_set = RegisterSet::from_raw(register_set_raw).ok_or(
                ContainerError::UnknownRegisterSet {
                    index: i,
                    offset: entry_offset + 4,
                    value: register_set_raw,
                },
            )?;
            let name = ByteReader::read_cstr_at(data, name_offset)?.to_owned();

            constants.push(ConstantInfo {
                name,
                register_set,
                register_index,
                register_count,
            });
        }

        Ok(Self { constants })
    }

    pub fn float4_constants(&self) -> impl Iterator<Item = &ConstantInfo> {
        self.constants.iter().filter(|c| c.register_set == RegisterSet::Float4)
    }

    pub fn samplers(&self) -> impl Iterator<Item = &ConstantInfo> {
        self.constants.iter().filter(|c| c.register_set == RegisterSet::Sampler)
    }

    pub fn bool_constants(&self) -> impl Iterator<Item = &ConstantInfo> {
        self.constants.iter().filter(|c| c.register_set == RegisterSet::Bool)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ContainerBuilder;

    #[test]
    fn parses_constants_by_register_set() {
        let mut builder = ContainerBuilder::new_vertex();
        builder.add_constant("g_MtxProjection", RegisterSet::Float4, 0, 4);
        builder.add_constant("g_Sampler0", RegisterSet::Sampler, 0, 1);
        builder.add_constant("g_Enabled", RegisterSet::Bool, 0, 1);
        let bytes = builder.build();
        let container = crate::container::ShaderContainer::parse(&bytes).unwrap();
        let table = ConstantTable::parse(&bytes, container.constant_table_offset as usize).unwrap();

        assert_eq!(table.float4_constants().count(), 1);
        assert_eq!(table.samplers().count(), 1);
        assert_eq!(table.bool_constants().count(), 1);
        assert_eq!(table.constants[0].name, "g_MtxProjection");
        assert_eq!(table.constants[0].register_count, 4);
    }
}
