use crate::error::ContainerError;
use crate::reader::ByteReader;

/// High byte pattern every known-good container's `flags` must match; the
/// low byte varies with shader kind and minor format revision.
const FLAGS_MAGIC_MASK: u32 = 0xFFFF_FF00;
const FLAGS_MAGIC_VALUE: u32 = 0x102A_1100;

/// Bit 0 of `flags`: set for a pixel shader, clear for a vertex shader.
const FLAGS_PIXEL_SHADER_BIT: u32 = 1;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ShaderKind {
    Vertex,
    Pixel,
}

/// The 32-byte header every Xenos shader container starts with.
///
/// All offsets are relative to the start of the container (i.e. the start of
/// `flags`), not to the start of whatever file the container was extracted
/// from.
#[derive(Debug, Clone, Copy)]
pub struct ShaderContainer {
    pub flags: u32,
    pub virtual_size: u32,
    pub physical_size: u32,
    pub constant_table_offset: u32,
    pub definition_table_offset: u32,
    pub shader_offset: u32,
}

impl ShaderContainer {
    pub const HEADER_SIZE: usize = 32;

    pub fn parse(data: &[u8]) -> Result<Self, ContainerError> {
        let mut r = ByteReader::new(data);
        let flags = r.read_u32()?;
        if flags & FLAGS_MAGIC_MASK != FLAGS_MAGIC_VALUE {
            return Err(ContainerError::BadFlags { offset: 0, flags });
        }
        let virtual_size = r.read_u32()?;
        let physical_size = r.read_u32()?;
        let constant_table_offset = r.read_u32()?;
        if constant_table_offset == 0 {
            return Err(ContainerError::MissingConstantTable);
        }
        let definition_table_offset = r.read_u32()?;
        let shader_offset = r.read_u32()?;

        let reserved1 = r.read_u32()?;
        if reserved1 != 0 {
            return Err(ContainerError::NonZeroReserved { offset: r.position() - 4, value: reserved1 });
        }
        let reserved2 = r.read_u32()?;
        if reserved2 != 0 {
            return Err(ContainerError::NonZeroReserved { offset: r.position() - 4, value: reserved2 });
        }

        Ok(Self {
            flags,
            virtual_size,
            physical_size,
            constant_table_offset,
            definition_table_offset,
            shader_offset,
        })
    }

    pub fn kind(&self) -> ShaderKind {
        if self.flags & FLAGS_PIXEL_SHADER_BIT != 0 {
            ShaderKind::Pixel
        } else {
            ShaderKind::Vertex
        }
    }

    /// Total container size as claimed by the header: the caller should
    /// treat `data[..physical_size]` as the authoritative extent when
    /// scanning for the next container in a larger blob.
    pub fn physical_size(&self) -> usize {
        self.physical_size as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ContainerBuilder;

    #[test]
    fn parses_minimal_vertex_container() {
        let bytes = ContainerBuilder::new_vertex().build();
        let container = ShaderContainer::parse(&bytes).unwrap();
        assert_eq!(container.kind(), ShaderKind::Vertex);
        assert_ne!(container.constant_table_offset, 0);
    }

    #[test]
    fn parses_minimal_pixel_container() {
        let bytes = ContainerBuilder::new_pixel().build();
        let container = ShaderContainer::parse(&bytes).unwrap();
        assert_eq!(container.kind(), ShaderKind::Pixel);
    }

    #[test]
    fn rejects_bad_magic() {
        let mut bytes = ContainerBuilder::new_vertex().build();
        bytes[0] = 0xFF;
        assert!(matches!(
            ShaderContainer::parse(&bytes),
            Err(ContainerError::BadFlags { .. })
        ));
    }

    #[test]
    fn rejects_zero_constant_table_offset() {
        let mut builder = ContainerBuilder::new_vertex();
        builder.constant_table_offset = 0;
        let bytes = builder.build();
        assert!(matches!(
            ShaderContainer::parse(&bytes),
            Err(ContainerError::MissingConstantTable)
        ));
    }

    #[test]
    fn rejects_nonzero_reserved_field() {
        let mut bytes = ContainerBuilder::new_vertex().build();
        // field1C is the first reserved word, at byte offset 0x1C.
        bytes[0x1F] = 1;
        assert!(matches!(
            ShaderContainer::parse(&bytes),
            Err(ContainerError::NonZeroReserved { .. })
        ));
    }
}
