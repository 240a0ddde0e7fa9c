//! Parser for the Xenos (Xbox 360 GPU) shader container format.
//!
//! A container is a single fixed 32-byte header followed by a constant
//! table, an optional definition table, and the shader body (vertex or
//! pixel) with its inline microcode stream. This crate only parses that
//! container; decoding the microcode itself and emitting portable shader
//! source is `xenos-shader`'s job.

pub mod constant_table;
pub mod container;
pub mod definitions;
pub mod error;
pub mod reader;
pub mod shader;

#[cfg(any(test, feature = "test-utils"))]
pub mod test_utils;

pub use constant_table::{ConstantInfo, ConstantTable, RegisterSet};
pub use container::{ShaderContainer, ShaderKind};
pub use definitions::{DefinitionTable, Float4Definition, Int4Definition};
pub use error::ContainerError;
pub use shader::{DeclUsage, Interpolator, PixelShader, ShaderCommon, VertexElement, VertexShader};

/// A fully parsed shader container: header plus every sub-table, ready to
/// hand to `xenos-shader::translate`.
#[derive(Debug, Clone)]
pub enum ParsedShader {
    Vertex {
        container: ShaderContainer,
        constant_table: ConstantTable,
        definitions: DefinitionTable,
        shader: VertexShader,
    },
    Pixel {
        container: ShaderContainer,
        constant_table: ConstantTable,
        definitions: DefinitionTable,
        shader: PixelShader,
    },
}

/// Parses a complete shader container out of `data`, dispatching to the
/// vertex or pixel shader body parser based on the header's shader-kind bit.
pub fn parse(data: &[u8]) -> Result<ParsedShader, ContainerError> {
    let container = ShaderContainer::parse(data)?;
    let constant_table = ConstantTable::parse(data, container.constant_table_offset as usize)?;
    let definitions = DefinitionTable::parse(data, container.definition_table_offset as usize)?;

    Ok(match container.kind() {
        ShaderKind::Vertex => ParsedShader::Vertex {
            shader: VertexShader::parse(data, container.shader_offset as usize)?,
            container,
            constant_table,
            definitions,
        },
        ShaderKind::Pixel => ParsedShader::Pixel {
            shader: PixelShader::parse(data, container.shader_offset as usize)?,
            container,
            constant_table,
            definitions,
        },
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::ContainerBuilder;

    #[test]
    fn parses_end_to_end_vertex_shader() {
        let mut builder = ContainerBuilder::new_vertex();
        builder.add_constant("g_MtxProjection", RegisterSet::Float4, 0, 4);
        builder.add_vertex_element(DeclUsage::Position, 0, 0);
        builder.add_instruction([0, 0, 0]);
        let bytes = builder.build();

        match parse(&bytes).unwrap() {
            ParsedShader::Vertex { constant_table, shader, .. } => {
                assert_eq!(constant_table.constants.len(), 1);
                assert_eq!(shader.elements.len(), 1);
                assert_eq!(shader.common.instruction_count, 1);
            }
            ParsedShader::Pixel { .. } => panic!("expected vertex shader"),
        }
    }

    #[test]
    fn parses_end_to_end_pixel_shader() {
        let mut builder = ContainerBuilder::new_pixel();
        builder.add_constant("g_Sampler0", RegisterSet::Sampler, 0, 1);
        let bytes = builder.build();

        match parse(&bytes).unwrap() {
            ParsedShader::Pixel { constant_table, .. } => {
                assert_eq!(constant_table.constants.len(), 1);
            }
            ParsedShader::Vertex { .. } => panic!("expected pixel shader"),
        }
    }
}
