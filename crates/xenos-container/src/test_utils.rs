//! Synthetic shader container builder used by this crate's own tests and by
//! `xenos-shader`'s integration tests. Only compiled behind `test-utils` /
//! `cfg(test)` — never part of the public parsing API.

use crate::container::{ShaderKind};
use crate::constant_table::RegisterSet;
use crate::shader::DeclUsage;

fn patch_u32(buf: &mut [u8], at: usize, value: u32) {
    buf[at..at + 4].copy_from_slice(&value.to_be_bytes());
}

fn push_u32(buf: &mut Vec<u8>, value: u32) {
    buf.extend_from_slice(&value.to_be_bytes());
}

fn push_u16(buf: &mut Vec<u8>, value: u16) {
    buf.extend_from_slice(&value.to_be_bytes());
}

struct RawConstant {
    name: String,
    register_set: RegisterSet,
    register_index: u16,
    register_count: u16,
}

struct RawVertexElement {
    usage: DeclUsage,
    usage_index: u8,
    fetch_slot: u8,
}

struct RawInterpolator {
    register: u8,
    usage: DeclUsage,
    usage_index: u8,
}

struct RawFloat4Definition {
    register_index: u16,
    count: u16,
    physical_offset: u32,
}

struct RawInt4Definition {
    register_index: u16,
    values: Vec<u32>,
}

/// Builds a well-formed (or deliberately malformed, via direct field
/// mutation) Xenos shader container byte-for-byte, the way `aero-dxbc`'s
/// test suite assembles synthetic DXBC blobs.
pub struct ContainerBuilder {
    kind: ShaderKind,
    pub constant_table_offset: u32,
    pub field_c: u32,
    constants: Vec<RawConstant>,
    float4_defs: Vec<RawFloat4Definition>,
    int4_defs: Vec<RawInt4Definition>,
    elements: Vec<RawVertexElement>,
    interpolators: Vec<RawInterpolator>,
    instructions: Vec<[u32; 3]>,
}

impl ContainerBuilder {
    fn new(kind: ShaderKind) -> Self {
        Self {
            kind,
            constant_table_offset: 1, // non-zero placeholder; overwritten in build()
            field_c: 0x0000_FF00,
            constants: Vec::new(),
            float4_defs: Vec::new(),
            int4_defs: Vec::new(),
            elements: Vec::new(),
            interpolators: Vec::new(),
            instructions: Vec::new(),
        }
    }

    pub fn new_vertex() -> Self {
        Self::new(ShaderKind::Vertex)
    }

    pub fn new_pixel() -> Self {
        Self::new(ShaderKind::Pixel)
    }

    pub fn add_constant(&mut self, name: &str, register_set: RegisterSet, register_index: u16, register_count: u16) -> &mut Self {
        self.constants.push(RawConstant {
            name: name.to_owned(),
            register_set,
            register_index,
            register_count,
        });
        self
    }

    pub fn add_float4_definition(&mut self, register_index: u16, count: u16, physical_offset: u32) -> &mut Self {
        self.float4_defs.push(RawFloat4Definition { register_index, count, physical_offset });
        self
    }

    pub fn add_int4_definition(&mut self, register_index: u16, values: Vec<u32>) -> &mut Self {
        self.int4_defs.push(RawInt4Definition { register_index, values });
        self
    }

    pub fn add_vertex_element(&mut self, usage: DeclUsage, usage_index: u8, fetch_slot: u8) -> &mut Self {
        self.elements.push(RawVertexElement { usage, usage_index, fetch_slot });
        self
    }

    pub fn add_interpolator(&mut self, register: u8, usage: DeclUsage, usage_index: u8) -> &mut Self {
        self.interpolators.push(RawInterpolator { register, usage, usage_index });
        self
    }

    pub fn add_instruction(&mut self, words: [u32; 3]) -> &mut Self {
        self.instructions.push(words);
        self
    }

    fn usage_raw(usage: DeclUsage) -> u8 {
        match usage {
            DeclUsage::Position => 0,
            DeclUsage::BlendWeight => 1,
            DeclUsage::BlendIndices => 2,
            DeclUsage::Normal => 3,
            DeclUsage::PointSize => 4,
            DeclUsage::Texcoord => 5,
            DeclUsage::Tangent => 6,
            DeclUsage::Binormal => 7,
            DeclUsage::TessFactor => 8,
            DeclUsage::PositionT => 9,
            DeclUsage::Color => 10,
            DeclUsage::Fog => 11,
            DeclUsage::Depth => 12,
            DeclUsage::Sample => 13,
        }
    }

    pub fn build(&self) -> Vec<u8> {
        let mut buf = vec![0u8; 32]; // header, patched at the end

        // --- constant table ---
        let constant_table_offset = buf.len() as u32;
        let constant_info_offset = buf.len() as u32 + 8;
        push_u32(&mut buf, self.constants.len() as u32);
        push_u32(&mut buf, constant_info_offset);

        // Reserve the ConstantInfo array; name offsets get patched once the
        // string pool (written right after) is laid out.
        let array_start = buf.len();
        buf.resize(array_start + self.constants.len() * 12, 0);

        for (i, c) in self.constants.iter().enumerate() {
            let name_offset = buf.len() as u32;
            buf.extend_from_slice(c.name.as_bytes());
            buf.push(0);

            let entry_at = array_start + i * 12;
            patch_u32(&mut buf, entry_at, name_offset);
            let reg_set: u16 = match c.register_set {
                RegisterSet::Bool => 0,
                RegisterSet::Int4 => 1,
                RegisterSet::Float4 => 2,
                RegisterSet::Sampler => 3,
            };
            buf[entry_at + 4..entry_at + 6].copy_from_slice(&reg_set.to_be_bytes());
            buf[entry_at + 6..entry_at + 8].copy_from_slice(&c.register_index.to_be_bytes());
            buf[entry_at + 8..entry_at + 10].copy_from_slice(&c.register_count.to_be_bytes());
        }

        // --- definition table ---
        let definition_table_offset = if self.float4_defs.is_empty() && self.int4_defs.is_empty() {
            0
        } else {
            buf.len() as u32
        };
        if definition_table_offset != 0 {
            for d in &self.float4_defs {
                push_u16(&mut buf, d.register_index);
                push_u16(&mut buf, d.count);
                push_u32(&mut buf, d.physical_offset);
            }
            push_u32(&mut buf, 0); // float4 terminator

            for d in &self.int4_defs {
                push_u16(&mut buf, d.register_index);
                push_u16(&mut buf, d.values.len() as u16);
                push_u32(&mut buf, 0); // reserved
                for v in &d.values {
                    push_u32(&mut buf, *v);
                }
            }
            push_u32(&mut buf, 0); // int4 terminator
        }

        // --- shader body ---
        let shader_offset = buf.len() as u32;
        push_u32(&mut buf, self.instructions.len() as u32); // instruction_count
        let microcode_offset_patch_at = buf.len();
        push_u32(&mut buf, 0); // microcode_offset, patched below

        match self.kind {
            ShaderKind::Vertex => {
                push_u32(&mut buf, self.elements.len() as u32);
                let element_offset_patch_at = buf.len();
                push_u32(&mut buf, 0);
                push_u32(&mut buf, self.interpolators.len() as u32);
                let interp_offset_patch_at = buf.len();
                push_u32(&mut buf, 0);

                let element_offset = buf.len() as u32;
                for e in &self.elements {
                    buf.push(Self::usage_raw(e.usage));
                    buf.push(e.usage_index);
                    buf.push(e.fetch_slot);
                    buf.push(0);
                }
                let interp_offset = buf.len() as u32;
                for i in &self.interpolators {
                    buf.push(i.register);
                    buf.push(Self::usage_raw(i.usage));
                    buf.push(i.usage_index);
                    buf.push(0);
                }

                patch_u32(&mut buf, element_offset_patch_at, element_offset);
                patch_u32(&mut buf, interp_offset_patch_at, interp_offset);
            }
            ShaderKind::Pixel => {
                push_u32(&mut buf, self.interpolators.len() as u32);
                let interp_offset_patch_at = buf.len();
                push_u32(&mut buf, 0);
                push_u32(&mut buf, self.field_c);

                let interp_offset = buf.len() as u32;
                for i in &self.interpolators {
                    buf.push(i.register);
                    buf.push(Self::usage_raw(i.usage));
                    buf.push(i.usage_index);
                    buf.push(0);
                }
                patch_u32(&mut buf, interp_offset_patch_at, interp_offset);
            }
        }

        let microcode_offset = buf.len() as u32;
        for words in &self.instructions {
            for w in words {
                push_u32(&mut buf, *w);
            }
        }
        patch_u32(&mut buf, microcode_offset_patch_at, microcode_offset);

        // --- header ---
        let flags_kind_bit: u32 = match self.kind {
            ShaderKind::Vertex => 0,
            ShaderKind::Pixel => 1,
        };
        let flags = 0x102A_1100 | flags_kind_bit;
        patch_u32(&mut buf, 0, flags);
        let buf_len = buf.len() as u32;
        patch_u32(&mut buf, 4, buf_len); // virtual_size
        patch_u32(&mut buf, 8, buf_len); // physical_size
        let effective_constant_table_offset = if self.constant_table_offset == 1 {
            constant_table_offset
        } else {
            self.constant_table_offset
        };
        patch_u32(&mut buf, 12, effective_constant_table_offset);
        patch_u32(&mut buf, 16, definition_table_offset);
        patch_u32(&mut buf, 20, shader_offset);
        patch_u32(&mut buf, 24, 0); // reserved field1C
        patch_u32(&mut buf, 28, 0); // reserved field20

        buf
    }
}
