//! Mutable tables built from the constant table and used read-only during
//! instruction emission (`§3.2`, `§4.2`).

use hashbrown::HashMap;
use xenos_container::{ConstantTable, RegisterSet, ShaderKind};

use crate::FeatureMask;

/// A single `float4` constant binding: the owning constant's name plus the
/// base register it starts at (so a multi-register range can compute its
/// element index as `register - base`).
#[derive(Debug, Clone)]
pub struct Float4Binding {
    pub name: String,
    pub base_register: u32,
    pub register_count: u32,
}

/// Heuristic flags set by name-matching well-known constants, gated behind
/// the extended profile (`§3.2`).
#[derive(Debug, Clone, Copy, Default)]
pub struct HeuristicFlags {
    pub has_mtx_projection: bool,
    pub has_mtx_prev_inv_view_projection: bool,
    pub has_index_count: bool,
    pub is_meta_instancer: bool,
}

#[derive(Debug, Clone, Default)]
pub struct SymbolEnvironment {
    pub float4_constants: HashMap<u32, Float4Binding>,
    pub samplers: HashMap<u32, String>,
    pub bool_constants: HashMap<u32, String>,
    pub heuristics: HeuristicFlags,
    pub feature_mask: FeatureMask,
}

/// Stage-dependent float4 constant register limit used for the array
/// accessor's tail-zero bound (`§4.2`).
fn stage_limit(kind: ShaderKind) -> u32 {
    match kind {
        ShaderKind::Vertex => 256,
        ShaderKind::Pixel => 224,
    }
}

impl SymbolEnvironment {
    pub fn build(constant_table: &ConstantTable, kind: ShaderKind) -> Self {
        let mut env = Self::default();
        let limit = stage_limit(kind);

        for constant in &constant_table.constants {
            match constant.register_set {
                RegisterSet::Float4 => {
                    let count = (constant.register_count as u32).min(limit.saturating_sub(constant.register_index as u32));
                    for offset in 0..count {
                        let register = constant.register_index as u32 + offset;
                        env.float4_constants.insert(
                            register,
                            Float4Binding {
                                name: constant.name.clone(),
                                base_register: constant.register_index as u32,
                                register_count: constant.register_count as u32,
                            },
                        );
                    }
                }
                RegisterSet::Sampler => {
                    env.samplers.insert(constant.register_index as u32, constant.name.clone());
                }
                RegisterSet::Bool => {
                    env.bool_constants.insert(constant.register_index as u32, constant.name.clone());
                }
                RegisterSet::Int4 => {}
            }

            env.apply_heuristics(&constant.name);
        }

        env
    }

    fn apply_heuristics(&mut self, name: &str) {
        match name {
            "g_MtxProjection" => self.heuristics.has_mtx_projection = true,
            "g_MtxPrevInvViewProjection" => self.heuristics.has_mtx_prev_inv_view_projection = true,
            "g_IndexCount" => self.heuristics.has_index_count = true,
            "g_InstanceTypes" => self.heuristics.is_meta_instancer = true,
            _ => {}
        }
    }

    /// Returns the `#define`d bit expression for a bool constant at
    /// `register_index`: `1 << (registerIndex + pixelOffset)` (`§4.2`).
    pub fn bool_bit_expr(register_index: u32, kind: ShaderKind) -> String {
        let pixel_offset = match kind {
            ShaderKind::Pixel => 16,
            ShaderKind::Vertex => 0,
        };
        format!("(1 << {})", register_index + pixel_offset)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xenos_container::test_utils::ContainerBuilder;

    #[test]
    fn binds_every_register_in_a_float4_range() {
        let mut builder = ContainerBuilder::new_vertex();
        builder.add_constant("g_MtxProjection", RegisterSet::Float4, 10, 4);
        let bytes = builder.build();
        let container = xenos_container::ShaderContainer::parse(&bytes).unwrap();
        let table = ConstantTable::parse(&bytes, container.constant_table_offset as usize).unwrap();

        let env = SymbolEnvironment::build(&table, ShaderKind::Vertex);
        assert_eq!(env.float4_constants.len(), 4);
        assert!(env.float4_constants.contains_key(&13));
        assert!(env.heuristics.has_mtx_projection);
    }

    #[test]
    fn float4_range_is_clamped_at_stage_limit() {
        let mut builder = ContainerBuilder::new_pixel();
        builder.add_constant("g_Huge", RegisterSet::Float4, 220, 16);
        let bytes = builder.build();
        let container = xenos_container::ShaderContainer::parse(&bytes).unwrap();
        let table = ConstantTable::parse(&bytes, container.constant_table_offset as usize).unwrap();

        let env = SymbolEnvironment::build(&table, ShaderKind::Pixel);
        // stage limit for pixel shaders is 224; registers [220,224) are bound, [224,236) are not.
        assert_eq!(env.float4_constants.len(), 4);
        assert!(!env.float4_constants.contains_key(&224));
    }
}
