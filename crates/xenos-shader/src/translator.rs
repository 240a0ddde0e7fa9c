//! Ties decode, symbol resolution, and emission together into one shader
//! translation pass (`§3`, `§4`).

use hashbrown::HashMap;
use tracing::{debug, trace};

use xenos_container::shader::ShaderCommon;
use xenos_container::{ConstantTable, DefinitionTable, ParsedShader, ShaderKind};

use crate::decode::control_flow::{decode_pair, ControlFlowInstruction, ControlFlowOpcode};
use crate::decode::{decode_instruction, FetchOrAlu};
use crate::emit::buffer::EmitBuffer;
use crate::emit::{alu, prologue, structurer, texture_fetch, vertex_fetch};
use crate::error::TranslateError;
use crate::symbols::SymbolEnvironment;
use crate::{FeatureMask, TranslateOptions};

/// The translated source plus the feature bits it was generated under.
#[derive(Debug, Clone)]
pub struct TranslateOutput {
    pub source: String,
    pub feature_mask: FeatureMask,
    pub is_simple_control_flow: bool,
}

/// One shader's translation state. Reset between calls rather than
/// recreated, mirroring the teacher's reusable-encoder-context pattern.
#[derive(Debug, Default)]
pub struct Translator {
    options: TranslateOptions,
}

fn is_end_opcode(opcode: ControlFlowOpcode) -> bool {
    use ControlFlowOpcode::*;
    matches!(opcode, ExecEnd | CondExecEnd | CondExecPredCleanEnd | CondExecPredEnd)
}

/// Scans control-flow pairs from slot 0 until an "end" opcode is seen.
/// Returns the flattened instruction list and the body's starting slot.
fn decode_control_flow_program(common: &ShaderCommon, data: &[u8]) -> Result<(Vec<ControlFlowInstruction>, u32), TranslateError> {
    let mut instructions = Vec::new();
    let mut slot = 0u32;

    loop {
        if slot >= common.instruction_count {
            break;
        }
        let words = common.instruction_words(data, slot).map_err(|_| TranslateError::TruncatedInput { address: slot })?;
        let pair = decode_pair(words);
        let hit_end = pair.iter().any(|i| is_end_opcode(i.opcode));
        instructions.extend(pair);
        slot += 1;
        if hit_end {
            break;
        }
    }

    Ok((instructions, slot))
}

impl Translator {
    pub fn new(options: TranslateOptions) -> Self {
        Self { options }
    }

    /// Resets the translator to a fresh state for the next shader, keeping
    /// the configured options. Cheap since all per-shader state is local to
    /// [`Translator::translate`]; this exists so callers can reuse one
    /// `Translator` across a batch without re-threading `options`.
    pub fn reset(&mut self) {}

    pub fn translate(&mut self, shader_bytes: &[u8]) -> Result<TranslateOutput, TranslateError> {
        let parsed = xenos_container::parse(shader_bytes)?;

        match parsed {
            ParsedShader::Vertex { container: _, constant_table, definitions, shader } => {
                self.translate_vertex(shader_bytes, &constant_table, &definitions, &shader)
            }
            ParsedShader::Pixel { container: _, constant_table, definitions, shader } => {
                self.translate_pixel(shader_bytes, &constant_table, &definitions, &shader)
            }
        }
    }

    fn translate_vertex(
        &mut self,
        data: &[u8],
        constant_table: &ConstantTable,
        definitions: &DefinitionTable,
        shader: &xenos_container::shader::VertexShader,
    ) -> Result<TranslateOutput, TranslateError> {
        let mut symbols = SymbolEnvironment::build(constant_table, ShaderKind::Vertex);
        let mut feature_mask = FeatureMask::empty();

        let elements_by_slot: HashMap<u8, xenos_container::shader::VertexElement> =
            shader.elements.iter().map(|e| (e.fetch_slot, *e)).collect();
        let interpolator_names: HashMap<u32, String> = shader
            .interpolators
            .iter()
            .map(|i| (i.register as u32, format!("oTexCoord{}", i.register)))
            .collect();

        let mut buf = EmitBuffer::new();
        prologue::emit_backend_guards(&mut buf);
        prologue::emit_vertex_input_struct(&mut buf, &shader.elements);
        prologue::emit_interpolator_struct(&mut buf, "VertexOutput", &shader.interpolators, true);
        prologue::emit_literal_constants(&mut buf, data, definitions, &symbols)?;
        prologue::emit_entry_point_open(&mut buf, ShaderKind::Vertex, "VertexOutput", "VertexInput");

        let (cf_instructions, body_start) = decode_control_flow_program(&shader.common, data)?;
        debug!(count = cf_instructions.len(), "decoded vertex control-flow program");

        let simple = structurer::emit(&mut buf, &cf_instructions, true, |buf, address, count, sequence| {
            for i in 0..count {
                let slot = body_start + address + i;
                let words = shader.common.instruction_words(data, slot).map_err(|_| TranslateError::TruncatedInput { address: slot })?;
                let is_fetch = (sequence >> (i * 2)) & 1 != 0;
                trace!(slot, is_fetch, "emitting body instruction");
                match decode_instruction(words, is_fetch, slot)? {
                    FetchOrAlu::VertexFetch(instr) => {
                        let element = elements_by_slot.get(&(instr.fetch_slot as u8));
                        vertex_fetch::emit(buf, &instr, element, &self.options, &mut feature_mask, slot)?;
                    }
                    FetchOrAlu::TextureFetch(_) => {
                        // Vertex shaders do not sample textures in this target set (`§4`, Non-goals).
                    }
                    FetchOrAlu::Alu(instr) => {
                        let mut ctx = alu::AluEmitContext {
                            is_pixel_shader: false,
                            symbols: &mut symbols,
                            options: self.options,
                            interpolator_names: &interpolator_names,
                        };
                        alu::emit(buf, &instr, &mut ctx)?;
                    }
                }
            }
            Ok(())
        })?;

        buf.close_brace();

        Ok(TranslateOutput { source: buf.text, feature_mask: symbols.feature_mask | feature_mask, is_simple_control_flow: simple })
    }

    fn translate_pixel(
        &mut self,
        data: &[u8],
        constant_table: &ConstantTable,
        definitions: &DefinitionTable,
        shader: &xenos_container::shader::PixelShader,
    ) -> Result<TranslateOutput, TranslateError> {
        let mut symbols = SymbolEnvironment::build(constant_table, ShaderKind::Pixel);
        let mut feature_mask = FeatureMask::empty();
        if self.options.extended_profile {
            feature_mask.insert(FeatureMask::ALPHA_TEST);
        }

        let interpolator_names: HashMap<u32, String> = HashMap::new();

        let mut buf = EmitBuffer::new();
        prologue::emit_backend_guards(&mut buf);
        prologue::emit_interpolator_struct(&mut buf, "PixelInput", &shader.interpolators, shader.position_register != 0xFF);
        prologue::emit_pixel_output_struct(&mut buf, true);
        prologue::emit_literal_constants(&mut buf, data, definitions, &symbols)?;
        prologue::emit_entry_point_open(&mut buf, ShaderKind::Pixel, "PixelOutput", "PixelInput");

        let (cf_instructions, body_start) = decode_control_flow_program(&shader.common, data)?;
        debug!(count = cf_instructions.len(), "decoded pixel control-flow program");

        let simple = structurer::emit(&mut buf, &cf_instructions, false, |buf, address, count, sequence| {
            for i in 0..count {
                let slot = body_start + address + i;
                let words = shader.common.instruction_words(data, slot).map_err(|_| TranslateError::TruncatedInput { address: slot })?;
                let is_fetch = (sequence >> (i * 2)) & 1 != 0;
                match decode_instruction(words, is_fetch, slot)? {
                    FetchOrAlu::VertexFetch(_) => {
                        // Pixel shaders never issue vertex fetches (`§4`, Non-goals).
                    }
                    FetchOrAlu::TextureFetch(instr) => {
                        texture_fetch::emit(buf, &instr, &symbols, &self.options, &mut feature_mask)?;
                    }
                    FetchOrAlu::Alu(instr) => {
                        let mut ctx = alu::AluEmitContext {
                            is_pixel_shader: true,
                            symbols: &mut symbols,
                            options: self.options,
                            interpolator_names: &interpolator_names,
                        };
                        alu::emit(buf, &instr, &mut ctx)?;
                    }
                }
            }
            Ok(())
        })?;

        buf.close_brace();

        Ok(TranslateOutput { source: buf.text, feature_mask: symbols.feature_mask | feature_mask, is_simple_control_flow: simple })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use xenos_container::test_utils::ContainerBuilder;

    fn exec_end_word() -> [u32; 3] {
        // ControlFlowOpcode::ExecEnd = 1 in the low nibble, count = 1 at COUNT_START (16).
        let first = 1u64 | (1u64 << 16);
        let word0 = (first & 0xFFFF_FFFF) as u32;
        let word1 = ((first >> 32) & 0xFFFF) as u32;
        [word0, word1, 0]
    }

    #[test]
    fn translates_minimal_vertex_shader_without_panicking() {
        let mut builder = ContainerBuilder::new_vertex();
        builder.add_vertex_element(xenos_container::shader::DeclUsage::Position, 0, 0);
        builder.add_instruction(exec_end_word());
        // body: one ALU instruction (opcode 0 = Add, everything else zero)
        builder.add_instruction([0, 0, 0]);
        let bytes = builder.build();

        let mut translator = Translator::new(TranslateOptions::default());
        let output = translator.translate(&bytes).unwrap();
        assert!(output.source.contains("main(VertexInput input)"));
        assert!(output.source.contains("return output;"));
    }
}
