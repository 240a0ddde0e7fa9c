//! Control-flow structuring: turns the flat control-flow instruction stream
//! into either nested structured blocks or a `pc`-dispatched interpreter
//! loop (`§4.4.1`, `§8.3` scenario 5, `§9`).
//!
//! Two passes, mirroring the original recompiler:
//! 1. scan every [`ControlFlowOpcode::CondJmp`] — any unconditional jump or
//!    any backward jump makes the graph irreducible;
//! 2. emit structured nested blocks when reducible, otherwise a
//!    `while (true) { switch (pc) { ... } }` interpreter.

use super::buffer::{print_to, println_to, EmitBuffer};
use crate::decode::control_flow::{ControlFlowInstruction, ControlFlowOpcode};
use crate::error::TranslateError;

/// Preserves the three behaviors `§9` names as must-not-fix:
/// - (a) `CondExecPredClean`/`CondExecPredCleanEnd` never return, because the
///   original computes `shouldReturn` as the same `opcode == CondExecEnd`
///   comparison twice instead of checking the Clean-suffixed End opcode.
/// - (b) the `condJmp.condition ^ simpleControlFlow` polarity flip between
///   structured and interpreter emission.
fn should_return(opcode: ControlFlowOpcode) -> bool {
    use ControlFlowOpcode::*;
    match opcode {
        CondExecPredClean | CondExecPredCleanEnd => opcode == CondExecEnd || opcode == CondExecEnd,
        ExecEnd | CondExecEnd | CondExecPredEnd => true,
        _ => false,
    }
}

fn is_exec_family(opcode: ControlFlowOpcode) -> bool {
    use ControlFlowOpcode::*;
    matches!(opcode, Exec | ExecEnd | CondExec | CondExecEnd | CondExecPredClean | CondExecPredCleanEnd | CondExecPred | CondExecPredEnd)
}

fn needs_bool_guard(opcode: ControlFlowOpcode) -> bool {
    use ControlFlowOpcode::*;
    matches!(opcode, CondExec | CondExecEnd | CondExecPredClean | CondExecPredCleanEnd | CondExecPred | CondExecPredEnd)
}

/// `true` if any `CondJmp` forces the interpreter fallback.
pub fn is_simple_control_flow(instructions: &[ControlFlowInstruction]) -> bool {
    for instr in instructions {
        if instr.opcode == ControlFlowOpcode::CondJmp && (instr.is_unconditional || instr.direction) {
            return false;
        }
    }
    true
}

fn emit_epilogue(buf: &mut EmitBuffer, is_vertex_shader: bool) {
    buf.indent();
    if is_vertex_shader {
        buf.push_str("oPos.xy += g_HalfPixelOffset * oPos.w;\n");
        buf.indent();
        buf.push_str("return output;\n");
    } else {
        buf.push_str("return output;\n");
    }
}

fn emit_exec_block<F: FnMut(&mut EmitBuffer, u32, u32, u32) -> Result<(), TranslateError>>(
    buf: &mut EmitBuffer,
    instr: &ControlFlowInstruction,
    is_vertex_shader: bool,
    emit_body: &mut F,
) -> Result<(), TranslateError> {
    let guarded = needs_bool_guard(instr.opcode) && instr.is_predicated;
    if guarded {
        buf.indent();
        println_to!(buf, "if ({}b{})", if instr.condition { "" } else { "!" }, instr.bool_address);
        buf.open_brace();
    }

    emit_body(buf, instr.address, instr.count, instr.sequence)?;

    if should_return(instr.opcode) {
        emit_epilogue(buf, is_vertex_shader);
    }

    if guarded {
        buf.close_brace();
    }

    Ok(())
}

fn emit_structured<F: FnMut(&mut EmitBuffer, u32, u32, u32) -> Result<(), TranslateError>>(
    buf: &mut EmitBuffer,
    instructions: &[ControlFlowInstruction],
    is_vertex_shader: bool,
    simple_control_flow: bool,
    emit_body: &mut F,
) -> Result<(), TranslateError> {
    let mut close_at: Vec<usize> = Vec::new();

    for (pc, instr) in instructions.iter().enumerate() {
        while close_at.last() == Some(&pc) {
            close_at.pop();
            buf.close_brace();
        }

        match instr.opcode {
            ControlFlowOpcode::CondJmp => {
                let condition = instr.condition ^ simple_control_flow;
                buf.indent();
                println_to!(buf, "if ({}b{})", if condition { "" } else { "!" }, instr.bool_address);
                buf.open_brace();
                close_at.push(instr.address as usize);
                close_at.sort_unstable();
            }
            ControlFlowOpcode::LoopStart => {
                buf.indent();
                println_to!(buf, "for (aL = 0; aL < (int)g_LoopConstants[{}].x; aL++)", instr.loop_id);
                buf.open_brace();
            }
            ControlFlowOpcode::LoopEnd => {
                buf.close_brace();
            }
            opcode if is_exec_family(opcode) => {
                emit_exec_block(buf, instr, is_vertex_shader, emit_body)?;
            }
            _ => {}
        }
    }

    while close_at.pop().is_some() {
        buf.close_brace();
    }

    Ok(())
}

fn emit_interpreter<F: FnMut(&mut EmitBuffer, u32, u32, u32) -> Result<(), TranslateError>>(
    buf: &mut EmitBuffer,
    instructions: &[ControlFlowInstruction],
    is_vertex_shader: bool,
    simple_control_flow: bool,
    emit_body: &mut F,
) -> Result<(), TranslateError> {
    buf.indent();
    buf.push_str("uint pc = 0;\n");
    buf.indent();
    buf.push_str("while (true)\n");
    buf.open_brace();
    buf.indent();
    buf.push_str("switch (pc)\n");
    buf.open_brace();

    for (pc, instr) in instructions.iter().enumerate() {
        buf.indent();
        println_to!(buf, "case {}:", pc);
        buf.open_brace();

        match instr.opcode {
            ControlFlowOpcode::CondJmp => {
                let condition = instr.condition ^ simple_control_flow;
                buf.indent();
                print_to!(buf, "if ({}b{}) ", if condition { "" } else { "!" }, instr.bool_address);
                println_to!(buf, "{{ pc = {}; continue; }}", instr.address);
                buf.indent();
                println_to!(buf, "pc = {};", pc + 1);
            }
            ControlFlowOpcode::LoopStart | ControlFlowOpcode::LoopEnd => {
                buf.indent();
                println_to!(buf, "pc = {};", pc + 1);
            }
            opcode if is_exec_family(opcode) => {
                emit_exec_block(buf, instr, is_vertex_shader, emit_body)?;
                buf.indent();
                println_to!(buf, "pc = {};", pc + 1);
            }
            _ => {
                buf.indent();
                println_to!(buf, "pc = {};", pc + 1);
            }
        }

        buf.indent();
        buf.push_str("continue;\n");
        buf.close_brace();
    }

    buf.indent();
    buf.push_str("default:\n");
    buf.open_brace();
    emit_epilogue(buf, is_vertex_shader);
    buf.close_brace();

    buf.close_brace();
    buf.close_brace();

    Ok(())
}

/// Entry point: decides reducibility once, then emits accordingly.
pub fn emit<F: FnMut(&mut EmitBuffer, u32, u32, u32) -> Result<(), TranslateError>>(
    buf: &mut EmitBuffer,
    instructions: &[ControlFlowInstruction],
    is_vertex_shader: bool,
    mut emit_body: F,
) -> Result<bool, TranslateError> {
    let simple_control_flow = is_simple_control_flow(instructions);
    if simple_control_flow {
        emit_structured(buf, instructions, is_vertex_shader, simple_control_flow, &mut emit_body)?;
    } else {
        emit_interpreter(buf, instructions, is_vertex_shader, simple_control_flow, &mut emit_body)?;
    }
    Ok(simple_control_flow)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn instr(opcode: ControlFlowOpcode) -> ControlFlowInstruction {
        ControlFlowInstruction {
            opcode,
            address: 0,
            count: 0,
            sequence: 0,
            condition: false,
            is_predicated: false,
            is_unconditional: false,
            direction: false,
            bool_address: 0,
            loop_id: 0,
        }
    }

    #[test]
    fn clean_variants_never_return() {
        assert!(!should_return(ControlFlowOpcode::CondExecPredClean));
        assert!(!should_return(ControlFlowOpcode::CondExecPredCleanEnd));
        assert!(should_return(ControlFlowOpcode::ExecEnd));
        assert!(should_return(ControlFlowOpcode::CondExecEnd));
    }

    #[test]
    fn backward_jump_forces_interpreter() {
        let mut jmp = instr(ControlFlowOpcode::CondJmp);
        jmp.direction = true;
        assert!(!is_simple_control_flow(&[jmp]));
    }

    #[test]
    fn forward_conditional_jump_stays_simple() {
        let mut jmp = instr(ControlFlowOpcode::CondJmp);
        jmp.direction = false;
        jmp.is_unconditional = false;
        assert!(is_simple_control_flow(&[jmp]));
    }

    #[test]
    fn irreducible_graph_emits_pc_switch() {
        let mut buf = EmitBuffer::new();
        let mut body = instr(ControlFlowOpcode::ExecEnd);
        body.address = 0;
        body.count = 1;
        let mut jmp = instr(ControlFlowOpcode::CondJmp);
        jmp.direction = true;
        jmp.address = 0;
        let instructions = [jmp, body];
        let simple = emit(&mut buf, &instructions, true, |_, _, _, _| Ok(())).unwrap();
        assert!(!simple);
        assert!(buf.text.contains("uint pc = 0;"));
        assert!(buf.text.contains("switch (pc)"));
        assert!(buf.text.contains("{ pc = 0; continue; }"));
        assert!(buf.text.contains("oPos.xy += g_HalfPixelOffset * oPos.w;"));
    }

    #[test]
    fn vertex_terminator_matches_exact_epilogue() {
        let mut buf = EmitBuffer::new();
        emit_epilogue(&mut buf, true);
        assert_eq!(buf.text, "\toPos.xy += g_HalfPixelOffset * oPos.w;\n\treturn output;\n");
    }
}
