//! ALU instruction emission (`§4.4.5`, `§4.4.6`).

use hashbrown::HashMap;

use super::buffer::{print_to, println_to, EmitBuffer};
use crate::decode::alu::{AluInstruction, AluScalarOpcode, AluVectorOpcode};
use crate::error::TranslateError;
use crate::symbols::SymbolEnvironment;
use crate::TranslateOptions;

const SWIZZLES: [char; 8] = ['x', 'y', 'z', 'w', '0', '1', '_', '_'];

enum Operand {
    Vector0,
    Vector1,
    Vector2,
    Scalar0,
    Scalar1,
    ScalarConstant0,
    ScalarConstant1,
}

/// Context threaded through a single ALU instruction's emission: everything
/// the teacher's `recompile(const AluInstruction&)` closes over via member
/// state plus a couple of locals.
pub struct AluEmitContext<'a> {
    pub is_pixel_shader: bool,
    pub symbols: &'a mut SymbolEnvironment,
    pub options: TranslateOptions,
    /// Maps a vertex shader's non-position export slot (`vectorDest`) to the
    /// interpolator field name declared for it, built from the container's
    /// inline interpolator table by the translator before emission starts.
    pub interpolator_names: &'a HashMap<u32, String>,
}

fn resolve_operand(instr: &AluInstruction, ctx: &AluEmitContext<'_>, operand: Operand) -> String {
    let (reg_raw, swizzle, select, negate, force_abs) = match operand {
        Operand::ScalarConstant0 => (instr.src3.register, instr.src3.swizzle, false, instr.src3.negate, Some(instr.abs_constants)),
        Operand::ScalarConstant1 => {
            let reg = (instr.scalar_opcode as u32 & 1) | ((instr.src3.select as u32) << 1) | (instr.src3.swizzle & 0x3C);
            (reg, instr.src3.swizzle, true, instr.src3.negate, Some(instr.abs_constants))
        }
        Operand::Vector0 => (instr.src1.register, instr.src1.swizzle, instr.src1.select, instr.src1.negate, None),
        Operand::Vector1 => (instr.src2.register, instr.src2.swizzle, instr.src2.select, instr.src2.negate, None),
        Operand::Vector2 | Operand::Scalar0 | Operand::Scalar1 => {
            (instr.src3.register, instr.src3.swizzle, instr.src3.select, instr.src3.negate, None)
        }
    };

    let (reg, select, abs) = if matches!(operand, Operand::ScalarConstant0 | Operand::ScalarConstant1) {
        (reg_raw, select, force_abs.unwrap_or(false))
    } else if select {
        (reg_raw & 0x3F, true, (reg_raw & 0x80) != 0)
    } else {
        (reg_raw, false, instr.abs_constants)
    };

    let reg_formatted = if select {
        format!("r{reg}")
    } else if let Some(binding) = ctx.symbols.float4_constants.get(&reg) {
        if binding.register_count > 1 {
            let relative = if instr.const0_relative {
                if instr.const_address_register_relative { " + a0" } else { " + aL" }
            } else {
                ""
            };
            format!("{}({}{})", binding.name, reg - binding.base_register, relative)
        } else {
            binding.name.clone()
        }
    } else {
        format!("c{reg}")
    };

    let mut result = String::new();
    if negate {
        result.push('-');
    }
    if abs {
        result.push_str("abs(");
    }
    result.push_str(&reg_formatted);
    result.push('.');

    match operand {
        Operand::Vector0 | Operand::Vector1 | Operand::Vector2 => {
            let mask = match instr.vector_opcode {
                AluVectorOpcode::Dp2Add => {
                    if matches!(operand, Operand::Vector2) { 0b1 } else { 0b11 }
                }
                AluVectorOpcode::Dp3 => 0b111,
                AluVectorOpcode::Dp4 | AluVectorOpcode::Max4 => 0b1111,
                _ => if instr.vector_write_mask != 0 { instr.vector_write_mask } else { 0b1 },
            };
            for i in 0..4u32 {
                if (mask >> i) & 1 != 0 {
                    result.push(SWIZZLES[(((swizzle >> (i * 2)) + i) & 0x3) as usize]);
                }
            }
        }
        Operand::Scalar0 | Operand::ScalarConstant0 => {
            result.push(SWIZZLES[(((swizzle >> 6) + 3) & 0x3) as usize]);
        }
        Operand::Scalar1 | Operand::ScalarConstant1 => {
            result.push(SWIZZLES[(swizzle & 0x3) as usize]);
        }
    }

    if abs {
        result.push(')');
    }
    result
}

enum ExportTarget {
    None,
    Register(String, bool), // expression, is_vector (false => scalar destination like oDepth)
}

fn resolve_export(instr: &AluInstruction, ctx: &mut AluEmitContext<'_>) -> ExportTarget {
    if !instr.export_data {
        return ExportTarget::None;
    }
    if ctx.is_pixel_shader {
        match instr.vector_dest {
            0 => ExportTarget::Register("oC0".into(), true),
            1 => ExportTarget::Register("oC1".into(), true),
            2 => ExportTarget::Register("oC2".into(), true),
            3 => ExportTarget::Register("oC3".into(), true),
            _ => ExportTarget::Register("oDepth".into(), false),
        }
    } else if instr.vector_dest == 0 {
        ExportTarget::Register("oPos".into(), true)
    } else {
        let expr = ctx
            .interpolator_names
            .get(&instr.vector_dest)
            .cloned()
            .unwrap_or_else(|| format!("oTexCoord{}", instr.vector_dest));
        ExportTarget::Register(expr, true)
    }
}

fn vector_expr(buf: &mut EmitBuffer, instr: &AluInstruction, ctx: &AluEmitContext<'_>) {
    use AluVectorOpcode::*;
    let v0 = || resolve_operand(instr, ctx, Operand::Vector0);
    let v1 = || resolve_operand(instr, ctx, Operand::Vector1);
    let v2 = || resolve_operand(instr, ctx, Operand::Vector2);
    match instr.vector_opcode {
        Add => print_to!(buf, "{} + {}", v0(), v1()),
        Mul => print_to!(buf, "{} * {}", v0(), v1()),
        Max | MaxA => print_to!(buf, "max({}, {})", v0(), v1()),
        Min => print_to!(buf, "min({}, {})", v0(), v1()),
        Seq => print_to!(buf, "{} == {}", v0(), v1()),
        Sgt => print_to!(buf, "{} > {}", v0(), v1()),
        Sge => print_to!(buf, "{} >= {}", v0(), v1()),
        Sne => print_to!(buf, "{} != {}", v0(), v1()),
        Frc => print_to!(buf, "frac({})", v0()),
        Trunc => print_to!(buf, "trunc({})", v0()),
        Floor => print_to!(buf, "floor({})", v0()),
        Mad => print_to!(buf, "{} * {} + {}", v0(), v1(), v2()),
        CndEq => print_to!(buf, "selectWrapper({} == 0.0, {}, {})", v0(), v1(), v2()),
        CndGe => print_to!(buf, "selectWrapper({} >= 0.0, {}, {})", v0(), v1(), v2()),
        CndGt => print_to!(buf, "selectWrapper({} > 0.0, {}, {})", v0(), v1(), v2()),
        Dp4 | Dp3 => print_to!(buf, "dot({}, {})", v0(), v1()),
        Dp2Add => print_to!(buf, "dot({}, {}) + {}", v0(), v1(), v2()),
        Cube => {
            println_to!(buf, "\n#ifdef __air__");
            buf.indent();
            print_to!(buf, "cube(r{}, &cubeMapData)", instr.src1.register);
            println_to!(buf, "\n#else");
            buf.indent();
            print_to!(buf, "cube(r{}, cubeMapData)", instr.src1.register);
            println_to!(buf, "\n#endif");
        }
        Max4 => print_to!(buf, "max4({})", v0()),
        SetpEqPush | SetpNePush | SetpGtPush | SetpGePush => print_to!(buf, "p0 ? 0.0 : {} + 1.0", v0()),
        KillEq => print_to!(buf, "any({} == {})", v0(), v1()),
        KillGt => print_to!(buf, "any({} > {})", v0(), v1()),
        KillGe => print_to!(buf, "any({} >= {})", v0(), v1()),
        KillNe => print_to!(buf, "any({} != {})", v0(), v1()),
        Dst => print_to!(buf, "dst({}, {})", v0(), v1()),
    }
}

fn scalar_expr(buf: &mut EmitBuffer, instr: &AluInstruction, ctx: &AluEmitContext<'_>) {
    use AluScalarOpcode::*;
    let s0 = || resolve_operand(instr, ctx, Operand::Scalar0);
    let s1 = || resolve_operand(instr, ctx, Operand::Scalar1);
    let sc0 = || resolve_operand(instr, ctx, Operand::ScalarConstant0);
    let sc1 = || resolve_operand(instr, ctx, Operand::ScalarConstant1);
    match instr.scalar_opcode {
        RetainPrev => {}
        Adds => print_to!(buf, "{} + {}", s0(), s1()),
        AddsPrev => print_to!(buf, "{} + ps", s0()),
        Muls => print_to!(buf, "{} * {}", s0(), s1()),
        MulsPrev | MulsPrev2 => print_to!(buf, "{} * ps", s0()),
        Maxs | MaxAs | MaxAsf => print_to!(buf, "max({}, {})", s0(), s1()),
        Mins => print_to!(buf, "min({}, {})", s0(), s1()),
        Seqs => print_to!(buf, "{} == 0.0", s0()),
        Sgts => print_to!(buf, "{} > 0.0", s0()),
        Sges => print_to!(buf, "{} >= 0.0", s0()),
        Snes => print_to!(buf, "{} != 0.0", s0()),
        Frcs => print_to!(buf, "frac({})", s0()),
        Truncs => print_to!(buf, "trunc({})", s0()),
        Floors => print_to!(buf, "floor({})", s0()),
        Exp => print_to!(buf, "exp2({})", s0()),
        Logc | Log => print_to!(buf, "clamp(log2({}), FLT_MIN, FLT_MAX)", s0()),
        Rcpc | Rcpf | Rcp => print_to!(buf, "clamp(rcp({}), FLT_MIN, FLT_MAX)", s0()),
        Rsqc | Rsqf | Rsq => print_to!(buf, "clamp(rsqrt({}), FLT_MIN, FLT_MAX)", s0()),
        Subs => print_to!(buf, "{} - {}", s0(), s1()),
        SubsPrev => print_to!(buf, "{} - ps", s0()),
        SetpEq | SetpNe | SetpGt | SetpGe => print_to!(buf, "p0 ? 0.0 : 1.0"),
        SetpInv => print_to!(buf, "{0} == 0.0 ? 1.0 : {0}", s0()),
        SetpPop => print_to!(buf, "p0 ? 0.0 : ({} - 1.0)", s0()),
        SetpClr => print_to!(buf, "FLT_MAX"),
        SetpRstr => print_to!(buf, "p0 ? 0.0 : {}", s0()),
        KillsEq => print_to!(buf, "{} == 0.0", s0()),
        KillsGt => print_to!(buf, "{} > 0.0", s0()),
        KillsGe => print_to!(buf, "{} >= 0.0", s0()),
        KillsNe => print_to!(buf, "{} != 0.0", s0()),
        KillsOne => print_to!(buf, "{} == 1.0", s0()),
        Sqrt => print_to!(buf, "sqrt({})", s0()),
        Mulsc0 | Mulsc1 => print_to!(buf, "{} * {}", sc0(), sc1()),
        Addsc0 | Addsc1 => print_to!(buf, "{} + {}", sc0(), sc1()),
        Subsc0 | Subsc1 => print_to!(buf, "{} - {}", sc0(), sc1()),
        Sin => print_to!(buf, "sin({})", s0()),
        Cos => print_to!(buf, "cos({})", s0()),
    }
}

pub fn emit(buf: &mut EmitBuffer, instr: &AluInstruction, ctx: &mut AluEmitContext<'_>) -> Result<(), TranslateError> {
    if instr.is_predicated {
        buf.indent();
        println_to!(buf, "if ({}p0)", if instr.predicate_condition { "" } else { "!" });
        buf.open_brace();
    }

    if instr.vector_opcode.is_kill() {
        let v0 = resolve_operand(instr, ctx, Operand::Vector0);
        let v1 = resolve_operand(instr, ctx, Operand::Vector1);
        let op = match instr.vector_opcode {
            AluVectorOpcode::KillEq => "==",
            AluVectorOpcode::KillGt => ">",
            AluVectorOpcode::KillGe => ">=",
            AluVectorOpcode::KillNe => "!=",
            _ => unreachable!(),
        };
        buf.indent();
        println_to!(buf, "clip(any({v0} {op} {v1}) ? -1 : 1);");
    }

    let export = resolve_export(instr, ctx);
    let export_expr = match &export {
        ExportTarget::Register(name, is_vector) => Some((name.clone(), *is_vector)),
        ExportTarget::None => None,
    };

    if instr.vector_opcode.is_setp_push() {
        buf.indent();
        print_to!(buf, "p0 = {} == 0.0 && {} ", resolve_operand(instr, ctx, Operand::Vector0), resolve_operand(instr, ctx, Operand::Vector1));
        let cmp = match instr.vector_opcode {
            AluVectorOpcode::SetpEqPush => "==",
            AluVectorOpcode::SetpNePush => "!=",
            AluVectorOpcode::SetpGtPush => ">",
            AluVectorOpcode::SetpGePush => ">=",
            _ => unreachable!(),
        };
        buf.push_str(cmp);
        buf.push_str(" 0.0;\n");
    } else if instr.vector_opcode == AluVectorOpcode::MaxA {
        buf.indent();
        println_to!(buf, "a0 = (int)clamp(floor(({}).w + 0.5), -256.0, 255.0);", resolve_operand(instr, ctx, Operand::Vector0));
    }

    let mut vector_write_mask = instr.vector_write_mask;
    if instr.export_data {
        vector_write_mask &= !instr.scalar_write_mask;
    }

    if vector_write_mask != 0 {
        buf.indent();
        let is_vector_register = export_expr.as_ref().map(|(_, v)| *v).unwrap_or(true);
        if let Some((name, _)) = &export_expr {
            buf.push_str(name);
            if is_vector_register {
                buf.push('.');
            }
        } else {
            print_to!(buf, "r{}.", instr.vector_dest);
        }

        let mut write_size = 0u32;
        for i in 0..4u32 {
            if (vector_write_mask >> i) & 1 != 0 {
                if is_vector_register {
                    buf.push(SWIZZLES[i as usize]);
                }
                write_size += 1;
            }
        }

        buf.push_str(" = ");
        if write_size > 1 {
            print_to!(buf, "(float{})(", write_size);
        } else {
            buf.push_str("(float)(");
        }
        if instr.vector_saturate {
            buf.push_str("saturate(");
        }
        vector_expr(buf, instr, ctx);
        if instr.vector_saturate {
            buf.push(')');
        }
        buf.push_str(");\n");
    }

    if instr.scalar_opcode != AluScalarOpcode::RetainPrev {
        if instr.scalar_opcode.is_setp() {
            buf.indent();
            buf.push_str("p0 = ");
            match instr.scalar_opcode {
                AluScalarOpcode::SetpEq => print_to!(buf, "{} == 0.0", resolve_operand(instr, ctx, Operand::Scalar0)),
                AluScalarOpcode::SetpNe => print_to!(buf, "{} != 0.0", resolve_operand(instr, ctx, Operand::Scalar0)),
                AluScalarOpcode::SetpGt => print_to!(buf, "{} > 0.0", resolve_operand(instr, ctx, Operand::Scalar0)),
                AluScalarOpcode::SetpGe => print_to!(buf, "{} >= 0.0", resolve_operand(instr, ctx, Operand::Scalar0)),
                AluScalarOpcode::SetpInv => print_to!(buf, "{} == 1.0", resolve_operand(instr, ctx, Operand::Scalar0)),
                AluScalarOpcode::SetpPop => print_to!(buf, "{} - 1.0 <= 0.0", resolve_operand(instr, ctx, Operand::Scalar0)),
                AluScalarOpcode::SetpClr => buf.push_str("false"),
                AluScalarOpcode::SetpRstr => print_to!(buf, "{} == 0.0", resolve_operand(instr, ctx, Operand::Scalar0)),
                _ => unreachable!(),
            }
            buf.push_str(";\n");
        }

        buf.indent();
        buf.push_str("ps = ");
        if instr.scalar_saturate {
            buf.push_str("saturate(");
        }
        scalar_expr(buf, instr, ctx);
        if instr.scalar_saturate {
            buf.push(')');
        }
        buf.push_str(";\n");

        match instr.scalar_opcode {
            AluScalarOpcode::MaxAs => {
                buf.indent();
                println_to!(buf, "a0 = (int)clamp(floor({} + 0.5), -256.0, 255.0);", resolve_operand(instr, ctx, Operand::Scalar0));
            }
            AluScalarOpcode::MaxAsf => {
                buf.indent();
                println_to!(buf, "a0 = (int)clamp(floor({}), -256.0, 255.0);", resolve_operand(instr, ctx, Operand::Scalar0));
            }
            _ => {}
        }
    }

    let mut scalar_write_mask = instr.scalar_write_mask;
    if instr.export_data {
        scalar_write_mask &= !instr.vector_write_mask;
    }

    if scalar_write_mask != 0 {
        buf.indent();
        let is_vector_register = export_expr.as_ref().map(|(_, v)| *v).unwrap_or(true);
        if let Some((name, _)) = &export_expr {
            buf.push_str(name);
            if is_vector_register {
                buf.push('.');
            }
        } else {
            print_to!(buf, "r{}.", instr.scalar_dest);
        }
        for i in 0..4u32 {
            if (scalar_write_mask >> i) & 1 != 0 && is_vector_register {
                buf.push(SWIZZLES[i as usize]);
            }
        }
        buf.push_str(" = ps;\n");
    }

    if let Some((name, _)) = &export_expr {
        let zero_mask = if instr.scalar_dest_relative { 0b1111 & !(instr.vector_write_mask | instr.scalar_write_mask) } else { 0 };
        let one_mask = instr.vector_write_mask & instr.scalar_write_mask;
        for i in 0..4u32 {
            let mask = 1 << i;
            if zero_mask & mask != 0 {
                buf.indent();
                println_to!(buf, "{}.{} = 0.0;", name, SWIZZLES[i as usize]);
            } else if one_mask & mask != 0 {
                buf.indent();
                println_to!(buf, "{}.{} = 1.0;", name, SWIZZLES[i as usize]);
            }
        }
    }

    if instr.scalar_opcode.is_kills() {
        buf.indent();
        buf.push_str("clip(ps != 0.0 ? -1 : 1);\n");
    }

    if instr.is_predicated {
        buf.close_brace();
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::alu::decode;
    use xenos_container::{ConstantTable, ShaderKind};

    #[test]
    fn predicated_kill_gt_emits_guarded_clip() {
        const VECTOR_WRITE_MASK_START: u32 = 23;
        const IS_PREDICATED_START: u32 = 35;
        const PREDICATE_CONDITION_START: u32 = 36;
        const SOURCES_START: u32 = 41;
        const SOURCE_FIELD_BITS: u32 = 18;

        let vector_opcode = 27u32; // KillGt
        let mut word: u128 = vector_opcode as u128;
        word |= 0b1111u128 << VECTOR_WRITE_MASK_START; // full xyzw mask
        word |= 1u128 << IS_PREDICATED_START;
        word |= 1u128 << PREDICATE_CONDITION_START;
        word |= 5u128 << SOURCES_START; // src1 register = r5
        word |= 1u128 << (SOURCES_START + 16); // src1 select
        word |= 6u128 << (SOURCES_START + SOURCE_FIELD_BITS); // src2 register = r6
        word |= 1u128 << (SOURCES_START + SOURCE_FIELD_BITS + 16); // src2 select

        let words = [
            (word & 0xFFFF_FFFF) as u32,
            ((word >> 32) & 0xFFFF_FFFF) as u32,
            ((word >> 64) & 0xFFFF_FFFF) as u32,
        ];
        let instr = decode(words).unwrap();

        let mut symbols = SymbolEnvironment::build(&ConstantTable { constants: Vec::new() }, ShaderKind::Pixel);
        let interpolator_names = HashMap::new();
        let mut ctx = AluEmitContext {
            is_pixel_shader: true,
            symbols: &mut symbols,
            options: TranslateOptions::default(),
            interpolator_names: &interpolator_names,
        };
        let mut buf = EmitBuffer::new();
        emit(&mut buf, &instr, &mut ctx).unwrap();

        assert!(buf.text.contains("if (p0)"));
        assert!(buf.text.contains("clip(any(r5.xyzw > r6.xyzw) ? -1 : 1);"));
    }

    #[test]
    fn dp3_emits_dot_product() {
        const SOURCES_START: u32 = 41;
        const SOURCE_FIELD_BITS: u32 = 18;
        const VECTOR_WRITE_MASK_START: u32 = 23;

        let vector_opcode = 17u32; // Dp3
        let mut word: u128 = vector_opcode as u128;
        word |= 0b1u128 << VECTOR_WRITE_MASK_START; // write mask irrelevant to Dp3's own operand mask
        word |= 1u128 << (SOURCES_START + 16); // src1 select
        word |= 1u128 << (SOURCES_START + SOURCE_FIELD_BITS + 16); // src2 select

        let words = [
            (word & 0xFFFF_FFFF) as u32,
            ((word >> 32) & 0xFFFF_FFFF) as u32,
            ((word >> 64) & 0xFFFF_FFFF) as u32,
        ];
        let instr = decode(words).unwrap();
        assert_eq!(instr.vector_opcode, AluVectorOpcode::Dp3);

        let mut symbols = SymbolEnvironment::build(&ConstantTable { constants: Vec::new() }, ShaderKind::Pixel);
        let interpolator_names = HashMap::new();
        let mut ctx = AluEmitContext {
            is_pixel_shader: true,
            symbols: &mut symbols,
            options: TranslateOptions::default(),
            interpolator_names: &interpolator_names,
        };
        let mut buf = EmitBuffer::new();
        emit(&mut buf, &instr, &mut ctx).unwrap();

        assert!(buf.text.contains("dot(r0.xyz, r0.xyz)"));
    }
}
