use std::collections::HashMap;

use crate::bytecode::ir::Instr;
use crate::bytecode::{Op, ProgramBc};
use crate::lang::program::VarDecl;

/// Print disassembly of a bytecode program
pub fn print_bc(bc: &ProgramBc) {
    println!("=== BYTECODE PROGRAM ===\n");

    println!("════════════════════════════════════════");
    println!(" variables");
    println!("════════════════════════════════════════");
    for (idx, decl) in bc.decls.iter().enumerate() {
        let hidden = if idx >= bc.user_decls { "  ; compiler-owned" } else { "" };
        println!("  #{:<3} {}{}", idx, decl, hidden);
    }
    println!();

    println!("════════════════════════════════════════");
    println!(" main");
    println!(" {} instructions", bc.code.len());
    println!("════════════════════════════════════════");
    print!("{}", disassemble_to_string(&bc.code, &bc.decls));
    println!();

    print_bc_stats(bc);
}

/// Return disassembly as a String
pub fn disassemble_to_string(code: &[Instr], decls: &[VarDecl]) -> String {
    let mut output = String::new();
    let jump_targets = collect_jump_targets(code);

    for (ip, instr) in code.iter().enumerate() {
        if jump_targets.contains(&ip) {
            output.push_str("      ┌──────────────────────────────────\n");
        }

        output.push_str(&format!("{:04} ", ip));

        if jump_targets.contains(&ip) {
            output.push_str("► ");
        } else {
            output.push_str("  ");
        }

        output.push_str(&format!("{:+} ", instr.delta));
        output.push_str(&format_op(&instr.op, ip, decls));
        output.push('\n');
    }

    output
}

fn collect_jump_targets(code: &[Instr]) -> Vec<usize> {
    let mut targets = Vec::new();

    for (ip, instr) in code.iter().enumerate() {
        if let Some(offset) = instr.op.jump_offset() {
            let target = (ip as i64 + offset as i64) as usize;
            if !targets.contains(&target) {
                targets.push(target);
            }
        }
    }

    targets
}

fn var_name(decls: &[VarDecl], idx: usize) -> String {
    match decls.get(idx) {
        Some(decl) => decl.name.clone(),
        None => format!("#{}?", idx),
    }
}

fn format_op(op: &Op, ip: usize, decls: &[VarDecl]) -> String {
    let name = op.name();
    match op {
        Op::LoadConst(c) | Op::Incr(c) | Op::CMul(c) => format!("{:<11} {}", name, c),
        Op::LoadInt(x) | Op::LoadArr(x) | Op::StoreInt(x) | Op::StoreArr(x) => {
            format!("{:<11} {}", name, var_name(decls, *x))
        }
        Op::SetI(x, c) | Op::IncI(x, c) => {
            format!("{:<11} {}, {}", name, var_name(decls, *x), c)
        }
        Op::Jmp(offset) => {
            let target = (ip as i64 + *offset as i64) as usize;
            let direction = if *offset < 0 { "↑" } else { "↓" };
            format!("{:<11} {:+} {} (→ {:04})", name, offset, direction, target)
        }
        Op::CJmp(cmp, offset) => {
            let target = (ip as i64 + *offset as i64) as usize;
            let direction = if *offset < 0 { "↑" } else { "↓" };
            format!(
                "{:<11} {} {:+} {} (→ {:04})",
                name, cmp, offset, direction, target
            )
        }
        Op::BinAdd | Op::Put | Op::Halt => name.to_string(),
    }
}

// =============================================================================
// Statistics
// =============================================================================

/// Print bytecode statistics
pub fn print_bc_stats(bc: &ProgramBc) {
    let total_ops = bc.code.len();
    if total_ops == 0 {
        return;
    }

    println!("Op frequency:");
    let counts = count_ops(&bc.code);
    let mut counts: Vec<_> = counts.iter().collect();
    counts.sort_by(|a, b| b.1.cmp(a.1).then(a.0.cmp(b.0)));

    for (op, count) in counts.iter().take(10) {
        let pct = (**count as f64 / total_ops as f64) * 100.0;
        println!("  {:<14} {:>4} ({:>5.1}%)", op, count, pct);
    }
}

fn count_ops(code: &[Instr]) -> HashMap<&'static str, usize> {
    let mut counts = HashMap::new();
    for instr in code {
        *counts.entry(instr.op.name()).or_insert(0) += 1;
    }
    counts
}
