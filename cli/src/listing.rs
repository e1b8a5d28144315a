//! Text rendering of generated code.
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Cell, CellAlignment, Color, Table};
use modus_core::ir::{Instr, ModuleCode, ProcCode};

/// Every procedure as a table of numbered instructions.
pub fn render(code: &ModuleCode) -> String {
    let mut out = format!("module {}\n", code.name);
    for proc in &code.procs {
        out.push('\n');
        out.push_str(&format!("{} ({}, frame {})\n", proc.name, proc.model, proc.frame_size));
        out.push_str(&proc_table(proc).to_string());
        out.push('\n');
    }
    out
}

fn proc_table(proc: &ProcCode) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["#", "instruction", "goal", "live"]);
    for (i, ins) in proc.instrs.iter().enumerate() {
        let text = Cell::new(ins.instr.to_string());
        let text = match ins.instr {
            Instr::Label(_) => text.fg(Color::Yellow),
            Instr::Comment(_) => text.fg(Color::DarkGrey),
            Instr::PushChoicePoint { .. } | Instr::RetargetChoicePoint { .. } | Instr::PopChoicePoint => {
                text.fg(Color::Cyan)
            }
            _ => text,
        };
        let goal = ins.origin.map(|g| g.to_string()).unwrap_or_default();
        let live = ins
            .live
            .as_ref()
            .map(|vars| vars.iter().map(|v| v.to_string()).collect::<Vec<_>>().join(" "))
            .unwrap_or_default();
        table.add_row(vec![Cell::new(format!("{:04}", i)).set_alignment(CellAlignment::Right), text, Cell::new(goal), Cell::new(live)]);
    }
    table
}

/// One row per procedure with its size and choice-point use.
pub fn stats_table(code: &ModuleCode) -> Table {
    let mut table = Table::new();
    table.load_preset(UTF8_FULL);
    table.set_header(vec!["procedure", "model", "frame", "ops", "calls", "choice points"]);
    for proc in &code.procs {
        let calls = proc.count(|i| matches!(i, Instr::Call { .. } | Instr::CallClosure { .. }));
        let pushes = proc.count(|i| matches!(i, Instr::PushChoicePoint { .. }));
        table.add_row(vec![
            Cell::new(&proc.name),
            Cell::new(proc.model.to_string()),
            Cell::new(proc.frame_size).set_alignment(CellAlignment::Right),
            Cell::new(proc.op_count()).set_alignment(CellAlignment::Right),
            Cell::new(calls).set_alignment(CellAlignment::Right),
            Cell::new(pushes).set_alignment(CellAlignment::Right),
        ]);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use modus_core::goal::{CodeModel, ProcRef};
    use modus_core::ir::{Instruction, Lval, Rval};

    #[test]
    fn listing_numbers_instructions() {
        let proc = ProcCode {
            proc: ProcRef { pred: 0, proc: 0 },
            name: "p/1-0".into(),
            model: CodeModel::Det,
            frame_size: 0,
            instrs: vec![
                Instruction::new(Instr::Assign { dest: Lval::Reg(1), src: Rval::Lval(Lval::Reg(1)) }),
                Instruction::new(Instr::Proceed),
            ],
        };
        let mut code = ModuleCode::new("m");
        code.procs.push(proc);
        let text = render(&code);
        assert!(text.contains("p/1-0 (det, frame 0)"));
        assert!(text.contains("0001"));
        assert!(text.contains("proceed"));
    }
}
