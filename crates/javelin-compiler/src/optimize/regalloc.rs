//! Register allocation driver
//!
//! Runs liveness, interference, and coloring over every method of a
//! lowered class unit, writes the chosen registers back into the variable
//! tables, and reports against the configured budget. Parameters and
//! `this` stay on their pinned registers; only colored names move.

use super::coloring::color;
use super::interference;
use super::liveness::analyze_liveness;
use crate::error::CompileResult;
use crate::ir::ClassUnit;
use javelin_checker::{Report, ReportKind, Stage};
use std::fmt::Write;

/// Result of allocating one class unit.
#[derive(Debug, Clone)]
pub struct AllocationOutcome {
    pub reports: Vec<Report>,
    /// The largest per-method register demand, pinned slots included.
    pub needed_registers: usize,
}

/// Allocate registers for every method against `max_registers`.
///
/// A budget of `0` asks for the minimum and reports it at debug level; a
/// budget below the minimum is an error; a budget exactly at the minimum
/// gets a log-level note. All three reports are position-less.
pub fn allocate_registers(
    unit: &mut ClassUnit,
    max_registers: i32,
) -> CompileResult<AllocationOutcome> {
    unit.build_cfgs()?;

    let mut needed_registers = 0usize;

    for method in &mut unit.methods {
        let liveness = analyze_liveness(method);
        let graph = interference::build(method, &liveness);
        let (colors_used, colors) = color(&graph);

        let pinned = method.params.len() + usize::from(!method.is_static);
        needed_registers = needed_registers.max(pinned + colors_used);

        for (name, color) in colors {
            if let Some(descriptor) = method.var_table.get_mut(&name) {
                descriptor.virtual_reg = (pinned + color) as i32;
            }
        }
    }

    let message = format!(
        "The minimum number of registers needed is {}",
        needed_registers
    );
    let mut reports = Vec::new();
    if max_registers == 0 {
        reports.push(Report::positionless(
            ReportKind::Debug,
            Stage::Optimization,
            message,
        ));
    } else if needed_registers > max_registers as usize {
        reports.push(Report::positionless(
            ReportKind::Error,
            Stage::Optimization,
            message,
        ));
    } else if needed_registers == max_registers as usize {
        reports.push(Report::positionless(
            ReportKind::Log,
            Stage::Optimization,
            message,
        ));
    }

    Ok(AllocationOutcome {
        reports,
        needed_registers,
    })
}

/// Per-method listing of every variable's assigned register and the
/// register count the method requires.
pub fn render_register_mapping(unit: &ClassUnit) -> String {
    let mut out = String::new();

    for method in &unit.methods {
        let mut entries: Vec<(&String, i32)> = method
            .var_table
            .iter()
            .map(|(name, descriptor)| (name, descriptor.virtual_reg))
            .collect();
        entries.sort_by(|a, b| a.1.cmp(&b.1).then_with(|| a.0.cmp(b.0)));

        let max_register = entries.iter().map(|(_, reg)| *reg).max().unwrap_or(0);
        let _ = writeln!(
            out,
            "Register allocation for method `{}`: {} registers are needed",
            method.name,
            max_register + 1
        );
        for (name, register) in entries {
            let _ = writeln!(out, "Variable {} assigned to register #{}", name, register);
        }
        out.push('\n');
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::{BinaryAluOp, ClassUnit, Descriptor, InstrKind, Method, Operand};
    use javelin_types::{ClassType, Type};

    fn assign(dest: &str, src: InstrKind) -> InstrKind {
        InstrKind::Assign {
            dest: Operand::var(dest, Type::Int),
            src: Box::new(src),
        }
    }

    fn literal(value: i32) -> InstrKind {
        InstrKind::SingleOp {
            operand: Operand::int(value),
        }
    }

    /// a, b and c are all simultaneously live, so three registers beyond
    /// the pinned `this` slot are needed.
    fn three_way_unit() -> ClassUnit {
        let mut method = Method::new("m", true, false, Type::Int);
        method.push(assign("a", literal(1)));
        method.push(assign("b", literal(2)));
        method.push(assign("c", literal(3)));
        method.push(assign(
            "d",
            InstrKind::BinaryOp {
                op: BinaryAluOp::Add,
                lhs: Operand::var("a", Type::Int),
                rhs: Operand::var("b", Type::Int),
            },
        ));
        method.push(assign(
            "d",
            InstrKind::BinaryOp {
                op: BinaryAluOp::Add,
                lhs: Operand::var("d", Type::Int),
                rhs: Operand::var("c", Type::Int),
            },
        ));
        method.push(InstrKind::Return {
            value: Some(Operand::var("d", Type::Int)),
            ty: Type::Int,
        });
        for name in ["a", "b", "c", "d"] {
            method.var_table.insert(
                name.to_string(),
                Descriptor {
                    ty: Type::Int,
                    virtual_reg: -1,
                },
            );
        }

        let mut unit = ClassUnit::new(ClassType::new("Test", Some(ClassType::object())));
        unit.methods.push(method);
        unit
    }

    #[test]
    fn test_minimum_register_count() {
        let mut unit = three_way_unit();
        let outcome = allocate_registers(&mut unit, -1).unwrap();
        // this + {a, b, c} live together; d shares a color with one of them.
        assert_eq!(outcome.needed_registers, 4);
        assert!(outcome.reports.is_empty());
    }

    #[test]
    fn test_budget_below_minimum_is_fatal() {
        let mut unit = three_way_unit();
        let outcome = allocate_registers(&mut unit, 2).unwrap();
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].kind, ReportKind::Error);
        assert_eq!(
            outcome.reports[0].message,
            "The minimum number of registers needed is 4"
        );
        assert_eq!(outcome.reports[0].line, -1);
    }

    #[test]
    fn test_budget_at_minimum_logs_only() {
        let mut unit = three_way_unit();
        let outcome = allocate_registers(&mut unit, 4).unwrap();
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].kind, ReportKind::Log);
    }

    #[test]
    fn test_budget_above_minimum_is_silent() {
        let mut unit = three_way_unit();
        let outcome = allocate_registers(&mut unit, 5).unwrap();
        assert!(outcome.reports.is_empty());
    }

    #[test]
    fn test_zero_budget_reports_minimum_at_debug() {
        let mut unit = three_way_unit();
        let outcome = allocate_registers(&mut unit, 0).unwrap();
        assert_eq!(outcome.reports.len(), 1);
        assert_eq!(outcome.reports[0].kind, ReportKind::Debug);
    }

    #[test]
    fn test_registers_written_back_above_pinned() {
        let mut unit = three_way_unit();
        allocate_registers(&mut unit, -1).unwrap();

        let method = &unit.methods[0];
        // Instance method with no parameters: colors start at register 1.
        for name in ["a", "b", "c", "d"] {
            let register = method.var_table[name].virtual_reg;
            assert!(register >= 1, "{} left on register {}", name, register);
            assert!(register <= 3);
        }
        // Simultaneously live names never share a register.
        let (a, b, c) = (
            method.var_table["a"].virtual_reg,
            method.var_table["b"].virtual_reg,
            method.var_table["c"].virtual_reg,
        );
        assert!(a != b && b != c && a != c);
    }

    #[test]
    fn test_mapping_rendering() {
        let mut unit = three_way_unit();
        allocate_registers(&mut unit, -1).unwrap();

        let mapping = render_register_mapping(&unit);
        assert!(mapping
            .contains("Register allocation for method `m`: 4 registers are needed"));
        assert!(mapping.contains("Variable a assigned to register #"));
    }
}
