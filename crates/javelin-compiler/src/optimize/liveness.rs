//! Liveness analysis
//!
//! Per-instruction use/def sets plus the standard backward fixed point
//! over the instruction CFG: `live_in = use ∪ (live_out − def)` and
//! `live_out = ⋃ live_in(successor)`. Sets only grow and the variable
//! universe is finite, so the iteration terminates.

use crate::ir::{InstrKind, Method, Operand};
use javelin_types::Type;
use std::collections::BTreeSet;

/// Per-instruction liveness sets, indexed by instruction id.
#[derive(Debug, Clone)]
pub struct LivenessData {
    pub uses: Vec<BTreeSet<String>>,
    pub defs: Vec<BTreeSet<String>>,
    pub live_in: Vec<BTreeSet<String>>,
    pub live_out: Vec<BTreeSet<String>>,
}

/// Compute liveness for one method. Call after the CFG is built.
pub fn analyze_liveness(method: &Method) -> LivenessData {
    let count = method.instructions.len();
    let mut uses = vec![BTreeSet::new(); count];
    let mut defs = vec![BTreeSet::new(); count];

    for instruction in &method.instructions {
        collect_uses(&instruction.kind, &mut uses[instruction.id]);
        collect_defs(&instruction.kind, &mut defs[instruction.id]);
    }

    let mut live_in = vec![BTreeSet::new(); count];
    let mut live_out = vec![BTreeSet::<String>::new(); count];

    loop {
        let mut changed = false;

        for instruction in &method.instructions {
            let id = instruction.id;

            let mut new_in = uses[id].clone();
            for name in &live_out[id] {
                if !defs[id].contains(name) {
                    new_in.insert(name.clone());
                }
            }

            let mut new_out = BTreeSet::new();
            for &successor in &instruction.successors {
                new_out.extend(live_in[successor].iter().cloned());
            }

            if new_in != live_in[id] || new_out != live_out[id] {
                changed = true;
            }
            live_in[id] = new_in;
            live_out[id] = new_out;
        }

        if !changed {
            break;
        }
    }

    LivenessData {
        uses,
        defs,
        live_in,
        live_out,
    }
}

/// Names an instruction reads. An assignment reads only its right-hand
/// side; field-name operands of field accesses are symbolic, not storage.
fn collect_uses(kind: &InstrKind, set: &mut BTreeSet<String>) {
    match kind {
        InstrKind::Assign { src, .. } => collect_uses(src, set),
        InstrKind::Goto { .. } => {}
        InstrKind::Branch { cond, .. } => collect_uses(cond, set),
        InstrKind::Call { callee, args, .. } => {
            operand_uses(callee, set);
            for arg in args {
                operand_uses(arg, set);
            }
        }
        InstrKind::Return { value, .. } => {
            if let Some(value) = value {
                operand_uses(value, set);
            }
        }
        InstrKind::PutField { object, value, .. } => {
            operand_uses(object, set);
            operand_uses(value, set);
        }
        InstrKind::GetField { object, .. } => operand_uses(object, set),
        InstrKind::UnaryOp { operand, .. } | InstrKind::SingleOp { operand } => {
            operand_uses(operand, set);
        }
        InstrKind::BinaryOp { lhs, rhs, .. } => {
            operand_uses(lhs, set);
            operand_uses(rhs, set);
        }
    }
}

/// Names an instruction writes: only an assignment's destination.
fn collect_defs(kind: &InstrKind, set: &mut BTreeSet<String>) {
    if let InstrKind::Assign { dest, .. } = kind {
        match dest {
            Operand::Var {
                name,
                ty,
                is_parameter,
            }
            | Operand::ArrayElem {
                name,
                ty,
                is_parameter,
                ..
            } => {
                if is_optimizable(name, ty, *is_parameter) {
                    set.insert(name.clone());
                }
            }
            Operand::Literal { .. } => {}
        }
    }
}

fn operand_uses(operand: &Operand, set: &mut BTreeSet<String>) {
    match operand {
        Operand::Literal { .. } => {}
        Operand::Var {
            name,
            ty,
            is_parameter,
        } => {
            if is_optimizable(name, ty, *is_parameter) {
                set.insert(name.clone());
            }
        }
        Operand::ArrayElem {
            name,
            index,
            is_parameter,
            ..
        } => {
            // The base is an array variable; its element type does not
            // matter for allocatability.
            if !is_parameter && name != "this" {
                set.insert(name.clone());
            }
            operand_uses(index, set);
        }
    }
}

/// Parameters and `this` are pre-pinned to fixed registers; static
/// references and void-typed operands have no storage at all.
fn is_optimizable(name: &str, ty: &Type, is_parameter: bool) -> bool {
    if is_parameter || name == "this" {
        return false;
    }
    !matches!(ty, Type::StaticRef(_) | Type::Void)
}
