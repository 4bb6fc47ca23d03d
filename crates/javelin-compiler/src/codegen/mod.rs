//! Assembly emission
//!
//! Turns a lowered class unit into the textual stack-machine assembly the
//! external assembler consumes: class header, superclass, field
//! directives, a default constructor, then one body per method. Stack and
//! locals limits come from the per-method emitter's simulation.

mod method;
mod text;

use crate::error::CompileResult;
use crate::ir::{ClassUnit, InstrKind, Method};
use javelin_types::{ClassType, Type};
use method::MethodEmitter;

/// Emit the whole class.
pub fn emit(unit: &ClassUnit) -> CompileResult<String> {
    let super_path = unit
        .class
        .super_class()
        .unwrap_or(&ClassType::object())
        .class_path();

    let mut out = text::class_header(unit.class.simple_name());
    out.push_str(&text::super_class(&super_path));
    out.push('\n');

    for field in &unit.fields {
        out.push_str(&text::field(
            &field.name,
            &text::descriptor(&field.ty)?,
            field.initial_value,
        ));
    }
    if !unit.fields.is_empty() {
        out.push('\n');
    }

    out.push_str(&text::constructor(&super_path));

    for method in &unit.methods {
        out.push_str(&emit_method(method)?);
    }

    Ok(out)
}

fn emit_method(method: &Method) -> CompileResult<String> {
    let mut emitter = MethodEmitter::new(method);

    for instruction in &method.instructions {
        emitter.instruction(instruction.id, &instruction.kind)?;

        // A call in bare statement position leaves its non-void result on
        // the stack; the machine requires every push to be consumed.
        if let InstrKind::Call { return_type, .. } = &instruction.kind {
            if *return_type != Type::Void {
                emitter.pop_result();
            }
        }
    }

    emitter.build()
}
