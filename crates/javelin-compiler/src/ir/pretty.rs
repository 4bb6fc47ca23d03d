//! IR text rendering
//!
//! Human-readable three-address output: imports, class header, field
//! directives, and method bodies with typed operands, labels, and gotos.
//! Every typed reference serializes as `name.<suffix>`; parameters are
//! addressed positionally as `$i.name`.

use super::instr::{CallKind, InstrKind};
use super::operand::{Literal, Operand};
use super::unit::{ClassUnit, Method};
use javelin_types::{ClassType, Type};
use std::fmt::Write;

/// Render a whole class unit.
pub fn render(unit: &ClassUnit) -> String {
    let mut out = String::new();

    for import in &unit.imports {
        let _ = writeln!(out, "import {};", import);
    }
    if !unit.imports.is_empty() {
        out.push('\n');
    }

    let extends = match unit.class.super_class() {
        Some(super_class) if *super_class != ClassType::object() => {
            format!("extends {} ", super_class.simple_name())
        }
        _ => String::new(),
    };
    let _ = writeln!(out, "{} {}{{", unit.class.simple_name(), extends);

    for field in &unit.fields {
        let _ = writeln!(out, "    .field public {};", typed(&field.name, &field.ty));
    }

    for method in &unit.methods {
        out.push('\n');
        render_method(&mut out, method);
    }

    let _ = writeln!(out, "\n    .construct {}().V {{", unit.class.simple_name());
    let _ = writeln!(out, "        invokespecial(this, \"<init>\").V;");
    let _ = writeln!(out, "    }}");
    let _ = writeln!(out, "}}");

    out
}

fn render_method(out: &mut String, method: &Method) {
    let public = if method.is_public { " public" } else { "" };
    let statik = if method.is_static { " static" } else { "" };
    let params = method
        .params
        .iter()
        .map(|(name, ty)| typed(name, ty))
        .collect::<Vec<_>>()
        .join(", ");

    let _ = writeln!(
        out,
        "    .method{}{} {}({}).{} {{",
        public,
        statik,
        method.name,
        params,
        suffix(&method.return_type)
    );

    for (index, instruction) in method.instructions.iter().enumerate() {
        for label in method.labels_at(index) {
            let _ = writeln!(out, "      {}:", label);
        }
        let _ = writeln!(out, "        {};", instr_text(method, &instruction.kind));
    }

    let _ = writeln!(out, "    }}");
}

pub(crate) fn instr_text(method: &Method, kind: &InstrKind) -> String {
    match kind {
        InstrKind::Assign { dest, src } => format!(
            "{} :=.{} {}",
            operand_ref(method, dest),
            suffix(dest.ty()),
            instr_text(method, src)
        ),
        InstrKind::Goto { label } => format!("goto {}", label),
        InstrKind::Branch { cond, label } => {
            format!("if ({}) goto {}", instr_text(method, cond), label)
        }
        InstrKind::Call {
            kind,
            callee,
            method: name,
            args,
            return_type,
        } => call_text(method, *kind, callee, name, args, return_type),
        InstrKind::Return { value, ty } => match value {
            Some(value) => format!("ret.{} {}", suffix(ty), operand_ref(method, value)),
            None => format!("ret.{}", suffix(ty)),
        },
        InstrKind::PutField {
            object,
            field,
            value,
        } => format!(
            "putfield({}, {}, {}).V",
            operand_ref(method, object),
            operand_ref(method, field),
            operand_ref(method, value)
        ),
        InstrKind::GetField { object, field } => format!(
            "getfield({}, {}).{}",
            operand_ref(method, object),
            operand_ref(method, field),
            suffix(field.ty())
        ),
        InstrKind::UnaryOp { op, operand } => {
            format!("{}.bool {}", op, operand_ref(method, operand))
        }
        InstrKind::BinaryOp { op, lhs, rhs } => format!(
            "{} {}.{} {}",
            operand_ref(method, lhs),
            op,
            suffix(&op.result_type()),
            operand_ref(method, rhs)
        ),
        InstrKind::SingleOp { operand } => operand_ref(method, operand),
    }
}

fn call_text(
    method: &Method,
    kind: CallKind,
    callee: &Operand,
    name: &str,
    args: &[Operand],
    return_type: &Type,
) -> String {
    match kind {
        CallKind::Static | CallKind::Virtual | CallKind::Special => {
            let instruction = match kind {
                CallKind::Static => "invokestatic",
                CallKind::Virtual => "invokevirtual",
                _ => "invokespecial",
            };
            let mut text = format!("{}({}, \"{}\"", instruction, operand_ref(method, callee), name);
            for arg in args {
                text.push_str(", ");
                text.push_str(&operand_ref(method, arg));
            }
            text.push(')');
            format!("{}.{}", text, suffix(return_type))
        }
        CallKind::New => match return_type {
            Type::Array(_) => format!(
                "new(array, {}).{}",
                operand_ref(method, &args[0]),
                suffix(return_type)
            ),
            _ => format!("new({}).{}", suffix(return_type), suffix(return_type)),
        },
        CallKind::ArrayLength => {
            format!("arraylength({}).i32", operand_ref(method, callee))
        }
    }
}

/// Serialized form of an operand reference.
pub(crate) fn operand_ref(method: &Method, operand: &Operand) -> String {
    match operand {
        Operand::Literal { value, ty } => match value {
            Literal::Int(v) => typed(&v.to_string(), ty),
            Literal::Bool(v) => typed(if *v { "1" } else { "0" }, ty),
        },
        Operand::Var { name, ty, .. } if matches!(ty, Type::StaticRef(_)) => name.clone(),
        Operand::Var { name, ty, .. } => typed(&base_ref(method, name), ty),
        Operand::ArrayElem {
            name, index, ty, ..
        } => typed(
            &format!("{}[{}]", base_ref(method, name), operand_ref(method, index)),
            ty,
        ),
    }
}

/// Bare name of a variable, with the positional prefix for parameters.
fn base_ref(method: &Method, name: &str) -> String {
    match method.params.iter().position(|(param, _)| param == name) {
        Some(index) => format!("${}.{}", index + 1, name),
        None => name.to_string(),
    }
}

fn typed(name: &str, ty: &Type) -> String {
    format!("{}.{}", name, suffix(ty))
}

fn suffix(ty: &Type) -> String {
    ty.suffix().unwrap_or_else(|| "invalid".to_string())
}
