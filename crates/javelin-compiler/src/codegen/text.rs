//! Raw assembly text
//!
//! One function per directive or instruction family, each returning the
//! exact line(s) the external assembler expects. Type descriptors and
//! class paths are derived here as well.

use crate::error::{CompileError, CompileResult};
use javelin_types::Type;

/// Assembler type descriptor (`I`, `Z`, `V`, `[I`, `Ljava/lang/String;`).
pub(crate) fn descriptor(ty: &Type) -> CompileResult<String> {
    match ty {
        Type::Int => Ok("I".to_string()),
        Type::Boolean => Ok("Z".to_string()),
        Type::Void => Ok("V".to_string()),
        Type::Array(element) => Ok(format!("[{}", descriptor(element)?)),
        Type::Class(class) | Type::StaticRef(class) => Ok(format!("L{};", class.class_path())),
        Type::Unknown | Type::Invalid => Err(CompileError::UnsuffixedOperand(ty.to_string())),
    }
}

/// Instruction-family prefix: `i` for numeric types, `a` for references,
/// empty for void.
pub(crate) fn variant(ty: &Type) -> CompileResult<&'static str> {
    match ty {
        Type::Int | Type::Boolean => Ok("i"),
        Type::Class(_) | Type::Array(_) | Type::StaticRef(_) => Ok("a"),
        Type::Void => Ok(""),
        Type::Unknown | Type::Invalid => Err(CompileError::UnsuffixedOperand(ty.to_string())),
    }
}

pub(crate) fn class_header(name: &str) -> String {
    format!(".class public {}\n", name)
}

pub(crate) fn super_class(path: &str) -> String {
    format!(".super {}\n", path)
}

pub(crate) fn field(name: &str, descriptor: &str, initial_value: Option<i32>) -> String {
    match initial_value {
        Some(value) => format!(".field public {} {} = {}\n", name, descriptor, value),
        None => format!(".field public {} {}\n", name, descriptor),
    }
}

/// The default no-argument constructor invoking the superclass `<init>`.
pub(crate) fn constructor(super_path: &str) -> String {
    format!(
        ".method public <init>()V\n\
         \taload_0\n\
         \tinvokespecial {}/<init>()V\n\
         \treturn\n\
         .end method\n\n",
        super_path
    )
}

pub(crate) fn method_header(
    is_public: bool,
    is_static: bool,
    name: &str,
    arg_descriptors: &[String],
    return_descriptor: &str,
) -> String {
    let mut header = String::from(".method ");
    if is_public {
        header.push_str("public ");
    }
    if is_static {
        header.push_str("static ");
    }
    header.push_str(name);
    header.push('(');
    for arg in arg_descriptors {
        header.push_str(arg);
    }
    header.push(')');
    header.push_str(return_descriptor);
    header.push('\n');
    header
}

pub(crate) fn limit_stack(count: i32) -> String {
    format!("\t.limit stack {}\n", count)
}

pub(crate) fn limit_locals(count: i32) -> String {
    format!("\t.limit locals {}\n", count)
}

pub(crate) fn end_method() -> String {
    ".end method\n\n".to_string()
}

pub(crate) fn iconst(value: i32) -> String {
    let sign = if value < 0 { "m" } else { "" };
    format!("\ticonst_{}{}\n", sign, value.abs())
}

pub(crate) fn bipush(value: i32) -> String {
    format!("\tbipush {}\n", value)
}

pub(crate) fn sipush(value: i32) -> String {
    format!("\tsipush {}\n", value)
}

pub(crate) fn ldc(value: i32) -> String {
    format!("\tldc {}\n", value)
}

pub(crate) fn iinc(register: i32, value: i32) -> String {
    format!("\tiinc {} {}\n", register, value)
}

/// Loads of registers 0..3 use the compact underscore encoding.
pub(crate) fn load(variant: &str, register: i32) -> String {
    if register <= 3 {
        format!("\t{}load_{}\n", variant, register)
    } else {
        format!("\t{}load {}\n", variant, register)
    }
}

pub(crate) fn store(variant: &str, register: i32) -> String {
    if register <= 3 {
        format!("\t{}store_{}\n", variant, register)
    } else {
        format!("\t{}store {}\n", variant, register)
    }
}

pub(crate) fn operation(variant: &str, operation: &str) -> String {
    format!("\t{}{}\n", variant, operation)
}

pub(crate) fn invoke(
    instruction: &str,
    path: &str,
    name: &str,
    arg_descriptors: &[String],
    return_descriptor: &str,
) -> String {
    format!(
        "\t{} {}/{}({}){}\n",
        instruction,
        path,
        name,
        arg_descriptors.concat(),
        return_descriptor
    )
}

pub(crate) fn new_object(path: &str) -> String {
    format!("\tnew {}\n", path)
}

pub(crate) fn new_array(element: &str) -> String {
    format!("\tnewarray {}\n", element)
}

pub(crate) fn array_length() -> String {
    "\tarraylength\n".to_string()
}

pub(crate) fn putfield(path: &str, name: &str, descriptor: &str) -> String {
    format!("\tputfield {}/{} {}\n", path, name, descriptor)
}

pub(crate) fn getfield(path: &str, name: &str, descriptor: &str) -> String {
    format!("\tgetfield {}/{} {}\n", path, name, descriptor)
}

pub(crate) fn label(label: &str) -> String {
    format!("\n{}:\n", label)
}

pub(crate) fn unconditional_goto(label: &str) -> String {
    format!("\tgoto {}\n", label)
}

pub(crate) fn ifne(label: &str) -> String {
    format!("\tifne {}\n", label)
}

pub(crate) fn iflt(label: &str) -> String {
    format!("\tiflt {}\n", label)
}

pub(crate) fn pop() -> String {
    "\tpop\n".to_string()
}

pub(crate) fn ret(variant: &str) -> String {
    format!("\t{}return\n", variant)
}
