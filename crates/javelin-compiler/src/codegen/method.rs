//! Per-method assembly emission
//!
//! Walks a method's instruction list, appending assembly text while
//! simulating the operand stack. The running depth plus its historical
//! maximum become the method's `.limit stack`; `.limit locals` is one more
//! than the highest virtual register in use.

use super::text;
use crate::error::{CompileError, CompileResult};
use crate::ir::{BinaryAluOp, CallKind, InstrKind, Literal, Method, Operand, UnaryAluOp};
use javelin_types::Type;

/// Running operand-stack depth and its historical maximum.
#[derive(Debug, Default)]
pub(crate) struct StackLimiter {
    current: i32,
    limit: i32,
}

impl StackLimiter {
    fn update(&mut self, delta: i32) {
        self.current += delta;
        self.limit = self.limit.max(self.current);
    }

    pub(crate) fn limit(&self) -> i32 {
        self.limit
    }

    #[cfg(test)]
    pub(crate) fn current(&self) -> i32 {
        self.current
    }
}

pub(crate) struct MethodEmitter<'a> {
    method: &'a Method,
    code: String,
    pub(crate) stack: StackLimiter,
    cmp_counter: usize,
}

impl<'a> MethodEmitter<'a> {
    pub(crate) fn new(method: &'a Method) -> Self {
        MethodEmitter {
            method,
            code: String::new(),
            stack: StackLimiter::default(),
            cmp_counter: 0,
        }
    }

    fn virtual_reg(&self, name: &str) -> CompileResult<i32> {
        if !self.method.is_static && name == "this" {
            return Ok(0);
        }
        self.method
            .var_table
            .get(name)
            .map(|descriptor| descriptor.virtual_reg)
            .ok_or_else(|| {
                CompileError::Internal(format!(
                    "variable `{}` is missing from the table of `{}`",
                    name, self.method.name
                ))
            })
    }

    fn is_byte_sized(value: i32) -> bool {
        i8::try_from(value).is_ok()
    }

    /// Shortest-encoding constant load by magnitude.
    fn load_int(&mut self, value: i32) {
        let line = if (-1..=5).contains(&value) {
            text::iconst(value)
        } else if Self::is_byte_sized(value) {
            text::bipush(value)
        } else if i16::try_from(value).is_ok() {
            text::sipush(value)
        } else {
            text::ldc(value)
        };
        self.code.push_str(&line);
        self.stack.update(1);
    }

    /// Push one operand onto the operand stack.
    fn load_operand(&mut self, operand: &Operand) -> CompileResult<()> {
        match operand {
            Operand::Literal { value, .. } => {
                match value {
                    Literal::Int(value) => self.load_int(*value),
                    // Boolean true is all-ones so that `ixor` with -1 negates.
                    Literal::Bool(value) => self.load_int(if *value { -1 } else { 0 }),
                }
                Ok(())
            }
            Operand::Var { name, ty, .. } => {
                if matches!(ty, Type::StaticRef(_)) {
                    return Err(CompileError::Internal(format!(
                        "static reference `{}` has no stack representation",
                        name
                    )));
                }
                let register = self.virtual_reg(name)?;
                self.code.push_str(&text::load(text::variant(ty)?, register));
                self.stack.update(1);
                Ok(())
            }
            Operand::ArrayElem { name, index, .. } => {
                let register = self.virtual_reg(name)?;
                self.code.push_str(&text::load("a", register));
                self.stack.update(1);
                self.load_operand(index)?;
                self.code.push_str(&text::operation("i", "aload"));
                self.stack.update(-1);
                Ok(())
            }
        }
    }

    /// Emit an instruction in value position and store its result.
    fn store_result(&mut self, dest: &Operand, src: &InstrKind) -> CompileResult<()> {
        match dest {
            Operand::Var { name, ty, .. } => {
                self.emit_kind(src)?;
                let register = self.virtual_reg(name)?;
                self.code
                    .push_str(&text::store(text::variant(ty)?, register));
                self.stack.update(-1);
                Ok(())
            }
            Operand::ArrayElem { name, index, .. } => {
                let register = self.virtual_reg(name)?;
                self.code.push_str(&text::load("a", register));
                self.stack.update(1);
                self.load_operand(index)?;
                self.emit_kind(src)?;
                self.code.push_str(&text::operation("i", "astore"));
                self.stack.update(-3);
                Ok(())
            }
            Operand::Literal { .. } => Err(CompileError::Internal(
                "assignment destination is a literal".to_string(),
            )),
        }
    }

    /// `x := x + c` (or `c + x`, or `x - c`) with `c` in byte range
    /// collapses to a single increment.
    fn iinc_params(&self, dest: &Operand, src: &InstrKind) -> CompileResult<Option<(i32, i32)>> {
        let InstrKind::BinaryOp { op, lhs, rhs } = src else {
            return Ok(None);
        };
        let (variable, literal, sign) = match (op, lhs, rhs) {
            (BinaryAluOp::Add | BinaryAluOp::Sub, Operand::Var { name, .. }, rhs) => {
                (name, rhs, if *op == BinaryAluOp::Sub { -1 } else { 1 })
            }
            (BinaryAluOp::Add, lhs, Operand::Var { name, .. }) => (name, lhs, 1),
            _ => return Ok(None),
        };
        let Operand::Literal {
            value: Literal::Int(value),
            ..
        } = literal
        else {
            return Ok(None);
        };

        let value = *value * sign;
        if !Self::is_byte_sized(value) {
            return Ok(None);
        }

        let Operand::Var { name: dest, .. } = dest else {
            return Ok(None);
        };
        let register = self.virtual_reg(variable)?;
        if register != self.virtual_reg(dest)? {
            return Ok(None);
        }
        Ok(Some((register, value)))
    }

    /// Emit one instruction, with any labels that precede it.
    pub(crate) fn instruction(&mut self, index: usize, kind: &InstrKind) -> CompileResult<()> {
        let labels: Vec<String> = self
            .method
            .labels_at(index)
            .map(|label| label.to_string())
            .collect();
        for label in labels {
            self.code.push_str(&text::label(&label));
        }
        self.emit_kind(kind)
    }

    fn emit_kind(&mut self, kind: &InstrKind) -> CompileResult<()> {
        match kind {
            InstrKind::Assign { dest, src } => {
                if let Some((register, value)) = self.iinc_params(dest, src)? {
                    self.code.push_str(&text::iinc(register, value));
                    return Ok(());
                }
                self.store_result(dest, src)
            }

            InstrKind::Goto { label } => {
                self.code.push_str(&text::unconditional_goto(label));
                Ok(())
            }

            InstrKind::Branch { cond, label } => {
                self.emit_kind(cond)?;
                self.code.push_str(&text::ifne(label));
                self.stack.update(-1);
                Ok(())
            }

            InstrKind::Call {
                kind,
                callee,
                method,
                args,
                return_type,
            } => self.call(*kind, callee, method, args, return_type),

            InstrKind::Return { value, ty } => {
                if let Some(value) = value {
                    self.load_operand(value)?;
                    self.stack.update(-1);
                }
                self.code.push_str(&text::ret(text::variant(ty)?));
                Ok(())
            }

            InstrKind::PutField {
                object,
                field,
                value,
            } => {
                let path = self.object_path(object)?;
                let name = self.field_name(field)?;
                let descriptor = text::descriptor(field.ty())?;

                self.load_operand(object)?;
                self.load_operand(value)?;
                self.code.push_str(&text::putfield(&path, &name, &descriptor));
                self.stack.update(-2);
                Ok(())
            }

            InstrKind::GetField { object, field } => {
                let path = self.object_path(object)?;
                let name = self.field_name(field)?;
                let descriptor = text::descriptor(field.ty())?;

                self.load_operand(object)?;
                // Pops the object, pushes the value: net zero.
                self.code.push_str(&text::getfield(&path, &name, &descriptor));
                Ok(())
            }

            InstrKind::UnaryOp { op, operand } => {
                self.load_operand(operand)?;
                match op {
                    UnaryAluOp::Not => {
                        self.code.push_str(&text::iconst(-1));
                        self.stack.update(1);
                        self.code.push_str(&text::operation("i", "xor"));
                        self.stack.update(-1);
                    }
                }
                Ok(())
            }

            InstrKind::BinaryOp { op, lhs, rhs } => {
                if op.is_comparison() {
                    return self.comparison(lhs, rhs);
                }
                let mnemonic = match op {
                    BinaryAluOp::Add => "add",
                    BinaryAluOp::Sub => "sub",
                    BinaryAluOp::Mul => "mul",
                    BinaryAluOp::Div => "div",
                    BinaryAluOp::And => "and",
                    BinaryAluOp::Lt => unreachable!("comparisons branch"),
                };
                self.load_operand(lhs)?;
                self.load_operand(rhs)?;
                self.code.push_str(&text::operation("i", mnemonic));
                self.stack.update(-1);
                Ok(())
            }

            InstrKind::SingleOp { operand } => self.load_operand(operand),
        }
    }

    /// The target has no boolean-producing comparison, so `<` lowers to a
    /// subtract-and-branch idiom leaving -1 (true) or 0 on the stack.
    fn comparison(&mut self, lhs: &Operand, rhs: &Operand) -> CompileResult<()> {
        let base = format!("cmp_lt_{}", self.cmp_counter);
        self.cmp_counter += 1;
        let true_label = format!("{}_true", base);
        let end_label = format!("{}_end", base);

        self.load_operand(lhs)?;
        self.load_operand(rhs)?;
        self.code.push_str(&text::operation("i", "sub"));
        self.stack.update(-1);
        self.code.push_str(&text::iflt(&true_label));
        self.stack.update(-1);

        self.code.push_str(&text::iconst(0));
        self.stack.update(1);
        self.code.push_str(&text::unconditional_goto(&end_label));
        self.code.push_str(&text::label(&true_label));
        // Rebalances the branch not taken; the maximum already counted it.
        self.code.push_str(&text::iconst(-1));
        self.code.push_str(&text::label(&end_label));
        Ok(())
    }

    fn call(
        &mut self,
        kind: CallKind,
        callee: &Operand,
        name: &str,
        args: &[Operand],
        return_type: &Type,
    ) -> CompileResult<()> {
        match kind {
            CallKind::Static | CallKind::Virtual | CallKind::Special => {
                if kind != CallKind::Static {
                    self.load_operand(callee)?;
                }

                let mut arg_descriptors = Vec::with_capacity(args.len());
                for arg in args {
                    self.load_operand(arg)?;
                    arg_descriptors.push(text::descriptor(arg.ty())?);
                }

                let instruction = match kind {
                    CallKind::Static => "invokestatic",
                    CallKind::Virtual => "invokevirtual",
                    _ => "invokespecial",
                };
                let path = self.object_path(callee)?;
                let return_descriptor = text::descriptor(return_type)?;
                self.code.push_str(&text::invoke(
                    instruction,
                    &path,
                    name,
                    &arg_descriptors,
                    &return_descriptor,
                ));

                self.stack.update(-(args.len() as i32));
                if kind != CallKind::Static {
                    self.stack.update(-1);
                }
                if *return_type != Type::Void {
                    self.stack.update(1);
                }
                Ok(())
            }

            CallKind::New => match return_type {
                Type::Array(_) => {
                    let size = args.first().ok_or_else(|| {
                        CompileError::Internal("array allocation without a size".to_string())
                    })?;
                    self.load_operand(size)?;
                    // Pops the size, pushes the reference.
                    self.code.push_str(&text::new_array("int"));
                    Ok(())
                }
                _ => {
                    let path = self.object_path(callee)?;
                    self.code.push_str(&text::new_object(&path));
                    self.stack.update(1);
                    Ok(())
                }
            },

            CallKind::ArrayLength => {
                self.load_operand(callee)?;
                self.code.push_str(&text::array_length());
                Ok(())
            }
        }
    }

    /// The result of a call in a bare statement position must still be
    /// consumed: every push needs a matching pop.
    pub(crate) fn pop_result(&mut self) {
        self.code.push_str(&text::pop());
        self.stack.update(-1);
    }

    /// Class path of the operand a field access or call goes through.
    fn object_path(&self, operand: &Operand) -> CompileResult<String> {
        match operand.ty() {
            Type::Class(class) | Type::StaticRef(class) => Ok(class.class_path()),
            other => Err(CompileError::Internal(format!(
                "`{}` is not a class-typed access target",
                other
            ))),
        }
    }

    fn field_name(&self, field: &Operand) -> CompileResult<String> {
        field
            .name()
            .map(str::to_string)
            .ok_or_else(|| CompileError::Internal("field operand has no name".to_string()))
    }

    /// Assemble header, limits, body, and trailer.
    pub(crate) fn build(self) -> CompileResult<String> {
        let mut locals = if self.method.is_static { 0 } else { 1 };
        for descriptor in self.method.var_table.values() {
            locals = locals.max(descriptor.virtual_reg + 1);
        }

        let arg_descriptors = self
            .method
            .params
            .iter()
            .map(|(_, ty)| text::descriptor(ty))
            .collect::<CompileResult<Vec<_>>>()?;
        let return_descriptor = text::descriptor(&self.method.return_type)?;

        let mut out = text::method_header(
            self.method.is_public,
            self.method.is_static,
            &self.method.name,
            &arg_descriptors,
            &return_descriptor,
        );
        out.push_str(&text::limit_stack(self.stack.limit()));
        out.push_str(&text::limit_locals(locals));
        out.push_str(&self.code);
        out.push_str(&text::end_method());
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ir::Descriptor;

    fn method_with_vars(vars: &[(&str, Type, i32)]) -> Method {
        let mut method = Method::new("m", true, false, Type::Int);
        for (name, ty, register) in vars {
            method.var_table.insert(
                name.to_string(),
                Descriptor {
                    ty: ty.clone(),
                    virtual_reg: *register,
                },
            );
        }
        method
    }

    #[test]
    fn test_constant_encodings_by_magnitude() {
        let method = method_with_vars(&[]);
        let mut emitter = MethodEmitter::new(&method);
        for value in [0, 5, -1, 100, -128, 1000, 100_000] {
            emitter.load_int(value);
        }
        assert!(emitter.code.contains("\ticonst_0\n"));
        assert!(emitter.code.contains("\ticonst_5\n"));
        assert!(emitter.code.contains("\ticonst_m1\n"));
        assert!(emitter.code.contains("\tbipush 100\n"));
        assert!(emitter.code.contains("\tbipush -128\n"));
        assert!(emitter.code.contains("\tsipush 1000\n"));
        assert!(emitter.code.contains("\tldc 100000\n"));
        assert_eq!(emitter.stack.limit(), 7);
    }

    #[test]
    fn test_binary_op_nets_minus_one() {
        let method = method_with_vars(&[("x", Type::Int, 1), ("y", Type::Int, 2)]);
        let mut emitter = MethodEmitter::new(&method);
        emitter
            .emit_kind(&InstrKind::BinaryOp {
                op: BinaryAluOp::Add,
                lhs: Operand::var("x", Type::Int),
                rhs: Operand::var("y", Type::Int),
            })
            .unwrap();

        assert!(emitter.code.contains("\tiload_1\n\tiload_2\n\tiadd\n"));
        assert_eq!(emitter.stack.limit(), 2);
        assert_eq!(emitter.stack.current(), 1);
    }

    #[test]
    fn test_store_pops_the_result() {
        let method = method_with_vars(&[("x", Type::Int, 4)]);
        let mut emitter = MethodEmitter::new(&method);
        emitter
            .emit_kind(&InstrKind::Assign {
                dest: Operand::var("x", Type::Int),
                src: Box::new(InstrKind::SingleOp {
                    operand: Operand::int(7),
                }),
            })
            .unwrap();

        assert!(emitter.code.contains("\tbipush 7\n"));
        assert!(emitter.code.contains("\tistore 4\n"));
        assert_eq!(emitter.stack.current(), 0);
    }

    #[test]
    fn test_increment_collapses_to_iinc() {
        let method = method_with_vars(&[("x", Type::Int, 2)]);
        let mut emitter = MethodEmitter::new(&method);
        emitter
            .emit_kind(&InstrKind::Assign {
                dest: Operand::var("x", Type::Int),
                src: Box::new(InstrKind::BinaryOp {
                    op: BinaryAluOp::Add,
                    lhs: Operand::var("x", Type::Int),
                    rhs: Operand::int(1),
                }),
            })
            .unwrap();
        assert_eq!(emitter.code, "\tiinc 2 1\n");
        assert_eq!(emitter.stack.current(), 0);
    }

    #[test]
    fn test_subtraction_increments_negatively() {
        let method = method_with_vars(&[("x", Type::Int, 2)]);
        let mut emitter = MethodEmitter::new(&method);
        emitter
            .emit_kind(&InstrKind::Assign {
                dest: Operand::var("x", Type::Int),
                src: Box::new(InstrKind::BinaryOp {
                    op: BinaryAluOp::Sub,
                    lhs: Operand::var("x", Type::Int),
                    rhs: Operand::int(3),
                }),
            })
            .unwrap();
        assert_eq!(emitter.code, "\tiinc 2 -3\n");
    }

    #[test]
    fn test_large_increment_falls_back_to_load_add_store() {
        let method = method_with_vars(&[("x", Type::Int, 2)]);
        let mut emitter = MethodEmitter::new(&method);
        emitter
            .emit_kind(&InstrKind::Assign {
                dest: Operand::var("x", Type::Int),
                src: Box::new(InstrKind::BinaryOp {
                    op: BinaryAluOp::Add,
                    lhs: Operand::var("x", Type::Int),
                    rhs: Operand::int(1000),
                }),
            })
            .unwrap();
        assert!(emitter.code.contains("\tsipush 1000\n"));
        assert!(emitter.code.contains("\tistore_2\n"));
    }

    #[test]
    fn test_comparison_branch_idiom() {
        let method = method_with_vars(&[("x", Type::Int, 1)]);
        let mut emitter = MethodEmitter::new(&method);
        emitter
            .emit_kind(&InstrKind::BinaryOp {
                op: BinaryAluOp::Lt,
                lhs: Operand::var("x", Type::Int),
                rhs: Operand::int(10),
            })
            .unwrap();

        assert!(emitter.code.contains("\tisub\n"));
        assert!(emitter.code.contains("\tiflt cmp_lt_0_true\n"));
        assert!(emitter.code.contains("\ticonst_0\n\tgoto cmp_lt_0_end\n"));
        assert!(emitter.code.contains("\ncmp_lt_0_true:\n"));
        assert!(emitter.code.contains("\ticonst_m1\n"));
        // One boolean result remains.
        assert_eq!(emitter.stack.current(), 1);
    }

    #[test]
    fn test_boolean_true_loads_all_ones() {
        let method = method_with_vars(&[]);
        let mut emitter = MethodEmitter::new(&method);
        emitter.load_operand(&Operand::bool(true)).unwrap();
        emitter.load_operand(&Operand::bool(false)).unwrap();
        assert!(emitter.code.contains("\ticonst_m1\n"));
        assert!(emitter.code.contains("\ticonst_0\n"));
    }

    #[test]
    fn test_array_element_load_and_store() {
        let method = method_with_vars(&[
            ("data", Type::array_of(Type::Int), 1),
            ("i", Type::Int, 2),
        ]);
        let elem = Operand::ArrayElem {
            name: "data".to_string(),
            index: Box::new(Operand::var("i", Type::Int)),
            ty: Type::Int,
            is_parameter: false,
        };

        let mut emitter = MethodEmitter::new(&method);
        emitter.load_operand(&elem).unwrap();
        assert!(emitter.code.contains("\taload_1\n\tiload_2\n\tiaload\n"));
        assert_eq!(emitter.stack.current(), 1);

        let mut emitter = MethodEmitter::new(&method);
        emitter
            .emit_kind(&InstrKind::Assign {
                dest: elem,
                src: Box::new(InstrKind::SingleOp {
                    operand: Operand::int(0),
                }),
            })
            .unwrap();
        assert!(emitter.code.contains("\tiastore\n"));
        assert_eq!(emitter.stack.current(), 0);
    }

    #[test]
    fn test_return_consumes_the_value() {
        let method = method_with_vars(&[("x", Type::Int, 1)]);
        let mut emitter = MethodEmitter::new(&method);
        emitter
            .emit_kind(&InstrKind::Return {
                value: Some(Operand::var("x", Type::Int)),
                ty: Type::Int,
            })
            .unwrap();
        assert!(emitter.code.contains("\tiload_1\n\tireturn\n"));
        assert_eq!(emitter.stack.current(), 0);
    }
}
