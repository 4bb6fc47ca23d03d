//! IR class unit, methods, and the control-flow graph

use super::instr::{InstrKind, Instruction};
use crate::error::{CompileError, CompileResult};
use javelin_types::{ClassType, Type};
use rustc_hash::FxHashMap;

/// Storage slot descriptor for a method variable.
#[derive(Debug, Clone, PartialEq)]
pub struct Descriptor {
    pub ty: Type,
    pub virtual_reg: i32,
}

/// A class field.
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub ty: Type,
    /// Constant initializer, emitted in the field directive when present.
    pub initial_value: Option<i32>,
}

/// One lowered method: a flat instruction sequence plus the variable table
/// mapping every parameter, local, and temporary to a virtual register.
#[derive(Debug, Clone)]
pub struct Method {
    pub name: String,
    pub is_public: bool,
    pub is_static: bool,
    pub params: Vec<(String, Type)>,
    pub return_type: Type,
    pub instructions: Vec<Instruction>,
    /// Label -> index of the instruction it precedes.
    pub labels: Vec<(String, usize)>,
    pub var_table: FxHashMap<String, Descriptor>,
}

impl Method {
    pub fn new(name: impl Into<String>, is_public: bool, is_static: bool, return_type: Type) -> Self {
        Method {
            name: name.into(),
            is_public,
            is_static,
            params: Vec::new(),
            return_type,
            instructions: Vec::new(),
            labels: Vec::new(),
            var_table: FxHashMap::default(),
        }
    }

    /// Append an instruction, returning its id.
    pub fn push(&mut self, kind: InstrKind) -> usize {
        let id = self.instructions.len();
        self.instructions.push(Instruction::new(id, kind));
        id
    }

    /// Attach a label to the next instruction to be pushed.
    pub fn add_label(&mut self, label: impl Into<String>) {
        self.labels.push((label.into(), self.instructions.len()));
    }

    /// Labels attached to the instruction at `index`.
    pub fn labels_at(&self, index: usize) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .filter(move |(_, at)| *at == index)
            .map(|(label, _)| label.as_str())
    }

    pub fn label_target(&self, label: &str) -> Option<usize> {
        self.labels
            .iter()
            .find(|(name, _)| name == label)
            .map(|(_, at)| *at)
    }

    /// Resolve labels into successor edges: straight-line fall-through,
    /// goto to its target only, branch to target plus fall-through, return
    /// to nothing.
    pub fn build_cfg(&mut self) -> CompileResult<()> {
        let count = self.instructions.len();
        let mut all_successors = Vec::with_capacity(count);

        for index in 0..count {
            let successors = match &self.instructions[index].kind {
                InstrKind::Goto { label } => {
                    vec![self.resolve_label(label)?]
                }
                InstrKind::Branch { label, .. } => {
                    let mut successors = vec![self.resolve_label(label)?];
                    if index + 1 < count {
                        successors.push(index + 1);
                    }
                    successors
                }
                InstrKind::Return { .. } => Vec::new(),
                _ => {
                    if index + 1 < count {
                        vec![index + 1]
                    } else {
                        Vec::new()
                    }
                }
            };
            all_successors.push(successors);
        }

        for (instruction, successors) in self.instructions.iter_mut().zip(all_successors) {
            instruction.successors = successors;
        }
        Ok(())
    }

    fn resolve_label(&self, label: &str) -> CompileResult<usize> {
        self.label_target(label)
            .ok_or_else(|| CompileError::UndefinedLabel {
                label: label.to_string(),
                method: self.name.clone(),
            })
    }
}

/// A lowered compilation unit: one class with its fields and methods.
#[derive(Debug, Clone)]
pub struct ClassUnit {
    /// Imported qualified names, in declaration order.
    pub imports: Vec<String>,
    pub class: ClassType,
    pub fields: Vec<Field>,
    pub methods: Vec<Method>,
}

impl ClassUnit {
    pub fn new(class: ClassType) -> Self {
        ClassUnit {
            imports: Vec::new(),
            class,
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn build_cfgs(&mut self) -> CompileResult<()> {
        for method in &mut self.methods {
            method.build_cfg()?;
        }
        Ok(())
    }
}
