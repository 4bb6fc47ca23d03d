//! Javelin compilation pipeline
//!
//! Everything after semantic analysis: optional constant folding over the
//! checked AST, lowering into the three-address IR, liveness-based
//! register allocation, and emission of the textual stack-machine
//! assembly. The [`Compiler`] facade chains the stages and accumulates
//! their reports; internal stage inconsistencies surface as
//! [`CompileError`], never as user diagnostics.

pub mod codegen;
mod config;
mod error;
pub mod ir;
pub mod lower;
pub mod optimize;

pub use config::Config;
pub use error::{CompileError, CompileResult};

use ir::ClassUnit;
use javelin_ast::Ast;
use javelin_checker::{has_errors, Report, SymbolTable, TypeMap};
use optimize::AllocationOutcome;

/// Everything one pipeline run produces.
///
/// The lowered unit and the texts are absent when analysis failed; the
/// register mapping additionally requires an allocation budget.
#[derive(Debug)]
pub struct Compilation {
    pub reports: Vec<Report>,
    pub symbol_table: SymbolTable,
    pub unit: Option<ClassUnit>,
    pub ir_text: Option<String>,
    pub assembly: Option<String>,
    pub register_mapping: Option<String>,
}

impl Compilation {
    pub fn has_errors(&self) -> bool {
        has_errors(&self.reports)
    }
}

/// The pipeline facade. Each stage is also callable on its own.
pub struct Compiler {
    config: Config,
}

impl Compiler {
    pub fn new(config: Config) -> Self {
        Compiler { config }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Binder plus type checker.
    pub fn analyze(&self, ast: &Ast) -> (SymbolTable, TypeMap, Vec<Report>) {
        javelin_checker::analyze(ast)
    }

    /// Constant folding over the checked tree.
    pub fn fold_constants(&self, ast: &mut Ast) {
        optimize::fold_constants(ast);
    }

    /// Lower the checked tree into a class unit.
    pub fn lower(&self, ast: &Ast, table: &SymbolTable, types: &TypeMap) -> CompileResult<ClassUnit> {
        lower::lower(ast, table, types)
    }

    /// Run the register allocator against the configured budget.
    pub fn allocate_registers(&self, unit: &mut ClassUnit) -> CompileResult<AllocationOutcome> {
        optimize::allocate_registers(unit, self.config.register_allocation)
    }

    /// Emit assembly for a lowered unit.
    pub fn emit(&self, unit: &ClassUnit) -> CompileResult<String> {
        codegen::emit(unit)
    }

    /// Run the whole pipeline.
    ///
    /// Error-level analysis reports stop the run before lowering, matching
    /// the front end's fatal-error policy; allocator budget reports do not
    /// stop emission.
    pub fn compile(&self, mut ast: Ast) -> CompileResult<Compilation> {
        let (symbol_table, types, mut reports) = self.analyze(&ast);
        if has_errors(&reports) {
            return Ok(Compilation {
                reports,
                symbol_table,
                unit: None,
                ir_text: None,
                assembly: None,
                register_mapping: None,
            });
        }

        if self.config.optimize {
            self.fold_constants(&mut ast);
        }

        let mut unit = self.lower(&ast, &symbol_table, &types)?;

        let mut register_mapping = None;
        if self.config.allocates_registers() {
            let outcome = self.allocate_registers(&mut unit)?;
            reports.extend(outcome.reports);
            register_mapping = Some(optimize::render_register_mapping(&unit));
        }

        let ir_text = ir::pretty::render(&unit);
        let assembly = self.emit(&unit)?;

        Ok(Compilation {
            reports,
            symbol_table,
            unit: Some(unit),
            ir_text: Some(ir_text),
            assembly: Some(assembly),
            register_mapping,
        })
    }
}
