//! Per-class symbol registry
//!
//! One table per compiled class: imports, the class itself, fields, and
//! methods with their parameters and locals. Mutation happens only through
//! append-style operations that report conflicts but always insert
//! something (degrading to `Type::Invalid`), so later stages never see a
//! structurally incomplete table.

use crate::error::SemanticError;
use javelin_ast::TypeRef;
use javelin_types::{ClassType, Type};

/// A typed name in some scope.
#[derive(Debug, Clone, PartialEq)]
pub struct Symbol {
    pub ty: Type,
    pub name: String,
}

impl Symbol {
    pub fn new(ty: Type, name: impl Into<String>) -> Self {
        Symbol {
            ty,
            name: name.into(),
        }
    }
}

/// Index of a method in its symbol table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MethodId(pub usize);

/// One method's signature and scope.
///
/// Parameter and local names share a namespace: a name may not be reused
/// across the two lists.
#[derive(Debug, Clone)]
pub struct Method {
    name: String,
    return_type: Type,
    is_static: bool,
    params: Vec<Symbol>,
    locals: Vec<Symbol>,
}

impl Method {
    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn return_type(&self) -> &Type {
        &self.return_type
    }

    pub fn is_static(&self) -> bool {
        self.is_static
    }

    pub fn params(&self) -> &[Symbol] {
        &self.params
    }

    pub fn locals(&self) -> &[Symbol] {
        &self.locals
    }

    pub fn param_by_name(&self, name: &str) -> Option<&Symbol> {
        self.params.iter().find(|symbol| symbol.name == name)
    }

    pub fn param_index(&self, name: &str) -> Option<usize> {
        self.params.iter().position(|symbol| symbol.name == name)
    }

    pub fn local_by_name(&self, name: &str) -> Option<&Symbol> {
        self.locals.iter().find(|symbol| symbol.name == name)
    }
}

/// The symbol table of one compiled class.
#[derive(Debug, Clone)]
pub struct SymbolTable {
    imports: Vec<ClassType>,
    this_class: ClassType,
    fields: Vec<Symbol>,
    methods: Vec<Method>,
}

impl SymbolTable {
    /// A fresh table for `class_name`, extending `Object` until a
    /// superclass is bound.
    pub fn new(class_name: &str) -> Self {
        SymbolTable {
            imports: Vec::new(),
            this_class: ClassType::new(class_name, Some(ClassType::object())),
            fields: Vec::new(),
            methods: Vec::new(),
        }
    }

    pub fn this_class(&self) -> &ClassType {
        &self.this_class
    }

    /// Imported classes in declaration order.
    pub fn imports(&self) -> &[ClassType] {
        &self.imports
    }

    pub fn fields(&self) -> &[Symbol] {
        &self.fields
    }

    pub fn field_by_name(&self, name: &str) -> Option<&Symbol> {
        self.fields.iter().find(|symbol| symbol.name == name)
    }

    pub fn method(&self, id: MethodId) -> &Method {
        &self.methods[id.0]
    }

    pub fn method_ids(&self) -> impl Iterator<Item = MethodId> {
        (0..self.methods.len()).map(MethodId)
    }

    pub fn method_by_name(&self, name: &str) -> Option<(MethodId, &Method)> {
        self.methods
            .iter()
            .position(|method| method.name == name)
            .map(|index| (MethodId(index), &self.methods[index]))
    }

    /// Resolve a simple class name against imports, built-ins, and the
    /// class itself. Built-ins and the class shadow imports of the same
    /// simple name.
    pub fn class_in_scope(&self, simple_name: &str) -> Option<ClassType> {
        if simple_name == self.this_class.simple_name() {
            return Some(self.this_class.clone());
        }
        if simple_name == ClassType::string().simple_name() {
            return Some(ClassType::string());
        }
        if simple_name == ClassType::object().simple_name() {
            return Some(ClassType::object());
        }
        self.imports
            .iter()
            .find(|class| class.simple_name() == simple_name)
            .cloned()
    }

    /// Resolve a source-level type reference.
    pub fn resolve_type(&self, ty: &TypeRef) -> Result<Type, SemanticError> {
        let base = match ty.name.as_str() {
            "int" => Type::Int,
            "boolean" => Type::Boolean,
            "void" => Type::Void,
            name => match self.class_in_scope(name) {
                Some(class) => Type::Class(class),
                None => return Err(SemanticError::SymbolNotFound(name.to_string())),
            },
        };
        Ok(if ty.is_array {
            Type::array_of(base)
        } else {
            base
        })
    }

    fn resolve_or_invalid(&self, ty: &TypeRef, errors: &mut Vec<SemanticError>) -> Type {
        match self.resolve_type(ty) {
            Ok(resolved) => resolved,
            Err(error) => {
                errors.push(error);
                Type::Invalid
            }
        }
    }

    /// Register an import. Re-importing the same qualified name is a
    /// warning; a different qualified name under a used simple name is a
    /// conflict. Either way the new import is dropped.
    pub fn add_import(&mut self, path: &[String]) -> Vec<SemanticError> {
        let qualified = path.join(".");
        let imported = ClassType::new(&qualified, None);

        if let Some(existing) = self
            .imports
            .iter()
            .find(|class| class.simple_name() == imported.simple_name())
        {
            if existing.qualified_name() == qualified {
                return vec![SemanticError::DuplicatedImport(qualified)];
            }
            return vec![SemanticError::ConflictingImport(
                imported.simple_name().to_string(),
            )];
        }

        self.imports.push(imported);
        Vec::new()
    }

    /// Bind the declared superclass, or rebind to `Object` when absent.
    pub fn set_super_class(&mut self, super_name: Option<&str>) -> Vec<SemanticError> {
        let Some(name) = super_name else {
            self.this_class =
                ClassType::new(self.this_class.qualified_name(), Some(ClassType::object()));
            return Vec::new();
        };

        match self.class_in_scope(name) {
            None => vec![SemanticError::SymbolNotFound(name.to_string())],
            Some(class) if class == self.this_class => vec![SemanticError::CyclicExtension],
            Some(class) => {
                self.this_class = ClassType::new(self.this_class.qualified_name(), Some(class));
                Vec::new()
            }
        }
    }

    pub fn add_field(&mut self, ty: &TypeRef, name: &str) -> Vec<SemanticError> {
        let mut errors = Vec::new();
        let resolved = self.resolve_or_invalid(ty, &mut errors);
        if self.field_by_name(name).is_some() {
            errors.push(SemanticError::VariableAlreadyDefined(name.to_string()));
        }
        self.fields.push(Symbol::new(resolved, name));
        errors
    }

    pub fn create_method(
        &mut self,
        name: &str,
        return_type: &TypeRef,
        is_static: bool,
    ) -> (MethodId, Vec<SemanticError>) {
        let mut errors = Vec::new();
        let resolved = self.resolve_or_invalid(return_type, &mut errors);
        if self.method_by_name(name).is_some() {
            errors.push(SemanticError::MethodAlreadyDefined(name.to_string()));
        }
        self.methods.push(Method {
            name: name.to_string(),
            return_type: resolved,
            is_static,
            params: Vec::new(),
            locals: Vec::new(),
        });
        (MethodId(self.methods.len() - 1), errors)
    }

    pub fn add_parameter(
        &mut self,
        method: MethodId,
        ty: &TypeRef,
        name: &str,
    ) -> Vec<SemanticError> {
        let mut errors = Vec::new();
        let resolved = self.resolve_or_invalid(ty, &mut errors);
        let method = &mut self.methods[method.0];
        if method.param_by_name(name).is_some() {
            errors.push(SemanticError::VariableAlreadyDefined(name.to_string()));
        }
        method.params.push(Symbol::new(resolved, name));
        errors
    }

    pub fn add_local_variable(
        &mut self,
        method: MethodId,
        ty: &TypeRef,
        name: &str,
    ) -> Vec<SemanticError> {
        let mut errors = Vec::new();
        let resolved = self.resolve_or_invalid(ty, &mut errors);
        let method = &mut self.methods[method.0];
        if method.local_by_name(name).is_some() || method.param_by_name(name).is_some() {
            errors.push(SemanticError::VariableAlreadyDefined(name.to_string()));
        }
        method.locals.push(Symbol::new(resolved, name));
        errors
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use javelin_ast::Span;

    fn type_ref(name: &str, is_array: bool) -> TypeRef {
        TypeRef::new(name, is_array, Span::NONE)
    }

    fn path(segments: &[&str]) -> Vec<String> {
        segments.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn test_duplicate_import_warns_and_is_dropped() {
        let mut table = SymbolTable::new("Test");
        assert!(table.add_import(&path(&["a", "Lib"])).is_empty());

        let errors = table.add_import(&path(&["a", "Lib"]));
        assert_eq!(
            errors,
            vec![SemanticError::DuplicatedImport("a.Lib".to_string())]
        );
        assert_eq!(table.imports().len(), 1);
    }

    #[test]
    fn test_conflicting_import_errors_and_is_dropped() {
        let mut table = SymbolTable::new("Test");
        table.add_import(&path(&["a", "Lib"]));

        let errors = table.add_import(&path(&["b", "Lib"]));
        assert_eq!(
            errors,
            vec![SemanticError::ConflictingImport("Lib".to_string())]
        );
        assert_eq!(table.imports().len(), 1);
        assert_eq!(table.imports()[0].qualified_name(), "a.Lib");
    }

    #[test]
    fn test_super_class_binding() {
        let mut table = SymbolTable::new("Test");
        table.add_import(&path(&["a", "Base"]));

        assert!(table.set_super_class(Some("Base")).is_empty());
        let super_class = table.this_class().super_class().unwrap();
        assert_eq!(super_class.qualified_name(), "a.Base");
    }

    #[test]
    fn test_unresolved_super_class_is_fatal() {
        let mut table = SymbolTable::new("Test");
        let errors = table.set_super_class(Some("Missing"));
        assert_eq!(
            errors,
            vec![SemanticError::SymbolNotFound("Missing".to_string())]
        );
        // The class still extends Object so analysis can continue.
        assert_eq!(table.this_class().super_class(), Some(&ClassType::object()));
    }

    #[test]
    fn test_self_extension_is_cyclic() {
        let mut table = SymbolTable::new("Test");
        let errors = table.set_super_class(Some("Test"));
        assert_eq!(errors, vec![SemanticError::CyclicExtension]);
    }

    #[test]
    fn test_duplicate_field_still_inserted() {
        let mut table = SymbolTable::new("Test");
        assert!(table.add_field(&type_ref("int", false), "x").is_empty());

        let errors = table.add_field(&type_ref("boolean", false), "x");
        assert_eq!(
            errors,
            vec![SemanticError::VariableAlreadyDefined("x".to_string())]
        );
        assert_eq!(table.fields().len(), 2);
    }

    #[test]
    fn test_unresolved_field_type_degrades_to_invalid() {
        let mut table = SymbolTable::new("Test");
        let errors = table.add_field(&type_ref("Missing", false), "x");
        assert_eq!(
            errors,
            vec![SemanticError::SymbolNotFound("Missing".to_string())]
        );
        assert_eq!(table.field_by_name("x").unwrap().ty, Type::Invalid);
    }

    #[test]
    fn test_method_name_reuse_across_params_and_locals() {
        let mut table = SymbolTable::new("Test");
        let (id, errors) = table.create_method("m", &type_ref("int", false), false);
        assert!(errors.is_empty());

        assert!(table
            .add_parameter(id, &type_ref("int", false), "a")
            .is_empty());
        let errors = table.add_local_variable(id, &type_ref("int", false), "a");
        assert_eq!(
            errors,
            vec![SemanticError::VariableAlreadyDefined("a".to_string())]
        );
        assert_eq!(table.method(id).params().len(), 1);
        assert_eq!(table.method(id).locals().len(), 1);
    }

    #[test]
    fn test_no_overloading() {
        let mut table = SymbolTable::new("Test");
        table.create_method("m", &type_ref("int", false), false);
        let (_, errors) = table.create_method("m", &type_ref("boolean", false), false);
        assert_eq!(
            errors,
            vec![SemanticError::MethodAlreadyDefined("m".to_string())]
        );
        assert_eq!(table.method_ids().count(), 2);
    }

    #[test]
    fn test_builtins_shadow_imports() {
        let mut table = SymbolTable::new("Test");
        table.add_import(&path(&["my", "String"]));

        let resolved = table.class_in_scope("String").unwrap();
        assert_eq!(resolved.qualified_name(), "java.lang.String");
    }

    #[test]
    fn test_resolve_array_type() {
        let table = SymbolTable::new("Test");
        let resolved = table.resolve_type(&type_ref("int", true)).unwrap();
        assert_eq!(resolved, Type::array_of(Type::Int));
    }
}
