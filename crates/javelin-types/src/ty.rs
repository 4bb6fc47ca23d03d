//! Core type definitions for the Javelin type system

use once_cell::sync::Lazy;
use std::fmt;
use std::hash::{Hash, Hasher};

static OBJECT: Lazy<ClassType> = Lazy::new(|| ClassType::new("java.lang.Object", None));
static STRING: Lazy<ClassType> = Lazy::new(|| ClassType::new("java.lang.String", None));

/// A class type identified by its qualified name.
///
/// The superclass link is how assignability walks the hierarchy. An imported
/// class has no recorded superclass, which makes its structure unknown to the
/// checker and its instances assignable to any class.
#[derive(Debug, Clone, Eq)]
pub struct ClassType {
    qualified: String,
    simple: String,
    super_class: Option<Box<ClassType>>,
}

impl ClassType {
    pub fn new(qualified: impl Into<String>, super_class: Option<ClassType>) -> Self {
        let qualified = qualified.into();
        let simple = qualified
            .rsplit('.')
            .next()
            .unwrap_or(qualified.as_str())
            .to_string();
        ClassType {
            qualified,
            simple,
            super_class: super_class.map(Box::new),
        }
    }

    /// The built-in `java.lang.Object` class. It has no superclass.
    pub fn object() -> ClassType {
        OBJECT.clone()
    }

    /// The built-in `java.lang.String` class.
    pub fn string() -> ClassType {
        STRING.clone()
    }

    pub fn qualified_name(&self) -> &str {
        &self.qualified
    }

    pub fn simple_name(&self) -> &str {
        &self.simple
    }

    pub fn super_class(&self) -> Option<&ClassType> {
        self.super_class.as_deref()
    }

    /// Whether the checker knows this class's full shape.
    ///
    /// True iff the superclass chain bottoms out at `Object`. Imported
    /// classes carry no superclass, so calls on them are checked
    /// permissively.
    pub fn has_known_structure(&self) -> bool {
        *self == *OBJECT
            || self
                .super_class
                .as_deref()
                .is_some_and(ClassType::has_known_structure)
    }

    /// Class-to-class assignability.
    ///
    /// Equal classes are assignable; `Object` only to itself; a class with
    /// no recorded superclass (an import) to any class; everything else
    /// defers to its superclass chain.
    pub fn is_assignable_to_class(&self, other: &ClassType) -> bool {
        if self == other {
            return true;
        }
        if *self == *OBJECT {
            return false;
        }
        match &self.super_class {
            None => true,
            Some(super_class) => super_class.is_assignable_to_class(other),
        }
    }

    /// The slash-separated form used in assembly (`a.b.C` -> `a/b/C`).
    pub fn class_path(&self) -> String {
        self.qualified.replace('.', "/")
    }
}

impl PartialEq for ClassType {
    fn eq(&self, other: &Self) -> bool {
        self.qualified == other.qualified
    }
}

impl Hash for ClassType {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.qualified.hash(state);
    }
}

impl fmt::Display for ClassType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.qualified)
    }
}

/// The core type representation in Javelin.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Type {
    /// The `int` primitive
    Int,
    /// The `boolean` primitive
    Boolean,
    /// The `void` type (method with no return value)
    Void,
    /// An instance of a class
    Class(ClassType),
    /// An array of some element type
    Array(Box<Type>),
    /// A class name used as a value, e.g. the target of a static call
    StaticRef(ClassType),
    /// Type of an unresolved or imported symbol, treated permissively
    Unknown,
    /// Type of a symbol that failed resolution; never assignable
    Invalid,
}

impl Type {
    pub fn array_of(element: Type) -> Type {
        Type::Array(Box::new(element))
    }

    pub fn is_unknown(&self) -> bool {
        matches!(self, Type::Unknown)
    }

    pub fn is_invalid(&self) -> bool {
        matches!(self, Type::Invalid)
    }

    pub fn as_class(&self) -> Option<&ClassType> {
        match self {
            Type::Class(class) => Some(class),
            _ => None,
        }
    }

    pub fn as_array_element(&self) -> Option<&Type> {
        match self {
            Type::Array(element) => Some(element),
            _ => None,
        }
    }

    /// Whether a value of this type can be used where `other` is expected.
    ///
    /// Reflexive for primitives; class-to-class per
    /// [`ClassType::is_assignable_to_class`]; arrays only element-wise.
    /// `Void`, `StaticRef`, `Unknown` and `Invalid` are assignable to
    /// nothing.
    pub fn is_assignable_to(&self, other: &Type) -> bool {
        match (self, other) {
            (Type::Int, Type::Int) | (Type::Boolean, Type::Boolean) => true,
            (Type::Class(a), Type::Class(b)) => a.is_assignable_to_class(b),
            (Type::Array(a), Type::Array(b)) => a.is_assignable_to(b),
            _ => false,
        }
    }

    /// The IR type suffix (`x.i32`, `x.bool`, `x.array.i32`, ...).
    ///
    /// `Unknown` and `Invalid` have no serialized form.
    pub fn suffix(&self) -> Option<String> {
        match self {
            Type::Int => Some("i32".to_string()),
            Type::Boolean => Some("bool".to_string()),
            Type::Void => Some("V".to_string()),
            Type::Class(class) => Some(class.simple_name().to_string()),
            Type::Array(element) => element.suffix().map(|s| format!("array.{}", s)),
            Type::StaticRef(class) => Some(class.simple_name().to_string()),
            Type::Unknown | Type::Invalid => None,
        }
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Type::Int => write!(f, "int"),
            Type::Boolean => write!(f, "boolean"),
            Type::Void => write!(f, "void"),
            Type::Class(class) => write!(f, "{}", class),
            Type::Array(element) => write!(f, "{}[]", element),
            Type::StaticRef(class) => write!(f, "<static-reference {}>", class),
            Type::Unknown => write!(f, "<unknown-type>"),
            Type::Invalid => write!(f, "<invalid-type>"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn class(name: &str, super_class: Option<ClassType>) -> ClassType {
        ClassType::new(name, super_class)
    }

    #[test]
    fn test_primitive_assignability_is_reflexive() {
        assert!(Type::Int.is_assignable_to(&Type::Int));
        assert!(Type::Boolean.is_assignable_to(&Type::Boolean));
        assert!(!Type::Int.is_assignable_to(&Type::Boolean));
        assert!(!Type::Void.is_assignable_to(&Type::Void));
    }

    #[test]
    fn test_object_is_only_assignable_to_itself() {
        let object = Type::Class(ClassType::object());
        let other = Type::Class(class("Other", Some(ClassType::object())));

        assert!(object.is_assignable_to(&object));
        assert!(!object.is_assignable_to(&other));
        assert!(other.is_assignable_to(&object));
    }

    #[test]
    fn test_superclass_chain_assignability() {
        let base = class("Base", Some(ClassType::object()));
        let derived = class("Derived", Some(base.clone()));

        assert!(Type::Class(derived.clone()).is_assignable_to(&Type::Class(base.clone())));
        assert!(!Type::Class(base).is_assignable_to(&Type::Class(derived)));
    }

    #[test]
    fn test_imported_class_is_assignable_to_any_class() {
        let imported = class("a.b.Foo", None);
        let local = class("Local", Some(ClassType::object()));

        assert!(Type::Class(imported.clone()).is_assignable_to(&Type::Class(local)));
        assert!(!imported.has_known_structure());
    }

    #[test]
    fn test_class_equality_is_by_qualified_name() {
        let first = class("a.b.Foo", None);
        let second = class("a.b.Foo", Some(ClassType::object()));
        let third = class("c.Foo", None);

        assert_eq!(first, second);
        assert_ne!(first, third);
        assert_eq!(first.simple_name(), third.simple_name());
    }

    #[test]
    fn test_array_assignability_is_element_wise() {
        let ints = Type::array_of(Type::Int);
        let bools = Type::array_of(Type::Boolean);

        assert!(ints.is_assignable_to(&ints));
        assert!(!ints.is_assignable_to(&bools));
        assert!(!ints.is_assignable_to(&Type::Int));
    }

    #[test]
    fn test_meta_types_are_never_assignable() {
        assert!(!Type::Unknown.is_assignable_to(&Type::Int));
        assert!(!Type::Invalid.is_assignable_to(&Type::Invalid));
        let reference = Type::StaticRef(ClassType::object());
        assert!(!reference.is_assignable_to(&Type::Class(ClassType::object())));
    }

    #[test]
    fn test_suffix_table() {
        assert_eq!(Type::Int.suffix().as_deref(), Some("i32"));
        assert_eq!(Type::Boolean.suffix().as_deref(), Some("bool"));
        assert_eq!(Type::Void.suffix().as_deref(), Some("V"));
        assert_eq!(
            Type::array_of(Type::Int).suffix().as_deref(),
            Some("array.i32")
        );
        let foo = Type::Class(class("a.b.Foo", None));
        assert_eq!(foo.suffix().as_deref(), Some("Foo"));
        assert_eq!(Type::Unknown.suffix(), None);
        assert_eq!(Type::Invalid.suffix(), None);
    }

    #[test]
    fn test_known_structure() {
        let local = class("Local", Some(ClassType::object()));
        let derived = class("Derived", Some(local.clone()));
        let imported = class("ext.Lib", None);
        let from_import = class("Sub", Some(imported.clone()));

        assert!(ClassType::object().has_known_structure());
        assert!(local.has_known_structure());
        assert!(derived.has_known_structure());
        assert!(!imported.has_known_structure());
        assert!(!from_import.has_known_structure());
    }
}
