//! Semantic type representation
//!
//! `Type` is a plain value. Struct types are referenced by [`StructId`] and
//! their contents live in the [`TypeTable`](super::TypeTable), which is the
//! only place that can answer structural questions about them (equality,
//! size, layout).

use crate::common::StructId;
use std::collections::BTreeMap;

/// Size in bytes of a reference slot (struct, array, string, tuple and
/// function values are all held by reference)
pub const POINTER_SIZE: usize = 8;

/// Semantic type
#[derive(Debug, Clone, PartialEq)]
pub enum Type {
    /// Built-in scalar or string type
    Primitive(Primitive),
    /// User-declared `object`
    Struct(StructId),
    /// Fixed-arity heterogeneous tuple: `tuple<int, float>`
    Tuple(Vec<Type>),
    /// Growable homogeneous array: `array<int>`
    Array(Box<Type>),
    /// Function type; `ret` is `None` for functions that return nothing
    Func {
        ret: Option<Box<Type>>,
        params: Vec<Type>,
    },
    /// Imported module; maps exported value names to their types
    Module {
        name: String,
        exports: BTreeMap<String, Type>,
    },
}

/// Built-in primitive types
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Primitive {
    Int,
    Uint,
    Float,
    Sfloat,
    Bool,
    Byte,
    Str,
    /// Type of the `null` literal before it is given a reference type
    Null,
    /// Result of calling a function with no return type
    Void,
}

impl Primitive {
    /// Primitives that can be named in source
    pub const NAMEABLE: [Primitive; 7] = [
        Primitive::Int,
        Primitive::Uint,
        Primitive::Float,
        Primitive::Sfloat,
        Primitive::Bool,
        Primitive::Byte,
        Primitive::Str,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Primitive::Int => "int",
            Primitive::Uint => "uint",
            Primitive::Float => "float",
            Primitive::Sfloat => "sfloat",
            Primitive::Bool => "bool",
            Primitive::Byte => "byte",
            Primitive::Str => "str",
            Primitive::Null => "null",
            Primitive::Void => "void",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::NAMEABLE.into_iter().find(|p| p.name() == name)
    }

    /// Fixed size in bytes; `None` for unsized string data
    pub fn size(self) -> Option<usize> {
        match self {
            Primitive::Bool | Primitive::Byte => Some(1),
            Primitive::Int | Primitive::Uint | Primitive::Sfloat => Some(4),
            Primitive::Float => Some(8),
            Primitive::Str => None,
            Primitive::Null => Some(POINTER_SIZE),
            Primitive::Void => Some(0),
        }
    }

    pub fn is_numeric(self) -> bool {
        matches!(
            self,
            Primitive::Int | Primitive::Uint | Primitive::Float | Primitive::Sfloat | Primitive::Byte
        )
    }

    pub fn is_integral(self) -> bool {
        matches!(self, Primitive::Int | Primitive::Uint | Primitive::Byte)
    }
}

impl Type {
    pub fn int() -> Self {
        Type::Primitive(Primitive::Int)
    }

    pub fn float() -> Self {
        Type::Primitive(Primitive::Float)
    }

    pub fn bool() -> Self {
        Type::Primitive(Primitive::Bool)
    }

    pub fn byte() -> Self {
        Type::Primitive(Primitive::Byte)
    }

    pub fn str() -> Self {
        Type::Primitive(Primitive::Str)
    }

    pub fn null() -> Self {
        Type::Primitive(Primitive::Null)
    }

    pub fn void() -> Self {
        Type::Primitive(Primitive::Void)
    }

    pub fn array(element: Type) -> Self {
        Type::Array(Box::new(element))
    }

    pub fn func(ret: Option<Type>, params: Vec<Type>) -> Self {
        Type::Func {
            ret: ret.map(Box::new),
            params,
        }
    }

    pub fn as_primitive(&self) -> Option<Primitive> {
        match self {
            Type::Primitive(p) => Some(*p),
            _ => None,
        }
    }

    /// Is this a built-in scalar/string type (including `null` and `void`)?
    pub fn is_primitive(&self) -> bool {
        matches!(self, Type::Primitive(_))
    }

    pub fn is_null(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Null))
    }

    pub fn is_void(&self) -> bool {
        matches!(self, Type::Primitive(Primitive::Void))
    }

    pub fn is_func(&self) -> bool {
        matches!(self, Type::Func { .. })
    }

    /// Types whose values are held by reference and may therefore be `null`
    pub fn is_reference(&self) -> bool {
        matches!(
            self,
            Type::Struct(_) | Type::Tuple(_) | Type::Array(_) | Type::Func { .. }
        )
    }

    pub fn as_struct(&self) -> Option<StructId> {
        match self {
            Type::Struct(id) => Some(*id),
            _ => None,
        }
    }

    /// Return and parameter types of a function type
    pub fn as_func(&self) -> Option<(Option<&Type>, &[Type])> {
        match self {
            Type::Func { ret, params } => Some((ret.as_deref(), params)),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_primitive_sizes() {
        assert_eq!(Primitive::Bool.size(), Some(1));
        assert_eq!(Primitive::Byte.size(), Some(1));
        assert_eq!(Primitive::Int.size(), Some(4));
        assert_eq!(Primitive::Uint.size(), Some(4));
        assert_eq!(Primitive::Sfloat.size(), Some(4));
        assert_eq!(Primitive::Float.size(), Some(8));
        assert_eq!(Primitive::Str.size(), None);
    }

    #[test]
    fn test_primitive_names_round_trip() {
        for p in Primitive::NAMEABLE {
            assert_eq!(Primitive::from_name(p.name()), Some(p));
        }
        assert_eq!(Primitive::from_name("null"), None);
        assert_eq!(Primitive::from_name("void"), None);
    }

    #[test]
    fn test_func_accessor() {
        let ty = Type::func(Some(Type::int()), vec![Type::bool()]);
        let (ret, params) = ty.as_func().unwrap();
        assert_eq!(ret, Some(&Type::int()));
        assert_eq!(params, &[Type::bool()]);
    }
}
