//! Type system for the semantic core
//!
//! Primitives, structs with memoized layouts, tuples, arrays, function and
//! module types, plus the operator-overload registry.

mod operators;
mod table;
mod ty;

pub use operators::{OperatorRegistry, Overload};
pub use table::{
    builtin_type, FieldLayout, StructConstructor, StructLayout, StructMember, StructMethod,
    StructType, TypeTable,
};
pub use ty::{Primitive, Type, POINTER_SIZE};
