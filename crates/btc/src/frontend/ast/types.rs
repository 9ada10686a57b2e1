//! Type annotations as written in source

use crate::common::Span;
use std::fmt;

/// A type annotation: `int`, `Point`, `array<int>`, `tuple<int, float>`,
/// `func<int, bool>`
#[derive(Debug, Clone, PartialEq)]
pub struct TypeExpr {
    pub kind: TypeExprKind,
    pub span: Span,
}

impl TypeExpr {
    pub fn new(kind: TypeExprKind, span: Span) -> Self {
        Self { kind, span }
    }

    pub fn named(name: impl Into<String>, span: Span) -> Self {
        Self::new(TypeExprKind::Named(name.into()), span)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum TypeExprKind {
    /// Primitive or user-declared type name
    Named(String),
    /// `array<T>`
    Array(Box<TypeExpr>),
    /// `tuple<T, U, ...>`
    Tuple(Vec<TypeExpr>),
    /// `func<R, P...>`; `R` is `None` when written as `void`
    Func {
        ret: Option<Box<TypeExpr>>,
        params: Vec<TypeExpr>,
    },
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            TypeExprKind::Named(name) => write!(f, "{name}"),
            TypeExprKind::Array(inner) => write!(f, "array<{inner}>"),
            TypeExprKind::Tuple(elements) => {
                write!(f, "tuple<")?;
                write_list(f, elements)?;
                write!(f, ">")
            }
            TypeExprKind::Func { ret, params } => {
                match ret {
                    Some(ret) => write!(f, "func<{ret}")?,
                    None => write!(f, "func<void")?,
                }
                if !params.is_empty() {
                    write!(f, ", ")?;
                    write_list(f, params)?;
                }
                write!(f, ">")
            }
        }
    }
}

fn write_list(f: &mut fmt::Formatter<'_>, types: &[TypeExpr]) -> fmt::Result {
    for (i, ty) in types.iter().enumerate() {
        if i > 0 {
            write!(f, ", ")?;
        }
        write!(f, "{ty}")?;
    }
    Ok(())
}
