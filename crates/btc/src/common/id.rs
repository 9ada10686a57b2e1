//! Arena indices shared between the scope tree, the type table and the IR

use std::fmt;

macro_rules! arena_id {
    ($(#[$meta:meta])* $name:ident, $prefix:literal) => {
        $(#[$meta])*
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
        pub struct $name(pub usize);

        impl $name {
            pub fn index(self) -> usize {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, concat!($prefix, "{}"), self.0)
            }
        }
    };
}

arena_id!(
    /// Index of a lexical scope in the context arena
    ContextId,
    "ctx#"
);
arena_id!(
    /// Index of a declared function (free function, method, constructor or operator)
    FunctionId,
    "fn#"
);
arena_id!(
    /// Index of a declared struct in the type table
    StructId,
    "struct#"
);
arena_id!(
    /// Index of a compiled module in the module cache
    ModuleId,
    "module#"
);
