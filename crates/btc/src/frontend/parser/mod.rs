//! BType parser

mod parser;

pub use parser::Parser;

use crate::common::CompileResult;
use crate::frontend::ast::Module;

/// Parse a BType source file into an AST
pub fn parse(source: &str) -> CompileResult<Module> {
    Parser::new(source).parse_module()
}
