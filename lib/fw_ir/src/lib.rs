//! This crate provides the three-address intermediate representation
//! analyzed by the `FlowWorks` project, along with its textual form parser
//! and pretty printer.
//!
//! ```rust
//! let program = fw_ir::parse(
//!     r"
//!     class Main {
//!         static method main() : void {
//!             var int x;
//!             x = 42;
//!             return;
//!         }
//!     }
//!     ",
//! )?;
//! assert_eq!(program.entry_methods().len(), 1);
//! # Ok::<(), fw_ir::errors::IrError>(())
//! ```

mod builder;
pub mod errors;
mod ids;
mod parsers;
pub mod program;
mod split;
pub mod stmts;
pub mod types;

use crate::errors::IrResult;
use std::fmt;
use std::fs;
use std::path::Path;

pub use ids::{ClassId, FieldId, MethodId, StmtRef, VarId};
pub use program::{Class, Field, Method, Program, Var};
pub use stmts::{BinaryExp, BinaryOp, CallKind, Invoke, Literal, MethodRef, Stmt, StmtVisitor, Subsignature};
pub use types::Type;

/// Parses a program in its textual form and resolves every name it
/// contains.
pub fn parse(input: &str) -> IrResult<Program> {
    let ast = parsers::parse_program(input)?;
    builder::build(&ast)
}

/// Reads and parses a program file.
pub fn open<P: AsRef<Path>>(path: P) -> IrResult<Program> {
    log::debug!("opening {:?}", path.as_ref());
    let input = fs::read_to_string(path)?;
    parse(&input)
}

/// Program aware formatting, for IR items that only make sense in the
/// context of a whole program (names are resolved through it).
pub trait PrettyPrint {
    fn pp(&self, f: &mut fmt::Formatter, program: &Program) -> fmt::Result;
}

pub struct PrettyPrinter<'a, T>(pub &'a T, pub &'a Program);

impl<'a, T: PrettyPrint> fmt::Display for PrettyPrinter<'a, T> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        self.0.pp(f, self.1)
    }
}

impl PrettyPrint for MethodId {
    fn pp(&self, f: &mut fmt::Formatter, program: &Program) -> fmt::Result {
        write!(f, "{}", program.method_signature(*self))
    }
}

impl PrettyPrint for VarId {
    fn pp(&self, f: &mut fmt::Formatter, program: &Program) -> fmt::Result {
        let var = program.var(*self);
        write!(
            f,
            "{}/{}",
            program.method_signature(var.method()),
            var.name()
        )
    }
}

impl PrettyPrint for FieldId {
    fn pp(&self, f: &mut fmt::Formatter, program: &Program) -> fmt::Result {
        let field = program.field(*self);
        write!(
            f,
            "<{}: {} {}>",
            program.class(field.class()).name(),
            field.ty(),
            field.name()
        )
    }
}

impl PrettyPrint for StmtRef {
    fn pp(&self, f: &mut fmt::Formatter, program: &Program) -> fmt::Result {
        write!(f, "{}[{}: ", program.method_signature(self.method), self.index)?;
        program.stmt(*self).pp(f, program)?;
        write!(f, "]")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pretty_printing() {
        let program = parse(
            r"
            class Box { field java/lang/Object item; }
            class Main {
                static method main() : void {
                    var Box b; var java/lang/Object o; var int i, j, k;
                    b = new Box;
                    o = new java/lang/Object;
                    b.item = o;
                    i = 3;
                    j = i << i;
                    k = invokestatic <Main: int id(int)>(j);
                    return;
                }
                static method id(int x) : int { return x; }
            }
            ",
        )
        .unwrap();
        let main = program.find_method("Main", "main").unwrap();
        let printed: Vec<String> = program
            .method(main)
            .iter_stmt_refs()
            .map(|stmt| PrettyPrinter(program.stmt(stmt), &program).to_string())
            .collect();
        assert_eq!(
            printed,
            vec![
                "b = new Box",
                "o = new java/lang/Object",
                "b.item = o",
                "i = 3",
                "j = i << i",
                "k = invokestatic <Main: int id(int)>(j)",
                "return",
            ]
        );
        let id = program.find_method("Main", "id").unwrap();
        assert_eq!(
            PrettyPrinter(&id, &program).to_string(),
            "<Main: int id(int)>"
        );
    }
}
