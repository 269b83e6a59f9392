//! # `FlowWorks`
//!
//! `flowworks` is the main crate of the `FlowWorks` static analysis project.
//! The project is subdivided into multiple crates, `flowworks` acts as entry
//! point by reexporting important structs and functions from those
//! sub-crates. Most of the reexport are done within the `flowworks::prelude`
//! namespace.
//!
//! ## Library basics
//!
//! Programs are written in a small three-address textual IR, which is
//! parsed and resolved into a [`Program`](fw_ir::Program). Whole program
//! analyses start from the class hierarchy:
//!
//! ```rust
//! use flowworks::prelude::*;
//!
//! let program = flowworks::ir::parse(
//!     r"
//!     class Main {
//!         static method main() : void { return; }
//!     }
//!     ",
//! )?;
//! let hierarchy = Hierarchy::build(&program);
//! let result = pta::analyze_ci(&hierarchy)?;
//! println!("reachable methods: {}", result.reachable_methods().len());
//! # Ok::<(), FwError>(())
//! ```
//!
//! ## Sub-crates
//!
//!  - [`fw_ir`] contains the intermediate representation, its parser and
//!    its pretty printer,
//!  - [`fw_analysis`] contains all the analysis algorithms: class hierarchy
//!    analysis, dataflow frameworks and their clients, pointer analysis.

mod errors;

pub mod cli;
pub mod fw_callgraph;
pub mod fw_constprop;
pub mod fw_deadcode;
pub mod fw_hierarchy;
pub mod fw_pta;

pub use fw_analysis as analysis;
pub use fw_ir as ir;

/// Reexport module of commonly used structures and functions from `FlowWorks` project
/// sub-crates:
///
/// ```rust
/// use flowworks::prelude::*;
/// ```
pub mod prelude {
    pub use crate::errors::{FwError, FwResult};

    pub use fw_analysis::callgraph::{self, CallGraph};
    pub use fw_analysis::controlflow;
    pub use fw_analysis::hierarchy::Hierarchy;
    pub use fw_analysis::pta;

    pub use fw_ir::{Class, Method, MethodId, PrettyPrinter, Program, Stmt, StmtRef};

    use clap::ArgMatches;

    pub fn init_logger(args: &ArgMatches) {
        let env = env_logger::Env::new()
            .filter_or("FW_LOG", "info")
            .write_style("FW_LOG_STYLE");

        let mut builder = env_logger::Builder::from_env(env);
        if args.get_flag("verbose") {
            builder.filter_level(log::LevelFilter::Trace);
        } else if args.get_flag("debug") {
            builder.filter_level(log::LevelFilter::Debug);
        }
        if args.get_flag("ecslog") {
            builder.format(ecs_logger::format);
        }
        builder.init();
    }

    /// Parses the program given with `--input`.
    pub fn open_input(args: &ArgMatches) -> FwResult<Program> {
        let input_fname = args
            .get_one::<String>("input")
            .ok_or_else(|| FwError::BadArguments("--input needed".to_string()))?;
        let program = fw_ir::open(input_fname)?;
        log::debug!(
            "{input_fname}: {} classes, {} methods",
            program.nb_classes(),
            program.nb_methods()
        );
        Ok(program)
    }

    /// Builds a method filter from the `--filter-class` and
    /// `--filter-method` regexes.
    pub fn method_filter(
        args: &ArgMatches,
    ) -> FwResult<impl Fn(&Program, MethodId) -> bool + Sync> {
        let class_pattern = args
            .get_one::<String>("filter-class")
            .map(|r| regex::Regex::new(r))
            .transpose()?;
        let method_pattern = args
            .get_one::<String>("filter-method")
            .map(|r| regex::Regex::new(r))
            .transpose()?;
        log::debug!(
            "filtering on class pattern {:?}, method pattern {:?}",
            class_pattern,
            method_pattern
        );
        Ok(move |program: &Program, id: MethodId| {
            let method = program.method(id);
            class_pattern
                .as_ref()
                .map_or(true, |r| r.is_match(program.class(method.class()).name()))
                && method_pattern
                    .as_ref()
                    .map_or(true, |r| r.is_match(method.name()))
        })
    }
}
