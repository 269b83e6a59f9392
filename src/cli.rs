//! Main `FlowWorks` binary command line arguments options.
//!
//! This module declares a function to build `clap` command line arguments
//! parser, so that it can be used from other places than the main binary,
//! such as from bash completion file generator.

use clap::{value_parser, Arg, ArgAction, Command};
use clap_complete::Shell;

const NAME: &str = env!("CARGO_PKG_NAME");
const VERSION: &str = env!("CARGO_PKG_VERSION");
const AUTHORS: &str = env!("CARGO_PKG_AUTHORS");
const DESCRIPTION: &str = env!("CARGO_PKG_DESCRIPTION");

fn arg_debug() -> Arg {
    Arg::new("debug")
        .short('d')
        .long("debug")
        .action(ArgAction::SetTrue)
        .help("Activate debug mode")
}

fn arg_verbose() -> Arg {
    Arg::new("verbose")
        .short('v')
        .long("verbose")
        .action(ArgAction::SetTrue)
        .help("Activate verbose mode")
}

fn arg_ecslog() -> Arg {
    Arg::new("ecslog")
        .short('e')
        .long("ecslog")
        .action(ArgAction::SetTrue)
        .help("Output logs in ECS format")
}

fn arg_input() -> Arg {
    Arg::new("input")
        .short('i')
        .long("input")
        .action(ArgAction::Set)
        .required(true)
        .help("Input IR file")
}

fn arg_output(help: &str) -> Arg {
    Arg::new("output")
        .short('o')
        .long("output")
        .action(ArgAction::Set)
        .help(help.to_string())
}

fn arg_json(help: &str) -> Arg {
    Arg::new("json")
        .short('j')
        .long("json")
        .action(ArgAction::Set)
        .help(help.to_string())
}

fn arg_filter_class() -> Arg {
    Arg::new("filter-class")
        .long("filter-class")
        .action(ArgAction::Set)
        .help("Class(es) regex filter")
}

fn arg_filter_method() -> Arg {
    Arg::new("filter-method")
        .long("filter-method")
        .action(ArgAction::Set)
        .help("Method(s) regex filter")
}

fn arg_pta(help: &str) -> Arg {
    Arg::new("pta")
        .short('p')
        .long("pta")
        .action(ArgAction::Set)
        .value_name("SELECTOR")
        .help(help.to_string())
}

#[must_use]
pub fn flowworks() -> Command {
    Command::new(NAME)
        .version(VERSION)
        .author(AUTHORS)
        .about(DESCRIPTION)
        .subcommand(callgraph())
        .subcommand(constprop())
        .subcommand(deadcode())
        .subcommand(hierarchy())
        .subcommand(pta())
        .subcommand(
            Command::new("gen-completions")
                .about("Generates completions file")
                .arg(
                    Arg::new("shell")
                        .short('s')
                        .long("shell")
                        .action(ArgAction::Set)
                        .value_parser(value_parser!(Shell))
                        .required(true)
                        .help("Shell type for completion generation"),
                ),
        )
}

#[must_use]
pub fn callgraph() -> Command {
    Command::new("callgraph")
        .bin_name("fw-callgraph")
        .version(VERSION)
        .author(AUTHORS)
        .about("Generates program callgraph")
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(arg_output("Output dot file"))
        .arg(arg_json("Output JSON file listing the call edges"))
        .arg(arg_pta(
            "Build the callgraph with a pointer analysis (ci, <k>-call, <k>-obj) instead of CHA",
        ))
        .arg(arg_filter_class())
        .arg(arg_filter_method())
}

#[must_use]
pub fn constprop() -> Command {
    Command::new("constprop")
        .bin_name("fw-constprop")
        .version(VERSION)
        .author(AUTHORS)
        .about("Runs constant propagation and prints the facts after each statement")
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(arg_filter_class())
        .arg(arg_filter_method())
        .arg(
            Arg::new("inter")
                .long("inter")
                .action(ArgAction::SetTrue)
                .help("Run an interprocedural analysis (instead of one analysis per method)"),
        )
        .arg(
            arg_pta("Build the interprocedural CFG over a pointer analysis callgraph")
                .requires("inter"),
        )
}

#[must_use]
pub fn deadcode() -> Command {
    Command::new("deadcode")
        .bin_name("fw-deadcode")
        .version(VERSION)
        .author(AUTHORS)
        .about("Detects unreachable code and dead assignments")
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(arg_filter_class())
        .arg(arg_filter_method())
        .arg(
            Arg::new("all")
                .short('a')
                .long("all")
                .action(ArgAction::SetTrue)
                .help("Print every statement, dead ones being highlighted"),
        )
}

#[must_use]
pub fn hierarchy() -> Command {
    Command::new("hierarchy")
        .bin_name("fw-hierarchy")
        .version(VERSION)
        .author(AUTHORS)
        .about("Generates classes hierarchy graph")
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(arg_output("Output dot file"))
}

#[must_use]
pub fn pta() -> Command {
    Command::new("pta")
        .bin_name("fw-pta")
        .version(VERSION)
        .author(AUTHORS)
        .about("Runs a pointer analysis and prints the points-to sets of variables")
        .arg(arg_debug())
        .arg(arg_verbose())
        .arg(arg_ecslog())
        .arg(arg_input())
        .arg(arg_json("Output JSON file"))
        .arg(arg_filter_class())
        .arg(arg_filter_method())
        .arg(
            Arg::new("selector")
                .short('s')
                .long("selector")
                .action(ArgAction::Set)
                .default_value("ci")
                .help("Context sensitivity: ci, <k>-call or <k>-obj"),
        )
}
