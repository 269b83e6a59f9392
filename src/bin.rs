use clap::ArgMatches;
use clap_complete::{generate, Shell};
use flowworks::prelude::*;
use flowworks::{cli, fw_callgraph, fw_constprop, fw_deadcode, fw_hierarchy, fw_pta};
use std::io;

fn main() -> FwResult<()> {
    let args = cli::flowworks().get_matches();

    match &args.subcommand() {
        Some(("callgraph", cmd_args)) => fw_callgraph::run(cmd_args),
        Some(("constprop", cmd_args)) => fw_constprop::run(cmd_args),
        Some(("deadcode", cmd_args)) => fw_deadcode::run(cmd_args),
        Some(("hierarchy", cmd_args)) => fw_hierarchy::run(cmd_args),
        Some(("pta", cmd_args)) => fw_pta::run(cmd_args),
        Some(("gen-completions", sub_args)) => subcommand_gen_completions(sub_args),
        Some((subcommand, _)) => Err(FwError::BadArguments(format!(
            "unknown subcommand '{subcommand}'"
        ))),
        None => Err(FwError::BadArguments("missing subcommand".to_string())),
    }
}

fn subcommand_gen_completions(sub_args: &ArgMatches) -> FwResult<()> {
    let generator = *sub_args
        .get_one::<Shell>("shell")
        .ok_or_else(|| FwError::BadArguments("--shell needed".to_string()))?;
    let mut cmd = cli::flowworks();
    let cmd_name = cmd.get_name().to_string();
    generate(generator, &mut cmd, cmd_name, &mut io::stdout());
    Ok(())
}
