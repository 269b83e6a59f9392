use crate::prelude::*;
use clap::ArgMatches;
use std::fs::File;
use std::io::Write;

pub fn run(args: &ArgMatches) -> FwResult<()> {
    init_logger(args);

    let program = open_input(args)?;
    let hierarchy = Hierarchy::build(&program);
    let nb_interfaces = program
        .iter_classes()
        .filter(|class| class.is_interface())
        .count();
    log::info!(
        "hierarchy contains {} classes and {} interfaces",
        program.nb_classes() - nb_interfaces,
        nb_interfaces
    );

    if let Some(dot_filename) = args.get_one::<String>("output") {
        let mut file = File::create(dot_filename)?;
        file.write_all(hierarchy.to_dot().as_bytes())?;
        log::info!("dot output written in {:?}", dot_filename);
    }
    Ok(())
}
