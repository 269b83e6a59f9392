use crate::prelude::*;
use clap::ArgMatches;
use fw_analysis::deadcode;
use nu_ansi_term::Color;
use rayon::prelude::*;

pub fn run(args: &ArgMatches) -> FwResult<()> {
    init_logger(args);

    let program = open_input(args)?;
    let filter = method_filter(args)?;
    let show_all = args.get_flag("all");

    let methods: Vec<MethodId> = program
        .iter_methods()
        .filter(|method| method.has_body() && filter(&program, method.id()))
        .map(Method::id)
        .collect();
    let results: Vec<_> = methods
        .par_iter()
        .map(|method| (*method, deadcode::detect(&program, *method)))
        .collect();

    let mut nb_dead = 0;
    let mut last_res = Ok(());
    for (method, res) in results {
        let dead = match res {
            Ok(dead) => dead,
            Err(err) => {
                log::error!("{}: {}", program.method_signature(method), err);
                last_res = Err(err.into());
                continue;
            }
        };
        if dead.is_empty() && !show_all {
            continue;
        }
        nb_dead += dead.len();
        println!("{}", program.method_signature(method));
        for (index, stmt) in program.method(method).stmts().iter().enumerate() {
            let line = format!("  {index:4}: {}", PrettyPrinter(stmt, &program));
            if dead.contains(&index) {
                println!("{}", Color::Red.paint(line));
            } else if show_all {
                println!("{line}");
            }
        }
    }

    log::info!("");
    log::info!(
        "{} dead statements in {} methods",
        nb_dead,
        methods.len()
    );
    last_res
}
