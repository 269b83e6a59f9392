use crate::prelude::*;
use clap::ArgMatches;
use serde::Serialize;
use std::fs::File;

#[derive(Debug, Serialize)]
struct VarReport {
    method: String,
    var: String,
    objs: Vec<String>,
}

#[derive(Debug, Serialize)]
struct PtaReport<'r> {
    stats: &'r pta::PtaStats,
    vars: Vec<VarReport>,
}

pub fn run(args: &ArgMatches) -> FwResult<()> {
    init_logger(args);

    let program = open_input(args)?;
    let hierarchy = Hierarchy::build(&program);
    let selector_name = args
        .get_one::<String>("selector")
        .ok_or_else(|| FwError::BadArguments("--selector needed".to_string()))?;
    let selector = pta::context::selector_from_str(selector_name)?;
    let result = pta::analyze(&hierarchy, selector.as_ref())?;
    let filter = method_filter(args)?;

    let stats = result.stats();
    log::info!(
        "{} pointer analysis done in {} iterations:",
        stats.selector,
        stats.iterations
    );
    log::info!(
        "    - {} reachable methods ({} with contexts)",
        result.reachable_methods().len(),
        stats.cs_methods
    );
    log::info!(
        "    - {} abstract objects ({} with contexts)",
        stats.objs,
        stats.cs_objs
    );
    log::info!("    - {} pointers, {} PFG edges", stats.pointers, stats.pfg_edges);

    let obj_name = |obj| {
        let obj = result.obj(obj);
        format!(
            "new {}@{}:{}",
            obj.ty,
            program.method_signature(obj.site.method),
            obj.site.index
        )
    };

    let mut vars = Vec::new();
    for method in result.reachable_methods() {
        if !filter(&program, method) {
            continue;
        }
        for var in program.method(method).vars() {
            let var = program.var(*var);
            if !var.ty().is_reference() {
                continue;
            }
            vars.push(VarReport {
                method: program.method_signature(method),
                var: var.name().to_string(),
                objs: result
                    .points_to_var(var.id())
                    .into_iter()
                    .map(obj_name)
                    .collect(),
            });
        }
    }

    match args.get_one::<String>("json") {
        Some(json_filename) => {
            let file = File::create(json_filename)?;
            serde_json::to_writer_pretty(file, &PtaReport { stats, vars })?;
            log::info!("JSON output written in {:?}", json_filename);
        }
        None => {
            for report in vars {
                println!(
                    "{} {} -> {{{}}}",
                    report.method,
                    report.var,
                    report.objs.join(", ")
                );
            }
        }
    }

    Ok(())
}
