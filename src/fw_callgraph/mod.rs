use crate::prelude::*;
use clap::ArgMatches;
use fw_analysis::cha::Cha;
use serde::Serialize;
use std::fs::File;
use std::io::Write;

#[derive(Debug, Serialize)]
struct CallEdgeReport {
    kind: String,
    caller: String,
    call_site: usize,
    callee: String,
}

pub fn run(args: &ArgMatches) -> FwResult<()> {
    init_logger(args);

    let program = open_input(args)?;
    let hierarchy = Hierarchy::build(&program);

    let cg = match args.get_one::<String>("pta") {
        Some(selector) => {
            let selector = pta::context::selector_from_str(selector)?;
            let result = pta::analyze(&hierarchy, selector.as_ref())?;
            log::info!(
                "{} pointer analysis: {} contexts, {} context sensitive methods",
                result.stats().selector,
                result.stats().contexts,
                result.stats().cs_methods
            );
            result.ci_call_graph()
        }
        None => Cha::new(&hierarchy).build_call_graph()?,
    };

    let cg = if args.contains_id("filter-class") || args.contains_id("filter-method") {
        let filter = method_filter(args)?;
        cg.filter(|method| filter(&program, method))
    } else {
        cg
    };

    log::info!("callgraph contains {} methods with:", cg.nb_reachable_methods());
    log::info!("    - {} call sites", cg.nb_call_sites());
    log::info!("    - {} call edges", cg.nb_edges());

    if let Some(dot_filename) = args.get_one::<String>("output") {
        let mut file = File::create(dot_filename)?;
        file.write_all(cg.to_dot(|method| program.method_signature(method)).as_bytes())?;
        log::info!("dot output written in {:?}", dot_filename);
    }

    if let Some(json_filename) = args.get_one::<String>("json") {
        let edges: Vec<CallEdgeReport> = cg
            .edges()
            .map(|edge| CallEdgeReport {
                kind: edge.kind.to_string(),
                caller: program.method_signature(edge.call_site.method),
                call_site: edge.call_site.index,
                callee: program.method_signature(edge.callee),
            })
            .collect();
        let file = File::create(json_filename)?;
        serde_json::to_writer_pretty(file, &edges)?;
        log::info!("JSON output written in {:?}", json_filename);
    }

    Ok(())
}
