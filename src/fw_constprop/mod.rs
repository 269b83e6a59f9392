use crate::prelude::*;
use clap::ArgMatches;
use fw_analysis::cha::Cha;
use fw_analysis::controlflow::CfgNode;
use fw_analysis::dataflow::{CpFact, Dataflow};
use fw_analysis::errors::AnalysisResult;
use fw_analysis::icfg::{Icfg, IcfgNode};
use fw_analysis::inter::constprop::InterConstantPropagation;
use rayon::prelude::*;

pub fn run(args: &ArgMatches) -> FwResult<()> {
    init_logger(args);

    let program = open_input(args)?;
    let filter = method_filter(args)?;

    if args.get_flag("inter") {
        return run_inter(args, &program, filter);
    }

    let methods: Vec<MethodId> = program
        .iter_methods()
        .filter(|method| method.has_body() && filter(&program, method.id()))
        .map(Method::id)
        .collect();
    let results: Vec<_> = methods
        .par_iter()
        .map(|method| (*method, fw_analysis::constant_propagation(&program, *method)))
        .collect();

    report_methods(&program, results)
}

// prints the facts of the analyzed methods, failing if any method failed
fn report_methods(
    program: &Program,
    results: Vec<(MethodId, AnalysisResult<Dataflow<CfgNode, CpFact>>)>,
) -> FwResult<()> {
    let nb_methods = results.len();
    let mut nb_fails = 0;
    let mut last_res = Ok(());
    for (method, res) in results {
        match res {
            Ok(res) => print_method(program, method, |index| {
                res.out_fact(&CfgNode::Stmt(index))
            }),
            Err(err) => {
                log::error!("{}: {}", program.method_signature(method), err);
                nb_fails += 1;
                last_res = Err(err.into());
            }
        }
    }
    log::info!("analyzed methods: {} / {}", nb_methods - nb_fails, nb_methods);
    last_res
}

fn run_inter<F>(args: &ArgMatches, program: &Program, filter: F) -> FwResult<()>
where
    F: Fn(&Program, MethodId) -> bool,
{
    let hierarchy = Hierarchy::build(program);
    let cg = match args.get_one::<String>("pta") {
        Some(selector) => {
            let selector = pta::context::selector_from_str(selector)?;
            pta::analyze(&hierarchy, selector.as_ref())?.ci_call_graph()
        }
        None => Cha::new(&hierarchy).build_call_graph()?,
    };
    let icfg = Icfg::build(program, &cg);
    log::info!(
        "interprocedural CFG over {} methods, {} nodes",
        icfg.methods().count(),
        icfg.nb_nodes()
    );
    let res: Dataflow<IcfgNode, CpFact> =
        InterConstantPropagation::new(program).analyze_icfg(&icfg);

    for method in icfg.methods().filter(|method| filter(program, *method)) {
        print_method(program, method, |index| {
            res.out_fact(&IcfgNode {
                method,
                node: CfgNode::Stmt(index),
            })
        });
    }
    Ok(())
}

fn print_method<'f, G>(program: &Program, method: MethodId, fact_of: G)
where
    G: Fn(usize) -> Option<&'f CpFact>,
{
    println!("{}", program.method_signature(method));
    for (index, stmt) in program.method(method).stmts().iter().enumerate() {
        let fact: Vec<String> = fact_of(index)
            .into_iter()
            .flat_map(|fact| fact.iter())
            .map(|(var, value)| format!("{}={value}", program.var(var).name()))
            .collect();
        let stmt = PrettyPrinter(stmt, program).to_string();
        println!("  {index:4}: {stmt:<40} {{{}}}", fact.join(", "));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use fw_analysis::errors::AnalysisError;

    #[test]
    fn failed_methods_fail_the_run() {
        let program =
            fw_ir::parse("class Main { static method main() : void { return; } }").unwrap();
        let main = program.find_method("Main", "main").unwrap();

        let results = vec![(main, fw_analysis::constant_propagation(&program, main))];
        assert!(report_methods(&program, results).is_ok());

        let results = vec![
            (main, Err(AnalysisError::NoCode)),
            (main, fw_analysis::constant_propagation(&program, main)),
        ];
        assert!(matches!(
            report_methods(&program, results),
            Err(FwError::Analysis(AnalysisError::NoCode))
        ));
    }
}
