use flowworks::prelude::FwResult;
use flowworks::{cli, fw_callgraph};

fn main() -> FwResult<()> {
    let args = cli::callgraph().get_matches();
    fw_callgraph::run(&args)
}
