use flowworks::prelude::FwResult;
use flowworks::{cli, fw_hierarchy};

fn main() -> FwResult<()> {
    let args = cli::hierarchy().get_matches();
    fw_hierarchy::run(&args)
}
