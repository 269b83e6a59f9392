use flowworks::prelude::FwResult;
use flowworks::{cli, fw_deadcode};

fn main() -> FwResult<()> {
    let args = cli::deadcode().get_matches();
    fw_deadcode::run(&args)
}
