use flowworks::prelude::FwResult;
use flowworks::{cli, fw_pta};

fn main() -> FwResult<()> {
    let args = cli::pta().get_matches();
    fw_pta::run(&args)
}
