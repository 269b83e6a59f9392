use flowworks::prelude::FwResult;
use flowworks::{cli, fw_constprop};

fn main() -> FwResult<()> {
    let args = cli::constprop().get_matches();
    fw_constprop::run(&args)
}
