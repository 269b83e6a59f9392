//! This crate provides the whole program analysis algorithms of the
//! `FlowWorks` project: class hierarchy analysis, intra and
//! interprocedural dataflow analysis, and context sensitive pointer
//! analysis with on-the-fly call graph construction.

pub mod callgraph;
pub mod cha;
pub mod constprop;
pub mod controlflow;
pub mod dataflow;
pub mod deadcode;
pub mod errors;
pub mod hierarchy;
pub mod icfg;
pub mod inter;
pub mod livevar;
pub mod pta;

use crate::controlflow::CfgNode;
use crate::dataflow::{CpFact, Dataflow};
use crate::errors::AnalysisResult;
use fw_ir::{MethodId, Program};

pub fn constant_propagation(
    program: &Program,
    method: MethodId,
) -> AnalysisResult<Dataflow<CfgNode, CpFact>> {
    constprop::ConstantPropagation::new(program).analyze(method)
}
