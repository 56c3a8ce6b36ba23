//! The rewrite pipeline run on the foreign graph before lowering.
//!
//! Passes are order sensitive: each one assumes the previous ones ran.
use std::fmt::Debug;

use tessel_core::internal::*;

use crate::errors::ImportError;
use crate::graph::TfGraph;

mod array;
mod batch_norm;
mod fuse;
mod head;
mod trim;

pub use self::array::{
    AbsorbInputReshape, CleanupResize, ConcatAxis, FuseQueue, RemoveExpandDims, RemoveShapeSlice,
};
pub use self::batch_norm::FuseComposedBatchNorm;
pub use self::fuse::{FuseBiasAdd, FusePadConvAndMeanAxes, FuseReluMinimum};
pub use self::head::{ClassificationHead, ElideSqueezeIdentity};
pub use self::trim::Trim;

pub trait TfPass: Debug {
    fn name(&self) -> &'static str;
    /// Rewrites the graph, returning how many matches were rewritten.
    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize>;
}

#[derive(Debug)]
pub struct Optimizer {
    passes: Vec<Box<dyn TfPass>>,
    steps: Option<usize>,
}

impl Default for Optimizer {
    fn default() -> Optimizer {
        Optimizer::passes(vec![
            Box::new(ClassificationHead),
            Box::new(ElideSqueezeIdentity),
            Box::new(ConcatAxis),
            Box::new(FuseQueue),
            Box::new(RemoveExpandDims),
            Box::new(FuseBiasAdd),
            Box::new(FuseComposedBatchNorm),
            Box::new(CleanupResize),
            Box::new(FuseReluMinimum),
            Box::new(AbsorbInputReshape),
            Box::new(RemoveShapeSlice),
            Box::new(FusePadConvAndMeanAxes),
            Box::new(Trim),
        ])
    }
}

impl Optimizer {
    pub fn passes(passes: Vec<Box<dyn TfPass>>) -> Optimizer {
        Optimizer { passes, steps: None }
    }

    /// Only runs the first `steps` passes.
    pub fn stopping_at(self, steps: usize) -> Optimizer {
        Optimizer { steps: Some(steps), ..self }
    }

    pub fn pass_names(&self) -> Vec<&'static str> {
        self.passes.iter().map(|p| p.name()).collect()
    }

    pub fn optimize(&self, graph: &mut TfGraph) -> TesselResult<()> {
        graph.check_consistency()?;
        let steps = self.steps.unwrap_or(self.passes.len());
        for pass in self.passes.iter().take(steps) {
            let done = pass.run(graph).with_context(|| format!("Running pass {}", pass.name()))?;
            graph.compact();
            debug!("{}: {} rewrites, {} nodes left", pass.name(), done, graph.len());
            graph.check_consistency().with_context(|| format!("after pass {:?}", pass))?;
        }
        Ok(())
    }
}

/// Checks a pattern holds, naming the node when it does not.
pub(crate) fn expect(graph: &TfGraph, id: usize, cond: bool, expected: &str) -> TesselResult<()> {
    if cond {
        Ok(())
    } else {
        Err(ImportError::pattern(graph.name(id), expected).into())
    }
}

/// Nth input of a node, or a pattern error.
pub(crate) fn input(graph: &TfGraph, id: usize, ix: usize) -> TesselResult<usize> {
    graph.nodes[id].inputs.get(ix).copied().ok_or_else(|| {
        let node = &graph.nodes[id];
        ImportError::pattern(&*node.name, format!("{} with at least {} inputs", node.op, ix + 1))
            .into()
    })
}

/// Removes a node, then whatever neighbour it leaves isolated.
pub(crate) fn prune(graph: &mut TfGraph, id: usize) -> TesselResult<()> {
    let node = graph.node(id)?;
    let neighbours: Vec<usize> = node.inputs.iter().chain(node.outputs.iter()).copied().collect();
    graph.remove(id)?;
    for n in neighbours {
        graph.remove_if_isolated(n)?;
    }
    Ok(())
}

/// Detaches a constant operand: edge removed, record kept on `keeper`.
pub(crate) fn detach_const(
    graph: &mut TfGraph,
    konst: usize,
    from: usize,
    keeper: usize,
) -> TesselResult<()> {
    graph.remove_edge(konst, from)?;
    let def = graph.nodes[konst].def()?;
    graph.node_mut(keeper)?.defs.push(def);
    graph.remove_if_isolated(konst)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_pipeline_order() {
        assert_eq!(
            Optimizer::default().pass_names(),
            vec![
                "classification-head",
                "elide-squeeze-identity",
                "concat-axis",
                "fuse-queue",
                "remove-expand-dims",
                "fuse-bias-add",
                "fuse-composed-batch-norm",
                "cleanup-resize",
                "fuse-relu-minimum",
                "absorb-input-reshape",
                "remove-shape-slice",
                "fuse-pad-conv-and-mean-axes",
                "trim",
            ]
        );
    }
}
