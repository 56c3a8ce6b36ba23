use tessel_core::internal::*;

use super::{TfPass, detach_const, input};
use crate::graph::TfGraph;

const CONVS: &[&str] = &["Conv2D", "DepthwiseConv2dNative"];

/// Lets convolutions and matrix products absorb the bias add following them.
#[derive(Clone, Debug, Default)]
pub struct FuseBiasAdd;

impl FuseBiasAdd {
    fn bias_consumer(graph: &TfGraph, id: usize) -> Option<usize> {
        let node = &graph.nodes[id];
        let &[consumer] = &*node.outputs else { return None };
        let add = &graph.nodes[consumer];
        match &*add.op {
            "BiasAdd" => Some(consumer),
            "Add" => {
                let mut others = add.inputs.iter().filter(|&&i| i != id);
                match (others.next(), others.next()) {
                    (Some(&bias), None) if graph.op(bias) == "Const" => Some(consumer),
                    _ => None,
                }
            }
            _ => None,
        }
    }
}

impl TfPass for FuseBiasAdd {
    fn name(&self) -> &'static str {
        "fuse-bias-add"
    }

    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize> {
        let mut done = 0;
        for id in graph.live_ids() {
            let op = &*graph.nodes[id].op;
            if !CONVS.contains(&op) && op != "MatMul" {
                continue;
            }
            if let Some(add) = Self::bias_consumer(graph, id) {
                graph.merge_child(id, add)?;
                graph.remove(add)?;
                debug!("Fused bias into {}", graph.nodes[id]);
                done += 1;
            }
        }
        Ok(done)
    }
}

/// `Minimum(Relu(x), 6)` becomes `Relu6(x)`.
#[derive(Clone, Debug, Default)]
pub struct FuseReluMinimum;

impl TfPass for FuseReluMinimum {
    fn name(&self) -> &'static str {
        "fuse-relu-minimum"
    }

    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize> {
        let mut done = 0;
        for id in graph.live_ids() {
            let node = &graph.nodes[id];
            if node.removed || node.op != "Minimum" {
                continue;
            }
            let Some(&relu) = node.inputs.first() else { continue };
            // other consumers of the relu must still see it unbounded
            if graph.op(relu) != "Relu" || graph.nodes[relu].outputs.len() > 1 {
                continue;
            }
            let bound = input(graph, id, 1)?;
            if graph.op(bound) != "Const" {
                continue;
            }
            graph.remove_edge(bound, id)?;
            graph.merge_child(relu, id)?;
            let def = graph.nodes[bound].def()?;
            graph.nodes[relu].defs.push(def);
            graph.nodes[relu].op = "Relu6".to_string();
            graph.remove(id)?;
            graph.remove_if_isolated(bound)?;
            debug!("Bounded {}", graph.nodes[relu]);
            done += 1;
        }
        Ok(done)
    }
}

/// Explicit `Pad` before a convolution becomes the convolution's padding.
/// `Mean` keeps its reduction axes as a definition instead of an input.
#[derive(Clone, Debug, Default)]
pub struct FusePadConvAndMeanAxes;

impl TfPass for FusePadConvAndMeanAxes {
    fn name(&self) -> &'static str {
        "fuse-pad-conv-and-mean-axes"
    }

    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize> {
        let mut done = 0;
        for id in graph.live_ids() {
            let node = &graph.nodes[id];
            if node.removed {
                continue;
            }
            if CONVS.contains(&&*node.op) {
                let Some(&pad) = node.inputs.first() else { continue };
                if graph.op(pad) != "Pad" {
                    continue;
                }
                let paddings = input(graph, pad, 1)?;
                detach_const(graph, paddings, pad, pad)?;
                graph.merge_parent_in_place(id, pad)?;
                graph.remove(pad)?;
                debug!("Fused explicit padding into {}", graph.nodes[id]);
                done += 1;
            } else if node.op == "Mean" {
                let axes = input(graph, id, 1)?;
                detach_const(graph, axes, id, id)?;
                done += 1;
            }
        }
        Ok(done)
    }
}
