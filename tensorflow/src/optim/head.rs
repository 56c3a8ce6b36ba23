use tessel_core::internal::*;

use super::{TfPass, expect, input, prune};
use crate::graph::TfGraph;

/// Splices out the reshapes TensorFlow puts around classification heads.
#[derive(Clone, Debug, Default)]
pub struct ClassificationHead;

impl TfPass for ClassificationHead {
    fn name(&self) -> &'static str {
        "classification-head"
    }

    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize> {
        let mut done = 0;
        for id in graph.live_ids() {
            if graph.nodes[id].removed || graph.nodes[id].op != "Reshape" {
                continue;
            }
            let (in0, in1) = (input(graph, id, 0)?, input(graph, id, 1)?);
            if graph.op(in0) == "Softmax" || graph.op(in1) == "Softmax" {
                debug!("Dropping {} after softmax", graph.nodes[id]);
                prune(graph, id)?;
                done += 1;
                continue;
            }
            let consumers = &graph.nodes[id].outputs;
            if consumers.len() != 1 || !["Softmax", "MatMul"].contains(&graph.op(consumers[0])) {
                continue;
            }
            let (konst, data) = if graph.op(in0) == "Const" { (in0, in1) } else { (in1, in0) };
            expect(graph, id, graph.op(konst) == "Const", "a constant target shape")?;
            graph.remove_edge(konst, id)?;
            graph.remove_if_isolated(konst)?;
            graph.merge_child(data, id)?;
            graph.remove(id)?;
            debug!("Spliced reshape out, {} feeds the head", graph.nodes[data]);
            done += 1;
        }
        Ok(done)
    }
}

/// Identity nodes merge into their producer, Squeeze nodes into their
/// neighbours.
#[derive(Clone, Debug, Default)]
pub struct ElideSqueezeIdentity;

impl TfPass for ElideSqueezeIdentity {
    fn name(&self) -> &'static str {
        "elide-squeeze-identity"
    }

    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize> {
        let mut done = 0;
        for id in graph.live_ids() {
            if graph.nodes[id].removed {
                continue;
            }
            let op = graph.nodes[id].op.clone();
            match &*op {
                "Identity" => {
                    let parent = input(graph, id, 0)?;
                    graph.merge_child(parent, id)?;
                    graph.remove(id)?;
                }
                "Squeeze" => {
                    let outputs = graph.nodes[id].outputs.clone();
                    let softmax = outputs.iter().copied().find(|&o| graph.op(o) == "Softmax");
                    let shape = outputs.iter().copied().find(|&o| graph.op(o) == "Shape");
                    if softmax.is_some() {
                        if let Some(shape) = shape {
                            prune(graph, shape)?;
                        }
                        let parent = input(graph, id, 0)?;
                        graph.merge_child(parent, id)?;
                    } else if outputs.len() == 1 {
                        let child = outputs[0];
                        graph.merge_parent_in_place(child, id)?;
                    } else {
                        continue;
                    }
                    graph.remove(id)?;
                }
                _ => continue,
            }
            done += 1;
        }
        Ok(done)
    }
}
