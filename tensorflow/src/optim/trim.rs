use std::collections::VecDeque;

use tessel_core::internal::*;

use super::{TfPass, prune};
use crate::graph::TfGraph;

/// Ops allowed to have no producer.
const SOURCES: &[&str] = &["Const", "Placeholder", "FIFOQueueV2"];

/// Last cleanup: the arg max and dangling squeeze of classifiers, dangling
/// nodes, then whatever computation lost all of its producers.
#[derive(Clone, Debug, Default)]
pub struct Trim;

impl Trim {
    fn remove_isolated(graph: &mut TfGraph) -> TesselResult<usize> {
        let mut done = 0;
        for id in graph.live_ids() {
            if graph.remove_if_isolated(id)? {
                done += 1;
            }
        }
        Ok(done)
    }

    fn is_orphan(graph: &TfGraph, id: usize) -> bool {
        let node = &graph.nodes[id];
        !node.removed && node.inputs.is_empty() && !SOURCES.contains(&&*node.op)
    }
}

impl TfPass for Trim {
    fn name(&self) -> &'static str {
        "trim"
    }

    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize> {
        let mut done = 0;
        let arg_max = graph.live().find(|n| n.op == "ArgMax").map(|n| n.id);
        if let Some(arg_max) = arg_max {
            prune(graph, arg_max)?;
            done += 1;
        }
        let squeeze =
            graph.live().find(|n| n.op == "Squeeze" && n.outputs.is_empty()).map(|n| n.id);
        if let Some(squeeze) = squeeze {
            prune(graph, squeeze)?;
            done += 1;
        }
        done += Self::remove_isolated(graph)?;

        let mut work: VecDeque<usize> =
            graph.live_ids().into_iter().filter(|&id| Self::is_orphan(graph, id)).collect();
        while let Some(id) = work.pop_front() {
            if !Self::is_orphan(graph, id) {
                continue;
            }
            let consumers = graph.nodes[id].outputs.clone();
            debug!("Trimming {}, it has no producer", graph.nodes[id]);
            graph.remove(id)?;
            done += 1;
            work.extend(consumers);
        }

        done += Self::remove_isolated(graph)?;
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::tfpb::*;

    #[test]
    fn arg_max_and_orphans() {
        let g = graph()
            .node(node().name("x").op("Placeholder"))
            .node(node().name("prob").op("Softmax").input("x"))
            .node(konst("dim", tensor_i32(&[], vec![1])))
            .node(node().name("best").op("ArgMax").input("prob").input("dim"))
            .node(node().name("seed").op("RandomUniform"))
            .node(node().name("noise").op("Mul").input("seed").input("seed"))
            .node(node().name("noisy").op("Relu").input("noise"))
            .node(konst("lost", tensor_f32(&[], vec![0.0])));
        let mut tf = build_graph(&g).unwrap();
        Trim.run(&mut tf).unwrap();
        tf.compact();
        tf.check_consistency().unwrap();
        let names: Vec<&str> = tf.live().map(|n| &*n.name).collect();
        assert_eq!(names, vec!["x", "prob"]);
    }

    #[test]
    fn dangling_squeeze() {
        let g = graph()
            .node(node().name("x").op("Placeholder"))
            .node(node().name("prob").op("Softmax").input("x"))
            .node(node().name("sq").op("Squeeze").input("prob"));
        let mut tf = build_graph(&g).unwrap();
        assert!(Trim.run(&mut tf).unwrap() >= 1);
        tf.compact();
        tf.check_consistency().unwrap();
        let names: Vec<&str> = tf.live().map(|n| &*n.name).collect();
        assert_eq!(names, vec!["x", "prob"]);
    }

    #[test]
    fn sources_stay() {
        let g = graph()
            .node(node().name("q").op("FIFOQueueV2"))
            .node(node().name("x").op("Placeholder"))
            .node(node().name("sum").op("Add").input("q").input("x"));
        let mut tf = build_graph(&g).unwrap();
        assert_eq!(Trim.run(&mut tf).unwrap(), 0);
        assert_eq!(tf.len(), 3);
    }
}
