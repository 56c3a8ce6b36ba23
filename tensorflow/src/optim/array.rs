use tessel_core::internal::*;

use super::{TfPass, detach_const, expect, input, prune};
use crate::graph::TfGraph;

fn of_op(graph: &TfGraph, op: &str) -> Vec<usize> {
    graph.live().filter(|n| n.op == op).map(|n| n.id).collect()
}

/// Moves the trailing axis operand of `ConcatV2` into its definitions.
#[derive(Clone, Debug, Default)]
pub struct ConcatAxis;

impl TfPass for ConcatAxis {
    fn name(&self) -> &'static str {
        "concat-axis"
    }

    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize> {
        let concats = of_op(graph, "ConcatV2");
        for &id in &concats {
            let axis = graph.nodes[id].inputs.last().copied();
            let axis = axis.filter(|&a| graph.op(a) == "Const");
            expect(graph, id, axis.is_some(), "a constant axis as last input")?;
            if let Some(axis) = axis {
                detach_const(graph, axis, id, id)?;
            }
        }
        Ok(concats.len())
    }
}

/// Folds the first queue and its batch dequeue into a single source node.
#[derive(Clone, Debug, Default)]
pub struct FuseQueue;

impl TfPass for FuseQueue {
    fn name(&self) -> &'static str {
        "fuse-queue"
    }

    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize> {
        let Some(&queue) = of_op(graph, "FIFOQueueV2").first() else { return Ok(0) };
        let Some(&dequeue) = graph.nodes[queue].outputs.first() else { return Ok(0) };
        if graph.op(dequeue) != "QueueDequeueManyV2" {
            return Ok(0);
        }
        let batch = input(graph, dequeue, 1)?;
        graph.merge_parent(dequeue, batch)?;
        graph.remove_if_isolated(batch)?;
        graph.merge_child(queue, dequeue)?;
        graph.remove(dequeue)?;
        debug!("{} now dequeues batches itself", graph.nodes[queue]);
        Ok(1)
    }
}

/// Drops `ExpandDims`, the engine shapes being static.
#[derive(Clone, Debug, Default)]
pub struct RemoveExpandDims;

impl TfPass for RemoveExpandDims {
    fn name(&self) -> &'static str {
        "remove-expand-dims"
    }

    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize> {
        let expands = of_op(graph, "ExpandDims");
        for &id in &expands {
            let outputs = &graph.nodes[id].outputs;
            expect(graph, id, outputs.len() == 1, "exactly one consumer")?;
            let consumer = outputs[0];
            let (data, axis) = (input(graph, id, 0)?, input(graph, id, 1)?);
            if graph.op(data) == "Const" && graph.op(axis) == "Const" {
                let slot =
                    graph.nodes[consumer].inputs.iter().position(|&i| i == id).unwrap_or_default();
                graph.remove_edge(data, id)?;
                graph.insert_edge(data, consumer, slot)?;
                prune(graph, id)?;
            } else {
                let (data, axis) =
                    if graph.op(data) == "Const" { (axis, data) } else { (data, axis) };
                graph.remove_edge(axis, id)?;
                graph.remove_if_isolated(axis)?;
                expect(graph, id, graph.nodes[id].inputs == [data], "a single data input")?;
                graph.merge_parent_in_place(consumer, id)?;
                graph.remove(id)?;
            }
        }
        Ok(expands.len())
    }
}

/// Cuts the dynamic size computation off `ResizeNearestNeighbor`, keeping
/// the constant scale factor as its last definition.
#[derive(Clone, Debug, Default)]
pub struct CleanupResize;

impl TfPass for CleanupResize {
    fn name(&self) -> &'static str {
        "cleanup-resize"
    }

    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize> {
        let resizes = of_op(graph, "ResizeNearestNeighbor");
        for &id in &resizes {
            let data = input(graph, id, 0)?;
            let size = input(graph, id, 1)?;
            let shape = graph.nodes[data].outputs.iter().copied().find(|&o| graph.op(o) == "Shape");
            if let Some(shape) = shape {
                prune(graph, shape)?;
            }
            if graph.op(size) != "Mul" {
                continue;
            }
            let mul_inputs = graph.nodes[size].inputs.clone();
            if let Some(&factor) = mul_inputs.iter().find(|&&i| graph.op(i) == "Const") {
                let def = graph.nodes[factor].def()?;
                graph.nodes[id].defs.push(def);
            }
            if let Some(&slice) = mul_inputs.first() {
                if graph.op(slice) == "StridedSlice" {
                    prune(graph, slice)?;
                }
            }
            prune(graph, size)?;
        }
        Ok(resizes.len())
    }
}

/// A placeholder immediately reshaped takes the reshape's target shape.
#[derive(Clone, Debug, Default)]
pub struct AbsorbInputReshape;

impl TfPass for AbsorbInputReshape {
    fn name(&self) -> &'static str {
        "absorb-input-reshape"
    }

    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize> {
        let mut done = 0;
        for id in of_op(graph, "Reshape") {
            let (in0, in1) = (input(graph, id, 0)?, input(graph, id, 1)?);
            let (placeholder, konst) = match (graph.op(in0), graph.op(in1)) {
                ("Placeholder", "Const") => (in0, in1),
                ("Const", "Placeholder") => (in1, in0),
                _ => continue,
            };
            graph.remove_edge(konst, id)?;
            graph.merge_child(placeholder, id)?;
            let def = graph.nodes[konst].def()?;
            graph.nodes[placeholder].defs.push(def);
            graph.remove(id)?;
            graph.remove_if_isolated(konst)?;
            done += 1;
        }
        Ok(done)
    }
}

/// Drops `StridedSlice(Shape(..))` helpers.
#[derive(Clone, Debug, Default)]
pub struct RemoveShapeSlice;

impl TfPass for RemoveShapeSlice {
    fn name(&self) -> &'static str {
        "remove-shape-slice"
    }

    fn run(&self, graph: &mut TfGraph) -> TesselResult<usize> {
        let mut done = 0;
        for id in of_op(graph, "StridedSlice") {
            if graph.nodes[id].removed {
                continue;
            }
            let Some(&shape) = graph.nodes[id].inputs.first() else { continue };
            if graph.op(shape) != "Shape" {
                continue;
            }
            prune(graph, id)?;
            if !graph.nodes[shape].removed {
                prune(graph, shape)?;
            }
            done += 1;
        }
        Ok(done)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::graph::build_graph;
    use crate::tfpb::*;

    #[test]
    fn concat_axis_becomes_a_def() {
        let g = graph()
            .node(node().name("a").op("Placeholder"))
            .node(node().name("b").op("Placeholder"))
            .node(konst("axis", tensor_i32(&[], vec![3])))
            .node(node().name("cat").op("ConcatV2").input("a").input("b").input("axis"));
        let mut tf = build_graph(&g).unwrap();
        ConcatAxis.run(&mut tf).unwrap();
        tf.check_consistency().unwrap();
        let cat = &tf.nodes[3];
        assert_eq!(cat.inputs, vec![0, 1]);
        assert_eq!(cat.last_def().unwrap().name, "axis");
        assert!(tf.nodes[2].removed);
    }

    #[test]
    fn concat_without_const_axis() {
        let g = graph()
            .node(node().name("a").op("Placeholder"))
            .node(node().name("cat").op("ConcatV2").input("a").input("a"));
        let mut tf = build_graph(&g).unwrap();
        assert!(ConcatAxis.run(&mut tf).is_err());
    }

    #[test]
    fn expand_dims_is_merged_in_place() {
        let g = graph()
            .node(node().name("x").op("Placeholder"))
            .node(konst("axis", tensor_i32(&[], vec![0])))
            .node(node().name("e").op("ExpandDims").input("x").input("axis"))
            .node(konst("w", tensor_f32(&[1], vec![1.0])))
            .node(node().name("add").op("Add").input("w").input("e"));
        let mut tf = build_graph(&g).unwrap();
        assert_eq!(RemoveExpandDims.run(&mut tf).unwrap(), 1);
        tf.check_consistency().unwrap();
        assert_eq!(tf.nodes[4].inputs, vec![3, 0]);
        assert!(tf.nodes[1].removed && tf.nodes[2].removed);
    }

    #[test]
    fn expand_dims_of_constants() {
        let g = graph()
            .node(konst("k", tensor_f32(&[2], vec![1.0, 2.0])))
            .node(konst("axis", tensor_i32(&[], vec![0])))
            .node(node().name("e").op("ExpandDims").input("k").input("axis"))
            .node(node().name("x").op("Placeholder"))
            .node(node().name("mul").op("Mul").input("x").input("e"));
        let mut tf = build_graph(&g).unwrap();
        RemoveExpandDims.run(&mut tf).unwrap();
        tf.check_consistency().unwrap();
        assert_eq!(tf.nodes[4].inputs, vec![3, 0]);
        assert_eq!(tf.nodes[4].defs.len(), 1);
        assert!(tf.nodes[2].removed);
    }

    #[test]
    fn resize_helpers_are_cut() {
        let g = graph()
            .node(node().name("x").op("Placeholder"))
            .node(node().name("shape").op("Shape").input("x"))
            .node(konst("begin", tensor_i32(&[1], vec![1])))
            .node(node().name("slice").op("StridedSlice").input("shape").input("begin"))
            .node(konst("factor", tensor_i32(&[2], vec![3, 3])))
            .node(node().name("mul").op("Mul").input("slice").input("factor"))
            .node(node().name("up").op("ResizeNearestNeighbor").input("x").input("mul"));
        let mut tf = build_graph(&g).unwrap();
        CleanupResize.run(&mut tf).unwrap();
        tf.compact();
        tf.check_consistency().unwrap();
        let names: Vec<&str> = tf.live().map(|n| &*n.name).collect();
        assert_eq!(names, vec!["x", "up"]);
        assert_eq!(tf.nodes[6].inputs, vec![0]);
        assert_eq!(tf.nodes[6].last_def().unwrap().name, "factor");
    }

    #[test]
    fn input_reshape_is_absorbed() {
        let g = graph()
            .node(node().name("x").op("Placeholder"))
            .node(konst("dims", tensor_i32(&[4], vec![1, 28, 28, 1])))
            .node(node().name("r").op("Reshape").input("x").input("dims"))
            .node(node().name("c").op("Conv2D").input("r"));
        let mut tf = build_graph(&g).unwrap();
        assert_eq!(AbsorbInputReshape.run(&mut tf).unwrap(), 1);
        tf.check_consistency().unwrap();
        assert_eq!(tf.nodes[0].outputs, vec![3]);
        assert_eq!(tf.nodes[0].last_def().unwrap().name, "dims");
        assert!(tf.nodes[1].removed && tf.nodes[2].removed);
    }

    #[test]
    fn shape_slice_helper_is_dropped() {
        let g = graph()
            .node(node().name("x").op("Placeholder"))
            .node(node().name("shp").op("Shape").input("x"))
            .node(konst("begin", tensor_i32(&[1], vec![1])))
            .node(node().name("sl").op("StridedSlice").input("shp").input("begin"))
            .node(node().name("relu").op("Relu").input("x"));
        let mut tf = build_graph(&g).unwrap();
        assert_eq!(RemoveShapeSlice.run(&mut tf).unwrap(), 1);
        tf.compact();
        tf.check_consistency().unwrap();
        let names: Vec<&str> = tf.live().map(|n| &*n.name).collect();
        assert_eq!(names, vec!["x", "relu"]);
        assert_eq!(tf.nodes[0].outputs, vec![4]);
    }
}
