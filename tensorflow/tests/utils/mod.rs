#![allow(dead_code)]
use tessel_tensorflow::prelude::*;
use tessel_tensorflow::tfpb::tensorflow::GraphDef;

pub fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("TESSEL_LOG").is_test(true).try_init();
}

pub fn import(graph_def: &GraphDef) -> TesselResult<StaticGraph> {
    setup_test_logger();
    tensorflow().model_for_graph_def(graph_def)
}

/// Names of the tensors a target node consumes, in order.
pub fn input_names<'m>(model: &'m StaticGraph, node: &str) -> Vec<&'m str> {
    let node = model.node_by_name(node).unwrap();
    node.inputs.iter().map(|&t| &*model.tensors[t].name).collect()
}

pub fn op_of(model: &StaticGraph, node: &str) -> StaticOp {
    model.node_by_name(node).unwrap().op.clone().unwrap()
}

/// Live foreign nodes as `(name, op, input names)`.
pub fn snapshot(graph: &TfGraph) -> Vec<(String, String, Vec<String>)> {
    graph
        .live()
        .map(|n| {
            let inputs = n.inputs.iter().map(|&i| graph.name(i).to_string()).collect();
            (n.name.clone(), n.op.clone(), inputs)
        })
        .collect()
}
