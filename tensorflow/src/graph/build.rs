use tessel_core::internal::*;

use super::TfGraph;
use crate::errors::ImportError;
use crate::tfpb::tensorflow::GraphDef;

/// Name of the node an input reference points at.
///
/// From the node_def.proto documentation: each input is "node:src_output",
/// the ":0" suffix being optional, and control inputs have the format
/// "^node". Both the marker and the output index are dropped here.
pub fn referenced_name(reference: &str) -> &str {
    let name = reference.strip_prefix('^').unwrap_or(reference);
    name.split(':').next().unwrap_or(name)
}

/// One node per record, one edge per input reference.
pub fn build_graph(graph_def: &GraphDef) -> TesselResult<TfGraph<'_>> {
    let mut graph = TfGraph::default();
    let mut by_name = HashMap::<&str, usize>::new();
    for (idx, pbnode) in graph_def.node.iter().enumerate() {
        if by_name.contains_key(&*pbnode.name) {
            return Err(ImportError::pattern(&*pbnode.name, "unique node name").into());
        }
        let id = graph.add_node(Some(idx), &pbnode.name, &pbnode.op);
        graph.nodes[id].defs.push(pbnode);
        by_name.insert(&pbnode.name, id);
    }
    for (id, pbnode) in graph_def.node.iter().enumerate() {
        for reference in &pbnode.input {
            let prec = by_name
                .get(referenced_name(reference))
                .copied()
                .ok_or_else(|| ImportError::resolution(&**reference, &*pbnode.name))?;
            graph.add_edge(prec, id)?;
        }
    }
    debug!("Built foreign graph: {} nodes, {} edges", graph.len(), graph.edge_count());
    Ok(graph)
}
