use super::{NodeId, StaticNode, StaticTensor, TensorId, TensorKind};
use crate::internal::*;
use itertools::Itertools;
use std::fmt;

/// The engine's static graph.
///
/// Nodes and tensors live in two arenas and refer to each other by index.
/// A tensor knows its producer and consumers, a node knows its input and
/// output tensors; `GraphBuilder` keeps both sides in sync.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StaticGraph {
    pub name: String,
    pub nodes: Vec<StaticNode>,
    pub tensors: Vec<StaticTensor>,
    /// graph input nodes
    pub inputs: Vec<NodeId>,
    /// graph output nodes
    pub outputs: Vec<NodeId>,
    pub(crate) nodes_by_name: HashMap<String, NodeId>,
    pub(crate) tensors_by_name: HashMap<String, TensorId>,
}

impl StaticGraph {
    pub fn new(name: impl Into<String>) -> StaticGraph {
        StaticGraph { name: name.into(), ..StaticGraph::default() }
    }

    pub fn node(&self, id: NodeId) -> TesselResult<&StaticNode> {
        self.nodes.get(id).ok_or_else(|| format_err!("Invalid node id {}", id))
    }

    pub fn node_mut(&mut self, id: NodeId) -> TesselResult<&mut StaticNode> {
        self.nodes.get_mut(id).ok_or_else(|| format_err!("Invalid node id {}", id))
    }

    pub fn tensor(&self, id: TensorId) -> TesselResult<&StaticTensor> {
        self.tensors.get(id).ok_or_else(|| format_err!("Invalid tensor id {}", id))
    }

    pub fn tensor_mut(&mut self, id: TensorId) -> TesselResult<&mut StaticTensor> {
        self.tensors.get_mut(id).ok_or_else(|| format_err!("Invalid tensor id {}", id))
    }

    pub fn node_by_name(&self, name: &str) -> TesselResult<&StaticNode> {
        let id = self.nodes_by_name.get(name).ok_or_else(|| format_err!("No node named {}", name))?;
        self.node(*id)
    }

    pub fn tensor_by_name(&self, name: &str) -> TesselResult<&StaticTensor> {
        let id =
            self.tensors_by_name.get(name).ok_or_else(|| format_err!("No tensor named {}", name))?;
        self.tensor(*id)
    }

    pub fn node_input_tensors(&self, id: NodeId) -> TesselResult<TVec<&StaticTensor>> {
        self.node(id)?.inputs.iter().map(|t| self.tensor(*t)).collect()
    }

    pub fn node_output_tensors(&self, id: NodeId) -> TesselResult<TVec<&StaticTensor>> {
        self.node(id)?.outputs.iter().map(|t| self.tensor(*t)).collect()
    }

    pub fn input_nodes(&self) -> impl Iterator<Item = &StaticNode> {
        self.inputs.iter().filter_map(|id| self.nodes.get(*id))
    }

    pub fn output_nodes(&self) -> impl Iterator<Item = &StaticNode> {
        self.outputs.iter().filter_map(|id| self.nodes.get(*id))
    }

    /// Checks the graph is complete and its cross references agree.
    pub fn check_consistency(&self) -> TesselResult<()> {
        for (ix, node) in self.nodes.iter().enumerate() {
            if node.id != ix {
                bail!("Node at position {} has id {}", ix, node.id);
            }
            if node.op.is_none() {
                bail!("Node {} has no operator", node.name);
            }
            for &input in &node.inputs {
                let tensor = self.tensor(input).with_context(|| format!("input of {node}"))?;
                if !tensor.consumers.contains(&node.id) {
                    bail!("Tensor {} does not list {} as a consumer", tensor.name, node.name);
                }
            }
            for &output in &node.outputs {
                let tensor = self.tensor(output).with_context(|| format!("output of {node}"))?;
                if tensor.producer != Some(node.id) {
                    bail!("Tensor {} is not produced by {}", tensor.name, node.name);
                }
            }
        }
        for (ix, tensor) in self.tensors.iter().enumerate() {
            if tensor.id != ix {
                bail!("Tensor at position {} has id {}", ix, tensor.id);
            }
            if let Some(producer) = tensor.producer {
                if !self.node(producer)?.outputs.contains(&tensor.id) {
                    bail!("Tensor {} is not an output of its producer", tensor.name);
                }
            }
            for &consumer in &tensor.consumers {
                if !self.node(consumer)?.inputs.contains(&tensor.id) {
                    bail!("Tensor {} is not an input of its consumer", tensor.name);
                }
            }
            if tensor.kind == TensorKind::Const {
                let len = tensor.data.as_ref().map(|d| d.len()).unwrap_or(0);
                if len != tensor.data_size {
                    bail!(
                        "Const tensor {} declares {} bytes, carries {}",
                        tensor.name,
                        tensor.data_size,
                        len
                    );
                }
            }
        }
        for &id in self.inputs.iter().chain(self.outputs.iter()) {
            self.node(id)?;
        }
        Ok(())
    }
}

impl fmt::Display for StaticGraph {
    fn fmt(&self, fmt: &mut fmt::Formatter) -> fmt::Result {
        writeln!(fmt, "graph {}", self.name)?;
        for node in &self.nodes {
            writeln!(
                fmt,
                "{:5} | {:20} {:50} | {} => {}",
                node.id,
                node.op_name().unwrap_or("?"),
                node.name,
                node.inputs.iter().filter_map(|t| self.tensors.get(*t)).join(" ; "),
                node.outputs.iter().filter_map(|t| self.tensors.get(*t)).join(" ; "),
            )?;
            if let Some(op) = &node.op {
                if !matches!(op.params, OpParams::None) {
                    writeln!(fmt, "      |   * {:?}", op.params)?;
                }
            }
        }
        writeln!(fmt, "inputs: {}", self.input_nodes().map(|n| &n.name).join(", "))?;
        writeln!(fmt, "outputs: {}", self.output_nodes().map(|n| &n.name).join(", "))?;
        Ok(())
    }
}
