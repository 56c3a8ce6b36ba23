//! The foreign graph: TensorFlow nodes with symmetric, name-free edges.
//!
//! Nodes live in an arena and are addressed by their index. `order` is the
//! discovery sequence of the live nodes, the scan order of every pass. It is
//! "mostly topological" only: passes must put up with forward references.
use std::fmt;

use itertools::Itertools;
use tessel_core::internal::*;

use crate::errors::ImportError;
use crate::tfpb::tensorflow::NodeDef;

mod build;
mod surgery;

pub use build::build_graph;

/// Which arithmetic expansion of a batch normalization a node belongs to.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BnVariant {
    /// `x * rsqrt(var + eps) + (beta - mean * rsqrt(var + eps))`
    WithoutGamma,
    /// same, with the reciprocal square root scaled by `gamma`
    WithGamma,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum CellKind {
    Lstm,
    BasicLstm,
    Gru,
}

impl CellKind {
    /// Name fragment identifying the cell inside a `while` scope.
    pub fn marker(&self) -> &'static str {
        match self {
            CellKind::Lstm => "lstm_cell",
            CellKind::BasicLstm => "basic_lstm_cell",
            CellKind::Gru => "gru",
        }
    }

    pub fn op(&self) -> &'static str {
        match self {
            CellKind::Gru => "GRU",
            _ => "LSTM",
        }
    }
}

/// A recurrent layer folded into a single node.
///
/// Slots point at foreign nodes: either declared inputs of the composite, or
/// constants left in the absorbed set.
#[derive(Clone, Debug, PartialEq, new)]
pub struct RecurrentCell {
    pub cell: CellKind,
    pub absorbed: Vec<usize>,
    #[new(default)]
    pub kernel: Option<usize>,
    #[new(default)]
    pub bias: Option<usize>,
    #[new(default)]
    pub w_f_diag: Option<usize>,
    #[new(default)]
    pub w_i_diag: Option<usize>,
    #[new(default)]
    pub w_o_diag: Option<usize>,
    #[new(default)]
    pub projection: Option<usize>,
    #[new(default)]
    pub init_c: Option<usize>,
    #[new(default)]
    pub init_h: Option<usize>,
    #[new(default)]
    pub forget_bias: Option<usize>,
}

impl RecurrentCell {
    /// Every populated slot.
    pub fn slots(&self) -> impl Iterator<Item = usize> + '_ {
        [
            self.kernel,
            self.bias,
            self.w_f_diag,
            self.w_i_diag,
            self.w_o_diag,
            self.projection,
            self.init_c,
            self.init_h,
            self.forget_bias,
        ]
        .into_iter()
        .flatten()
    }
}

#[derive(Clone, Debug, PartialEq, Default)]
pub enum NodeKind {
    #[default]
    Plain,
    Recurrent(Box<RecurrentCell>),
}

#[derive(Clone, Debug, PartialEq)]
pub struct TfNode<'a> {
    pub id: usize,
    /// Position of the first record in the GraphDef, `None` for synthetic nodes.
    pub idx: Option<usize>,
    pub name: String,
    pub op: String,
    pub inputs: Vec<usize>,
    pub outputs: Vec<usize>,
    /// Records this node stands for, its own first.
    pub defs: TVec<&'a NodeDef>,
    pub skip_materialization: bool,
    pub bn_variant: Option<BnVariant>,
    pub removed: bool,
    pub kind: NodeKind,
}

impl<'a> TfNode<'a> {
    pub fn new(
        id: usize,
        idx: Option<usize>,
        name: impl Into<String>,
        op: impl Into<String>,
    ) -> Self {
        TfNode {
            id,
            idx,
            name: name.into(),
            op: op.into(),
            inputs: vec![],
            outputs: vec![],
            defs: tvec!(),
            skip_materialization: false,
            bn_variant: None,
            removed: false,
            kind: NodeKind::Plain,
        }
    }

    pub fn is_isolated(&self) -> bool {
        self.inputs.is_empty() && self.outputs.is_empty()
    }

    /// Record used for attribute lookup.
    pub fn def(&self) -> TesselResult<&'a NodeDef> {
        self.defs
            .first()
            .copied()
            .ok_or_else(|| format_err!("Node {} carries no definition", self.name))
    }

    /// Most recently absorbed record, where trailing constants end up.
    pub fn last_def(&self) -> TesselResult<&'a NodeDef> {
        self.defs
            .last()
            .copied()
            .ok_or_else(|| format_err!("Node {} carries no definition", self.name))
    }

    pub fn recurrent(&self) -> Option<&RecurrentCell> {
        match &self.kind {
            NodeKind::Recurrent(cell) => Some(cell),
            NodeKind::Plain => None,
        }
    }
}

impl fmt::Display for TfNode<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "#{} \"{}\" {}", self.id, self.name, self.op)
    }
}

#[derive(Clone, Debug, Default, PartialEq)]
pub struct TfGraph<'a> {
    pub nodes: Vec<TfNode<'a>>,
    pub order: Vec<usize>,
}

impl<'a> TfGraph<'a> {
    /// Appends a node to the arena and to the end of the sequence.
    pub fn add_node(&mut self, idx: Option<usize>, name: &str, op: &str) -> usize {
        let id = self.nodes.len();
        self.nodes.push(TfNode::new(id, idx, name, op));
        self.order.push(id);
        id
    }

    pub fn node(&self, id: usize) -> TesselResult<&TfNode<'a>> {
        self.nodes.get(id).ok_or_else(|| format_err!("Invalid foreign node id {}", id))
    }

    pub fn node_mut(&mut self, id: usize) -> TesselResult<&mut TfNode<'a>> {
        self.nodes.get_mut(id).ok_or_else(|| format_err!("Invalid foreign node id {}", id))
    }

    /// Live nodes, in sequence order.
    pub fn live(&self) -> impl Iterator<Item = &TfNode<'a>> {
        self.order.iter().map(|&id| &self.nodes[id]).filter(|n| !n.removed)
    }

    /// Snapshot of the sequence, for scans that mutate the graph.
    pub fn live_ids(&self) -> Vec<usize> {
        self.live().map(|n| n.id).collect()
    }

    pub fn len(&self) -> usize {
        self.live().count()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn node_by_name(&self, name: &str) -> Option<&TfNode<'a>> {
        self.live().find(|n| n.name == name)
    }

    pub fn op(&self, id: usize) -> &str {
        self.nodes.get(id).map(|n| &*n.op).unwrap_or("")
    }

    pub fn name(&self, id: usize) -> &str {
        self.nodes.get(id).map(|n| &*n.name).unwrap_or("")
    }

    /// Total number of input edges over the live nodes.
    pub fn edge_count(&self) -> usize {
        self.live().map(|n| n.inputs.len()).sum()
    }

    /// Disconnects a node and marks it removed. Its arena slot stays.
    pub fn remove(&mut self, id: usize) -> TesselResult<()> {
        self.disconnect(id)?;
        let node = self.node_mut(id)?;
        trace!("Removing {}", node);
        node.removed = true;
        Ok(())
    }

    /// Removes the node if nothing refers to it anymore.
    pub fn remove_if_isolated(&mut self, id: usize) -> TesselResult<bool> {
        let node = self.node(id)?;
        if node.removed || !node.is_isolated() {
            return Ok(false);
        }
        self.remove(id)?;
        Ok(true)
    }

    /// Drops removed nodes from the sequence.
    pub fn compact(&mut self) {
        let nodes = &self.nodes;
        self.order.retain(|&id| !nodes[id].removed);
    }

    /// Checks edge symmetry, as multisets, over the nodes still in use.
    ///
    /// Nodes absorbed in a recurrent cell are out of the sequence but keep
    /// their internal edges, so they are checked too.
    pub fn check_consistency(&self) -> TesselResult<()> {
        for node in self.nodes.iter().filter(|n| !n.removed) {
            for &input in node.inputs.iter().unique() {
                let other = self.node(input)?;
                ensure!(!other.removed, "{} has removed input {}", node, other);
                let forward = node.inputs.iter().filter(|&&i| i == input).count();
                let backward = other.outputs.iter().filter(|&&o| o == node.id).count();
                if forward != backward {
                    return Err(ImportError::pattern(
                        &*node.name,
                        format!("symmetric edge with {} ({} vs {})", other.name, forward, backward),
                    )
                    .into());
                }
            }
            for &output in node.outputs.iter().unique() {
                let other = self.node(output)?;
                ensure!(!other.removed, "{} has removed output {}", node, other);
                ensure!(
                    other.inputs.contains(&node.id),
                    "{} lists {} as output, but is not one of its inputs",
                    node,
                    other
                );
            }
        }
        for &id in &self.order {
            ensure!(id < self.nodes.len(), "Invalid id {} in sequence", id);
        }
        Ok(())
    }
}

impl fmt::Display for TfGraph<'_> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for node in self.live() {
            writeln!(f, "{} ({} defs)", node, node.defs.len())?;
            if !node.inputs.is_empty() {
                writeln!(f, "    <- {}", node.inputs.iter().map(|&i| self.name(i)).join(", "))?;
            }
            if !node.outputs.is_empty() {
                writeln!(f, "    -> {}", node.outputs.iter().map(|&o| self.name(o)).join(", "))?;
            }
            if let Some(cell) = node.recurrent() {
                writeln!(f, "    {:?} cell absorbing {} nodes", cell.cell, cell.absorbed.len())?;
            }
        }
        Ok(())
    }
}
