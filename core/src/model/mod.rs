//! The static graph: an arena of nodes and an arena of tensors, linked by
//! integer handles.
mod graph;
mod node;
mod tensor;

pub use self::graph::StaticGraph;
pub use self::node::StaticNode;
pub use self::tensor::{Layout, StaticTensor, TensorKind};

pub type NodeId = usize;
pub type TensorId = usize;
