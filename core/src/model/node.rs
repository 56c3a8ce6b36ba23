use super::{NodeId, TensorId};
use crate::internal::*;
use itertools::Itertools;
use std::fmt;

/// A node of the static graph. It owns no tensor, only handles to them.
#[derive(Debug, Clone, PartialEq, new)]
pub struct StaticNode {
    pub id: NodeId,
    pub name: String,
    #[new(default)]
    pub op: Option<StaticOp>,
    #[new(default)]
    pub inputs: TVec<TensorId>,
    #[new(default)]
    pub outputs: TVec<TensorId>,
}

impl StaticNode {
    pub fn op_name(&self) -> Option<&str> {
        self.op.as_ref().map(|op| &*op.name)
    }

    pub fn op_is(&self, name: &str) -> bool {
        self.op_name() == Some(name)
    }
}

impl fmt::Display for StaticNode {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(
            f,
            "#{} \"{}\" {} ({}) -> ({})",
            self.id,
            self.name,
            self.op_name().unwrap_or("?"),
            self.inputs.iter().join(", "),
            self.outputs.iter().join(", ")
        )
    }
}
