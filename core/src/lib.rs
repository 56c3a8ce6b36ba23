//! # Tessel core
//!
//! The static graph the importers emit into, the operator parameter sets it
//! carries, and the `GraphBuilder` interface the importers talk to.
//!
//! ```
//! use tessel_core::internal::*;
//!
//! let mut graph = StaticGraph::new("demo");
//! let node = graph.create_node("input").unwrap();
//! let tensor = graph.create_tensor("input").unwrap();
//! graph.set_tensor_shape(tensor, &[1, 3, 224, 224]).unwrap();
//! graph.add_node_output(node, tensor).unwrap();
//! graph.set_node_op(node, StaticOp::bare("InputOp")).unwrap();
//! graph.add_graph_input(node).unwrap();
//! graph.check_consistency().unwrap();
//! ```

#[macro_use]
extern crate derive_new;
#[allow(unused_imports)]
#[macro_use]
extern crate log;

pub mod builder;
pub mod model;
pub mod ops;

pub use tessel_data;

pub mod prelude {
    pub use crate::builder::GraphBuilder;
    pub use crate::model::{
        Layout, NodeId, StaticGraph, StaticNode, StaticTensor, TensorId, TensorKind,
    };
    pub use crate::ops::{OpParams, StaticOp};
    pub use tessel_data::prelude::*;
}

pub mod internal {
    pub use crate::ops::array::{ConcatParams, ReshapeParams};
    pub use crate::ops::generic::GenericParams;
    pub use crate::ops::math::{EltwiseKind, EltwiseParams, FcParams, GemmParams};
    pub use crate::ops::nn::{
        BatchNormParams, ConvParams, PAD_SAME, PoolMethod, PoolParams, ReluParams, ResizeParams,
        SoftmaxParams,
    };
    pub use crate::ops::rec::LstmParams;
    pub use crate::prelude::*;
    pub use tessel_data::internal::*;
}
