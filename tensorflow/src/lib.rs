#![allow(clippy::len_zero)]
//! # Tessel TensorFlow importer
//!
//! Turns a frozen TensorFlow `GraphDef` into a tessel `StaticGraph`: the
//! foreign graph is built, recurrent layers are folded, a fixed pipeline of
//! rewrites simplifies it, then every remaining node is translated into an
//! engine operator.
//!
//! ## Example
//!
//! ```
//! use tessel_tensorflow::prelude::*;
//! use tessel_tensorflow::tfpb::*;
//!
//! let graph_def = graph()
//!     .node(node().name("x").op("Placeholder").attr("shape", shape(&[1, 8, 8, 3])))
//!     .node(node().name("y").op("Relu").input("x"));
//!
//! let model = tensorflow().model_for_graph_def(&graph_def).unwrap();
//! let x = model.tensor_by_name("x").unwrap();
//! assert_eq!(&*x.shape, &[1, 3, 8, 8]);
//! assert_eq!(model.outputs, vec![model.node_by_name("y").unwrap().id]);
//! ```

#[macro_use]
extern crate derive_new;
#[allow(unused_imports)]
#[macro_use]
extern crate log;

pub mod errors;
pub mod graph;
pub mod model;
pub mod ops;
pub mod optim;
pub mod rnn;
pub mod tensor;
pub mod tfpb;

pub use model::Tensorflow;

/// The importer, with every known translator registered and the default
/// rewrite pipeline.
pub fn tensorflow() -> Tensorflow {
    let mut ops = crate::model::TfOpRegister::default();
    ops::register_all_ops(&mut ops);
    Tensorflow { op_register: ops, optimizer: optim::Optimizer::default() }
}

pub use tessel_core;
pub mod prelude {
    pub use crate::errors::ImportError;
    pub use crate::graph::TfGraph;
    pub use crate::optim::Optimizer;
    pub use crate::tensorflow;
    pub use tessel_core::prelude::*;
}

#[cfg(test)]
#[allow(dead_code)]
pub fn setup_test_logger() {
    let _ = env_logger::Builder::from_env("TESSEL_LOG").is_test(true).try_init();
}
