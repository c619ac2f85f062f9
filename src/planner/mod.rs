//! Planning module: turns a flat change set into ordered layers.
//!
//! Every dependency of an item in layer *k* lives in a layer before *k*,
//! except where a cycle had to be broken (see [`Layer::forced`]).

mod graph;
mod layers;

pub use graph::build_layers;
pub use layers::{ExecutionPlan, Layer};
