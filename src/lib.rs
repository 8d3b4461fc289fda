#![deny(missing_docs)]
#![doc = include_str!("../README.md")]

mod anchor;
mod engine;
mod error;
mod heap;
mod node;

pub mod cutoff;
pub mod tracer;

pub use anchor::Anchor;
pub use engine::Engine;
pub use error::EngineError;
pub use node::{NodeId, StabilizationNumber};
pub use tracer::{NoopTracer, RecomputeResult, Tracer};
