#![doc = include_str!("../README.md")]
#![cfg_attr(docsrs, feature(doc_cfg))]

// -----------------------------------------------------------------------------
// Extern

extern crate alloc;

// -----------------------------------------------------------------------------
// Modules

mod context;
mod error;

pub mod backend;
pub mod config;
pub mod contract;
pub mod engine;
pub mod events;
pub mod guard;
pub mod info;
pub mod registry;
pub mod resolver;

// -----------------------------------------------------------------------------
// Top-Level exports

pub use context::{SerialContext, SerialContextBuilder};
pub use error::{FaultKind, SerialError, SerialResult};
