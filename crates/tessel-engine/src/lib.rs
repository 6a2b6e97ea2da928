//! Orchestration of distributed Tessel runs.
//!
//! A [`Node`] joins a group, and the elected leader splits the prepared
//! problem among the workers through its [`Master`]. Every node then
//! steps its own partition through a [`Worker`], calling back into the
//! halo exchange from its [`Physics`] implementation, and finally the
//! leader gathers the results into one global state.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod error;
pub mod master;
pub mod node;
pub mod physics;
pub mod worker;

pub use config::{ConfigError, NodeConfig};
pub use error::NodeError;
pub use master::Master;
pub use node::{Node, NodeState};
pub use physics::{GlobalState, GridSettings, LocalState, Physics};
pub use worker::Worker;
