#![crate_name = "hbmpc"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Asynchronous secret-sharing based multi-party computation.
//!
//! Secrets are Shamir-shared at degree t among n >= 3t + 1 parties.
//! Parties add shares locally, multiply them with Beaver triples, and open
//! them with a robust batch reconstruction which also identifies parties
//! sending inconsistent values. Programs run on a per-party [`Context`];
//! [`TaskProgramRunner`] runs all parties of a session as tokio tasks.

mod errors;

pub mod beaver;
pub mod context;
pub mod net;
pub mod parameters;
pub mod preprocessing;
pub mod program;
pub mod randousha;
pub mod reconstruction;
pub mod share;

pub use context::Context;
pub use errors::{Error, ParametersError, Result};
pub use parameters::{MpcConfig, MpcParameters, MpcParametersBuilder};
pub use program::{Program, ProgramRegistry, TaskProgramRunner};
pub use share::{BeaverTriple, DoubleShare, Share, ShareArray};
