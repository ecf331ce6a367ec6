#![crate_name = "hbmpc_math"]
#![crate_type = "lib"]
#![warn(missing_docs, unused_imports)]

//! Mathematical utilities for the hbmpc library: prime field arithmetic,
//! polynomials, evaluation points and Reed-Solomon decoding.

mod errors;

pub mod eval_point;
pub mod field;
pub mod linalg;
pub mod poly;
pub mod rs;

pub use errors::{Error, Result};
