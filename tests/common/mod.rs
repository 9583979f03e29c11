//! Common test utilities for sessiongraph integration tests
//!
//! Every scenario runs once per storage backend; `backends()` hands out a
//! fresh engine over each.

#![allow(dead_code)]

pub mod backends;
pub mod fixtures;

pub use backends::{backends, TestBackend};
pub use fixtures::{head, mean_of, people};
