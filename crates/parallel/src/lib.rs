//! # streamnet parallel
//!
//! Execution strategies for the coarse-grained work streamnet runs in
//! parallel (terminal basin location).
//!
//! Every strategy is fallible: a task error or panic aborts the whole run
//! and is reported as [`streamnet_core::Error::WorkerFailure`]. Thread pools
//! are built per call, inside the call, never at load time.

pub mod strategy;

pub use strategy::{default_workers, num_cpus, ParallelStrategy, ProcessingMode};
