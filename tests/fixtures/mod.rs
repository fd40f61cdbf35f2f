//! Test fixtures for trucking-jobs.
//!
//! Provides:
//! - Canned solution documents as the service returns them
//! - Instrumented job executors standing in for the remote service

#![allow(dead_code)]

pub mod executors;
pub mod solutions;

pub use executors::*;
pub use solutions::*;
