//! trucking-jobs
//!
//! Models a multi-hub truck routing problem, submits it to a remote
//! optimization service and decodes the returned solution, optionally
//! running several problem instances concurrently.

pub mod model;
pub mod solution;
pub mod factory;
pub mod codec;
pub mod latch;
pub mod job;
pub mod docloud;
pub mod controller;
pub mod report;
