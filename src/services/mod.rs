//! Scan services: process execution, tool probing, adapters, normalization,
//! orchestration and reporting.

pub mod adapters;
pub mod exec;
pub mod fingerprint;
pub mod normalizer;
pub mod pipeline;
pub mod prober;
pub mod progress;
pub mod report;
pub mod scanner;
