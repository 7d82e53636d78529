//! Context entries: free-form notes enriched with insights on submission.

pub mod handlers;
pub mod service;
pub mod stats;
