//! steerable_aqp - progressive approximate aggregates over paginated data
//!
//! A query is answered block by block: each refinement pulls one more page
//! from a [`source::BlockSource`], folds it into running sufficient
//! statistics, and reports a tighter estimate.

pub mod cli;
pub mod engine;
pub mod http_server;
pub mod observability;
pub mod source;
