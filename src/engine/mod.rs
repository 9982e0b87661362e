//! Incremental aggregation engine
//!
//! Turns a stream of virtual blocks into a converging estimate:
//!
//! ```text
//! start(AVG, fare_amount) -> fetch(offset=0)    -> merge -> Estimate
//! refine()                -> fetch(offset=n)    -> merge -> Estimate
//! refine()                -> short block        -> merge -> Estimate (exhausted)
//! refine()                -> (no fetch)                  -> same Estimate
//! ```
//!
//! State lives in a [`ProgressiveQuery`] handle owned by the caller. The
//! serving layer keeps handles in a [`SessionRegistry`] so concurrent
//! requests against the same session are serialized.

mod aggregate;
mod errors;
mod estimate;
mod query;
mod session;
mod state;

pub use aggregate::{resolve_column, AggregateKind};
pub use errors::{EngineError, EngineResult};
pub use estimate::{margin_of_error, mean, sample_variance, standard_error, Estimate, NO_DATA_YET, Z_95};
pub use query::{ProgressiveQuery, QueryEngine};
pub use session::{SessionConfig, SessionRegistry, DEFAULT_SESSION};
pub use state::QueryState;
