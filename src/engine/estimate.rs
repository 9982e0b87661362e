//! Point estimates and confidence intervals
//!
//! COUNT and SUM report the processed-so-far total with no interval; no
//! population size is known, so nothing is extrapolated. AVG reports the
//! sample mean with a normal-approximation 95% interval:
//!
//! ```text
//! mean = sum / n
//! s^2  = max(0, sum_sq / n - mean^2) * n / (n - 1)      n > 1
//! SE   = sqrt(s^2 / n)
//! CI   = mean +/- 1.96 * SE
//! ```
//!
//! With `n <= 1` the interval is left undefined.

use serde::Serialize;

use super::aggregate::AggregateKind;
use super::errors::{EngineError, EngineResult};
use super::state::QueryState;

/// Two-sided 95% normal quantile
pub const Z_95: f64 = 1.96;

/// Reported instead of a mean when no rows have been seen
pub const NO_DATA_YET: &str = "no data yet";

/// Current answer for a progressive query
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Estimate {
    pub aggregate: AggregateKind,
    pub column: Option<String>,
    /// Point estimate; `None` while the mean is undefined
    pub value: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_low: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ci_high: Option<f64>,
    /// Half-width of the interval
    #[serde(skip_serializing_if = "Option::is_none")]
    pub margin: Option<f64>,
    pub rows_processed: u64,
    pub offset: u64,
    pub exhausted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

impl Estimate {
    /// Derive the estimate for the current state
    pub fn from_state(state: &QueryState) -> Self {
        let mut estimate = Self {
            aggregate: state.aggregate(),
            column: state.column().map(str::to_string),
            value: None,
            ci_low: None,
            ci_high: None,
            margin: None,
            rows_processed: state.running_count(),
            offset: state.offset(),
            exhausted: state.is_exhausted(),
            note: None,
        };

        match state.aggregate() {
            AggregateKind::Count => estimate.value = Some(state.running_count() as f64),
            AggregateKind::Sum => estimate.value = Some(state.running_sum()),
            AggregateKind::Avg => match mean(state) {
                Ok(mu) => {
                    estimate.value = Some(mu);
                    if let Some(margin) = margin_of_error(state) {
                        estimate.margin = Some(margin);
                        estimate.ci_low = Some(mu - margin);
                        estimate.ci_high = Some(mu + margin);
                    }
                }
                Err(_) => estimate.note = Some(NO_DATA_YET.to_string()),
            },
        }

        estimate
    }

    /// Width of the confidence interval, if defined
    pub fn ci_width(&self) -> Option<f64> {
        match (self.ci_low, self.ci_high) {
            (Some(lo), Some(hi)) => Some(hi - lo),
            _ => None,
        }
    }
}

/// Sample mean
pub fn mean(state: &QueryState) -> EngineResult<f64> {
    if state.running_count() == 0 {
        return Err(EngineError::DivisionUndefined);
    }
    Ok(state.running_sum() / state.running_count() as f64)
}

/// Unbiased sample variance, `None` for fewer than two rows
pub fn sample_variance(state: &QueryState) -> Option<f64> {
    let n = state.running_count();
    if n <= 1 {
        return None;
    }
    let n = n as f64;
    let mu = state.running_sum() / n;
    let population = (state.running_sum_sq() / n - mu * mu).max(0.0);
    Some(population * n / (n - 1.0))
}

/// Standard error of the mean
pub fn standard_error(state: &QueryState) -> Option<f64> {
    let variance = sample_variance(state)?;
    Some((variance / state.running_count() as f64).sqrt())
}

/// `1.96 * SE`
pub fn margin_of_error(state: &QueryState) -> Option<f64> {
    standard_error(state).map(|se| Z_95 * se)
}
