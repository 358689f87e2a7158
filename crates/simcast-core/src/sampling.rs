//! Uniform sampling of fixed-point result values.
//!
//! Results are stored as `NUMERIC` columns with a declared scale, so the
//! sampler draws directly on the integer mantissa grid of that scale
//! instead of rounding a float afterwards.

use rand::Rng;
use rust_decimal::Decimal;
pub use simcast_types::{COST_SCALE, RATE_SCALE};

use crate::config::ProducerConfig;

/// Largest scale a [`Decimal`] can carry.
const MAX_SCALE: u32 = 28;

/// Errors from [`sample_decimal`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SamplingError {
    /// The lower bound exceeds the upper bound at the requested scale.
    #[error("empty range {min}..={max}")]
    EmptyRange {
        /// Requested lower bound.
        min: Decimal,
        /// Requested upper bound.
        max: Decimal,
    },

    /// The requested scale is beyond what [`Decimal`] supports.
    #[error("scale {0} exceeds 28")]
    Scale(u32),
}

/// Draw a value uniformly from `[min, max]` on the grid of `scale`
/// decimal places.
///
/// Bounds are first rescaled to `scale` (rounding), so the result always
/// carries exactly `scale` decimal places.
///
/// # Errors
///
/// Returns [`SamplingError`] when the range is empty or the scale is
/// unsupported.
pub fn sample_decimal<R: Rng + ?Sized>(
    rng: &mut R,
    min: Decimal,
    max: Decimal,
    scale: u32,
) -> Result<Decimal, SamplingError> {
    if scale > MAX_SCALE {
        return Err(SamplingError::Scale(scale));
    }
    let mut lo = min;
    lo.rescale(scale);
    let mut hi = max;
    hi.rescale(scale);
    if lo > hi {
        return Err(SamplingError::EmptyRange { min, max });
    }
    let mantissa = rng.random_range(lo.mantissa()..=hi.mantissa());
    Ok(Decimal::from_i128_with_scale(mantissa, scale))
}

/// One sampled replication outcome.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SampledResult {
    /// Total labor costs at [`COST_SCALE`].
    pub total_labor_costs: Decimal,
    /// On-time delivery rate at [`RATE_SCALE`].
    pub ontime_delivery_rate: Decimal,
}

/// Draws replication outcomes from configured ranges.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ResultSampler {
    labor_costs_min: Decimal,
    labor_costs_max: Decimal,
    delivery_rate_min: Decimal,
    delivery_rate_max: Decimal,
}

impl ResultSampler {
    /// Build a sampler over explicit ranges.
    pub const fn new(
        labor_costs_min: Decimal,
        labor_costs_max: Decimal,
        delivery_rate_min: Decimal,
        delivery_rate_max: Decimal,
    ) -> Self {
        Self {
            labor_costs_min,
            labor_costs_max,
            delivery_rate_min,
            delivery_rate_max,
        }
    }

    /// Build a sampler from the producer section of the config.
    pub const fn from_config(config: &ProducerConfig) -> Self {
        Self::new(
            config.labor_costs_min,
            config.labor_costs_max,
            config.delivery_rate_min,
            config.delivery_rate_max,
        )
    }

    /// Draw one outcome.
    ///
    /// # Errors
    ///
    /// Returns [`SamplingError::EmptyRange`] if a configured range is
    /// inverted.
    pub fn sample<R: Rng + ?Sized>(&self, rng: &mut R) -> Result<SampledResult, SamplingError> {
        Ok(SampledResult {
            total_labor_costs: sample_decimal(
                rng,
                self.labor_costs_min,
                self.labor_costs_max,
                COST_SCALE,
            )?,
            ontime_delivery_rate: sample_decimal(
                rng,
                self.delivery_rate_min,
                self.delivery_rate_max,
                RATE_SCALE,
            )?,
        })
    }
}
