//! Exact decimal averaging shared by both backends.
//!
//! `PostgreSQL` computes `AVG` over `NUMERIC` with extra scale; the memory
//! store sums [`Decimal`] values. Both results are then rounded to the
//! declared column precision here, so the two backends and the two output
//! paths (HTTP and broadcast) agree to the last digit.

use rust_decimal::{Decimal, RoundingStrategy};
use simcast_types::{COST_SCALE, RATE_SCALE, ScenarioId, ScenarioSummary};

/// Arithmetic mean, or `None` for an empty input or on overflow.
pub fn mean<I>(values: I) -> Option<Decimal>
where
    I: IntoIterator<Item = Decimal>,
{
    let mut sum = Decimal::ZERO;
    let mut count: u64 = 0;
    for value in values {
        sum = sum.checked_add(value)?;
        count = count.checked_add(1)?;
    }
    if count == 0 {
        return None;
    }
    sum.checked_div(Decimal::from(count))
}

/// Round to the `total_labor_costs` precision.
pub fn round_cost(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(COST_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Round to the `ontime_delivery_rate` precision.
pub fn round_rate(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(RATE_SCALE, RoundingStrategy::MidpointAwayFromZero)
}

/// Build a summary from unrounded averages.
pub fn summary(
    scenario_id: ScenarioId,
    scenario_name: String,
    average_total_costs: Decimal,
    average_delivery_rate: Decimal,
) -> ScenarioSummary {
    ScenarioSummary {
        scenario_id,
        scenario_name,
        average_total_costs: round_cost(average_total_costs),
        average_delivery_rate: round_rate(average_delivery_rate),
    }
}
