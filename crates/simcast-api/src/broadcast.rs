//! Result broadcast: encode the scenario summaries once and fan them out.

use simcast_db::Store;
use simcast_types::ScenarioSummary;
use tracing::info;

use crate::error::ApiError;
use crate::registry::{BroadcastReport, ConnectionRegistry, Frame};

/// Encode summaries as the JSON array pushed to `/ws/results`.
///
/// # Errors
///
/// Returns [`ApiError::Serialization`] if encoding fails.
pub fn encode_summaries(summaries: &[ScenarioSummary]) -> Result<Frame, ApiError> {
    let json = serde_json::to_string(summaries)?;
    Ok(Frame::from(json))
}

/// Recompute the summaries and push them to every open connection.
///
/// The query completes, releasing its connection, before the fan-out
/// starts.
///
/// # Errors
///
/// Returns [`ApiError`] if the query or the encoding fails. Delivery
/// failures are absorbed into the report.
pub async fn notify_results(
    store: &Store,
    registry: &ConnectionRegistry,
) -> Result<BroadcastReport, ApiError> {
    let summaries = store.scenario_summaries().await?;
    let frame = encode_summaries(&summaries)?;
    let report = registry.broadcast(frame).await;

    info!(
        scenarios = summaries.len(),
        delivered = report.delivered,
        failed = report.failed,
        "Broadcast scenario results"
    );

    Ok(report)
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use rust_decimal_macros::dec;
    use simcast_types::{NewSimulationResult, ScenarioId};

    use super::*;

    #[test]
    fn payload_is_a_json_array_of_numbers() {
        let frame = encode_summaries(&[ScenarioSummary {
            scenario_id: ScenarioId::new(1),
            scenario_name: String::from("Status quo"),
            average_total_costs: dec!(10000.00),
            average_delivery_rate: dec!(0.85),
        }])
        .unwrap();

        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        let items = value.as_array().unwrap();
        assert_eq!(items.len(), 1);
        let item = items.first().unwrap();
        assert_eq!(item["scenario_id"], 1);
        assert_eq!(item["scenario_name"], "Status quo");
        assert!(item["average_total_costs"].is_number());
        assert!(item["average_delivery_rate"].is_number());
    }

    #[test]
    fn no_summaries_encode_as_empty_array() {
        assert_eq!(&*encode_summaries(&[]).unwrap(), "[]");
    }

    #[tokio::test]
    async fn notify_sends_current_summaries() {
        let store = Store::memory();
        let id = store.insert_scenario("Status quo", None).await.unwrap();
        store.insert_scenario("Idle", None).await.unwrap();
        store
            .insert_result(&NewSimulationResult {
                scenario_id: id,
                replication: 1,
                total_labor_costs: dec!(9000.00),
                ontime_delivery_rate: dec!(0.8000),
            })
            .await
            .unwrap();

        let registry = ConnectionRegistry::new(4, Duration::from_millis(50));
        let (_conn, mut rx) = registry.register().await;

        let report = notify_results(&store, &registry).await.unwrap();
        assert_eq!(report.delivered, 1);

        let frame = rx.recv().await.unwrap();
        let expected = serde_json::to_string(&store.scenario_summaries().await.unwrap()).unwrap();
        assert_eq!(&*frame, expected);
        let value: serde_json::Value = serde_json::from_str(&frame).unwrap();
        assert_eq!(value.as_array().unwrap().len(), 1);
    }
}
