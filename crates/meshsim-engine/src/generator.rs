//! Conversion of final propagation statistics into combined realtime data.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use tracing::warn;

use meshsim_core::metrics::{RECORDS_EMITTED, RECORDS_SKIPPED};
use meshsim_core::{
    CombinedRealtimeData, EndpointBaseData, EndpointName, SampleResponse, TimeSlot,
};

use crate::propagation::{PropagationBySlot, PropagationStats};

/// Status bucket used for success records without a 2xx sample.
const DEFAULT_SUCCESS_STATUS: &str = "200";
/// Status bucket used for error records without a 5xx sample.
const DEFAULT_ERROR_STATUS: &str = "500";

/// Turns final per-slot statistics into the record stream consumed by the
/// persistence layer.
#[derive(Debug, Default)]
pub struct DataGenerator;

impl DataGenerator {
    /// Creates the generator.
    #[must_use]
    pub fn new() -> Self {
        Self
    }

    /// Emits up to two records (one per status bucket) per endpoint per
    /// slot. Endpoints with no base-data row are skipped; a lone unknown
    /// endpoint must not abort the run.
    #[must_use]
    pub fn generate(
        &self,
        base_data: &BTreeMap<EndpointName, EndpointBaseData>,
        pass_two: &PropagationBySlot,
        simulate_date: DateTime<Utc>,
    ) -> BTreeMap<TimeSlot, Vec<CombinedRealtimeData>> {
        let start_ms = simulate_date.timestamp_millis();

        let mut out = BTreeMap::new();
        for (slot, per_endpoint) in pass_two {
            let timestamp_us = (start_ms + slot.offset_ms()) * 1_000;
            let mut records = Vec::new();
            for (endpoint, stats) in per_endpoint {
                let Some(data) = base_data.get(endpoint) else {
                    warn!(endpoint = %endpoint, "no base data for endpoint, skipping record");
                    RECORDS_SKIPPED
                        .with_label_values(&["missing-base-data"])
                        .inc();
                    continue;
                };
                records.extend(records_for_endpoint(endpoint, data, stats, timestamp_us));
            }
            out.insert(*slot, records);
        }
        out
    }
}

fn records_for_endpoint(
    endpoint: &EndpointName,
    data: &EndpointBaseData,
    stats: &PropagationStats,
    timestamp_us: i64,
) -> Vec<CombinedRealtimeData> {
    let error_count = stats.own_error_count + stats.downstream_error_count;
    let success_count = stats.request_count.saturating_sub(error_count);

    let mut records = Vec::with_capacity(2);
    if success_count > 0 {
        let sample = data.sample_responses.iter().find(|s| s.is_success());
        records.push(build_record(
            endpoint,
            sample,
            DEFAULT_SUCCESS_STATUS,
            success_count,
            stats.latency.success.unwrap_or_default(),
            timestamp_us,
        ));
    }
    if error_count > 0 {
        let sample = data.sample_responses.iter().find(|s| s.is_server_error());
        records.push(build_record(
            endpoint,
            sample,
            DEFAULT_ERROR_STATUS,
            error_count,
            stats.latency.failure.unwrap_or_default(),
            timestamp_us,
        ));
    }
    records
}

fn build_record(
    endpoint: &EndpointName,
    sample: Option<&SampleResponse>,
    default_status: &str,
    combined: u64,
    latency: meshsim_core::LatencyStats,
    timestamp_us: i64,
) -> CombinedRealtimeData {
    let status = sample
        .map(|s| s.status.clone())
        .unwrap_or_else(|| default_status.to_string());
    RECORDS_EMITTED.with_label_values(&[status.as_str()]).inc();

    CombinedRealtimeData {
        unique_service_name: endpoint.service_name(),
        unique_endpoint_name: endpoint.clone(),
        latest_timestamp_us: timestamp_us,
        status,
        combined,
        latency,
        response_content_type: sample.and_then(|s| s.content_type.clone()),
        response_body: sample.and_then(|s| s.body.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use meshsim_core::LatencyStats;

    use crate::propagation::StatusLatency;

    fn endpoint(name: &str) -> EndpointName {
        EndpointName::from(name)
    }

    fn base_data_for(
        name: &str,
        samples: Vec<SampleResponse>,
    ) -> BTreeMap<EndpointName, EndpointBaseData> {
        let mut map = BTreeMap::new();
        map.insert(
            endpoint(name),
            EndpointBaseData {
                endpoint: endpoint(name),
                sample_responses: samples,
            },
        );
        map
    }

    fn pass_two_for(name: &str, stats: PropagationStats) -> PropagationBySlot {
        let mut per_endpoint = BTreeMap::new();
        per_endpoint.insert(endpoint(name), stats);
        let mut by_slot = PropagationBySlot::new();
        by_slot.insert(TimeSlot::new(0, 3), per_endpoint);
        by_slot
    }

    fn simulate_date() -> DateTime<Utc> {
        DateTime::from_timestamp(1_700_000_000, 0).unwrap()
    }

    #[test]
    fn test_success_and_error_records_split() {
        let samples = vec![
            SampleResponse {
                status: "201".to_string(),
                content_type: Some("application/json".to_string()),
                body: Some(serde_json::json!({"ok": true})),
            },
            SampleResponse {
                status: "503".to_string(),
                content_type: None,
                body: None,
            },
        ];
        let stats = PropagationStats {
            request_count: 10,
            own_error_count: 2,
            downstream_error_count: 1,
            latency: StatusLatency {
                success: Some(LatencyStats::new(12.0, 0.1)),
                failure: Some(LatencyStats::new(30.0, 0.4)),
            },
        };

        let records = DataGenerator::new().generate(
            &base_data_for("a", samples),
            &pass_two_for("a", stats),
            simulate_date(),
        );

        let slot_records = &records[&TimeSlot::new(0, 3)];
        assert_eq!(slot_records.len(), 2);

        let success = &slot_records[0];
        assert_eq!(success.status, "201");
        assert_eq!(success.combined, 7);
        assert_eq!(success.latency, LatencyStats::new(12.0, 0.1));
        assert_eq!(
            success.response_content_type.as_deref(),
            Some("application/json")
        );

        let error = &slot_records[1];
        assert_eq!(error.status, "503");
        assert_eq!(error.combined, 3);
        assert_eq!(error.latency, LatencyStats::new(30.0, 0.4));
    }

    #[test]
    fn test_missing_samples_fall_back_to_default_statuses() {
        let stats = PropagationStats {
            request_count: 5,
            own_error_count: 5,
            downstream_error_count: 0,
            latency: StatusLatency::default(),
        };

        let records = DataGenerator::new().generate(
            &base_data_for("a", vec![]),
            &pass_two_for("a", stats),
            simulate_date(),
        );

        let slot_records = &records[&TimeSlot::new(0, 3)];
        assert_eq!(slot_records.len(), 1);
        assert_eq!(slot_records[0].status, "500");
        assert_eq!(slot_records[0].combined, 5);
        assert_eq!(slot_records[0].latency, LatencyStats::ZERO);
        assert!(slot_records[0].response_body.is_none());
    }

    #[test]
    fn test_unknown_endpoint_is_skipped() {
        let stats = PropagationStats {
            request_count: 5,
            ..Default::default()
        };

        let records = DataGenerator::new().generate(
            &BTreeMap::new(),
            &pass_two_for("a", stats),
            simulate_date(),
        );

        assert!(records[&TimeSlot::new(0, 3)].is_empty());
    }

    #[test]
    fn test_timestamp_offsets_by_slot() {
        let stats = PropagationStats {
            request_count: 1,
            ..Default::default()
        };

        let records = DataGenerator::new().generate(
            &base_data_for("a", vec![]),
            &pass_two_for("a", stats),
            simulate_date(),
        );

        let record = &records[&TimeSlot::new(0, 3)][0];
        let expected_ms = simulate_date().timestamp_millis() + 3 * 3_600_000;
        assert_eq!(record.latest_timestamp_us, expected_ms * 1_000);
    }
}
