//! Portfolio health score.
//!
//! `score = clamp(1 - (0.30·critical + 0.15·high + 0.05·medium) / total, 0, 1)`
//!
//! The penalty is per capita, so the same anomalies weigh less in a larger
//! portfolio. Low and Info anomalies carry no weight. An empty portfolio
//! scores 1.0.

use crate::anomaly::{Severity, StatusAnomaly};

const CRITICAL_WEIGHT: f64 = 0.30;
const HIGH_WEIGHT: f64 = 0.15;
const MEDIUM_WEIGHT: f64 = 0.05;

fn weight(severity: Severity) -> f64 {
    match severity {
        Severity::Critical => CRITICAL_WEIGHT,
        Severity::High => HIGH_WEIGHT,
        Severity::Medium => MEDIUM_WEIGHT,
        Severity::Low | Severity::Info => 0.0,
    }
}

/// Health of a portfolio of `total_patents` carrying `anomalies`.
pub fn health_score(anomalies: &[StatusAnomaly], total_patents: usize) -> f64 {
    if total_patents == 0 {
        return 1.0;
    }
    let burden: f64 = anomalies.iter().map(|a| weight(a.severity)).sum();
    (1.0 - burden / total_patents as f64).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::anomaly::AnomalyType;
    use legalstat_core::{PatentId, Timestamp};
    use proptest::prelude::*;

    fn anomaly(severity: Severity) -> StatusAnomaly {
        StatusAnomaly {
            patent_id: PatentId::new("US1").unwrap(),
            anomaly_type: AnomalyType::MissedDeadline,
            severity,
            description: String::new(),
            detected_at: Timestamp::now(),
            suggested_action: String::new(),
        }
    }

    #[test]
    fn no_anomalies_is_perfect() {
        assert_eq!(health_score(&[], 10), 1.0);
        assert_eq!(health_score(&[], 0), 1.0);
    }

    #[test]
    fn ten_criticals_over_ten_patents() {
        let anomalies = vec![anomaly(Severity::Critical); 10];
        assert!((health_score(&anomalies, 10) - 0.70).abs() < 0.01);
    }

    #[test]
    fn heavy_burden_clamps_to_zero() {
        let anomalies = vec![anomaly(Severity::Critical); 20];
        assert_eq!(health_score(&anomalies, 1), 0.0);
    }

    #[test]
    fn low_and_info_are_free() {
        let anomalies = vec![anomaly(Severity::Low), anomaly(Severity::Info)];
        assert_eq!(health_score(&anomalies, 1), 1.0);
    }

    #[test]
    fn penalty_is_per_capita() {
        let anomalies = vec![anomaly(Severity::Critical); 5];
        assert!(health_score(&anomalies, 1000) > health_score(&anomalies, 5));
    }

    #[test]
    fn mixed_severities() {
        let anomalies = vec![
            anomaly(Severity::Critical),
            anomaly(Severity::High),
            anomaly(Severity::Medium),
        ];
        assert!((health_score(&anomalies, 2) - 0.75).abs() < 1e-9);
    }

    proptest! {
        #[test]
        fn score_stays_in_unit_interval(
            ranks in proptest::collection::vec(0u8..5, 0..64),
            total in 0usize..50,
        ) {
            let anomalies: Vec<StatusAnomaly> = ranks
                .iter()
                .map(|r| anomaly(match r {
                    0 => Severity::Critical,
                    1 => Severity::High,
                    2 => Severity::Medium,
                    3 => Severity::Low,
                    _ => Severity::Info,
                }))
                .collect();
            let score = health_score(&anomalies, total);
            prop_assert!((0.0..=1.0).contains(&score));
        }
    }
}
