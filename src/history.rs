//! Weight history
//!
//! One sample per calendar day. Recording a second weight on the same day
//! replaces the first, so the history is a date-keyed map rather than a log.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::error::ComputeError;
use crate::types::{TrendPoint, WeightSample, WeightTrend};

/// Per-day weight samples for one user
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct WeightHistory {
    samples: BTreeMap<NaiveDate, f64>,
}

impl WeightHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build from samples; later entries for the same day win
    pub fn from_samples<I>(samples: I) -> Result<Self, ComputeError>
    where
        I: IntoIterator<Item = WeightSample>,
    {
        let mut history = Self::new();
        for sample in samples {
            history.upsert(sample)?;
        }
        Ok(history)
    }

    /// Record a weight, replacing any sample for the same day.
    ///
    /// Returns the replaced weight, if any.
    pub fn upsert(&mut self, sample: WeightSample) -> Result<Option<f64>, ComputeError> {
        if !sample.weight_kg.is_finite() || sample.weight_kg <= 0.0 {
            return Err(ComputeError::InvalidWeight(sample.weight_kg));
        }
        Ok(self.samples.insert(sample.recorded_at, sample.weight_kg))
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.samples.get(&date).copied()
    }

    /// Samples ordered by date, oldest first
    pub fn samples(&self) -> Vec<WeightSample> {
        self.samples
            .iter()
            .map(|(&recorded_at, &weight_kg)| WeightSample {
                weight_kg,
                recorded_at,
            })
            .collect()
    }

    /// Most recent sample
    pub fn latest(&self) -> Option<WeightSample> {
        self.samples
            .iter()
            .next_back()
            .map(|(&recorded_at, &weight_kg)| WeightSample {
                weight_kg,
                recorded_at,
            })
    }

    pub fn len(&self) -> usize {
        self.samples.len()
    }

    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Chart series for the weight trend.
    ///
    /// With no recorded samples, a positive `fallback_weight` is plotted as a
    /// single point on `fallback_date` so the chart is never blank.
    pub fn trend(
        &self,
        fallback_weight: Option<f64>,
        fallback_date: NaiveDate,
        target_weight_kg: Option<f64>,
    ) -> WeightTrend {
        let mut points: Vec<TrendPoint> = self
            .samples
            .iter()
            .map(|(&date, &weight_kg)| TrendPoint { date, weight_kg })
            .collect();

        if points.is_empty() {
            if let Some(weight_kg) = fallback_weight.filter(|w| w.is_finite() && *w > 0.0) {
                points.push(TrendPoint {
                    date: fallback_date,
                    weight_kg,
                });
            }
        }

        WeightTrend {
            points,
            target_weight_kg: target_weight_kg.filter(|w| *w > 0.0),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 2, d).unwrap()
    }

    fn sample(weight_kg: f64, d: u32) -> WeightSample {
        WeightSample {
            weight_kg,
            recorded_at: day(d),
        }
    }

    #[test]
    fn test_same_day_overwrites() {
        let mut history = WeightHistory::new();
        assert_eq!(history.upsert(sample(80.0, 3)).unwrap(), None);
        assert_eq!(history.upsert(sample(79.4, 3)).unwrap(), Some(80.0));

        assert_eq!(history.len(), 1);
        assert_eq!(history.get(day(3)), Some(79.4));
    }

    #[test]
    fn test_samples_ascending() {
        let history =
            WeightHistory::from_samples(vec![sample(78.0, 10), sample(80.0, 1), sample(79.0, 5)])
                .unwrap();

        let dates: Vec<NaiveDate> = history.samples().iter().map(|s| s.recorded_at).collect();
        assert_eq!(dates, vec![day(1), day(5), day(10)]);
        assert_eq!(history.latest(), Some(sample(78.0, 10)));
    }

    #[test]
    fn test_rejects_invalid_weight() {
        let mut history = WeightHistory::new();
        assert!(matches!(
            history.upsert(sample(0.0, 1)),
            Err(ComputeError::InvalidWeight(_))
        ));
        assert!(history.upsert(sample(f64::NAN, 1)).is_err());
        assert!(history.is_empty());
    }

    #[test]
    fn test_trend_fallback_point() {
        let history = WeightHistory::new();
        let trend = history.trend(Some(82.5), day(7), Some(75.0));

        assert_eq!(
            trend.points,
            vec![TrendPoint {
                date: day(7),
                weight_kg: 82.5
            }]
        );
        assert_eq!(trend.target_weight_kg, Some(75.0));

        let trend = history.trend(None, day(7), Some(0.0));
        assert!(trend.points.is_empty());
        assert_eq!(trend.target_weight_kg, None);
    }

    #[test]
    fn test_trend_ignores_fallback_when_history_exists() {
        let history = WeightHistory::from_samples(vec![sample(80.0, 1)]).unwrap();
        let trend = history.trend(Some(90.0), day(7), None);
        assert_eq!(trend.points.len(), 1);
        assert_eq!(trend.points[0].weight_kg, 80.0);
    }

    #[test]
    fn test_serialization() {
        let history = WeightHistory::from_samples(vec![sample(80.0, 1), sample(79.5, 2)]).unwrap();
        let json = serde_json::to_string(&history).unwrap();
        let loaded: WeightHistory = serde_json::from_str(&json).unwrap();
        assert_eq!(loaded, history);
    }
}
