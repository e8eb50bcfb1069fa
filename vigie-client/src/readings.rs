//! Helpers over sensor reading series.
//!
//! Endpoints disagree on ordering (newest-first vs oldest-first); every series
//! that reaches a view goes through [`normalize_order`] so the views can rely
//! on oldest-first.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::models::{SensorMetric, SensorReading};

/// Plafond du `limit` envoyé à /equipment/{id}/readings
pub const MAX_READINGS_LIMIT: usize = 1000;

/// Ramène un `limit` de config ou de ligne de commande dans `1..=MAX_READINGS_LIMIT`
pub fn clamp_limit(limit: usize) -> usize {
    limit.clamp(1, MAX_READINGS_LIMIT)
}

/// Sort oldest-first. Stable, so readings sharing a timestamp keep their order.
pub fn normalize_order(mut readings: Vec<SensorReading>) -> Vec<SensorReading> {
    readings.sort_by_key(|r| r.timestamp);
    readings
}

pub fn latest(readings: &[SensorReading]) -> Option<&SensorReading> {
    readings.iter().max_by_key(|r| r.timestamp)
}

pub fn series(readings: &[SensorReading], metric: SensorMetric) -> Vec<(NaiveDateTime, f64)> {
    readings
        .iter()
        .filter_map(|r| r.value(metric).map(|v| (r.timestamp, v)))
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SeriesStats {
    pub count: usize,
    pub min: f64,
    pub max: f64,
    pub mean: f64,
    pub latest: f64,
}

pub fn stats(readings: &[SensorReading], metric: SensorMetric) -> Option<SeriesStats> {
    let points = series(readings, metric);
    let (_, latest) = *points.iter().max_by_key(|(ts, _)| *ts)?;
    let values = points.iter().map(|(_, v)| *v);
    let min = values.clone().fold(f64::INFINITY, f64::min);
    let max = values.clone().fold(f64::NEG_INFINITY, f64::max);
    let mean = values.sum::<f64>() / points.len() as f64;
    Some(SeriesStats { count: points.len(), min, max, mean, latest })
}

pub fn anomaly_count(readings: &[SensorReading]) -> usize {
    readings.iter().filter(|r| r.anomaly_detected).count()
}
