//! Sensor visualizer: readings of one machine, as chartable series.

use chrono::NaiveDateTime;
use serde::Serialize;

use crate::api::{DataSource, MaintenanceApi, SharedApi};
use crate::error::ViewError;
use crate::models::{SensorMetric, SensorReading};
use crate::readings::{self, normalize_order, SeriesStats};

#[derive(Debug, Clone, Default, Serialize)]
pub struct SensorData {
    pub equipment_id: String,
    pub readings: Vec<SensorReading>,
    pub source: DataSource,
}

impl SensorData {
    pub fn series(&self, metric: SensorMetric) -> Vec<(NaiveDateTime, f64)> {
        readings::series(&self.readings, metric)
    }

    pub fn stats(&self, metric: SensorMetric) -> Option<SeriesStats> {
        readings::stats(&self.readings, metric)
    }

    /// Grandeurs présentes dans au moins une lecture
    pub fn available_metrics(&self) -> Vec<SensorMetric> {
        SensorMetric::ALL
            .into_iter()
            .filter(|m| self.readings.iter().any(|r| r.value(*m).is_some()))
            .collect()
    }

    pub fn anomaly_count(&self) -> usize {
        readings::anomaly_count(&self.readings)
    }
}

pub struct SensorView<A> {
    api: SharedApi<A>,
    limit: usize,
}

impl<A: MaintenanceApi> SensorView<A> {
    pub fn new(api: SharedApi<A>, limit: usize) -> Self {
        Self { api, limit: readings::clamp_limit(limit) }
    }

    pub async fn load(&self, equipment_id: &str) -> Result<SensorData, ViewError> {
        let fetched = self.api.equipment_readings(equipment_id, self.limit).await?;
        Ok(SensorData {
            equipment_id: equipment_id.to_string(),
            readings: normalize_order(fetched.data),
            source: fetched.source,
        })
    }
}
