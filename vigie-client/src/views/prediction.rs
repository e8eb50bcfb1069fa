use serde::Serialize;

use crate::api::{Fetched, MaintenanceApi, SharedApi};
use crate::error::ViewError;
use crate::models::{PredictionRequest, PredictionResult, SensorReading};

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    Medium,
    High,
}

impl RiskLevel {
    /// < 0.4 faible, < 0.7 moyen, sinon élevé
    pub fn from_probability(p: f64) -> Self {
        if p >= 0.7 {
            RiskLevel::High
        } else if p >= 0.4 {
            RiskLevel::Medium
        } else {
            RiskLevel::Low
        }
    }
}

pub struct PredictionView<A> {
    api: SharedApi<A>,
}

impl<A: MaintenanceApi> PredictionView<A> {
    pub fn new(api: SharedApi<A>) -> Self {
        Self { api }
    }

    pub async fn run(
        &self,
        equipment_id: &str,
        reading: Option<SensorReading>,
    ) -> Result<(Fetched<PredictionResult>, RiskLevel), ViewError> {
        let request = PredictionRequest { equipment_id: equipment_id.to_string(), reading };
        let fetched = self.api.predict(&request).await?;
        let risk = RiskLevel::from_probability(fetched.data.failure_probability);
        Ok((fetched, risk))
    }
}
