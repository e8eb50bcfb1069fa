//! Maintenance scheduling form.

use chrono::{Duration, NaiveDate};
use tracing::info;

use crate::api::{MaintenanceApi, SharedApi};
use crate::error::ViewError;
use crate::models::{ActionResponse, HealthCategory, MaintenanceRequest, PredictionResult};
use crate::validation::{parse_date, require};

/// Saisie brute du formulaire
#[derive(Debug, Clone, Default)]
pub struct MaintenanceDraft {
    pub equipment_id: String,
    /// `YYYY-MM-DD`
    pub date: String,
    pub maintenance_type: Option<String>,
    pub description: Option<String>,
    pub technician: Option<String>,
    pub cost: Option<f64>,
}

impl MaintenanceDraft {
    pub fn to_request(&self) -> Result<MaintenanceRequest, ViewError> {
        let equipment_id = require("equipment_id", &self.equipment_id)?;
        let maintenance_date = parse_date(&self.date)?;
        let non_empty = |v: &Option<String>| v.as_deref().map(str::trim).filter(|s| !s.is_empty()).map(str::to_string);
        Ok(MaintenanceRequest {
            equipment_id,
            maintenance_date,
            maintenance_type: non_empty(&self.maintenance_type).unwrap_or_else(|| "predictive".to_string()),
            description: non_empty(&self.description),
            technician: non_empty(&self.technician),
            cost: self.cost,
        })
    }
}

/// critical -> +3 j, warning -> +7 j, sinon la date proposée par le modèle ou +30 j
pub fn suggest_date(prediction: Option<&PredictionResult>, today: NaiveDate) -> NaiveDate {
    match prediction.and_then(|p| p.prediction) {
        Some(HealthCategory::Critical) => today + Duration::days(3),
        Some(HealthCategory::Warning) => today + Duration::days(7),
        _ => prediction
            .and_then(|p| p.next_maintenance_date)
            .unwrap_or(today + Duration::days(30)),
    }
}

pub struct MaintenanceScheduler<A> {
    api: SharedApi<A>,
}

impl<A: MaintenanceApi> MaintenanceScheduler<A> {
    pub fn new(api: SharedApi<A>) -> Self {
        Self { api }
    }

    pub async fn schedule(&self, draft: &MaintenanceDraft) -> Result<ActionResponse, ViewError> {
        let request = draft.to_request()?;
        let resp = self.api.schedule_maintenance(&request).await?;
        info!("[scheduler] {} maintenance booked for {} on {}", request.maintenance_type, request.equipment_id, request.maintenance_date);
        Ok(resp)
    }
}
