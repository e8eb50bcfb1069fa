/**
 * COUCHE API - Un appel REST par opération du dashboard
 *
 * RÔLE :
 * `MaintenanceApi` est la frontière avec le backend externe. Toutes les vues
 * passent par `FallbackApi`, qui applique le contrat de repli de chaque endpoint.
 *
 * FONCTIONNEMENT :
 * - `HttpApi` : implémentation reqwest (une requête, pas de retry ni backoff)
 * - `FallbackApi` : sur échec, soit payload synthétique de même forme (marqué
 *   `DataSource::Synthetic`), soit erreur propagée, selon `Endpoint::default_policy`
 * - Jamais d'objet partiellement rempli : le payload complet décode, ou l'appel échoue
 */

use async_trait::async_trait;
use serde::Serialize;
use std::sync::Arc;

use crate::error::ApiError;
use crate::models::{
    ActionResponse, AlertRule, AuthResponse, ComparativePoint, ConnectorConfig, ConnectorStatus, Equipment,
    EquipmentDetails, FeatureImportance, LoginRequest, MaintenanceRequest, ModelSettings, NotificationSettings, PredictionRequest,
    PredictionResult, ProfileUpdate, RegisterRequest, ReliabilityScore, RoiSummary, SensorMetric, SensorReading,
    TrainingRequest, TrainingResponse, UploadSummary, User,
};

pub mod fallback;
pub mod http;

#[cfg(test)]
pub(crate) mod testing;

pub use fallback::{Endpoint, FallbackApi, FallbackPolicy};
pub use http::HttpApi;

/// Handle partagé par toutes les vues
pub type SharedApi<A> = Arc<FallbackApi<A>>;

#[async_trait]
pub trait MaintenanceApi: Send + Sync {
    /// GET /equipment
    async fn list_equipment(&self) -> Result<Vec<Equipment>, ApiError>;
    /// GET /equipment/{id}
    async fn equipment_details(&self, equipment_id: &str) -> Result<EquipmentDetails, ApiError>;
    /// GET /equipment/{id}/readings?limit=N
    async fn equipment_readings(&self, equipment_id: &str, limit: usize) -> Result<Vec<SensorReading>, ApiError>;
    /// POST /predict
    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, ApiError>;
    /// POST /maintenance/create
    async fn schedule_maintenance(&self, request: &MaintenanceRequest) -> Result<ActionResponse, ApiError>;
    /// POST /upload-historical-data (multipart)
    async fn upload_historical_data(&self, file_name: &str, content: Vec<u8>) -> Result<UploadSummary, ApiError>;
    /// POST /connector/setup
    async fn setup_connector(&self, config: &ConnectorConfig) -> Result<ActionResponse, ApiError>;
    /// DELETE /connector/{equipment_id}
    async fn stop_connector(&self, equipment_id: &str) -> Result<ActionResponse, ApiError>;
    /// GET /connector
    async fn list_connectors(&self) -> Result<Vec<ConnectorStatus>, ApiError>;
    /// GET /analytics/comparative
    async fn comparative_analytics(
        &self,
        metric: SensorMetric,
        equipment_ids: &[String],
    ) -> Result<Vec<ComparativePoint>, ApiError>;
    /// GET /analytics/roi
    async fn maintenance_roi(&self, period: &str) -> Result<RoiSummary, ApiError>;
    /// GET /analytics/reliability
    async fn reliability_scores(&self) -> Result<ReliabilityScore, ApiError>;
    /// GET /analytics/feature-importance
    async fn feature_importance(&self) -> Result<Vec<FeatureImportance>, ApiError>;
    /// GET /settings/alert-rules
    async fn get_alert_rules(&self) -> Result<Vec<AlertRule>, ApiError>;
    /// POST /settings/alert-rules (remplace la liste complète)
    async fn save_alert_rules(&self, rules: &[AlertRule]) -> Result<(), ApiError>;
    /// GET /settings/model
    async fn get_model_settings(&self) -> Result<ModelSettings, ApiError>;
    /// POST /settings/model
    async fn save_model_settings(&self, settings: &ModelSettings) -> Result<(), ApiError>;
    /// GET /settings/notifications
    async fn get_notification_settings(&self) -> Result<NotificationSettings, ApiError>;
    /// POST /settings/notifications
    async fn save_notification_settings(&self, settings: &NotificationSettings) -> Result<(), ApiError>;
    /// POST /settings/profile
    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError>;
    /// POST /model/train
    async fn train_model(&self, request: &TrainingRequest) -> Result<TrainingResponse, ApiError>;
    /// POST /auth/login
    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError>;
    /// POST /auth/register
    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError>;
    /// Bearer token joint aux requêtes suivantes
    fn set_token(&self, token: Option<String>);
}

/// Provenance d'un payload affiché
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize)]
#[serde(tag = "kind", rename_all = "lowercase")]
pub enum DataSource {
    #[default]
    Live,
    /// Backend en échec : données générées localement
    Synthetic { reason: String },
}

impl DataSource {
    pub fn is_synthetic(&self) -> bool {
        matches!(self, DataSource::Synthetic { .. })
    }

    /// Provenance de plusieurs fetchs combinés : synthétique dès qu'un seul l'est.
    pub fn merge(self, other: &DataSource) -> DataSource {
        match (&self, other) {
            (DataSource::Live, DataSource::Synthetic { .. }) => other.clone(),
            _ => self,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Fetched<T> {
    pub data: T,
    pub source: DataSource,
}

impl<T> Fetched<T> {
    pub fn live(data: T) -> Self {
        Self { data, source: DataSource::Live }
    }

    pub fn synthetic(data: T, reason: impl Into<String>) -> Self {
        Self { data, source: DataSource::Synthetic { reason: reason.into() } }
    }

    pub fn is_synthetic(&self) -> bool {
        self.source.is_synthetic()
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Fetched<U> {
        Fetched { data: f(self.data), source: self.source }
    }
}
