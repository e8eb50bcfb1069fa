//! Per-endpoint failure contract.
//!
//! Read endpoints synthesize a same-shape payload when the backend fails and
//! tag it `DataSource::Synthetic`; mutations and auth always propagate.

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::future::Future;
use tracing::warn;

use super::{Fetched, MaintenanceApi};
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::mock;
use crate::models::{
    ActionResponse, AlertRule, AuthResponse, ComparativePoint, ConnectorConfig, ConnectorStatus, Equipment,
    EquipmentDetails, FeatureImportance, LoginRequest, MaintenanceRequest, ModelSettings, NotificationSettings,
    PredictionRequest, PredictionResult, ProfileUpdate, RegisterRequest, ReliabilityScore, RoiSummary, SensorMetric, SensorReading,
    TrainingRequest, TrainingResponse, UploadSummary, User,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FallbackPolicy {
    /// Renvoie un payload mock de même forme, marqué synthétique
    Synthesize,
    /// Renvoie l'erreur à l'appelant (bannière)
    Propagate,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Endpoint {
    ListEquipment,
    EquipmentDetails,
    EquipmentReadings,
    Predict,
    ScheduleMaintenance,
    UploadHistoricalData,
    SetupConnector,
    StopConnector,
    ListConnectors,
    ComparativeAnalytics,
    MaintenanceRoi,
    ReliabilityScores,
    FeatureImportance,
    GetAlertRules,
    SaveAlertRules,
    GetModelSettings,
    SaveModelSettings,
    GetNotificationSettings,
    SaveNotificationSettings,
    UpdateProfile,
    TrainModel,
    Login,
    Register,
}

impl Endpoint {
    pub const ALL: [Endpoint; 23] = [
        Endpoint::ListEquipment,
        Endpoint::EquipmentDetails,
        Endpoint::EquipmentReadings,
        Endpoint::Predict,
        Endpoint::ScheduleMaintenance,
        Endpoint::UploadHistoricalData,
        Endpoint::SetupConnector,
        Endpoint::StopConnector,
        Endpoint::ListConnectors,
        Endpoint::ComparativeAnalytics,
        Endpoint::MaintenanceRoi,
        Endpoint::ReliabilityScores,
        Endpoint::FeatureImportance,
        Endpoint::GetAlertRules,
        Endpoint::SaveAlertRules,
        Endpoint::GetModelSettings,
        Endpoint::SaveModelSettings,
        Endpoint::GetNotificationSettings,
        Endpoint::SaveNotificationSettings,
        Endpoint::UpdateProfile,
        Endpoint::TrainModel,
        Endpoint::Login,
        Endpoint::Register,
    ];

    /// Contrat canonique : lectures synthétisées, mutations et auth propagées.
    pub const fn default_policy(self) -> FallbackPolicy {
        match self {
            Endpoint::ListEquipment
            | Endpoint::EquipmentDetails
            | Endpoint::EquipmentReadings
            | Endpoint::Predict
            | Endpoint::ComparativeAnalytics
            | Endpoint::MaintenanceRoi
            | Endpoint::ReliabilityScores
            | Endpoint::FeatureImportance
            | Endpoint::GetAlertRules
            | Endpoint::GetModelSettings
            | Endpoint::GetNotificationSettings => FallbackPolicy::Synthesize,
            Endpoint::ScheduleMaintenance
            | Endpoint::UploadHistoricalData
            | Endpoint::SetupConnector
            | Endpoint::StopConnector
            | Endpoint::ListConnectors
            | Endpoint::SaveAlertRules
            | Endpoint::SaveModelSettings
            | Endpoint::SaveNotificationSettings
            | Endpoint::UpdateProfile
            | Endpoint::TrainModel
            | Endpoint::Login
            | Endpoint::Register => FallbackPolicy::Propagate,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Endpoint::ListEquipment => "list_equipment",
            Endpoint::EquipmentDetails => "equipment_details",
            Endpoint::EquipmentReadings => "equipment_readings",
            Endpoint::Predict => "predict",
            Endpoint::ScheduleMaintenance => "schedule_maintenance",
            Endpoint::UploadHistoricalData => "upload_historical_data",
            Endpoint::SetupConnector => "setup_connector",
            Endpoint::StopConnector => "stop_connector",
            Endpoint::ListConnectors => "list_connectors",
            Endpoint::ComparativeAnalytics => "comparative_analytics",
            Endpoint::MaintenanceRoi => "maintenance_roi",
            Endpoint::ReliabilityScores => "reliability_scores",
            Endpoint::FeatureImportance => "feature_importance",
            Endpoint::GetAlertRules => "get_alert_rules",
            Endpoint::SaveAlertRules => "save_alert_rules",
            Endpoint::GetModelSettings => "get_model_settings",
            Endpoint::SaveModelSettings => "save_model_settings",
            Endpoint::GetNotificationSettings => "get_notification_settings",
            Endpoint::SaveNotificationSettings => "save_notification_settings",
            Endpoint::UpdateProfile => "update_profile",
            Endpoint::TrainModel => "train_model",
            Endpoint::Login => "login",
            Endpoint::Register => "register",
        }
    }

    /// Inverse de `name`, pour les clés de `fallback.overrides`
    pub fn from_name(name: &str) -> Option<Endpoint> {
        Endpoint::ALL.into_iter().find(|e| e.name() == name)
    }
}

pub struct FallbackApi<A> {
    inner: A,
    synthesize: bool,
    overrides: HashMap<Endpoint, FallbackPolicy>,
    anchor: Option<NaiveDateTime>,
}

impl<A: MaintenanceApi> FallbackApi<A> {
    pub fn new(inner: A) -> Self {
        Self { inner, synthesize: true, overrides: HashMap::new(), anchor: None }
    }

    pub fn from_config(inner: A, config: &ClientConfig) -> Self {
        let mut api = Self::new(inner).with_synthesis(!config.fallback.disabled);
        for (name, policy) in &config.fallback.overrides {
            match Endpoint::from_name(name) {
                Some(endpoint) => api = api.with_override(endpoint, *policy),
                None => warn!("[api] unknown endpoint '{name}' in fallback.overrides, ignored"),
            }
        }
        api
    }

    /// `false` => tous les endpoints propagent (config `fallback.disabled`)
    pub fn with_synthesis(mut self, enabled: bool) -> Self {
        self.synthesize = enabled;
        self
    }

    /// Politique propre à un endpoint. Seules les lectures peuvent passer en
    /// `Propagate` : une mutation n'a pas de payload synthétique.
    pub fn with_override(mut self, endpoint: Endpoint, policy: FallbackPolicy) -> Self {
        if endpoint.default_policy() == FallbackPolicy::Propagate && policy == FallbackPolicy::Synthesize {
            warn!("[api] {} always propagates, override ignored", endpoint.name());
            return self;
        }
        self.overrides.insert(endpoint, policy);
        self
    }

    /// Fixe l'ancre temporelle des séries synthétiques
    pub fn with_anchor(mut self, anchor: NaiveDateTime) -> Self {
        self.anchor = Some(anchor);
        self
    }

    pub fn inner(&self) -> &A {
        &self.inner
    }

    pub fn policy(&self, endpoint: Endpoint) -> FallbackPolicy {
        if !self.synthesize {
            return FallbackPolicy::Propagate;
        }
        self.overrides.get(&endpoint).copied().unwrap_or(endpoint.default_policy())
    }

    pub fn set_token(&self, token: Option<String>) {
        self.inner.set_token(token);
    }

    fn anchor(&self) -> NaiveDateTime {
        self.anchor.unwrap_or_else(mock::anchor_now)
    }

    fn today(&self) -> NaiveDate {
        self.anchor().date()
    }

    async fn synthesize<T, F, M>(&self, endpoint: Endpoint, call: F, mock: M) -> Result<Fetched<T>, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
        M: FnOnce() -> T,
    {
        match call.await {
            Ok(data) => Ok(Fetched::live(data)),
            Err(err) => match self.policy(endpoint) {
                FallbackPolicy::Synthesize => {
                    warn!(endpoint = endpoint.name(), error = %err, "[api] request failed, serving synthetic data");
                    Ok(Fetched::synthetic(mock(), err.to_string()))
                }
                FallbackPolicy::Propagate => {
                    warn!(endpoint = endpoint.name(), error = %err, "[api] request failed");
                    Err(err)
                }
            },
        }
    }

    async fn propagate<T, F>(&self, endpoint: Endpoint, call: F) -> Result<T, ApiError>
    where
        F: Future<Output = Result<T, ApiError>>,
    {
        call.await.map_err(|err| {
            warn!(endpoint = endpoint.name(), error = %err, "[api] request failed");
            err
        })
    }

    // ============ LECTURES (Synthesize) ============

    pub async fn list_equipment(&self) -> Result<Fetched<Vec<Equipment>>, ApiError> {
        let today = self.today();
        self.synthesize(Endpoint::ListEquipment, self.inner.list_equipment(), || mock::mock_equipment_list(today))
            .await
    }

    pub async fn equipment_details(&self, equipment_id: &str) -> Result<Fetched<EquipmentDetails>, ApiError> {
        let today = self.today();
        self.synthesize(Endpoint::EquipmentDetails, self.inner.equipment_details(equipment_id), || {
            mock::mock_details(equipment_id, today)
        })
        .await
    }

    pub async fn equipment_readings(
        &self,
        equipment_id: &str,
        limit: usize,
    ) -> Result<Fetched<Vec<SensorReading>>, ApiError> {
        let anchor = self.anchor();
        self.synthesize(Endpoint::EquipmentReadings, self.inner.equipment_readings(equipment_id, limit), || {
            mock::mock_readings(equipment_id, limit, anchor)
        })
        .await
    }

    pub async fn predict(&self, request: &PredictionRequest) -> Result<Fetched<PredictionResult>, ApiError> {
        let today = self.today();
        self.synthesize(Endpoint::Predict, self.inner.predict(request), || {
            mock::mock_prediction(&request.equipment_id, today)
        })
        .await
    }

    pub async fn comparative_analytics(
        &self,
        metric: SensorMetric,
        equipment_ids: &[String],
    ) -> Result<Fetched<Vec<ComparativePoint>>, ApiError> {
        self.synthesize(
            Endpoint::ComparativeAnalytics,
            self.inner.comparative_analytics(metric, equipment_ids),
            || mock::mock_comparative(metric, equipment_ids),
        )
        .await
    }

    pub async fn maintenance_roi(&self, period: &str) -> Result<Fetched<RoiSummary>, ApiError> {
        self.synthesize(Endpoint::MaintenanceRoi, self.inner.maintenance_roi(period), || mock::mock_roi(period))
            .await
    }

    pub async fn reliability_scores(&self) -> Result<Fetched<ReliabilityScore>, ApiError> {
        self.synthesize(Endpoint::ReliabilityScores, self.inner.reliability_scores(), mock::mock_reliability)
            .await
    }

    pub async fn feature_importance(&self) -> Result<Fetched<Vec<FeatureImportance>>, ApiError> {
        self.synthesize(Endpoint::FeatureImportance, self.inner.feature_importance(), mock::mock_feature_importance)
            .await
    }

    pub async fn get_alert_rules(&self) -> Result<Fetched<Vec<AlertRule>>, ApiError> {
        self.synthesize(Endpoint::GetAlertRules, self.inner.get_alert_rules(), mock::mock_alert_rules)
            .await
    }

    pub async fn get_model_settings(&self) -> Result<Fetched<ModelSettings>, ApiError> {
        self.synthesize(Endpoint::GetModelSettings, self.inner.get_model_settings(), ModelSettings::default)
            .await
    }

    pub async fn get_notification_settings(&self) -> Result<Fetched<NotificationSettings>, ApiError> {
        self.synthesize(
            Endpoint::GetNotificationSettings,
            self.inner.get_notification_settings(),
            NotificationSettings::default,
        )
        .await
    }

    // ============ MUTATIONS (Propagate) ============

    pub async fn schedule_maintenance(&self, request: &MaintenanceRequest) -> Result<ActionResponse, ApiError> {
        self.propagate(Endpoint::ScheduleMaintenance, self.inner.schedule_maintenance(request)).await
    }

    pub async fn upload_historical_data(&self, file_name: &str, content: Vec<u8>) -> Result<UploadSummary, ApiError> {
        self.propagate(Endpoint::UploadHistoricalData, self.inner.upload_historical_data(file_name, content))
            .await
    }

    pub async fn setup_connector(&self, config: &ConnectorConfig) -> Result<ActionResponse, ApiError> {
        self.propagate(Endpoint::SetupConnector, self.inner.setup_connector(config)).await
    }

    pub async fn stop_connector(&self, equipment_id: &str) -> Result<ActionResponse, ApiError> {
        self.propagate(Endpoint::StopConnector, self.inner.stop_connector(equipment_id)).await
    }

    /// Le statut des connecteurs fait autorité côté serveur : jamais synthétisé.
    pub async fn list_connectors(&self) -> Result<Vec<ConnectorStatus>, ApiError> {
        self.propagate(Endpoint::ListConnectors, self.inner.list_connectors()).await
    }

    pub async fn save_alert_rules(&self, rules: &[AlertRule]) -> Result<(), ApiError> {
        self.propagate(Endpoint::SaveAlertRules, self.inner.save_alert_rules(rules)).await
    }

    pub async fn save_model_settings(&self, settings: &ModelSettings) -> Result<(), ApiError> {
        self.propagate(Endpoint::SaveModelSettings, self.inner.save_model_settings(settings)).await
    }

    pub async fn save_notification_settings(&self, settings: &NotificationSettings) -> Result<(), ApiError> {
        self.propagate(Endpoint::SaveNotificationSettings, self.inner.save_notification_settings(settings))
            .await
    }

    pub async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.propagate(Endpoint::UpdateProfile, self.inner.update_profile(update)).await
    }

    pub async fn train_model(&self, request: &TrainingRequest) -> Result<TrainingResponse, ApiError> {
        self.propagate(Endpoint::TrainModel, self.inner.train_model(request)).await
    }

    pub async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.propagate(Endpoint::Login, self.inner.login(request)).await
    }

    pub async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.propagate(Endpoint::Register, self.inner.register(request)).await
    }
}
