//! In-process fake backend for controller tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use parking_lot::Mutex;
use std::collections::{HashMap, HashSet};
use std::time::Duration;

use super::{Endpoint, MaintenanceApi};
use crate::error::ApiError;
use crate::mock;
use crate::models::{
    ActionResponse, AlertRule, AuthResponse, ComparativePoint, ConnectorConfig, ConnectorState, ConnectorStatus,
    Equipment, EquipmentDetails, FeatureImportance, LoginRequest, MaintenanceRequest, ModelSettings, NotificationSettings,
    PredictionRequest, PredictionResult, ProfileUpdate, RegisterRequest, ReliabilityScore, RoiSummary, SensorMetric,
    SensorReading, TrainingRequest, TrainingResponse, UploadSummary, User,
};

#[derive(Default)]
struct Script {
    offline: bool,
    failing: HashSet<Endpoint>,
    readings_delay: HashMap<String, Duration>,
    calls: HashMap<Endpoint, usize>,
    alert_rules: Vec<AlertRule>,
    saved_rule_batches: Vec<Vec<AlertRule>>,
    connectors: Vec<ConnectorStatus>,
    connector_setups: Vec<ConnectorConfig>,
    scheduled: Vec<MaintenanceRequest>,
    uploads: Vec<(String, usize)>,
    model_settings: Option<ModelSettings>,
    notification_settings: Option<NotificationSettings>,
    token: Option<String>,
}

pub struct ScriptedApi {
    script: Mutex<Script>,
    today: NaiveDate,
}

impl ScriptedApi {
    pub fn new() -> Self {
        let script = Script { alert_rules: mock::mock_alert_rules(), ..Script::default() };
        Self { script: Mutex::new(script), today: NaiveDate::from_ymd_opt(2024, 6, 1).unwrap() }
    }

    pub fn set_offline(&self, offline: bool) {
        self.script.lock().offline = offline;
    }

    pub fn fail(&self, endpoint: Endpoint) {
        self.script.lock().failing.insert(endpoint);
    }

    pub fn recover(&self, endpoint: Endpoint) {
        self.script.lock().failing.remove(&endpoint);
    }

    pub fn delay_readings(&self, equipment_id: &str, delay: Duration) {
        self.script.lock().readings_delay.insert(equipment_id.to_string(), delay);
    }

    pub fn calls(&self, endpoint: Endpoint) -> usize {
        self.script.lock().calls.get(&endpoint).copied().unwrap_or(0)
    }

    pub fn saved_rule_batches(&self) -> Vec<Vec<AlertRule>> {
        self.script.lock().saved_rule_batches.clone()
    }

    pub fn connector_setups(&self) -> Vec<ConnectorConfig> {
        self.script.lock().connector_setups.clone()
    }

    pub fn scheduled(&self) -> Vec<MaintenanceRequest> {
        self.script.lock().scheduled.clone()
    }

    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.script.lock().uploads.clone()
    }

    pub fn token(&self) -> Option<String> {
        self.script.lock().token.clone()
    }

    /// Compte l'appel puis applique les pannes injectées
    fn enter(&self, endpoint: Endpoint) -> Result<(), ApiError> {
        let mut script = self.script.lock();
        *script.calls.entry(endpoint).or_default() += 1;
        if script.offline {
            return Err(ApiError::Transport("connection refused".into()));
        }
        if script.failing.contains(&endpoint) {
            return Err(ApiError::Status { status: 500, message: format!("{} failed", endpoint.name()) });
        }
        Ok(())
    }

    fn user(email: &str, name: &str) -> User {
        User { id: "u-1".into(), name: name.into(), email: email.into(), role: "Technician".into() }
    }
}

#[async_trait]
impl MaintenanceApi for ScriptedApi {
    async fn list_equipment(&self) -> Result<Vec<Equipment>, ApiError> {
        self.enter(Endpoint::ListEquipment)?;
        Ok(mock::mock_equipment_list(self.today))
    }

    async fn equipment_details(&self, equipment_id: &str) -> Result<EquipmentDetails, ApiError> {
        self.enter(Endpoint::EquipmentDetails)?;
        Ok(mock::mock_details(equipment_id, self.today))
    }

    async fn equipment_readings(&self, equipment_id: &str, limit: usize) -> Result<Vec<SensorReading>, ApiError> {
        let delay = self.script.lock().readings_delay.get(equipment_id).copied();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.enter(Endpoint::EquipmentReadings)?;
        let anchor = self.today.and_hms_opt(12, 0, 0).unwrap();
        // newest-first, like the backend's readings endpoint
        let mut readings = mock::mock_readings(equipment_id, limit, anchor);
        readings.reverse();
        Ok(readings)
    }

    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, ApiError> {
        self.enter(Endpoint::Predict)?;
        Ok(mock::mock_prediction(&request.equipment_id, self.today))
    }

    async fn schedule_maintenance(&self, request: &MaintenanceRequest) -> Result<ActionResponse, ApiError> {
        self.enter(Endpoint::ScheduleMaintenance)?;
        self.script.lock().scheduled.push(request.clone());
        Ok(ActionResponse {
            message: "Maintenance scheduled".into(),
            equipment_id: Some(request.equipment_id.clone()),
            status: Some("scheduled".into()),
        })
    }

    async fn upload_historical_data(&self, file_name: &str, content: Vec<u8>) -> Result<UploadSummary, ApiError> {
        self.enter(Endpoint::UploadHistoricalData)?;
        let lines = content.split(|b| *b == b'\n').filter(|l| !l.is_empty()).count();
        self.script.lock().uploads.push((file_name.to_string(), content.len()));
        Ok(UploadSummary { message: "Upload complete".into(), readings_processed: lines.saturating_sub(1) as u64 })
    }

    async fn setup_connector(&self, config: &ConnectorConfig) -> Result<ActionResponse, ApiError> {
        self.enter(Endpoint::SetupConnector)?;
        let mut script = self.script.lock();
        script.connector_setups.push(config.clone());
        script.connectors.retain(|c| c.equipment_id != config.equipment_id);
        script.connectors.push(ConnectorStatus {
            equipment_id: config.equipment_id.clone(),
            connector_type: config.connector_type.as_str().to_string(),
            status: ConnectorState::Active,
        });
        Ok(ActionResponse { message: "Connector started".into(), equipment_id: Some(config.equipment_id.clone()), status: None })
    }

    async fn stop_connector(&self, equipment_id: &str) -> Result<ActionResponse, ApiError> {
        self.enter(Endpoint::StopConnector)?;
        let mut script = self.script.lock();
        let before = script.connectors.len();
        script.connectors.retain(|c| c.equipment_id != equipment_id);
        if script.connectors.len() == before {
            return Err(ApiError::Status { status: 404, message: format!("No connector for {equipment_id}") });
        }
        Ok(ActionResponse { message: "Connector stopped".into(), equipment_id: Some(equipment_id.into()), status: None })
    }

    async fn list_connectors(&self) -> Result<Vec<ConnectorStatus>, ApiError> {
        self.enter(Endpoint::ListConnectors)?;
        Ok(self.script.lock().connectors.clone())
    }

    async fn comparative_analytics(
        &self,
        metric: SensorMetric,
        equipment_ids: &[String],
    ) -> Result<Vec<ComparativePoint>, ApiError> {
        self.enter(Endpoint::ComparativeAnalytics)?;
        Ok(mock::mock_comparative(metric, equipment_ids))
    }

    async fn maintenance_roi(&self, period: &str) -> Result<RoiSummary, ApiError> {
        self.enter(Endpoint::MaintenanceRoi)?;
        Ok(mock::mock_roi(period))
    }

    async fn reliability_scores(&self) -> Result<ReliabilityScore, ApiError> {
        self.enter(Endpoint::ReliabilityScores)?;
        Ok(mock::mock_reliability())
    }

    async fn feature_importance(&self) -> Result<Vec<FeatureImportance>, ApiError> {
        self.enter(Endpoint::FeatureImportance)?;
        Ok(mock::mock_feature_importance())
    }

    async fn get_alert_rules(&self) -> Result<Vec<AlertRule>, ApiError> {
        self.enter(Endpoint::GetAlertRules)?;
        Ok(self.script.lock().alert_rules.clone())
    }

    async fn save_alert_rules(&self, rules: &[AlertRule]) -> Result<(), ApiError> {
        self.enter(Endpoint::SaveAlertRules)?;
        let mut script = self.script.lock();
        script.alert_rules = rules.to_vec();
        script.saved_rule_batches.push(rules.to_vec());
        Ok(())
    }

    async fn get_model_settings(&self) -> Result<ModelSettings, ApiError> {
        self.enter(Endpoint::GetModelSettings)?;
        Ok(self.script.lock().model_settings.clone().unwrap_or_default())
    }

    async fn save_model_settings(&self, settings: &ModelSettings) -> Result<(), ApiError> {
        self.enter(Endpoint::SaveModelSettings)?;
        self.script.lock().model_settings = Some(settings.clone());
        Ok(())
    }

    async fn get_notification_settings(&self) -> Result<NotificationSettings, ApiError> {
        self.enter(Endpoint::GetNotificationSettings)?;
        Ok(self.script.lock().notification_settings.clone().unwrap_or_default())
    }

    async fn save_notification_settings(&self, settings: &NotificationSettings) -> Result<(), ApiError> {
        self.enter(Endpoint::SaveNotificationSettings)?;
        self.script.lock().notification_settings = Some(settings.clone());
        Ok(())
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.enter(Endpoint::UpdateProfile)?;
        if self.script.lock().token.is_none() {
            return Err(ApiError::Unauthorized);
        }
        let email = update.email.clone().unwrap_or_else(|| "tech@example.com".into());
        let name = update.name.clone().unwrap_or_else(|| "Technician".into());
        Ok(Self::user(&email, &name))
    }

    async fn train_model(&self, request: &TrainingRequest) -> Result<TrainingResponse, ApiError> {
        self.enter(Endpoint::TrainModel)?;
        Ok(TrainingResponse { message: format!("{} model trained", request.model_type), accuracy: Some(0.92) })
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.enter(Endpoint::Login)?;
        if request.email == "tech@example.com" && request.password == "tech1234" {
            return Ok(AuthResponse { token: "live-token".into(), user: Self::user(&request.email, "Technician") });
        }
        Err(ApiError::Unauthorized)
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.enter(Endpoint::Register)?;
        Ok(AuthResponse { token: "registered-token".into(), user: Self::user(&request.email, &request.name) })
    }

    fn set_token(&self, token: Option<String>) {
        self.script.lock().token = token;
    }
}
