//! reqwest implementation of [`MaintenanceApi`].

use async_trait::async_trait;
use parking_lot::RwLock;
use reqwest::{Client, Method, RequestBuilder, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde::Serialize;
use tracing::debug;

use super::MaintenanceApi;
use crate::config::ClientConfig;
use crate::error::ApiError;
use crate::models::{
    ActionResponse, AlertRule, AuthResponse, ComparativePoint, ConnectorConfig, ConnectorStatus, Equipment,
    EquipmentDetails, FeatureImportance, LoginRequest, MaintenanceRequest, ModelSettings, NotificationSettings, PredictionRequest,
    PredictionResult, ProfileUpdate, RegisterRequest, ReliabilityScore, RoiSummary, SensorMetric, SensorReading,
    TrainingRequest, TrainingResponse, UploadSummary, User,
};

pub struct HttpApi {
    client: Client,
    base_url: Url,
    token: RwLock<Option<String>>,
}

impl HttpApi {
    pub fn new(config: &ClientConfig) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(config.request_timeout())
            .user_agent(concat!("vigie-client/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Self::with_client(client, &config.api_url)
    }

    pub fn with_client(client: Client, base_url: &str) -> Result<Self, ApiError> {
        let base_url = Url::parse(base_url).map_err(|e| ApiError::Request(format!("invalid base URL '{base_url}': {e}")))?;
        if base_url.cannot_be_a_base() {
            return Err(ApiError::Request(format!("invalid base URL '{base_url}'")));
        }
        Ok(Self { client, base_url, token: RwLock::new(None) })
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    /// Ajoute des segments encodés au chemin de base (les ids peuvent contenir '/')
    fn endpoint(&self, segments: &[&str]) -> Result<Url, ApiError> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|_| ApiError::Request(format!("invalid base URL '{}'", self.base_url)))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder, ApiError> {
        let url = self.endpoint(segments)?;
        debug!("[api] {} {}", method, url);
        let mut builder = self.client.request(method, url);
        if let Some(token) = self.token.read().as_deref() {
            builder = builder.bearer_auth(token);
        }
        Ok(builder)
    }

    async fn send_json<T: DeserializeOwned>(&self, builder: RequestBuilder) -> Result<T, ApiError> {
        let response = check_status(builder.send().await?).await?;
        response.json::<T>().await.map_err(|e| ApiError::Decode(e.to_string()))
    }

    async fn send_empty(&self, builder: RequestBuilder) -> Result<(), ApiError> {
        check_status(builder.send().await?).await.map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, segments: &[&str]) -> Result<T, ApiError> {
        self.send_json(self.request(Method::GET, segments)?).await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(&self, segments: &[&str], body: &B) -> Result<T, ApiError> {
        self.send_json(self.request(Method::POST, segments)?.json(body)).await
    }
}

/// 401 -> Unauthorized ; autre non-2xx -> Status avec le `detail` FastAPI si présent
async fn check_status(response: Response) -> Result<Response, ApiError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    if status == StatusCode::UNAUTHORIZED {
        return Err(ApiError::Unauthorized);
    }
    let body = response.text().await.unwrap_or_default();
    Err(ApiError::Status { status: status.as_u16(), message: error_message(status, &body) })
}

fn error_message(status: StatusCode, body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.get("detail").and_then(|d| d.as_str()).map(str::to_string))
        .or_else(|| (!body.trim().is_empty()).then(|| body.trim().to_string()))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("request failed").to_string())
}

#[async_trait]
impl MaintenanceApi for HttpApi {
    async fn list_equipment(&self) -> Result<Vec<Equipment>, ApiError> {
        self.get(&["equipment"]).await
    }

    async fn equipment_details(&self, equipment_id: &str) -> Result<EquipmentDetails, ApiError> {
        self.get(&["equipment", equipment_id]).await
    }

    async fn equipment_readings(&self, equipment_id: &str, limit: usize) -> Result<Vec<SensorReading>, ApiError> {
        let builder = self
            .request(Method::GET, &["equipment", equipment_id, "readings"])?
            .query(&[("limit", limit)]);
        self.send_json(builder).await
    }

    async fn predict(&self, request: &PredictionRequest) -> Result<PredictionResult, ApiError> {
        self.post(&["predict"], request).await
    }

    async fn schedule_maintenance(&self, request: &MaintenanceRequest) -> Result<ActionResponse, ApiError> {
        self.post(&["maintenance", "create"], request).await
    }

    async fn upload_historical_data(&self, file_name: &str, content: Vec<u8>) -> Result<UploadSummary, ApiError> {
        let part = reqwest::multipart::Part::bytes(content).file_name(file_name.to_string());
        let form = reqwest::multipart::Form::new().part("file", part);
        let builder = self.request(Method::POST, &["upload-historical-data"])?.multipart(form);
        self.send_json(builder).await
    }

    async fn setup_connector(&self, config: &ConnectorConfig) -> Result<ActionResponse, ApiError> {
        self.post(&["connector", "setup"], config).await
    }

    async fn stop_connector(&self, equipment_id: &str) -> Result<ActionResponse, ApiError> {
        self.send_json(self.request(Method::DELETE, &["connector", equipment_id])?).await
    }

    async fn list_connectors(&self) -> Result<Vec<ConnectorStatus>, ApiError> {
        self.get(&["connector"]).await
    }

    async fn comparative_analytics(
        &self,
        metric: SensorMetric,
        equipment_ids: &[String],
    ) -> Result<Vec<ComparativePoint>, ApiError> {
        let ids = equipment_ids.join(",");
        let builder = self
            .request(Method::GET, &["analytics", "comparative"])?
            .query(&[("metric", metric.as_str()), ("equipmentIds", ids.as_str())]);
        self.send_json(builder).await
    }

    async fn maintenance_roi(&self, period: &str) -> Result<RoiSummary, ApiError> {
        let builder = self.request(Method::GET, &["analytics", "roi"])?.query(&[("period", period)]);
        self.send_json(builder).await
    }

    async fn reliability_scores(&self) -> Result<ReliabilityScore, ApiError> {
        self.get(&["analytics", "reliability"]).await
    }

    async fn feature_importance(&self) -> Result<Vec<FeatureImportance>, ApiError> {
        self.get(&["analytics", "feature-importance"]).await
    }

    async fn get_alert_rules(&self) -> Result<Vec<AlertRule>, ApiError> {
        self.get(&["settings", "alert-rules"]).await
    }

    async fn save_alert_rules(&self, rules: &[AlertRule]) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::POST, &["settings", "alert-rules"])?.json(rules)).await
    }

    async fn get_model_settings(&self) -> Result<ModelSettings, ApiError> {
        self.get(&["settings", "model"]).await
    }

    async fn save_model_settings(&self, settings: &ModelSettings) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::POST, &["settings", "model"])?.json(settings)).await
    }

    async fn get_notification_settings(&self) -> Result<NotificationSettings, ApiError> {
        self.get(&["settings", "notifications"]).await
    }

    async fn save_notification_settings(&self, settings: &NotificationSettings) -> Result<(), ApiError> {
        self.send_empty(self.request(Method::POST, &["settings", "notifications"])?.json(settings)).await
    }

    async fn update_profile(&self, update: &ProfileUpdate) -> Result<User, ApiError> {
        self.post(&["settings", "profile"], update).await
    }

    async fn train_model(&self, request: &TrainingRequest) -> Result<TrainingResponse, ApiError> {
        self.post(&["model", "train"], request).await
    }

    async fn login(&self, request: &LoginRequest) -> Result<AuthResponse, ApiError> {
        self.post(&["auth", "login"], request).await
    }

    async fn register(&self, request: &RegisterRequest) -> Result<AuthResponse, ApiError> {
        self.post(&["auth", "register"], request).await
    }

    fn set_token(&self, token: Option<String>) {
        *self.token.write() = token;
    }
}
