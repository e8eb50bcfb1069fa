/**
 * BACKEND STUB - Contrat REST du service de maintenance, en mémoire
 *
 * RÔLE :
 * Sert le même contrat que le backend réel sous `/api` pour que les tests
 * traversent la vraie pile `HttpApi` (reqwest, JSON, multipart, bearer).
 *
 * FONCTIONNEMENT :
 * - État partagé `Shared<StubData>` (Arc + parking_lot::Mutex)
 * - Middleware `inject_faults` : compte chaque appel par route ("GET /equipment"),
 *   répond 503 quand le backend est marqué hors ligne, 500 `{"detail"}` pour
 *   les routes en échec
 * - Lectures renvoyées du plus récent au plus ancien, prédiction avec les
 *   noms de champs du backend (`probability`, `estimated_time_to_failure`)
 * - Corps bruts de `/connector/setup` conservés pour vérifier le typage
 */

use axum::extract::{MatchedPath, Multipart, Path, Query, Request, State};
use axum::http::{HeaderMap, StatusCode};
use axum::middleware::{self, Next};
use axum::response::{IntoResponse, Response};
use axum::routing::{delete, get, post};
use axum::{Json, Router};
use chrono::{NaiveDate, NaiveDateTime};
use parking_lot::Mutex;
use serde::Deserialize;
use serde_json::{json, Value};
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;

use vigie_client::mock;
use vigie_client::models::{
    ActionResponse, AlertRule, AuthResponse, ComparativePoint, ConnectorConfig, ConnectorState, ConnectorStatus,
    Equipment, EquipmentDetails, FeatureImportance, LoginRequest, MaintenanceRequest, ModelSettings,
    NotificationSettings, PredictionRequest, ProfileUpdate, RegisterRequest, ReliabilityScore, RoiSummary, SensorMetric, SensorReading,
    TrainingRequest, TrainingResponse, UploadSummary, User,
};

pub type Shared<T> = Arc<Mutex<T>>;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<Value>)>;

fn detail(status: StatusCode, message: impl Into<String>) -> (StatusCode, Json<Value>) {
    (status, Json(json!({ "detail": message.into() })))
}

#[derive(Debug, Clone)]
pub struct StubUser {
    pub user: User,
    pub password: String,
}

/// Tout ce que le stub sert ou enregistre
pub struct StubData {
    pub today: NaiveDate,
    pub anchor: NaiveDateTime,
    pub equipment: Vec<Equipment>,
    pub alert_rules: Vec<AlertRule>,
    pub saved_rule_batches: Vec<Vec<AlertRule>>,
    pub model_settings: ModelSettings,
    pub notification_settings: NotificationSettings,
    pub connectors: Vec<ConnectorStatus>,
    pub connector_bodies: Vec<Value>,
    pub scheduled: Vec<MaintenanceRequest>,
    pub uploads: Vec<(String, usize)>,
    pub users: Vec<StubUser>,
    pub tokens: HashMap<String, String>,
    pub calls: HashMap<String, usize>,
    pub offline: bool,
    pub failing: HashSet<String>,
    pub readings_delay: HashMap<String, Duration>,
    next_token: u64,
}

impl Default for StubData {
    fn default() -> Self {
        let anchor = mock::anchor_now();
        let today = anchor.date();
        Self {
            today,
            anchor,
            equipment: mock::mock_equipment_list(today),
            alert_rules: mock::mock_alert_rules(),
            saved_rule_batches: Vec::new(),
            model_settings: ModelSettings::default(),
            notification_settings: NotificationSettings::default(),
            connectors: Vec::new(),
            connector_bodies: Vec::new(),
            scheduled: Vec::new(),
            uploads: Vec::new(),
            users: vec![StubUser {
                user: User {
                    id: "42".into(),
                    name: "Field Technician".into(),
                    email: "tech@example.com".into(),
                    role: "Technician".into(),
                },
                password: "tech1234".into(),
            }],
            tokens: HashMap::new(),
            calls: HashMap::new(),
            offline: false,
            failing: HashSet::new(),
            readings_delay: HashMap::new(),
            next_token: 0,
        }
    }
}

impl StubData {
    fn knows(&self, equipment_id: &str) -> bool {
        self.equipment.iter().any(|e| e.equipment_id == equipment_id)
    }

    fn issue_token(&mut self, email: &str) -> String {
        self.next_token += 1;
        let token = format!("stub-token-{}", self.next_token);
        self.tokens.insert(token.clone(), email.to_string());
        token
    }
}

#[derive(Clone, Default)]
pub struct StubState {
    pub data: Shared<StubData>,
}

impl StubState {
    pub fn new() -> Self {
        Self::default()
    }
}

pub fn build_router(state: StubState) -> Router {
    let api = Router::new()
        .route("/equipment", get(list_equipment))
        .route("/equipment/{id}", get(equipment_details))
        .route("/equipment/{id}/readings", get(equipment_readings))
        .route("/predict", post(predict))
        .route("/maintenance/create", post(schedule_maintenance))
        .route("/upload-historical-data", post(upload_historical_data))
        .route("/connector", get(list_connectors))
        .route("/connector/setup", post(setup_connector))
        .route("/connector/{id}", delete(stop_connector))
        .route("/analytics/comparative", get(comparative))
        .route("/analytics/roi", get(roi))
        .route("/analytics/reliability", get(reliability))
        .route("/analytics/feature-importance", get(feature_importance))
        .route("/settings/alert-rules", get(get_alert_rules).post(save_alert_rules))
        .route("/settings/model", get(get_model_settings).post(save_model_settings))
        .route("/settings/notifications", get(get_notification_settings).post(save_notification_settings))
        .route("/settings/profile", post(update_profile))
        .route("/model/train", post(train_model))
        .route("/auth/login", post(login))
        .route("/auth/register", post(register))
        .layer(middleware::from_fn_with_state(state.clone(), inject_faults))
        .with_state(state);

    Router::new().nest("/api", api)
}

/// Clé de route stable : "METHOD /chemin/{param}" sans le préfixe /api
pub fn route_key(method: &str, path: &str) -> String {
    format!("{} {}", method, path.strip_prefix("/api").unwrap_or(path))
}

async fn inject_faults(State(state): State<StubState>, req: Request, next: Next) -> Response {
    let path = req
        .extensions()
        .get::<MatchedPath>()
        .map(|m| m.as_str().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let key = route_key(req.method().as_str(), &path);

    let (offline, failing) = {
        let mut data = state.data.lock();
        *data.calls.entry(key.clone()).or_default() += 1;
        (data.offline, data.failing.contains(&key))
    };

    if offline {
        log::debug!("[stub] {key} -> 503 (offline)");
        return detail(StatusCode::SERVICE_UNAVAILABLE, "Backend offline").into_response();
    }
    if failing {
        log::debug!("[stub] {key} -> 500 (injected)");
        return detail(StatusCode::INTERNAL_SERVER_ERROR, format!("Injected failure on {key}")).into_response();
    }
    next.run(req).await
}

// ============ ÉQUIPEMENTS / LECTURES ============

async fn list_equipment(State(state): State<StubState>) -> Json<Vec<Equipment>> {
    Json(state.data.lock().equipment.clone())
}

async fn equipment_details(State(state): State<StubState>, Path(id): Path<String>) -> ApiResult<EquipmentDetails> {
    let data = state.data.lock();
    if !data.knows(&id) {
        return Err(detail(StatusCode::NOT_FOUND, format!("Equipment {id} not found")));
    }
    Ok(Json(mock::mock_details(&id, data.today)))
}

#[derive(Debug, Deserialize)]
struct ReadingsParams {
    limit: Option<usize>,
}

async fn equipment_readings(
    State(state): State<StubState>,
    Path(id): Path<String>,
    Query(params): Query<ReadingsParams>,
) -> ApiResult<Vec<SensorReading>> {
    let (known, anchor, delay) = {
        let data = state.data.lock();
        (data.knows(&id), data.anchor, data.readings_delay.get(&id).copied())
    };
    if let Some(delay) = delay {
        tokio::time::sleep(delay).await;
    }
    if !known {
        return Err(detail(StatusCode::NOT_FOUND, format!("Equipment {id} not found")));
    }
    let mut readings = mock::mock_readings(&id, params.limit.unwrap_or(100), anchor);
    readings.reverse();
    Ok(Json(readings))
}

async fn predict(State(state): State<StubState>, Json(request): Json<PredictionRequest>) -> ApiResult<Value> {
    let today = state.data.lock().today;
    let p = mock::mock_prediction(&request.equipment_id, today);
    Ok(Json(json!({
        "equipment_id": p.equipment_id,
        "prediction": p.prediction,
        "probability": p.failure_probability,
        "confidence": p.confidence,
        "estimated_time_to_failure": p.remaining_useful_life,
        "anomaly_detected": p.anomaly_detected,
        "anomaly_score": p.anomaly_score,
        "recommended_action": p.recommended_action,
        "next_maintenance_date": p.next_maintenance_date,
        "maintenance_required": p.maintenance_required,
    })))
}

// ============ MAINTENANCE / IMPORT ============

async fn schedule_maintenance(
    State(state): State<StubState>,
    Json(request): Json<MaintenanceRequest>,
) -> ApiResult<ActionResponse> {
    let mut data = state.data.lock();
    if !data.knows(&request.equipment_id) {
        return Err(detail(StatusCode::NOT_FOUND, format!("Equipment {} not found", request.equipment_id)));
    }
    let equipment_id = request.equipment_id.clone();
    data.scheduled.push(request);
    Ok(Json(ActionResponse {
        message: "Maintenance scheduled successfully".into(),
        equipment_id: Some(equipment_id),
        status: Some("scheduled".into()),
    }))
}

async fn upload_historical_data(State(state): State<StubState>, mut multipart: Multipart) -> ApiResult<UploadSummary> {
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|e| detail(StatusCode::BAD_REQUEST, e.to_string()))?
    {
        if field.name() != Some("file") {
            continue;
        }
        let file_name = field.file_name().unwrap_or("upload").to_string();
        let bytes = field.bytes().await.map_err(|e| detail(StatusCode::BAD_REQUEST, e.to_string()))?;
        // une ligne d'en-tête, puis une lecture par ligne
        let rows = String::from_utf8_lossy(&bytes).lines().filter(|l| !l.trim().is_empty()).count();
        let processed = rows.saturating_sub(1);
        state.data.lock().uploads.push((file_name.clone(), bytes.len()));
        return Ok(Json(UploadSummary {
            message: format!("Processed {processed} readings from {file_name}"),
            readings_processed: processed as u64,
        }));
    }
    Err(detail(StatusCode::UNPROCESSABLE_ENTITY, "Missing 'file' part"))
}

// ============ CONNECTEURS ============

async fn list_connectors(State(state): State<StubState>) -> Json<Vec<ConnectorStatus>> {
    Json(state.data.lock().connectors.clone())
}

async fn setup_connector(State(state): State<StubState>, Json(body): Json<Value>) -> ApiResult<ActionResponse> {
    let mut data = state.data.lock();
    data.connector_bodies.push(body.clone());
    let config: ConnectorConfig =
        serde_json::from_value(body).map_err(|e| detail(StatusCode::UNPROCESSABLE_ENTITY, e.to_string()))?;
    if !data.knows(&config.equipment_id) {
        return Err(detail(StatusCode::NOT_FOUND, format!("Equipment {} not found", config.equipment_id)));
    }

    let connector_type = config.connector_type.as_str().to_string();
    data.connectors.retain(|c| c.equipment_id != config.equipment_id);
    data.connectors.push(ConnectorStatus {
        equipment_id: config.equipment_id.clone(),
        connector_type: connector_type.clone(),
        status: ConnectorState::Active,
    });
    Ok(Json(ActionResponse {
        message: format!("{connector_type} connector started for {}", config.equipment_id),
        equipment_id: Some(config.equipment_id),
        status: Some("running".into()),
    }))
}

async fn stop_connector(State(state): State<StubState>, Path(id): Path<String>) -> ApiResult<ActionResponse> {
    let mut data = state.data.lock();
    let mut stopped = false;
    for connector in data.connectors.iter_mut().filter(|c| c.equipment_id == id) {
        connector.status = ConnectorState::Inactive;
        stopped = true;
    }
    if !stopped {
        return Err(detail(StatusCode::NOT_FOUND, "No connectors found for this equipment"));
    }
    Ok(Json(ActionResponse {
        message: format!("Connectors stopped for {id}"),
        equipment_id: Some(id),
        status: Some("stopped".into()),
    }))
}

// ============ ANALYTICS ============

#[derive(Debug, Deserialize)]
struct ComparativeParams {
    metric: Option<String>,
    #[serde(rename = "equipmentIds")]
    equipment_ids: Option<String>,
}

async fn comparative(Query(params): Query<ComparativeParams>) -> ApiResult<Vec<ComparativePoint>> {
    let metric = match params.metric.as_deref() {
        Some(raw) => raw
            .parse::<SensorMetric>()
            .map_err(|_| detail(StatusCode::BAD_REQUEST, format!("Unknown metric '{raw}'")))?,
        None => SensorMetric::Temperature,
    };
    let ids: Vec<String> = params
        .equipment_ids
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    Ok(Json(mock::mock_comparative(metric, &ids)))
}

#[derive(Debug, Deserialize)]
struct RoiParams {
    period: Option<String>,
}

async fn roi(Query(params): Query<RoiParams>) -> Json<RoiSummary> {
    Json(mock::mock_roi(params.period.as_deref().unwrap_or("12months")))
}

async fn reliability() -> Json<ReliabilityScore> {
    Json(mock::mock_reliability())
}

async fn feature_importance() -> Json<Vec<FeatureImportance>> {
    Json(mock::mock_feature_importance())
}

// ============ PARAMÈTRES ============

async fn get_alert_rules(State(state): State<StubState>) -> Json<Vec<AlertRule>> {
    Json(state.data.lock().alert_rules.clone())
}

async fn save_alert_rules(State(state): State<StubState>, Json(rules): Json<Vec<AlertRule>>) -> Json<Value> {
    let mut data = state.data.lock();
    data.alert_rules = rules.clone();
    data.saved_rule_batches.push(rules);
    Json(json!({ "message": "Alert rules saved" }))
}

async fn get_model_settings(State(state): State<StubState>) -> Json<ModelSettings> {
    Json(state.data.lock().model_settings.clone())
}

async fn save_model_settings(State(state): State<StubState>, Json(settings): Json<ModelSettings>) -> Json<Value> {
    state.data.lock().model_settings = settings;
    Json(json!({ "message": "Model settings saved" }))
}

async fn get_notification_settings(State(state): State<StubState>) -> Json<NotificationSettings> {
    Json(state.data.lock().notification_settings.clone())
}

async fn save_notification_settings(
    State(state): State<StubState>,
    Json(settings): Json<NotificationSettings>,
) -> Json<Value> {
    state.data.lock().notification_settings = settings;
    Json(json!({ "message": "Notification settings saved" }))
}

async fn train_model(Json(request): Json<TrainingRequest>) -> Json<TrainingResponse> {
    let scope = request.equipment_id.as_deref().unwrap_or("all equipment");
    Json(TrainingResponse {
        message: format!("{} model trained on {scope}", request.model_type),
        accuracy: Some(0.91),
    })
}

// ============ AUTHENTIFICATION ============

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get("authorization")
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
}

async fn update_profile(
    State(state): State<StubState>,
    headers: HeaderMap,
    Json(update): Json<ProfileUpdate>,
) -> ApiResult<User> {
    let mut data = state.data.lock();
    let email = bearer(&headers)
        .and_then(|t| data.tokens.get(t).cloned())
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Not authenticated"))?;
    let account = data
        .users
        .iter_mut()
        .find(|u| u.user.email == email)
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Not authenticated"))?;

    if let Some(new_password) = update.new_password {
        if update.current_password.as_deref() != Some(account.password.as_str()) {
            return Err(detail(StatusCode::BAD_REQUEST, "Current password is incorrect"));
        }
        account.password = new_password;
    }
    if let Some(name) = update.name {
        account.user.name = name;
    }
    if let Some(new_email) = update.email {
        account.user.email = new_email;
    }
    let user = account.user.clone();
    for owner in data.tokens.values_mut().filter(|e| **e == email) {
        *owner = user.email.clone();
    }
    Ok(Json(user))
}

async fn login(State(state): State<StubState>, Json(request): Json<LoginRequest>) -> ApiResult<AuthResponse> {
    let mut data = state.data.lock();
    let user = data
        .users
        .iter()
        .find(|u| u.user.email == request.email && u.password == request.password)
        .map(|u| u.user.clone())
        .ok_or_else(|| detail(StatusCode::UNAUTHORIZED, "Invalid email or password"))?;
    let token = data.issue_token(&user.email);
    Ok(Json(AuthResponse { token, user }))
}

async fn register(State(state): State<StubState>, Json(request): Json<RegisterRequest>) -> ApiResult<AuthResponse> {
    let mut data = state.data.lock();
    if data.users.iter().any(|u| u.user.email == request.email) {
        return Err(detail(StatusCode::BAD_REQUEST, "Email already registered"));
    }
    let user = User {
        id: (100 + data.users.len()).to_string(),
        name: request.name,
        email: request.email,
        role: "Technician".into(),
    };
    data.users.push(StubUser { user: user.clone(), password: request.password });
    let token = data.issue_token(&user.email);
    Ok(Json(AuthResponse { token, user }))
}
