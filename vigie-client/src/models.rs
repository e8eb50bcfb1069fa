/**
 * MODÈLES - Enregistrements échangés en JSON avec le backend
 *
 * RÔLE :
 * Le client ne possède aucune de ces données : il les lit, les garde dans
 * l'état local d'une vue jusqu'au prochain fetch, et renvoie les mutations
 * (règles d'alerte, connecteurs, maintenance) au backend.
 *
 * CONVENTIONS :
 * - `equipment_id` identifie une machine sur tous les endpoints (supposé, jamais vérifié)
 * - Horodatages au format backend `%Y-%m-%d %H:%M:%S` (ISO 8601 accepté en lecture)
 * - Dates calendaires au format `YYYY-MM-DD`
 */

use chrono::{NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::ValidationError;

/// Libellé affiché quand un champ d'équipement est absent
pub const UNKNOWN_LABEL: &str = "Unknown";

// ============ ÉQUIPEMENTS ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EquipmentStatus {
    Normal,
    Warning,
    Critical,
    Maintenance,
    Offline,
    #[default]
    #[serde(other)]
    Unknown,
}

impl fmt::Display for EquipmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            EquipmentStatus::Normal => "normal",
            EquipmentStatus::Warning => "warning",
            EquipmentStatus::Critical => "critical",
            EquipmentStatus::Maintenance => "maintenance",
            EquipmentStatus::Offline => "offline",
            EquipmentStatus::Unknown => "unknown",
        };
        f.write_str(label)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Equipment {
    pub equipment_id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub status: EquipmentStatus,
    #[serde(default)]
    pub location: Option<String>,
    #[serde(default, alias = "last_maintenance")]
    pub last_maintenance_date: Option<NaiveDate>,
    #[serde(default)]
    pub installation_date: Option<NaiveDate>,
    #[serde(default)]
    pub model: Option<String>,
    #[serde(default)]
    pub manufacturer: Option<String>,
    #[serde(default, rename = "type")]
    pub equipment_type: Option<String>,
}

impl Equipment {
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or(UNKNOWN_LABEL)
    }

    pub fn display_location(&self) -> &str {
        self.location.as_deref().unwrap_or(UNKNOWN_LABEL)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRecord {
    pub date: NaiveDate,
    #[serde(rename = "type")]
    pub maintenance_type: String,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub technician: Option<String>,
    #[serde(default)]
    pub cost: Option<f64>,
}

/// GET /equipment/{id}
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquipmentDetails {
    #[serde(flatten)]
    pub equipment: Equipment,
    #[serde(default)]
    pub operational_hours: Option<u64>,
    #[serde(default)]
    pub maintenance_history: Vec<MaintenanceRecord>,
    #[serde(default)]
    pub latest_prediction: Option<PredictionResult>,
}

// ============ CAPTEURS ============

/// Grandeurs mesurées par les capteurs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SensorMetric {
    Temperature,
    Vibration,
    Pressure,
    OilLevel,
    RotationSpeed,
    Voltage,
    Current,
    Humidity,
    NoiseLevel,
}

impl SensorMetric {
    pub const ALL: [SensorMetric; 9] = [
        SensorMetric::Temperature,
        SensorMetric::Vibration,
        SensorMetric::Pressure,
        SensorMetric::OilLevel,
        SensorMetric::RotationSpeed,
        SensorMetric::Voltage,
        SensorMetric::Current,
        SensorMetric::Humidity,
        SensorMetric::NoiseLevel,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SensorMetric::Temperature => "temperature",
            SensorMetric::Vibration => "vibration",
            SensorMetric::Pressure => "pressure",
            SensorMetric::OilLevel => "oil_level",
            SensorMetric::RotationSpeed => "rotation_speed",
            SensorMetric::Voltage => "voltage",
            SensorMetric::Current => "current",
            SensorMetric::Humidity => "humidity",
            SensorMetric::NoiseLevel => "noise_level",
        }
    }

    pub fn unit(&self) -> &'static str {
        match self {
            SensorMetric::Temperature => "°C",
            SensorMetric::Vibration => "mm/s",
            SensorMetric::Pressure => "PSI",
            SensorMetric::OilLevel => "%",
            SensorMetric::RotationSpeed => "RPM",
            SensorMetric::Voltage => "V",
            SensorMetric::Current => "A",
            SensorMetric::Humidity => "%",
            SensorMetric::NoiseLevel => "dB",
        }
    }
}

impl fmt::Display for SensorMetric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SensorMetric {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase().replace([' ', '-'], "_");
        SensorMetric::ALL
            .into_iter()
            .find(|m| m.as_str() == wanted)
            .ok_or_else(|| ValidationError::UnknownField(s.to_string()))
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensorReading {
    #[serde(with = "timestamp")]
    pub timestamp: NaiveDateTime,
    #[serde(default)]
    pub equipment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vibration: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pressure: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub oil_level: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rotation_speed: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub voltage: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub humidity: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub noise_level: Option<f64>,
    #[serde(default)]
    pub anomaly_detected: bool,
    #[serde(default)]
    pub anomaly_score: f64,
}

impl SensorReading {
    pub fn value(&self, metric: SensorMetric) -> Option<f64> {
        match metric {
            SensorMetric::Temperature => self.temperature,
            SensorMetric::Vibration => self.vibration,
            SensorMetric::Pressure => self.pressure,
            SensorMetric::OilLevel => self.oil_level,
            SensorMetric::RotationSpeed => self.rotation_speed,
            SensorMetric::Voltage => self.voltage,
            SensorMetric::Current => self.current,
            SensorMetric::Humidity => self.humidity,
            SensorMetric::NoiseLevel => self.noise_level,
        }
    }
}

/// (dé)sérialisation des horodatages backend
pub mod timestamp {
    use chrono::{DateTime, NaiveDateTime};
    use serde::{Deserialize, Deserializer, Serializer};

    pub const FORMAT: &str = "%Y-%m-%d %H:%M:%S";

    pub fn serialize<S: Serializer>(ts: &NaiveDateTime, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_str(&ts.format(FORMAT).to_string())
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<NaiveDateTime, D::Error> {
        let raw = String::deserialize(d)?;
        parse(&raw).ok_or_else(|| serde::de::Error::custom(format!("invalid timestamp: {raw}")))
    }

    /// Accepte le format backend, l'ISO 8601 naïf des connecteurs et le RFC 3339.
    pub fn parse(raw: &str) -> Option<NaiveDateTime> {
        NaiveDateTime::parse_from_str(raw, FORMAT)
            .ok()
            .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S%.f").ok())
            .or_else(|| NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S").ok())
            .or_else(|| DateTime::parse_from_rfc3339(raw).ok().map(|dt| dt.naive_utc()))
    }
}

// ============ PRÉDICTIONS ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HealthCategory {
    Normal,
    Warning,
    Critical,
}

/// POST /predict (corps de requête)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionRequest {
    pub equipment_id: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reading: Option<SensorReading>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PredictionResult {
    pub equipment_id: String,
    #[serde(alias = "probability")]
    pub failure_probability: f64,
    #[serde(default)]
    pub confidence: Option<f64>,
    /// Jours avant défaillance estimés
    #[serde(default, alias = "estimated_time_to_failure")]
    pub remaining_useful_life: Option<u32>,
    #[serde(default)]
    pub anomaly_detected: bool,
    #[serde(default)]
    pub anomaly_score: Option<f64>,
    #[serde(default)]
    pub recommended_action: Option<String>,
    #[serde(default)]
    pub next_maintenance_date: Option<NaiveDate>,
    #[serde(default)]
    pub prediction: Option<HealthCategory>,
    #[serde(default)]
    pub maintenance_required: bool,
}

// ============ RÈGLES D'ALERTE ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Condition {
    #[serde(rename = ">")]
    GreaterThan,
    #[serde(rename = "<")]
    LessThan,
    #[serde(rename = ">=")]
    AtLeast,
    #[serde(rename = "<=")]
    AtMost,
    #[serde(rename = "==")]
    Equal,
}

impl Condition {
    pub fn holds(&self, value: f64, threshold: f64) -> bool {
        match self {
            Condition::GreaterThan => value > threshold,
            Condition::LessThan => value < threshold,
            Condition::AtLeast => value >= threshold,
            Condition::AtMost => value <= threshold,
            Condition::Equal => (value - threshold).abs() < f64::EPSILON,
        }
    }

    pub fn symbol(&self) -> &'static str {
        match self {
            Condition::GreaterThan => ">",
            Condition::LessThan => "<",
            Condition::AtLeast => ">=",
            Condition::AtMost => "<=",
            Condition::Equal => "==",
        }
    }
}

impl FromStr for Condition {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            ">" | "gt" => Ok(Condition::GreaterThan),
            "<" | "lt" => Ok(Condition::LessThan),
            ">=" | "gte" => Ok(Condition::AtLeast),
            "<=" | "lte" => Ok(Condition::AtMost),
            "==" | "=" | "eq" => Ok(Condition::Equal),
            other => Err(ValidationError::InvalidRule(format!("unknown condition '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Severity {
    Info,
    Warning,
    Critical,
}

impl FromStr for Severity {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "info" => Ok(Severity::Info),
            "warning" => Ok(Severity::Warning),
            "critical" => Ok(Severity::Critical),
            other => Err(ValidationError::InvalidRule(format!("unknown severity '{other}'"))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NotifyChannel {
    Email,
    Sms,
    Dashboard,
}

impl FromStr for NotifyChannel {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "email" => Ok(NotifyChannel::Email),
            "sms" => Ok(NotifyChannel::Sms),
            "dashboard" => Ok(NotifyChannel::Dashboard),
            other => Err(ValidationError::InvalidRule(format!("unknown channel '{other}'"))),
        }
    }
}

/// Identifiant d'équipement valant « toutes les machines » dans une règle
pub const ALL_EQUIPMENT: &str = "all";

fn default_enabled() -> bool {
    true
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AlertRule {
    #[serde(default)]
    pub id: String,
    pub equipment_id: String,
    pub parameter: SensorMetric,
    pub condition: Condition,
    pub threshold: f64,
    pub severity: Severity,
    #[serde(default)]
    pub notify_via: Vec<NotifyChannel>,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub notification_message: String,
}

impl AlertRule {
    /// Une règle désactivée ne se déclenche jamais ; une valeur absente non plus.
    pub fn evaluate(&self, reading: &SensorReading) -> bool {
        if !self.enabled {
            return false;
        }
        if self.equipment_id != ALL_EQUIPMENT && self.equipment_id != reading.equipment_id {
            return false;
        }
        reading
            .value(self.parameter)
            .map(|v| self.condition.holds(v, self.threshold))
            .unwrap_or(false)
    }
}

// ============ CONNECTEURS ============

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorKind {
    Csv,
    Api,
    Modbus,
    Opcua,
}

impl ConnectorKind {
    pub const ALL: [ConnectorKind; 4] = [
        ConnectorKind::Csv,
        ConnectorKind::Api,
        ConnectorKind::Modbus,
        ConnectorKind::Opcua,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            ConnectorKind::Csv => "csv",
            ConnectorKind::Api => "api",
            ConnectorKind::Modbus => "modbus",
            ConnectorKind::Opcua => "opcua",
        }
    }
}

impl fmt::Display for ConnectorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ConnectorKind {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let wanted = s.trim().to_ascii_lowercase();
        ConnectorKind::ALL
            .into_iter()
            .find(|k| k.as_str() == wanted)
            .ok_or_else(|| ValidationError::UnknownField(format!("connector type '{s}'")))
    }
}

/// POST /connector/setup
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorConfig {
    pub connector_type: ConnectorKind,
    pub equipment_id: String,
    #[serde(default)]
    pub config: Map<String, Value>,
    #[serde(default)]
    pub connection_params: Map<String, Value>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ConnectorState {
    #[serde(alias = "running")]
    Active,
    #[serde(alias = "stopped")]
    Inactive,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ConnectorStatus {
    pub equipment_id: String,
    pub connector_type: String,
    pub status: ConnectorState,
}

/// Accusé générique renvoyé par les endpoints de mutation
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ActionResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub equipment_id: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

// ============ MAINTENANCE / IMPORT ============

fn default_maintenance_type() -> String {
    "predictive".to_string()
}

/// POST /maintenance/create
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MaintenanceRequest {
    pub equipment_id: String,
    pub maintenance_date: NaiveDate,
    #[serde(default = "default_maintenance_type")]
    pub maintenance_type: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub technician: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cost: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct UploadSummary {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub readings_processed: u64,
}

// ============ ANALYTICS ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComparativePoint {
    pub date: String,
    pub current: f64,
    pub average: f64,
    pub optimal: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RoiSummary {
    pub roi: f64,
    pub cost_savings: f64,
    pub investment: f64,
    pub downtime_prevented: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrendPoint {
    pub date: String,
    pub value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReliabilityScore {
    pub availability: f64,
    /// Mean time between failures (heures)
    pub mtbf: f64,
    /// Mean time to repair (heures)
    pub mttr: f64,
    #[serde(default)]
    pub trend: Vec<TrendPoint>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureImportance {
    pub name: String,
    pub value: f64,
}

// ============ PARAMÈTRES / MODÈLE ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ModelSettings {
    pub prediction_threshold: f64,
    pub anomaly_sensitivity: f64,
    pub retrain_interval_days: u32,
}

impl Default for ModelSettings {
    fn default() -> Self {
        Self {
            prediction_threshold: 0.7,
            anomaly_sensitivity: 0.5,
            retrain_interval_days: 30,
        }
    }
}

/// GET/POST /settings/notifications, seul payload camelCase du backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationSettings {
    pub email_notifications: bool,
    pub sms_notifications: bool,
    #[serde(default)]
    pub notification_email: String,
    #[serde(default)]
    pub notification_phone: String,
    /// anomalyDetection, maintenanceDue, thresholdViolations, systemUpdates
    #[serde(default)]
    pub notification_events: BTreeMap<String, bool>,
}

impl Default for NotificationSettings {
    fn default() -> Self {
        let events = [
            ("anomalyDetection", true),
            ("maintenanceDue", true),
            ("thresholdViolations", true),
            ("systemUpdates", false),
        ];
        Self {
            email_notifications: true,
            sms_notifications: false,
            notification_email: "admin@example.com".into(),
            notification_phone: String::new(),
            notification_events: events.into_iter().map(|(k, v)| (k.to_string(), v)).collect(),
        }
    }
}

/// POST /model/train
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingRequest {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub equipment_id: Option<String>,
    pub model_type: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TrainingResponse {
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub accuracy: Option<f64>,
}

// ============ UTILISATEURS ============

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthResponse {
    pub token: String,
    pub user: User,
}

/// POST /settings/profile
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProfileUpdate {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub new_password: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn reading(equipment_id: &str, temperature: f64) -> SensorReading {
        SensorReading {
            timestamp: timestamp::parse("2024-03-01 10:00:00").unwrap(),
            equipment_id: equipment_id.to_string(),
            temperature: Some(temperature),
            vibration: None,
            pressure: None,
            oil_level: None,
            rotation_speed: None,
            voltage: None,
            current: None,
            humidity: None,
            noise_level: None,
            anomaly_detected: false,
            anomaly_score: 0.0,
        }
    }

    #[test]
    fn test_equipment_accepts_backend_list_shape() {
        let raw = json!({
            "equipment_id": "PUMP001",
            "name": "Centrifugal Pump",
            "type": "Pump",
            "location": "Building A, Floor 1",
            "status": "normal",
            "last_maintenance": "2024-02-01"
        });
        let eq: Equipment = serde_json::from_value(raw).unwrap();
        assert_eq!(eq.status, EquipmentStatus::Normal);
        assert_eq!(eq.equipment_type.as_deref(), Some("Pump"));
        assert_eq!(eq.last_maintenance_date, NaiveDate::from_ymd_opt(2024, 2, 1));
    }

    #[test]
    fn test_equipment_missing_fields_fall_back_to_unknown() {
        let eq: Equipment = serde_json::from_value(json!({"equipment_id": "X1", "status": "exploded"})).unwrap();
        assert_eq!(eq.display_name(), UNKNOWN_LABEL);
        assert_eq!(eq.display_location(), UNKNOWN_LABEL);
        assert_eq!(eq.status, EquipmentStatus::Unknown);
    }

    #[test]
    fn test_reading_timestamp_formats() {
        let backend: SensorReading =
            serde_json::from_value(json!({"timestamp": "2024-03-01 10:00:00", "temperature": 45.2})).unwrap();
        let connector: SensorReading =
            serde_json::from_value(json!({"timestamp": "2024-03-01T10:00:00.123456"})).unwrap();
        assert_eq!(backend.timestamp.date(), connector.timestamp.date());
        assert!(serde_json::from_value::<SensorReading>(json!({"timestamp": "yesterday"})).is_err());

        let out = serde_json::to_value(&backend).unwrap();
        assert_eq!(out["timestamp"], "2024-03-01 10:00:00");
        assert!(out.get("vibration").is_none());
    }

    #[test]
    fn test_prediction_accepts_backend_aliases() {
        let raw = json!({
            "equipment_id": "TURBINE004",
            "prediction": "critical",
            "probability": 0.82,
            "anomaly_detected": true,
            "maintenance_required": true,
            "next_maintenance_date": "2024-03-04",
            "estimated_time_to_failure": 5
        });
        let p: PredictionResult = serde_json::from_value(raw).unwrap();
        assert_eq!(p.failure_probability, 0.82);
        assert_eq!(p.remaining_useful_life, Some(5));
        assert_eq!(p.prediction, Some(HealthCategory::Critical));
    }

    #[test]
    fn test_alert_rule_wire_format() {
        let raw = json!({
            "id": "r1",
            "equipment_id": "PUMP001",
            "parameter": "oil_level",
            "condition": "<",
            "threshold": 20,
            "severity": "critical",
            "notify_via": ["email", "dashboard"],
            "notification_message": "Oil low"
        });
        let rule: AlertRule = serde_json::from_value(raw).unwrap();
        assert_eq!(rule.parameter, SensorMetric::OilLevel);
        assert_eq!(rule.condition, Condition::LessThan);
        assert!(rule.enabled);
        assert_eq!(serde_json::to_value(&rule).unwrap()["condition"], "<");
    }

    #[test]
    fn test_alert_rule_evaluation() {
        let mut rule = AlertRule {
            id: "r1".into(),
            equipment_id: ALL_EQUIPMENT.into(),
            parameter: SensorMetric::Temperature,
            condition: Condition::GreaterThan,
            threshold: 80.0,
            severity: Severity::Critical,
            notify_via: vec![NotifyChannel::Dashboard],
            enabled: true,
            notification_message: String::new(),
        };
        assert!(rule.evaluate(&reading("PUMP001", 85.0)));
        assert!(!rule.evaluate(&reading("PUMP001", 75.0)));

        rule.equipment_id = "HVAC002".into();
        assert!(!rule.evaluate(&reading("PUMP001", 85.0)));

        rule.equipment_id = "PUMP001".into();
        rule.enabled = false;
        assert!(!rule.evaluate(&reading("PUMP001", 85.0)));

        rule.enabled = true;
        rule.parameter = SensorMetric::Vibration;
        assert!(!rule.evaluate(&reading("PUMP001", 85.0)), "missing value never triggers");
    }

    #[test]
    fn test_connector_status_accepts_running_stopped() {
        let list: Vec<ConnectorStatus> = serde_json::from_value(json!([
            {"equipment_id": "PUMP001", "connector_type": "CSVFileConnector", "status": "running"},
            {"equipment_id": "HVAC002", "connector_type": "api", "status": "inactive"}
        ]))
        .unwrap();
        assert_eq!(list[0].status, ConnectorState::Active);
        assert_eq!(list[1].status, ConnectorState::Inactive);
    }

    #[test]
    fn test_metric_parsing() {
        assert_eq!("Oil Level".parse::<SensorMetric>().unwrap(), SensorMetric::OilLevel);
        assert_eq!("noise-level".parse::<SensorMetric>().unwrap(), SensorMetric::NoiseLevel);
        assert!("torque".parse::<SensorMetric>().is_err());
    }

    #[test]
    fn test_notification_settings_wire_is_camel_case() {
        let value = serde_json::to_value(NotificationSettings::default()).unwrap();
        assert_eq!(value["emailNotifications"], json!(true));
        assert_eq!(value["notificationEmail"], json!("admin@example.com"));
        assert_eq!(value["notificationEvents"]["systemUpdates"], json!(false));

        let parsed: NotificationSettings =
            serde_json::from_value(json!({"emailNotifications": false, "smsNotifications": true})).unwrap();
        assert!(parsed.sms_notifications);
        assert!(parsed.notification_events.is_empty());
    }
}
