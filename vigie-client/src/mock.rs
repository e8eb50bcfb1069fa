/**
 * GÉNÉRATEUR MOCK - Données synthétiques déterministes
 *
 * RÔLE :
 * Fournit des payloads de même forme que le backend quand celui-ci est
 * injoignable. Utilisé uniquement par `FallbackApi` (et le backend stub du devkit).
 *
 * FONCTIONNEMENT :
 * - seed = somme des codes de caractères de l'identifiant d'équipement
 * - pr(i, offset) = frac(sin(seed + i + offset) * 10000), toujours dans [0, 1)
 * - valeurs de base par type d'équipement (PUMP, HVAC, MOTOR, TURBINE, COMPRESSOR)
 *
 * PROPRIÉTÉ :
 * Même identifiant + même nombre + même ancre temporelle => sortie identique
 * au bit près. Aucune source d'aléa externe.
 */

use chrono::{Duration, NaiveDate, NaiveDateTime, Timelike, Utc};

use crate::models::{
    AlertRule, ComparativePoint, Condition, Equipment, EquipmentDetails, EquipmentStatus, FeatureImportance,
    HealthCategory, MaintenanceRecord, NotifyChannel, PredictionResult, ReliabilityScore, RoiSummary, SensorMetric,
    SensorReading, Severity, TrendPoint, ALL_EQUIPMENT,
};

/// Écart entre deux lectures synthétiques
pub const READING_SPACING_MINUTES: i64 = 30;

pub fn seed_for(equipment_id: &str) -> u64 {
    equipment_id.chars().map(|c| c as u64).sum()
}

pub fn pseudo_random(seed: u64, index: usize, offset: u32) -> f64 {
    let x = (seed as f64 + index as f64 + offset as f64).sin() * 10000.0;
    x - x.floor()
}

fn round_to(value: f64, decimals: i32) -> f64 {
    let factor = 10f64.powi(decimals);
    (value * factor).round() / factor
}

/// Ancre par défaut : maintenant, arrondi à la demi-heure inférieure.
/// Deux appels dans la même fenêtre produisent la même série.
pub fn anchor_now() -> NaiveDateTime {
    let now = Utc::now().naive_utc();
    let floored_minute = now.minute() - now.minute() % READING_SPACING_MINUTES as u32;
    now.with_minute(floored_minute)
        .and_then(|t| t.with_second(0))
        .and_then(|t| t.with_nanosecond(0))
        .unwrap_or(now)
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Baseline {
    pub temperature: f64,
    pub vibration: f64,
    pub pressure: f64,
    pub oil_level: f64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EquipmentKind {
    Pump,
    Hvac,
    Motor,
    Turbine,
    Compressor,
    Generic,
}

impl EquipmentKind {
    /// Type déduit de l'identifiant (ex: "TURBINE004" -> Turbine)
    pub fn detect(equipment_id: &str) -> Self {
        let id = equipment_id.to_ascii_uppercase();
        [
            ("PUMP", EquipmentKind::Pump),
            ("HVAC", EquipmentKind::Hvac),
            ("MOTOR", EquipmentKind::Motor),
            ("TURBINE", EquipmentKind::Turbine),
            ("COMPRESSOR", EquipmentKind::Compressor),
        ]
        .into_iter()
        .find(|(key, _)| id.contains(key))
        .map(|(_, kind)| kind)
        .unwrap_or(EquipmentKind::Generic)
    }

    pub fn baseline(&self) -> Baseline {
        let (temperature, vibration, pressure, oil_level) = match self {
            EquipmentKind::Pump => (45.0, 2.0, 90.0, 80.0),
            EquipmentKind::Hvac => (50.0, 3.0, 70.0, 65.0),
            EquipmentKind::Motor => (40.0, 1.8, 85.0, 90.0),
            EquipmentKind::Turbine => (70.0, 4.5, 110.0, 55.0),
            EquipmentKind::Compressor => (35.0, 2.5, 95.0, 85.0),
            EquipmentKind::Generic => (40.0, 2.0, 85.0, 75.0),
        };
        Baseline { temperature, vibration, pressure, oil_level }
    }

    pub fn label(&self) -> &'static str {
        match self {
            EquipmentKind::Pump => "Pump",
            EquipmentKind::Hvac => "HVAC",
            EquipmentKind::Motor => "Motor",
            EquipmentKind::Turbine => "Turbine",
            EquipmentKind::Compressor => "Compressor",
            EquipmentKind::Generic => "Equipment",
        }
    }
}

/// `count` lectures espacées de 30 minutes, la dernière à `anchor`, plus anciennes d'abord.
pub fn mock_readings(equipment_id: &str, count: usize, anchor: NaiveDateTime) -> Vec<SensorReading> {
    let seed = seed_for(equipment_id);
    let base = EquipmentKind::detect(equipment_id).baseline();
    let pr = |i: usize, offset: u32| pseudo_random(seed, i, offset);

    (0..count)
        .map(|i| {
            let age = (count - 1 - i) as i64;
            let timestamp = anchor - Duration::minutes(age * READING_SPACING_MINUTES);

            let time_factor = 0.1 * (i as f64 / 10.0).sin();
            let trend_factor = i as f64 / count as f64 * 0.1;
            let is_anomaly = pr(i, 5) < 0.03;
            let anomaly_factor = if is_anomaly { 0.3 } else { 0.0 };
            let anomaly_score = if is_anomaly { 0.2 + 0.8 * pr(i, 6) } else { 0.3 * pr(i, 6) };

            let temperature = base.temperature * (1.0 + time_factor + 0.06 * (pr(i, 1) - 0.5) + anomaly_factor * pr(i, 7));
            let vibration =
                base.vibration * (1.0 + time_factor + trend_factor + 0.06 * (pr(i, 2) - 0.5) + anomaly_factor * pr(i, 8));
            let pressure = base.pressure * (1.0 + 0.06 * (pr(i, 3) - 0.5) + anomaly_factor * pr(i, 9));
            let oil_level = base.oil_level * (1.0 - trend_factor * 0.5 + 0.03 * (pr(i, 4) - 0.5));

            SensorReading {
                timestamp,
                equipment_id: equipment_id.to_string(),
                temperature: Some(round_to(temperature, 1)),
                vibration: Some(round_to(vibration, 2)),
                pressure: Some(round_to(pressure, 1)),
                oil_level: Some(round_to(oil_level, 1)),
                rotation_speed: None,
                voltage: None,
                current: None,
                humidity: None,
                noise_level: None,
                anomaly_detected: is_anomaly,
                anomaly_score: round_to(anomaly_score, 3),
            }
        })
        .collect()
}

pub fn mock_equipment_list(today: NaiveDate) -> Vec<Equipment> {
    [
        ("PUMP001", "Centrifugal Pump", "Pump", "Building A, Floor 1", EquipmentStatus::Normal, 30),
        ("HVAC002", "HVAC System", "HVAC", "Building B, Floor 2", EquipmentStatus::Warning, 45),
        ("MOTOR003", "Electric Motor", "Motor", "Building A, Floor 2", EquipmentStatus::Normal, 15),
        ("TURBINE004", "Turbine Generator", "Turbine", "Building C, Floor 1", EquipmentStatus::Critical, 60),
        ("COMPRESSOR005", "Air Compressor", "Compressor", "Building B, Floor 1", EquipmentStatus::Normal, 10),
    ]
    .into_iter()
    .map(|(id, name, kind, location, status, days_since)| Equipment {
        equipment_id: id.to_string(),
        name: Some(name.to_string()),
        status,
        location: Some(location.to_string()),
        last_maintenance_date: Some(today - Duration::days(days_since)),
        installation_date: Some(today - Duration::days(365 * 2)),
        model: Some(format!("Model-{}X", &id[id.len() - 3..])),
        manufacturer: Some("Industrial Equipment Inc.".to_string()),
        equipment_type: Some(kind.to_string()),
    })
    .collect()
}

/// Machine connue de la flotte de démo, sinon enregistrement dérivé de l'identifiant.
pub fn mock_equipment(equipment_id: &str, today: NaiveDate) -> Equipment {
    if let Some(eq) = mock_equipment_list(today).into_iter().find(|e| e.equipment_id == equipment_id) {
        return eq;
    }
    let seed = seed_for(equipment_id);
    let kind = EquipmentKind::detect(equipment_id);
    let status = [EquipmentStatus::Normal, EquipmentStatus::Warning, EquipmentStatus::Critical][(seed % 3) as usize];
    Equipment {
        equipment_id: equipment_id.to_string(),
        name: (kind != EquipmentKind::Generic).then(|| format!("{} {}", kind.label(), equipment_id)),
        status,
        location: None,
        last_maintenance_date: Some(today - Duration::days(30)),
        installation_date: Some(today - Duration::days(365 * 2)),
        model: None,
        manufacturer: None,
        equipment_type: Some(kind.label().to_string()),
    }
}

pub fn mock_details(equipment_id: &str, today: NaiveDate) -> EquipmentDetails {
    let equipment = mock_equipment(equipment_id, today);
    let seed = seed_for(equipment_id);
    let maintenance_history = equipment
        .last_maintenance_date
        .map(|date| {
            vec![MaintenanceRecord {
                date,
                maintenance_type: "preventive".to_string(),
                description: Some("Routine inspection".to_string()),
                technician: None,
                cost: Some(round_to(250.0 + 500.0 * pseudo_random(seed, 0, 11), 2)),
            }]
        })
        .unwrap_or_default();
    EquipmentDetails {
        equipment,
        operational_hours: Some(8760 + seed % 1000 * 10),
        maintenance_history,
        latest_prediction: Some(mock_prediction(equipment_id, today)),
    }
}

pub fn mock_prediction(equipment_id: &str, today: NaiveDate) -> PredictionResult {
    let seed = seed_for(equipment_id);
    let base = match EquipmentKind::detect(equipment_id) {
        EquipmentKind::Turbine => 0.7,
        EquipmentKind::Hvac => 0.5,
        _ => 0.2,
    };
    let probability = round_to((base + (pseudo_random(seed, 0, 7) - 0.5) * 0.3).clamp(0.05, 0.95), 2);
    let spread = pseudo_random(seed, 1, 7);

    let (category, rul, days_ahead, action) = if probability > 0.7 {
        (HealthCategory::Critical, 1 + (spread * 8.0) as u32, Some(3), "Schedule immediate inspection")
    } else if probability > 0.4 {
        (HealthCategory::Warning, 7 + (spread * 14.0) as u32, Some(7), "Plan maintenance within the week")
    } else {
        (HealthCategory::Normal, 30 + (spread * 60.0) as u32, None, "Continue routine monitoring")
    };

    PredictionResult {
        equipment_id: equipment_id.to_string(),
        failure_probability: probability,
        confidence: Some(round_to(0.75 + 0.2 * pseudo_random(seed, 2, 7), 2)),
        remaining_useful_life: Some(rul),
        anomaly_detected: probability > 0.6,
        anomaly_score: Some(round_to(probability * 0.9, 3)),
        recommended_action: Some(action.to_string()),
        next_maintenance_date: days_ahead.map(|d| today + Duration::days(d)),
        prediction: Some(category),
        maintenance_required: days_ahead.is_some(),
    }
}

pub fn mock_alert_rules() -> Vec<AlertRule> {
    vec![
        AlertRule {
            id: "rule-temperature-high".into(),
            equipment_id: ALL_EQUIPMENT.into(),
            parameter: SensorMetric::Temperature,
            condition: Condition::GreaterThan,
            threshold: 80.0,
            severity: Severity::Critical,
            notify_via: vec![NotifyChannel::Email, NotifyChannel::Dashboard],
            enabled: true,
            notification_message: "Temperature above 80°C".into(),
        },
        AlertRule {
            id: "rule-vibration-high".into(),
            equipment_id: ALL_EQUIPMENT.into(),
            parameter: SensorMetric::Vibration,
            condition: Condition::GreaterThan,
            threshold: 5.0,
            severity: Severity::Warning,
            notify_via: vec![NotifyChannel::Dashboard],
            enabled: true,
            notification_message: "Vibration above 5 mm/s".into(),
        },
        AlertRule {
            id: "rule-oil-low".into(),
            equipment_id: ALL_EQUIPMENT.into(),
            parameter: SensorMetric::OilLevel,
            condition: Condition::LessThan,
            threshold: 20.0,
            severity: Severity::Warning,
            notify_via: vec![NotifyChannel::Email],
            enabled: false,
            notification_message: "Oil level below 20%".into(),
        },
    ]
}

const MONTHS: [&str; 12] = ["Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec"];

pub fn mock_comparative(metric: SensorMetric, equipment_ids: &[String]) -> Vec<ComparativePoint> {
    let seed = seed_for(metric.as_str()) + equipment_ids.iter().map(|id| seed_for(id)).sum::<u64>();
    MONTHS
        .iter()
        .enumerate()
        .map(|(i, month)| {
            let r = pseudo_random(seed, i, 1);
            let current = match metric {
                SensorMetric::Temperature => 50.0 + r * 30.0,
                SensorMetric::Vibration => r * 5.0,
                SensorMetric::Pressure => 90.0 + r * 40.0,
                SensorMetric::OilLevel => 70.0 + r * 20.0,
                _ => r * 100.0,
            };
            ComparativePoint {
                date: month.to_string(),
                current: round_to(current, 2),
                average: round_to(current * (0.8 + pseudo_random(seed, i, 2) * 0.4), 2),
                optimal: round_to(current * 0.9, 2),
            }
        })
        .collect()
}

pub fn mock_roi(period: &str) -> RoiSummary {
    let seed = seed_for(period);
    RoiSummary {
        roi: (120.0 + pseudo_random(seed, 0, 1) * 60.0).floor(),
        cost_savings: (45000.0 + pseudo_random(seed, 0, 2) * 25000.0).floor(),
        investment: (25000.0 + pseudo_random(seed, 0, 3) * 10000.0).floor(),
        downtime_prevented: (120.0 + pseudo_random(seed, 0, 4) * 80.0).floor(),
    }
}

pub fn mock_reliability() -> ReliabilityScore {
    let seed = seed_for("reliability");
    let trend = (0..6)
        .map(|i| TrendPoint {
            date: format!("Month {}", i + 1),
            value: round_to((75.0 + i as f64 * 1.5 + (pseudo_random(seed, i, 5) * 4.0 - 2.0)).min(98.0), 1),
        })
        .collect();
    ReliabilityScore {
        availability: (90.0 + pseudo_random(seed, 0, 1) * 8.0).floor(),
        mtbf: (280.0 + pseudo_random(seed, 0, 2) * 40.0).floor(),
        mttr: (3.0 + pseudo_random(seed, 0, 3) * 2.0).floor(),
        trend,
    }
}

pub fn mock_feature_importance() -> Vec<FeatureImportance> {
    [("Vibration", 0.35), ("Temperature", 0.25), ("Pressure", 0.20), ("Oil Level", 0.12), ("Age", 0.08)]
        .into_iter()
        .map(|(name, value)| FeatureImportance { name: name.to_string(), value })
        .collect()
}
