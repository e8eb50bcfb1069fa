/**
 * CONNECTEURS - Schémas de formulaire + cycle de vie setup / list / stop
 *
 * RÔLE :
 * Chaque type de connecteur (csv, api, modbus, opcua) déclare ses champs :
 * type de saisie, obligatoire ou non, défaut, et destination (`config` ou
 * `connection_params`). Le formulaire convertit la saisie texte en JSON
 * typé avant l'appel à /connector/setup.
 *
 * FONCTIONNEMENT :
 * - Number : "5" -> 5 (erreur si non numérique)
 * - Json : texte parsé en objet/valeur JSON
 * - setup / stop : un seul appel réseau, puis rafraîchissement de la liste
 */

use serde_json::{Map, Number, Value};
use std::collections::BTreeMap;
use tracing::info;

use crate::api::{MaintenanceApi, SharedApi};
use crate::error::{ValidationError, ViewError};
use crate::models::{ActionResponse, ConnectorConfig, ConnectorKind, ConnectorStatus};
use crate::validation::{parse_number, require};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Number,
    Json,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldTarget {
    Config,
    ConnectionParams,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub label: &'static str,
    pub kind: FieldKind,
    pub target: FieldTarget,
    pub required: bool,
    pub default: Option<&'static str>,
}

const fn field(
    name: &'static str,
    label: &'static str,
    kind: FieldKind,
    target: FieldTarget,
    default: Option<&'static str>,
) -> FieldSpec {
    FieldSpec { name, label, kind, target, required: default.is_none(), default }
}

const CSV_FIELDS: &[FieldSpec] = &[
    field("file_path", "CSV file path", FieldKind::Text, FieldTarget::ConnectionParams, None),
    field("interval", "Polling interval (s)", FieldKind::Number, FieldTarget::Config, Some("5")),
];

const API_FIELDS: &[FieldSpec] = &[
    field("api_url", "API URL", FieldKind::Text, FieldTarget::ConnectionParams, None),
    field("interval", "Polling interval (s)", FieldKind::Number, FieldTarget::Config, Some("60")),
    field("headers", "HTTP headers (JSON)", FieldKind::Json, FieldTarget::Config, Some("{}")),
];

const MODBUS_FIELDS: &[FieldSpec] = &[
    field("host", "Host", FieldKind::Text, FieldTarget::ConnectionParams, None),
    field("port", "Port", FieldKind::Number, FieldTarget::ConnectionParams, Some("502")),
    field("unit_id", "Unit id", FieldKind::Number, FieldTarget::Config, Some("1")),
    field("interval", "Polling interval (s)", FieldKind::Number, FieldTarget::Config, Some("5")),
    field("registers", "Register map (JSON)", FieldKind::Json, FieldTarget::Config, Some("{}")),
];

const OPCUA_FIELDS: &[FieldSpec] = &[
    field("server_url", "Server URL", FieldKind::Text, FieldTarget::ConnectionParams, None),
    field("interval", "Polling interval (s)", FieldKind::Number, FieldTarget::Config, Some("5")),
    field("nodes", "Node map (JSON)", FieldKind::Json, FieldTarget::Config, Some("{}")),
];

pub fn connector_schema(kind: ConnectorKind) -> &'static [FieldSpec] {
    match kind {
        ConnectorKind::Csv => CSV_FIELDS,
        ConnectorKind::Api => API_FIELDS,
        ConnectorKind::Modbus => MODBUS_FIELDS,
        ConnectorKind::Opcua => OPCUA_FIELDS,
    }
}

#[derive(Debug, Clone)]
pub struct ConnectorForm {
    kind: ConnectorKind,
    values: BTreeMap<&'static str, String>,
}

impl ConnectorForm {
    /// Formulaire pré-rempli avec les défauts du schéma
    pub fn new(kind: ConnectorKind) -> Self {
        let values = connector_schema(kind)
            .iter()
            .filter_map(|f| f.default.map(|d| (f.name, d.to_string())))
            .collect();
        Self { kind, values }
    }

    pub fn kind(&self) -> ConnectorKind {
        self.kind
    }

    pub fn value(&self, name: &str) -> Option<&str> {
        self.values.get(name).map(String::as_str)
    }

    pub fn set(&mut self, name: &str, value: impl Into<String>) -> Result<(), ValidationError> {
        let spec = connector_schema(self.kind)
            .iter()
            .find(|f| f.name == name)
            .ok_or_else(|| ValidationError::UnknownField(format!("{name} (connector type {})", self.kind)))?;
        self.values.insert(spec.name, value.into());
        Ok(())
    }

    pub fn build(&self, equipment_id: &str) -> Result<ConnectorConfig, ValidationError> {
        let equipment_id = require("equipment_id", equipment_id)?;
        let mut config = Map::new();
        let mut connection_params = Map::new();

        for spec in connector_schema(self.kind) {
            let raw = self.values.get(spec.name).map(|v| v.trim()).filter(|v| !v.is_empty());
            let Some(raw) = raw else {
                if spec.required {
                    return Err(ValidationError::MissingField(spec.name.to_string()));
                }
                continue;
            };
            let value = coerce(spec, raw)?;
            match spec.target {
                FieldTarget::Config => config.insert(spec.name.to_string(), value),
                FieldTarget::ConnectionParams => connection_params.insert(spec.name.to_string(), value),
            };
        }

        Ok(ConnectorConfig { connector_type: self.kind, equipment_id, config, connection_params })
    }
}

fn coerce(spec: &FieldSpec, raw: &str) -> Result<Value, ValidationError> {
    match spec.kind {
        FieldKind::Text => Ok(Value::String(raw.to_string())),
        FieldKind::Number => {
            let n = parse_number(spec.name, raw)?;
            // les entiers restent des entiers JSON (5, pas 5.0)
            let number = if n.fract() == 0.0 && n.abs() < i64::MAX as f64 {
                Number::from(n as i64)
            } else {
                Number::from_f64(n).ok_or_else(|| ValidationError::InvalidNumber {
                    field: spec.name.to_string(),
                    value: raw.to_string(),
                })?
            };
            Ok(Value::Number(number))
        }
        FieldKind::Json => serde_json::from_str(raw)
            .map_err(|e| ValidationError::InvalidJson { field: spec.name.to_string(), reason: e.to_string() }),
    }
}

pub struct ConnectorManager<A> {
    api: SharedApi<A>,
    connectors: Vec<ConnectorStatus>,
    last_error: Option<String>,
}

impl<A: MaintenanceApi> ConnectorManager<A> {
    pub fn new(api: SharedApi<A>) -> Self {
        Self { api, connectors: Vec::new(), last_error: None }
    }

    pub fn connectors(&self) -> &[ConnectorStatus] {
        &self.connectors
    }

    pub fn last_error(&self) -> Option<&str> {
        self.last_error.as_deref()
    }

    pub async fn refresh(&mut self) -> Result<&[ConnectorStatus], ViewError> {
        match self.api.list_connectors().await {
            Ok(list) => {
                self.connectors = list;
                self.last_error = None;
                Ok(&self.connectors)
            }
            Err(e) => {
                self.last_error = Some(format!("Failed to load connectors: {e}"));
                Err(e.into())
            }
        }
    }

    pub async fn setup(&mut self, form: &ConnectorForm, equipment_id: &str) -> Result<ActionResponse, ViewError> {
        let config = form.build(equipment_id)?;
        let resp = match self.api.setup_connector(&config).await {
            Ok(resp) => resp,
            Err(e) => {
                self.last_error = Some(format!("Failed to set up connector: {e}"));
                return Err(e.into());
            }
        };
        info!("[connectors] {} connector started for {}", config.connector_type, config.equipment_id);
        self.refresh().await?;
        Ok(resp)
    }

    pub async fn stop(&mut self, equipment_id: &str) -> Result<ActionResponse, ViewError> {
        let equipment_id = require("equipment_id", equipment_id)?;
        let resp = match self.api.stop_connector(&equipment_id).await {
            Ok(resp) => resp,
            Err(e) => {
                self.last_error = Some(format!("Failed to stop connector: {e}"));
                return Err(e.into());
            }
        };
        info!("[connectors] connector stopped for {equipment_id}");
        self.refresh().await?;
        Ok(resp)
    }
}
