//! Per-view controllers. Each owns its local state and talks to the backend
//! only through the shared [`FallbackApi`](crate::api::FallbackApi).

pub mod alerts;
pub mod analytics;
pub mod connectors;
pub mod monitor;
pub mod prediction;
pub mod profile;
pub mod scheduler;
pub mod sensors;
pub mod uploader;

pub use alerts::AlertRuleEditor;
pub use analytics::{AnalyticsReport, AnalyticsView};
pub use connectors::{connector_schema, ConnectorForm, ConnectorManager, FieldKind, FieldSpec, FieldTarget};
pub use monitor::{MonitorSnapshot, MonitorState, RealTimeMonitor};
pub use prediction::{PredictionView, RiskLevel};
pub use profile::UserProfile;
pub use scheduler::{suggest_date, MaintenanceDraft, MaintenanceScheduler};
pub use sensors::{SensorData, SensorView};
pub use uploader::DataUploader;
