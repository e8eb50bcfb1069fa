use serde::Serialize;
use tracing::info;

use crate::api::{DataSource, MaintenanceApi, SharedApi};
use crate::error::ViewError;
use crate::models::{
    ComparativePoint, FeatureImportance, ReliabilityScore, RoiSummary, SensorMetric, TrainingRequest,
    TrainingResponse,
};

pub const DEFAULT_ROI_PERIOD: &str = "12months";

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AnalyticsReport {
    pub metric: SensorMetric,
    pub comparative: Vec<ComparativePoint>,
    pub roi: RoiSummary,
    pub reliability: ReliabilityScore,
    pub feature_importance: Vec<FeatureImportance>,
    /// Synthétique dès qu'une des quatre séries l'est
    pub source: DataSource,
}

pub struct AnalyticsView<A> {
    api: SharedApi<A>,
}

impl<A: MaintenanceApi> AnalyticsView<A> {
    pub fn new(api: SharedApi<A>) -> Self {
        Self { api }
    }

    pub async fn load(&self, metric: SensorMetric, equipment_ids: &[String], period: &str) -> Result<AnalyticsReport, ViewError> {
        let (comparative, roi, reliability, importance) = tokio::try_join!(
            self.api.comparative_analytics(metric, equipment_ids),
            self.api.maintenance_roi(period),
            self.api.reliability_scores(),
            self.api.feature_importance(),
        )?;
        let source = comparative
            .source
            .merge(&roi.source)
            .merge(&reliability.source)
            .merge(&importance.source);
        Ok(AnalyticsReport {
            metric,
            comparative: comparative.data,
            roi: roi.data,
            reliability: reliability.data,
            feature_importance: importance.data,
            source,
        })
    }

    pub async fn train_model(&self, equipment_id: Option<&str>, model_type: &str) -> Result<TrainingResponse, ViewError> {
        let request = TrainingRequest {
            equipment_id: equipment_id.map(str::to_string),
            model_type: model_type.to_string(),
        };
        let resp = self.api.train_model(&request).await?;
        info!("[analytics] training finished: {}", resp.message);
        Ok(resp)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedApi;
    use crate::api::{Endpoint, FallbackApi};
    use std::sync::Arc;

    #[tokio::test]
    async fn test_partial_outage_marks_report_synthetic() {
        let api = ScriptedApi::new();
        api.fail(Endpoint::MaintenanceRoi);
        let view = AnalyticsView::new(Arc::new(FallbackApi::new(api)));
        let report = view.load(SensorMetric::Vibration, &["PUMP001".into()], DEFAULT_ROI_PERIOD).await.unwrap();
        assert!(report.source.is_synthetic());
        assert_eq!(report.comparative.len(), 12);
        assert_eq!(report.feature_importance.len(), 5);
    }

    #[tokio::test]
    async fn test_training_is_never_synthesized() {
        let api = ScriptedApi::new();
        api.set_offline(true);
        let view = AnalyticsView::new(Arc::new(FallbackApi::new(api)));
        assert!(view.train_model(None, "random_forest").await.is_err());

        let view = AnalyticsView::new(Arc::new(FallbackApi::new(ScriptedApi::new())));
        let resp = view.train_model(Some("PUMP001"), "random_forest").await.unwrap();
        assert_eq!(resp.accuracy, Some(0.92));
    }
}
