/**
 * DASHBOARD - Composition racine
 *
 * RÔLE :
 * Possède l'API partagée, le `Store` et la config, et fabrique les
 * contrôleurs de vues. Au montage : liste des machines, sélection de la
 * première, bannière « dégradé » si la liste est synthétique.
 *
 * UTILITÉ : point d'entrée unique pour la console (et tout autre front).
 */

use std::sync::Arc;
use tracing::{info, warn};

use crate::api::{DataSource, Fetched, MaintenanceApi, SharedApi};
use crate::config::ClientConfig;
use crate::error::ViewError;
use crate::models::{EquipmentDetails, ModelSettings, NotificationSettings};
use crate::store::Store;
use crate::views::{
    AlertRuleEditor, AnalyticsView, ConnectorManager, DataUploader, MaintenanceScheduler, PredictionView,
    RealTimeMonitor, SensorView,
};

pub struct Dashboard<A> {
    api: SharedApi<A>,
    store: Arc<Store>,
    config: ClientConfig,
}

impl<A: MaintenanceApi + 'static> Dashboard<A> {
    pub fn new(api: SharedApi<A>, config: ClientConfig) -> Self {
        Self { api, store: Arc::new(Store::new()), config }
    }

    pub fn api(&self) -> &SharedApi<A> {
        &self.api
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn config(&self) -> &ClientConfig {
        &self.config
    }

    /// Montage : fetch de la liste, sélection initiale
    pub async fn mount(&self) -> Result<(), ViewError> {
        match self.api.list_equipment().await {
            Ok(fetched) => {
                info!("[dashboard] {} machines ({:?})", fetched.data.len(), fetched.source);
                self.store.set_machines(fetched);
                Ok(())
            }
            Err(e) => {
                warn!("[dashboard] equipment list unavailable: {e}");
                self.store.show_error(format!("Failed to load equipment: {e}"));
                Err(e.into())
            }
        }
    }

    pub fn select(&self, equipment_id: Option<&str>) -> Result<(), ViewError> {
        self.store.select_machine(equipment_id)
    }

    pub async fn selected_details(&self) -> Result<Fetched<EquipmentDetails>, ViewError> {
        let id = self.store.selected().ok_or(ViewError::NoSelection)?;
        Ok(self.api.equipment_details(&id).await?)
    }

    /// Paramètres du modèle. Seule une réponse live est gardée dans le store :
    /// des valeurs par défaut synthétiques sont refetchées au prochain appel.
    pub async fn model_settings(&self) -> Result<Fetched<ModelSettings>, ViewError> {
        if let Some(settings) = self.store.snapshot().model_settings {
            return Ok(Fetched::live(settings));
        }
        let fetched = self.api.get_model_settings().await?;
        self.note_source(&fetched.source);
        if !fetched.is_synthetic() {
            self.store.set_model_settings(fetched.data.clone());
        }
        Ok(fetched)
    }

    pub async fn save_model_settings(&self, settings: ModelSettings) -> Result<(), ViewError> {
        if let Err(e) = self.api.save_model_settings(&settings).await {
            self.store.show_error(format!("Failed to save model settings: {e}"));
            return Err(e.into());
        }
        self.store.set_model_settings(settings);
        Ok(())
    }

    pub async fn notification_settings(&self) -> Result<Fetched<NotificationSettings>, ViewError> {
        let fetched = self.api.get_notification_settings().await?;
        self.note_source(&fetched.source);
        Ok(fetched)
    }

    pub async fn save_notification_settings(&self, settings: &NotificationSettings) -> Result<(), ViewError> {
        if let Err(e) = self.api.save_notification_settings(settings).await {
            self.store.show_error(format!("Failed to save notification settings: {e}"));
            return Err(e.into());
        }
        Ok(())
    }

    fn note_source(&self, source: &DataSource) {
        if let DataSource::Synthetic { reason } = source {
            self.store.show_degraded(reason);
        }
    }

    // ============ CONTRÔLEURS ============

    pub fn monitor(&self) -> Arc<RealTimeMonitor<A>> {
        RealTimeMonitor::new(self.api.clone(), self.config.poll_interval(), self.config.readings_limit)
    }

    pub fn sensors(&self) -> SensorView<A> {
        SensorView::new(self.api.clone(), self.config.readings_limit)
    }

    pub fn predictions(&self) -> PredictionView<A> {
        PredictionView::new(self.api.clone())
    }

    pub fn alerts(&self) -> AlertRuleEditor<A> {
        AlertRuleEditor::new(self.api.clone())
    }

    pub fn connectors(&self) -> ConnectorManager<A> {
        ConnectorManager::new(self.api.clone())
    }

    pub fn scheduler(&self) -> MaintenanceScheduler<A> {
        MaintenanceScheduler::new(self.api.clone())
    }

    pub fn uploader(&self) -> DataUploader<A> {
        DataUploader::new(self.api.clone())
    }

    pub fn analytics(&self) -> AnalyticsView<A> {
        AnalyticsView::new(self.api.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedApi;
    use crate::api::{Endpoint, FallbackApi};
    use crate::store::BannerLevel;

    fn dashboard(api: ScriptedApi) -> Dashboard<ScriptedApi> {
        Dashboard::new(Arc::new(FallbackApi::new(api)), ClientConfig::default())
    }

    #[tokio::test]
    async fn test_mount_selects_first_machine() {
        let dash = dashboard(ScriptedApi::new());
        dash.mount().await.unwrap();
        let state = dash.store().snapshot();
        assert_eq!(state.selected.as_deref(), Some("PUMP001"));
        assert_eq!(state.banner, None);

        let details = dash.selected_details().await.unwrap();
        assert_eq!(details.data.equipment.equipment_id, "PUMP001");
    }

    #[tokio::test]
    async fn test_mount_offline_shows_degraded_banner() {
        let api = ScriptedApi::new();
        api.set_offline(true);
        let dash = dashboard(api);
        dash.mount().await.unwrap();
        let state = dash.store().snapshot();
        assert_eq!(state.machines.len(), 5);
        assert!(state.source.is_synthetic());
        assert_eq!(state.banner.unwrap().level, BannerLevel::Degraded);
    }

    #[tokio::test]
    async fn test_model_settings_fetched_once() {
        let dash = dashboard(ScriptedApi::new());
        dash.model_settings().await.unwrap();
        dash.model_settings().await.unwrap();
        assert_eq!(dash.api().inner().calls(Endpoint::GetModelSettings), 1);

        let settings = ModelSettings { prediction_threshold: 0.8, ..ModelSettings::default() };
        dash.save_model_settings(settings.clone()).await.unwrap();
        assert_eq!(dash.model_settings().await.unwrap().data, settings);
    }

    #[tokio::test]
    async fn test_synthetic_model_settings_are_not_cached() {
        let api = ScriptedApi::new();
        api.set_offline(true);
        let dash = dashboard(api);

        let first = dash.model_settings().await.unwrap();
        assert!(first.is_synthetic());
        assert_eq!(dash.store().snapshot().model_settings, None);
        assert_eq!(dash.store().snapshot().banner.unwrap().level, BannerLevel::Degraded);

        dash.api().inner().set_offline(false);
        let second = dash.model_settings().await.unwrap();
        assert!(!second.is_synthetic());
        assert_eq!(dash.api().inner().calls(Endpoint::GetModelSettings), 2);
        assert_eq!(dash.store().snapshot().model_settings, Some(second.data));
    }

    #[tokio::test]
    async fn test_notification_settings_round_trip() {
        let dash = dashboard(ScriptedApi::new());
        let mut settings = dash.notification_settings().await.unwrap();
        assert!(!settings.is_synthetic());
        settings.data.sms_notifications = true;
        settings.data.notification_phone = "+33 6 00 00 00 00".into();
        dash.save_notification_settings(&settings.data).await.unwrap();
        assert_eq!(dash.notification_settings().await.unwrap().data, settings.data);

        dash.api().inner().fail(Endpoint::SaveNotificationSettings);
        assert!(dash.save_notification_settings(&settings.data).await.is_err());
        assert_eq!(dash.store().snapshot().banner.unwrap().level, BannerLevel::Error);
    }

    #[tokio::test]
    async fn test_failed_settings_save_raises_banner() {
        let api = ScriptedApi::new();
        api.fail(Endpoint::SaveModelSettings);
        let dash = dashboard(api);
        assert!(dash.save_model_settings(ModelSettings::default()).await.is_err());
        assert_eq!(dash.store().snapshot().banner.unwrap().level, BannerLevel::Error);
        assert_eq!(dash.store().snapshot().model_settings, None);
    }

    #[tokio::test]
    async fn test_details_without_selection() {
        let dash = dashboard(ScriptedApi::new());
        assert!(matches!(dash.selected_details().await, Err(ViewError::NoSelection)));
    }
}
