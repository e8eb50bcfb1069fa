/**
 * STORE - État partagé du dashboard, observable
 *
 * RÔLE :
 * Une seule source de vérité pour la navigation, la liste des machines, la
 * machine sélectionnée, la bannière d'erreur et les paramètres du modèle.
 * Les vues s'abonnent au lieu de refetcher chacune de leur côté.
 *
 * FONCTIONNEMENT :
 * - `watch::Sender<DashboardState>` : dernière valeur + notification
 * - chaque mutation passe par `update`, les abonnés ne sont réveillés que
 *   si l'état a réellement changé
 */

use serde::Serialize;
use tokio::sync::watch;
use tracing::debug;

use crate::api::{DataSource, Fetched};
use crate::error::ViewError;
use crate::models::{Equipment, ModelSettings};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum View {
    #[default]
    Dashboard,
    Monitor,
    Sensors,
    Predictions,
    Alerts,
    Connectors,
    Maintenance,
    Upload,
    Analytics,
    Settings,
    Profile,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum BannerLevel {
    /// Opération échouée (mutation refusée, backend en erreur)
    Error,
    /// Données affichées générées localement
    Degraded,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Banner {
    pub level: BannerLevel,
    pub message: String,
}

impl Banner {
    fn degraded(reason: &str) -> Self {
        Self {
            level: BannerLevel::Degraded,
            message: format!("Backend unavailable, showing simulated data ({reason})"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct DashboardState {
    pub view: View,
    pub machines: Vec<Equipment>,
    pub selected: Option<String>,
    pub banner: Option<Banner>,
    pub model_settings: Option<ModelSettings>,
    /// Provenance de la liste de machines
    pub source: DataSource,
}

impl DashboardState {
    pub fn selected_machine(&self) -> Option<&Equipment> {
        let id = self.selected.as_deref()?;
        self.machines.iter().find(|m| m.equipment_id == id)
    }
}

pub struct Store {
    tx: watch::Sender<DashboardState>,
}

impl Default for Store {
    fn default() -> Self {
        Self::new()
    }
}

impl Store {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(DashboardState::default());
        Self { tx }
    }

    pub fn snapshot(&self) -> DashboardState {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<DashboardState> {
        self.tx.subscribe()
    }

    /// Applique `f` ; notifie seulement si l'état change
    pub fn update<F>(&self, f: F)
    where
        F: FnOnce(&mut DashboardState),
    {
        self.tx.send_if_modified(|state| {
            let before = state.clone();
            f(state);
            *state != before
        });
    }

    pub fn navigate(&self, view: View) {
        debug!("[store] navigate -> {:?}", view);
        self.update(|s| s.view = view);
    }

    /// Remplace la liste ; garde la sélection si la machine existe encore,
    /// sinon sélectionne la première.
    pub fn set_machines(&self, fetched: Fetched<Vec<Equipment>>) {
        self.update(|s| {
            let still_there = s
                .selected
                .as_deref()
                .is_some_and(|id| fetched.data.iter().any(|m| m.equipment_id == id));
            if !still_there {
                s.selected = fetched.data.first().map(|m| m.equipment_id.clone());
            }
            s.machines = fetched.data;
            match &fetched.source {
                DataSource::Synthetic { reason } => s.banner = Some(Banner::degraded(reason)),
                DataSource::Live => {
                    if s.banner.as_ref().is_some_and(|b| b.level == BannerLevel::Degraded) {
                        s.banner = None;
                    }
                }
            }
            s.source = fetched.source;
        });
    }

    pub fn select_machine(&self, equipment_id: Option<&str>) -> Result<(), ViewError> {
        let Some(id) = equipment_id else {
            self.update(|s| s.selected = None);
            return Ok(());
        };
        if !self.tx.borrow().machines.iter().any(|m| m.equipment_id == id) {
            return Err(ViewError::NotFound { kind: "equipment", id: id.to_string() });
        }
        self.update(|s| s.selected = Some(id.to_string()));
        Ok(())
    }

    pub fn selected(&self) -> Option<String> {
        self.tx.borrow().selected.clone()
    }

    pub fn set_model_settings(&self, settings: ModelSettings) {
        self.update(|s| s.model_settings = Some(settings));
    }

    pub fn show_error(&self, message: impl Into<String>) {
        let message = message.into();
        self.update(|s| s.banner = Some(Banner { level: BannerLevel::Error, message }));
    }

    /// Bannière « dégradé » pour un payload synthétique hors liste des machines.
    /// Une bannière d'erreur déjà affichée reste prioritaire.
    pub fn show_degraded(&self, reason: &str) {
        self.update(|s| {
            if s.banner.as_ref().map_or(true, |b| b.level != BannerLevel::Error) {
                s.banner = Some(Banner::degraded(reason));
            }
        });
    }

    pub fn dismiss_banner(&self) {
        self.update(|s| s.banner = None);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mock::mock_equipment_list;
    use chrono::NaiveDate;

    fn machines() -> Vec<Equipment> {
        mock_equipment_list(NaiveDate::from_ymd_opt(2024, 6, 1).unwrap())
    }

    #[test]
    fn test_first_machine_selected_on_load() {
        let store = Store::new();
        store.set_machines(Fetched::live(machines()));
        assert_eq!(store.selected().as_deref(), Some("PUMP001"));

        store.select_machine(Some("TURBINE004")).unwrap();
        store.set_machines(Fetched::live(machines()));
        assert_eq!(store.selected().as_deref(), Some("TURBINE004"), "selection kept across refresh");
        assert_eq!(store.snapshot().selected_machine().unwrap().display_name(), "Turbine Generator");
    }

    #[test]
    fn test_unknown_machine_is_rejected() {
        let store = Store::new();
        store.set_machines(Fetched::live(machines()));
        assert!(matches!(store.select_machine(Some("NOPE")), Err(ViewError::NotFound { .. })));
        store.select_machine(None).unwrap();
        assert_eq!(store.selected(), None);
    }

    #[test]
    fn test_show_degraded_keeps_error_banner() {
        let store = Store::new();
        store.show_degraded("timeout");
        assert_eq!(store.snapshot().banner.unwrap().level, BannerLevel::Degraded);

        store.show_error("Failed to save");
        store.show_degraded("timeout");
        assert_eq!(store.snapshot().banner.unwrap().level, BannerLevel::Error);
    }

    #[test]
    fn test_degraded_banner_follows_source() {
        let store = Store::new();
        store.set_machines(Fetched::synthetic(machines(), "connection refused"));
        let banner = store.snapshot().banner.unwrap();
        assert_eq!(banner.level, BannerLevel::Degraded);
        assert!(banner.message.contains("connection refused"));

        store.set_machines(Fetched::live(machines()));
        assert_eq!(store.snapshot().banner, None);

        store.show_error("Failed to save");
        store.set_machines(Fetched::live(machines()));
        assert_eq!(store.snapshot().banner.unwrap().level, BannerLevel::Error, "error banners stay until dismissed");
    }

    #[tokio::test]
    async fn test_subscribers_only_woken_on_change() {
        let store = Store::new();
        let mut rx = store.subscribe();
        rx.borrow_and_update();

        store.navigate(View::Dashboard);
        assert!(!rx.has_changed().unwrap());

        store.navigate(View::Alerts);
        rx.changed().await.unwrap();
        assert_eq!(rx.borrow_and_update().view, View::Alerts);
    }
}
