/**
 * REAL-TIME MONITOR - Polling des lectures + prédiction dépendante
 *
 * RÔLE :
 * Pour la machine sélectionnée : lectures récentes, puis prédiction calculée
 * sur la lecture la plus récente. Re-fetch toutes les `interval`.
 *
 * FONCTIONNEMENT :
 * - `select(Some(id))` : nouvelle génération, abort du timer précédent, Loading
 * - chaque réponse porte la génération pour laquelle elle a été émise ;
 *   une réponse d'une génération périmée est jetée (A puis B => B affiché)
 * - échec des lectures : `reading_error`, données précédentes conservées,
 *   le timer continue ; échec de la prédiction : `prediction_error` seul
 * - `stop()` ou drop : abort du timer
 */

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, warn};

use crate::api::{DataSource, MaintenanceApi, SharedApi};
use crate::error::ViewError;
use crate::models::{PredictionRequest, PredictionResult, SensorReading};
use crate::readings::{self, normalize_order};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum MonitorState {
    #[default]
    NoSelection,
    Loading,
    Ready,
    Error,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct MonitorSnapshot {
    pub state: MonitorState,
    pub equipment_id: Option<String>,
    /// Plus anciennes d'abord
    pub readings: Vec<SensorReading>,
    pub prediction: Option<PredictionResult>,
    pub reading_error: Option<String>,
    pub prediction_error: Option<String>,
    pub source: DataSource,
    pub last_updated: Option<DateTime<Utc>>,
    pub generation: u64,
}

impl MonitorSnapshot {
    pub fn latest(&self) -> Option<&SensorReading> {
        self.readings.last()
    }
}

pub struct RealTimeMonitor<A> {
    api: SharedApi<A>,
    interval: Duration,
    limit: usize,
    generation: AtomicU64,
    tx: watch::Sender<MonitorSnapshot>,
    task: Mutex<Option<JoinHandle<()>>>,
}

impl<A: MaintenanceApi + 'static> RealTimeMonitor<A> {
    pub fn new(api: SharedApi<A>, interval: Duration, limit: usize) -> Arc<Self> {
        let (tx, _rx) = watch::channel(MonitorSnapshot::default());
        Arc::new(Self {
            api,
            interval,
            limit: readings::clamp_limit(limit),
            generation: AtomicU64::new(0),
            tx,
            task: Mutex::new(None),
        })
    }

    pub fn snapshot(&self) -> MonitorSnapshot {
        self.tx.borrow().clone()
    }

    pub fn subscribe(&self) -> watch::Receiver<MonitorSnapshot> {
        self.tx.subscribe()
    }

    pub fn is_polling(&self) -> bool {
        self.task.lock().as_ref().is_some_and(|h| !h.is_finished())
    }

    /// Change la machine suivie. Le premier fetch part immédiatement.
    pub fn select(self: &Arc<Self>, equipment_id: Option<&str>) {
        let mut task = self.task.lock();
        if let Some(handle) = task.take() {
            handle.abort();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;

        let Some(id) = equipment_id.map(str::to_string) else {
            debug!("[monitor] selection cleared (generation {generation})");
            self.tx.send_replace(MonitorSnapshot { generation, ..MonitorSnapshot::default() });
            return;
        };

        debug!("[monitor] watching {id} (generation {generation})");
        self.tx.send_modify(|snap| {
            if snap.equipment_id.as_deref() != Some(id.as_str()) {
                *snap = MonitorSnapshot { equipment_id: Some(id.clone()), ..MonitorSnapshot::default() };
            }
            snap.state = MonitorState::Loading;
            snap.generation = generation;
        });

        let weak = Arc::downgrade(self);
        let period = self.interval;
        *task = Some(tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let Some(monitor) = weak.upgrade() else { break };
                monitor.refresh_for(generation, &id).await;
            }
        }));
    }

    /// Arrête le polling ; les réponses en vol sont jetées.
    pub fn stop(&self) {
        if let Some(handle) = self.task.lock().take() {
            handle.abort();
        }
        let generation = self.generation.fetch_add(1, Ordering::SeqCst) + 1;
        self.tx.send_modify(|snap| {
            snap.generation = generation;
            if snap.state == MonitorState::Loading {
                snap.state = if snap.readings.is_empty() { MonitorState::NoSelection } else { MonitorState::Ready };
            }
        });
    }

    /// Fetch manuel pour la sélection courante
    pub async fn refresh(&self) -> Result<MonitorSnapshot, ViewError> {
        let generation = self.generation.load(Ordering::SeqCst);
        let id = self.tx.borrow().equipment_id.clone().ok_or(ViewError::NoSelection)?;
        self.refresh_for(generation, &id).await;
        Ok(self.snapshot())
    }

    async fn refresh_for(&self, generation: u64, equipment_id: &str) {
        if !self.publish(generation, |snap| snap.state = MonitorState::Loading) {
            return;
        }

        let (latest, reading_source) = match self.api.equipment_readings(equipment_id, self.limit).await {
            Ok(fetched) => {
                let readings = normalize_order(fetched.data);
                let latest = readings::latest(&readings).cloned();
                let source = fetched.source.clone();
                let applied = self.publish(generation, |snap| {
                    snap.readings = readings;
                    snap.reading_error = None;
                    snap.source = fetched.source;
                    snap.last_updated = Some(Utc::now());
                });
                if !applied {
                    return;
                }
                (latest, source)
            }
            Err(e) => {
                warn!("[monitor] readings for {equipment_id} failed: {e}");
                self.publish(generation, |snap| {
                    snap.reading_error = Some(e.to_string());
                    snap.state = MonitorState::Error;
                });
                return;
            }
        };

        let request = PredictionRequest { equipment_id: equipment_id.to_string(), reading: latest };
        let outcome = self.api.predict(&request).await;
        self.publish(generation, |snap| {
            match outcome {
                Ok(fetched) => {
                    snap.source = reading_source.merge(&fetched.source);
                    snap.prediction = Some(fetched.data);
                    snap.prediction_error = None;
                }
                Err(e) => {
                    warn!("[monitor] prediction for {equipment_id} failed: {e}");
                    snap.prediction_error = Some(e.to_string());
                }
            }
            snap.state = MonitorState::Ready;
        });
    }

    /// Applique `f` seulement si `generation` est toujours la génération courante.
    fn publish<F>(&self, generation: u64, f: F) -> bool
    where
        F: FnOnce(&mut MonitorSnapshot),
    {
        let mut applied = false;
        self.tx.send_if_modified(|snap| {
            if self.generation.load(Ordering::SeqCst) != generation {
                return false;
            }
            f(snap);
            applied = true;
            true
        });
        if !applied {
            debug!("[monitor] discarding stale response (generation {generation})");
        }
        applied
    }
}

impl<A> Drop for RealTimeMonitor<A> {
    fn drop(&mut self) {
        if let Some(handle) = self.task.get_mut().take() {
            handle.abort();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedApi;
    use crate::api::{Endpoint, FallbackApi};

    const IDLE: Duration = Duration::from_secs(3600);

    async fn wait_ready(monitor: &RealTimeMonitor<ScriptedApi>, id: &str) -> MonitorSnapshot {
        let mut rx = monitor.subscribe();
        let snap = tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|s| s.equipment_id.as_deref() == Some(id) && s.state != MonitorState::Loading),
        )
        .await
        .expect("monitor never settled")
        .unwrap()
        .clone();
        snap
    }

    #[tokio::test]
    async fn test_select_fetches_readings_then_prediction() {
        let monitor = RealTimeMonitor::new(Arc::new(FallbackApi::new(ScriptedApi::new())), IDLE, 12);
        monitor.select(Some("PUMP001"));
        let snap = wait_ready(&monitor, "PUMP001").await;

        assert_eq!(snap.state, MonitorState::Ready);
        assert_eq!(snap.readings.len(), 12);
        assert!(snap.readings.windows(2).all(|w| w[0].timestamp <= w[1].timestamp));
        assert_eq!(snap.prediction.unwrap().equipment_id, "PUMP001");
        assert_eq!(snap.source, DataSource::Live);
        assert!(monitor.is_polling());
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let api = Arc::new(FallbackApi::new(ScriptedApi::new()));
        let monitor = RealTimeMonitor::new(api.clone(), IDLE, 5);
        monitor.select(Some("PUMP001"));
        wait_ready(&monitor, "PUMP001").await;

        // un refresh lent pour A est en vol quand B est sélectionné
        api.inner().delay_readings("PUMP001", Duration::from_millis(150));
        let slow = tokio::spawn({
            let monitor = monitor.clone();
            async move { monitor.refresh().await }
        });
        tokio::time::sleep(Duration::from_millis(20)).await;

        monitor.select(Some("HVAC002"));
        wait_ready(&monitor, "HVAC002").await;
        slow.await.unwrap().unwrap();

        let snap = monitor.snapshot();
        assert_eq!(snap.equipment_id.as_deref(), Some("HVAC002"));
        assert!(snap.readings.iter().all(|r| r.equipment_id == "HVAC002"));
        assert_eq!(snap.prediction.unwrap().equipment_id, "HVAC002");
    }

    #[tokio::test]
    async fn test_clearing_selection_stops_timer() {
        let api = Arc::new(FallbackApi::new(ScriptedApi::new()));
        let monitor = RealTimeMonitor::new(api.clone(), Duration::from_millis(30), 5);
        monitor.select(Some("MOTOR003"));
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert!(api.inner().calls(Endpoint::EquipmentReadings) >= 2);

        monitor.select(None);
        assert!(!monitor.is_polling());
        assert_eq!(monitor.snapshot().state, MonitorState::NoSelection);
        let calls = api.inner().calls(Endpoint::EquipmentReadings);
        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(api.inner().calls(Endpoint::EquipmentReadings), calls);
    }

    #[tokio::test]
    async fn test_reading_failure_keeps_data_and_timer() {
        let api = Arc::new(FallbackApi::new(ScriptedApi::new()).with_synthesis(false));
        let monitor = RealTimeMonitor::new(api.clone(), Duration::from_millis(30), 5);
        monitor.select(Some("PUMP001"));
        wait_ready(&monitor, "PUMP001").await;

        api.inner().fail(Endpoint::EquipmentReadings);
        let mut rx = monitor.subscribe();
        let snap = tokio::time::timeout(Duration::from_secs(2), rx.wait_for(|s| s.state == MonitorState::Error))
            .await
            .unwrap()
            .unwrap()
            .clone();
        assert!(snap.reading_error.is_some());
        assert_eq!(snap.readings.len(), 5, "previous readings retained");
        assert!(monitor.is_polling());

        api.inner().recover(Endpoint::EquipmentReadings);
        let snap = tokio::time::timeout(
            Duration::from_secs(2),
            rx.wait_for(|s| s.state == MonitorState::Ready && s.reading_error.is_none()),
        )
        .await
        .unwrap()
        .unwrap()
        .clone();
        assert!(snap.prediction.is_some());
    }

    #[tokio::test]
    async fn test_prediction_failure_is_reported_independently() {
        let api = ScriptedApi::new();
        api.fail(Endpoint::Predict);
        let monitor = RealTimeMonitor::new(Arc::new(FallbackApi::new(api).with_synthesis(false)), IDLE, 5);
        monitor.select(Some("TURBINE004"));
        let snap = wait_ready(&monitor, "TURBINE004").await;
        assert_eq!(snap.readings.len(), 5);
        assert!(snap.reading_error.is_none());
        assert!(snap.prediction_error.is_some());
        assert!(snap.prediction.is_none());
    }

    #[tokio::test]
    async fn test_offline_monitor_is_marked_synthetic() {
        let api = ScriptedApi::new();
        api.set_offline(true);
        let monitor = RealTimeMonitor::new(Arc::new(FallbackApi::new(api)), IDLE, 5);
        monitor.select(Some("PUMP001"));
        let snap = wait_ready(&monitor, "PUMP001").await;
        assert_eq!(snap.state, MonitorState::Ready);
        assert!(snap.source.is_synthetic());
        monitor.stop();
        assert!(!monitor.is_polling());
    }

    #[tokio::test]
    async fn test_oversized_limit_is_capped() {
        let monitor = RealTimeMonitor::new(Arc::new(FallbackApi::new(ScriptedApi::new())), IDLE, 50_000);
        monitor.select(Some("MOTOR003"));
        let snap = wait_ready(&monitor, "MOTOR003").await;
        assert_eq!(snap.readings.len(), readings::MAX_READINGS_LIMIT);
        monitor.stop();
    }
}
