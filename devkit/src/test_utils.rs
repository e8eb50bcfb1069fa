/*!
Backend de test pour le client Vigie

Facilite l'écriture de tests de bout en bout avec:
- Démarrage du stub sur un port éphémère de 127.0.0.1
- Config client pointant dessus (session isolée dans un tempdir)
- Pilotage des pannes et assertions sur les appels reçus
*/

use anyhow::Result;
use serde_json::Value;
use std::net::SocketAddr;
use std::path::Path;
use std::sync::Arc;
use std::time::Duration;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;

use vigie_client::models::{AlertRule, MaintenanceRequest};
use vigie_client::{ClientConfig, FallbackApi, HttpApi, SharedApi};

use crate::stub_backend::{build_router, StubState};

pub struct TestBackend {
    addr: SocketAddr,
    state: StubState,
    task: JoinHandle<()>,
}

impl TestBackend {
    /// Démarre un stub frais sur 127.0.0.1:0
    pub async fn spawn() -> Result<Self> {
        env_logger::try_init().ok(); // Init logging pour tests

        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = StubState::new();
        let app = build_router(state.clone());
        let task = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app).await {
                log::error!("[stub] server stopped: {e}");
            }
        });
        log::info!("[stub] listening on {addr}");
        Ok(Self { addr, state, task })
    }

    pub fn base_url(&self) -> String {
        format!("http://{}/api", self.addr)
    }

    pub fn state(&self) -> &StubState {
        &self.state
    }

    /// Config client vers ce stub ; la session est écrite sous `session_dir`
    pub fn client_config(&self, session_dir: &Path) -> ClientConfig {
        ClientConfig {
            api_url: self.base_url(),
            request_timeout_secs: 5,
            session_file: Some(session_dir.join("session.json")),
            ..ClientConfig::default()
        }
    }

    pub fn api(&self) -> Result<SharedApi<HttpApi>> {
        let config = ClientConfig { api_url: self.base_url(), request_timeout_secs: 5, ..ClientConfig::default() };
        Ok(Arc::new(FallbackApi::from_config(HttpApi::new(&config)?, &config)))
    }

    /// Nombre d'appels reçus pour une route, ex. "POST /connector/setup"
    pub fn calls(&self, route: &str) -> usize {
        self.state.data.lock().calls.get(route).copied().unwrap_or(0)
    }

    pub fn set_offline(&self, offline: bool) {
        self.state.data.lock().offline = offline;
    }

    pub fn fail(&self, route: &str) {
        self.state.data.lock().failing.insert(route.to_string());
    }

    pub fn recover(&self, route: &str) {
        self.state.data.lock().failing.remove(route);
    }

    pub fn delay_readings(&self, equipment_id: &str, delay: Duration) {
        self.state.data.lock().readings_delay.insert(equipment_id.to_string(), delay);
    }

    pub fn connector_bodies(&self) -> Vec<Value> {
        self.state.data.lock().connector_bodies.clone()
    }

    pub fn saved_rule_batches(&self) -> Vec<Vec<AlertRule>> {
        self.state.data.lock().saved_rule_batches.clone()
    }

    pub fn scheduled(&self) -> Vec<MaintenanceRequest> {
        self.state.data.lock().scheduled.clone()
    }

    pub fn uploads(&self) -> Vec<(String, usize)> {
        self.state.data.lock().uploads.clone()
    }
}

impl Drop for TestBackend {
    fn drop(&mut self) {
        self.task.abort();
    }
}

/// URL d'un port local fermé : toute requête échoue au niveau transport
pub async fn unreachable_url() -> Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    drop(listener);
    Ok(format!("http://{addr}/api"))
}
