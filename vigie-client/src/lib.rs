/*!
# Vigie Client - Couche de synchronisation du dashboard de maintenance prédictive

Tout ce que le dashboard affiche passe par ici :
- `api` : un appel REST par opération, contrat de fallback explicite par endpoint
- `mock` : données synthétiques déterministes (seed = identifiant d'équipement)
- `auth` : session (token + utilisateur) persistée sur disque
- `store` : état partagé observable (machine sélectionnée, bannière, navigation)
- `views` : contrôleurs des vues (monitor, alertes, connecteurs, planification...)
- `dashboard` : composition racine (montage, sélection, paramètres partagés)
*/

pub mod api;
pub mod auth;
pub mod config;
pub mod dashboard;
pub mod error;
pub mod mock;
pub mod models;
pub mod readings;
pub mod store;
pub mod validation;
pub mod views;

pub use api::{DataSource, FallbackApi, Fetched, HttpApi, MaintenanceApi, SharedApi};
pub use auth::{Authenticator, FileSessionStore, MemorySessionStore, Session, SessionStore};
pub use config::{load_config, ClientConfig};
pub use dashboard::Dashboard;
pub use error::{ApiError, AuthError, ValidationError, ViewError};
pub use store::{DashboardState, Store, View};
