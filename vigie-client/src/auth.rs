/**
 * AUTH - Session utilisateur (token bearer + enregistrement utilisateur)
 *
 * RÔLE :
 * Équivalent du localStorage du navigateur : la session survit au redémarrage
 * du process sous la forme d'un fichier JSON à deux clés (`auth_token`, `user`).
 *
 * FONCTIONNEMENT :
 * - login distant via /auth/login ; 401 => « Invalid email or password »
 * - backend injoignable + `fallback.mock_login` => comptes de démonstration
 * - le token est poussé vers l'API à chaque changement de session
 */

use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{info, warn};

use crate::api::{MaintenanceApi, SharedApi};
use crate::error::{ApiError, AuthError};
use crate::models::{LoginRequest, RegisterRequest, User};
use crate::validation::{check_password, require};

pub const TOKEN_KEY: &str = "auth_token";
pub const USER_KEY: &str = "user";

/// Préfixe des tokens émis hors ligne
pub const MOCK_TOKEN_PREFIX: &str = "mock-";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    #[serde(rename = "auth_token")]
    pub token: String,
    pub user: User,
}

impl Session {
    pub fn is_mock(&self) -> bool {
        self.token.starts_with(MOCK_TOKEN_PREFIX)
    }
}

pub trait SessionStore: Send + Sync {
    fn load(&self) -> Result<Option<Session>, AuthError>;
    fn save(&self, session: &Session) -> Result<(), AuthError>;
    fn clear(&self) -> Result<(), AuthError>;
}

pub struct FileSessionStore {
    path: PathBuf,
}

impl FileSessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl SessionStore for FileSessionStore {
    fn load(&self) -> Result<Option<Session>, AuthError> {
        if !self.path.exists() {
            return Ok(None);
        }
        let txt = fs::read_to_string(&self.path)?;
        match serde_json::from_str::<Session>(&txt) {
            Ok(session) => Ok(Some(session)),
            Err(e) => {
                // Une session illisible équivaut à une déconnexion
                warn!("[auth] ignoring unreadable session file {}: {e}", self.path.display());
                Ok(None)
            }
        }
    }

    fn save(&self, session: &Session) -> Result<(), AuthError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&self.path, serde_json::to_string_pretty(session)?)?;
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        match fs::remove_file(&self.path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(e.into()),
        }
    }
}

#[derive(Default)]
pub struct MemorySessionStore {
    session: Mutex<Option<Session>>,
}

impl SessionStore for MemorySessionStore {
    fn load(&self) -> Result<Option<Session>, AuthError> {
        Ok(self.session.lock().clone())
    }

    fn save(&self, session: &Session) -> Result<(), AuthError> {
        *self.session.lock() = Some(session.clone());
        Ok(())
    }

    fn clear(&self) -> Result<(), AuthError> {
        *self.session.lock() = None;
        Ok(())
    }
}

/// Comptes acceptés quand le backend d'auth est injoignable
const DEMO_ACCOUNTS: &[(&str, &str, &str, &str)] = &[("admin@example.com", "admin123", "Admin User", "Administrator")];

pub fn mock_authenticate(email: &str, password: &str) -> Result<Session, AuthError> {
    DEMO_ACCOUNTS
        .iter()
        .find(|(e, p, _, _)| *e == email && *p == password)
        .map(|(email, _, name, role)| Session {
            token: format!("{MOCK_TOKEN_PREFIX}{}", uuid::Uuid::new_v4()),
            user: User { id: "1".into(), name: (*name).into(), email: (*email).into(), role: (*role).into() },
        })
        .ok_or(AuthError::InvalidCredentials)
}

pub struct Authenticator<A> {
    api: SharedApi<A>,
    store: Box<dyn SessionStore>,
    mock_login: bool,
    current: Mutex<Option<Session>>,
}

impl<A: MaintenanceApi> Authenticator<A> {
    /// Restaure la session persistée s'il y en a une
    pub fn new(api: SharedApi<A>, store: Box<dyn SessionStore>, mock_login: bool) -> Result<Self, AuthError> {
        let current = store.load()?;
        if let Some(session) = &current {
            api.set_token(Some(session.token.clone()));
        }
        Ok(Self { api, store, mock_login, current: Mutex::new(current) })
    }

    pub fn current(&self) -> Option<Session> {
        self.current.lock().clone()
    }

    pub fn is_authenticated(&self) -> bool {
        self.current.lock().is_some()
    }

    pub fn require(&self) -> Result<Session, AuthError> {
        self.current().ok_or(AuthError::NotLoggedIn)
    }

    pub async fn login(&self, email: &str, password: &str) -> Result<Session, AuthError> {
        let email = require("email", email)?;
        let password = require("password", password)?;

        let request = LoginRequest { email: email.clone(), password: password.clone() };
        let session = match self.api.login(&request).await {
            Ok(resp) => Session { token: resp.token, user: resp.user },
            Err(ApiError::Unauthorized) | Err(ApiError::Status { status: 400 | 401 | 403, .. }) => {
                return Err(AuthError::InvalidCredentials)
            }
            Err(e) if e.is_offline() && self.mock_login => {
                warn!("[auth] backend unreachable, checking demo accounts");
                mock_authenticate(&email, &password)?
            }
            Err(e) => return Err(e.into()),
        };
        self.establish(session)
    }

    /// Vérifie la confirmation du mot de passe avant tout appel réseau
    pub async fn register(&self, name: &str, email: &str, password: &str, confirmation: &str) -> Result<Session, AuthError> {
        let name = require("name", name)?;
        let email = require("email", email)?;
        check_password(password, confirmation)?;

        let request = RegisterRequest { name, email, password: password.to_string() };
        let resp = self.api.register(&request).await?;
        self.establish(Session { token: resp.token, user: resp.user })
    }

    pub fn logout(&self) -> Result<(), AuthError> {
        self.store.clear()?;
        self.api.set_token(None);
        if let Some(session) = self.current.lock().take() {
            info!("[auth] {} logged out", session.user.email);
        }
        Ok(())
    }

    /// Remplace l'utilisateur de la session courante (mise à jour de profil)
    pub fn update_user(&self, user: User) -> Result<Session, AuthError> {
        let mut session = self.require()?;
        session.user = user;
        self.store.save(&session)?;
        *self.current.lock() = Some(session.clone());
        Ok(session)
    }

    pub(crate) fn api(&self) -> &SharedApi<A> {
        &self.api
    }

    fn establish(&self, session: Session) -> Result<Session, AuthError> {
        self.store.save(&session)?;
        self.api.set_token(Some(session.token.clone()));
        info!("[auth] {} logged in as {}", session.user.email, session.user.role);
        *self.current.lock() = Some(session.clone());
        Ok(session)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedApi;
    use crate::api::{Endpoint, FallbackApi};
    use crate::error::ValidationError;
    use std::sync::Arc;

    fn authenticator(offline: bool, mock_login: bool) -> Authenticator<ScriptedApi> {
        let api = ScriptedApi::new();
        api.set_offline(offline);
        let api = Arc::new(FallbackApi::new(api));
        Authenticator::new(api, Box::new(MemorySessionStore::default()), mock_login).unwrap()
    }

    #[tokio::test]
    async fn test_mock_login_when_backend_unreachable() {
        let auth = authenticator(true, true);
        let session = auth.login("admin@example.com", "admin123").await.unwrap();
        assert_eq!(session.user.role, "Administrator");
        assert!(session.is_mock());
        assert!(auth.is_authenticated());
        assert_eq!(auth.api().inner().token(), Some(session.token));
    }

    #[tokio::test]
    async fn test_mock_login_rejects_unknown_pair() {
        let auth = authenticator(true, true);
        let err = auth.login("admin@example.com", "wrong").await.unwrap_err();
        assert_eq!(err.to_string(), "Invalid email or password");
        assert!(!auth.is_authenticated());
    }

    #[tokio::test]
    async fn test_mock_login_disabled_propagates_transport_error() {
        let auth = authenticator(true, false);
        let err = auth.login("admin@example.com", "admin123").await.unwrap_err();
        assert!(matches!(err, AuthError::Api(ApiError::Transport(_))));
    }

    #[tokio::test]
    async fn test_remote_login_and_rejection() {
        let auth = authenticator(false, true);
        let session = auth.login("tech@example.com", "tech1234").await.unwrap();
        assert_eq!(session.token, "live-token");

        // un backend joignable qui refuse n'ouvre jamais les comptes de démo
        let err = auth.login("admin@example.com", "admin123").await.unwrap_err();
        assert!(matches!(err, AuthError::InvalidCredentials));
    }

    #[tokio::test]
    async fn test_register_checks_confirmation_before_calling() {
        let auth = authenticator(false, true);
        let err = auth.register("Jo", "jo@example.com", "secret1", "secret2").await.unwrap_err();
        assert!(matches!(err, AuthError::Validation(ValidationError::PasswordMismatch)));
        assert_eq!(auth.api().inner().calls(Endpoint::Register), 0);

        let session = auth.register("Jo", "jo@example.com", "secret1", "secret1").await.unwrap();
        assert_eq!(session.user.name, "Jo");
    }

    #[tokio::test]
    async fn test_file_session_survives_restart() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("session.json");

        let api = Arc::new(FallbackApi::new(ScriptedApi::new()));
        let auth = Authenticator::new(api.clone(), Box::new(FileSessionStore::new(&path)), true).unwrap();
        auth.login("tech@example.com", "tech1234").await.unwrap();

        let raw: serde_json::Value = serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(raw[TOKEN_KEY], "live-token");
        assert_eq!(raw[USER_KEY]["email"], "tech@example.com");

        let restored = Authenticator::new(api.clone(), Box::new(FileSessionStore::new(&path)), true).unwrap();
        assert_eq!(restored.current().unwrap().token, "live-token");

        restored.logout().unwrap();
        assert!(!path.exists());
        assert_eq!(api.inner().token(), None);
        assert!(matches!(restored.require(), Err(AuthError::NotLoggedIn)));
    }

    #[test]
    fn test_corrupt_session_file_reads_as_logged_out() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        fs::write(&path, "{not json").unwrap();
        assert_eq!(FileSessionStore::new(&path).load().unwrap(), None);
    }
}
