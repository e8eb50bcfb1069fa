//! Error taxonomy shared by the API layer and the view controllers.

/// Échec d'un appel vers le backend
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ApiError {
    /// Backend injoignable (connexion refusée, timeout, DNS...)
    #[error("transport error: {0}")]
    Transport(String),
    /// Réponse non-2xx
    #[error("HTTP {status}: {message}")]
    Status { status: u16, message: String },
    /// Réponse 2xx dont le corps ne correspond pas au type attendu
    #[error("invalid response payload: {0}")]
    Decode(String),
    #[error("unauthorized")]
    Unauthorized,
    #[error("invalid request: {0}")]
    Request(String),
}

impl ApiError {
    /// True when the backend could not be reached at all.
    pub fn is_offline(&self) -> bool {
        matches!(self, ApiError::Transport(_))
    }
}

impl From<reqwest::Error> for ApiError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_decode() {
            ApiError::Decode(e.to_string())
        } else if e.is_builder() {
            ApiError::Request(e.to_string())
        } else if let Some(status) = e.status() {
            ApiError::Status {
                status: status.as_u16(),
                message: e.to_string(),
            }
        } else {
            ApiError::Transport(e.to_string())
        }
    }
}

/// Contrôles de formulaire effectués avant tout appel réseau
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("Passwords do not match")]
    PasswordMismatch,
    #[error("Password must be at least {0} characters")]
    PasswordTooShort(usize),
    #[error("Missing required field: {0}")]
    MissingField(String),
    #[error("Unknown field: {0}")]
    UnknownField(String),
    #[error("Field '{field}' must be a number (got '{value}')")]
    InvalidNumber { field: String, value: String },
    #[error("Field '{field}' must be valid JSON: {reason}")]
    InvalidJson { field: String, reason: String },
    #[error("Invalid date '{0}', expected YYYY-MM-DD")]
    InvalidDate(String),
    #[error("Unsupported file type: {0} (expected .csv or .json)")]
    UnsupportedFile(String),
    #[error("Invalid alert rule: {0}")]
    InvalidRule(String),
}

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("Invalid email or password")]
    InvalidCredentials,
    #[error("not logged in")]
    NotLoggedIn,
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error("session storage error: {0}")]
    Storage(String),
}

impl From<std::io::Error> for AuthError {
    fn from(e: std::io::Error) -> Self {
        AuthError::Storage(e.to_string())
    }
}

impl From<serde_json::Error> for AuthError {
    fn from(e: serde_json::Error) -> Self {
        AuthError::Storage(e.to_string())
    }
}

/// Erreurs remontées par les contrôleurs de vues
#[derive(Debug, thiserror::Error)]
pub enum ViewError {
    #[error(transparent)]
    Api(#[from] ApiError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },
    #[error("no equipment selected")]
    NoSelection,
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_offline_classification() {
        assert!(ApiError::Transport("connection refused".into()).is_offline());
        assert!(!ApiError::Unauthorized.is_offline());
        assert!(!ApiError::Status { status: 500, message: "boom".into() }.is_offline());
    }

    #[test]
    fn test_messages_match_form_banners() {
        assert_eq!(AuthError::InvalidCredentials.to_string(), "Invalid email or password");
        assert_eq!(ValidationError::PasswordMismatch.to_string(), "Passwords do not match");
        let err = ValidationError::InvalidNumber { field: "interval".into(), value: "abc".into() };
        assert_eq!(err.to_string(), "Field 'interval' must be a number (got 'abc')");
    }
}
