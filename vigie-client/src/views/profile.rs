//! User profile: details update and password change for the logged-in user.

use tracing::info;

use crate::api::MaintenanceApi;
use crate::auth::{Authenticator, Session};
use crate::error::ViewError;
use crate::models::ProfileUpdate;
use crate::validation::{check_password, require};

pub struct UserProfile<'a, A> {
    auth: &'a Authenticator<A>,
}

impl<'a, A: MaintenanceApi> UserProfile<'a, A> {
    pub fn new(auth: &'a Authenticator<A>) -> Self {
        Self { auth }
    }

    pub async fn update_details(&self, name: Option<&str>, email: Option<&str>) -> Result<Session, ViewError> {
        self.auth.require()?;
        let update = ProfileUpdate {
            name: name.map(|n| require("name", n)).transpose()?,
            email: email.map(|e| require("email", e)).transpose()?,
            ..ProfileUpdate::default()
        };
        let user = self.auth.api().update_profile(&update).await?;
        info!("[profile] details updated for {}", user.email);
        Ok(self.auth.update_user(user)?)
    }

    /// Confirmation et longueur vérifiées avant l'appel
    pub async fn change_password(&self, current: &str, new: &str, confirmation: &str) -> Result<(), ViewError> {
        self.auth.require()?;
        let current = require("current_password", current)?;
        check_password(new, confirmation)?;
        let update = ProfileUpdate {
            current_password: Some(current),
            new_password: Some(new.to_string()),
            ..ProfileUpdate::default()
        };
        self.auth.api().update_profile(&update).await?;
        info!("[profile] password changed");
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::api::testing::ScriptedApi;
    use crate::api::{Endpoint, FallbackApi};
    use crate::auth::MemorySessionStore;
    use crate::error::{AuthError, ValidationError};
    use std::sync::Arc;

    fn auth() -> Authenticator<ScriptedApi> {
        let api = Arc::new(FallbackApi::new(ScriptedApi::new()));
        Authenticator::new(api, Box::new(MemorySessionStore::default()), true).unwrap()
    }

    #[tokio::test]
    async fn test_requires_session() {
        let auth = auth();
        let err = UserProfile::new(&auth).update_details(Some("Jo"), None).await.unwrap_err();
        assert!(matches!(err, ViewError::Auth(AuthError::NotLoggedIn)));
    }

    #[tokio::test]
    async fn test_update_details_refreshes_session() {
        let auth = auth();
        auth.login("tech@example.com", "tech1234").await.unwrap();
        let session = UserProfile::new(&auth).update_details(Some("Sam Tech"), None).await.unwrap();
        assert_eq!(session.user.name, "Sam Tech");
        assert_eq!(auth.current().unwrap().user.name, "Sam Tech");
    }

    #[tokio::test]
    async fn test_password_mismatch_checked_locally() {
        let auth = auth();
        auth.login("tech@example.com", "tech1234").await.unwrap();
        let profile = UserProfile::new(&auth);
        let err = profile.change_password("tech1234", "newpass1", "newpass2").await.unwrap_err();
        assert!(matches!(err, ViewError::Validation(ValidationError::PasswordMismatch)));
        assert_eq!(auth.api().inner().calls(Endpoint::UpdateProfile), 0);

        profile.change_password("tech1234", "newpass1", "newpass1").await.unwrap();
        assert_eq!(auth.api().inner().calls(Endpoint::UpdateProfile), 1);
    }
}
