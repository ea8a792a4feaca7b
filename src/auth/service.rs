use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::auth::codec::{CredentialCodec, CredentialKind};
use crate::db::SessionRegistry;
use crate::error::{AppError, AuthError};
use crate::Result;

/// An access/refresh pair handed to the client after login or rotation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

/// Login, rotation and revocation of refresh sessions.
///
/// Refresh credentials are single use. Rotation removes the old row before the
/// new pair is minted, and only the caller whose delete actually removed the
/// row gets a new pair. The two steps are not one transaction: a crash in
/// between leaves the client with no session and it has to log in again.
pub struct SessionService {
    codec: Arc<CredentialCodec>,
    registry: Arc<dyn SessionRegistry>,
}

impl SessionService {
    pub fn new(codec: Arc<CredentialCodec>, registry: Arc<dyn SessionRegistry>) -> Self {
        Self { codec, registry }
    }

    /// Mints a pair for `subject_id` and persists the refresh half.
    ///
    /// Nothing is returned unless the session row was written.
    pub async fn login(&self, subject_id: Uuid) -> Result<TokenPair> {
        let access = self.codec.issue(subject_id, CredentialKind::Access)?;
        let refresh = self.codec.issue(subject_id, CredentialKind::Refresh)?;

        self.registry
            .create(subject_id, &refresh.value, refresh.expires_at)
            .await?;

        debug!(user_id = %subject_id, expires_at = %refresh.expires_at, "session created");

        Ok(TokenPair {
            access_token: access.value,
            refresh_token: refresh.value,
        })
    }

    pub async fn refresh(&self, refresh_token: &str) -> Result<TokenPair> {
        let credential = self
            .codec
            .verify(refresh_token)
            .map_err(|_| invalid_refresh())?;

        if credential.kind != CredentialKind::Refresh {
            return Err(invalid_refresh());
        }

        let session = self
            .registry
            .find_live(refresh_token, Utc::now())
            .await?
            .ok_or_else(invalid_refresh)?;

        // A concurrent caller may have consumed the row since the lookup.
        if !self.registry.delete_by_value(refresh_token).await? {
            warn!(user_id = %session.user_id, "refresh credential consumed concurrently");
            return Err(invalid_refresh());
        }

        let pair = self.login(session.user_id).await?;
        info!(user_id = %session.user_id, "refresh session rotated");
        Ok(pair)
    }

    /// Idempotent; unknown values are accepted silently.
    pub async fn logout(&self, refresh_token: &str) -> Result<()> {
        if self.registry.delete_by_value(refresh_token).await? {
            debug!("session revoked");
        }
        Ok(())
    }

    /// Revokes every session of `subject_id`, forcing re-authentication on all devices.
    pub async fn revoke_all(&self, subject_id: Uuid) -> Result<u64> {
        let removed = self.registry.delete_by_owner(subject_id).await?;
        info!(user_id = %subject_id, removed, "revoked all sessions");
        Ok(removed)
    }
}

fn invalid_refresh() -> AppError {
    AppError::AuthError(AuthError::InvalidRefresh)
}
