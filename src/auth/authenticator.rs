use actix_web::{dev::Payload, web, FromRequest, HttpRequest};
use futures::future::LocalBoxFuture;
use std::sync::Arc;
use tracing::debug;

use crate::auth::codec::{CredentialCodec, CredentialKind};
use crate::db::{User, UserStore};
use crate::error::{AppError, AuthError, CredentialError, Rejection};
use crate::{AppState, Result};

/// Request-time gate for access credentials.
///
/// Never consults the session registry: an access credential stays valid
/// until its own expiry even after the refresh credential minted with it
/// has been rotated or revoked.
pub struct Authenticator {
    codec: Arc<CredentialCodec>,
    users: Arc<dyn UserStore>,
}

impl Authenticator {
    pub fn new(codec: Arc<CredentialCodec>, users: Arc<dyn UserStore>) -> Self {
        Self { codec, users }
    }

    pub async fn authenticate(&self, bearer: Option<&str>) -> Result<User> {
        let token = bearer
            .map(str::trim)
            .filter(|t| !t.is_empty())
            .ok_or_else(|| reject(Rejection::MissingToken))?;

        let credential = self.codec.verify(token).map_err(|e| match e {
            CredentialError::Expired => reject(Rejection::TokenExpired),
            _ => reject(Rejection::InvalidToken),
        })?;

        if credential.kind != CredentialKind::Access {
            debug!(kind = %credential.kind, "non-access credential presented to request gate");
            return Err(reject(Rejection::InvalidToken));
        }

        self.users
            .find_user_by_id(credential.subject_id)
            .await?
            .ok_or_else(|| reject(Rejection::UnknownSubject))
    }
}

fn reject(rejection: Rejection) -> AppError {
    AppError::AuthError(AuthError::Unauthenticated(rejection))
}

/// Extracts the credential from an `Authorization: Bearer <token>` header.
pub fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Authenticated user resolved from the request's access credential.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

impl FromRequest for CurrentUser {
    type Error = AppError;
    type Future = LocalBoxFuture<'static, std::result::Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        let state = req.app_data::<web::Data<AppState>>().cloned();
        let token = bearer_token(req).map(str::to_owned);

        Box::pin(async move {
            let state = state
                .ok_or_else(|| AppError::InternalError("application state not configured".into()))?;
            let user = state.authenticator.authenticate(token.as_deref()).await?;
            Ok(CurrentUser(user))
        })
    }
}
