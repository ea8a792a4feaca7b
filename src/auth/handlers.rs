use actix_web::{web, HttpResponse};
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

use crate::auth::authenticator::CurrentUser;
use crate::auth::password;
use crate::auth::service::TokenPair;
use crate::db::User;
use crate::error::{AppError, AuthError, Rejection};
use crate::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthResponse {
    #[serde(flatten)]
    pub tokens: TokenPair,
    pub user: User,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RefreshRequest {
    pub refresh_token: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

pub async fn login(
    req: web::Json<LoginRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let email = req.email.trim().to_lowercase();
    if email.is_empty() || req.password.is_empty() {
        return Err(AppError::ValidationError("email and password are required".into()));
    }

    let user = match state.users.find_user_by_email(&email).await? {
        Some(user) if state.passwords.verify(&req.password, &user.password_hash) => user,
        _ => {
            warn!(email = %email, "login rejected");
            return Err(AuthError::InvalidCredentials.into());
        }
    };

    let tokens = state.sessions.login(user.id).await?;
    info!(user_id = %user.id, "login successful");

    Ok(HttpResponse::Ok().json(AuthResponse { tokens, user }))
}

pub async fn refresh_token(
    req: web::Json<RefreshRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = req
        .refresh_token
        .as_deref()
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingRefresh)?;

    let tokens = state.sessions.refresh(token).await?;
    Ok(HttpResponse::Ok().json(tokens))
}

pub async fn logout(
    CurrentUser(user): CurrentUser,
    req: Option<web::Json<RefreshRequest>>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if let Some(token) = req.as_ref().and_then(|r| r.refresh_token.as_deref()) {
        state.sessions.logout(token).await?;
    }
    info!(user_id = %user.id, "logged out");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Logged out successfully"
    })))
}

pub async fn logout_all(
    CurrentUser(user): CurrentUser,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let revoked = state.sessions.revoke_all(user.id).await?;

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "All sessions revoked",
        "revoked": revoked
    })))
}

pub async fn me(CurrentUser(user): CurrentUser) -> HttpResponse {
    HttpResponse::Ok().json(user)
}

/// Stores a new password hash and signs the user out of every device.
pub async fn change_password(
    CurrentUser(user): CurrentUser,
    req: web::Json<ChangePasswordRequest>,
    state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if !state.passwords.verify(&req.current_password, &user.password_hash) {
        warn!(user_id = %user.id, "password change rejected");
        return Err(AuthError::InvalidCredentials.into());
    }
    password::check_strength(&req.new_password)?;

    let password_hash = state.passwords.hash(&req.new_password)?;
    if !state.users.update_password_hash(user.id, &password_hash).await? {
        return Err(AuthError::Unauthenticated(Rejection::UnknownSubject).into());
    }

    let revoked = state.sessions.revoke_all(user.id).await?;
    info!(user_id = %user.id, revoked, "password changed, sessions revoked");

    Ok(HttpResponse::Ok().json(serde_json::json!({
        "message": "Password updated",
        "revoked": revoked
    })))
}

/// Mounts the auth and profile routes under the caller's scope.
pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.route("/auth/login", web::post().to(login))
        .route("/auth/refresh-token", web::post().to(refresh_token))
        .route("/auth/logout", web::post().to(logout))
        .route("/auth/logout-all", web::post().to(logout_all))
        .route("/users/me", web::get().to(me))
        .route("/users/me/password", web::put().to(change_password));
}
