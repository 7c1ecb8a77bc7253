use std::time::SystemTime;

use actix_web::http::header;
use actix_web::{web, HttpRequest, HttpResponse, Result};
use serde::{Deserialize, Serialize};

use crate::auth::token::{mint_token, verify_token};
use crate::error::AppError;
use crate::state::app_state::AppState;

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    #[serde(default)]
    pub username: String,
    #[serde(default)]
    pub password: String,
}

#[derive(Debug, Serialize)]
pub struct LoginResponse {
    pub token: String,
}

/// Verify credentials against the configured backend and mint a token.
async fn login(
    req: web::Json<LoginRequest>,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    if req.username.trim().is_empty() {
        return Err(AppError::bad_request(
            "INVALID_USERNAME",
            "Username cannot be empty".to_string(),
        ));
    }

    let expires_at = SystemTime::now() + app_state.security.token_duration;
    let claims = app_state
        .authenticator
        .authenticate(&req.username, &req.password, expires_at)
        .await?;

    let token = mint_token(&claims, &app_state.security)?;

    Ok(HttpResponse::Ok().json(LoginResponse { token }))
}

/// Decode and check the presented bearer, returning its claims.
async fn validate(
    req: HttpRequest,
    app_state: web::Data<AppState>,
) -> Result<HttpResponse, AppError> {
    let token = bearer_from(&req)?;
    let claims = verify_token(
        &token,
        app_state.security.algorithm,
        &app_state.security.decoding_key,
    )?;
    Ok(HttpResponse::Ok().json(claims))
}

/// Serve the PEM verification key so token consumers can check signatures
/// themselves.
async fn certificate(app_state: web::Data<AppState>) -> HttpResponse {
    HttpResponse::Ok()
        .content_type("application/x-pem-file")
        .body(app_state.security.public_key_pem.clone())
}

fn bearer_from(req: &HttpRequest) -> Result<String, AppError> {
    let raw = req
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .ok_or(AppError::UnauthorizedMissingBearer)?;
    match raw.split_once(' ') {
        Some(("Bearer", token)) if !token.is_empty() => Ok(token.to_string()),
        _ => Err(AppError::UnauthorizedMissingBearer),
    }
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/login").route(web::post().to(login)));
    cfg.service(web::resource("/validate").route(web::get().to(validate)));
    cfg.service(web::resource("/certificate").route(web::get().to(certificate)));
}
