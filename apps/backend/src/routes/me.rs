//! Self-service routes. The policy file decides who may call these;
//! by convention they require the `self-service` role.

use actix_web::{web, HttpResponse, Result};
use serde::{Deserialize, Serialize};
use tracing::error;

use crate::backends::password_digest;
use crate::error::AppError;
use crate::rbac::Identity;
use crate::state::app_state::AdminState;

#[derive(Debug, Serialize)]
pub struct MeResponse {
    pub sub: String,
}

async fn get_me(identity: Identity) -> Result<HttpResponse, AppError> {
    Ok(HttpResponse::Ok().json(MeResponse { sub: identity.sub }))
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub new_password: String,
}

/// Re-digest the new password and write only the hash, round-tripping every
/// other field through the fetch.
async fn update_my_password(
    identity: Identity,
    req: web::Json<UpdatePasswordRequest>,
    state: web::Data<AdminState>,
) -> Result<HttpResponse, AppError> {
    let digest = password_digest(&req.new_password);
    state
        .store
        .update_user(
            &identity.sub,
            Box::new(move |user| {
                user.password_hash = digest;
                Ok(())
            }),
        )
        .await
        .map_err(|e| {
            error!(sub = %identity.sub, "password update failed: {e}");
            AppError::from(e)
        })?;

    Ok(HttpResponse::Ok().finish())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("").route(web::get().to(get_me)));
    cfg.service(web::resource("/password").route(web::put().to(update_my_password)));
}
