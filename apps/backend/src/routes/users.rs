//! Administrative user CRUD. Gated by the policy file; by convention these
//! routes require the `admin` role (password change also admits `self`).

use actix_web::{web, HttpResponse, Result};
use serde::{Deserialize, Serialize};

use crate::auth::claims::ExtraClaims;
use crate::backends::{password_digest, UserData};
use crate::error::AppError;
use crate::state::app_state::AdminState;

/// Read responses carry the claims only; the stored digest stays private
/// to the backend.
#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub claims: ExtraClaims,
}

async fn create_user(
    path: web::Path<String>,
    body: web::Json<UserData>,
    state: web::Data<AdminState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    state.store.create_user(&id, &body).await?;
    Ok(HttpResponse::Created().finish())
}

async fn get_user(
    path: web::Path<String>,
    state: web::Data<AdminState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let user = state.store.get_user(&id).await?;
    Ok(HttpResponse::Ok().json(UserResponse {
        claims: user.claims,
    }))
}

async fn update_user(
    path: web::Path<String>,
    body: web::Json<UserData>,
    state: web::Data<AdminState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let replacement = body.into_inner();
    state
        .store
        .update_user(
            &id,
            Box::new(move |user| {
                *user = replacement;
                Ok(())
            }),
        )
        .await?;
    Ok(HttpResponse::Ok().finish())
}

#[derive(Debug, Deserialize)]
pub struct UpdatePasswordRequest {
    pub new_password: String,
}

async fn update_user_password(
    path: web::Path<String>,
    body: web::Json<UpdatePasswordRequest>,
    state: web::Data<AdminState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    let digest = password_digest(&body.new_password);
    state
        .store
        .update_user(
            &id,
            Box::new(move |user| {
                user.password_hash = digest;
                Ok(())
            }),
        )
        .await?;
    Ok(HttpResponse::Ok().finish())
}

async fn delete_user(
    path: web::Path<String>,
    state: web::Data<AdminState>,
) -> Result<HttpResponse, AppError> {
    let id = path.into_inner();
    state.store.delete_user(&id).await?;
    Ok(HttpResponse::NoContent().finish())
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/{id}")
            .route(web::post().to(create_user))
            .route(web::get().to(get_user))
            .route(web::put().to(update_user))
            .route(web::delete().to(delete_user)),
    );
    cfg.service(web::resource("/{id}/password").route(web::put().to(update_user_password)));
}
