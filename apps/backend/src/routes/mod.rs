use actix_web::web;

pub mod auth;
pub mod health;
pub mod me;
pub mod users;

/// Routes served by the token issuance server (`authd`).
pub fn configure_auth_server(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/health").configure(health::configure_routes));
    cfg.service(web::scope("/auth").configure(auth::configure_routes));
}

/// Administrative routes, registered behind the RoleGuard by the caller.
pub fn configure_admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::scope("/me").configure(me::configure_routes));
    cfg.service(web::scope("/users").configure(users::configure_routes));
}
