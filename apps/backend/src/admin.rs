use actix_web::{web, App, HttpServer};
use backend::backends::user_store_from_config;
use backend::config::AdminServerConfig;
use backend::middleware::cors::cors_middleware;
use backend::middleware::role_guard::RoleGuard;
use backend::rbac::{Policy, RbacState};
use backend::routes;
use backend::state::app_state::AdminState;
use backend::telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    let config = match AdminServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    if config.disable_security {
        eprintln!("⚠️  Security disabled: every request is allowed");
    }

    let policy = match Policy::from_file(&config.rbac_file) {
        Ok(policy) => policy,
        Err(e) => {
            eprintln!("❌ Failed to load RBAC policy: {e}");
            std::process::exit(1);
        }
    };

    let rbac = match RbacState::new(
        policy,
        &config.signing_method,
        &config.public_key_pem,
        config.admin_token.clone(),
        config.disable_security,
    ) {
        Ok(rbac) => rbac,
        Err(e) => {
            eprintln!("❌ Failed to load verification material: {e}");
            std::process::exit(1);
        }
    };

    let store = match user_store_from_config(&config.backend).await {
        Ok(store) => store,
        Err(e) => {
            eprintln!("❌ Failed to build the record backend: {e}");
            std::process::exit(1);
        }
    };

    println!("🛡️  Starting authd-admin on http://{}", config.bind);

    let data = web::Data::new(AdminState::new(rbac, store));

    HttpServer::new(move || {
        App::new()
            .wrap(cors_middleware())
            .app_data(data.clone())
            .service(web::scope("/health").configure(routes::health::configure_routes))
            .service(
                web::scope("")
                    .wrap(RoleGuard)
                    .configure(routes::configure_admin_routes),
            )
    })
    .bind(config.bind.as_str())?
    .run()
    .await
}
