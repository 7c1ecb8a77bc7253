use actix_web::{web, App, HttpServer};
use backend::backends::authenticator_from_config;
use backend::config::AuthServerConfig;
use backend::middleware::cors::cors_middleware;
use backend::routes;
use backend::state::app_state::AppState;
use backend::state::security_config::SecurityConfig;
use backend::telemetry;

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    telemetry::init_tracing();

    // Environment variables must be set by the runtime environment:
    // - Docker: via env_file or --env-file
    // - Local dev: source env files manually (e.g. set -a; . ./.env; set +a)
    let config = match AuthServerConfig::from_env() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("❌ {e}");
            std::process::exit(1);
        }
    };

    let security = match SecurityConfig::from_pem(
        &config.signing_method,
        &config.signing_key_pem,
        &config.public_key_pem,
        config.token_duration,
    ) {
        Ok(security) => security,
        Err(e) => {
            eprintln!("❌ Failed to load signing material: {e}");
            std::process::exit(1);
        }
    };

    let authenticator = match authenticator_from_config(&config.backend).await {
        Ok(authenticator) => authenticator,
        Err(e) => {
            eprintln!("❌ Failed to build the authentication backend: {e}");
            std::process::exit(1);
        }
    };

    println!("🔑 Starting authd on http://{}", config.bind);

    let data = web::Data::new(AppState::new(security, authenticator));

    HttpServer::new(move || {
        App::new()
            .wrap(cors_middleware())
            .app_data(data.clone())
            .configure(routes::configure_auth_server)
    })
    .bind(config.bind.as_str())?
    .run()
    .await
}
