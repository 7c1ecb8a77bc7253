//! Administrative API behind the RoleGuard: the policy example from the
//! design docs, plus the CRUD surface under admin and bootstrap bearers.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

use actix_http::Request;
use actix_web::dev::{Service, ServiceResponse};
use actix_web::{test, web, App};
use backend::auth::claims::{Claims, ExtraClaims};
use backend::auth::token::mint_token;
use backend::backends::file::FileStore;
use backend::backends::{password_digest, UserData, UserStore};
use backend::middleware::role_guard::RoleGuard;
use backend::rbac::{Policy, RbacState};
use backend::routes;
use backend::state::app_state::AdminState;
use backend::state::security_config::SecurityConfig;
use serde_json::Value;

const RSA_KEY: &[u8] = include_bytes!("../testdata/rsa_private.pem");
const RSA_PUB: &[u8] = include_bytes!("../testdata/rsa_public.pem");

fn policy() -> Policy {
    Policy::from_slice(
        br#"{
            "rules": [
                { "path": "/me", "verbs": ["GET"], "roles": ["self-service"] },
                { "path": "/me/password", "verbs": ["PUT"], "roles": ["self-service"] },
                { "path": "/users/{id}/password", "verbs": ["PUT"], "roles": ["self", "admin"] },
                { "path": "/users/{id}", "roles": ["admin"] }
            ]
        }"#,
    )
    .unwrap()
}

fn token_for(sub: &str, groups: &[&str]) -> String {
    let security =
        SecurityConfig::from_pem("RS256", RSA_KEY, RSA_PUB, Duration::from_secs(600)).unwrap();
    let now = SystemTime::now();
    let claims = Claims::new(
        sub,
        ExtraClaims {
            groups: groups.iter().map(|g| g.to_string()).collect(),
            ..ExtraClaims::default()
        },
        now,
        now + Duration::from_secs(600),
    );
    mint_token(&claims, &security).unwrap()
}

async fn admin_state(dir: &tempfile::TempDir) -> web::Data<AdminState> {
    let store = FileStore::open(&dir.path().join("users.json")).unwrap();
    store
        .create_user(
            "alice",
            &UserData {
                password_hash: password_digest("wonderland"),
                claims: ExtraClaims {
                    display_name: Some("Alice".to_string()),
                    email: Some("alice@example.org".to_string()),
                    email_verified: true,
                    groups: vec!["self-service".to_string()],
                },
            },
        )
        .await
        .unwrap();

    let rbac = RbacState::new(
        policy(),
        "RS256",
        RSA_PUB,
        Some("bootstrap-bearer".to_string()),
        false,
    )
    .unwrap();

    web::Data::new(AdminState::new(rbac, Arc::new(store)))
}

macro_rules! admin_app {
    ($data:expr) => {
        test::init_service(
            App::new().app_data($data.clone()).service(
                web::scope("")
                    .wrap(RoleGuard)
                    .configure(routes::configure_admin_routes),
            ),
        )
        .await
    };
}

/// Guard rejections surface as service-level errors; capture the status the
/// client would see.
async fn call_and_capture_status<S, B>(app: &S, req: Request) -> u16
where
    S: Service<Request, Response = ServiceResponse<B>, Error = actix_web::Error>,
{
    let err = match app.call(req).await {
        Ok(_) => panic!("expected error response"),
        Err(err) => err,
    };
    err.as_response_error().status_code().as_u16()
}

#[actix_web::test]
async fn self_service_token_may_read_and_change_its_own_password() {
    let dir = tempfile::tempdir().unwrap();
    let data = admin_state(&dir).await;
    let app = admin_app!(data);
    let token = token_for("alice", &["self-service"]);

    let req = test::TestRequest::get()
        .uri("/me")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["sub"], "alice");

    let req = test::TestRequest::put()
        .uri("/me/password")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(serde_json::json!({"new_password": "looking-glass"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    // Only the digest changed; the claims round-tripped through the fetch.
    let user = data.store.get_user("alice").await.unwrap();
    assert_eq!(user.password_hash, password_digest("looking-glass"));
    assert_eq!(user.claims.display_name.as_deref(), Some("Alice"));
    assert_eq!(user.claims.groups, vec!["self-service"]);
}

#[actix_web::test]
async fn viewer_token_is_forbidden_on_self_service_routes() {
    let dir = tempfile::tempdir().unwrap();
    let data = admin_state(&dir).await;
    let app = admin_app!(data);
    let token = token_for("alice", &["viewer"]);

    let req = test::TestRequest::put()
        .uri("/me/password")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(serde_json::json!({"new_password": "nope"}))
        .to_request();
    assert_eq!(call_and_capture_status(&app, req).await, 403);
}

#[actix_web::test]
async fn missing_token_is_unauthenticated() {
    let dir = tempfile::tempdir().unwrap();
    let data = admin_state(&dir).await;
    let app = admin_app!(data);

    let req = test::TestRequest::get().uri("/me").to_request();
    assert_eq!(call_and_capture_status(&app, req).await, 401);
}

#[actix_web::test]
async fn admin_token_runs_the_full_crud_lifecycle() {
    let dir = tempfile::tempdir().unwrap();
    let data = admin_state(&dir).await;
    let app = admin_app!(data);
    let token = token_for("root", &["admin"]);
    let auth = ("Authorization", format!("Bearer {token}"));

    let req = test::TestRequest::post()
        .uri("/users/bob")
        .insert_header(auth.clone())
        .set_json(serde_json::json!({
            "password": password_digest("builder"),
            "claims": { "display_name": "Bob", "groups": ["viewer"] }
        }))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 201);

    // Duplicate create conflicts and leaves the record alone.
    let req = test::TestRequest::post()
        .uri("/users/bob")
        .insert_header(auth.clone())
        .set_json(serde_json::json!({"password": "x", "claims": {}}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 409);

    let req = test::TestRequest::get()
        .uri("/users/bob")
        .insert_header(auth.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
    let body: Value = test::read_body_json(resp).await;
    assert_eq!(body["claims"]["display_name"], "Bob");
    // The stored digest is not echoed back on reads.
    assert!(body.get("password").is_none());

    let req = test::TestRequest::delete()
        .uri("/users/bob")
        .insert_header(auth.clone())
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 204);

    let req = test::TestRequest::get()
        .uri("/users/bob")
        .insert_header(auth)
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert_eq!(resp.status().as_u16(), 404);
}

#[actix_web::test]
async fn self_role_lets_a_user_change_only_their_own_password() {
    let dir = tempfile::tempdir().unwrap();
    let data = admin_state(&dir).await;
    let app = admin_app!(data);
    let token = token_for("alice", &["viewer"]);

    let req = test::TestRequest::put()
        .uri("/users/alice/password")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(serde_json::json!({"new_password": "rabbit-hole"}))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());

    let req = test::TestRequest::put()
        .uri("/users/bob/password")
        .insert_header(("Authorization", format!("Bearer {token}")))
        .set_json(serde_json::json!({"new_password": "rabbit-hole"}))
        .to_request();
    assert_eq!(call_and_capture_status(&app, req).await, 403);
}

#[actix_web::test]
async fn bootstrap_bearer_bypasses_role_checks() {
    let dir = tempfile::tempdir().unwrap();
    let data = admin_state(&dir).await;
    let app = admin_app!(data);

    let req = test::TestRequest::get()
        .uri("/users/alice")
        .insert_header(("Authorization", "Bearer bootstrap-bearer"))
        .to_request();
    let resp = test::call_service(&app, req).await;
    assert!(resp.status().is_success());
}
