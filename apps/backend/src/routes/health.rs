use actix_web::{web, HttpResponse};

async fn ok() -> HttpResponse {
    HttpResponse::Ok().finish()
}

pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/ok").route(web::get().to(ok)));
}
