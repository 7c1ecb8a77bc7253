//! RBAC enforcement middleware.
//!
//! Runs the policy decision procedure before the wrapped routes and stores
//! the resolved [`Identity`] in request extensions. Handlers recover it via
//! the `Identity` extractor. Every request re-verifies the token signature;
//! no decision is cached.

use actix_web::dev::{forward_ready, Service, ServiceRequest, ServiceResponse, Transform};
use actix_web::http::header;
use actix_web::{web, Error, HttpMessage};
use futures_util::future::{ready, LocalBoxFuture, Ready};

use crate::error::AppError;
use crate::state::app_state::AdminState;

pub struct RoleGuard;

impl<S, B> Transform<S, ServiceRequest> for RoleGuard
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type InitError = ();
    type Transform = RoleGuardMiddleware<S>;
    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ready(Ok(RoleGuardMiddleware { service }))
    }
}

pub struct RoleGuardMiddleware<S> {
    service: S,
}

impl<S, B> Service<ServiceRequest> for RoleGuardMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error>,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let bearer = match extract_bearer_from_header(req.headers().get(header::AUTHORIZATION)) {
            Ok(bearer) => bearer,
            Err(err) => return Box::pin(async { Err(err.into()) }),
        };

        let state = match req.app_data::<web::Data<AdminState>>() {
            Some(state) => state,
            None => {
                return Box::pin(async {
                    Err(AppError::internal("AdminState not available".to_string()).into())
                });
            }
        };

        let decision = state
            .rbac
            .authorize(req.method().as_str(), req.path(), bearer.as_deref());

        match decision {
            Ok(identity) => {
                // Attach the decoded identity BEFORE calling the service
                req.extensions_mut().insert(identity);
                let fut = self.service.call(req);
                Box::pin(fut)
            }
            Err(e) => Box::pin(async move { Err(e.into()) }),
        }
    }
}

fn extract_bearer_from_header(
    header_value: Option<&actix_web::http::header::HeaderValue>,
) -> Result<Option<String>, AppError> {
    let auth_value = match header_value {
        Some(value) => value,
        None => return Ok(None),
    };

    let auth_str = auth_value
        .to_str()
        .map_err(|_| AppError::UnauthorizedMissingBearer)?;

    let parts: Vec<&str> = auth_str.split_whitespace().collect();
    if parts.len() != 2 || parts[0] != "Bearer" || parts[1].is_empty() {
        return Err(AppError::UnauthorizedMissingBearer);
    }

    Ok(Some(parts[1].to_string()))
}

#[cfg(test)]
mod tests {
    use actix_web::http::header::HeaderValue;

    use super::extract_bearer_from_header;
    use crate::error::AppError;

    #[test]
    fn absent_header_is_simply_no_credential() {
        assert_eq!(extract_bearer_from_header(None).unwrap(), None);
    }

    #[test]
    fn well_formed_bearer_is_extracted() {
        let value = HeaderValue::from_static("Bearer abc.def.ghi");
        assert_eq!(
            extract_bearer_from_header(Some(&value)).unwrap(),
            Some("abc.def.ghi".to_string())
        );
    }

    #[test]
    fn malformed_headers_are_rejected() {
        for raw in ["abc", "Basic abc", "Bearer", "Bearer a b"] {
            let value = HeaderValue::from_static(raw);
            assert!(matches!(
                extract_bearer_from_header(Some(&value)),
                Err(AppError::UnauthorizedMissingBearer)
            ));
        }
    }
}
