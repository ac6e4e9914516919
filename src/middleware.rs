use std::rc::Rc;

use actix_service::{forward_ready, Service};
use actix_web::dev::{ServiceRequest, ServiceResponse, Transform};
use actix_web::http::StatusCode;
use actix_web::{Error, HttpMessage, HttpResponse, ResponseError};
use futures::future::{ok, LocalBoxFuture, Ready};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use serde_json::json;
use thiserror::Error;

use crate::models::Claims;

/// Subject of a verified admin token, stored in request extensions.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdminIdentity(pub String);

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("Authorization header missing")]
    MissingHeader,

    #[error("Invalid authorization scheme")]
    InvalidScheme,

    #[error("Invalid token")]
    InvalidToken(#[from] jsonwebtoken::errors::Error),
}

impl ResponseError for AuthError {
    fn status_code(&self) -> StatusCode {
        StatusCode::UNAUTHORIZED
    }

    fn error_response(&self) -> HttpResponse {
        HttpResponse::Unauthorized().json(json!({ "error": self.to_string() }))
    }
}

fn bearer_token(req: &ServiceRequest) -> Result<&str, AuthError> {
    let header = req
        .headers()
        .get("Authorization")
        .ok_or(AuthError::MissingHeader)?
        .to_str()
        .map_err(|_| AuthError::InvalidScheme)?;
    header.strip_prefix("Bearer ").ok_or(AuthError::InvalidScheme)
}

fn verify(req: &ServiceRequest, secret: &str) -> Result<AdminIdentity, AuthError> {
    let token = bearer_token(req)?;
    let data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_ref()),
        &Validation::new(Algorithm::HS256),
    )?;
    Ok(AdminIdentity(data.claims.sub))
}

/// Gate for the admin screens: requests need an HS256 bearer token signed
/// with the shared secret of the authentication service.
pub struct AdminAuth {
    secret: String,
}

impl AdminAuth {
    pub fn new(secret: String) -> Self {
        AdminAuth { secret }
    }
}

impl<S, B> Transform<S, ServiceRequest> for AdminAuth
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Transform = AdminAuthMiddleware<S>;
    type InitError = ();

    type Future = Ready<Result<Self::Transform, Self::InitError>>;

    fn new_transform(&self, service: S) -> Self::Future {
        ok(AdminAuthMiddleware {
            service: Rc::new(service),
            secret: self.secret.clone(),
        })
    }
}

pub struct AdminAuthMiddleware<S> {
    service: Rc<S>,
    secret: String,
}

impl<S, B> Service<ServiceRequest> for AdminAuthMiddleware<S>
where
    S: Service<ServiceRequest, Response = ServiceResponse<B>, Error = Error> + 'static,
    S::Future: 'static,
    B: 'static,
{
    type Response = ServiceResponse<B>;
    type Error = Error;
    type Future = LocalBoxFuture<'static, Result<Self::Response, Self::Error>>;

    forward_ready!(service);

    fn call(&self, req: ServiceRequest) -> Self::Future {
        let service = self.service.clone();
        let verified = verify(&req, &self.secret);

        Box::pin(async move {
            match verified {
                Ok(identity) => {
                    log::debug!("Admin request from {} to {}", identity.0, req.path());
                    req.extensions_mut().insert(identity);
                    service.call(req).await
                }
                Err(e) => {
                    log::warn!("Rejected admin request to {}: {}", req.path(), e);
                    Err(e.into())
                }
            }
        })
    }
}
