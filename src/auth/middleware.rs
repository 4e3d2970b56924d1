use crate::auth::auth::AuthUser;
use crate::auth::jwt::verify_token;
use crate::config::Config;
use crate::error::ApiError;
use crate::model::role::Role;
use crate::models::TokenType;
use actix_web::middleware::Next;
use actix_web::{
    Error, HttpMessage, ResponseError,
    body::BoxBody,
    dev::{ServiceRequest, ServiceResponse},
    web::Data,
};

fn reject(req: ServiceRequest, err: ApiError) -> Result<ServiceResponse<BoxBody>, Error> {
    tracing::debug!(path = %req.path(), reason = %err, "Request rejected by auth middleware");
    Ok(req.into_response(err.error_response()))
}

/// Accepts access tokens only; refresh tokens are good for `/auth/refresh`
/// and `/auth/logout` and nothing else.
pub async fn auth_middleware(
    req: ServiceRequest,
    next: Next<BoxBody>,
) -> Result<ServiceResponse<BoxBody>, Error> {
    let config = req
        .app_data::<Data<Config>>()
        .ok_or_else(|| actix_web::error::ErrorInternalServerError("App config missing"))?;

    let header_value = match req.headers().get("Authorization") {
        Some(h) => match h.to_str() {
            Ok(v) => v,
            Err(_) => {
                return reject(
                    req,
                    ApiError::unauthorized("Invalid Authorization header encoding"),
                );
            }
        },
        None => return reject(req, ApiError::unauthorized("Missing Authorization header")),
    };

    let token = match header_value.strip_prefix("Bearer ") {
        Some(t) => t,
        None => {
            return reject(
                req,
                ApiError::unauthorized("Authorization header must start with Bearer"),
            );
        }
    };

    let claims = match verify_token(token, &config.jwt_secret) {
        Ok(c) => c,
        Err(_) => return reject(req, ApiError::unauthorized("Invalid or expired token")),
    };

    if claims.token_type != TokenType::Access {
        return reject(req, ApiError::unauthorized("Access token required"));
    }

    let role = match Role::from_id(claims.role) {
        Some(role) => role,
        None => return reject(req, ApiError::unauthorized("Invalid role")),
    };

    req.extensions_mut().insert(AuthUser {
        user_id: claims.user_id,
        username: claims.sub,
        role,
    });

    next.call(req).await
}
