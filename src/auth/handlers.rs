use crate::{
    auth::{
        auth::AuthUser,
        jwt::{generate_access_token, generate_refresh_token, verify_token},
        password::{hash_password, verify_password},
    },
    config::Config,
    error::{ApiError, StoreError},
    model::{role::Role, user::User},
    models::{LoginReqDto, RegisterReq, TokenPair, TokenType},
    store::UserStore,
};
use actix_web::{HttpRequest, HttpResponse, Responder, web};
use serde_json::json;
use tracing::{debug, error, info, instrument, warn};

const MIN_PASSWORD_LEN: usize = 8;

fn normalize_username(raw: &str) -> String {
    raw.trim().to_lowercase()
}

fn validate_username(username: &str) -> Result<(), ApiError> {
    let len = username.chars().count();
    if !(3..=32).contains(&len) {
        return Err(ApiError::validation(
            "Username must be between 3 and 32 characters",
        ));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-'))
    {
        return Err(ApiError::validation(
            "Username may only contain letters, digits, '.', '_' and '-'",
        ));
    }
    Ok(())
}

fn bearer_token(req: &HttpRequest) -> Option<&str> {
    req.headers()
        .get("Authorization")
        .and_then(|h| h.to_str().ok())
        .and_then(|h| h.strip_prefix("Bearer "))
}

/// Issues an access token plus a persisted refresh token.
async fn issue_tokens(
    user: &User,
    role: Role,
    users: &dyn UserStore,
    config: &Config,
) -> Result<TokenPair, ApiError> {
    let access_token = generate_access_token(
        user.id,
        &user.username,
        role,
        &config.jwt_secret,
        config.access_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign access token");
        ApiError::Internal
    })?;

    let (refresh_token, refresh_claims) = generate_refresh_token(
        user.id,
        &user.username,
        role,
        &config.jwt_secret,
        config.refresh_token_ttl,
    )
    .map_err(|e| {
        error!(error = %e, "Failed to sign refresh token");
        ApiError::Internal
    })?;

    debug!(user_id = user.id, jti = %refresh_claims.jti, "Storing refresh token");
    users
        .store_refresh_token(user.id, &refresh_claims.jti, refresh_claims.exp as i64)
        .await?;

    Ok(TokenPair {
        access_token,
        refresh_token,
        token_type: "Bearer".to_string(),
        expires_in: config.access_token_ttl,
    })
}

/// Student sign-up
#[utoipa::path(
    post,
    path = "/api/auth/register",
    request_body = RegisterReq,
    responses(
        (status = 201, description = "User registered", body = Object, example = json!({
            "message": "User registered successfully",
            "id": 1
        })),
        (status = 400, description = "Invalid username or password"),
        (status = 409, description = "Username already taken")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_register", skip(users, body), fields(username = %body.username))]
pub async fn register(
    body: web::Json<RegisterReq>,
    users: web::Data<dyn UserStore>,
) -> Result<impl Responder, ApiError> {
    let username = normalize_username(&body.username);
    validate_username(&username)?;

    if body.password.chars().count() < MIN_PASSWORD_LEN {
        return Err(ApiError::validation(format!(
            "Password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }

    let hashed = hash_password(&body.password).map_err(|e| {
        error!(error = %e, "Password hashing failed");
        ApiError::Internal
    })?;

    let id = match users.create_user(&username, &hashed, Role::Student).await {
        Ok(id) => id,
        Err(StoreError::Conflict) => {
            info!("Registration rejected: username taken");
            return Err(ApiError::Conflict("Username already taken".to_string()));
        }
        Err(e) => return Err(e.into()),
    };

    info!(user_id = id, "User registered");
    Ok(HttpResponse::Created().json(json!({
        "message": "User registered successfully",
        "id": id
    })))
}

/// Sign-in, returns an access/refresh token pair
#[utoipa::path(
    post,
    path = "/api/auth/login",
    request_body = LoginReqDto,
    responses(
        (status = 200, description = "Signed in", body = TokenPair),
        (status = 400, description = "Username or password missing"),
        (status = 401, description = "Invalid credentials")
    ),
    tag = "Auth"
)]
#[instrument(name = "auth_login", skip(users, config, body), fields(username = %body.username))]
pub async fn login(
    body: web::Json<LoginReqDto>,
    users: web::Data<dyn UserStore>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    info!("Login request received");

    let username = normalize_username(&body.username);
    if username.is_empty() || body.password.is_empty() {
        return Err(ApiError::validation("Username or password required"));
    }

    let user = match users.find_user(&username).await? {
        Some(user) if user.is_active => user,
        Some(_) => {
            info!("Invalid credentials: account disabled");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
        None => {
            info!("Invalid credentials: user not found");
            return Err(ApiError::unauthorized("Invalid credentials"));
        }
    };

    if let Err(e) = verify_password(&body.password, &user.password) {
        info!(error = %e, "Invalid credentials: password mismatch");
        return Err(ApiError::unauthorized("Invalid credentials"));
    }

    let role = Role::from_id(user.role_id).ok_or_else(|| {
        error!(user_id = user.id, role_id = user.role_id, "User has unknown role");
        ApiError::Internal
    })?;

    let tokens = issue_tokens(&user, role, users.get_ref(), &config).await?;

    // not fatal for the login itself
    if let Err(e) = users.touch_last_login(user.id).await {
        warn!(error = %e, "Failed to update last_login_at");
    }

    info!(user_id = user.id, "Login successful");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Rotates a refresh token (sent as the bearer token)
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "New token pair", body = TokenPair),
        (status = 401, description = "Refresh token missing, invalid, expired or already used")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn refresh_token(
    req: HttpRequest,
    users: web::Data<dyn UserStore>,
    config: web::Data<Config>,
) -> Result<impl Responder, ApiError> {
    let token = bearer_token(&req).ok_or_else(|| ApiError::unauthorized("No token"))?;

    let claims = verify_token(token, &config.jwt_secret)
        .map_err(|_| ApiError::unauthorized("Invalid or expired token"))?;

    if claims.token_type != TokenType::Refresh {
        return Err(ApiError::unauthorized("Refresh token required"));
    }

    // single use: a replayed token finds nothing to revoke
    if !users.consume_refresh_token(&claims.jti).await? {
        warn!(user_id = claims.user_id, jti = %claims.jti, "Refresh token reuse or unknown jti");
        return Err(ApiError::unauthorized("Refresh token revoked"));
    }

    let user = match users.find_user_by_id(claims.user_id).await? {
        Some(user) if user.is_active => user,
        _ => return Err(ApiError::unauthorized("Account no longer active")),
    };
    let role = Role::from_id(user.role_id).ok_or(ApiError::Internal)?;

    let tokens = issue_tokens(&user, role, users.get_ref(), &config).await?;
    debug!(user_id = user.id, "Refresh token rotated");
    Ok(HttpResponse::Ok().json(tokens))
}

/// Revokes a refresh token. Always 204.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 204, description = "Logged out")),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn logout(
    req: HttpRequest,
    users: web::Data<dyn UserStore>,
    config: web::Data<Config>,
) -> impl Responder {
    let Some(token) = bearer_token(&req) else {
        return HttpResponse::NoContent().finish();
    };

    let Ok(claims) = verify_token(token, &config.jwt_secret) else {
        return HttpResponse::NoContent().finish();
    };

    // only refresh tokens can log out
    if claims.token_type == TokenType::Refresh {
        if let Err(e) = users.consume_refresh_token(&claims.jti).await {
            warn!(error = %e, "Failed to revoke refresh token on logout");
        }
    }

    HttpResponse::NoContent().finish()
}

/// Who am I
#[utoipa::path(
    get,
    path = "/api/me",
    responses(
        (status = 200, description = "Authenticated identity", body = Object, example = json!({
            "id": 1,
            "username": "asha.r",
            "role": "student"
        })),
        (status = 401, description = "Unauthorized")
    ),
    security(("bearer_auth" = [])),
    tag = "Auth"
)]
pub async fn me(auth: AuthUser) -> impl Responder {
    HttpResponse::Ok().json(json!({
        "id": auth.user_id,
        "username": auth.username,
        "role": auth.role.as_str(),
    }))
}
