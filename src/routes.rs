use crate::{
    api::{attendance, leave},
    auth::{handlers, middleware::auth_middleware},
    config::Config,
    error::ApiError,
};
use actix_governor::{
    Governor, GovernorConfigBuilder, PeerIpKeyExtractor, governor::middleware::NoOpMiddleware,
};
use actix_web::{middleware::from_fn, web};
use std::sync::Arc;

// Helper to build per-route limiter
fn build_limiter(requests_per_min: u32) -> Governor<PeerIpKeyExtractor, NoOpMiddleware> {
    let requests_per_min = requests_per_min.max(1);
    let per_ms = (60_000 / u64::from(requests_per_min)).max(1);
    let cfg = GovernorConfigBuilder::default()
        .per_millisecond(per_ms)
        .burst_size(requests_per_min)
        .key_extractor(PeerIpKeyExtractor)
        .finish()
        .expect("period and burst size are non-zero");
    Governor::new(&cfg)
}

pub fn configure(cfg: &mut web::ServiceConfig, config: Config) {
    let login_limiter = Arc::new(build_limiter(config.rate_login_per_min));
    let register_limiter = Arc::new(build_limiter(config.rate_register_per_min));
    let refresh_limiter = Arc::new(build_limiter(config.rate_refresh_per_min));
    let protected_limiter = Arc::new(build_limiter(config.rate_protected_per_min));

    // Malformed bodies and query strings become {"message": ...} 400s
    cfg.app_data(web::JsonConfig::default().limit(16 * 1024).error_handler(|err, _| {
        ApiError::validation(format!("Invalid request body: {err}")).into()
    }))
    .app_data(web::QueryConfig::default().error_handler(|err, _| {
        ApiError::validation(format!("Invalid query string: {err}")).into()
    }));

    let prefix = config.api_prefix.trim_end_matches('/');

    // Public routes
    cfg.service(
        web::scope(&format!("{prefix}/auth"))
            .service(
                web::resource("/login")
                    .wrap(login_limiter.clone())
                    .route(web::post().to(handlers::login)),
            )
            .service(
                web::resource("/register")
                    .wrap(register_limiter)
                    .route(web::post().to(handlers::register)),
            )
            .service(
                web::resource("/refresh")
                    .wrap(refresh_limiter)
                    .route(web::post().to(handlers::refresh_token)),
            )
            .service(
                web::resource("/logout")
                    .wrap(login_limiter)
                    .route(web::post().to(handlers::logout)),
            ),
    );

    // Protected routes
    cfg.service(
        web::scope(prefix)
            .wrap(from_fn(auth_middleware)) // authentication
            .wrap(protected_limiter) // rate limiting
            .route("/me", web::get().to(handlers::me))
            .service(
                web::scope("/attendance")
                    // /attendance
                    .service(
                        web::resource("").route(web::post().to(attendance::mark_attendance)),
                    )
                    // /attendance/leave
                    .service(
                        web::resource("/leave")
                            .route(web::post().to(leave::register_leave))
                            .route(web::get().to(leave::my_leaves)),
                    )
                    // /attendance/my-attendance
                    .service(
                        web::resource("/my-attendance")
                            .route(web::get().to(attendance::my_attendance)),
                    ),
            ),
    );
}

// LOGIN
//  ├─ access_token (15 min)
//  └─ refresh_token (7 days, single use)

// API REQUEST
//  └─ Authorization: Bearer access_token

// ACCESS EXPIRED
//  └─ POST /auth/refresh with refresh_token
//       └─ returns new access_token + rotated refresh_token

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::jwt::generate_access_token;
    use crate::model::role::Role;
    use crate::store::{AttendanceStore, MemoryStore, UserStore};
    use actix_web::{App, http::StatusCode, middleware::NormalizePath, test, web::Data};
    use serde_json::{Value, json};
    use std::net::SocketAddr;

    macro_rules! test_app {
        ($store:expr) => {
            test_app!($store, Config::for_tests())
        };
        ($store:expr, $config:expr) => {{
            let config: Config = $config;
            let attendance: Arc<dyn AttendanceStore> = $store.clone();
            let users: Arc<dyn UserStore> = $store.clone();
            test::init_service(
                App::new()
                    .wrap(NormalizePath::trim())
                    .app_data(Data::new(config.clone()))
                    .app_data(Data::from(attendance))
                    .app_data(Data::from(users))
                    .configure(|cfg| configure(cfg, config.clone())),
            )
            .await
        }};
    }

    fn peer() -> SocketAddr {
        "127.0.0.1:40000".parse().unwrap()
    }

    fn bearer(token: &str) -> (&'static str, String) {
        ("Authorization", format!("Bearer {token}"))
    }

    async fn seed_user(store: &MemoryStore, username: &str, role: Role) -> (u64, String) {
        let id = store.create_user(username, "unused", role).await.unwrap();
        let token =
            generate_access_token(id, username, role, &Config::for_tests().jwt_secret, 900)
                .unwrap();
        (id, token)
    }

    #[actix_web::test]
    async fn sign_up_sign_in_refresh_and_logout() {
        let store = Arc::new(MemoryStore::new());
        let app = test_app!(store);

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .peer_addr(peer())
            .set_json(json!({"username": "Asha.R", "password": "correct horse"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CREATED);

        let req = test::TestRequest::post()
            .uri("/api/auth/register")
            .peer_addr(peer())
            .set_json(json!({"username": "asha.r", "password": "another password"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::CONFLICT);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .peer_addr(peer())
            .set_json(json!({"username": "asha.r", "password": "wrong password"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/auth/login")
            .peer_addr(peer())
            .set_json(json!({"username": "asha.r", "password": "correct horse"}))
            .to_request();
        let tokens: Value = test::call_and_read_body_json(&app, req).await;
        let access = tokens["access_token"].as_str().unwrap().to_string();
        let refresh = tokens["refresh_token"].as_str().unwrap().to_string();
        assert_eq!(tokens["expires_in"], 900);

        let req = test::TestRequest::get()
            .uri("/api/me")
            .peer_addr(peer())
            .insert_header(bearer(&access))
            .to_request();
        let me: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(me["username"], "asha.r");
        assert_eq!(me["role"], "student");

        // refresh tokens are not access tokens
        let req = test::TestRequest::get()
            .uri("/api/me")
            .peer_addr(peer())
            .insert_header(bearer(&refresh))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/auth/refresh")
            .peer_addr(peer())
            .insert_header(bearer(&refresh))
            .to_request();
        let rotated: Value = test::call_and_read_body_json(&app, req).await;
        let new_refresh = rotated["refresh_token"].as_str().unwrap().to_string();
        assert_ne!(new_refresh, refresh);

        // replaying the old refresh token fails
        let req = test::TestRequest::post()
            .uri("/api/auth/refresh")
            .peer_addr(peer())
            .insert_header(bearer(&refresh))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);

        let req = test::TestRequest::post()
            .uri("/api/auth/logout")
            .peer_addr(peer())
            .insert_header(bearer(&new_refresh))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::NO_CONTENT);

        let req = test::TestRequest::post()
            .uri("/api/auth/refresh")
            .peer_addr(peer())
            .insert_header(bearer(&new_refresh))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn protected_routes_need_a_token() {
        let store = Arc::new(MemoryStore::new());
        let app = test_app!(store);

        let req = test::TestRequest::get()
            .uri("/api/attendance/my-attendance?startDate=2024-03-01&endDate=2024-03-05")
            .peer_addr(peer())
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
        let body: Value = test::read_body_json(resp).await;
        assert_eq!(body["message"], "Missing Authorization header");

        let req = test::TestRequest::post()
            .uri("/api/attendance/leave")
            .peer_addr(peer())
            .insert_header(bearer("not-a-jwt"))
            .set_json(json!({"startDate": "2024-03-10", "endDate": "2024-03-12"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::UNAUTHORIZED);
    }

    #[actix_web::test]
    async fn sick_leave_shows_up_in_monthly_attendance() {
        let store = Arc::new(MemoryStore::new());
        let app = test_app!(store);
        let (_, token) = seed_user(&store, "ravi", Role::Student).await;

        let req = test::TestRequest::post()
            .uri("/api/attendance")
            .peer_addr(peer())
            .insert_header(bearer(&token))
            .set_json(json!({"meal": "breakfast", "date": "2024-03-05"}))
            .to_request();
        let marked: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(marked["totalMealsPresent"], 1);
        assert_eq!(marked["status"], "Present");

        // web client sends Date.toISOString() values
        let req = test::TestRequest::post()
            .uri("/api/attendance/leave")
            .peer_addr(peer())
            .insert_header(bearer(&token))
            .set_json(json!({
                "startDate": "2024-03-10T00:00:00.000Z",
                "endDate": "2024-03-12T00:00:00.000Z",
                "reason": "sick_leave",
                "description": "Fever"
            }))
            .to_request();
        let resp = test::call_service(&app, req).await;
        assert_eq!(resp.status(), StatusCode::CREATED);
        let created: Value = test::read_body_json(resp).await;
        assert_eq!(created["daysAffected"], 3);
        assert_eq!(created["data"]["reason"], "sick_leave");

        let req = test::TestRequest::get()
            .uri("/api/attendance/my-attendance?startDate=2024-03-01&endDate=2024-03-31")
            .peer_addr(peer())
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let days = body["data"].as_array().unwrap();
        assert_eq!(days.len(), 31);

        for (i, day) in days.iter().enumerate() {
            let expected_date = format!("2024-03-{:02}", i + 1);
            assert_eq!(day["date"], expected_date.as_str());
            match i + 1 {
                10..=12 => {
                    assert_eq!(day["status"], "On Leave");
                    assert_eq!(day["isOnLeave"], true);
                    assert_eq!(day["leaveReason"], "sick_leave");
                }
                5 => assert_eq!(day["status"], "Present"),
                _ => {
                    assert_eq!(day["status"], "Absent");
                    assert_eq!(day["totalMealsPresent"], 0);
                    assert!(day.get("leaveReason").is_none());
                }
            }
        }

        let req = test::TestRequest::get()
            .uri("/api/attendance/leave")
            .peer_addr(peer())
            .insert_header(bearer(&token))
            .to_request();
        let history: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(history["data"].as_array().unwrap().len(), 1);
        assert_eq!(history["data"][0]["startDate"], "2024-03-10");
        assert_eq!(history["data"][0]["description"], "Fever");
    }

    #[actix_web::test]
    async fn invalid_leave_requests_are_rejected_and_change_nothing() {
        let store = Arc::new(MemoryStore::new());
        let app = test_app!(store);
        let (user_id, token) = seed_user(&store, "ravi", Role::Student).await;

        let bodies = [
            json!({"startDate": "2024-03-15", "endDate": "2024-03-10", "reason": "vacation"}),
            json!({"startDate": "2024-03-10", "endDate": "2024-03-12", "reason": "party"}),
            json!({"startDate": "2024-03-10", "endDate": "2024-03-12", "reason": "other", "description": "x".repeat(501)}),
            json!({"startDate": "2024-03-10", "endDate": "2024-03-12"}),
            json!({"startDate": "2024-03-10", "endDate": "2024-03-12", "reason": ""}),
            json!({"startDate": "2024-03-10", "endDate": "2024-03-12", "reason": "  "}),
            json!({"startDate": "2024-03-10", "endDate": "2024-03-12", "reason": null}),
            json!({"startDate": "soon", "endDate": "2024-03-12", "reason": "vacation"}),
            json!({"endDate": "2024-03-12", "reason": "vacation"}),
        ];

        for body in bodies {
            let req = test::TestRequest::post()
                .uri("/api/attendance/leave")
                .peer_addr(peer())
                .insert_header(bearer(&token))
                .set_json(&body)
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "body: {body}");
            let err: Value = test::read_body_json(resp).await;
            assert!(err["message"].is_string());
        }

        let start = chrono::NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        let end = chrono::NaiveDate::from_ymd_opt(2024, 3, 31).unwrap();
        assert!(store.records_between(user_id, start, end).await.unwrap().is_empty());
        assert!(store.leaves_for(user_id).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn reversed_reason_message_is_descriptive() {
        let store = Arc::new(MemoryStore::new());
        let app = test_app!(store);
        let (_, token) = seed_user(&store, "ravi", Role::Student).await;

        let req = test::TestRequest::post()
            .uri("/api/attendance/leave")
            .peer_addr(peer())
            .insert_header(bearer(&token))
            .set_json(json!({"startDate": "2024-03-15", "endDate": "2024-03-10", "reason": "vacation"}))
            .to_request();
        let resp = test::call_service(&app, req).await;
        let err: Value = test::read_body_json(resp).await;
        assert_eq!(err["message"], "startDate cannot be after endDate");
    }

    #[actix_web::test]
    async fn timestamps_use_the_configured_timezone() {
        let store = Arc::new(MemoryStore::new());
        let config = Config {
            timezone: chrono_tz::Tz::Asia__Kolkata,
            ..Config::for_tests()
        };
        let app = test_app!(store, config);
        let (_, token) = seed_user(&store, "ravi", Role::Student).await;

        // local midnights of March 10th and 12th in India
        let req = test::TestRequest::post()
            .uri("/api/attendance/leave")
            .peer_addr(peer())
            .insert_header(bearer(&token))
            .set_json(json!({
                "startDate": "2024-03-09T18:30:00.000Z",
                "endDate": "2024-03-11T18:30:00.000Z",
                "reason": "Home_Visit"
            }))
            .to_request();
        let created: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(created["data"]["startDate"], "2024-03-10");
        assert_eq!(created["data"]["endDate"], "2024-03-12");
        assert_eq!(created["data"]["reason"], "home_visit");

        let req = test::TestRequest::get()
            .uri("/api/attendance/my-attendance?startDate=2024-02-29T18:30:00.000Z&endDate=2024-03-30T18:30:00.000Z")
            .peer_addr(peer())
            .insert_header(bearer(&token))
            .to_request();
        let body: Value = test::call_and_read_body_json(&app, req).await;
        let days = body["data"].as_array().unwrap();
        assert_eq!(days.len(), 31);
        assert_eq!(days[0]["date"], "2024-03-01");
        assert_eq!(days[30]["date"], "2024-03-31");
        assert_eq!(days[9]["status"], "On Leave");
        assert_eq!(days[8]["status"], "Absent");
    }

    #[actix_web::test]
    async fn query_needs_both_dates() {
        let store = Arc::new(MemoryStore::new());
        let app = test_app!(store);
        let (_, token) = seed_user(&store, "ravi", Role::Student).await;

        for uri in [
            "/api/attendance/my-attendance?startDate=2024-03-01",
            "/api/attendance/my-attendance?startDate=2024-03-31&endDate=2024-03-01",
            "/api/attendance/my-attendance?startDate=2020-01-01&endDate=2024-01-01",
        ] {
            let req = test::TestRequest::get()
                .uri(uri)
                .peer_addr(peer())
                .insert_header(bearer(&token))
                .to_request();
            let resp = test::call_service(&app, req).await;
            assert_eq!(resp.status(), StatusCode::BAD_REQUEST, "uri: {uri}");
        }
    }

    #[actix_web::test]
    async fn only_staff_mark_meals_for_others() {
        let store = Arc::new(MemoryStore::new());
        let app = test_app!(store);
        let (student_id, student) = seed_user(&store, "ravi", Role::Student).await;
        let (other_id, _) = seed_user(&store, "meena", Role::Student).await;
        let (_, manager) = seed_user(&store, "warden", Role::Manager).await;

        let req = test::TestRequest::post()
            .uri("/api/attendance")
            .peer_addr(peer())
            .insert_header(bearer(&student))
            .set_json(json!({"meal": "lunch", "date": "2024-03-10", "userId": other_id}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::FORBIDDEN);

        let req = test::TestRequest::post()
            .uri("/api/attendance")
            .peer_addr(peer())
            .insert_header(bearer(&manager))
            .set_json(json!({"meal": "Dinner", "date": "2024-03-10", "userId": student_id}))
            .to_request();
        let marked: Value = test::call_and_read_body_json(&app, req).await;
        assert_eq!(marked["user"], student_id);
        assert_eq!(marked["dinner"], true);

        let req = test::TestRequest::post()
            .uri("/api/attendance")
            .peer_addr(peer())
            .insert_header(bearer(&manager))
            .set_json(json!({"meal": "lunch", "userId": 999}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);

        let req = test::TestRequest::post()
            .uri("/api/attendance")
            .peer_addr(peer())
            .insert_header(bearer(&student))
            .set_json(json!({"meal": "snack"}))
            .to_request();
        assert_eq!(test::call_service(&app, req).await.status(), StatusCode::BAD_REQUEST);
    }
}
