use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use axum::{
    Router,
    body::Body,
    http::{HeaderMap, Request, StatusCode, header},
};
use serde_json::{Value, json};
use tower::ServiceExt;

use nightlife::config::{AppConfig, YelpConfig};
use nightlife::credential::{AcquisitionError, TokenSource};
use nightlife::gateway::build_router;
use nightlife::gateway::state::{AppState, Stores, Upstreams};
use nightlife::geocode::{GeocodeError, Geocoder, ResolvedAddress};
use nightlife::search::{BusinessSearch, SearchError, YelpSearchClient};

struct StaticToken;

#[async_trait]
impl TokenSource for StaticToken {
    async fn acquire(&self) -> Result<String, AcquisitionError> {
        Ok("yelp-token".to_string())
    }
}

/// Two bars wherever you search
struct TwoBars;

#[async_trait]
impl BusinessSearch for TwoBars {
    async fn search(&self, token: &str, _address: &str) -> Result<Value, SearchError> {
        assert_eq!(token, "yelp-token");
        Ok(json!({
            "businesses": [
                { "id": "the-tap", "name": "The Tap" },
                { "id": "night-owl", "name": "Night Owl" }
            ],
            "total": 2
        }))
    }
}

/// Echoes the requested language in the address
#[derive(Default)]
struct EchoGeocoder {
    languages: Mutex<Vec<String>>,
}

#[async_trait]
impl Geocoder for EchoGeocoder {
    async fn reverse(
        &self,
        latitude: f64,
        longitude: f64,
        language: &str,
    ) -> Result<ResolvedAddress, GeocodeError> {
        self.languages.lock().unwrap().push(language.to_string());
        Ok(ResolvedAddress {
            address: format!("{},{} ({})", latitude, longitude, language),
            place_id: Some("pid-1".to_string()),
        })
    }
}

fn test_config(production: bool) -> AppConfig {
    let mut config = AppConfig::default();
    config.auth.jwt_secret = "integration-secret".to_string();
    config.server.public_dir = "public".to_string();
    config.server.production = production;
    config
}

fn app_from(
    production: bool,
    search: Arc<dyn BusinessSearch>,
    geocoder: Arc<EchoGeocoder>,
) -> Router {
    let upstreams = Upstreams {
        token_source: Arc::new(StaticToken),
        search,
        geocoder,
    };
    let state = AppState::new(&test_config(production), Stores::memory(), upstreams);
    build_router(Arc::new(state))
}

fn app_with(production: bool, geocoder: Arc<EchoGeocoder>) -> Router {
    app_from(production, Arc::new(TwoBars), geocoder)
}

fn app() -> Router {
    app_with(false, Arc::new(EchoGeocoder::default()))
}

async fn send(app: &Router, request: Request<Body>) -> (StatusCode, HeaderMap, Value) {
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let headers = response.headers().clone();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
    (status, headers, body)
}

fn post_json(path: &str, body: Value, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(path)
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn get(path: &str) -> Request<Body> {
    Request::builder().uri(path).body(Body::empty()).unwrap()
}

/// Local stand-in for the search API answering every query the same way
async fn fake_yelp(status: StatusCode, body: Value) -> String {
    let upstream = Router::new().route(
        "/v3/businesses/search",
        axum::routing::get(move || {
            let body = body.clone();
            async move { (status, axum::Json(body)) }
        }),
    );
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(async move { axum::serve(listener, upstream).await.unwrap() });
    format!("http://{}", addr)
}

fn app_against_yelp(api_base: String) -> Router {
    let config = YelpConfig {
        api_base,
        ..YelpConfig::default()
    };
    let search = YelpSearchClient::new(reqwest::Client::new(), &config);
    app_from(false, Arc::new(search), Arc::new(EchoGeocoder::default()))
}

/// Signs up and logs in; returns (token, userId)
async fn session(app: &Router, email: &str) -> (String, String) {
    let creds = json!({ "email": email, "password": "secret1" });
    let (_, _, body) = send(app, post_json("/api/signup", creds.clone(), None)).await;
    assert_eq!(body, json!({ "errors": [] }));

    let (_, _, body) = send(app, post_json("/api/login", creds, None)).await;
    (
        body["token"].as_str().unwrap().to_string(),
        body["userId"].as_str().unwrap().to_string(),
    )
}

#[tokio::test]
async fn signup_twice_reports_email_in_use() {
    let app = app();
    let creds = json!({ "email": "a@b.com", "password": "secret1" });

    let (status, _, body) = send(&app, post_json("/api/signup", creds.clone(), None)).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "errors": [] }));

    let (_, _, body) = send(&app, post_json("/api/signup", creds, None)).await;
    assert_eq!(body, json!({ "errors": ["This email is already in use."] }));
}

#[tokio::test]
async fn signup_lists_every_problem() {
    let app = app();
    let (_, _, body) = send(
        &app,
        post_json("/api/signup", json!({ "email": "nope", "password": "123" }), None),
    )
    .await;

    assert_eq!(
        body,
        json!({ "errors": [
            "Not a valid email.",
            "Password should have at least 6 characters."
        ] })
    );
}

#[tokio::test]
async fn login_with_right_and_wrong_password() {
    let app = app();
    let (token, user_id) = session(&app, "a@b.com").await;
    assert!(!token.is_empty());
    assert!(!user_id.is_empty());

    let (_, _, body) = send(
        &app,
        post_json("/api/login", json!({ "email": "a@b.com", "password": "wrong!!" }), None),
    )
    .await;
    assert_eq!(body, json!({ "errors": ["Invalid email or password."] }));
}

#[tokio::test]
async fn update_without_token_redirects_home() {
    let app = app();
    let (status, headers, _) = send(
        &app,
        post_json("/api/update", json!({ "userId": "x", "placeId": "the-tap" }), None),
    )
    .await;

    assert_eq!(status, StatusCode::FOUND);
    assert_eq!(headers[header::LOCATION], "/");
}

#[tokio::test]
async fn update_with_token_toggles_going() {
    let app = app();
    let (token, user_id) = session(&app, "a@b.com").await;
    let body = json!({ "userId": user_id, "placeId": "the-tap" });

    let (status, _, first) = send(&app, post_json("/api/update", body.clone(), Some(&token))).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(first, json!({ "going": 1 }));

    let (_, _, second) = send(&app, post_json("/api/update", body, Some(&token))).await;
    assert_eq!(second, json!({ "going": 0 }));
}

#[tokio::test]
async fn update_for_another_user_is_rejected() {
    let app = app();
    let (token, _) = session(&app, "a@b.com").await;
    let (_, other_id) = session(&app, "c@d.com").await;

    let (status, _, _) = send(
        &app,
        post_json(
            "/api/update",
            json!({ "userId": other_id, "placeId": "the-tap" }),
            Some(&token),
        ),
    )
    .await;
    assert_eq!(status, StatusCode::FOUND);
}

#[tokio::test]
async fn check_token_reflects_validity() {
    let app = app();
    let (token, _) = session(&app, "a@b.com").await;

    let check = |body: Value| post_json("/api/check-token", body, None);

    let (_, _, body) = send(&app, check(json!({ "token": token }))).await;
    assert_eq!(body, json!(true));

    let (_, _, body) = send(&app, check(json!({ "token": "junk" }))).await;
    assert_eq!(body, json!(false));

    let (_, _, body) = send(&app, check(json!({}))).await;
    assert_eq!(body, json!(false));

    let garbage = Request::builder()
        .method("POST")
        .uri("/api/check-token")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("{not json"))
        .unwrap();
    let (status, _, body) = send(&app, garbage).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!(false));
}

#[tokio::test]
async fn search_results_carry_going_counts() {
    let app = app();
    let (token, user_id) = session(&app, "a@b.com").await;
    send(
        &app,
        post_json(
            "/api/update",
            json!({ "userId": user_id, "placeId": "night-owl" }),
            Some(&token),
        ),
    )
    .await;

    let (status, _, body) = send(
        &app,
        post_json("/api/places-by-address", json!({ "address": "Montreal" }), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["businesses"][0]["going"], 0);
    assert_eq!(body["businesses"][1]["going"], 1);
    assert_eq!(body["total"], 2);
}

#[tokio::test]
async fn unknown_address_yields_no_places() {
    let api_base = fake_yelp(
        StatusCode::BAD_REQUEST,
        json!({
            "error": {
                "code": "LOCATION_NOT_FOUND",
                "description": "Could not execute search, try specifying a more exact location."
            }
        }),
    )
    .await;
    let app = app_against_yelp(api_base);

    let (status, _, body) = send(
        &app,
        post_json("/api/places-by-address", json!({ "address": "nowhere" }), None),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "businesses": [], "total": 0 }));
}

#[tokio::test]
async fn search_outage_is_an_unexpected_error() {
    let api_base = fake_yelp(StatusCode::BAD_GATEWAY, json!({})).await;
    let app = app_against_yelp(api_base);

    let (_, _, body) = send(
        &app,
        post_json("/api/places-by-address", json!({ "address": "Montreal" }), None),
    )
    .await;
    assert_eq!(body, json!({ "errors": ["Unexpected error."] }));
}

#[tokio::test]
async fn yelp_results_carry_going_counts() {
    let api_base = fake_yelp(
        StatusCode::OK,
        json!({ "businesses": [{ "id": "the-tap" }], "total": 1 }),
    )
    .await;
    let app = app_against_yelp(api_base);

    let (_, _, body) = send(
        &app,
        post_json("/api/places-by-address", json!({ "address": "Montreal" }), None),
    )
    .await;
    assert_eq!(
        body,
        json!({ "businesses": [{ "id": "the-tap", "going": 0 }], "total": 1 })
    );
}

#[tokio::test]
async fn location_uses_accept_language() {
    let geocoder = Arc::new(EchoGeocoder::default());
    let app = app_with(false, geocoder.clone());

    let mut request = post_json(
        "/api/location",
        json!({ "latitude": 45.5, "longitude": -73.5, "errorCode": 0 }),
        None,
    );
    request
        .headers_mut()
        .insert(header::ACCEPT_LANGUAGE, "fr-CA,fr;q=0.9".parse().unwrap());

    let (_, _, body) = send(&app, request).await;
    assert_eq!(body, json!({ "address": "45.5,-73.5 (fr)", "placeId": "pid-1" }));
    assert_eq!(*geocoder.languages.lock().unwrap(), vec!["fr".to_string()]);
}

#[tokio::test]
async fn location_with_client_error_is_empty() {
    let geocoder = Arc::new(EchoGeocoder::default());
    let app = app_with(false, geocoder.clone());

    let (_, _, body) = send(
        &app,
        post_json(
            "/api/location",
            json!({ "latitude": 0.0, "longitude": 0.0, "errorCode": 1 }),
            None,
        ),
    )
    .await;

    assert_eq!(body, json!({ "address": "" }));
    assert!(geocoder.languages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn location_without_error_code_is_empty() {
    let geocoder = Arc::new(EchoGeocoder::default());
    let app = app_with(false, geocoder.clone());

    let (_, _, body) = send(
        &app,
        post_json("/api/location", json!({ "latitude": 1.0, "longitude": 2.0 }), None),
    )
    .await;

    assert_eq!(body, json!({ "address": "" }));
    assert!(geocoder.languages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn location_denied_without_coordinates_is_empty() {
    let geocoder = Arc::new(EchoGeocoder::default());
    let app = app_with(false, geocoder.clone());

    let request = post_json("/api/location", json!({ "errorCode": 1 }), None);
    let (status, _, body) = send(&app, request).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "address": "" }));
    assert!(geocoder.languages.lock().unwrap().is_empty());
}

#[tokio::test]
async fn unreadable_body_reports_errors() {
    let app = app();
    let request = Request::builder()
        .method("POST")
        .uri("/api/signup")
        .header(header::CONTENT_TYPE, "application/json")
        .body(Body::from("email=a@b.com"))
        .unwrap();

    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "errors": ["Malformed request."] }));

    // Wrong content type
    let request = Request::builder()
        .method("POST")
        .uri("/api/location")
        .body(Body::from("{}"))
        .unwrap();
    let (status, _, body) = send(&app, request).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body, json!({ "errors": ["Malformed request."] }));
}

#[tokio::test]
async fn health_reports_ok() {
    let (status, _, body) = send(&app(), get("/api/health")).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
    assert!(body["timestamp_ms"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn spa_routes_fall_back_to_index() {
    let app = app();

    let response = app.clone().oneshot(get("/places")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    // Not on the allowlist: needs a token first
    let (status, _, _) = send(&app, get("/profile")).await;
    assert_eq!(status, StatusCode::FOUND);
}

#[tokio::test]
async fn public_files_are_served_without_token() {
    let app = app();

    let response = app.clone().oneshot(get("/styles.css")).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert!(
        response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/css")
    );

    // Missing file outside the allowlist still hits the gate
    let (status, _, _) = send(&app, get("/missing.js")).await;
    assert_eq!(status, StatusCode::FOUND);
}

#[tokio::test]
async fn production_adds_security_headers() {
    let hardened = app_with(true, Arc::new(EchoGeocoder::default()));
    let (_, headers, _) = send(&hardened, get("/api/health")).await;

    assert_eq!(headers["x-content-type-options"], "nosniff");
    assert_eq!(headers["x-frame-options"], "DENY");
    assert_eq!(headers["x-xss-protection"], "1; mode=block");

    let (_, headers, _) = send(&app(), get("/api/health")).await;
    assert!(headers.get("x-frame-options").is_none());
}
