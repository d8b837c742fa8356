//! OpenAPI / Swagger UI Documentation
//!
//! - Swagger UI: `http://localhost:3000/docs`
//! - OpenAPI JSON: `http://localhost:3000/api-docs/openapi.json`

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::gateway::handlers::HealthResponse;
use crate::gateway::types::{
    AddressRequest, CheckTokenRequest, ErrorList, GoingResponse, LocationRequest, UpdateRequest,
};
use crate::geocode::ResolvedAddress;
use crate::user_auth::{LoginRequest, Session, SignupRequest};

/// HS256 session token issued by `/api/login`
struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "bearer_auth",
                SecurityScheme::Http(
                    HttpBuilder::new()
                        .scheme(HttpAuthScheme::Bearer)
                        .bearer_format("JWT")
                        .description(Some(
                            "Token from /api/login. Requests without a valid token are redirected to /.",
                        ))
                        .build(),
                ),
            );
        }
    }
}

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Nightlife API",
        version = "1.0.0",
        description = "Find bars near you and tell your friends where you are going tonight.",
        license(
            name = "MIT"
        )
    ),
    servers(
        (url = "http://localhost:3000", description = "Development"),
    ),
    paths(
        crate::gateway::handlers::health::health_check,
        crate::gateway::handlers::location::location,
        crate::gateway::handlers::places::places_by_address,
        crate::gateway::handlers::places::update,
        crate::user_auth::handlers::signup,
        crate::user_auth::handlers::login,
        crate::user_auth::handlers::check_token,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorList,
            LocationRequest,
            ResolvedAddress,
            AddressRequest,
            UpdateRequest,
            GoingResponse,
            CheckTokenRequest,
            SignupRequest,
            LoginRequest,
            Session,
        )
    ),
    modifiers(&SecurityAddon),
    tags(
        (name = "Places", description = "Bar search, geolocation and going toggles"),
        (name = "Auth", description = "Signup, login and token checks"),
        (name = "System", description = "Health checks")
    )
)]
pub struct ApiDoc;
