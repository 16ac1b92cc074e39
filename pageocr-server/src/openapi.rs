//! OpenAPI documentation configuration
//!
//! Generates the OpenAPI 3 document served at `/api-docs/openapi.json`.

use utoipa::openapi::security::{ApiKey, ApiKeyValue, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::auth::AUTH_HEADER;
use crate::handlers::{
    CreatedResponse, DeletedResponse, HealthResponse, ReadyResponse, RepresentationsResponse,
};

/// PageOCR API - OpenAPI Documentation
#[derive(OpenApi)]
#[openapi(
    info(
        title = "PageOCR API",
        version = "0.1.0",
        description = r#"
## Page images with on-demand OCR transcripts

Upload a scanned page with `PUT /page/{filename}`, then `GET` the same path
with `Accept: text/plain` for its text or `Accept: text/html` for hOCR markup.
The first request for each representation runs the OCR engine; later requests
are served from cache until the image is replaced or deleted.
"#,
        license(name = "Unlicense")
    ),
    servers(
        (url = "http://localhost:3000", description = "Local development server")
    ),
    tags(
        (name = "Pages", description = "Page images and their transcripts"),
        (name = "Health", description = "Service health and readiness endpoints")
    ),
    paths(
        crate::handlers::health::health,
        crate::handlers::health::ready,
        crate::handlers::page::put_page,
        crate::handlers::page::get_page,
        crate::handlers::page::delete_page,
    ),
    components(
        schemas(
            HealthResponse,
            ReadyResponse,
            CreatedResponse,
            DeletedResponse,
            RepresentationsResponse,
        )
    ),
    modifiers(&AuthKeyScheme)
)]
pub struct ApiDoc;

/// Registers the `X-Auth-Key` header scheme referenced by page routes.
struct AuthKeyScheme;

impl Modify for AuthKeyScheme {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        if let Some(components) = openapi.components.as_mut() {
            components.add_security_scheme(
                "auth_key",
                SecurityScheme::ApiKey(ApiKey::Header(ApiKeyValue::new(AUTH_HEADER))),
            );
        }
    }
}
