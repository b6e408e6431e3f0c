//! OpenAPI document for the service routes.

use axum::response::Json;
use utoipa::OpenApi;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "spid-session",
        description = "SPID Service Provider session controller"
    ),
    paths(
        super::handlers::auth::session::acs,
        super::handlers::auth::session::logout,
        super::handlers::auth::session::slo,
        super::handlers::auth::session::metadata,
        super::handlers::health::health,
    )
)]
pub struct ApiDoc;

pub async fn openapi_json() -> Json<utoipa::openapi::OpenApi> {
    Json(ApiDoc::openapi())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn document_lists_all_routes() {
        let doc = ApiDoc::openapi();
        let paths: Vec<&String> = doc.paths.paths.keys().collect();
        for route in ["/acs", "/logout", "/slo", "/metadata", "/health"] {
            assert!(
                paths.iter().any(|path| path.as_str() == route),
                "missing route: {route}"
            );
        }
    }
}
