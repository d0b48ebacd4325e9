//! OpenAPI documentation, served at `/openapi.json`.

use utoipa::openapi::security::{HttpAuthScheme, HttpBuilder, SecurityScheme};
use utoipa::{Modify, OpenApi};

use crate::error;
use crate::handlers;
use tubely_core::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tubely API",
        version = "0.1.0",
        description = "Video ingestion API: draft videos, upload MP4 assets that are remuxed for fast start and filed by aspect ratio, attach thumbnails and fetch presigned playback links."
    ),
    paths(
        handlers::health::health_check,
        handlers::videos::create_video,
        handlers::videos::list_videos,
        handlers::videos::get_video,
        handlers::videos::delete_video,
        handlers::video_upload::upload_video,
        handlers::thumbnail_upload::upload_thumbnail,
        handlers::thumbnail_get::get_thumbnail,
    ),
    components(schemas(
        models::VideoRecord,
        models::CreateVideoRequest,
        error::ErrorResponse,
        handlers::health::HealthResponse,
    )),
    modifiers(&SecurityAddon),
    tags(
        (name = "videos", description = "Video records and uploads"),
        (name = "thumbnails", description = "Thumbnail upload and retrieval"),
        (name = "health", description = "Service health")
    )
)]
pub struct ApiDoc;

struct SecurityAddon;

impl Modify for SecurityAddon {
    fn modify(&self, openapi: &mut utoipa::openapi::OpenApi) {
        let components = openapi.components.get_or_insert_with(Default::default);
        components.add_security_scheme(
            "bearer_auth",
            SecurityScheme::Http(
                HttpBuilder::new()
                    .scheme(HttpAuthScheme::Bearer)
                    .bearer_format("JWT")
                    .build(),
            ),
        );
    }
}

pub fn get_openapi_spec() -> utoipa::openapi::OpenApi {
    ApiDoc::openapi()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_spec_lists_routes_and_bearer_scheme() {
        let spec = get_openapi_spec();
        for path in [
            "/health",
            "/videos",
            "/videos/{id}",
            "/videos/{id}/upload",
            "/videos/{id}/thumbnail",
            "/thumbnails/{id}",
        ] {
            assert!(spec.paths.paths.contains_key(path), "missing {}", path);
        }
        let components = spec.components.expect("components");
        assert!(components.security_schemes.contains_key("bearer_auth"));
    }
}
