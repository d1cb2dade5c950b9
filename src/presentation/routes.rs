//! Route table, layer stack, and API documentation

use std::time::Duration;

use axum::http::header::HeaderValue;
use axum::http::Method;
use axum::routing::{get, post};
use axum::Router;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::timeout::TimeoutLayer;
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use crate::config::ServerConfig;
use crate::presentation::controllers::{files, modules, system, AppState};
use crate::presentation::middleware::request_logging;
use crate::presentation::models;

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Tesis Gateway API",
        description = "Module gateway and access control for the dashboard platform",
        license(name = "AGPL-3.0")
    ),
    paths(
        system::liveness,
        system::system_health,
        system::audit_trail,
        modules::list_modules,
        modules::restart_module,
        files::list_files,
        files::download_file,
        files::analyzable_files,
        files::file_info,
        files::file_stats,
        files::upload_file,
        files::delete_file,
        files::file_notification,
    ),
    components(schemas(
        models::ErrorEnvelope,
        models::ErrorBody,
        models::LivenessDto,
        models::ModuleStatusDto,
        models::SystemHealthDto,
        models::FileDescriptorDto,
        models::AnalyzableFilesDto,
        crate::infrastructure::readiness::ReadinessStats,
        models::AuditTrailDto,
        models::FileEventDto,
    )),
    tags(
        (name = "system", description = "Liveness, aggregate health, audit"),
        (name = "modules", description = "Module registry"),
        (name = "files", description = "File store surface and readiness views")
    )
)]
pub struct ApiDoc;

/// Build the application router with its full layer stack
pub fn create_router(state: AppState) -> Router {
    let server = state.config.server.clone();

    let mut router = Router::new()
        .route("/health", get(system::liveness))
        .route("/api/system/health", get(system::system_health))
        .route("/api/audit", get(system::audit_trail))
        .route("/api/modules", get(modules::list_modules))
        .route("/api/modules/{name}/restart", post(modules::restart_module))
        .route(
            "/api/files",
            get(files::list_files)
                .post(files::upload_file)
                .delete(files::delete_file),
        )
        .route("/api/files/download", get(files::download_file))
        .route("/api/files/analyzable", get(files::analyzable_files))
        .route("/api/files/info", get(files::file_info))
        .route("/api/files/stats", get(files::file_stats))
        .route("/api/notifications/files", post(files::file_notification));

    if server.enable_docs {
        router = router
            .merge(SwaggerUi::new("/docs").url("/api-docs/openapi.json", ApiDoc::openapi()));
    }

    router
        .layer(axum::middleware::from_fn(request_logging))
        .layer(TraceLayer::new_for_http())
        .layer(TimeoutLayer::with_status_code(
            axum::http::StatusCode::REQUEST_TIMEOUT,
            Duration::from_secs(server.request_timeout_seconds),
        ))
        .layer(cors_layer(&server))
        .with_state(state)
}

fn cors_layer(server: &ServerConfig) -> CorsLayer {
    let origin = if server.allowed_origins.iter().any(|o| o == "*") {
        AllowOrigin::mirror_request()
    } else {
        AllowOrigin::list(
            server
                .allowed_origins
                .iter()
                .filter_map(|o| o.parse::<HeaderValue>().ok()),
        )
    };
    CorsLayer::new()
        .allow_origin(origin)
        .allow_methods([Method::GET, Method::POST, Method::DELETE])
        .allow_headers(Any)
}
