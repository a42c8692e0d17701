//! HTTP API.
//!
//! Handlers are thin: they decode the request, run the matching
//! [`ReportService`] operation on the blocking pool and encode the result.
//! The service sits behind a mutex because it owns the single database
//! connection.

pub mod error;
mod handlers;

use actix_web::{web, App, HttpServer};
use parking_lot::{Mutex, MutexGuard};
use tracing::info;

use crate::config::ServerConfig;
use crate::service::ReportService;

pub use error::ApiError;

/// Shared state of the HTTP workers.
#[derive(Debug)]
pub struct AppState {
    service: Mutex<ReportService>,
}

impl AppState {
    /// Wrap a service for sharing between workers.
    #[must_use]
    pub fn new(service: ReportService) -> Self {
        Self {
            service: Mutex::new(service),
        }
    }

    /// Lock the service.
    pub fn service(&self) -> MutexGuard<'_, ReportService> {
        self.service.lock()
    }
}

/// Run `f` against the service on the blocking thread pool.
pub(crate) async fn with_service<T, F>(state: web::Data<AppState>, f: F) -> Result<T, ApiError>
where
    F: FnOnce(&ReportService) -> crate::Result<T> + Send + 'static,
    T: Send + 'static,
{
    let result = web::block(move || f(&state.service())).await?;
    Ok(result?)
}

/// All API routes under `/api`.
#[must_use]
pub fn routes() -> actix_web::Scope {
    web::scope("/api")
        .service(
            web::scope("/erp-calculations")
                .route("/calculate_erp/", web::post().to(handlers::calculate_erp))
                .route("/bulk_calculate/", web::post().to(handlers::bulk_calculate)),
        )
        .service(
            web::scope("/reports")
                .route(
                    "/from-inspection/{inspection_id}/",
                    web::post().to(handlers::create_from_inspection),
                )
                .route("/validate/", web::post().to(handlers::validate_report))
                .route("/bulk_upload/", web::post().to(handlers::bulk_upload))
                .route(
                    "/{id}/analyze_violations/",
                    web::post().to(handlers::analyze_violations),
                )
                .route(
                    "/{id}/generate_documents/",
                    web::post().to(handlers::generate_documents),
                )
                .route("/{id}/download_docx/", web::get().to(handlers::download_docx))
                .route(
                    "/{id}/image_requirements/",
                    web::get().to(handlers::image_requirements),
                ),
        )
}

/// Serve the API until the server is stopped.
///
/// # Errors
///
/// Returns an error if the address cannot be bound.
pub async fn run(service: ReportService, config: &ServerConfig) -> std::io::Result<()> {
    let state = web::Data::new(AppState::new(service));
    let mut server = HttpServer::new(move || App::new().app_data(state.clone()).service(routes()));
    if config.workers > 0 {
        server = server.workers(config.workers);
    }

    info!(
        address = %config.bind_address,
        port = config.port,
        "Starting HTTP server"
    );
    server
        .bind((config.bind_address.as_str(), config.port))?
        .run()
        .await
}
