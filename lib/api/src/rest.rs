use actix_cors::Cors;
use actix_web::{http::StatusCode, web, App, HttpResponse, HttpServer, Result as ActixResult};
use serde::Deserialize;
use std::sync::Arc;
use tracing::{error, warn};
use vialert_core::Error;
use vialert_similarity::{AccidentReport, IngestOutcome, SimilarityEngine};

#[derive(Deserialize)]
struct AddressQuery {
    direccion: Option<String>,
}

pub struct RestApi;

impl RestApi {
    pub async fn start(engine: Arc<SimilarityEngine>, port: u16) -> std::io::Result<()> {
        HttpServer::new(move || {
            let cors = Cors::default()
                .allow_any_origin()
                .allow_any_method()
                .allow_any_header()
                .max_age(3600);

            App::new()
                .wrap(cors)
                .app_data(web::Data::new(engine.clone()))
                .configure(RestApi::configure)
        })
        .bind(("0.0.0.0", port))?
        .run()
        .await
    }

    /// Register the routes. Expects `web::Data<Arc<SimilarityEngine>>`.
    pub fn configure(cfg: &mut web::ServiceConfig) {
        cfg.route("/health", web::get().to(health))
            .route("/accidentes", web::post().to(register_accident))
            .route("/accidentes/similares", web::get().to(find_similar))
            .route("/accidentes/alerta", web::get().to(generate_alert));
    }
}

fn error_status(e: &Error) -> StatusCode {
    if e.is_validation() {
        StatusCode::BAD_REQUEST
    } else if matches!(e, Error::Timeout(..)) {
        StatusCode::GATEWAY_TIMEOUT
    } else if e.is_upstream() {
        StatusCode::BAD_GATEWAY
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

fn error_response(e: Error) -> HttpResponse {
    let status = error_status(&e);
    if status.is_server_error() {
        error!("Request failed: {}", e);
    }
    HttpResponse::build(status).json(serde_json::json!({
        "error": e.to_string()
    }))
}

fn missing_address() -> HttpResponse {
    HttpResponse::BadRequest().json(serde_json::json!({
        "error": "Query parameter 'direccion' is required"
    }))
}

async fn health(engine: web::Data<Arc<SimilarityEngine>>) -> ActixResult<HttpResponse> {
    Ok(HttpResponse::Ok().json(serde_json::json!({
        "status": "ok",
        "records": engine.store().len(),
    })))
}

async fn find_similar(
    engine: web::Data<Arc<SimilarityEngine>>,
    query: web::Query<AddressQuery>,
) -> ActixResult<HttpResponse> {
    let Some(address) = query.direccion.as_deref() else {
        return Ok(missing_address());
    };

    match engine.find_similar(address).await {
        Ok(records) => Ok(HttpResponse::Ok().json(records)),
        Err(e) => Ok(error_response(e)),
    }
}

async fn generate_alert(
    engine: web::Data<Arc<SimilarityEngine>>,
    query: web::Query<AddressQuery>,
) -> ActixResult<HttpResponse> {
    let Some(address) = query.direccion.as_deref() else {
        return Ok(missing_address());
    };

    match engine.generate_alert(address).await {
        Ok(alert) => Ok(HttpResponse::Ok()
            .content_type("text/plain; charset=utf-8")
            .body(alert)),
        Err(e) => Ok(error_response(e)),
    }
}

// Body errors are reported as an outcome too, so this always answers 200.
async fn register_accident(
    engine: web::Data<Arc<SimilarityEngine>>,
    body: web::Bytes,
) -> ActixResult<HttpResponse> {
    let outcome = match serde_json::from_slice::<AccidentReport>(&body) {
        Ok(report) => engine.register_accident(report).await,
        Err(e) => {
            warn!("Rejected accident report body: {}", e);
            IngestOutcome::failure(format!("Cuerpo de la solicitud inválido: {}", e))
        }
    };
    Ok(HttpResponse::Ok().json(outcome))
}
