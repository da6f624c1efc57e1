use crate::config::Config;
use crate::errors::AppError;
use crate::idology::IDology;
use crate::models::{CustomerData, VerificationOutcome};
use crate::transport::{HttpTransport, Transport};
use crate::trulioo::Trulioo;
use crate::verification::{KycPlatform, Verifier};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use std::collections::BTreeMap;
use std::sync::Arc;

/// Shared application state injected into handlers.
#[derive(Clone, Default)]
pub struct AppState {
    /// Configured providers keyed by their route name (e.g. "idology").
    pub platforms: BTreeMap<String, Arc<dyn KycPlatform>>,
}

impl AppState {
    /// Builds every provider enabled in the configuration over one shared transport.
    pub fn from_config(config: &Config) -> Result<Self, AppError> {
        let transport: Arc<dyn Transport> = match &config.proxy {
            Some(proxy) => Arc::new(HttpTransport::with_proxy(config.http_timeout, proxy)?),
            None => Arc::new(HttpTransport::new(config.http_timeout)?),
        };
        let mut state = Self::default();

        if let Some(idology) = &config.idology {
            let provider = IDology::new(idology.clone(), transport.clone())?;
            state = state.with_platform("idology", Arc::new(Verifier::new(provider)));
        }
        if let Some(trulioo) = &config.trulioo {
            let provider = Trulioo::new(trulioo.clone(), transport.clone())?;
            state = state.with_platform("trulioo", Arc::new(Verifier::new(provider)));
        }

        Ok(state)
    }

    pub fn with_platform(mut self, name: &str, platform: Arc<dyn KycPlatform>) -> Self {
        self.platforms.insert(name.to_lowercase(), platform);
        self
    }

    fn platform(&self, name: &str) -> Result<Arc<dyn KycPlatform>, AppError> {
        self.platforms
            .get(&name.to_lowercase())
            .cloned()
            .ok_or_else(|| AppError::NotFound(format!("provider '{}' is not configured", name)))
    }
}

/// Health check endpoint.
///
/// Returns the service status and the configured providers.
pub async fn health(State(state): State<Arc<AppState>>) -> (StatusCode, Json<serde_json::Value>) {
    let providers: Vec<&str> = state.platforms.keys().map(String::as_str).collect();
    (
        StatusCode::OK,
        Json(json!({
            "status": "healthy",
            "service": "kyc-verify",
            "version": env!("CARGO_PKG_VERSION"),
            "providers": providers,
        })),
    )
}

/// POST /api/v1/verify/:provider
///
/// Runs one customer check. Approved and Denied both answer 200.
pub async fn verify_customer(
    State(state): State<Arc<AppState>>,
    Path(provider): Path<String>,
    Json(customer): Json<CustomerData>,
) -> Result<Json<VerificationOutcome>, AppError> {
    tracing::info!("POST /verify/{}", provider);

    if customer.first_name.trim().is_empty() || customer.last_name.trim().is_empty() {
        return Err(AppError::BadRequest(
            "first_name and last_name are required".to_string(),
        ));
    }

    let platform = state.platform(&provider)?;
    let outcome = platform.check_customer(&customer).await?;
    Ok(Json(outcome))
}

/// GET /api/v1/verify/:provider/status/:reference_id
pub async fn check_status(
    State(state): State<Arc<AppState>>,
    Path((provider, reference_id)): Path<(String, String)>,
) -> Result<Json<VerificationOutcome>, AppError> {
    tracing::info!("GET /verify/{}/status/{}", provider, reference_id);

    let platform = state.platform(&provider)?;
    let outcome = platform.check_status(&reference_id).await?;
    Ok(Json(outcome))
}

/// Verification routes, without rate limiting so that callers can layer it.
pub fn verification_routes() -> Router<Arc<AppState>> {
    Router::new()
        .route("/api/v1/verify/:provider", post(verify_customer))
        .route(
            "/api/v1/verify/:provider/status/:reference_id",
            get(check_status),
        )
}
