//! Verification facade.
//!
//! Callers talk to [`KycPlatform`] and never see which provider answered.
//! Each provider implements [`Provider`] (adapter + normalizer) and is wrapped
//! in a [`Verifier`].

use crate::errors::{AppError, ResultExt};
use crate::models::{CustomerData, VerificationOutcome};
use async_trait::async_trait;

/// Builds the fixed capability-mismatch error for a status check.
pub fn status_check_unsupported(provider: &str) -> AppError {
    AppError::Capability(format!(
        "{} doesn't support a verification status check",
        provider
    ))
}

/// Adapter and normalizer pair for one external provider.
#[async_trait]
pub trait Provider: Send + Sync {
    /// Parsed provider reply, discarded after normalization.
    type Response: Send;

    /// Display name used in messages and logs.
    fn name(&self) -> &'static str;

    /// Builds the native request and performs exactly one outbound call.
    async fn send(&self, customer: &CustomerData) -> Result<Self::Response, AppError>;

    /// Maps the provider reply to an outcome. `Err` means `Status::Error`.
    fn normalize(&self, response: Self::Response) -> Result<VerificationOutcome, AppError>;

    /// Looks up an earlier verification by reference. Unsupported unless overridden.
    async fn check_status(&self, _reference_id: &str) -> Result<VerificationOutcome, AppError> {
        Err(status_check_unsupported(self.name()))
    }
}

/// Provider-agnostic verification interface.
#[async_trait]
pub trait KycPlatform: Send + Sync {
    fn provider_name(&self) -> &'static str;

    async fn check_customer(
        &self,
        customer: &CustomerData,
    ) -> Result<VerificationOutcome, AppError>;

    async fn check_status(&self, reference_id: &str) -> Result<VerificationOutcome, AppError>;
}

/// Facade over a single provider.
#[derive(Debug, Clone)]
pub struct Verifier<P> {
    provider: P,
}

impl<P: Provider> Verifier<P> {
    pub fn new(provider: P) -> Self {
        Self { provider }
    }
}

#[async_trait]
impl<P: Provider> KycPlatform for Verifier<P> {
    fn provider_name(&self) -> &'static str {
        self.provider.name()
    }

    async fn check_customer(
        &self,
        customer: &CustomerData,
    ) -> Result<VerificationOutcome, AppError> {
        let name = self.provider.name();
        tracing::info!("{}: checking customer", name);

        let response = self
            .provider
            .send(customer)
            .await
            .context("during verification")?;
        let outcome = self
            .provider
            .normalize(response)
            .context("during verification")?;

        tracing::info!(
            "{}: customer check finished with {:?} ({} reasons)",
            name,
            outcome.status,
            outcome.reasons().len()
        );
        Ok(outcome)
    }

    async fn check_status(&self, reference_id: &str) -> Result<VerificationOutcome, AppError> {
        tracing::info!(
            "{}: checking status of reference {}",
            self.provider.name(),
            reference_id
        );
        self.provider.check_status(reference_id).await
    }
}
