use crate::errors::AppError;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

// ============ Customer Input ============

/// Provider-agnostic description of the person being verified.
///
/// Built per request by the caller and only borrowed by the providers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CustomerData {
    /// Given name.
    pub first_name: String,
    /// Family name.
    pub last_name: String,
    /// Date of birth, when known.
    #[serde(default)]
    pub date_of_birth: Option<NaiveDate>,
    /// Current residential address.
    pub current_address: Address,
    /// Government issued identifier (SSN for US residents).
    #[serde(default)]
    pub id_card: Option<IdCard>,
}

/// Postal address of a customer.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    /// ISO 3166-1 alpha-2 country code (e.g., "US").
    pub country_alpha2: String,
    /// Full state or province name (e.g., "Georgia").
    #[serde(default)]
    pub state: String,
    /// Short state or province code (e.g., "GA").
    #[serde(default)]
    pub state_province_code: String,
    /// City or town.
    #[serde(default)]
    pub town: String,
    /// Street name without the building number.
    #[serde(default)]
    pub street: String,
    /// Building number on the street.
    #[serde(default)]
    pub building_number: String,
    /// Postal or ZIP code.
    #[serde(default)]
    pub post_code: String,
}

impl Address {
    /// Building number and street joined the way US postal lines are written.
    pub fn street_line(&self) -> String {
        let number = self.building_number.trim();
        let street = self.street.trim();
        match (number.is_empty(), street.is_empty()) {
            (true, _) => street.to_string(),
            (false, true) => number.to_string(),
            (false, false) => format!("{} {}", number, street),
        }
    }
}

/// Government identifier of a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdCard {
    /// Issuing country, alpha-2 (some callers send alpha-3).
    pub country_alpha2: String,
    /// Identifier value.
    pub number: String,
}

// ============ Verification Outcome ============

/// Uniform verification status shared by every provider.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Status {
    Approved,
    Denied,
    Error,
    Unknown,
}

/// Whether a provider decision can still be appealed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Finality {
    Final,
    Unknown,
}

/// Evidence attached to an Approved or Denied outcome.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Details {
    pub finality: Finality,
    /// Provider qualifiers projected to display strings, in provider order.
    pub reasons: Vec<String>,
}

/// The normalized result of one verification call.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationOutcome {
    pub status: Status,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Details>,
}

impl VerificationOutcome {
    /// Outcome paired with an error. Never carries details.
    pub fn error() -> Self {
        Self {
            status: Status::Error,
            details: None,
        }
    }

    pub fn approved(finality: Finality, reasons: Vec<String>) -> Self {
        Self {
            status: Status::Approved,
            details: Some(Details { finality, reasons }),
        }
    }

    pub fn denied(finality: Finality, reasons: Vec<String>) -> Self {
        Self {
            status: Status::Denied,
            details: Some(Details { finality, reasons }),
        }
    }

    /// Reasons carried by the outcome, empty when there are no details.
    pub fn reasons(&self) -> &[String] {
        self.details
            .as_ref()
            .map(|d| d.reasons.as_slice())
            .unwrap_or(&[])
    }

    /// Splits a facade result into the outcome and its error.
    ///
    /// The error is present exactly when the status is `Error`.
    pub fn split(result: Result<VerificationOutcome, AppError>) -> (Self, Option<AppError>) {
        match result {
            Ok(outcome) => (outcome, None),
            Err(e) => (Self::error(), Some(e)),
        }
    }

    /// Outcome view of a facade result, dropping the error value.
    pub fn from_result(result: &Result<VerificationOutcome, AppError>) -> Self {
        match result {
            Ok(outcome) => outcome.clone(),
            Err(_) => Self::error(),
        }
    }
}
