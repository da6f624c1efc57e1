//! IDology ExpectID integration.
//!
//! ExpectID is a demographic-match check: the reply carries a list of
//! qualifiers and, on a watchlist hit, a Patriot Act restriction block.
//! Bad credentials come back as HTTP 200 with an embedded `error` field.

use crate::errors::AppError;
use crate::models::{CustomerData, VerificationOutcome};
use crate::normalizer::{self, Effect, Qualifier, Rule, RuleTable};
use crate::transport::{decode_lenient, Headers, Transport};
use crate::verification::Provider;
use async_trait::async_trait;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::sync::Arc;

/// Production ExpectID endpoint.
pub const KYC_ENDPOINT: &str = "https://web.idologylive.com/api/idiq.svc";

const PROVIDER_NAME: &str = "IDology";

/// Qualifier classification for ExpectID replies.
const RULES: &[Rule] = &[
    // Patriot Act / OFAC restriction block
    Rule {
        pattern: r"^global\.watch\.list$",
        effect: Effect::HardDeny,
    },
    // Provider's own summary decision, only emitted when configured
    Rule {
        pattern: r"^summary\.id\.failure$",
        effect: Effect::HardDeny,
    },
    // Applicant under 13
    Rule {
        pattern: r"^resultcode\.coppa\.alert$",
        effect: Effect::SoftDeny,
    },
];

/// Documented qualifiers the sandbox never reproduced. Kept neutral.
const UNVERIFIED_QUALIFIERS: &[&str] = &[
    "resultcode.subject.deceased",
    "resultcode.ssn.issued.prior.to.dob",
    "resultcode.ssn.invalid",
];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct IdologyConfig {
    pub host: String,
    pub username: String,
    pub password: String,
    /// Let ExpectID's summary result (`id.failure`) deny the customer.
    #[serde(default)]
    pub use_summary_result: bool,
}

// ============ Wire Models ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
struct ExpectIdRequest<'a> {
    username: &'a str,
    password: &'a str,
    first_name: &'a str,
    last_name: &'a str,
    address: String,
    city: &'a str,
    state: &'a str,
    zip: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    dob_month: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dob_day: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    dob_year: Option<i32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    ssn: Option<&'a str>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct KeyMessage {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub message: String,
}

/// Patriot Act details of a watchlist restriction.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PatriotAct {
    pub list: Option<String>,
    pub score: Option<u32>,
    #[serde(rename = "dob-match")]
    pub dob_match: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct Restriction {
    #[serde(default)]
    pub key: String,
    #[serde(default)]
    pub message: String,
    pub pa: Option<PatriotAct>,
}

/// Parsed ExpectID reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct IdologyResponse {
    /// HTTP status when the call did not succeed.
    #[serde(skip)]
    pub error_code: Option<u16>,
    #[serde(rename = "id-number")]
    pub id_number: Option<u64>,
    #[serde(rename = "summary-result")]
    pub summary_result: Option<KeyMessage>,
    pub results: Option<KeyMessage>,
    pub restriction: Option<Restriction>,
    #[serde(default)]
    pub qualifiers: Vec<KeyMessage>,
    pub error: Option<String>,
}

impl IdologyResponse {
    /// Qualifiers in reply order: restriction block first, then the qualifier list.
    pub fn qualifiers(&self) -> Vec<Qualifier> {
        let mut qualifiers = Vec::with_capacity(self.qualifiers.len() + 4);

        if let Some(restriction) = &self.restriction {
            qualifiers.push(Qualifier::new(&restriction.key, &restriction.message));

            if let Some(pa) = &restriction.pa {
                if let Some(list) = &pa.list {
                    qualifiers.push(Qualifier::new("pa.list", list));
                }
                if let Some(score) = pa.score {
                    qualifiers.push(Qualifier::new(
                        "pa.score",
                        format!("Patriot Act score: {}", score),
                    ));
                }
                if let Some(dob_match) = &pa.dob_match {
                    qualifiers.push(Qualifier::new("pa.dob.match", dob_match));
                }
            }
        }

        qualifiers.extend(
            self.qualifiers
                .iter()
                .map(|q| Qualifier::new(&q.key, &q.message)),
        );
        qualifiers
    }
}

// ============ Provider ============

pub struct IDology {
    config: IdologyConfig,
    transport: Arc<dyn Transport>,
    rules: RuleTable,
}

impl IDology {
    pub fn new(config: IdologyConfig, transport: Arc<dyn Transport>) -> Result<Self, AppError> {
        Ok(Self {
            config,
            transport,
            rules: RuleTable::compile(RULES)?,
        })
    }

    fn build_request<'a>(&'a self, customer: &'a CustomerData) -> ExpectIdRequest<'a> {
        let address = &customer.current_address;
        let dob = customer.date_of_birth;

        let ssn = customer.id_card.as_ref().and_then(|card| {
            let country = card.country_alpha2.trim();
            if country.eq_ignore_ascii_case("US") || country.eq_ignore_ascii_case("USA") {
                Some(card.number.as_str())
            } else {
                tracing::debug!(
                    "IDology: skipping non-US identifier issued in {}",
                    card.country_alpha2
                );
                None
            }
        });

        ExpectIdRequest {
            username: &self.config.username,
            password: &self.config.password,
            first_name: &customer.first_name,
            last_name: &customer.last_name,
            address: address.street_line(),
            city: &address.town,
            state: &address.state_province_code,
            zip: &address.post_code,
            dob_month: dob.map(|d| d.month()),
            dob_day: dob.map(|d| d.day()),
            dob_year: dob.map(|d| d.year()),
            ssn,
        }
    }
}

/// ExpectID reports bad credentials in the same `error` field as everything else.
fn classify_error(message: &str) -> AppError {
    let lower = message.to_lowercase();
    if lower.contains("username") || lower.contains("password") || lower.contains("credential")
    {
        AppError::Credential(message.to_string())
    } else {
        AppError::Rejected(message.to_string())
    }
}

#[async_trait]
impl Provider for IDology {
    type Response = IdologyResponse;

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn send(&self, customer: &CustomerData) -> Result<IdologyResponse, AppError> {
        let request = self.build_request(customer);
        let body = serde_json::to_vec(&request).map_err(|e| {
            AppError::InternalError(format!("Failed to encode IDology request: {}", e))
        })?;

        let mut headers = Headers::new();
        headers.insert("Content-Type".to_string(), "application/json".to_string());

        tracing::debug!(
            "IDology: sending ExpectID request for user {} (password [REDACTED])",
            self.config.username
        );
        let reply = self.transport.post(&self.config.host, &headers, body).await?;

        let (mut response, error_code): (IdologyResponse, _) =
            decode_lenient(&reply, PROVIDER_NAME)?;
        response.error_code = error_code;
        Ok(response)
    }

    fn normalize(&self, response: IdologyResponse) -> Result<VerificationOutcome, AppError> {
        if let Some(message) = response.error.as_deref().map(str::trim) {
            if !message.is_empty() {
                return Err(classify_error(message));
            }
        }
        if let Some(code) = response.error_code {
            return Err(AppError::Transport(format!(
                "IDology returned HTTP status {}",
                code
            )));
        }

        tracing::debug!(
            "IDology: reply {:?} with result {:?}",
            response.id_number,
            response.results.as_ref().map(|r| r.key.as_str())
        );

        let mut qualifiers = response.qualifiers();
        normalizer::warn_unverified(PROVIDER_NAME, &qualifiers, UNVERIFIED_QUALIFIERS);

        // The summary decision leads the evidence when it is allowed to deny
        if self.config.use_summary_result {
            if let Some(summary) = response
                .summary_result
                .as_ref()
                .filter(|s| s.key == "id.failure")
            {
                let message = match summary.message.trim() {
                    "" => summary.key.clone(),
                    message => message.to_string(),
                };
                qualifiers.insert(0, Qualifier::new("summary.id.failure", message));
            }
        }

        let decision = self.rules.decide(qualifiers.iter().map(|q| q.key.as_str()));

        if let Some(trigger) = &decision.trigger {
            tracing::info!(
                "IDology: denied by {:?} signal '{}'",
                trigger.effect,
                trigger.signal
            );
        }

        Ok(normalizer::normalize(&decision, false, qualifiers))
    }
}
