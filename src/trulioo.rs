//! Trulioo GlobalGateway integration.
//!
//! Verification is consent based: every request accepts the terms and lists the
//! datasources the customer consented to. The reply is a transaction record
//! whose `RecordStatus` is the provider's decision; the per-datasource field
//! statuses and errors become the reasons.

use crate::errors::{AppError, ResultExt};
use crate::models::{CustomerData, VerificationOutcome};
use crate::normalizer::{self, Effect, Qualifier, Rule, RuleTable};
use crate::transport::{decode_lenient, Headers, Transport, TransportResponse};
use crate::verification::Provider;
use async_trait::async_trait;
use chrono::Datelike;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use url::Url;

const PROVIDER_NAME: &str = "Trulioo";

/// Fixed configuration profile every verification runs under.
pub const CONFIGURATION_NAME: &str = "Identity Verification";

const RULES: &[Rule] = &[Rule {
    pattern: r"^record\.nomatch$",
    effect: Effect::HardDeny,
}];

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TruliooConfig {
    pub host: String,
    /// Base64 `user:password` pair for the Basic authorization header.
    pub token: String,
    /// Datasources the customer consented to.
    #[serde(default)]
    pub consents: Vec<String>,
}

// ============ Wire Models ============

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct StartVerificationRequest {
    accept_trulioo_terms_and_conditions: bool,
    configuration_name: &'static str,
    consent_for_data_sources: Vec<String>,
    country_code: String,
    data_fields: DataFields,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct DataFields {
    person_info: PersonInfo,
    location: Location,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    national_ids: Vec<NationalId>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct PersonInfo {
    first_given_name: String,
    first_sur_name: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    day_of_birth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    month_of_birth: Option<u32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    year_of_birth: Option<i32>,
}

#[derive(Debug, Clone, Default, Serialize)]
#[serde(rename_all = "PascalCase")]
struct Location {
    #[serde(skip_serializing_if = "Option::is_none")]
    building_number: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    street_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    city: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    state_province_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    postal_code: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "PascalCase")]
struct NationalId {
    number: String,
    #[serde(rename = "Type")]
    kind: &'static str,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct ServiceError {
    pub code: Option<String>,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasourceField {
    pub field_name: String,
    pub status: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct DatasourceResult {
    pub datasource_name: String,
    #[serde(default)]
    pub datasource_fields: Vec<DatasourceField>,
    #[serde(default)]
    pub errors: Vec<ServiceError>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct Record {
    #[serde(rename = "TransactionRecordID")]
    pub transaction_record_id: Option<String>,
    pub record_status: Option<String>,
    #[serde(default)]
    pub datasource_results: Vec<DatasourceResult>,
    #[serde(default)]
    pub errors: Vec<ServiceError>,
}

/// Parsed verify or transaction-record reply.
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct TruliooResponse {
    /// HTTP status when the call did not succeed.
    #[serde(skip)]
    pub error_code: Option<u16>,
    #[serde(rename = "TransactionID")]
    pub transaction_id: Option<String>,
    pub country_code: Option<String>,
    pub record: Option<Record>,
    #[serde(default)]
    pub errors: Vec<ServiceError>,
    /// Set by the gateway itself on authorization failures.
    pub message: Option<String>,
}

fn error_key(prefix: &str, error: &ServiceError) -> String {
    match &error.code {
        Some(code) => format!("{}.error.{}", prefix, code),
        None => format!("{}.error", prefix),
    }
}

impl Record {
    /// Record status as a classification signal, e.g. `record.nomatch`.
    pub fn status_signal(&self) -> Option<String> {
        self.record_status
            .as_deref()
            .map(|s| format!("record.{}", s.trim().to_lowercase()))
    }

    /// Evidence for the decision, in order: the record status unless it is
    /// `match`, then non-matching fields and errors datasource by datasource,
    /// then record errors.
    ///
    /// A `match` status or field confirms the input and carries no reason, so
    /// it is not a qualifier.
    pub fn qualifiers(&self) -> Vec<Qualifier> {
        let mut qualifiers = Vec::new();

        if let (Some(signal), Some(status)) = (self.status_signal(), &self.record_status) {
            if signal != "record.match" {
                qualifiers.push(Qualifier::new(
                    signal,
                    format!("Record Status: {}", status.trim()),
                ));
            }
        }

        for datasource in &self.datasource_results {
            let name = &datasource.datasource_name;
            for field in &datasource.datasource_fields {
                if field.status.eq_ignore_ascii_case("match") {
                    continue;
                }
                qualifiers.push(Qualifier::new(
                    format!("field.{}", field.status.to_lowercase()),
                    format!("{}: {} {}", name, field.field_name, field.status),
                ));
            }
            for error in &datasource.errors {
                qualifiers.push(Qualifier::new(
                    error_key("datasource", error),
                    format!("{}: {}", name, error.message),
                ));
            }
        }

        for error in &self.errors {
            qualifiers.push(Qualifier::new(
                error_key("record", error),
                error.message.clone(),
            ));
        }

        qualifiers
    }
}

fn non_empty(value: &str) -> Option<String> {
    let trimmed = value.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_string())
}

// ============ Provider ============

pub struct Trulioo {
    config: TruliooConfig,
    transport: Arc<dyn Transport>,
    rules: RuleTable,
}

impl Trulioo {
    pub fn new(config: TruliooConfig, transport: Arc<dyn Transport>) -> Result<Self, AppError> {
        Ok(Self {
            config,
            transport,
            rules: RuleTable::compile(RULES)?,
        })
    }

    fn headers(&self) -> Headers {
        let mut headers = Headers::new();
        headers.insert(
            "Authorization".to_string(),
            format!("Basic {}", self.config.token),
        );
        headers.insert(
            "Content-Type".to_string(),
            "application/json; charset=utf-8".to_string(),
        );
        headers
    }

    fn build_request(&self, customer: &CustomerData) -> StartVerificationRequest {
        let address = &customer.current_address;
        let dob = customer.date_of_birth;

        let national_ids = customer
            .id_card
            .iter()
            .map(|card| NationalId {
                number: card.number.clone(),
                kind: "SocialService",
            })
            .collect();

        StartVerificationRequest {
            accept_trulioo_terms_and_conditions: true,
            configuration_name: CONFIGURATION_NAME,
            consent_for_data_sources: self.config.consents.clone(),
            country_code: address.country_alpha2.trim().to_uppercase(),
            data_fields: DataFields {
                person_info: PersonInfo {
                    first_given_name: customer.first_name.clone(),
                    first_sur_name: customer.last_name.clone(),
                    day_of_birth: dob.map(|d| d.day()),
                    month_of_birth: dob.map(|d| d.month()),
                    year_of_birth: dob.map(|d| d.year()),
                },
                location: Location {
                    building_number: non_empty(&address.building_number),
                    street_name: non_empty(&address.street),
                    city: non_empty(&address.town),
                    state_province_code: non_empty(&address.state_province_code),
                    postal_code: non_empty(&address.post_code),
                },
                national_ids,
            },
        }
    }

    fn verify_url(&self) -> String {
        format!("{}/verify", self.config.host.trim_end_matches('/'))
    }

    fn transaction_record_url(&self, reference_id: &str) -> Result<Url, AppError> {
        let mut url = Url::parse(&self.config.host).map_err(|e| {
            AppError::InternalError(format!("Invalid Trulioo host '{}': {}", self.config.host, e))
        })?;
        url.path_segments_mut()
            .map_err(|_| {
                AppError::InternalError(format!(
                    "Trulioo host '{}' cannot carry a path",
                    self.config.host
                ))
            })?
            .pop_if_empty()
            .extend(["verifications", "v1", "transactionrecord", reference_id]);
        Ok(url)
    }

    fn decode(reply: &TransportResponse) -> Result<TruliooResponse, AppError> {
        let (mut response, error_code): (TruliooResponse, _) =
            decode_lenient(reply, PROVIDER_NAME)?;
        response.error_code = error_code;
        Ok(response)
    }
}

#[async_trait]
impl Provider for Trulioo {
    type Response = TruliooResponse;

    fn name(&self) -> &'static str {
        PROVIDER_NAME
    }

    async fn send(&self, customer: &CustomerData) -> Result<TruliooResponse, AppError> {
        let request = self.build_request(customer);
        let body = serde_json::to_vec(&request).map_err(|e| {
            AppError::InternalError(format!("Failed to encode Trulioo request: {}", e))
        })?;

        tracing::debug!(
            "Trulioo: verifying in {} with {} consents",
            request.country_code,
            request.consent_for_data_sources.len()
        );
        let reply = self
            .transport
            .post(&self.verify_url(), &self.headers(), body)
            .await?;

        Self::decode(&reply)
    }

    fn normalize(&self, response: TruliooResponse) -> Result<VerificationOutcome, AppError> {
        if let Some(code) = response.error_code {
            let message = response
                .message
                .clone()
                .or_else(|| response.errors.first().map(|e| e.message.clone()))
                .map(|m| m.trim().to_string())
                .filter(|m| !m.is_empty());

            return Err(match (code, message) {
                (401 | 403, Some(message)) => AppError::Credential(message),
                (401 | 403, None) => AppError::Credential(format!(
                    "Trulioo rejected credentials (HTTP {})",
                    code
                )),
                (_, message) => AppError::Transport(format!(
                    "Trulioo returned HTTP status {}: {}",
                    code,
                    message.as_deref().unwrap_or("no details")
                )),
            });
        }

        let record = match response.record {
            Some(record) => record,
            None if !response.errors.is_empty() => {
                let messages: Vec<&str> =
                    response.errors.iter().map(|e| e.message.as_str()).collect();
                return Err(AppError::Rejected(messages.join("; ")));
            }
            None => {
                return Err(AppError::Transport(
                    "Trulioo response carries no record".to_string(),
                ))
            }
        };

        let qualifiers = record.qualifiers();
        let decision = self.rules.decide(qualifiers.iter().map(|q| q.key.as_str()));

        tracing::debug!(
            "Trulioo: transaction {:?} in {:?}, record {:?} is {:?}",
            response.transaction_id,
            response.country_code,
            record.transaction_record_id,
            record.record_status
        );

        Ok(normalizer::normalize(&decision, false, qualifiers))
    }

    async fn check_status(&self, reference_id: &str) -> Result<VerificationOutcome, AppError> {
        let reference_id = reference_id.trim();
        if reference_id.is_empty() {
            return Err(AppError::BadRequest(
                "transaction record ID is required".to_string(),
            ));
        }

        let url = self.transaction_record_url(reference_id)?;
        let reply = self
            .transport
            .get(url.as_str(), &self.headers())
            .await
            .context("during status check")?;

        let response = Self::decode(&reply).context("during status check")?;
        self.normalize(response).context("during status check")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{Address, IdCard, Status};
    use chrono::NaiveDate;

    struct NoTransport;

    #[async_trait]
    impl Transport for NoTransport {
        async fn post(
            &self,
            _url: &str,
            _headers: &Headers,
            _body: Vec<u8>,
        ) -> Result<TransportResponse, AppError> {
            Err(AppError::Transport("offline".to_string()))
        }

        async fn get(&self, _url: &str, _headers: &Headers) -> Result<TransportResponse, AppError> {
            Err(AppError::Transport("offline".to_string()))
        }
    }

    fn service(host: &str) -> Trulioo {
        Trulioo::new(
            TruliooConfig {
                host: host.to_string(),
                token: "dG9rZW4=".to_string(),
                consents: vec!["Birth Registry".to_string()],
            },
            Arc::new(NoTransport),
        )
        .unwrap()
    }

    fn parse(body: serde_json::Value) -> TruliooResponse {
        serde_json::from_value(body).unwrap()
    }

    #[test]
    fn test_request_applies_mandatory_defaults() {
        let customer = CustomerData {
            first_name: "John".to_string(),
            last_name: "Smith".to_string(),
            date_of_birth: NaiveDate::from_ymd_opt(1983, 8, 5),
            current_address: Address {
                country_alpha2: "us".to_string(),
                town: "Atlanta".to_string(),
                street: "PeachTree Place".to_string(),
                building_number: "10".to_string(),
                ..Default::default()
            },
            id_card: Some(IdCard {
                country_alpha2: "US".to_string(),
                number: "112223333".to_string(),
            }),
        };

        let json = serde_json::to_value(service("https://api.test").build_request(&customer))
            .unwrap();
        assert_eq!(json["AcceptTruliooTermsAndConditions"], true);
        assert_eq!(json["ConfigurationName"], "Identity Verification");
        assert_eq!(json["ConsentForDataSources"][0], "Birth Registry");
        assert_eq!(json["CountryCode"], "US");
        assert_eq!(json["DataFields"]["PersonInfo"]["FirstSurName"], "Smith");
        assert_eq!(json["DataFields"]["PersonInfo"]["YearOfBirth"], 1983);
        assert_eq!(json["DataFields"]["Location"]["StreetName"], "PeachTree Place");
        assert!(json["DataFields"]["Location"].get("PostalCode").is_none());
        assert_eq!(json["DataFields"]["NationalIds"][0]["Type"], "SocialService");
    }

    #[test]
    fn test_transaction_record_url_encodes_reference() {
        let url = service("https://api.test/")
            .transaction_record_url("abc/def")
            .unwrap();
        assert_eq!(
            url.as_str(),
            "https://api.test/verifications/v1/transactionrecord/abc%2Fdef"
        );
    }

    #[test]
    fn test_match_record_approves_with_field_reasons() {
        let response = parse(serde_json::json!({
            "TransactionID": "t-1",
            "Record": {
                "TransactionRecordID": "r-1",
                "RecordStatus": "match",
                "DatasourceResults": [{
                    "DatasourceName": "Credit Agency",
                    "DatasourceFields": [
                        { "FieldName": "FirstGivenName", "Status": "match" },
                        { "FieldName": "PostalCode", "Status": "nomatch" },
                        { "FieldName": "DayOfBirth", "Status": "missing" }
                    ]
                }]
            }
        }));

        let outcome = service("https://api.test").normalize(response).unwrap();
        assert_eq!(outcome.status, Status::Approved);
        assert_eq!(
            outcome.reasons(),
            &[
                "Credit Agency: PostalCode nomatch",
                "Credit Agency: DayOfBirth missing"
            ]
        );
    }

    #[test]
    fn test_nomatch_record_denies() {
        let response = parse(serde_json::json!({
            "Record": {
                "RecordStatus": "nomatch",
                "DatasourceResults": [{
                    "DatasourceName": "Birth Registry",
                    "DatasourceFields": [],
                    "Errors": [{ "Code": "4001", "Message": "Datasource timed out" }]
                }],
                "Errors": [{ "Code": "1001", "Message": "Partial result" }]
            }
        }));

        let outcome = service("https://api.test").normalize(response).unwrap();
        assert_eq!(outcome.status, Status::Denied);
        assert_eq!(
            outcome.reasons(),
            &[
                "Record Status: nomatch",
                "Birth Registry: Datasource timed out",
                "Partial result"
            ]
        );
    }

    #[test]
    fn test_bare_nomatch_record_still_names_the_denial() {
        let response = parse(serde_json::json!({
            "Record": { "RecordStatus": "nomatch", "DatasourceResults": [] }
        }));

        let outcome = service("https://api.test").normalize(response).unwrap();
        assert_eq!(outcome.status, Status::Denied);
        assert_eq!(outcome.reasons(), &["Record Status: nomatch"]);
    }

    #[test]
    fn test_other_record_status_is_kept_but_neutral() {
        let response = parse(serde_json::json!({
            "Record": { "RecordStatus": "missing", "DatasourceResults": [] }
        }));

        let outcome = service("https://api.test").normalize(response).unwrap();
        assert_eq!(outcome.status, Status::Approved);
        assert_eq!(outcome.reasons(), &["Record Status: missing"]);
    }

    #[test]
    fn test_unauthorized_is_credential_error() {
        let mut response = parse(serde_json::json!({
            "Message": "Authorization has been denied for this request."
        }));
        response.error_code = Some(401);

        let err = service("https://api.test").normalize(response).unwrap_err();
        assert_eq!(
            err,
            AppError::Credential("Authorization has been denied for this request.".to_string())
        );
    }

    #[test]
    fn test_unauthorized_without_body_names_the_status() {
        let response = TruliooResponse {
            error_code: Some(401),
            ..Default::default()
        };

        let err = service("https://api.test").normalize(response).unwrap_err();
        assert_eq!(
            err,
            AppError::Credential("Trulioo rejected credentials (HTTP 401)".to_string())
        );
    }

    #[test]
    fn test_top_level_errors_without_record_are_rejected() {
        let response = parse(serde_json::json!({
            "Errors": [
                { "Code": "1001", "Message": "Missing required field: CountryCode" },
                { "Code": "1002", "Message": "Invalid consent" }
            ]
        }));

        let err = service("https://api.test").normalize(response).unwrap_err();
        assert_eq!(
            err.to_string(),
            "Missing required field: CountryCode; Invalid consent"
        );
    }
}
