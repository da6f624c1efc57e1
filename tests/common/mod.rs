#![allow(dead_code)]
//! Shared fixtures for integration tests.

use async_trait::async_trait;
use chrono::NaiveDate;
use kyc_verify::errors::AppError;
use kyc_verify::idology::IdologyConfig;
use kyc_verify::models::{Address, CustomerData, IdCard};
use kyc_verify::transport::{Headers, Transport, TransportResponse};
use kyc_verify::trulioo::TruliooConfig;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

/// Transport that answers every call with the same canned reply and counts calls.
pub struct MockTransport {
    reply: Result<TransportResponse, AppError>,
    posts: AtomicUsize,
    gets: AtomicUsize,
    last_url: Mutex<Option<String>>,
    last_body: Mutex<Option<Vec<u8>>>,
}

impl MockTransport {
    pub fn json(status: u16, body: serde_json::Value) -> Self {
        Self::raw(status, body.to_string().into_bytes())
    }

    pub fn raw(status: u16, body: Vec<u8>) -> Self {
        Self::with_reply(Ok(TransportResponse { status, body }))
    }

    pub fn failing(message: &str) -> Self {
        Self::with_reply(Err(AppError::Transport(message.to_string())))
    }

    fn with_reply(reply: Result<TransportResponse, AppError>) -> Self {
        Self {
            reply,
            posts: AtomicUsize::new(0),
            gets: AtomicUsize::new(0),
            last_url: Mutex::new(None),
            last_body: Mutex::new(None),
        }
    }

    pub fn posts(&self) -> usize {
        self.posts.load(Ordering::SeqCst)
    }

    pub fn gets(&self) -> usize {
        self.gets.load(Ordering::SeqCst)
    }

    pub fn calls(&self) -> usize {
        self.posts() + self.gets()
    }

    pub fn last_url(&self) -> Option<String> {
        self.last_url.lock().unwrap().clone()
    }

    pub fn last_body_json(&self) -> Option<serde_json::Value> {
        self.last_body
            .lock()
            .unwrap()
            .as_ref()
            .map(|body| serde_json::from_slice(body).unwrap())
    }
}

#[async_trait]
impl Transport for MockTransport {
    async fn post(
        &self,
        url: &str,
        _headers: &Headers,
        body: Vec<u8>,
    ) -> Result<TransportResponse, AppError> {
        self.posts.fetch_add(1, Ordering::SeqCst);
        *self.last_url.lock().unwrap() = Some(url.to_string());
        *self.last_body.lock().unwrap() = Some(body);
        self.reply.clone()
    }

    async fn get(&self, url: &str, _headers: &Headers) -> Result<TransportResponse, AppError> {
        self.gets.fetch_add(1, Ordering::SeqCst);
        *self.last_url.lock().unwrap() = Some(url.to_string());
        self.reply.clone()
    }
}

pub fn idology_config(host: &str) -> IdologyConfig {
    IdologyConfig {
        host: host.to_string(),
        username: "modulus.dev2".to_string(),
        password: "sandbox_password".to_string(),
        use_summary_result: false,
    }
}

pub fn trulioo_config(host: &str) -> TruliooConfig {
    TruliooConfig {
        host: host.to_string(),
        token: "dXNlcjpwYXNz".to_string(),
        consents: vec!["Birth Registry".to_string(), "Visa Verification".to_string()],
    }
}

/// The ExpectID sandbox's baseline customer.
pub fn new_customer() -> CustomerData {
    CustomerData {
        first_name: "John".to_string(),
        last_name: "Smith".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1975, 2, 28),
        current_address: Address {
            country_alpha2: "US".to_string(),
            state: "Georgia".to_string(),
            state_province_code: "GA".to_string(),
            town: "Atlanta".to_string(),
            street: "PeachTree Place".to_string(),
            building_number: "222333".to_string(),
            post_code: "30318".to_string(),
        },
        id_card: Some(IdCard {
            country_alpha2: "US".to_string(),
            number: "112223333".to_string(),
        }),
    }
}

/// Sandbox customer that triggers the Patriot Act restriction.
pub fn watchlist_customer() -> CustomerData {
    CustomerData {
        first_name: "John".to_string(),
        last_name: "Bredenkamp".to_string(),
        date_of_birth: NaiveDate::from_ymd_opt(1940, 8, 1),
        current_address: Address {
            country_alpha2: "US".to_string(),
            state: "Tennessee".to_string(),
            state_province_code: "TN".to_string(),
            town: "Nashville".to_string(),
            street: "Brentwood Drive".to_string(),
            building_number: "147".to_string(),
            post_code: "37214".to_string(),
        },
        id_card: Some(IdCard {
            country_alpha2: "US".to_string(),
            number: "555667777".to_string(),
        }),
    }
}

pub fn patriot_act_body() -> serde_json::Value {
    serde_json::json!({
        "id-number": 1817407442,
        "summary-result": { "key": "id.failure", "message": "FAIL" },
        "results": { "key": "result.match.restricted", "message": "result.match.restricted" },
        "restriction": {
            "key": "global.watch.list",
            "message": "Patriot Act Alert",
            "pa": {
                "list": "Office of Foreign Asset Control",
                "score": 100,
                "dob-match": "PA DOB Match"
            }
        }
    })
}

pub fn street_name_mismatch_body() -> serde_json::Value {
    serde_json::json!({
        "id-number": 1817407443,
        "summary-result": { "key": "id.success", "message": "PASS" },
        "results": { "key": "result.match", "message": "ID Located" },
        "qualifiers": [
            { "key": "resultcode.address.does.not.match", "message": "Address Does Not Match" },
            { "key": "resultcode.street.name.does.not.match", "message": "Street Name Does Not Match" }
        ]
    })
}

pub fn clean_body() -> serde_json::Value {
    serde_json::json!({
        "id-number": 1817407444,
        "summary-result": { "key": "id.success", "message": "PASS" },
        "results": { "key": "result.match", "message": "ID Located" }
    })
}
