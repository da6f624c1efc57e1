//! KYC Verification Library
//!
//! This library normalizes identity-verification providers (IDology ExpectID,
//! Trulioo GlobalGateway) behind one interface: send a provider-agnostic
//! customer description, get back an Approved/Denied outcome with the
//! provider's reasons, or an error.
//!
//! # Modules
//!
//! - `api`: API definitions.
//! - `core`: Core decision logic and shared models.
//! - `integrations`: External provider integrations.
//! - `config`: Configuration management.
//! - `errors`: Error handling types.
//! - `handlers`: HTTP request handlers.
//! - `idology`: IDology ExpectID adapter and normalizer.
//! - `models`: Customer input and verification outcome models.
//! - `normalizer`: Declarative qualifier classification.
//! - `transport`: HTTP transport seam.
//! - `trulioo`: Trulioo GlobalGateway adapter and normalizer.
//! - `verification`: Provider-agnostic verification facade.

pub mod api;
pub mod core;
pub mod integrations;

// Re-export primary modules for shared use in tests and other binaries
pub mod config;
pub mod errors;
pub mod handlers;
pub mod idology;
pub mod models;
pub mod normalizer;
pub mod transport;
pub mod trulioo;
pub mod verification;
