#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! Chain-agnostic core of x402 payment verification and settlement.
//!
//! A client answers an HTTP 402 challenge with a payment header: a signed,
//! delegated-transfer authorization. This crate decodes that header, checks it
//! against the [`PriceRequirement`](proto::PriceRequirement) the server issued,
//! guards against replay, and hands valid payments to a chain submitter.
//! Signature recovery is chain-specific and plugged in through
//! [`SignatureVerifier`](verifier::SignatureVerifier).
//!
//! # Modules
//!
//! - [`codec`] - Base64 JSON payment header encoding
//! - [`config`] - TOML configuration with environment expansion
//! - [`engine`] - Verification and settlement entry points
//! - [`ledger`] - Consumed-nonce storage for replay protection
//! - [`matcher`] - Payload versus requirement checks
//! - [`proto`] - Wire types and result types
//! - [`submitter`] - Chain submission seam and a simulated submitter
//! - [`timestamp`] - Unix timestamps for authorization windows
//! - [`verifier`] - Signature verification seam
//!
//! # Feature Flags
//!
//! - `telemetry` - Enables tracing instrumentation for debugging and monitoring

pub mod codec;
pub mod config;
pub mod engine;
pub mod ledger;
pub mod matcher;
pub mod proto;
pub mod submitter;
pub mod timestamp;
pub mod verifier;
