#![cfg_attr(docsrs, feature(doc_auto_cfg))]

//! EIP-155 (EVM) support for x402 payment verification.
//!
//! This crate plugs EVM signature checking into
//! [`x402_core::engine::PaymentEngine`]: payments are ERC-3009
//! `transferWithAuthorization` messages signed as EIP-712 typed data, and the
//! payer is recovered from the signature.
//!
//! # Example
//!
//! ```
//! use std::sync::Arc;
//!
//! use x402_core::engine::PaymentEngine;
//! use x402_core::ledger::InMemoryNonceLedger;
//! use x402_core::submitter::SimulatedSubmitter;
//! use x402_evm::Eip3009Verifier;
//!
//! let engine = PaymentEngine::new(
//!     Eip3009Verifier::new(),
//!     Arc::new(InMemoryNonceLedger::new()),
//!     Arc::new(SimulatedSubmitter::new()),
//! );
//! # let _ = engine;
//! ```
//!
//! # Modules
//!
//! - [`exact`] - EIP-712 types, the verifier and the client signer
//! - [`networks`] - Network name to chain id table
//!
//! # Feature Flags
//!
//! - `client` - Client-side payment signing (default)
//! - `telemetry` - Tracing instrumentation

pub mod exact;
pub mod networks;

pub use exact::{DomainResolver, Eip3009Verifier};
pub use networks::{EVM_NETWORKS, NetworkInfo, NetworkRegistry};

#[cfg(feature = "client")]
pub use exact::client::{SignerLike, payment_header, sign_authorization};
