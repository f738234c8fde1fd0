//! Replay protection: the set of nonces that have already been settled.
//!
//! The ledger is the only state shared between requests. It is passed to the
//! engine as an `Arc<dyn NonceLedger>`, so engines built with separate ledgers
//! are fully isolated from each other.

use std::sync::atomic::{AtomicU64, Ordering};

use alloy_primitives::B256;
use dashmap::DashMap;
use dashmap::mapref::entry::Entry;

use crate::timestamp::UnixTimestamp;

/// Storage of consumed payment nonces.
///
/// Implementations must be thread-safe. [`consume`](NonceLedger::consume) is
/// the serialization point between concurrent settlements of the same nonce.
///
/// Purging forgets individual nonces, so the ledger also keeps a purge
/// watermark: the highest cutoff it has ever purged to. An authorization whose
/// `valid_before` lies below the watermark counts as consumed whether or not
/// its nonce is still held, which keeps a purged nonce spent even for callers
/// whose clock lags the one that purged.
pub trait NonceLedger: Send + Sync {
    /// Returns `true` if `nonce` has already been consumed, or if an
    /// authorization expiring at `valid_before` falls below the purge watermark.
    fn contains(&self, nonce: &B256, valid_before: UnixTimestamp) -> bool;

    /// Atomically records `nonce` as consumed if it is not already.
    ///
    /// Returns `true` only for the call that inserted the nonce. Every later
    /// call for the same nonce leaves the ledger unchanged and returns `false`.
    /// `valid_before` is the expiry of the authorization that spent the nonce;
    /// below the purge watermark the call is refused and returns `false`.
    fn consume(&self, nonce: B256, valid_before: UnixTimestamp) -> bool;

    /// Removes nonces whose authorization expired before `cutoff` and raises
    /// the purge watermark to `cutoff` if it is higher.
    ///
    /// Returns the number of entries removed.
    fn purge_expired(&self, cutoff: UnixTimestamp) -> usize;

    /// Returns the highest cutoff ever passed to
    /// [`purge_expired`](NonceLedger::purge_expired).
    fn watermark(&self) -> UnixTimestamp;

    /// Returns the number of nonces currently held.
    fn len(&self) -> usize;

    /// Returns `true` if no nonce is held.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// In-process ledger backed by a [`DashMap`]. Lost on restart.
#[derive(Debug, Default)]
pub struct InMemoryNonceLedger {
    nonces: DashMap<B256, UnixTimestamp>,
    watermark: AtomicU64,
}

impl InMemoryNonceLedger {
    /// Creates an empty ledger.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn below_watermark(&self, valid_before: UnixTimestamp) -> bool {
        valid_before.as_secs() < self.watermark.load(Ordering::SeqCst)
    }
}

impl NonceLedger for InMemoryNonceLedger {
    fn contains(&self, nonce: &B256, valid_before: UnixTimestamp) -> bool {
        self.below_watermark(valid_before) || self.nonces.contains_key(nonce)
    }

    fn consume(&self, nonce: B256, valid_before: UnixTimestamp) -> bool {
        // The entry holds the shard lock until it is dropped.
        let entry = self.nonces.entry(nonce);
        if self.below_watermark(valid_before) {
            return false;
        }
        match entry {
            Entry::Occupied(_) => false,
            Entry::Vacant(v) => {
                v.insert(valid_before);
                true
            }
        }
    }

    fn purge_expired(&self, cutoff: UnixTimestamp) -> usize {
        // Raised before the sweep so no consume can slip in below it.
        self.watermark.fetch_max(cutoff.as_secs(), Ordering::SeqCst);
        let before = self.nonces.len();
        self.nonces.retain(|_, valid_before| *valid_before >= cutoff);
        before.saturating_sub(self.nonces.len())
    }

    fn watermark(&self) -> UnixTimestamp {
        UnixTimestamp::from_secs(self.watermark.load(Ordering::SeqCst))
    }

    fn len(&self) -> usize {
        self.nonces.len()
    }
}
