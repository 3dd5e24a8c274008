//! Per-asset compile cache with single-flight compilation.
//!
//! One slot per variant (locale, or `""` for locale-neutral assets):
//!
//! ```text
//! Slot
//! ├── artifact   ArcSwapOption   lock-free reads, atomic replacement
//! ├── inflight   Mutex<fingerprint → waiters>
//! └── installed  ticket of the installed artifact
//! ```
//!
//! The first request for a stale fingerprint becomes the leader and runs
//! the compile; later requests for the same fingerprint park on a channel
//! and receive the leader's result. The leader installs the artifact and
//! removes its in-flight entry under the same lock, so a late request sees
//! either the entry or the new artifact.

use std::collections::hash_map::Entry;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use arc_swap::ArcSwapOption;
use crossbeam::channel::{self, Receiver, Sender};
use dashmap::DashMap;
use parking_lot::Mutex;
use rustc_hash::FxHashMap;

use super::CompiledArtifact;
use crate::error::CompileError;
use crate::freshness::ContentHash;

pub type CompileResult = Result<Arc<CompiledArtifact>, CompileError>;

type Waiter = Sender<CompileResult>;

#[derive(Default)]
struct Slot {
    artifact: ArcSwapOption<CompiledArtifact>,
    inflight: Mutex<FxHashMap<ContentHash, Vec<Waiter>>>,
    /// Compile tickets, handed out in start order.
    tickets: AtomicU64,
    /// Ticket of the installed artifact. Guarded by `inflight`.
    installed: AtomicU64,
    generation: AtomicU64,
}

impl Slot {
    fn fresh(&self, fingerprint: ContentHash) -> Option<Arc<CompiledArtifact>> {
        self.artifact
            .load_full()
            .filter(|a| a.source_fingerprint() == fingerprint)
    }
}

enum Role {
    Leader(u64),
    Follower(Receiver<CompileResult>),
}

#[derive(Default)]
pub struct CompileCache {
    slots: DashMap<String, Arc<Slot>>,
}

impl CompileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Installed artifact for a variant, fresh or not.
    pub fn current(&self, variant: &str) -> Option<Arc<CompiledArtifact>> {
        self.slots.get(variant)?.artifact.load_full()
    }

    /// Variants with an installed artifact.
    pub fn variants(&self) -> Vec<String> {
        let mut variants: Vec<_> = self
            .slots
            .iter()
            .filter(|slot| slot.artifact.load().is_some())
            .map(|slot| slot.key().clone())
            .collect();
        variants.sort();
        variants
    }

    /// Return the artifact for `fingerprint`, compiling at most once per
    /// fingerprint no matter how many callers arrive concurrently.
    ///
    /// On failure the previously installed artifact stays in place.
    pub fn get_or_compile<F>(&self, variant: &str, fingerprint: ContentHash, compile: F) -> CompileResult
    where
        F: FnOnce() -> Result<Vec<u8>, CompileError>,
    {
        let slot = self.slot(variant);

        if let Some(artifact) = slot.fresh(fingerprint) {
            return Ok(artifact);
        }

        let ticket = match Self::join(&slot, fingerprint) {
            Ok(artifact) => return Ok(artifact),
            Err(Role::Follower(rx)) => {
                return rx
                    .recv()
                    .unwrap_or_else(|_| Err(CompileError::Abandoned(variant.to_string())));
            }
            Err(Role::Leader(ticket)) => ticket,
        };

        let mut flight = Flight {
            slot: &slot,
            fingerprint,
            landed: false,
        };
        let built = compile().map(|output| {
            let generation = slot.generation.fetch_add(1, Ordering::SeqCst) + 1;
            CompiledArtifact::new(output, fingerprint, generation)
        });
        flight.land(ticket, built)
    }

    fn slot(&self, variant: &str) -> Arc<Slot> {
        if let Some(slot) = self.slots.get(variant) {
            return Arc::clone(&slot);
        }
        Arc::clone(&self.slots.entry(variant.to_string()).or_default())
    }

    /// Either a fresh artifact (installed while we waited for the lock)
    /// or our role in the flight for `fingerprint`.
    fn join(slot: &Slot, fingerprint: ContentHash) -> Result<Arc<CompiledArtifact>, Role> {
        let mut inflight = slot.inflight.lock();
        if let Some(artifact) = slot.fresh(fingerprint) {
            return Ok(artifact);
        }
        match inflight.entry(fingerprint) {
            Entry::Occupied(mut e) => {
                let (tx, rx) = channel::bounded(1);
                e.get_mut().push(tx);
                Err(Role::Follower(rx))
            }
            Entry::Vacant(e) => {
                e.insert(Vec::new());
                Err(Role::Leader(slot.tickets.fetch_add(1, Ordering::SeqCst) + 1))
            }
        }
    }
}

/// A leader's in-flight compile. Dropping it without landing (panic in a
/// processor) removes the entry, which disconnects every follower.
struct Flight<'a> {
    slot: &'a Slot,
    fingerprint: ContentHash,
    landed: bool,
}

impl Flight<'_> {
    fn land(&mut self, ticket: u64, built: Result<CompiledArtifact, CompileError>) -> CompileResult {
        let (result, waiters) = {
            let mut inflight = self.slot.inflight.lock();
            let result: CompileResult =
                built.map(|artifact| Arc::new(artifact.after(self.slot.artifact.load().as_deref())));
            // A compile that started later may have landed first; keep it.
            if let Ok(artifact) = &result
                && ticket > self.slot.installed.load(Ordering::SeqCst)
            {
                self.slot.artifact.store(Some(Arc::clone(artifact)));
                self.slot.installed.store(ticket, Ordering::SeqCst);
            }
            (result, inflight.remove(&self.fingerprint).unwrap_or_default())
        };
        self.landed = true;
        for waiter in waiters {
            let _ = waiter.send(result.clone());
        }
        result
    }
}

impl Drop for Flight<'_> {
    fn drop(&mut self) {
        if !self.landed {
            self.slot.inflight.lock().remove(&self.fingerprint);
        }
    }
}
