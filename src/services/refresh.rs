// SPDX-License-Identifier: MIT
// Copyright 2026 Roland Dreier <roland@rolandd.dev>

//! Single-flight coordination of access-token refresh.
//!
//! At most one refresh cycle runs at a time. Requests that hit an
//! authorization failure while a cycle is running queue a waiter and are
//! released together, in one batch, with that cycle's outcome.

use crate::error::ApiError;
use std::sync::{Mutex, MutexGuard};
use tokio::sync::oneshot;

/// New access token, or the error every queued request fails with.
pub type RefreshOutcome = Result<String, ApiError>;

/// What a request that just got a 401 should do next.
pub enum RefreshTicket<'a> {
    /// Run the refresh, then hand the outcome to the lease.
    Leader(RefreshLease<'a>),
    /// Another request is refreshing; await its outcome.
    Waiter(oneshot::Receiver<RefreshOutcome>),
    /// A cycle finished after this request was sent; use the stored token.
    AlreadyRefreshed,
}

#[derive(Default)]
struct RefreshState {
    in_progress: bool,
    /// Completed cycles, successful or not.
    generation: u64,
    pending: Vec<oneshot::Sender<RefreshOutcome>>,
}

/// Refresh state owned by one API client.
#[derive(Default)]
pub struct RefreshCoordinator {
    state: Mutex<RefreshState>,
}

impl RefreshCoordinator {
    pub fn new() -> Self {
        Self::default()
    }

    /// Cycle counter to record before sending a request.
    pub fn generation(&self) -> u64 {
        self.lock().generation
    }

    pub fn is_refreshing(&self) -> bool {
        self.lock().in_progress
    }

    /// Number of requests currently queued behind the running refresh.
    pub fn pending(&self) -> usize {
        self.lock().pending.len()
    }

    /// Join the refresh protocol after an authorization failure.
    ///
    /// `seen_generation` is the value of [`generation`](Self::generation)
    /// observed before the failing request was sent.
    pub fn enter(&self, seen_generation: u64) -> RefreshTicket<'_> {
        let mut state = self.lock();

        if state.in_progress {
            let (tx, rx) = oneshot::channel();
            state.pending.push(tx);
            return RefreshTicket::Waiter(rx);
        }

        if state.generation != seen_generation {
            return RefreshTicket::AlreadyRefreshed;
        }

        state.in_progress = true;
        RefreshTicket::Leader(RefreshLease {
            coordinator: self,
            completed: false,
        })
    }

    fn release(&self, outcome: &RefreshOutcome) -> usize {
        let pending = {
            let mut state = self.lock();
            state.in_progress = false;
            state.generation += 1;
            std::mem::take(&mut state.pending)
        };

        let released = pending.len();
        for waiter in pending {
            // A waiter whose caller went away is fine to skip.
            let _ = waiter.send(outcome.clone());
        }
        released
    }

    fn lock(&self) -> MutexGuard<'_, RefreshState> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

/// Held by the request that performs the refresh.
///
/// Dropping it without [`complete`](Self::complete) (the leader was
/// cancelled) still ends the cycle, failing the queued requests.
pub struct RefreshLease<'a> {
    coordinator: &'a RefreshCoordinator,
    completed: bool,
}

impl RefreshLease<'_> {
    /// End the cycle and release every queued request with `outcome`.
    /// Returns how many were released.
    pub fn complete(mut self, outcome: &RefreshOutcome) -> usize {
        self.completed = true;
        self.coordinator.release(outcome)
    }
}

impl Drop for RefreshLease<'_> {
    fn drop(&mut self) {
        if !self.completed {
            tracing::warn!("Token refresh abandoned before completion");
            self.coordinator.release(&Err(ApiError::Network(
                "Token refresh was cancelled".to_string(),
            )));
        }
    }
}
