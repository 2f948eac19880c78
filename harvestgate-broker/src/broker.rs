// harvestgate-broker/src/broker.rs
// ============================================================================
// Module: Channel broker
// Description: Fire-and-forget run-execution broker (spec §6 "Broker
//              contract"), backed by a `std::sync::mpsc` channel.
// Purpose: Decouple `Orchestrator::execute_run` callers from the worker
//          loop that actually drains run ids (spec §5 "the run loop is
//          driven by external workers that pull run identifiers from a
//          broker").
// Dependencies: harvestgate-core, std::sync::mpsc
// ============================================================================

//! ## Overview
//! [`ChannelBroker::enqueue`] is the producer half of the contract: it never
//! blocks waiting for a run to finish, matching spec §6 ("`enqueue` is
//! fire-and-forget"). [`ChannelBroker::receiver`] hands the consumer half to
//! a worker loop (see `harvestgate-cli`), which calls
//! `Orchestrator::execute_run` for every id it receives — including the
//! re-enqueue that happens out of band when a Run resumes from
//! `waiting_for_human` (spec §6: "On resuming ..., the orchestrator is
//! re-enqueued via the same interface").

use std::sync::Arc;
use std::sync::Mutex;
use std::sync::mpsc;

use harvestgate_core::RunId;
use harvestgate_core::interfaces::Broker;
use harvestgate_core::interfaces::BrokerError;
use thiserror::Error;

/// Errors constructing or draining a [`ChannelBroker`].
#[derive(Debug, Error)]
pub enum ChannelBrokerError {
    /// The receiving half has already been taken by another worker.
    #[error("broker receiver already taken")]
    ReceiverAlreadyTaken,
}

/// An in-process, channel-backed [`Broker`].
///
/// Cheaply `Clone`-able: every clone shares the same underlying sender, so
/// any number of callers (including the orchestrator itself, re-enqueuing a
/// resumed Run) can enqueue without coordinating with each other. The
/// receiving half is taken exactly once, by whichever worker loop drains the
/// queue.
#[derive(Clone)]
pub struct ChannelBroker {
    sender: mpsc::Sender<RunId>,
    receiver: Arc<Mutex<Option<mpsc::Receiver<RunId>>>>,
}

impl ChannelBroker {
    /// Builds a fresh broker with an empty queue.
    #[must_use]
    pub fn new() -> Self {
        let (sender, receiver) = mpsc::channel();
        Self {
            sender,
            receiver: Arc::new(Mutex::new(Some(receiver))),
        }
    }

    /// Takes the receiving half, for a worker loop to drain.
    ///
    /// # Errors
    ///
    /// Returns [`ChannelBrokerError::ReceiverAlreadyTaken`] if another
    /// worker already took it; only one drainer may exist at a time.
    ///
    /// # Panics
    ///
    /// Panics if the receiver mutex is poisoned by a prior panic elsewhere
    /// in the process.
    pub fn receiver(&self) -> Result<mpsc::Receiver<RunId>, ChannelBrokerError> {
        #[allow(clippy::unwrap_used, reason = "a poisoned broker mutex means a prior panic already corrupted process state; there is no safe recovery")]
        self.receiver.lock().unwrap().take().ok_or(ChannelBrokerError::ReceiverAlreadyTaken)
    }
}

impl Default for ChannelBroker {
    fn default() -> Self {
        Self::new()
    }
}

impl Broker for ChannelBroker {
    fn enqueue(&self, run_id: RunId) -> Result<(), BrokerError> {
        self.sender.send(run_id).map_err(|err| BrokerError::Unavailable(err.to_string()))
    }
}
