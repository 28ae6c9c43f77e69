//! Placeholders for names that are referenced before they are declared.

use crate::resource::{Failure, Settlement};
use futures::FutureExt;
use tokio::sync::oneshot;
use tracing::debug;

/// How a slot is finally resolved.
enum Resolution {
    /// Follow the declared resource's own settlement.
    Chain(Settlement),
    Fail(Failure),
}

/// A deferred value for a name with outstanding references and no declaration.
///
/// The slot owns both halves of a one-shot channel: the receiver is folded into
/// the shared [`Settlement`] handed to every requester, the sender is the
/// settle/fail capability. Both [`settle`](Self::settle) and
/// [`fail`](Self::fail) consume the slot, so it resolves at most once.
///
/// A slot that is dropped without being resolved leaves its settlement pending
/// forever, exactly like a name that is never declared.
pub struct PendingSlot {
    name: String,
    resolver: oneshot::Sender<Resolution>,
    settlement: Settlement,
}

impl PendingSlot {
    pub fn new(name: impl Into<String>) -> Self {
        let (resolver, resolution) = oneshot::channel();
        let settlement = async move {
            match resolution.await {
                Ok(Resolution::Chain(settlement)) => settlement.await,
                Ok(Resolution::Fail(failure)) => Err(failure),
                Err(_) => futures::future::pending().await,
            }
        }
        .boxed()
        .shared();

        Self {
            name: name.into(),
            resolver,
            settlement,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// The future every requester of this name shares.
    pub fn settlement(&self) -> Settlement {
        self.settlement.clone()
    }

    /// Chains the slot onto a declared resource's settlement.
    pub fn settle(self, settlement: Settlement) {
        debug!(resource = %self.name, "Pending slot settled");
        // Nobody polling the slot any more is fine; the resource still settles.
        let _ = self.resolver.send(Resolution::Chain(settlement));
    }

    /// Fails every requester of this name.
    pub fn fail(self, failure: Failure) {
        debug!(resource = %self.name, error = %failure, "Pending slot failed");
        let _ = self.resolver.send(Resolution::Fail(failure));
    }
}
