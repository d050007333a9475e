//! Strongroom Media - Deletion Coordinator
//!
//! Removes originals from the shared media store once they are safely in the
//! vault. How that happens depends on the platform:
//!
//! ```text
//! ┌──────────────────────┐   Legacy            ┌──────────────────────────┐
//! │  DeletionCoordinator │ ──────────────────▶ │ LegacyDeleter            │
//! │  (capability fixed   │                     │ resolve → delete, worker │
//! │   at construction)   │   ConsentRequired   ├──────────────────────────┤
//! │                      │ ──────────────────▶ │ ConsentDeleter           │
//! └──────────────────────┘                     │ Idle ⇄ AwaitingConsent   │
//!                                              └──────────────────────────┘
//! ```

pub mod consent;
pub mod legacy;

use std::fmt;
use std::future::Future;
use std::pin::Pin;
use std::str::FromStr;
use std::sync::Arc;
use std::task::{Context, Poll};

use tokio::runtime::Handle;
use tokio::sync::oneshot;
use uuid::Uuid;

use crate::error::{VaultError, VaultResult};
use crate::media::MediaIdentityResolver;

pub use consent::{ConsentDeleter, ConsentPresenter, PendingDeletionRequest};
pub use legacy::LegacyDeleter;

/// First platform API level where bulk deletes need user consent
pub const CONSENT_SDK_LEVEL: u32 = 30;

/// Android `Activity.RESULT_OK`
const RESULT_OK: i32 = -1;

// ═══════════════════════════════════════════════════════════════════════════
// PLATFORM CAPABILITY
// ═══════════════════════════════════════════════════════════════════════════

/// How the platform lets apps delete shared media
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PlatformCapability {
    /// Apps delete index rows directly
    Legacy,
    /// Bulk deletes go through a user consent flow
    ConsentRequired,
}

impl PlatformCapability {
    pub fn from_sdk_level(sdk_level: u32) -> Self {
        if sdk_level >= CONSENT_SDK_LEVEL {
            PlatformCapability::ConsentRequired
        } else {
            PlatformCapability::Legacy
        }
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// CORRELATION
// ═══════════════════════════════════════════════════════════════════════════

/// Ties a consent outcome to the request that asked for it
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CorrelationToken(Uuid);

impl CorrelationToken {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CorrelationToken {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for CorrelationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for CorrelationToken {
    type Err = VaultError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s)
            .map(Self)
            .map_err(|e| VaultError::InvalidArgument(format!("bad correlation token {:?}: {}", s, e)))
    }
}

/// What the user decided in the consent flow
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConsentOutcome {
    Approved,
    Denied,
}

impl ConsentOutcome {
    pub fn from_approved(approved: bool) -> Self {
        if approved {
            ConsentOutcome::Approved
        } else {
            ConsentOutcome::Denied
        }
    }

    /// Map an activity result code; anything but `RESULT_OK` is a refusal
    pub fn from_result_code(code: i32) -> Self {
        Self::from_approved(code == RESULT_OK)
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// OUTCOME
// ═══════════════════════════════════════════════════════════════════════════

type OutcomeSender = oneshot::Sender<VaultResult<()>>;

/// Eventual result of a deletion request.
///
/// Resolves when the worker finishes (legacy) or when the matching consent
/// outcome arrives. If the coordinator goes away first it resolves to
/// [`VaultError::DeletionAbandoned`].
#[must_use = "the deletion result is only observable through the outcome"]
pub struct DeletionOutcome {
    rx: oneshot::Receiver<VaultResult<()>>,
    /// Result already pulled off the channel by `try_result`
    received: Option<VaultResult<()>>,
}

impl DeletionOutcome {
    pub(crate) fn channel() -> (OutcomeSender, Self) {
        let (tx, rx) = oneshot::channel();
        (tx, Self { rx, received: None })
    }

    /// Peek at the result if it is already known.
    ///
    /// The result is kept, so the outcome can still be awaited afterwards.
    pub fn try_result(&mut self) -> Option<&VaultResult<()>> {
        if self.received.is_none() {
            self.received = match self.rx.try_recv() {
                Ok(result) => Some(result),
                Err(oneshot::error::TryRecvError::Empty) => None,
                Err(oneshot::error::TryRecvError::Closed) => Some(Err(VaultError::DeletionAbandoned)),
            };
        }
        self.received.as_ref()
    }
}

impl Future for DeletionOutcome {
    type Output = VaultResult<()>;

    fn poll(mut self: Pin<&mut Self>, cx: &mut Context<'_>) -> Poll<Self::Output> {
        if let Some(result) = self.received.take() {
            return Poll::Ready(result);
        }
        Pin::new(&mut self.rx)
            .poll(cx)
            .map(|received| received.unwrap_or(Err(VaultError::DeletionAbandoned)))
    }
}

// ═══════════════════════════════════════════════════════════════════════════
// STRATEGY
// ═══════════════════════════════════════════════════════════════════════════

/// One way of deleting media. The coordinator has already checked that
/// `references` is non-empty.
pub trait Deleter: Send + Sync {
    fn request(&self, references: Vec<String>) -> VaultResult<DeletionOutcome>;

    /// Deliver a consent outcome. Returns whether it matched a pending request.
    fn on_consent_outcome(&self, _token: &CorrelationToken, _outcome: ConsentOutcome) -> bool {
        false
    }

    fn is_awaiting_consent(&self) -> bool {
        false
    }

    /// Fail whatever is still waiting
    fn shutdown(&self) {}
}

// ═══════════════════════════════════════════════════════════════════════════
// COORDINATOR
// ═══════════════════════════════════════════════════════════════════════════

/// Entry point for deleting shared media
pub struct DeletionCoordinator {
    capability: PlatformCapability,
    deleter: Box<dyn Deleter>,
}

impl DeletionCoordinator {
    /// Pick the strategy for `capability` once, up front
    pub fn for_capability<P: ConsentPresenter + 'static>(
        capability: PlatformCapability,
        resolver: Arc<MediaIdentityResolver>,
        presenter: P,
        runtime: Handle,
    ) -> Self {
        match capability {
            PlatformCapability::Legacy => Self::legacy(resolver, runtime),
            PlatformCapability::ConsentRequired => Self::consent(presenter),
        }
    }

    pub fn legacy(resolver: Arc<MediaIdentityResolver>, runtime: Handle) -> Self {
        Self {
            capability: PlatformCapability::Legacy,
            deleter: Box::new(LegacyDeleter::new(resolver, runtime)),
        }
    }

    pub fn consent<P: ConsentPresenter + 'static>(presenter: P) -> Self {
        Self {
            capability: PlatformCapability::ConsentRequired,
            deleter: Box::new(ConsentDeleter::new(presenter)),
        }
    }

    pub fn capability(&self) -> PlatformCapability {
        self.capability
    }

    /// Ask for `references` to be deleted, in order.
    ///
    /// Fails immediately with `InvalidArgument` for an empty batch and with
    /// `DeletionInProgress` while a consent request is outstanding.
    pub fn request_deletion(&self, references: Vec<String>) -> VaultResult<DeletionOutcome> {
        if references.is_empty() {
            return Err(VaultError::InvalidArgument(
                "Need at least one URI to delete".into(),
            ));
        }
        log::info!(
            "Deleting {} media item(s) via {:?} path",
            references.len(),
            self.capability
        );
        self.deleter.request(references)
    }

    /// Platform callback carrying the user's consent decision
    pub fn on_consent_outcome(&self, token: &CorrelationToken, outcome: ConsentOutcome) -> bool {
        self.deleter.on_consent_outcome(token, outcome)
    }

    pub fn is_awaiting_consent(&self) -> bool {
        self.deleter.is_awaiting_consent()
    }

    /// Tear down; a request still awaiting consent fails with `DeletionAbandoned`
    pub fn shutdown(&self) {
        self.deleter.shutdown();
    }
}

impl Drop for DeletionCoordinator {
    fn drop(&mut self) {
        self.deleter.shutdown();
    }
}
