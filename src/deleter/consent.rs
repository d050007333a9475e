//! Strongroom Media - Consent Based Deletion
//!
//! Newer platforms only delete shared media after the user approves a system
//! dialog. The request is launched here and the answer arrives later, on
//! whatever thread the host delivers lifecycle callbacks on. Only the
//! correlation token links the two.

use parking_lot::Mutex;

use super::{ConsentOutcome, CorrelationToken, Deleter, DeletionOutcome, OutcomeSender};
use crate::error::{VaultError, VaultResult};

/// Host side of the platform consent flow
pub trait ConsentPresenter: Send + Sync {
    /// Platform consent request (a pending intent on Android)
    type Request;

    /// Build one consent request covering all `uris`
    fn build_consent_request(&self, uris: &[String]) -> VaultResult<Self::Request>;

    /// Show the consent flow. The outcome must later be reported with the same
    /// `token`. An error means the flow could not be launched at all.
    fn present(&self, request: Self::Request, token: &CorrelationToken) -> VaultResult<()>;
}

/// The one request allowed to await consent
pub struct PendingDeletionRequest {
    uris: Vec<String>,
    token: CorrelationToken,
    sender: OutcomeSender,
}

impl PendingDeletionRequest {
    pub fn uris(&self) -> &[String] {
        &self.uris
    }

    pub fn token(&self) -> &CorrelationToken {
        &self.token
    }

    fn complete(self, result: VaultResult<()>) {
        if self.sender.send(result).is_err() {
            log::debug!("Delete caller went away before consent outcome {}", self.token);
        }
    }
}

/// Idle ⇄ AwaitingConsent state machine
pub struct ConsentDeleter<P> {
    presenter: P,
    pending: Mutex<Option<PendingDeletionRequest>>,
}

impl<P: ConsentPresenter> ConsentDeleter<P> {
    pub fn new(presenter: P) -> Self {
        Self {
            presenter,
            pending: Mutex::new(None),
        }
    }

    /// Token of the request awaiting consent, if any
    pub fn pending_token(&self) -> Option<CorrelationToken> {
        self.pending.lock().as_ref().map(|p| p.token.clone())
    }

    /// Clear the slot if it still belongs to `token`
    fn take_pending(&self, token: &CorrelationToken) -> Option<PendingDeletionRequest> {
        let mut slot = self.pending.lock();
        match slot.as_ref() {
            Some(pending) if pending.token == *token => slot.take(),
            _ => None,
        }
    }
}

impl<P: ConsentPresenter> Deleter for ConsentDeleter<P> {
    fn request(&self, references: Vec<String>) -> VaultResult<DeletionOutcome> {
        let token = CorrelationToken::new();
        let (sender, outcome) = DeletionOutcome::channel();

        {
            let mut slot = self.pending.lock();
            if slot.is_some() {
                return Err(VaultError::DeletionInProgress);
            }
            *slot = Some(PendingDeletionRequest {
                uris: references.clone(),
                token: token.clone(),
                sender,
            });
        }

        // The presenter runs unlocked; hosts may report the outcome before
        // `present` even returns.
        let request = match self.presenter.build_consent_request(&references) {
            Ok(request) => request,
            Err(e) => {
                self.take_pending(&token);
                return Err(e);
            }
        };

        log::debug!("Presenting delete consent {} for {} item(s)", token, references.len());
        if let Err(e) = self.presenter.present(request, &token) {
            let e = match e {
                VaultError::ConsentDispatch(_) => e,
                other => VaultError::ConsentDispatch(other.to_string()),
            };
            log::warn!("{}", e);
            if let Some(pending) = self.take_pending(&token) {
                pending.complete(Err(e));
            }
        }

        Ok(outcome)
    }

    fn on_consent_outcome(&self, token: &CorrelationToken, outcome: ConsentOutcome) -> bool {
        let Some(pending) = self.take_pending(token) else {
            log::debug!("Ignoring consent outcome for unknown token {}", token);
            return false;
        };

        log::info!("Delete consent {}: {:?}", token, outcome);
        pending.complete(match outcome {
            ConsentOutcome::Approved => Ok(()),
            ConsentOutcome::Denied => Err(VaultError::UserCancelledDeletion),
        });
        true
    }

    fn is_awaiting_consent(&self) -> bool {
        self.pending.lock().is_some()
    }

    fn shutdown(&self) {
        let abandoned = self.pending.lock().take();
        if let Some(pending) = abandoned {
            log::warn!("Abandoning delete request {} awaiting consent", pending.token);
            pending.complete(Err(VaultError::DeletionAbandoned));
        }
    }
}
