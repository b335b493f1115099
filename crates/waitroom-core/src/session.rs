// ── Admission session ──
//
// One user's trip through the waiting room: join, wait for a token, check
// out. Owns the admission store and the queue every write goes through.

use std::sync::Arc;

use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use waitroom_api::{CommerceClient, PublicClient};

use crate::config::SessionConfig;
use crate::error::CoreError;
use crate::model::{Receipt, RequestId, Token};
use crate::poller::{AdmissionPoller, CommerceApi, QueueApi, TickOutcome};
use crate::queue::{MutationQueue, MutationSender};
use crate::store::{AdmissionMutation, AdmissionPhase, AdmissionState, AdmissionStore};
use crate::stream::StateStream;

pub struct AdmissionSession<Q = PublicClient, C = CommerceClient> {
    store: AdmissionStore,
    queue: MutationQueue<AdmissionMutation>,
    poller: AdmissionPoller<Q>,
    commerce: Option<C>,
    cancel: CancellationToken,
}

impl AdmissionSession {
    /// Build the HTTP clients from `config` and start the mutation queue.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(config: SessionConfig) -> Result<Self, CoreError> {
        let transport = config.transport();
        let public = PublicClient::new(config.public_api.clone(), &transport)?;
        let commerce = config
            .commerce_api
            .clone()
            .map(|url| CommerceClient::new(url, &transport))
            .transpose()?;

        Ok(Self::with_apis(&config, public, commerce))
    }
}

impl<Q: QueueApi, C: CommerceApi> AdmissionSession<Q, C> {
    /// Start a session against arbitrary backends.
    pub fn with_apis(config: &SessionConfig, api: Q, commerce: Option<C>) -> Self {
        let store = AdmissionStore::new();
        // Nothing else can write yet, so the static fields go in directly.
        store.set_public_api_url(config.public_api.as_str());
        if let Some(url) = &config.commerce_api {
            store.set_commerce_api_url(url.as_str());
        }
        store.set_event_id(config.event_id.as_str());
        store.set_launch_query_parameters(config.launch_query_parameters.as_str());

        let cancel = CancellationToken::new();
        let queue = MutationQueue::spawn(Arc::clone(store.cell()), cancel.child_token());
        let poller = AdmissionPoller::new(api, &config.event_id, queue.sender(), config.poll);

        Self {
            store,
            queue,
            poller,
            commerce,
            cancel,
        }
    }

    /// Join the queue (no-op if already joined).
    pub async fn join(&self) -> Result<RequestId, CoreError> {
        self.poller.join().await
    }

    /// One poll cycle, for callers that drive their own loop.
    pub async fn poll(&self) -> Result<TickOutcome, CoreError> {
        self.poller.tick().await
    }

    /// Poll until a token is issued.
    ///
    /// Ends with [`CoreError::Expired`] when the backend says the position
    /// lapsed; the session stays in its last reported state and a new
    /// session is needed to queue again.
    pub async fn wait_for_token(&self) -> Result<Token, CoreError> {
        if !self.store.has_request_id() {
            return Err(CoreError::NotQueued {
                operation: "wait_for_token".into(),
            });
        }
        let token = self.poller.run(self.cancel.child_token()).await?;
        self.warn_on_violations();
        Ok(token)
    }

    /// Complete checkout on the protected site and record the receipt.
    pub async fn checkout(&self) -> Result<Receipt, CoreError> {
        let Some(token) = self.store.snapshot().token.clone() else {
            return Err(CoreError::NotAdmitted {
                operation: "checkout".into(),
            });
        };
        let commerce = self.commerce.as_ref().ok_or_else(|| CoreError::Config {
            message: "no commerce API configured".into(),
        })?;

        let receipt = commerce.checkout(&token).await?;
        self.sender()
            .apply(AdmissionMutation::SetReceipt(receipt.clone()))
            .await?;
        info!(receipt = %receipt, "checkout complete");
        self.warn_on_violations();
        Ok(receipt)
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn phase(&self) -> AdmissionPhase {
        self.store.phase()
    }

    pub fn snapshot(&self) -> Arc<AdmissionState> {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> StateStream<AdmissionState> {
        self.store.subscribe()
    }

    /// A producer handle for callers that feed their own mutations.
    pub fn sender(&self) -> MutationSender<AdmissionMutation> {
        self.queue.sender()
    }

    /// Stop polling and the mutation queue.
    pub async fn shutdown(self) {
        self.cancel.cancel();
        self.queue.shutdown().await;
    }

    fn warn_on_violations(&self) {
        for violation in self.store.snapshot().violations() {
            warn!(%violation, "admission state violates field invariants");
        }
    }
}
