// ── Capacity monitor ──
//
// Operator view of an event: owns the capacity aggregator, its mutation
// queue and an optional background poller.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use waitroom_api::{PrivateClient, PublicClient};

use crate::config::MonitorConfig;
use crate::error::CoreError;
use crate::model::Derived;
use crate::poller::{BackendCounters, CapacityPoller, CounterApi};
use crate::queue::MutationQueue;
use crate::store::{CapacityMutation, CapacityReport, CapacityState, CapacityStore};
use crate::stream::StateStream;

pub struct CapacityMonitor<C = BackendCounters> {
    store: CapacityStore,
    queue: MutationQueue<CapacityMutation>,
    poller: Arc<CapacityPoller<C>>,
    cancel: CancellationToken,
    task: Mutex<Option<(CancellationToken, JoinHandle<()>)>>,
}

impl CapacityMonitor {
    /// Build the public and private clients from `config`.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn connect(config: MonitorConfig) -> Result<Self, CoreError> {
        let transport = config.transport();
        let counters = BackendCounters {
            public: PublicClient::new(config.public_api.clone(), &transport)?,
            private: PrivateClient::new(
                config.private_api.clone(),
                config.api_key.as_ref(),
                &transport,
            )?,
        };
        Ok(Self::with_api(&config, counters))
    }
}

impl<C: CounterApi + 'static> CapacityMonitor<C> {
    pub fn with_api(config: &MonitorConfig, api: C) -> Self {
        let store = CapacityStore::new();
        let cancel = CancellationToken::new();
        let queue = MutationQueue::spawn(Arc::clone(store.cell()), cancel.child_token());
        let poller = CapacityPoller::new(api, &config.event_id, queue.sender(), config.poll);

        Self {
            store,
            queue,
            poller: Arc::new(poller),
            cancel,
            task: Mutex::new(None),
        }
    }

    /// Poll every source once and apply the result.
    pub async fn refresh(&self) -> Result<CapacityReport, CoreError> {
        self.poller.poll_once().await
    }

    /// Let `n` more users in and refresh the counters.
    ///
    /// `n` must be positive; the backend would otherwise move the serving
    /// counter backwards.
    pub async fn increment_serving_counter(&self, n: i64) -> Result<CapacityReport, CoreError> {
        if n <= 0 {
            return Err(CoreError::ValidationFailed {
                message: format!("increment must be positive, got {n}"),
            });
        }
        self.poller.admit(n).await
    }

    /// Start background polling. Calling it again while running is a no-op.
    pub async fn start(&self) {
        let mut task = self.task.lock().await;
        if task.as_ref().is_some_and(|(_, handle)| !handle.is_finished()) {
            return;
        }

        let cancel = self.cancel.child_token();
        let poller = Arc::clone(&self.poller);
        let token = cancel.clone();
        let handle = tokio::spawn(async move {
            if let Err(e) = poller.run(token).await {
                warn!(error = %e, "capacity poller stopped");
            }
        });
        *task = Some((cancel, handle));
        debug!("capacity poller started");
    }

    /// Stop background polling and wait for the task to exit.
    pub async fn stop(&self) {
        if let Some((cancel, handle)) = self.task.lock().await.take() {
            cancel.cancel();
            let _ = handle.await;
            debug!("capacity poller stopped");
        }
    }

    pub async fn is_running(&self) -> bool {
        self.task
            .lock()
            .await
            .as_ref()
            .is_some_and(|(_, handle)| !handle.is_finished())
    }

    // ── Observation ──────────────────────────────────────────────────

    pub fn remaining_capacity(&self) -> Derived<i64> {
        self.store.remaining_capacity()
    }

    pub fn snapshot(&self) -> Arc<CapacityState> {
        self.store.snapshot()
    }

    pub fn subscribe(&self) -> StateStream<CapacityState> {
        self.store.subscribe()
    }

    pub fn last_changed(&self) -> Option<DateTime<Utc>> {
        self.store.last_changed()
    }

    /// Stop polling and the mutation queue.
    pub async fn shutdown(self) {
        self.stop().await;
        self.cancel.cancel();
        self.queue.shutdown().await;
    }
}
