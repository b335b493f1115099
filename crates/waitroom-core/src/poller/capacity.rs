// ── Capacity poller ──
//
// Fetches the four operator counters concurrently and applies whatever
// subset answered. A source that failed keeps its previous value.

use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use super::CounterApi;
use crate::config::PollSettings;
use crate::error::CoreError;
use crate::queue::MutationSender;
use crate::store::{CapacityMutation, CapacityReport};

pub struct CapacityPoller<C> {
    api: C,
    event_id: String,
    sender: MutationSender<CapacityMutation>,
    poll: PollSettings,
}

/// Keep the value, or log the failure and remember it.
fn collect<T>(
    source: &'static str,
    result: Result<T, CoreError>,
    last_error: &mut Option<CoreError>,
) -> Option<T> {
    match result {
        Ok(v) => Some(v),
        Err(e) => {
            warn!(source, error = %e, "counter fetch failed");
            *last_error = Some(e);
            None
        }
    }
}

impl<C: CounterApi> CapacityPoller<C> {
    pub fn new(
        api: C,
        event_id: impl Into<String>,
        sender: MutationSender<CapacityMutation>,
        poll: PollSettings,
    ) -> Self {
        Self {
            api,
            event_id: event_id.into(),
            sender,
            poll,
        }
    }

    /// One refresh. Fails only when every source failed.
    pub async fn poll_once(&self) -> Result<CapacityReport, CoreError> {
        let event_id = self.event_id.as_str();
        let (serving, waiting, active, expired) = tokio::join!(
            self.api.serving_counter(event_id),
            self.api.waiting_room_size(event_id),
            self.api.active_tokens(event_id),
            self.api.expired_tokens(event_id),
        );

        let mut last_error = None;
        let report = CapacityReport {
            serving_counter: collect("serving_counter", serving, &mut last_error).flatten(),
            waiting_room_size: collect("waiting_room_size", waiting, &mut last_error),
            active_tokens: collect("active_tokens", active, &mut last_error),
            expired_tokens: collect("expired_tokens", expired, &mut last_error),
        };

        if report.is_empty() {
            if let Some(e) = last_error {
                return Err(e);
            }
        }

        for mutation in report.mutations() {
            self.sender.apply(mutation).await?;
        }
        debug!(?report, "capacity refreshed");
        Ok(report)
    }

    /// Let `by` more users in, then refresh so the advanced counter lands
    /// in the store through `setServingCounter`.
    pub async fn admit(&self, by: i64) -> Result<CapacityReport, CoreError> {
        let serving = self
            .api
            .increment_serving_counter(&self.event_id, by)
            .await?;
        info!(event_id = %self.event_id, by, serving, "serving counter advanced");
        self.poll_once().await
    }

    /// Refresh every interval until cancelled or sources keep failing.
    pub async fn run(&self, cancel: CancellationToken) -> Result<(), CoreError> {
        let mut interval = tokio::time::interval(self.poll.period());
        interval.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let mut failures = 0_u32;

        loop {
            tokio::select! {
                biased;
                () = cancel.cancelled() => return Ok(()),
                _ = interval.tick() => {}
            }

            match self.poll_once().await {
                Ok(_) => failures = 0,
                Err(e) if e.is_transient() && failures < self.poll.max_consecutive_failures => {
                    failures += 1;
                    warn!(error = %e, failures, "capacity poll failed, retrying");
                }
                Err(e) => return Err(e),
            }
        }
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicBool, AtomicI64, Ordering};
    use std::time::Duration;

    use super::*;
    use crate::model::Derived;
    use crate::queue::MutationQueue;
    use crate::store::{CapacityState, StateCell};

    struct FakeCounters {
        serving: AtomicI64,
        private_down: AtomicBool,
        public_down: AtomicBool,
    }

    impl FakeCounters {
        fn new(serving: i64) -> Self {
            Self {
                serving: AtomicI64::new(serving),
                private_down: AtomicBool::new(false),
                public_down: AtomicBool::new(false),
            }
        }
    }

    fn down() -> CoreError {
        CoreError::ConnectionFailed {
            url: "https://private.example.com".into(),
            reason: "connection refused".into(),
        }
    }

    impl CounterApi for FakeCounters {
        async fn serving_counter(&self, _event_id: &str) -> Result<Option<i64>, CoreError> {
            if self.public_down.load(Ordering::SeqCst) {
                return Err(down());
            }
            Ok(Some(self.serving.load(Ordering::SeqCst)))
        }

        async fn waiting_room_size(&self, _event_id: &str) -> Result<i64, CoreError> {
            if self.public_down.load(Ordering::SeqCst) {
                return Err(down());
            }
            Ok(20)
        }

        async fn active_tokens(&self, _event_id: &str) -> Result<i64, CoreError> {
            if self.private_down.load(Ordering::SeqCst) {
                return Err(down());
            }
            Ok(5)
        }

        async fn expired_tokens(&self, _event_id: &str) -> Result<i64, CoreError> {
            if self.private_down.load(Ordering::SeqCst) {
                return Err(down());
            }
            Ok(3)
        }

        async fn increment_serving_counter(
            &self,
            _event_id: &str,
            by: i64,
        ) -> Result<i64, CoreError> {
            if self.private_down.load(Ordering::SeqCst) {
                return Err(down());
            }
            Ok(self.serving.fetch_add(by, Ordering::SeqCst) + by)
        }
    }

    fn setup(
        api: FakeCounters,
    ) -> (
        CapacityPoller<FakeCounters>,
        Arc<StateCell<CapacityState>>,
        MutationQueue<CapacityMutation>,
    ) {
        let cell = Arc::new(StateCell::<CapacityState>::default());
        let queue = MutationQueue::spawn(Arc::clone(&cell), CancellationToken::new());
        let poll = PollSettings {
            interval: Duration::from_secs(5),
            max_consecutive_failures: 1,
        };
        let poller = CapacityPoller::new(api, "Sample", queue.sender(), poll);
        (poller, cell, queue)
    }

    #[tokio::test]
    async fn admit_refreshes_with_the_advanced_counter() {
        let (poller, cell, _queue) = setup(FakeCounters::new(100));
        let report = poller.admit(10).await.unwrap();
        assert_eq!(report.serving_counter, Some(110));
        assert_eq!(cell.read(CapacityState::remaining_capacity), Derived::Known(82));
    }

    #[tokio::test]
    async fn admit_failure_leaves_the_store_untouched() {
        let api = FakeCounters::new(100);
        api.private_down.store(true, Ordering::SeqCst);
        let (poller, cell, _queue) = setup(api);

        assert!(poller.admit(10).await.is_err());
        assert_eq!(*cell.snapshot(), CapacityState::default());
    }

    #[tokio::test]
    async fn full_refresh_yields_remaining_capacity() {
        let (poller, cell, _queue) = setup(FakeCounters::new(100));
        let report = poller.poll_once().await.unwrap();
        assert_eq!(report.active_tokens, Some(5));
        assert_eq!(cell.read(CapacityState::remaining_capacity), Derived::Known(72));
    }

    #[tokio::test]
    async fn failed_source_keeps_previous_value() {
        let (poller, cell, _queue) = setup(FakeCounters::new(100));
        poller.poll_once().await.unwrap();

        poller.api.private_down.store(true, Ordering::SeqCst);
        poller.api.serving.store(50, Ordering::SeqCst);
        let report = poller.poll_once().await.unwrap();
        assert_eq!(report.active_tokens, None);

        let s = cell.snapshot();
        assert_eq!(s.serving_counter, Some(50));
        assert_eq!(s.active_tokens, Some(5));
        assert_eq!(s.remaining_capacity(), Derived::Known(22));
    }

    #[tokio::test]
    async fn partial_first_refresh_stays_unknown() {
        let api = FakeCounters::new(100);
        api.private_down.store(true, Ordering::SeqCst);
        let (poller, cell, _queue) = setup(api);
        poller.poll_once().await.unwrap();
        assert_eq!(cell.read(CapacityState::remaining_capacity), Derived::Unknown);
    }

    #[tokio::test]
    async fn every_source_failing_is_an_error() {
        let api = FakeCounters::new(100);
        api.private_down.store(true, Ordering::SeqCst);
        api.public_down.store(true, Ordering::SeqCst);
        let (poller, cell, _queue) = setup(api);
        assert!(poller.poll_once().await.is_err());
        assert_eq!(cell.version(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn run_gives_up_after_repeated_outages() {
        let api = FakeCounters::new(100);
        api.private_down.store(true, Ordering::SeqCst);
        api.public_down.store(true, Ordering::SeqCst);
        let (poller, _cell, _queue) = setup(api);
        let err = poller.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CoreError::ConnectionFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn zero_interval_still_runs_on_a_schedule() {
        let api = FakeCounters::new(100);
        api.private_down.store(true, Ordering::SeqCst);
        api.public_down.store(true, Ordering::SeqCst);
        let cell = Arc::new(StateCell::<CapacityState>::default());
        let queue = MutationQueue::spawn(Arc::clone(&cell), CancellationToken::new());
        let poll = PollSettings {
            interval: Duration::ZERO,
            max_consecutive_failures: 1,
        };
        let poller = CapacityPoller::new(api, "Sample", queue.sender(), poll);

        let err = poller.run(CancellationToken::new()).await.unwrap_err();
        assert!(matches!(err, CoreError::ConnectionFailed { .. }));
    }

    #[tokio::test(start_paused = true)]
    async fn run_exits_cleanly_on_cancel() {
        let (poller, cell, _queue) = setup(FakeCounters::new(100));
        let cancel = CancellationToken::new();
        let stopper = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_secs(12)).await;
            stopper.cancel();
        });
        poller.run(cancel).await.unwrap();
        assert!(cell.read(CapacityState::is_complete));
    }
}
