// waitroom-core: Admission state machine and capacity aggregation between
// waitroom-api and consumers (CLI).
//
// Both records live in a reactive `StateCell`; every write is a typed
// mutation applied by a single dispatcher, and every derived value is
// recomputed on read.

pub mod config;
pub mod error;
pub mod model;
pub mod monitor;
pub mod poller;
pub mod queue;
pub mod session;
pub mod store;
pub mod stream;

// ── Primary re-exports ──────────────────────────────────────────────
pub use config::{MonitorConfig, PollSettings, SessionConfig, TlsVerification};
pub use error::CoreError;
pub use model::{Derived, Receipt, RequestId, Token};
pub use monitor::CapacityMonitor;
pub use poller::{
    AdmissionPoller, BackendCounters, CapacityPoller, CommerceApi, CounterApi, QueueApi,
    TickOutcome,
};
pub use queue::{MutationQueue, MutationSender};
pub use session::AdmissionSession;
pub use store::{
    AdmissionMutation, AdmissionPhase, AdmissionState, AdmissionStore, CapacityMutation,
    CapacityReport, CapacityState, CapacityStore, InvariantViolation, Mutation, StateCell,
};
pub use stream::{StateStream, StateWatchStream};
