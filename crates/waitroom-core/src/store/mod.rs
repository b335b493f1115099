// ── Reactive stores ──
//
// Two independent records: the operator-side capacity aggregator and the
// per-user admission state machine. Both sit in a `StateCell` and are
// written only through their mutation enums.

mod admission;
mod capacity;
mod cell;

pub use admission::{
    AdmissionMutation, AdmissionPhase, AdmissionState, AdmissionStore, InvariantViolation,
};
pub use capacity::{CapacityMutation, CapacityReport, CapacityState, CapacityStore};
pub use cell::{CellMeta, Mutation, StateCell};
