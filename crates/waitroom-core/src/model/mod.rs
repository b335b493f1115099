// ── Domain model ──
//
// Identity types shared by the admission state machine and the pollers,
// plus the `Derived` sentinel returned by every derived getter.

pub mod derived;
pub mod ids;

pub use derived::Derived;
pub use ids::{Receipt, RequestId, Token};
