// waitroom-api: Async Rust client for the virtual waiting room APIs (public, private, commerce)

pub mod commerce;
pub mod error;
mod http;
pub mod models;
pub mod private;
pub mod public;
pub mod transport;

pub use commerce::CommerceClient;
pub use error::Error;
pub use models::{QueueNumber, TokenSet};
pub use private::PrivateClient;
pub use public::PublicClient;
pub use transport::{TlsMode, TransportConfig};
