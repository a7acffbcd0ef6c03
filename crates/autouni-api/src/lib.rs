// autouni-api: Async Rust client for the AutoUni smart-building backend (REST + push channel)

pub mod error;
pub mod push;
pub mod rest;
pub mod session;
pub mod transport;

pub use error::Error;
pub use push::{ConnectionState, PushEvent, PushHandle, ReconnectConfig, TokenProvider};
pub use rest::ApiClient;
pub use session::{MemorySessionStore, Session, SessionEvent, SessionStore};
pub use transport::{TlsMode, TransportConfig};
