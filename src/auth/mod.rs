pub mod gate;
pub mod keys;
pub mod store;

pub use gate::{AuthDecision, AuthGate, DenyReason};
pub use keys::KeyValidator;
pub use store::{ConnectionToken, Session, SessionStore};
