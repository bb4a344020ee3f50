//! Reader-side session handling for OTP gated report access.

pub mod api;
pub mod session;
pub mod storage;

pub use api::{ApiError, HttpReadAccessApi, ReadAccessApi};
pub use session::{SessionController, SessionState};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StoredSession};
