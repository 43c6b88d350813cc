pub mod frames;
pub mod session;

pub use crate::frames::{GenerateRequest, StreamFrame};
pub use crate::session::{GenerationSession, SessionEvent, SessionState, StreamError};
