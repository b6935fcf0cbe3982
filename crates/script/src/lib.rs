//! Standard script templates and signed-message verification.

pub mod message;
mod secp;
pub mod standard;
