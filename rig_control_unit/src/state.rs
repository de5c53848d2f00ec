//! Cross-component machine state.

pub mod shared;

pub use shared::SharedState;
