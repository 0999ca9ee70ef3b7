//! Session domain module

pub mod state;

pub use state::SessionState;
