//! Utility modules for tsync

pub mod poll;

pub use poll::poll_until;
