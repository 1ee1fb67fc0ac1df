//! mdmq Server Library
//!
//! Server-side command engine of an MDM control channel:
//! - Per-device ordered command queue with retained command metadata
//! - Acknowledgment dispatch by original request type
//! - Full-replace reconciliation of device attributes, applications and
//!   certificates
//! - `DeviceConfigured` follow-up for devices awaiting configuration
//! - `SQLite` storage implementing every store contract

pub mod connect;
pub mod dispatch;
pub mod protocol;
pub mod storage;
pub mod store;

pub use connect::{ConnectService, Reply};
pub use dispatch::{AckDispatcher, DispatchError, Stage};
