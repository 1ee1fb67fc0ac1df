//! `SQLite` storage for mdmq.
//!
//! Provides persistence for devices, the per-device command queue with its
//! command metadata, and application/certificate inventory.

mod db;
mod models;
mod queries_commands;
mod queries_devices;
mod queries_inventory;
mod stores;


pub use db::{DatabaseError, MdmDatabase};
pub use models::*;
