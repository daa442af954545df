//! Data Module
//!
//! Access to the records table through the hosted database's REST interface.

pub mod client;
pub mod repository;

pub use client::{ClientHandle, SupabaseClient};
pub use repository::{RecordStore, SupabaseRecordsRepository};
