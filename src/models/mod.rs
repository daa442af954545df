//! Models Module
//!
//! Request and response types of the records API.

pub mod records;

pub use records::{
    DeleteResponse, ListParams, PageMeta, PaginatedRecords, Record, RecordCreate, RecordUpdate,
    SortDirection, SortField,
};
