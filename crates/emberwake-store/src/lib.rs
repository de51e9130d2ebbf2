//! Emberwake record store adapters.
//!
//! `MemoryRecordStore` keeps records in process memory; `PgRecordStore`
//! persists them in PostgreSQL. Both enforce per-record versions.

pub mod memory_record_store;
pub mod pg_record_store;

pub use memory_record_store::MemoryRecordStore;
pub use pg_record_store::PgRecordStore;
