//! # Flash persistence
//!
//! All module state lives in one non-volatile region as a stream of
//! `(id, size, payload)` records closed by a fixed footer:
//!
//! - **PersistentRegion**: byte-addressable storage (`MemoryRegion`, `FileRegion`)
//! - **StateWriter / StateReader**: bounded cursors modules use for their payload
//! - **PersistenceEngine**: rate-limited save and validated load
//!
//! The footer's magic marker is written last and is the only proof a save
//! completed. Checksum or identity failures abort the load as a whole.

pub mod cursor;
pub mod engine;
pub mod layout;
pub mod region;

pub use cursor::{StateReader, StateWriter};
pub use engine::{FlashConfig, LoadOutcome, PersistenceEngine, SaveOutcome};
pub use layout::{Footer, FOOTER_LEN, MAGIC, RECORD_HEADER_LEN};
pub use region::{FileRegion, MemoryRegion, PersistentRegion};
