//! Service layer between the commands and the library crates.
//!
//! Services run the work and return serializable results; commands only
//! choose how to print them.

pub mod blame;
pub mod changes;

pub use blame::{BlameReport, BlameService, EntryInfo};
pub use changes::{ChangesReport, ChangesService};
