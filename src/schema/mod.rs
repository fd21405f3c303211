//! Table schema: canonical columns, versioned migrations, and the file codec.
//!
//! Files written by older versions of the store are migrated on read; the
//! store always writes the canonical layout.

mod codec;
pub mod columns;
mod manager;

pub use codec::{parse, render, RawTable};
pub use manager::{SchemaManager, SchemaVersion};
