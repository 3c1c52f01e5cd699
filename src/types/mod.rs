//! Core types shared by the policy gate and the record store.

pub mod level;
pub mod path;
pub mod record;

pub use level::{LevelId, UserIdentity};
pub use path::PathPrefix;
pub use record::{GeoRecord, RecordFilter, RecordPatch, is_usable_coordinate};
