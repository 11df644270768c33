//! Configuration, types, and shared structures for soundmon.
//!
//! This crate contains the shared vocabulary of the workspace: the semantic
//! groups, label scores, snapshots exposed to observers, the `Classifier`
//! seam and the TOML configuration.

pub mod config;
pub mod error;
pub mod frame;
pub mod group;
pub mod snapshot;
pub mod traits;
pub mod vocabulary;

pub use config::MonitorConfig;
pub use error::{ClassificationError, CoreError};
pub use frame::{ClassificationWindow, LabelScore};
pub use group::{Group, GroupTotals};
pub use snapshot::{LogEntry, MonitorEvent, MonitorSnapshot};
pub use traits::Classifier;
pub use vocabulary::Vocabulary;
