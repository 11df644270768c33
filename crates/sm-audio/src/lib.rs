// Streaming core of soundmon: loudness, windowing, group scoring,
// status smoothing, alerting, and the threads that drive them.

pub mod alert;
pub mod capture;
pub mod error;
pub mod event_log;
pub mod loudness;
pub mod monitor;
pub mod scorer;
pub mod stabilizer;
pub mod state;
pub mod subprocess;
pub mod window;

pub use monitor::Monitor;
pub use state::{MonitorHandle, SampleSource, spawn_monitor};
