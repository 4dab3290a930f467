//! # helpq
//!
//! Queue state machine and statistics engine for office-hours / lab help
//! queues. Students join a named queue, staff pull them off the line to
//! help them, and every visit becomes a historical record feeding
//! daily/weekly/overall statistics and per-student history.
//!
//! The engine enforces the entry lifecycle (waiting -> being_helped ->
//! removed), derives ordering and position on every read, and publishes
//! change events for a push transport to fan out.

pub mod config;
pub mod db;
pub mod engine;
pub mod error;
pub mod event;
pub mod model;
pub mod stats;
pub mod telemetry;
