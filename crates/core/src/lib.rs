//! Rota Core Library
//!
//! Models, scheduling logic, the exchange/chain-reassignment engine, and
//! SQLite storage for the Rota slot-coordination platform.

pub mod engine;
pub mod error;
pub mod invariants;
pub mod models;
pub mod schedule;
pub mod storage;
pub mod time;

pub use engine::{CreateRequestInput, Engine, EngineConfig};
pub use error::{Error, Result};
pub use models::*;
pub use schedule::{schedule_by_day, Interval, ScheduleByDay};
pub use storage::{Database, RoomStore, VersionedRoom};
pub use time::{to_minutes, to_time_string, DayLabels, Weekday};
