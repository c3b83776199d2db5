//! Domain values shared by every tutor crate: configuration, classroom
//! enums, and the timetable model.

mod classroom;
mod config;
mod timetable;

pub use classroom::*;
pub use config::*;
pub use timetable::*;
