pub mod command;
pub mod deps;
pub mod error;
pub mod event;
pub mod formatter;
pub mod fs;
pub mod job;
pub mod pipeline;
pub mod process;
pub mod progress;
pub mod time;

