mod command;
mod command_engine;
mod errors;
#[cfg(test)]
mod tests;

pub use command::{Command, Operation};
pub use command_engine::{CommandEngine, ReportRow, RunSummary};
pub use errors::CommandError;
