pub mod assign_processing_command;
pub mod create_breakdown_command;
pub mod mark_processed_command;

pub use assign_processing_command::{AssignProcessingCommand, AssignProcessingResult};
pub use create_breakdown_command::{BreakdownLine, CreateBreakdownCommand};
pub use mark_processed_command::MarkProcessedCommand;
