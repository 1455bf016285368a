pub mod record_inspection_command;

pub use record_inspection_command::RecordInspectionCommand;
