pub mod record_receiving_command;

pub use record_receiving_command::{RecordReceivingCommand, RecordReceivingResult};
