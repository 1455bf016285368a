pub mod advance_shipment_command;
pub mod create_shipment_command;

pub use advance_shipment_command::AdvanceShipmentCommand;
pub use create_shipment_command::CreateShipmentCommand;
