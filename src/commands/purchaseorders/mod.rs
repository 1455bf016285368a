pub mod advance_purchase_order_command;
pub mod create_replenishment_order_command;

pub use advance_purchase_order_command::AdvancePurchaseOrderCommand;
pub use create_replenishment_order_command::CreateReplenishmentOrderCommand;
