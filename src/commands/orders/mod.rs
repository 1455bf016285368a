pub mod advance_sales_order_command;
pub mod create_sales_order_command;
pub mod route_order_command;

// Re-export commands for easier access
pub use advance_sales_order_command::AdvanceSalesOrderCommand;
pub use create_sales_order_command::CreateSalesOrderCommand;
pub use route_order_command::{RouteOrderCommand, RouteOrderResult, RoutingStrategy};
