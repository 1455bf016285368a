// Procurement routing and order lifecycle
pub mod breakdown;
pub mod sales_orders;

// Purchasing
pub mod procurement;

// Warehouse: receiving, quality gate, outbound
pub mod inspections;
pub mod receiving;
pub mod shipments;
