pub mod breakdown;
pub mod common;
pub mod health;
pub mod inspections;
pub mod purchase_orders;
pub mod receivings;
pub mod sales_orders;
pub mod shipments;

use crate::events::EventSender;
use crate::services::{
    breakdown::BreakdownService, inspections::InspectionService,
    procurement::ProcurementService, receiving::ReceivingService,
    sales_orders::SalesOrderService, shipments::ShipmentService,
};
use crate::store::RecordStore;
use std::sync::Arc;

// Re-export AppState so handler modules can import it as crate::handlers::AppState
pub use crate::AppState;

/// Services layer that encapsulates business logic used by HTTP handlers
#[derive(Clone)]
pub struct AppServices {
    pub sales_orders: Arc<SalesOrderService>,
    pub breakdown: Arc<BreakdownService>,
    pub procurement: Arc<ProcurementService>,
    pub receiving: Arc<ReceivingService>,
    pub inspections: Arc<InspectionService>,
    pub shipments: Arc<ShipmentService>,
}

impl AppServices {
    /// Builds every service over one record store and event channel.
    pub fn new(
        store: Arc<dyn RecordStore>,
        event_sender: Arc<EventSender>,
        default_currency: &str,
    ) -> Self {
        Self {
            sales_orders: Arc::new(SalesOrderService::new(
                store.clone(),
                event_sender.clone(),
                default_currency,
            )),
            breakdown: Arc::new(BreakdownService::new(store.clone(), event_sender.clone())),
            procurement: Arc::new(ProcurementService::new(
                store.clone(),
                event_sender.clone(),
                default_currency,
            )),
            receiving: Arc::new(ReceivingService::new(store.clone(), event_sender.clone())),
            inspections: Arc::new(InspectionService::new(store.clone(), event_sender.clone())),
            shipments: Arc::new(ShipmentService::new(store, event_sender)),
        }
    }
}
