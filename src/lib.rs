//! Order fulfillment pipeline
//!
//! Carries a customer order from an approved quotation through routing,
//! per item code breakdown, purchasing, receiving, quality inspection and
//! delivery, and completes the order once every unit is accounted for.
#![forbid(unsafe_code)]
#![deny(rust_2018_idioms)]
#![allow(elided_lifetimes_in_paths)]
#![warn(clippy::all, clippy::perf, clippy::dbg_macro)]

// Core modules
pub mod commands;
pub mod config;
pub mod db;
pub mod entities;
pub mod errors;
pub mod events;
pub mod handlers;
pub mod migrator;
pub mod models;
pub mod openapi;
pub mod repositories;
pub mod services;
pub mod store;

use axum::{
    response::Json,
    routing::{get, post, put},
    Router,
};
use chrono::Utc;
use serde::Serialize;
use std::sync::Arc;
use utoipa::ToSchema;

use crate::{events::EventSender, handlers::AppServices, store::RecordStore};

// App state definition
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn RecordStore>,
    pub config: config::AppConfig,
    pub event_sender: Arc<EventSender>,
    pub services: AppServices,
}

impl AppState {
    /// Wires every service over `store`.
    pub fn new(
        store: Arc<dyn RecordStore>,
        config: config::AppConfig,
        event_sender: Arc<EventSender>,
    ) -> Self {
        let services = AppServices::new(
            store.clone(),
            event_sender.clone(),
            &config.default_currency,
        );
        Self {
            store,
            config,
            event_sender,
            services,
        }
    }
}

// Common response wrappers
#[derive(Serialize, ToSchema)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub message: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub meta: Option<ResponseMeta>,
}

#[derive(Serialize, ToSchema)]
pub struct ResponseMeta {
    pub timestamp: String,
}

impl ResponseMeta {
    fn capture() -> Self {
        Self {
            timestamp: Utc::now().to_rfc3339(),
        }
    }
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            message: None,
            meta: Some(ResponseMeta::capture()),
        }
    }

    pub fn error(message: String) -> Self {
        Self {
            success: false,
            data: None,
            message: Some(message),
            meta: Some(ResponseMeta::capture()),
        }
    }
}

#[cfg(test)]
mod response_tests {
    use super::*;
    use chrono::DateTime;

    #[test]
    fn success_response_includes_timestamp() {
        let response = ApiResponse::success("ok");
        assert!(response.success);
        let meta = response.meta.expect("metadata expected");
        DateTime::parse_from_rfc3339(&meta.timestamp).expect("timestamp should parse");
    }

    #[test]
    fn error_response_carries_message() {
        let response = ApiResponse::<()>::error("oops".into());
        assert!(!response.success);
        assert!(response.data.is_none());
        assert_eq!(response.message.as_deref(), Some("oops"));
    }
}

/// Standard API result type for JSON responses
pub type ApiResult<T> = Result<Json<ApiResponse<T>>, errors::ServiceError>;

/// Routes mounted under `/api/v1`.
pub fn api_v1_routes() -> Router<AppState> {
    let sales_orders = Router::new()
        .route(
            "/sales-orders",
            post(handlers::sales_orders::create_sales_order)
                .get(handlers::sales_orders::list_sales_orders),
        )
        .route("/sales-orders/:id", get(handlers::sales_orders::get_sales_order))
        .route(
            "/sales-orders/:id/route",
            post(handlers::sales_orders::route_sales_order),
        )
        .route(
            "/sales-orders/:id/status",
            put(handlers::sales_orders::update_sales_order_status),
        )
        .route(
            "/sales-orders/:id/breakdown",
            post(handlers::sales_orders::create_breakdown)
                .get(handlers::sales_orders::list_breakdown_items),
        )
        .route(
            "/sales-orders/:id/summary",
            get(handlers::sales_orders::get_fulfillment_summary),
        );

    let breakdown = Router::new()
        .route(
            "/breakdown-items/:id",
            get(handlers::breakdown::get_breakdown_item),
        )
        .route(
            "/breakdown-items/:id/assign",
            post(handlers::breakdown::assign_processing),
        )
        .route(
            "/breakdown-items/:id/processed",
            post(handlers::breakdown::mark_processed),
        );

    let purchase_orders = Router::new()
        .route(
            "/purchase-orders",
            get(handlers::purchase_orders::list_purchase_orders),
        )
        .route(
            "/purchase-orders/receivable",
            get(handlers::purchase_orders::list_receivable_purchase_orders),
        )
        .route(
            "/purchase-orders/replenishment",
            post(handlers::purchase_orders::create_replenishment_order),
        )
        .route(
            "/purchase-orders/:id",
            get(handlers::purchase_orders::get_purchase_order),
        )
        .route(
            "/purchase-orders/:id/status",
            put(handlers::purchase_orders::update_purchase_order_status),
        );

    let warehouse = Router::new()
        .route("/receivings", post(handlers::receivings::record_receiving))
        .route(
            "/receivings/inspectable",
            get(handlers::receivings::list_inspectable_receivings),
        )
        .route("/receivings/:id", get(handlers::receivings::get_receiving))
        .route("/inspections", post(handlers::inspections::record_inspection))
        .route(
            "/inspections/shippable",
            get(handlers::inspections::list_shippable_inspections),
        )
        .route("/inspections/:id", get(handlers::inspections::get_inspection))
        .route("/shipments", post(handlers::shipments::create_shipment))
        .route("/shipments/:id", get(handlers::shipments::get_shipment))
        .route(
            "/shipments/:id/status",
            put(handlers::shipments::update_shipment_status),
        );

    Router::new()
        .merge(sales_orders)
        .merge(breakdown)
        .merge(purchase_orders)
        .merge(warehouse)
}

/// Full application router without transport layers.
pub fn app_router(state: AppState) -> Router {
    Router::new()
        .nest("/api/v1", api_v1_routes())
        .merge(handlers::health::health_routes())
        .merge(openapi::openapi_routes())
        .with_state(state)
}
