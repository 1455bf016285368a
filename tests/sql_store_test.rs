mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{inspection_command, quotation, receiving_command, shipment_command};
use fulfillment_pipeline::{
    commands::orders::RoutingStrategy,
    config::AppConfig,
    db::{self, DbConfig},
    errors::ServiceError,
    events::EventSender,
    models::{PurchaseOrderStatus, SalesOrderStatus, ShipmentStatus},
    store::{CasOutcome, Collection, Filter, Record, RecordStore, SqlRecordStore},
    AppState,
};
use serde_json::{json, Value};

// A single connection keeps every query on the same in-memory database.
async fn sqlite_store() -> Arc<SqlRecordStore> {
    let config = DbConfig {
        url: "sqlite::memory:".to_string(),
        max_connections: 1,
        min_connections: 1,
        ..Default::default()
    };
    let pool = db::establish_connection_with_config(&config)
        .await
        .expect("sqlite connects");
    db::run_migrations(&pool).await.expect("migrations apply");
    Arc::new(SqlRecordStore::new(Arc::new(pool)))
}

fn record(value: Value) -> Record {
    value.as_object().cloned().expect("object")
}

#[tokio::test]
async fn insert_fetch_and_patch() {
    let store = sqlite_store().await;
    let first = store
        .insert(
            Collection::PurchaseOrdersToSupplier,
            record(json!({ "status": "ordered", "quantity": 30 })),
        )
        .await
        .unwrap();
    store
        .insert(
            Collection::PurchaseOrdersToSupplier,
            record(json!({ "status": "received", "quantity": 20 })),
        )
        .await
        .unwrap();
    store
        .insert(
            Collection::PurchaseOrdersInventory,
            record(json!({ "status": "ordered", "quantity": 5 })),
        )
        .await
        .unwrap();

    let ordered = store
        .fetch(
            Collection::PurchaseOrdersToSupplier,
            &Filter::new().eq("status", "ordered"),
        )
        .await
        .unwrap();
    assert_eq!(ordered.len(), 1);
    assert_eq!(ordered[0]["quantity"], json!(30));

    let id = first["id"].as_i64().unwrap();
    let patched = store
        .update(
            Collection::PurchaseOrdersToSupplier,
            id,
            record(json!({ "status": "submitted" })),
        )
        .await
        .unwrap()
        .expect("row exists");
    assert_eq!(patched["status"], json!("submitted"));
    assert_eq!(patched["quantity"], json!(30));

    // Ids are scoped to their collection on lookup.
    assert!(store
        .get(Collection::PurchaseOrdersInventory, id)
        .await
        .unwrap()
        .is_none());
    assert!(store
        .update(Collection::SalesProcess, 424242, record(json!({ "x": 1 })))
        .await
        .unwrap()
        .is_none());
}

#[tokio::test]
async fn fetch_filters_on_numbers_and_absent_fields() {
    let store = sqlite_store().await;
    for (order, item) in [(7, Some(1)), (7, None), (8, None)] {
        let mut fields = record(json!({ "sales_order_id": order, "status": "ordered" }));
        if let Some(item) = item {
            fields.insert("breakdown_item_id".to_string(), json!(item));
        }
        store
            .insert(Collection::PurchaseOrdersToSupplier, fields)
            .await
            .unwrap();
    }

    let for_order = store
        .fetch(
            Collection::PurchaseOrdersToSupplier,
            &Filter::new().eq("sales_order_id", 7),
        )
        .await
        .unwrap();
    assert_eq!(for_order.len(), 2);

    // An absent field compares equal to null.
    let unsplit = store
        .fetch(
            Collection::PurchaseOrdersToSupplier,
            &Filter::new()
                .eq("sales_order_id", 7)
                .eq("breakdown_item_id", Value::Null),
        )
        .await
        .unwrap();
    assert_eq!(unsplit.len(), 1);
    assert!(unsplit[0].get("breakdown_item_id").is_none());

    // The string "7" is not the number 7.
    let none = store
        .fetch(
            Collection::PurchaseOrdersToSupplier,
            &Filter::new().eq("sales_order_id", "7"),
        )
        .await
        .unwrap();
    assert!(none.is_empty());
}

#[tokio::test]
async fn compare_and_update_guards_on_current_value() {
    let store = sqlite_store().await;
    let receiving = store
        .insert(
            Collection::InventoryReceiving,
            record(json!({ "received_quantity": 12 })),
        )
        .await
        .unwrap();
    let id = receiving["id"].as_i64().unwrap();

    let first = store
        .compare_and_update(
            Collection::InventoryReceiving,
            id,
            "inspection_claim",
            &Value::Null,
            record(json!({ "inspection_claim": "token-a" })),
        )
        .await
        .unwrap();
    assert_matches!(first, CasOutcome::Updated(ref rec) if rec["inspection_claim"] == json!("token-a"));

    let second = store
        .compare_and_update(
            Collection::InventoryReceiving,
            id,
            "inspection_claim",
            &Value::Null,
            record(json!({ "inspection_claim": "token-b" })),
        )
        .await
        .unwrap();
    assert_matches!(second, CasOutcome::Mismatch(ref rec) if rec["inspection_claim"] == json!("token-a"));

    let missing = store
        .compare_and_update(
            Collection::InventoryReceiving,
            id + 1000,
            "inspection_claim",
            &Value::Null,
            record(json!({ "inspection_claim": "token-c" })),
        )
        .await
        .unwrap();
    assert_matches!(missing, CasOutcome::Missing);

    assert!(store.delete(Collection::InventoryReceiving, id).await.unwrap());
    assert!(!store.delete(Collection::InventoryReceiving, id).await.unwrap());
}

#[tokio::test]
async fn external_order_completes_on_sql_backend() {
    let store = sqlite_store().await;
    let (sender, _events) = EventSender::channel(256);
    let state = AppState::new(store, AppConfig::default(), Arc::new(sender));
    let services = &state.services;

    let order = services
        .sales_orders
        .create_from_quotation(quotation(11, 15))
        .await
        .unwrap();
    let routed = services
        .sales_orders
        .route_order(
            order.id,
            RoutingStrategy::External {
                supplier_name: Some("Acme Supply".to_string()),
                supplier_contact: None,
                unit_cost: Default::default(),
                expected_arrival_date: None,
                notes: None,
            },
        )
        .await
        .unwrap();
    let po = routed.purchase_order.expect("purchase order");
    assert_eq!(routed.order.process_status, SalesOrderStatus::ExternalOrdered);

    let received = services
        .receiving
        .record_receiving(receiving_command(po.id, 15))
        .await
        .unwrap();
    assert_eq!(received.purchase_order.status, PurchaseOrderStatus::Received);
    assert_matches!(
        services
            .receiving
            .record_receiving(receiving_command(po.id, 15))
            .await,
        Err(ServiceError::AlreadyClaimed(_))
    );

    let inspection = services
        .inspections
        .record_inspection(inspection_command(received.receiving.id, 15, 0))
        .await
        .unwrap();
    assert_eq!(
        services.sales_orders.get_order(order.id).await.unwrap().process_status,
        SalesOrderStatus::Received
    );

    let shipment = services
        .shipments
        .create_shipment(shipment_command(inspection.id, 15))
        .await
        .unwrap();
    for status in [
        ShipmentStatus::Shipped,
        ShipmentStatus::InTransit,
        ShipmentStatus::Delivered,
    ] {
        services
            .shipments
            .advance_status(shipment.id, status)
            .await
            .unwrap();
    }

    assert_eq!(
        services.procurement.get_purchase_order(po.id).await.unwrap().status,
        PurchaseOrderStatus::Completed
    );
    assert_eq!(
        services.sales_orders.get_order(order.id).await.unwrap().process_status,
        SalesOrderStatus::Completed
    );
}
