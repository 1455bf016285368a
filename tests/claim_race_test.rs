mod common;

use std::sync::Arc;

use assert_matches::assert_matches;
use common::{inspection_command, quotation, receiving_command, shipment_command, TestPipeline};
use fulfillment_pipeline::{
    commands::{
        breakdown::{AssignProcessingCommand, BreakdownLine},
        orders::RoutingStrategy,
    },
    errors::ServiceError,
    models::{BreakdownItemStatus, PurchaseOrder, SalesOrderStatus},
    store::{Collection, InMemoryRecordStore},
};
use futures::future::join_all;
use rust_decimal_macros::dec;

const CONTENDERS: usize = 8;

async fn routed_purchase_order(
    pipeline: &TestPipeline,
    quotation_id: i64,
    qty: i32,
) -> PurchaseOrder {
    let order = pipeline
        .services
        .sales_orders
        .create_from_quotation(quotation(quotation_id, qty))
        .await
        .unwrap();
    pipeline
        .services
        .sales_orders
        .route_order(
            order.id,
            RoutingStrategy::External {
                supplier_name: Some("Acme Supply".to_string()),
                supplier_contact: None,
                unit_cost: dec!(1.00),
                expected_arrival_date: None,
                notes: None,
            },
        )
        .await
        .unwrap()
        .purchase_order
        .unwrap()
}

fn tally<T>(
    results: Vec<Result<Result<T, ServiceError>, tokio::task::JoinError>>,
) -> (usize, usize) {
    let mut won = 0;
    let mut claimed = 0;
    for result in results {
        match result.expect("task completed") {
            Ok(_) => won += 1,
            Err(ServiceError::AlreadyClaimed(_)) => claimed += 1,
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    (won, claimed)
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_inspections_have_one_winner() {
    let pipeline = TestPipeline::new();
    let po = routed_purchase_order(&pipeline, 1, 40).await;
    let receiving = pipeline.receive(po.id, 40).await;

    let tasks = (0..CONTENDERS).map(|_| {
        let inspections = pipeline.services.inspections.clone();
        let command = inspection_command(receiving.id, 40, 0);
        tokio::spawn(async move { inspections.record_inspection(command).await })
    });
    let (won, claimed) = tally(join_all(tasks).await);

    assert_eq!(won, 1);
    assert_eq!(claimed, CONTENDERS - 1);
    assert_eq!(pipeline.store.len(Collection::QualityInspection), 1);

    let receiving = pipeline.services.receiving.get_receiving(receiving.id).await.unwrap();
    assert!(receiving.inspection_id.is_some());
    assert!(receiving.inspection_claim.is_some());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_receivings_have_one_winner() {
    let pipeline = TestPipeline::new();
    let po = routed_purchase_order(&pipeline, 2, 25).await;

    let tasks = (0..CONTENDERS).map(|_| {
        let receiving = pipeline.services.receiving.clone();
        let command = receiving_command(po.id, 25);
        tokio::spawn(async move { receiving.record_receiving(command).await })
    });
    let (won, claimed) = tally(join_all(tasks).await);

    assert_eq!(won, 1);
    assert_eq!(claimed, CONTENDERS - 1);
    assert_eq!(pipeline.store.len(Collection::InventoryReceiving), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_shipments_have_one_winner() {
    let pipeline = TestPipeline::new();
    let po = routed_purchase_order(&pipeline, 3, 10).await;
    let receiving = pipeline.receive(po.id, 10).await;
    let inspection = pipeline.inspect(receiving.id, 10, 0).await;

    let tasks = (0..CONTENDERS).map(|_| {
        let shipments = pipeline.services.shipments.clone();
        let command = shipment_command(inspection.id, 10);
        tokio::spawn(async move { shipments.create_shipment(command).await })
    });
    let (won, claimed) = tally(join_all(tasks).await);

    assert_eq!(won, 1);
    assert_eq!(claimed, CONTENDERS - 1);
    assert_eq!(pipeline.store.len(Collection::DeliveryShipment), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_quotation_conversions_create_one_order() {
    let pipeline = TestPipeline::new();

    let tasks = (0..CONTENDERS).map(|_| {
        let orders = pipeline.services.sales_orders.clone();
        tokio::spawn(async move { orders.create_from_quotation(quotation(77, 5)).await })
    });
    let (won, claimed) = tally(join_all(tasks).await);

    assert_eq!(won, 1);
    assert_eq!(claimed, CONTENDERS - 1);
    assert_eq!(pipeline.store.len(Collection::SalesProcess), 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn concurrent_assignments_of_one_item_have_one_winner() {
    let pipeline = TestPipeline::new();
    let order = pipeline
        .services
        .sales_orders
        .create_from_quotation(quotation(4, 6))
        .await
        .unwrap();
    let items = pipeline
        .services
        .breakdown
        .create_breakdown(
            order.id,
            vec![BreakdownLine {
                item_code: "PIN-4".to_string(),
                item_description: "Dowel pin".to_string(),
                quantity: 6,
                unit_price: None,
            }],
        )
        .await
        .unwrap();
    let item_id = items[0].id;

    let tasks = (0..CONTENDERS).map(|_| {
        let breakdown = pipeline.services.breakdown.clone();
        let command = AssignProcessingCommand {
            item_id,
            internal_quantity: 0,
            external_quantity: 6,
            supplier_name: Some("Northwind Metals".to_string()),
            supplier_contact: None,
            unit_cost: None,
            expected_arrival_date: None,
            warehouse_location: None,
            processed_by: None,
            notes: None,
        };
        tokio::spawn(async move { breakdown.assign_processing(command).await })
    });

    let mut won = 0;
    for result in join_all(tasks).await {
        match result.expect("task completed") {
            Ok(_) => won += 1,
            // Losers either lose the claim or arrive after the winner left `pending`.
            Err(ServiceError::AlreadyClaimed(_))
            | Err(ServiceError::InvalidStateTransition { .. }) => {}
            Err(other) => panic!("unexpected error: {other}"),
        }
    }
    assert_eq!(won, 1);
    assert_eq!(pipeline.store.len(Collection::PurchaseOrdersToSupplier), 1);
    let item = pipeline.services.breakdown.get_item(item_id).await.unwrap();
    assert_eq!(item.item_status, BreakdownItemStatus::StockChecked);
    assert!(item.purchase_order_id.is_some());
}

#[tokio::test]
async fn second_child_is_already_claimed() {
    let pipeline = TestPipeline::new();
    let po = routed_purchase_order(&pipeline, 5, 12).await;
    let receiving = pipeline.receive(po.id, 12).await;
    let inspection = pipeline.inspect(receiving.id, 12, 0).await;
    pipeline.ship(inspection.id, 12).await;

    let services = &pipeline.services;
    assert_matches!(
        services.receiving.record_receiving(receiving_command(po.id, 12)).await,
        Err(ServiceError::AlreadyClaimed(_))
    );
    assert_matches!(
        services
            .inspections
            .record_inspection(inspection_command(receiving.id, 12, 0))
            .await,
        Err(ServiceError::AlreadyClaimed(_))
    );
    assert_matches!(
        services.shipments.create_shipment(shipment_command(inspection.id, 12)).await,
        Err(ServiceError::AlreadyClaimed(_))
    );
}

#[tokio::test]
async fn rejected_operations_leave_no_trace() {
    let store = Arc::new(InMemoryRecordStore::new());
    let pipeline = TestPipeline::with_store(store.clone());
    let services = &pipeline.services;

    let po = routed_purchase_order(&pipeline, 6, 20).await;
    let po_before = services.procurement.get_purchase_order(po.id).await.unwrap();

    // Missing receiver identity.
    let mut command = receiving_command(po.id, 20);
    command.received_by = None;
    assert_matches!(
        services.receiving.record_receiving(command).await,
        Err(ServiceError::MissingRequiredField(_))
    );
    assert_eq!(store.len(Collection::InventoryReceiving), 0);
    assert_eq!(
        services.procurement.get_purchase_order(po.id).await.unwrap(),
        po_before
    );

    let receiving = pipeline.receive(po.id, 20).await;
    let receiving_before = services.receiving.get_receiving(receiving.id).await.unwrap();

    // Approved plus rejected does not cover what was received.
    assert_matches!(
        services
            .inspections
            .record_inspection(inspection_command(receiving.id, 15, 3))
            .await,
        Err(ServiceError::QuantityMismatch(_))
    );
    assert_eq!(store.len(Collection::QualityInspection), 0);
    assert_eq!(
        services.receiving.get_receiving(receiving.id).await.unwrap(),
        receiving_before
    );

    let inspection = pipeline.inspect(receiving.id, 18, 2).await;
    let inspection_before = services.inspections.get_inspection(inspection.id).await.unwrap();

    // More than was approved.
    assert_matches!(
        services
            .shipments
            .create_shipment(shipment_command(inspection.id, 19))
            .await,
        Err(ServiceError::QuantityMismatch(_))
    );
    assert_eq!(store.len(Collection::DeliveryShipment), 0);
    assert_eq!(
        services.inspections.get_inspection(inspection.id).await.unwrap(),
        inspection_before
    );
}

#[tokio::test]
async fn missing_supplier_and_held_inspection_leave_no_trace() {
    let pipeline = TestPipeline::new();
    let services = &pipeline.services;

    let order = services
        .sales_orders
        .create_from_quotation(quotation(9, 20))
        .await
        .unwrap();
    let order_before = services.sales_orders.get_order(order.id).await.unwrap();
    let unsupplied = RoutingStrategy::External {
        supplier_name: Some("  ".to_string()),
        supplier_contact: None,
        unit_cost: dec!(1.00),
        expected_arrival_date: None,
        notes: None,
    };
    assert_matches!(
        services.sales_orders.route_order(order.id, unsupplied).await,
        Err(ServiceError::MissingRequiredField(field)) if field == "supplier_name"
    );
    assert_eq!(
        services.sales_orders.get_order(order.id).await.unwrap(),
        order_before
    );
    assert_eq!(pipeline.store.len(Collection::PurchaseOrdersToSupplier), 0);

    let po = routed_purchase_order(&pipeline, 10, 20).await;
    let receiving = pipeline.receive(po.id, 20).await;
    let mut held = inspection_command(receiving.id, 20, 0);
    held.approved_for_shipment = false;
    let inspection = services.inspections.record_inspection(held).await.unwrap();
    let inspection_before = services.inspections.get_inspection(inspection.id).await.unwrap();

    assert_matches!(
        services
            .shipments
            .create_shipment(shipment_command(inspection.id, 20))
            .await,
        Err(ServiceError::InvalidStateTransition { .. })
    );
    assert_eq!(pipeline.store.len(Collection::DeliveryShipment), 0);
    assert_eq!(
        services.inspections.get_inspection(inspection.id).await.unwrap(),
        inspection_before
    );
}

#[tokio::test]
async fn unapproved_quotation_and_bad_split_are_rejected() {
    let pipeline = TestPipeline::new();
    let services = &pipeline.services;

    let mut draft = quotation(8, 10);
    draft.status = fulfillment_pipeline::models::QuotationStatus::Sent;
    assert_matches!(
        services.sales_orders.create_from_quotation(draft).await,
        Err(ServiceError::InvalidStateTransition { .. })
    );
    assert_eq!(pipeline.store.len(Collection::SalesProcess), 0);

    let order = services
        .sales_orders
        .create_from_quotation(quotation(8, 10))
        .await
        .unwrap();
    let items = services
        .breakdown
        .create_breakdown(
            order.id,
            vec![
                BreakdownLine {
                    item_code: "A".to_string(),
                    item_description: "Part A".to_string(),
                    quantity: 7,
                    unit_price: None,
                },
                BreakdownLine {
                    item_code: "B".to_string(),
                    item_description: "Part B".to_string(),
                    quantity: 3,
                    unit_price: None,
                },
            ],
        )
        .await
        .unwrap();

    let item_before = services.breakdown.get_item(items[0].id).await.unwrap();
    let split = AssignProcessingCommand {
        item_id: items[0].id,
        internal_quantity: 3,
        external_quantity: 3,
        supplier_name: Some("Northwind Metals".to_string()),
        supplier_contact: None,
        unit_cost: None,
        expected_arrival_date: None,
        warehouse_location: Some("WH-A".to_string()),
        processed_by: Some("picker-1".to_string()),
        notes: None,
    };
    assert_matches!(
        services.breakdown.assign_processing(split).await,
        Err(ServiceError::QuantityMismatch(_))
    );
    assert_eq!(
        services.breakdown.get_item(items[0].id).await.unwrap(),
        item_before
    );
    assert_eq!(pipeline.store.len(Collection::PurchaseOrdersToSupplier), 0);
    assert_eq!(pipeline.store.len(Collection::InternalProcessing), 0);
    assert_eq!(
        services.sales_orders.get_order(order.id).await.unwrap().process_status,
        SalesOrderStatus::Approved
    );
}
