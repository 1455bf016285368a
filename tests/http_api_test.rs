mod common;

use axum::http::{Method, StatusCode};
use common::{send_json, TestPipeline};
use serde_json::{json, Value};

fn quotation_body(quotation_id: i64, quantity: i32) -> Value {
    json!({
        "quotation_id": quotation_id,
        "quote_number": format!("QT-{:05}", quotation_id),
        "status": "approved",
        "customer_name": "Harbor Fabrication",
        "item_description": "Mounting bracket assembly",
        "quantity": quantity,
        "unit_price": "12.50"
    })
}

async fn create_order(pipeline: &TestPipeline, quotation_id: i64, quantity: i32) -> i64 {
    let (status, body) = send_json(
        pipeline.router(),
        Method::POST,
        "/api/v1/sales-orders",
        Some(quotation_body(quotation_id, quantity)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    body["data"]["id"].as_i64().expect("order id")
}

#[tokio::test]
async fn create_and_fetch_sales_order() {
    let pipeline = TestPipeline::new();
    let order_id = create_order(&pipeline, 1, 50).await;

    let (status, body) = send_json(
        pipeline.router(),
        Method::GET,
        &format!("/api/v1/sales-orders/{order_id}"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], json!(true));
    assert_eq!(body["data"]["process_status"], json!("approved"));
    assert_eq!(body["data"]["quantity"], json!(50));
    assert_eq!(body["data"]["currency"], json!("USD"));
    assert!(body["data"]["order_number"]
        .as_str()
        .is_some_and(|n| n.starts_with("SO-")));
}

#[tokio::test]
async fn converting_a_quotation_twice_conflicts() {
    let pipeline = TestPipeline::new();
    create_order(&pipeline, 2, 10).await;

    let (status, body) = send_json(
        pipeline.router(),
        Method::POST,
        "/api/v1/sales-orders",
        Some(quotation_body(2, 10)),
    )
    .await;
    assert_eq!(status, StatusCode::CONFLICT);
    assert_eq!(body["code"], json!("already_claimed"));
}

#[tokio::test]
async fn unapproved_quotation_is_a_bad_request() {
    let pipeline = TestPipeline::new();
    let mut quotation = quotation_body(3, 10);
    quotation["status"] = json!("draft");

    let (status, body) = send_json(
        pipeline.router(),
        Method::POST,
        "/api/v1/sales-orders",
        Some(quotation),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("invalid_state_transition"));
}

#[tokio::test]
async fn unknown_order_is_not_found() {
    let pipeline = TestPipeline::new();
    let (status, body) = send_json(
        pipeline.router(),
        Method::GET,
        "/api/v1/sales-orders/9999",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["code"], json!("not_found"));
    assert!(body["timestamp"].is_string());
}

#[tokio::test]
async fn external_route_creates_receivable_purchase_order() {
    let pipeline = TestPipeline::new();
    let order_id = create_order(&pipeline, 4, 20).await;

    let (status, body) = send_json(
        pipeline.router(),
        Method::POST,
        &format!("/api/v1/sales-orders/{order_id}/route"),
        Some(json!({
            "strategy": "external",
            "supplier_name": "Acme Supply",
            "unit_cost": "4.00"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["data"]["order"]["process_status"], json!("external_ordered"));
    assert_eq!(body["data"]["purchase_order"]["purchase_type"], json!("customer_order"));
    let po_id = body["data"]["purchase_order"]["id"].as_i64().expect("po id");

    let (status, body) = send_json(
        pipeline.router(),
        Method::GET,
        "/api/v1/purchase-orders/receivable",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let ids: Vec<i64> = body["data"]
        .as_array()
        .expect("list")
        .iter()
        .filter_map(|po| po["id"].as_i64())
        .collect();
    assert_eq!(ids, vec![po_id]);

    let (status, body) = send_json(
        pipeline.router(),
        Method::POST,
        &format!("/api/v1/sales-orders/{order_id}/route"),
        Some(json!({ "strategy": "internal", "warehouse_location": "WH-A", "processed_by": "picker-1" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["code"], json!("invalid_state_transition"));
}

#[tokio::test]
async fn breakdown_short_of_order_is_unprocessable() {
    let pipeline = TestPipeline::new();
    let order_id = create_order(&pipeline, 5, 50).await;

    let (status, body) = send_json(
        pipeline.router(),
        Method::POST,
        &format!("/api/v1/sales-orders/{order_id}/breakdown"),
        Some(json!({
            "items": [
                {"item_code": "BOLT-M8", "item_description": "M8 bolt", "quantity": 30},
                {"item_code": "NUT-M8", "item_description": "M8 nut", "quantity": 15}
            ]
        })),
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert_eq!(body["code"], json!("quantity_mismatch"));

    let (status, body) = send_json(
        pipeline.router(),
        Method::GET,
        &format!("/api/v1/sales-orders/{order_id}/breakdown"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"], json!([]));
}

#[tokio::test]
async fn walk_purchase_order_to_delivery_over_http() {
    let pipeline = TestPipeline::new();
    let order_id = create_order(&pipeline, 6, 8).await;

    let (_, routed) = send_json(
        pipeline.router(),
        Method::POST,
        &format!("/api/v1/sales-orders/{order_id}/route"),
        Some(json!({ "strategy": "external", "supplier_name": "Acme Supply" })),
    )
    .await;
    let po_id = routed["data"]["purchase_order"]["id"].as_i64().expect("po id");

    let (status, body) = send_json(
        pipeline.router(),
        Method::POST,
        "/api/v1/receivings",
        Some(json!({
            "purchase_order_id": po_id,
            "received_quantity": 8,
            "warehouse_location": "WH-A",
            "received_by": "dock-1"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let receiving_id = body["data"]["receiving"]["id"].as_i64().expect("receiving id");

    let (status, body) = send_json(
        pipeline.router(),
        Method::POST,
        "/api/v1/inspections",
        Some(json!({
            "receiving_id": receiving_id,
            "approved_quantity": 8,
            "rejected_quantity": 0,
            "method": "full",
            "approved_for_shipment": true,
            "inspector": "qa-lead"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    assert_eq!(body["data"]["inspection_result"], json!("approved"));
    let inspection_id = body["data"]["id"].as_i64().expect("inspection id");

    let (status, body) = send_json(
        pipeline.router(),
        Method::POST,
        "/api/v1/shipments",
        Some(json!({
            "inspection_id": inspection_id,
            "shipment_quantity": 8,
            "shipped_by": "outbound-2"
        })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED, "{body}");
    let shipment_id = body["data"]["id"].as_i64().expect("shipment id");

    // Skipping straight to delivered is not a forward step.
    let (status, _) = send_json(
        pipeline.router(),
        Method::PUT,
        &format!("/api/v1/shipments/{shipment_id}/status"),
        Some(json!({ "status": "delivered" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    for next in ["shipped", "in_transit", "delivered"] {
        let (status, body) = send_json(
            pipeline.router(),
            Method::PUT,
            &format!("/api/v1/shipments/{shipment_id}/status"),
            Some(json!({ "status": next })),
        )
        .await;
        assert_eq!(status, StatusCode::OK, "{next}: {body}");
        assert_eq!(body["data"]["shipment_status"], json!(next));
    }

    let (_, body) = send_json(
        pipeline.router(),
        Method::GET,
        &format!("/api/v1/purchase-orders/{po_id}"),
        None,
    )
    .await;
    assert_eq!(body["data"]["status"], json!("completed"));

    let (status, body) = send_json(
        pipeline.router(),
        Method::GET,
        &format!("/api/v1/sales-orders/{order_id}/summary"),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"]["process_status"], json!("completed"));
    assert_eq!(body["data"]["delivered"], json!(8));
}

#[tokio::test]
async fn health_reports_storage_up() {
    let pipeline = TestPipeline::new();
    let (status, body) = send_json(pipeline.router(), Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], json!("up"));
    assert_eq!(body["storage"]["status"], json!("up"));
}

#[tokio::test]
async fn openapi_document_is_served() {
    let pipeline = TestPipeline::new();
    let (status, body) = send_json(
        pipeline.router(),
        Method::GET,
        "/api-docs/openapi.json",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["info"]["title"], json!("Fulfillment Pipeline API"));
    assert!(body["paths"]["/api/v1/shipments/{id}/status"].is_object());
}
