use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use super::StoredModel;
use crate::store::Collection;

/// Process status of a sales order.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    Display,
    EnumString,
    EnumIter,
    ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum SalesOrderStatus {
    Approved,
    InternalProcessed,
    ExternalOrdered,
    Ordered,
    Received,
    Completed,
    Closed,
}

impl SalesOrderStatus {
    /// Forward-only transition table. Staying in place is handled by callers
    /// as an idempotent no-op and is not a transition.
    pub fn can_transition_to(self, next: SalesOrderStatus) -> bool {
        use SalesOrderStatus::*;
        matches!(
            (self, next),
            (Approved, InternalProcessed)
                | (Approved, ExternalOrdered)
                | (Approved, Ordered)
                | (InternalProcessed, Completed)
                | (InternalProcessed, Closed)
                | (ExternalOrdered, Received)
                | (ExternalOrdered, Completed)
                | (Ordered, Received)
                | (Ordered, Completed)
                | (Received, Completed)
                | (Completed, Closed)
        )
    }
}

/// Fulfillment strategy chosen when an order is routed.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum FulfillmentRoute {
    Internal,
    External,
    Breakdown,
}

/// Committed customer order derived from an approved quotation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct SalesOrder {
    pub id: i64,
    pub order_number: String,
    pub quotation_id: Option<i64>,
    pub quotation_number: Option<String>,
    pub customer_name: String,
    pub customer_company: Option<String>,
    pub item_code: Option<String>,
    pub item_description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub total_amount: Decimal,
    pub currency: String,
    pub expected_delivery_date: Option<NaiveDate>,
    pub process_status: SalesOrderStatus,
    #[serde(default)]
    pub fulfillment_route: Option<FulfillmentRoute>,
    /// Claim token taken by whichever routing call wins.
    #[serde(default)]
    pub routing_claim: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StoredModel for SalesOrder {
    const KIND: &'static str = "sales order";
    const COLLECTIONS: &'static [Collection] = &[Collection::SalesProcess];

    fn id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::str::FromStr;
    use strum::IntoEnumIterator;
    use SalesOrderStatus::*;

    #[rstest]
    #[case(Approved, InternalProcessed)]
    #[case(Approved, ExternalOrdered)]
    #[case(Approved, Ordered)]
    #[case(ExternalOrdered, Received)]
    #[case(Ordered, Completed)]
    #[case(Received, Completed)]
    #[case(InternalProcessed, Closed)]
    #[case(Completed, Closed)]
    fn allowed_transitions(#[case] from: SalesOrderStatus, #[case] to: SalesOrderStatus) {
        assert!(from.can_transition_to(to));
    }

    #[rstest]
    #[case(Received, ExternalOrdered)]
    #[case(Completed, Received)]
    #[case(Closed, Completed)]
    #[case(Ordered, ExternalOrdered)]
    #[case(InternalProcessed, Received)]
    #[case(Approved, Completed)]
    fn rejected_transitions(#[case] from: SalesOrderStatus, #[case] to: SalesOrderStatus) {
        assert!(!from.can_transition_to(to));
    }

    #[test]
    fn no_status_transitions_to_itself() {
        for status in SalesOrderStatus::iter() {
            assert!(!status.can_transition_to(status));
        }
    }

    #[test]
    fn closed_is_terminal() {
        assert!(SalesOrderStatus::iter().all(|next| !Closed.can_transition_to(next)));
    }

    #[test]
    fn wire_names() {
        assert_eq!(InternalProcessed.to_string(), "internal_processed");
        assert_eq!(
            SalesOrderStatus::from_str("external_ordered").unwrap(),
            ExternalOrdered
        );
        assert_eq!(
            serde_json::to_value(ExternalOrdered).unwrap(),
            serde_json::json!("external_ordered")
        );
    }
}
