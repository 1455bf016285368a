use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumIter, EnumString};
use utoipa::ToSchema;

use super::StoredModel;
use crate::store::Collection;

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
pub enum ProcessingType {
    Internal,
    External,
    Mixed,
}

impl ProcessingType {
    /// Classifies a split; `None` when both parts are zero.
    pub fn from_split(internal: i32, external: i32) -> Option<Self> {
        match (internal > 0, external > 0) {
            (true, false) => Some(ProcessingType::Internal),
            (false, true) => Some(ProcessingType::External),
            (true, true) => Some(ProcessingType::Mixed),
            (false, false) => None,
        }
    }
}

#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
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
pub enum BreakdownItemStatus {
    Pending,
    StockChecked,
    Processed,
    Completed,
}

impl BreakdownItemStatus {
    pub fn next(self) -> Option<Self> {
        match self {
            BreakdownItemStatus::Pending => Some(BreakdownItemStatus::StockChecked),
            BreakdownItemStatus::StockChecked => Some(BreakdownItemStatus::Processed),
            BreakdownItemStatus::Processed => Some(BreakdownItemStatus::Completed),
            BreakdownItemStatus::Completed => None,
        }
    }

    pub fn can_transition_to(self, next: BreakdownItemStatus) -> bool {
        self.next() == Some(next)
    }
}

/// One code-identified share of a sales order's quantity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ItemBreakdown {
    pub id: i64,
    pub sales_order_id: i64,
    pub item_code: String,
    pub item_description: String,
    pub quantity: i32,
    pub unit_price: Decimal,
    pub line_total: Decimal,
    pub processing_type: Option<ProcessingType>,
    /// Unset until processing is assigned; afterwards
    /// `internal_quantity + external_quantity == quantity`.
    pub internal_quantity: Option<i32>,
    pub external_quantity: Option<i32>,
    pub purchase_order_id: Option<i64>,
    pub internal_processing_id: Option<i64>,
    pub item_status: BreakdownItemStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl ItemBreakdown {
    pub fn is_assigned(&self) -> bool {
        self.processing_type.is_some()
    }

    /// Every assigned unit has its downstream record.
    pub fn units_recorded(&self) -> bool {
        let external_ok =
            self.external_quantity.unwrap_or(0) == 0 || self.purchase_order_id.is_some();
        let internal_ok =
            self.internal_quantity.unwrap_or(0) == 0 || self.internal_processing_id.is_some();
        self.is_assigned() && external_ok && internal_ok
    }

    pub fn needs_procurement(&self) -> bool {
        self.external_quantity.unwrap_or(0) > 0
    }
}

impl StoredModel for ItemBreakdown {
    const KIND: &'static str = "breakdown item";
    const COLLECTIONS: &'static [Collection] = &[Collection::ProcessItemBreakdown];

    fn id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(30, 0, Some(ProcessingType::Internal))]
    #[case(0, 20, Some(ProcessingType::External))]
    #[case(5, 15, Some(ProcessingType::Mixed))]
    #[case(0, 0, None)]
    fn classifies_split(
        #[case] internal: i32,
        #[case] external: i32,
        #[case] expected: Option<ProcessingType>,
    ) {
        assert_eq!(ProcessingType::from_split(internal, external), expected);
    }

    #[test]
    fn status_moves_one_step_at_a_time() {
        use BreakdownItemStatus::*;
        assert!(Pending.can_transition_to(StockChecked));
        assert!(StockChecked.can_transition_to(Processed));
        assert!(Processed.can_transition_to(Completed));
        assert!(!Pending.can_transition_to(Processed));
        assert!(!Completed.can_transition_to(Pending));
        assert_eq!(Completed.next(), None);
    }

    fn mixed_item() -> ItemBreakdown {
        ItemBreakdown {
            id: 3,
            sales_order_id: 1,
            item_code: "BOLT-M8".to_string(),
            item_description: "M8 bolt".to_string(),
            quantity: 20,
            unit_price: Decimal::ONE,
            line_total: Decimal::from(20),
            processing_type: Some(ProcessingType::Mixed),
            internal_quantity: Some(5),
            external_quantity: Some(15),
            purchase_order_id: Some(9),
            internal_processing_id: Some(4),
            item_status: BreakdownItemStatus::StockChecked,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn units_recorded_needs_a_record_per_assigned_share() {
        let item = mixed_item();
        assert!(item.units_recorded());

        let without_po = ItemBreakdown {
            purchase_order_id: None,
            ..item.clone()
        };
        assert!(!without_po.units_recorded());

        let stock_only = ItemBreakdown {
            processing_type: Some(ProcessingType::Internal),
            internal_quantity: Some(20),
            external_quantity: Some(0),
            purchase_order_id: None,
            ..item.clone()
        };
        assert!(stock_only.units_recorded());

        let unassigned = ItemBreakdown {
            processing_type: None,
            ..item
        };
        assert!(!unassigned.units_recorded());
    }
}
