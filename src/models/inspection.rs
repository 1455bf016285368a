use chrono::{DateTime, NaiveDate, Utc};
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
pub enum InspectionMethod {
    Full,
    Sample,
    Visual,
    Functional,
}

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
pub enum InspectionResult {
    Approved,
    PartiallyApproved,
    Rejected,
}

impl InspectionResult {
    pub fn derive(approved: i32, rejected: i32) -> Self {
        if rejected == 0 {
            InspectionResult::Approved
        } else if approved == 0 {
            InspectionResult::Rejected
        } else {
            InspectionResult::PartiallyApproved
        }
    }
}

/// Quality gate over one receiving.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct QualityInspection {
    pub id: i64,
    pub inspection_number: String,
    pub receiving_id: i64,
    pub purchase_order_id: Option<i64>,
    pub sales_order_id: Option<i64>,
    pub inspector: String,
    pub inspection_date: NaiveDate,
    pub method: InspectionMethod,
    pub total_quantity: i32,
    pub approved_quantity: i32,
    pub rejected_quantity: i32,
    pub inspection_result: InspectionResult,
    pub approved_for_shipment: bool,
    #[serde(default)]
    pub notes: Option<String>,
    #[serde(default)]
    pub shipment_claim: Option<String>,
    #[serde(default)]
    pub shipment_id: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl QualityInspection {
    pub fn is_shipped(&self) -> bool {
        self.shipment_claim.is_some()
    }

    pub fn is_shippable(&self) -> bool {
        self.approved_for_shipment && self.approved_quantity > 0 && !self.is_shipped()
    }
}

impl StoredModel for QualityInspection {
    const KIND: &'static str = "inspection";
    const COLLECTIONS: &'static [Collection] = &[Collection::QualityInspection];

    fn id(&self) -> i64 {
        self.id
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(100, 0, InspectionResult::Approved)]
    #[case(90, 10, InspectionResult::PartiallyApproved)]
    #[case(0, 25, InspectionResult::Rejected)]
    fn result_follows_split(
        #[case] approved: i32,
        #[case] rejected: i32,
        #[case] expected: InspectionResult,
    ) {
        assert_eq!(InspectionResult::derive(approved, rejected), expected);
    }

    #[test]
    fn method_wire_names() {
        assert_eq!(InspectionMethod::Functional.to_string(), "functional");
        assert_eq!(
            serde_json::to_value(InspectionResult::PartiallyApproved).unwrap(),
            serde_json::json!("partially_approved")
        );
    }
}
