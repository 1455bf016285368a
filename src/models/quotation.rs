use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use strum::{Display, EnumString};
use utoipa::ToSchema;
use validator::Validate;

use crate::{errors::ServiceError, models::extended_total};

#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Display, EnumString, ToSchema,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum QuotationStatus {
    Draft,
    Sent,
    Approved,
    Rejected,
    Expired,
}

/// Quotation as supplied by the upstream quoting system. Read only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Validate, ToSchema)]
pub struct ApprovedQuotation {
    pub quotation_id: i64,
    #[validate(length(min = 1))]
    pub quote_number: String,
    pub status: QuotationStatus,
    #[validate(length(min = 1))]
    pub customer_name: String,
    pub customer_company: Option<String>,
    pub item_code: Option<String>,
    #[validate(length(min = 1))]
    pub item_description: String,
    #[validate(range(min = 1))]
    pub quantity: i32,
    pub unit_price: Decimal,
    pub currency: Option<String>,
    pub expected_delivery_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

impl ApprovedQuotation {
    pub fn total_amount(&self) -> Result<Decimal, ServiceError> {
        extended_total(self.unit_price, self.quantity, "total_amount")
    }
}
