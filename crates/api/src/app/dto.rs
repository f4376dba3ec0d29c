use serde::{Deserialize, Serialize};

use fleetops_cargo::{CargoLedger, LineItem};
use fleetops_core::AggregateRoot;

// -------------------------
// Request DTOs
// -------------------------

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenLedgerRequest {
    pub id: Option<String>,
    pub owner_label: String,
    pub capacity: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateLedgerRequest {
    pub owner_label: Option<String>,
    pub capacity: Option<f64>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddItemRequest {
    pub name: String,
    pub amount: i64,
    pub unit_weight: f64,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveItemRequest {
    pub amount: i64,
    pub unit_weight: f64,
}

// -------------------------
// Response DTOs
// -------------------------

#[derive(Debug, Serialize)]
pub struct LineItemView {
    pub name: String,
    pub amount: i64,
}

impl From<LineItem> for LineItemView {
    fn from(item: LineItem) -> Self {
        Self {
            name: item.name,
            amount: item.amount,
        }
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LedgerView {
    pub id: String,
    pub owner_label: String,
    pub capacity: f64,
    pub used_capacity: f64,
    pub available_capacity: f64,
    pub total_units: i64,
    pub items: Vec<LineItemView>,
    pub version: u64,
}

impl From<&CargoLedger> for LedgerView {
    fn from(ledger: &CargoLedger) -> Self {
        Self {
            id: ledger.id().to_string(),
            owner_label: ledger.owner_label().to_string(),
            capacity: ledger.capacity(),
            used_capacity: ledger.used_capacity(),
            available_capacity: ledger.available_capacity(),
            total_units: ledger.total_units(),
            items: ledger.items().into_iter().map(LineItemView::from).collect(),
            version: ledger.version(),
        }
    }
}

pub fn ledger_to_json(ledger: &CargoLedger) -> serde_json::Value {
    serde_json::to_value(LedgerView::from(ledger)).unwrap_or(serde_json::Value::Null)
}
