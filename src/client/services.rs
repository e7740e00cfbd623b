//! Backend service wrappers
//!
//! Each wrapper shapes one request, sends it through a [`Transport`] and
//! unwraps the envelope. Failures are logged and returned unchanged.

use serde::{Deserialize, Deserializer, Serialize};
use serde_json::{json, Value as Json};
use tracing::{debug, error, info};

use super::transport::{ApiError, ApiRequest, Transport};

pub const ITEM_URL: &str = "/wms/item/";
pub const RECENT_HISTORY_URL: &str = "/wms/recent_history/";
pub const DEFAULT_HISTORY_DAYS: u32 = 7;

//==============================================================================
// Batch item import
//==============================================================================

/// One product row as entered in the import grid
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ItemDraft {
    pub product_code: String,
    pub product_name: String,
    #[serde(default, rename = "categorys")]
    pub category: Option<Json>,
    #[serde(default)]
    pub specification: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    #[serde(default)]
    pub box_size: Option<Json>,
    #[serde(default)]
    pub status: Option<bool>,
    #[serde(default)]
    pub remark: Option<String>,
}

impl ItemDraft {
    pub fn new(product_code: impl Into<String>, product_name: impl Into<String>) -> Self {
        Self {
            product_code: product_code.into(),
            product_name: product_name.into(),
            category: None,
            specification: None,
            unit: None,
            box_size: None,
            status: None,
            remark: None,
        }
    }

    /// Body for `POST /wms/item/`; status defaults to active
    pub fn payload(&self) -> Json {
        json!({
            "item_code": self.product_code,
            "name": self.product_name,
            "material_category": self.category,
            "specification": self.specification,
            "unit": self.unit,
            "box_size": self.box_size,
            "status": self.status.unwrap_or(true),
            "remark": self.remark,
        })
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportFailure {
    pub item: ItemDraft,
    pub error: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ImportSummary {
    /// True when no item failed
    pub success: bool,
    pub message: String,
    pub success_count: usize,
    pub fail_count: usize,
    pub failures: Vec<ImportFailure>,
}

/// Create every draft independently; one failure never stops the rest.
///
/// An item counts as created only on code 201 with a non-null body.
pub async fn batch_import<T>(transport: &T, drafts: Vec<ItemDraft>) -> ImportSummary
where
    T: Transport + ?Sized,
{
    let mut success_count = 0;
    let mut failures = Vec::new();

    for draft in drafts {
        let outcome = transport
            .request(ApiRequest::post(ITEM_URL, draft.payload()))
            .await;

        match outcome {
            Ok(envelope) if envelope.code == 201 && !envelope.data.is_null() => {
                success_count += 1;
            }
            Ok(envelope) => {
                debug!(code = envelope.code, item = %draft.product_code, "Item not created");
                failures.push(ImportFailure {
                    item: draft,
                    error: "Unexpected response format".to_string(),
                });
            }
            Err(e) => {
                error!(item = %draft.product_code, error = %e, "Item import failed");
                failures.push(ImportFailure {
                    error: failure_message(&e),
                    item: draft,
                });
            }
        }
    }

    let fail_count = failures.len();
    let message = format!(
        "Batch import finished: {} succeeded, {} failed",
        success_count, fail_count
    );
    info!(success_count, fail_count, "Batch import finished");

    ImportSummary {
        success: fail_count == 0,
        message,
        success_count,
        fail_count,
        failures,
    }
}

/// Server detail when present, else the error text
fn failure_message(err: &ApiError) -> String {
    match err {
        ApiError::Server { message, .. } => message.clone(),
        other => other.to_string(),
    }
}

//==============================================================================
// Order detail
//==============================================================================

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct OrderDetail {
    #[serde(default = "empty_object")]
    pub order: Json,
    #[serde(default, deserialize_with = "json_list")]
    pub order_items: Vec<Json>,
    #[serde(default, deserialize_with = "json_list")]
    pub inventory_reservations: Vec<Json>,
}

fn empty_object() -> Json {
    json!({})
}

/// `null` or any non-array reads as an empty list
fn json_list<'de, D>(deserializer: D) -> Result<Vec<Json>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(match Json::deserialize(deserializer)? {
        Json::Array(items) => items,
        _ => Vec::new(),
    })
}

pub fn order_detail_url(order_id: &str) -> String {
    format!("/wms/order/{}/order_detail/", order_id)
}

/// Fetch an order with its items and reservations; missing parts are empty
pub async fn order_detail<T>(transport: &T, order_id: &str) -> Result<OrderDetail, ApiError>
where
    T: Transport + ?Sized,
{
    match fetch_order_detail(transport, order_id).await {
        Ok(detail) => {
            debug!(
                order_id,
                items = detail.order_items.len(),
                reservations = detail.inventory_reservations.len(),
                "Fetched order detail"
            );
            Ok(detail)
        }
        Err(e) => {
            error!(order_id, error = %e, "Failed to fetch order detail");
            Err(e)
        }
    }
}

async fn fetch_order_detail<T>(transport: &T, order_id: &str) -> Result<OrderDetail, ApiError>
where
    T: Transport + ?Sized,
{
    let data = transport
        .request(ApiRequest::get(order_detail_url(order_id)))
        .await?
        .into_result()?;
    if data.is_null() {
        return Ok(OrderDetail {
            order: empty_object(),
            ..Default::default()
        });
    }

    let mut detail: OrderDetail = serde_json::from_value(data)
        .map_err(|e| ApiError::Decode(format!("Failed to decode order detail: {}", e)))?;
    if detail.order.is_null() {
        detail.order = empty_object();
    }
    Ok(detail)
}

//==============================================================================
// Recent history
//==============================================================================

/// Recent change records for one model (`Item`, `Product`, `Batch`, ...)
pub async fn recent_history<T>(
    transport: &T,
    model: &str,
    days: Option<u32>,
) -> Result<Json, ApiError>
where
    T: Transport + ?Sized,
{
    let days = days.unwrap_or(DEFAULT_HISTORY_DAYS);
    let request =
        ApiRequest::get(RECENT_HISTORY_URL).with_params(json!({ "days": days, "model": model }));

    let result = match transport.request(request).await {
        Ok(envelope) => envelope.into_result(),
        Err(e) => Err(e),
    };
    if let Err(e) = &result {
        error!(model, days, error = %e, "Failed to fetch recent history");
    }
    result
}
