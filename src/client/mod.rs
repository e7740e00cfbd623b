//! Backend API client surface
//!
//! Only the contract lives here: a [`Transport`] trait for whatever HTTP
//! client the host provides, the `{code, data, msg}` envelope, and the
//! service wrappers built on top.

mod services;
mod transport;

pub use services::{
    batch_import, order_detail, order_detail_url, recent_history, ImportFailure, ImportSummary,
    ItemDraft, OrderDetail, DEFAULT_HISTORY_DAYS, ITEM_URL, RECENT_HISTORY_URL,
};
pub use transport::{ApiError, ApiRequest, Envelope, Method, Transport};
