//! Order placement and administration endpoints.

use std::sync::Arc;

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use base64::Engine as _;
use base64::engine::general_purpose::STANDARD as BASE64;
use common::{Money, OrderId, OrderStatus, ProductId};
use domain::{CreateOrderRequest, InMemoryObjectStorage, OrderItemRequest, OrderService};
use serde::{Deserialize, Serialize};
use store::{OrderRecord, OrderStore};

use crate::error::ApiError;

/// Shared application state accessible from all handlers.
pub struct AppState<S: OrderStore> {
    pub order_service: OrderService<S, InMemoryObjectStorage>,
}

// -- Request types --

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct CreateOrderBody {
    pub customer_id: Option<i64>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub total_amount_cents: i64,
    pub items: Vec<OrderItemBody>,
    /// Base64-encoded proof-of-payment artifact.
    pub payment_evidence_base64: Option<String>,
}

#[derive(Deserialize, Default)]
#[serde(default)]
pub struct OrderItemBody {
    pub product_id: Option<i64>,
    pub product_name: Option<String>,
    pub quantity: u32,
    pub price_cents: i64,
    pub subtotal_cents: i64,
}

#[derive(Deserialize)]
pub struct UpdateStatusBody {
    pub status: String,
}

// -- Response types --

#[derive(Serialize)]
pub struct OrderResponse {
    pub id: i64,
    pub order_number: String,
    pub customer_id: Option<i64>,
    pub customer_name: String,
    pub customer_email: String,
    pub customer_phone: String,
    pub delivery_address: String,
    pub total_amount_cents: i64,
    pub status: String,
    pub payment_evidence_url: Option<String>,
    pub admin_note: Option<String>,
    pub created_at: String,
    pub items: Vec<OrderItemResponse>,
}

#[derive(Serialize)]
pub struct OrderItemResponse {
    pub product_id: Option<i64>,
    pub product_name: String,
    pub quantity: u32,
    pub unit_price_cents: i64,
    pub subtotal_cents: i64,
}

impl From<OrderRecord> for OrderResponse {
    fn from(record: OrderRecord) -> Self {
        let items = record
            .items
            .into_iter()
            .map(|item| OrderItemResponse {
                product_id: item.product_id.map(|p| p.as_i64()),
                product_name: item.product_name,
                quantity: item.quantity,
                unit_price_cents: item.unit_price.cents(),
                subtotal_cents: item.subtotal.cents(),
            })
            .collect();

        Self {
            id: record.id.as_i64(),
            order_number: record.order_number,
            customer_id: record.customer_id,
            customer_name: record.customer_name,
            customer_email: record.customer_email,
            customer_phone: record.customer_phone,
            delivery_address: record.delivery_address,
            total_amount_cents: record.total_amount.cents(),
            status: record.status.to_string(),
            payment_evidence_url: record.payment_evidence_url,
            admin_note: record.admin_note,
            created_at: record.created_at.to_rfc3339(),
            items,
        }
    }
}

// -- Handlers --

/// POST /orders — place a new order.
#[tracing::instrument(skip(state, body))]
pub async fn create<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Json(body): Json<CreateOrderBody>,
) -> Result<(StatusCode, Json<OrderResponse>), ApiError> {
    let payment_evidence = match &body.payment_evidence_base64 {
        Some(encoded) => Some(
            BASE64
                .decode(encoded)
                .map_err(|e| ApiError::BadRequest(format!("Invalid payment evidence: {e}")))?,
        ),
        None => None,
    };

    let items = body
        .items
        .into_iter()
        .map(|item| OrderItemRequest {
            product_id: item.product_id.map(ProductId::new),
            product_name: item.product_name,
            quantity: item.quantity,
            unit_price: Money::from_cents(item.price_cents),
            subtotal: Money::from_cents(item.subtotal_cents),
        })
        .collect();

    let request = CreateOrderRequest {
        customer_id: body.customer_id,
        customer_name: body.customer_name,
        customer_email: body.customer_email,
        customer_phone: body.customer_phone,
        delivery_address: body.delivery_address,
        total_amount: Money::from_cents(body.total_amount_cents),
        items,
        payment_evidence,
    };

    let placed = state.order_service.place_order(request).await?;

    let record = state
        .order_service
        .get_order(placed.id)
        .await?
        .ok_or_else(|| ApiError::Internal("order missing after creation".to_string()))?;

    Ok((StatusCode::CREATED, Json(record.into())))
}

/// GET /orders/:id — load an order with its items.
#[tracing::instrument(skip(state))]
pub async fn get<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
) -> Result<Json<OrderResponse>, ApiError> {
    let record = state
        .order_service
        .get_order(OrderId::new(id))
        .await?
        .ok_or_else(|| ApiError::NotFound(format!("Order {id} not found")))?;

    Ok(Json(record.into()))
}

/// GET /orders — list all orders, newest first.
#[tracing::instrument(skip(state))]
pub async fn list<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
) -> Result<Json<Vec<OrderResponse>>, ApiError> {
    let orders = state.order_service.list_orders().await?;
    Ok(Json(orders.into_iter().map(OrderResponse::from).collect()))
}

/// POST /orders/:id/status — administrative status update, validated
/// against the order state machine.
#[tracing::instrument(skip(state, body))]
pub async fn update_status<S: OrderStore + 'static>(
    State(state): State<Arc<AppState<S>>>,
    Path(id): Path<i64>,
    Json(body): Json<UpdateStatusBody>,
) -> Result<Json<OrderResponse>, ApiError> {
    let status: OrderStatus = body
        .status
        .parse()
        .map_err(|e| ApiError::BadRequest(format!("Invalid status: {e}")))?;

    let record = state
        .order_service
        .update_status(OrderId::new(id), status)
        .await?;

    Ok(Json(record.into()))
}
