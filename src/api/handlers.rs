use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Json,
};
use rust_decimal::Decimal;
use serde::Deserialize;
use uuid::Uuid;

use super::extract::CurrentActor;
use super::AppState;
use crate::domain::aggregates::{OrderAggregate, OrderInput, OrderStatus, SubOrderStatus, TrackingInfo};
use crate::domain::value_objects::{ActorType, PaymentStatus};
use crate::services::{MerchantOrderRow, OrderTracking};
use crate::store::Paginated;
use crate::Result;

#[derive(Debug, Deserialize)]
pub struct ListParams<S> {
    pub status: Option<S>,
    pub page: Option<u32>,
    pub limit: Option<u32>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CancelRequest {
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdateRequest {
    pub status: SubOrderStatus,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ReturnRequest {
    pub reason: String,
}

#[derive(Debug, Default, Deserialize)]
pub struct RefundRequest {
    pub amount: Option<Decimal>,
    pub notes: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct PaymentStatusRequest {
    pub payment_status: PaymentStatus,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({"status": "healthy", "service": "marketplace-orders"}))
}

pub async fn create_order(
    State(s): State<AppState>,
    actor: CurrentActor,
    Json(input): Json<OrderInput>,
) -> Result<(StatusCode, Json<OrderAggregate>)> {
    let customer = actor.require(ActorType::Customer)?;
    let order = s.orders.create_order_from_cart(customer.id, input).await?;
    Ok((StatusCode::CREATED, Json(order)))
}

pub async fn list_my_orders(
    State(s): State<AppState>,
    actor: CurrentActor,
    Query(p): Query<ListParams<OrderStatus>>,
) -> Result<Json<Paginated<OrderAggregate>>> {
    let customer = actor.require(ActorType::Customer)?;
    Ok(Json(s.queries.get_customer_orders(customer.id, p.status, p.page, p.limit).await?))
}

pub async fn get_order(
    State(s): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
) -> Result<Json<OrderAggregate>> {
    Ok(Json(s.queries.get_order_details(id, &actor).await?))
}

pub async fn track_order(
    State(s): State<AppState>,
    actor: CurrentActor,
    Path(order_number): Path<String>,
) -> Result<Json<OrderTracking>> {
    let customer = actor.require(ActorType::Customer)?;
    Ok(Json(s.queries.track_order(&order_number, customer.id).await?))
}

pub async fn cancel_order(
    State(s): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path(id): Path<Uuid>,
    body: Option<Json<CancelRequest>>,
) -> Result<Json<OrderAggregate>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    Ok(Json(s.orders.cancel_order(id, actor, req.reason).await?))
}

pub async fn update_sub_order_status(
    State(s): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((id, sub_order_id)): Path<(Uuid, String)>,
    Json(req): Json<StatusUpdateRequest>,
) -> Result<Json<OrderAggregate>> {
    let order = s
        .orders
        .update_sub_order_status(id, &sub_order_id, req.status, actor, req.notes)
        .await?;
    Ok(Json(order))
}

pub async fn add_tracking(
    State(s): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((id, sub_order_id)): Path<(Uuid, String)>,
    Json(tracking): Json<TrackingInfo>,
) -> Result<Json<OrderAggregate>> {
    Ok(Json(s.orders.add_tracking_info(id, &sub_order_id, tracking, actor).await?))
}

pub async fn request_return(
    State(s): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((id, sub_order_id)): Path<(Uuid, String)>,
    Json(req): Json<ReturnRequest>,
) -> Result<Json<OrderAggregate>> {
    Ok(Json(s.orders.request_return(id, &sub_order_id, actor, req.reason).await?))
}

pub async fn process_refund(
    State(s): State<AppState>,
    CurrentActor(actor): CurrentActor,
    Path((id, sub_order_id)): Path<(Uuid, String)>,
    body: Option<Json<RefundRequest>>,
) -> Result<Json<OrderAggregate>> {
    let req = body.map(|Json(req)| req).unwrap_or_default();
    let order = s
        .orders
        .process_refund(id, &sub_order_id, actor, req.amount, req.notes)
        .await?;
    Ok(Json(order))
}

pub async fn list_merchant_orders(
    State(s): State<AppState>,
    actor: CurrentActor,
    Query(p): Query<ListParams<SubOrderStatus>>,
) -> Result<Json<Paginated<MerchantOrderRow>>> {
    let merchant = actor.require(ActorType::Merchant)?;
    Ok(Json(s.queries.get_merchant_orders(merchant.id, p.status, p.page, p.limit).await?))
}

pub async fn list_all_orders(
    State(s): State<AppState>,
    actor: CurrentActor,
    Query(p): Query<ListParams<OrderStatus>>,
) -> Result<Json<Paginated<OrderAggregate>>> {
    actor.require(ActorType::Admin)?;
    Ok(Json(s.queries.list_all_orders(p.status, p.page, p.limit).await?))
}

pub async fn update_payment_status(
    State(s): State<AppState>,
    actor: CurrentActor,
    Path(id): Path<Uuid>,
    Json(req): Json<PaymentStatusRequest>,
) -> Result<Json<OrderAggregate>> {
    let admin = actor.require(ActorType::Admin)?;
    Ok(Json(s.orders.update_payment_status(id, req.payment_status, admin).await?))
}
