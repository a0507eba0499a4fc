use std::sync::Arc;

use actix_web::{web, HttpResponse};
use serde::Deserialize;
use uuid::Uuid;

use crate::domain::catalog::{ProductCatalog, ProductQuery, DEFAULT_PAGE_SIZE};
use crate::domain::order::{Caller, NewOrder, OrderCommandHandler, OrderStatus};
use super::error::ApiError;

pub struct AppState {
    pub orders: Arc<OrderCommandHandler>,
    pub catalog: Arc<dyn ProductCatalog>,
}

#[derive(Debug, Deserialize)]
pub struct StatusUpdate {
    pub status: String,
}

pub async fn create_order(
    state: web::Data<AppState>,
    caller: Caller,
    body: web::Json<NewOrder>,
) -> Result<HttpResponse, ApiError> {
    let order = state.orders.create_order(caller.user_id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(order))
}

pub async fn get_order(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let order = state.orders.get_order(path.into_inner(), &caller).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn my_orders(state: web::Data<AppState>, caller: Caller) -> Result<HttpResponse, ApiError> {
    let orders = state.orders.list_own_orders(caller.user_id).await?;
    Ok(HttpResponse::Ok().json(orders))
}

pub async fn all_orders(state: web::Data<AppState>, caller: Caller) -> Result<HttpResponse, ApiError> {
    let listing = state.orders.list_all_orders(&caller).await?;
    Ok(HttpResponse::Ok().json(listing))
}

pub async fn advance_status(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
    body: web::Json<StatusUpdate>,
) -> Result<HttpResponse, ApiError> {
    let target: OrderStatus = body.status.parse().map_err(ApiError::BadRequest)?;
    let order = state.orders.advance_status(path.into_inner(), target, &caller).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn cancel_order(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let order = state.orders.cancel_order(path.into_inner(), &caller).await?;
    Ok(HttpResponse::Ok().json(order))
}

pub async fn delete_order(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let order_id = path.into_inner();
    state.orders.delete_order(order_id, &caller).await?;
    Ok(HttpResponse::Ok().json(serde_json::json!({ "deleted": order_id })))
}

pub async fn order_history(
    state: web::Data<AppState>,
    caller: Caller,
    path: web::Path<Uuid>,
) -> Result<HttpResponse, ApiError> {
    let history = state.orders.order_history(path.into_inner(), &caller).await?;
    Ok(HttpResponse::Ok().json(history))
}

pub async fn search_products(
    state: web::Data<AppState>,
    query: web::Query<ProductQuery>,
) -> Result<HttpResponse, ApiError> {
    let page = state.catalog.search(&query, DEFAULT_PAGE_SIZE).await?;
    Ok(HttpResponse::Ok().json(page))
}
