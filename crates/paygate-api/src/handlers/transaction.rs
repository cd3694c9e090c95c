//! Payment interface handlers
//!
//! Thin adapters between the HTTP surface and the orchestrator: every
//! endpoint validates its body, delegates, and returns the transaction
//! entity as the response body. Logical declines travel inside a 200.

use std::sync::Arc;

use axum::extract::{Path, State};
use axum::Json;
use paygate_types::Transaction;

use crate::dto::{
    CardAuthorizeRequest, CompleteMethodUrlRequest, ConfirmRequest, ProcessCresRequest,
    ProcessParesRequest, RebillRequest, RefundRequest, ReverseRequest,
};
use crate::error::ApiResult;
use crate::extractors::ValidJson;
use crate::state::AppState;

pub async fn card_authorize(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<i32>,
    ValidJson(request): ValidJson<CardAuthorizeRequest>,
) -> ApiResult<Json<Transaction>> {
    let tx = state
        .service
        .authorize(pid, request.into_payment_request())
        .await?;
    Ok(Json(tx))
}

pub async fn card_preauthorize(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<i32>,
    ValidJson(request): ValidJson<CardAuthorizeRequest>,
) -> ApiResult<Json<Transaction>> {
    let tx = state
        .service
        .preauthorize(pid, request.into_payment_request())
        .await?;
    Ok(Json(tx))
}

pub async fn confirm(
    State(state): State<Arc<AppState>>,
    Path((pid, tid)): Path<(i32, i64)>,
    ValidJson(request): ValidJson<ConfirmRequest>,
) -> ApiResult<Json<Transaction>> {
    let tx = state.service.confirm(pid, tid, request.amount).await?;
    Ok(Json(tx))
}

pub async fn reverse(
    State(state): State<Arc<AppState>>,
    Path((pid, tid)): Path<(i32, i64)>,
    ValidJson(request): ValidJson<ReverseRequest>,
) -> ApiResult<Json<Transaction>> {
    let tx = state.service.reverse(pid, tid, request.amount).await?;
    Ok(Json(tx))
}

pub async fn refund(
    State(state): State<Arc<AppState>>,
    Path((pid, tid)): Path<(i32, i64)>,
    ValidJson(request): ValidJson<RefundRequest>,
) -> ApiResult<Json<Transaction>> {
    let tx = state.service.refund(pid, tid, request.amount).await?;
    Ok(Json(tx))
}

pub async fn rebill(
    State(state): State<Arc<AppState>>,
    Path((pid, tid)): Path<(i32, i64)>,
    ValidJson(request): ValidJson<RebillRequest>,
) -> ApiResult<Json<Transaction>> {
    let tx = state.service.rebill(pid, tid, request.amount).await?;
    Ok(Json(tx))
}

pub async fn process_pares(
    State(state): State<Arc<AppState>>,
    Path((pid, tid)): Path<(i32, i64)>,
    ValidJson(request): ValidJson<ProcessParesRequest>,
) -> ApiResult<Json<Transaction>> {
    let tx = state.service.process_pares(pid, tid, request.pares).await?;
    Ok(Json(tx))
}

pub async fn process_cres(
    State(state): State<Arc<AppState>>,
    Path((pid, tid)): Path<(i32, i64)>,
    ValidJson(request): ValidJson<ProcessCresRequest>,
) -> ApiResult<Json<Transaction>> {
    let tx = state.service.process_cres(pid, tid, request.cres).await?;
    Ok(Json(tx))
}

pub async fn complete_method_url(
    State(state): State<Arc<AppState>>,
    Path((pid, tid)): Path<(i32, i64)>,
    ValidJson(request): ValidJson<CompleteMethodUrlRequest>,
) -> ApiResult<Json<Transaction>> {
    let tx = state
        .service
        .complete_method_url(pid, tid, request.completed)
        .await?;
    Ok(Json(tx))
}

pub async fn get_transaction(
    State(state): State<Arc<AppState>>,
    Path((pid, tid)): Path<(i32, i64)>,
) -> ApiResult<Json<Transaction>> {
    let tx = state.service.get(pid, tid).await?;
    Ok(Json(tx))
}
