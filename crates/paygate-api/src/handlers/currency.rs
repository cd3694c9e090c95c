//! Currency administration

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use paygate_store::{CurrencyRepository as _, CurrencySpec, PageSpec};
use paygate_types::Currency;

use crate::dto::{CreateCurrencyRequest, LimitAndOffsetQuery, ListResponse, UpdateCurrencyRequest};
use crate::error::{ApiError, ApiResult};
use crate::extractors::ValidJson;
use crate::state::AppState;

pub async fn create(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<CreateCurrencyRequest>,
) -> ApiResult<Json<Currency>> {
    let (total, _) = state
        .stores
        .currencies
        .query(&CurrencySpec::ByNumericCode(request.numeric_code))
        .await?;
    if total > 0 {
        return Err(ApiError::BadRequest(format!(
            "currency with numeric_code={} already exists",
            request.numeric_code
        )));
    }

    let mut currency = Currency {
        id: 0,
        numeric_code: request.numeric_code,
        char_code: request.char_code,
        name: request.name,
        exponent: request.exponent,
    };
    state.stores.currencies.add(&mut currency).await?;
    Ok(Json(currency))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitAndOffsetQuery>,
) -> ApiResult<Json<ListResponse<Currency>>> {
    let page = PageSpec {
        limit: query.limit.unwrap_or(100),
        offset: query.offset.unwrap_or(0),
    };
    let (overall, items) = state
        .stores
        .currencies
        .query(&CurrencySpec::Page(page))
        .await?;
    Ok(Json(ListResponse { overall, items }))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Currency>> {
    let (_, currencies) = state
        .stores
        .currencies
        .query(&CurrencySpec::ById(id))
        .await?;
    currencies
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("currency with id={id} not found")))
}

pub async fn patch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    ValidJson(request): ValidJson<UpdateCurrencyRequest>,
) -> ApiResult<Json<Currency>> {
    let (_, currencies) = state
        .stores
        .currencies
        .query(&CurrencySpec::ById(id))
        .await?;
    let mut currency = currencies
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("currency with id={id} not found")))?;

    if let Some(char_code) = request.char_code {
        currency.char_code = char_code;
    }
    if let Some(name) = request.name {
        currency.name = name;
    }
    if let Some(exponent) = request.exponent {
        currency.exponent = exponent;
    }

    state.stores.currencies.update(&currency).await?;
    Ok(Json(currency))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Currency>> {
    let currency = state.stores.currencies.delete(id).await?;
    Ok(Json(currency))
}
