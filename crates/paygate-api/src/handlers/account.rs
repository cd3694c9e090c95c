//! Account administration

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use paygate_store::{
    AccountRepository as _, AccountSpec, ChannelRepository as _, ChannelSpec,
    CurrencyRepository as _, CurrencySpec, PageSpec,
};
use paygate_types::Account;

use crate::dto::{CreateAccountRequest, LimitAndOffsetQuery, ListResponse, UpdateAccountRequest};
use crate::error::{ApiError, ApiResult};
use crate::extractors::ValidJson;
use crate::state::AppState;

pub async fn create(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<CreateAccountRequest>,
) -> ApiResult<Json<Account>> {
    let (_, currencies) = state
        .stores
        .currencies
        .query(&CurrencySpec::ByNumericCode(request.currency_code))
        .await?;
    let currency = currencies.into_iter().next().ok_or_else(|| {
        ApiError::BadRequest(format!(
            "currency with numeric_code={} not found",
            request.currency_code
        ))
    })?;

    let (_, channels) = state
        .stores
        .channels
        .query(&ChannelSpec::ByKey(request.channel_key.clone()))
        .await?;
    let channel = channels.into_iter().next().ok_or_else(|| {
        ApiError::BadRequest(format!(
            "channel with key={} not found",
            request.channel_key
        ))
    })?;

    let mut account = Account {
        id: 0,
        is_enabled: request.is_enabled,
        is_test: request.is_test,
        rebill_enabled: request.rebill_enabled,
        refund_enabled: request.refund_enabled,
        reversal_enabled: request.reversal_enabled,
        partial_confirm_enabled: request.partial_confirm_enabled,
        partial_reversal_enabled: request.partial_reversal_enabled,
        partial_refund_enabled: request.partial_refund_enabled,
        currency_conversion_enabled: request.currency_conversion_enabled,
        currency,
        channel,
        settings: request.settings,
    };
    state.stores.accounts.add(&mut account).await?;
    Ok(Json(account))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitAndOffsetQuery>,
) -> ApiResult<Json<ListResponse<Account>>> {
    let page = PageSpec {
        limit: query.limit.unwrap_or(100),
        offset: query.offset.unwrap_or(0),
    };
    let (overall, items) = state
        .stores
        .accounts
        .query(&AccountSpec::Page(page))
        .await?;
    Ok(Json(ListResponse { overall, items }))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Account>> {
    let (_, accounts) = state.stores.accounts.query(&AccountSpec::ById(id)).await?;
    accounts
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("account with id={id} not found")))
}

pub async fn patch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    ValidJson(request): ValidJson<UpdateAccountRequest>,
) -> ApiResult<Json<Account>> {
    let (_, accounts) = state.stores.accounts.query(&AccountSpec::ById(id)).await?;
    let mut account = accounts
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("account with id={id} not found")))?;

    if let Some(v) = request.is_enabled {
        account.is_enabled = v;
    }
    if let Some(v) = request.is_test {
        account.is_test = v;
    }
    if let Some(v) = request.rebill_enabled {
        account.rebill_enabled = v;
    }
    if let Some(v) = request.refund_enabled {
        account.refund_enabled = v;
    }
    if let Some(v) = request.reversal_enabled {
        account.reversal_enabled = v;
    }
    if let Some(v) = request.partial_confirm_enabled {
        account.partial_confirm_enabled = v;
    }
    if let Some(v) = request.partial_reversal_enabled {
        account.partial_reversal_enabled = v;
    }
    if let Some(v) = request.partial_refund_enabled {
        account.partial_refund_enabled = v;
    }
    if let Some(v) = request.currency_conversion_enabled {
        account.currency_conversion_enabled = v;
    }
    if let Some(code) = request.currency_code {
        let (_, currencies) = state
            .stores
            .currencies
            .query(&CurrencySpec::ByNumericCode(code))
            .await?;
        account.currency = currencies.into_iter().next().ok_or_else(|| {
            ApiError::BadRequest(format!("currency with numeric_code={code} not found"))
        })?;
    }
    if let Some(settings) = request.settings {
        account.settings = settings;
    }

    state.stores.accounts.update(&account).await?;
    Ok(Json(account))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Account>> {
    let account = state.stores.accounts.delete(id).await?;
    Ok(Json(account))
}
