//! Profile administration

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use paygate_store::{
    CurrencyRepository as _, CurrencySpec, PageSpec, ProfileRepository as _, ProfileSpec,
};
use paygate_types::Profile;

use crate::dto::{CreateProfileRequest, LimitAndOffsetQuery, ListResponse, UpdateProfileRequest};
use crate::error::{ApiError, ApiResult};
use crate::extractors::ValidJson;
use crate::state::AppState;

async fn currency_by_code(
    state: &AppState,
    numeric_code: i32,
) -> ApiResult<paygate_types::Currency> {
    let (_, currencies) = state
        .stores
        .currencies
        .query(&CurrencySpec::ByNumericCode(numeric_code))
        .await?;
    currencies.into_iter().next().ok_or_else(|| {
        ApiError::BadRequest(format!(
            "currency with numeric_code={numeric_code} not found"
        ))
    })
}

pub async fn create(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<CreateProfileRequest>,
) -> ApiResult<Json<Profile>> {
    let currency = currency_by_code(&state, request.currency_code).await?;

    let mut profile = Profile {
        id: 0,
        key: request.key,
        description: request.description,
        currency,
    };
    state.stores.profiles.add(&mut profile).await.map_err(|e| {
        if matches!(e, paygate_store::StoreError::Conflict(_)) {
            ApiError::BadRequest(e.to_string())
        } else {
            e.into()
        }
    })?;
    Ok(Json(profile))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitAndOffsetQuery>,
) -> ApiResult<Json<ListResponse<Profile>>> {
    let page = PageSpec {
        limit: query.limit.unwrap_or(100),
        offset: query.offset.unwrap_or(0),
    };
    let (overall, items) = state
        .stores
        .profiles
        .query(&ProfileSpec::Page(page))
        .await?;
    Ok(Json(ListResponse { overall, items }))
}

pub async fn get(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<i32>,
) -> ApiResult<Json<Profile>> {
    let (_, profiles) = state.stores.profiles.query(&ProfileSpec::ById(pid)).await?;
    profiles
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("profile with id={pid} not found")))
}

pub async fn patch(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<i32>,
    ValidJson(request): ValidJson<UpdateProfileRequest>,
) -> ApiResult<Json<Profile>> {
    let (_, profiles) = state.stores.profiles.query(&ProfileSpec::ById(pid)).await?;
    let mut profile = profiles
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("profile with id={pid} not found")))?;

    if let Some(key) = request.key {
        profile.key = key;
    }
    if let Some(description) = request.description {
        profile.description = description;
    }
    if let Some(code) = request.currency_code {
        profile.currency = currency_by_code(&state, code).await?;
    }

    state.stores.profiles.update(&profile).await?;
    Ok(Json(profile))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(pid): Path<i32>,
) -> ApiResult<Json<Profile>> {
    let profile = state.stores.profiles.delete(pid).await?;
    Ok(Json(profile))
}
