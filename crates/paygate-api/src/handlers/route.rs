//! Route administration

use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::Json;
use paygate_store::{
    AccountRepository as _, AccountSpec, InstrumentRepository as _, InstrumentSpec, PageSpec,
    ProfileRepository as _, ProfileSpec, RouteRepository as _, RouteSpec, RouterRepository as _,
    RouterSpec,
};
use paygate_types::Route;

use crate::dto::{CreateRouteRequest, LimitAndOffsetQuery, ListResponse, UpdateRouteRequest};
use crate::error::{ApiError, ApiResult};
use crate::extractors::ValidJson;
use crate::state::AppState;

pub async fn create(
    State(state): State<Arc<AppState>>,
    ValidJson(request): ValidJson<CreateRouteRequest>,
) -> ApiResult<Json<Route>> {
    // Exactly one target: a fixed account or a router plugin.
    if request.account_id.is_some() == request.router_key.is_some() {
        return Err(ApiError::BadRequest(
            "route requires exactly one of account_id or router_key".into(),
        ));
    }

    let (_, profiles) = state
        .stores
        .profiles
        .query(&ProfileSpec::ById(request.profile_id))
        .await?;
    let profile = profiles.into_iter().next().ok_or_else(|| {
        ApiError::BadRequest(format!("profile with id={} not found", request.profile_id))
    })?;

    let (_, instruments) = state
        .stores
        .instruments
        .query(&InstrumentSpec::ByKey(request.instrument_key.clone()))
        .await?;
    let instrument = instruments.into_iter().next().ok_or_else(|| {
        ApiError::BadRequest(format!(
            "instrument with key={} not found",
            request.instrument_key
        ))
    })?;

    let account = match request.account_id {
        Some(id) => {
            let (_, accounts) = state.stores.accounts.query(&AccountSpec::ById(id)).await?;
            Some(accounts.into_iter().next().ok_or_else(|| {
                ApiError::BadRequest(format!("account with id={id} not found"))
            })?)
        }
        None => None,
    };

    let router = match request.router_key {
        Some(key) => {
            let (_, routers) = state
                .stores
                .routers
                .query(&RouterSpec::ByKey(key.clone()))
                .await?;
            Some(routers.into_iter().next().ok_or_else(|| {
                ApiError::BadRequest(format!("router with key={key} not found"))
            })?)
        }
        None => None,
    };

    let mut route = Route {
        id: 0,
        profile,
        instrument,
        account,
        router,
        settings: request.settings,
    };
    state.stores.routes.add(&mut route).await?;
    Ok(Json(route))
}

pub async fn list(
    State(state): State<Arc<AppState>>,
    Query(query): Query<LimitAndOffsetQuery>,
) -> ApiResult<Json<ListResponse<Route>>> {
    let page = PageSpec {
        limit: query.limit.unwrap_or(100),
        offset: query.offset.unwrap_or(0),
    };
    let (overall, items) = state.stores.routes.query(&RouteSpec::Page(page)).await?;
    Ok(Json(ListResponse { overall, items }))
}

pub async fn get(State(state): State<Arc<AppState>>, Path(id): Path<i32>) -> ApiResult<Json<Route>> {
    let (_, routes) = state.stores.routes.query(&RouteSpec::ById(id)).await?;
    routes
        .into_iter()
        .next()
        .map(Json)
        .ok_or_else(|| ApiError::NotFound(format!("route with id={id} not found")))
}

pub async fn patch(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
    ValidJson(request): ValidJson<UpdateRouteRequest>,
) -> ApiResult<Json<Route>> {
    let (_, routes) = state.stores.routes.query(&RouteSpec::ById(id)).await?;
    let mut route = routes
        .into_iter()
        .next()
        .ok_or_else(|| ApiError::NotFound(format!("route with id={id} not found")))?;

    if let Some(account_id) = request.account_id {
        let (_, accounts) = state
            .stores
            .accounts
            .query(&AccountSpec::ById(account_id))
            .await?;
        route.account = Some(accounts.into_iter().next().ok_or_else(|| {
            ApiError::BadRequest(format!("account with id={account_id} not found"))
        })?);
        route.router = None;
    }
    if let Some(key) = request.router_key {
        let (_, routers) = state
            .stores
            .routers
            .query(&RouterSpec::ByKey(key.clone()))
            .await?;
        route.router = Some(routers.into_iter().next().ok_or_else(|| {
            ApiError::BadRequest(format!("router with key={key} not found"))
        })?);
        route.account = None;
    }
    if let Some(settings) = request.settings {
        route.settings = Some(settings);
    }

    state.stores.routes.update(&route).await?;
    Ok(Json(route))
}

pub async fn delete(
    State(state): State<Arc<AppState>>,
    Path(id): Path<i32>,
) -> ApiResult<Json<Route>> {
    let route = state.stores.routes.delete(id).await?;
    Ok(Json(route))
}
