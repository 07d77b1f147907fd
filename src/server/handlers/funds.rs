use std::sync::Arc;

use axum::extract::{Path, Query, State};
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use serde_json::{json, Value};

use crate::core::errors::ApiError;
use crate::state::AppState;
use crate::store::FundRecord;

const DEFAULT_PAGE_SIZE: i64 = 50;
const MAX_PAGE_SIZE: i64 = 200;

const MIN_COMPARE_FUNDS: usize = 2;
const MAX_COMPARE_FUNDS: usize = 4;

/// Facts shown side by side when comparing funds.
const COMPARE_FACTS: &[&str] = &[
    "expense_ratio",
    "return_1y",
    "return_3y",
    "return_5y",
    "aum",
    "riskometer",
    "exit_load",
    "min_sip_amount",
];

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct CompareRequest {
    #[serde(default)]
    pub fund_ids: Vec<i64>,
}

pub async fn list_funds(
    State(state): State<Arc<AppState>>,
    Query(query): Query<ListQuery>,
) -> Result<impl IntoResponse, ApiError> {
    let limit = query
        .limit
        .unwrap_or(DEFAULT_PAGE_SIZE)
        .clamp(1, MAX_PAGE_SIZE);
    let offset = query.offset.unwrap_or(0).max(0);

    let funds = state
        .store
        .list(limit, offset)
        .await
        .map_err(ApiError::internal)?;

    Ok(Json(json!({
        "count": funds.len(),
        "limit": limit,
        "offset": offset,
        "funds": funds,
    })))
}

pub async fn get_fund(
    State(state): State<Arc<AppState>>,
    Path(fund_id): Path<i64>,
) -> Result<impl IntoResponse, ApiError> {
    let fund = state
        .store
        .get(fund_id)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::NotFound(format!("Fund {} not found", fund_id)))?;

    Ok(Json(fund))
}

pub async fn get_fund_by_name(
    State(state): State<Arc<AppState>>,
    Path(name): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let name = name.trim();
    if name.is_empty() {
        return Err(ApiError::BadRequest("Fund name must not be empty".to_string()));
    }

    let fund = state
        .store
        .get_by_name(name)
        .await
        .map_err(ApiError::internal)?
        .ok_or_else(|| ApiError::NotFound(format!("Fund '{}' not found", name)))?;

    Ok(Json(fund))
}

pub async fn compare_funds(
    State(state): State<Arc<AppState>>,
    Json(request): Json<CompareRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let mut fund_ids: Vec<i64> = Vec::with_capacity(request.fund_ids.len());
    for id in request.fund_ids {
        if !fund_ids.contains(&id) {
            fund_ids.push(id);
        }
    }

    if fund_ids.len() < MIN_COMPARE_FUNDS || fund_ids.len() > MAX_COMPARE_FUNDS {
        return Err(ApiError::BadRequest(format!(
            "Comparison needs between {} and {} distinct fund ids",
            MIN_COMPARE_FUNDS, MAX_COMPARE_FUNDS
        )));
    }

    let mut funds: Vec<FundRecord> = Vec::new();
    let mut missing: Vec<i64> = Vec::new();
    for id in fund_ids {
        match state.store.get(id).await.map_err(ApiError::internal)? {
            Some(fund) => funds.push(fund),
            None => missing.push(id),
        }
    }

    if funds.len() < MIN_COMPARE_FUNDS {
        return Err(ApiError::NotFound(format!(
            "Not enough funds to compare; missing ids: {:?}",
            missing
        )));
    }

    let columns = funds
        .iter()
        .map(|fund| {
            let facts: Value = COMPARE_FACTS
                .iter()
                .map(|&name| {
                    let value = fund
                        .fact(name)
                        .map(|fact| Value::String(fact.value.clone()))
                        .unwrap_or(Value::Null);
                    (name.to_string(), value)
                })
                .collect::<serde_json::Map<String, Value>>()
                .into();
            json!({
                "id": fund.id,
                "name": fund.name,
                "source_url": fund.source_url,
                "facts": facts,
            })
        })
        .collect::<Vec<_>>();

    Ok(Json(json!({
        "funds": columns,
        "missing": missing,
    })))
}
