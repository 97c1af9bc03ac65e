//! Stats Routes
//!
//! - GET /api/stats?date=YYYY-MM-DD - Stats for one local day
//! - GET /api/stats?scope=overall - Stats over every record (also `date=all`)

use axum::{
    extract::{rejection::QueryRejection, Query, State},
    Json,
};
use std::sync::Arc;

use crate::api::dto::{QueryPairs, StatsParams};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::stats::{Scope, StatsSummary};

/// GET /api/stats
///
/// A repeated parameter takes its first value.
pub async fn get_stats(
    State(state): State<Arc<AppState>>,
    query: Result<Query<QueryPairs>, QueryRejection>,
) -> ApiResult<Json<StatsSummary>> {
    let Query(pairs) = query?;
    let params = StatsParams::from_pairs(&pairs);
    let scope = Scope::from_params(params.date.as_deref(), params.scope.as_deref())?;
    let summary = state.aggregator.summarize(&scope).await?;
    Ok(Json(summary))
}
