//! Event Routes
//!
//! Endpoints the client calls to report activity.
//!
//! - POST /api/visit - A page was viewed
//! - POST /api/download - Something was downloaded
//!
//! Bodies are optional JSON objects. Unknown fields are ignored.

use axum::{
    body::Bytes,
    extract::{
        rejection::{BytesRejection, QueryRejection},
        ConnectInfo, Query, State,
    },
    http::{HeaderMap, StatusCode},
    Json,
};
use std::net::SocketAddr;
use std::sync::Arc;

use crate::api::dto::{AcceptedResponse, DownloadReceipt, QueryPairs, VisitParams, VisitReceipt};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::ingest::{parse_payload, RequestContext};

/// POST /api/visit
///
/// Record a page view. `path` may come from the body or the query string.
pub async fn record_visit(
    State(state): State<Arc<AppState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    query: Result<Query<QueryPairs>, QueryRejection>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse<VisitReceipt>>)> {
    let Query(pairs) = query?;
    let params = VisitParams::from_pairs(&pairs);
    let payload = parse_payload(&body?)?;
    let ctx = RequestContext::from_request(&headers, peer_ip(connect)).with_query_path(params.path);

    let record = state.ingestor.record_visit(&ctx, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(AcceptedResponse::new(VisitReceipt {
            timestamp: record.header.timestamp,
            ip: record.header.ip,
        })),
    ))
}

/// POST /api/download
///
/// Record a download of the selected days.
pub async fn record_download(
    State(state): State<Arc<AppState>>,
    connect: Option<ConnectInfo<SocketAddr>>,
    headers: HeaderMap,
    body: Result<Bytes, BytesRejection>,
) -> ApiResult<(StatusCode, Json<AcceptedResponse<DownloadReceipt>>)> {
    let payload = parse_payload(&body?)?;
    let ctx = RequestContext::from_request(&headers, peer_ip(connect));

    let record = state.ingestor.record_download(&ctx, &payload).await?;

    Ok((
        StatusCode::CREATED,
        Json(AcceptedResponse::new(DownloadReceipt {
            timestamp: record.header.timestamp,
            ip: record.header.ip,
            days: record.days,
        })),
    ))
}

fn peer_ip(connect: Option<ConnectInfo<SocketAddr>>) -> Option<std::net::IpAddr> {
    connect.map(|ConnectInfo(addr)| addr.ip())
}
