use anyhow::Result;
use std::time::Duration;

use chrono::NaiveDate;
use tokio_util::sync::CancellationToken;
use tower_http::services::ServeDir;
use tracing::{debug, info, warn};

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    middleware,
    response::IntoResponse,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Serialize};

use super::api_error::{require_username, ApiError, ApiResult};
use super::metrics::metrics_handler;
use super::{http_cache, log_requests, state::*};
use crate::background_jobs::HookEvent;
use crate::corrections::CorrectionRequest;
use crate::error::StatsError;
use crate::period::{CalendarPeriod, Period, Preset};
use crate::stats::{OverviewBlock, RecentUser, UserStats};

#[derive(Serialize)]
struct ServerStats {
    pub uptime: String,
    pub hash: String,
}

fn format_uptime(duration: Duration) -> String {
    let total_seconds = duration.as_secs();

    let days = total_seconds / 86_400;
    let hours = (total_seconds % 86_400) / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let seconds = total_seconds % 60;

    format!("{}d {:02}:{:02}:{:02}", days, hours, minutes, seconds)
}

#[derive(Deserialize, Debug, Default)]
struct StatsQuery {
    pub username: Option<String>,
    pub range: Option<String>,
    pub from: Option<String>,
    pub to: Option<String>,
}

#[derive(Deserialize, Debug, Default)]
struct CalendarQuery {
    pub username: Option<String>,
    pub year: Option<i32>,
    pub month: Option<u32>,
    pub week: Option<u32>,
}

#[derive(Deserialize, Debug, Default)]
struct OverviewQuery {
    pub username: Option<String>,
    pub year: Option<i32>,
    #[serde(default)]
    pub per_week: bool,
}

#[derive(Serialize)]
struct OverviewCell {
    #[serde(flatten)]
    pub period: CalendarPeriod,
    pub complete: bool,
}

#[derive(Serialize)]
struct OverviewResponse {
    pub username: String,
    pub year: Option<i32>,
    pub per_week: bool,
    pub periods: Vec<OverviewCell>,
}

fn parse_date(value: &str, field: &str) -> Result<NaiveDate, StatsError> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|_| StatsError::validation(format!("Invalid {} date: {}", field, value)))
}

/// `from`/`to` win over `range`. An empty or absent range means all time.
fn parse_stats_period(query: &StatsQuery) -> Result<Period, StatsError> {
    match (&query.from, &query.to) {
        (Some(from), Some(to)) => {
            return Ok(Period::Custom {
                from: parse_date(from, "from")?,
                to: parse_date(to, "to")?,
            })
        }
        (None, None) => {}
        _ => {
            return Err(StatsError::validation(
                "Both from and to are needed for a custom range",
            ))
        }
    }

    match query.range.as_deref().map(str::trim).unwrap_or("") {
        "" => Ok(Period::Preset(Preset::AllTime)),
        "random" => Ok(Period::Random),
        other => other
            .parse()
            .ok()
            .and_then(Preset::from_days)
            .map(Period::Preset)
            .ok_or_else(|| StatsError::validation(format!("Invalid range: {}", other))),
    }
}

fn parse_calendar_period(query: &CalendarQuery) -> Result<CalendarPeriod, StatsError> {
    let year = query
        .year
        .ok_or_else(|| StatsError::validation("Year required"))?;
    match (query.month, query.week) {
        (Some(_), Some(_)) => Err(StatsError::validation(
            "Month and week cannot be combined",
        )),
        (Some(month), None) => Ok(CalendarPeriod::month(year, month)),
        (None, Some(week)) => Ok(CalendarPeriod::week(year, week)),
        (None, None) => Ok(CalendarPeriod::year(year)),
    }
}

async fn home(State(state): State<ServerState>) -> impl IntoResponse {
    let stats = ServerStats {
        uptime: format_uptime(state.start_time.elapsed()),
        hash: state.hash.clone(),
    };
    Json(stats)
}

async fn get_stats(
    State(stats): State<GuardedStatsService>,
    Query(query): Query<StatsQuery>,
) -> ApiResult<Json<UserStats>> {
    let username = require_username(query.username.clone())?;
    let period = parse_stats_period(&query)?;
    let user_stats = stats.user_stats(&username, &period).await?;
    stats.record_visit(&username).await;
    Ok(Json(user_stats))
}

async fn get_recent_users(State(stats): State<GuardedStatsService>) -> Json<Vec<RecentUser>> {
    Json(stats.recent_users().await)
}

async fn get_stat(
    State(stats): State<GuardedStatsService>,
    Query(query): Query<CalendarQuery>,
) -> ApiResult<Json<UserStats>> {
    let username = require_username(query.username.clone())?;
    let period = Period::calendar(parse_calendar_period(&query)?);
    Ok(Json(stats.user_stats(&username, &period).await?))
}

async fn get_overview(
    State(stats): State<GuardedStatsService>,
    Query(query): Query<OverviewQuery>,
) -> ApiResult<Json<OverviewResponse>> {
    let username = require_username(query.username.clone())?;
    let cells = stats
        .overview(&username, query.year, query.per_week)
        .await?;

    Ok(Json(OverviewResponse {
        username,
        year: query.year,
        per_week: query.per_week,
        periods: cells
            .into_iter()
            .map(|cell| OverviewCell {
                complete: cell.is_complete(),
                period: cell.period,
            })
            .collect(),
    }))
}

async fn get_overview_block(
    State(stats): State<GuardedStatsService>,
    Query(query): Query<CalendarQuery>,
) -> ApiResult<Json<OverviewBlock>> {
    let username = require_username(query.username.clone())?;
    let period = parse_calendar_period(&query)?;
    Ok(Json(stats.overview_block(&username, period).await?))
}

async fn post_correction(
    State(state): State<ServerState>,
    Json(body): Json<CorrectionRequest>,
) -> ApiResult<impl IntoResponse> {
    let correction = state.corrections.append(body)?;

    if let Some(sender) = &state.hook_sender {
        if let Err(e) = sender.try_send(HookEvent::OnCorrectionSubmitted) {
            // The periodic run picks it up anyway
            warn!("Could not notify scheduler of correction: {}", e);
        }
    }

    Ok((
        StatusCode::ACCEPTED,
        Json(serde_json::json!({
            "artist": correction.artist,
            "album": correction.album,
            "original_count": correction.original_count,
            "count": correction.count,
        })),
    ))
}

async fn get_feed(
    State(digest): State<GuardedDigestBuilder>,
    Path(username): Path<String>,
) -> ApiResult<impl IntoResponse> {
    let username = require_username(Some(username))?;
    let feed = digest.feed(&username).await?;
    debug!("Built feed for {} ({} bytes)", username, feed.len());
    Ok((
        [(header::CONTENT_TYPE, "application/rss+xml; charset=utf-8")],
        feed,
    ))
}

pub fn make_app(state: ServerState) -> Router {
    let config = state.config.clone();

    let stats_routes: Router = Router::new()
        .route("/stats", get(get_stats))
        .route("/stat", get(get_stat))
        .route("/overview", get(get_overview))
        .route("/overview/block", get(get_overview_block))
        .route("/feed/{username}", get(get_feed))
        .route("/recent", get(get_recent_users))
        .layer(middleware::from_fn_with_state(
            config.content_cache_age_sec,
            http_cache,
        ))
        .with_state(state.clone());

    let correction_routes: Router = Router::new()
        .route("/corrections", post(post_correction))
        .with_state(state.clone());

    let home_router: Router = match config.frontend_dir_path {
        Some(frontend_path) => {
            let static_files_service =
                ServeDir::new(frontend_path).append_index_html_on_directories(true);
            Router::new().fallback_service(static_files_service)
        }
        None => Router::new()
            .route("/", get(home))
            .with_state(state.clone()),
    };

    let mut app: Router = home_router
        .nest("/v1", stats_routes.merge(correction_routes))
        .route("/metrics", get(metrics_handler));

    app = app.layer(middleware::from_fn_with_state(state.clone(), log_requests));

    app
}

/// Serves until `shutdown` is cancelled.
pub async fn run_server(state: ServerState, shutdown: CancellationToken) -> Result<()> {
    let port = state.config.port;
    let app = make_app(state);

    let listener = tokio::net::TcpListener::bind(format!("127.0.0.1:{}", port)).await?;
    info!("Listening on {}", listener.local_addr()?);

    axum::serve(listener, app)
        .with_graceful_shutdown(async move { shutdown.cancelled().await })
        .await?;
    Ok(())
}
