use axum::{
    Json,
    extract::{Path, Query, State},
    response::IntoResponse,
};
use db::models::{location, user};
use serde::{Deserialize, Serialize};
use util::geo::{GeoPoint, distance_m};

use crate::error::{ApiError, ApiResult};
use crate::response::ApiResponse;
use crate::routes::absensi::get::UserQuery;
use crate::routes::common::{parse_opt, parse_required};
use crate::state::AppState;

const MAX_PAGE_SIZE: u64 = 100;
const MAX_NEAREST: usize = 10;

#[derive(Debug, Deserialize)]
pub struct ListQuery {
    pub q: Option<String>,
    pub page: Option<String>,
    pub page_size: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LocationPage {
    pub locations: Vec<location::Model>,
    pub page: u64,
    pub page_size: u64,
    pub total: u64,
}

/// GET /api/location?q=&page=&page_size=
///
/// Name search over active locations. `page` starts at 1; `page_size` defaults to 20
/// and is capped at 100.
pub async fn list_locations(State(state): State<AppState>, Query(q): Query<ListQuery>) -> ApiResult<impl IntoResponse> {
    let page = parse_opt::<u64>(q.page.as_deref(), "page")?.unwrap_or(1).max(1);
    let page_size = parse_opt::<u64>(q.page_size.as_deref(), "page_size")?
        .unwrap_or(20)
        .clamp(1, MAX_PAGE_SIZE);

    let (locations, total) = location::Model::search(state.db(), q.q.as_deref(), page, page_size).await?;
    Ok(Json(ApiResponse::success(
        LocationPage {
            locations,
            page,
            page_size,
            total,
        },
        "Locations retrieved",
    )))
}

/// GET /api/location/{location_id}
pub async fn get_location(State(state): State<AppState>, Path(location_id): Path<i64>) -> ApiResult<impl IntoResponse> {
    let loc = location::Model::find_active(state.db(), location_id)
        .await?
        .ok_or_else(|| ApiError::not_found("LOCATION_NOT_FOUND", format!("Location {location_id} not found")))?;
    Ok(Json(ApiResponse::success(loc, "Location retrieved")))
}

#[derive(Debug, Deserialize)]
pub struct NearestQuery {
    pub lat: Option<String>,
    pub lng: Option<String>,
    pub radius_m: Option<String>,
    pub limit: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct NearbyLocation {
    #[serde(flatten)]
    pub location: location::Model,
    pub distance_m: f64,
}

/// GET /api/location/nearest?lat=&lng=&radius_m=&limit=
///
/// Active locations ordered by great-circle distance. `limit` is 1..=10 (default 5);
/// `radius_m` drops anything farther away.
pub async fn nearest_locations(
    State(state): State<AppState>,
    Query(q): Query<NearestQuery>,
) -> ApiResult<impl IntoResponse> {
    let point = GeoPoint::new(
        parse_required(q.lat.as_deref(), "lat")?,
        parse_required(q.lng.as_deref(), "lng")?,
    );
    if !point.is_valid() {
        return Err(ApiError::bad_request("lat/lng are not valid coordinates"));
    }
    let radius = parse_opt::<f64>(q.radius_m.as_deref(), "radius_m")?;
    let limit = parse_opt::<usize>(q.limit.as_deref(), "limit")?
        .unwrap_or(5)
        .clamp(1, MAX_NEAREST);

    let mut nearby: Vec<NearbyLocation> = location::Model::all_active(state.db())
        .await?
        .into_iter()
        .map(|loc| NearbyLocation {
            distance_m: distance_m(point, loc.point()),
            location: loc,
        })
        .filter(|n| radius.is_none_or(|r| n.distance_m <= r))
        .collect();
    nearby.sort_by(|a, b| a.distance_m.total_cmp(&b.distance_m));
    nearby.truncate(limit);

    Ok(Json(ApiResponse::success(nearby, "Nearest locations retrieved")))
}

/// GET /api/location/my?user_id=
///
/// The user's default office, or `null` when none is assigned.
pub async fn my_location(State(state): State<AppState>, Query(q): Query<UserQuery>) -> ApiResult<impl IntoResponse> {
    let user_id = parse_required(q.user_id.as_deref(), "user_id")?;
    let user = user::Model::find(state.db(), user_id)
        .await?
        .ok_or_else(|| ApiError::not_found("USER_NOT_FOUND", format!("User {user_id} not found")))?;

    let loc = match user.location_id {
        Some(id) => location::Model::find_active(state.db(), id).await?,
        None => None,
    };
    Ok(Json(ApiResponse::success(loc, "Default location retrieved")))
}
