use std::net::IpAddr;

use axum::extract::{Query, State};
use axum::{routing::get, Json, Router};
use serde::Deserialize;
use showcase_region::region::UnknownRegion;
use showcase_region::{Region, Resolution, ALL_REGIONS};

use crate::error::{ApiError, ApiResult};
use crate::extract::ClientIp;
use crate::state::AppState;

pub fn routes() -> Router<AppState> {
    Router::new().route("/api/region", get(current_region))
}

/// `?region=` accepted by every region-aware read.
#[derive(Debug, Default, Deserialize)]
pub struct RegionQuery {
    pub region: Option<String>,
}

/// What a `?region=` value asks for.
enum Requested {
    /// Absent or blank: decide from the client address.
    Auto,
    /// `all`: no filtering.
    All,
    Region(Region),
}

fn parse_requested(requested: Option<&str>) -> ApiResult<Requested> {
    match requested.map(str::trim).filter(|r| !r.is_empty()) {
        None => Ok(Requested::Auto),
        Some(r) if r.eq_ignore_ascii_case(ALL_REGIONS) => Ok(Requested::All),
        Some(r) => r
            .parse()
            .map(Requested::Region)
            .map_err(|e: UnknownRegion| ApiError::BadRequest(e.to_string())),
    }
}

/// Region to filter for: an explicit `?region=` wins, `all` disables
/// filtering, otherwise the client address decides.
pub async fn audience(
    state: &AppState,
    requested: Option<&str>,
    ip: Option<IpAddr>,
) -> ApiResult<Option<Region>> {
    match parse_requested(requested)? {
        Requested::All => Ok(None),
        Requested::Region(region) => Ok(Some(region)),
        Requested::Auto => Ok(Some(state.resolve_region(ip).await.region)),
    }
}

/// The caller's region. `all` carries no region of its own, so it reports
/// the resolved one like an absent parameter.
async fn current_region(
    State(state): State<AppState>,
    ClientIp(ip): ClientIp,
    Query(query): Query<RegionQuery>,
) -> ApiResult<Json<Resolution>> {
    let resolution = match parse_requested(query.region.as_deref())? {
        Requested::Region(region) => Resolution::overridden(region),
        Requested::Auto | Requested::All => state.resolve_region(ip).await,
    };
    Ok(Json(resolution))
}
