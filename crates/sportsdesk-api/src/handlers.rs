use axum::{
    extract::{Path, State},
    http::{StatusCode, Uri},
    response::Html,
    Extension, Json,
};
use serde::Serialize;
use serde_json::Value;
use sportsdesk_core::{entry_len, load_collection, races_in_country, Collection, CollectionData};
use tracing::{debug, warn};

use crate::{auth::AuthContext, ApiError, ApiResult, AppState};

#[derive(Serialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

#[derive(Serialize)]
pub struct RacesResponse {
    pub races: CollectionData,
    pub count: usize,
}

#[derive(Serialize)]
pub struct FootballResponse {
    pub football: CollectionData,
    pub count: usize,
}

#[derive(Serialize)]
pub struct TeamGamesResponse {
    pub football: Value,
    pub count: usize,
    pub team_base64: Option<Value>,
}

#[derive(Serialize)]
pub struct EpicGamesResponse {
    pub epic_games: CollectionData,
    pub count: usize,
}

pub async fn landing_page() -> Html<&'static str> {
    Html(include_str!("../static/index.html"))
}

pub async fn health(State(state): State<AppState>) -> (StatusCode, Json<HealthResponse>) {
    let (status, label) = if state.is_ready() {
        (StatusCode::OK, "healthy")
    } else {
        (StatusCode::SERVICE_UNAVAILABLE, "not_ready")
    };

    (
        status,
        Json(HealthResponse {
            status: label.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }),
    )
}

pub async fn get_races(
    State(state): State<AppState>,
    Extension(user): Extension<AuthContext>,
) -> ApiResult<Json<RacesResponse>> {
    let races = load_collection(state.services()?.store.as_ref(), Collection::Races).await?;
    debug!(uid = %user.uid, count = races.len(), "Serving races");

    Ok(Json(RacesResponse {
        count: races.len(),
        races,
    }))
}

pub async fn get_country_races(
    State(state): State<AppState>,
    Extension(user): Extension<AuthContext>,
    Path(country): Path<String>,
) -> ApiResult<Json<RacesResponse>> {
    let races = load_collection(state.services()?.store.as_ref(), Collection::Races).await?;
    let matches = races_in_country(&races, &country);
    debug!(uid = %user.uid, %country, count = matches.len(), "Serving races by country");

    if matches.is_empty() {
        return Err(ApiError::NotFound(
            "No races found for this country".to_string(),
        ));
    }

    Ok(Json(RacesResponse {
        count: matches.len(),
        races: CollectionData::Ordered(matches),
    }))
}

pub async fn get_games(
    State(state): State<AppState>,
    Extension(user): Extension<AuthContext>,
) -> ApiResult<Json<FootballResponse>> {
    let games = load_collection(state.services()?.store.as_ref(), Collection::Games).await?;
    debug!(uid = %user.uid, teams = games.len(), "Serving football games");

    Ok(Json(FootballResponse {
        count: games.len(),
        football: games,
    }))
}

pub async fn get_team_games(
    State(state): State<AppState>,
    Extension(user): Extension<AuthContext>,
    Path(team): Path<String>,
) -> ApiResult<Json<TeamGamesResponse>> {
    let services = state.services()?;
    let games = load_collection(services.store.as_ref(), Collection::Games).await?;
    let Some(team_games) = games.get(&team).cloned() else {
        return Err(ApiError::NotFound("No team found".to_string()));
    };

    let logos = load_collection(services.store.as_ref(), Collection::Logos).await?;
    let logo = logos.get(&team).cloned();
    if logo.is_none() {
        warn!(%team, "No logo stored for team");
    }
    debug!(uid = %user.uid, %team, "Serving team games");

    Ok(Json(TeamGamesResponse {
        count: entry_len(&team_games),
        football: team_games,
        team_base64: logo,
    }))
}

pub async fn get_epic_games(
    State(state): State<AppState>,
    Extension(user): Extension<AuthContext>,
) -> ApiResult<Json<EpicGamesResponse>> {
    let epic_games =
        load_collection(state.services()?.store.as_ref(), Collection::EpicGames).await?;
    debug!(uid = %user.uid, count = epic_games.len(), "Serving epic games");

    Ok(Json(EpicGamesResponse {
        count: epic_games.len(),
        epic_games,
    }))
}

pub async fn not_found(uri: Uri) -> ApiError {
    if uri.path().starts_with("/api") {
        ApiError::NotFound("Unknown API Request".to_string())
    } else {
        ApiError::NotFound("Unknown Request".to_string())
    }
}
