//! `/v1/movies` handlers.

use axum::{
    extract::{Path, Query, State},
    http::{header, HeaderMap, StatusCode},
    response::{IntoResponse, Response},
    Json,
};
use serde::Deserialize;
use serde_json::json;

use crate::data::filters::validate_filters;
use crate::data::movies::{validate_movie, SORT_SAFELIST};
use crate::data::{Filters, Movie, Runtime};
use crate::http::request::{read_csv, read_id_param, read_int, read_string, JsonBody, QueryString};
use crate::http::response::{envelope, ApiError};
use crate::http::server::AppState;
use crate::validation::Validator;

/// Header carrying the version a PATCH was based on.
pub const EXPECTED_VERSION_HEADER: &str = "x-expected-version";

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct CreateMovieInput {
    title: String,
    year: i32,
    runtime: Runtime,
    genres: Vec<String>,
}

pub async fn create_movie(
    State(state): State<AppState>,
    JsonBody(input): JsonBody<CreateMovieInput>,
) -> Result<Response, ApiError> {
    let movie = Movie::new(input.title, input.year, input.runtime, input.genres);

    let mut v = Validator::new();
    validate_movie(&mut v, &movie);
    v.finish()?;

    let movie = state.models.movies.insert(movie).await?;
    tracing::info!(movie_id = movie.id, "Movie created");

    Ok((
        StatusCode::CREATED,
        [(header::LOCATION, format!("/v1/movies/{}", movie.id))],
        envelope("movie", &movie),
    )
        .into_response())
}

pub async fn show_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = read_id_param(&id)?;
    let movie = state.models.movies.get(id).await?;
    Ok(envelope("movie", &movie).into_response())
}

#[derive(Debug, Default, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct UpdateMovieInput {
    title: Option<String>,
    year: Option<i32>,
    runtime: Option<Runtime>,
    genres: Option<Vec<String>>,
    /// Version the client last read.
    version: Option<i32>,
}

/// Partial update. The write only lands if nobody else changed the movie
/// since it was read here; a client-supplied version is checked first.
pub async fn update_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
    headers: HeaderMap,
    JsonBody(input): JsonBody<UpdateMovieInput>,
) -> Result<Response, ApiError> {
    let id = read_id_param(&id)?;
    let mut movie = state.models.movies.get(id).await?;

    let expected = match input.version {
        Some(version) => Some(version),
        None => expected_version(&headers)?,
    };
    if let Some(expected) = expected {
        if expected != movie.version {
            return Err(ApiError::EditConflict);
        }
    }

    if let Some(title) = input.title {
        movie.title = title;
    }
    if let Some(year) = input.year {
        movie.year = year;
    }
    if let Some(runtime) = input.runtime {
        movie.runtime = runtime;
    }
    if let Some(genres) = input.genres {
        movie.genres = genres;
    }

    let mut v = Validator::new();
    validate_movie(&mut v, &movie);
    v.finish()?;

    state.models.movies.update(&mut movie).await?;
    Ok(envelope("movie", &movie).into_response())
}

fn expected_version(headers: &HeaderMap) -> Result<Option<i32>, ApiError> {
    let Some(raw) = headers.get(EXPECTED_VERSION_HEADER) else {
        return Ok(None);
    };
    raw.to_str()
        .ok()
        .and_then(|s| s.trim().parse().ok())
        .map(Some)
        .ok_or_else(|| ApiError::BadRequest("invalid X-Expected-Version header".into()))
}

pub async fn delete_movie(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Response, ApiError> {
    let id = read_id_param(&id)?;
    state.models.movies.delete(id).await?;
    Ok(envelope("message", "movie successfully deleted").into_response())
}

pub async fn list_movies(
    State(state): State<AppState>,
    Query(qs): Query<QueryString>,
) -> Result<Response, ApiError> {
    let mut v = Validator::new();

    let title = read_string(&qs, "title", "");
    let genres = read_csv(&qs, "genres");
    let filters = Filters {
        page: read_int(&qs, "page", 1, &mut v),
        page_size: read_int(&qs, "page_size", 20, &mut v),
        sort: read_string(&qs, "sort", "id"),
        sort_safelist: SORT_SAFELIST,
    };

    validate_filters(&mut v, &filters);
    v.finish()?;

    let (movies, metadata) = state.models.movies.get_all(&title, &genres, &filters).await?;
    Ok(Json(json!({ "movies": movies, "metadata": metadata })).into_response())
}
