use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

use crate::models::{CastMember, Genre, MovieDetail, MovieSummary, SearchResults, TimeWindow};

pub const DEFAULT_API_BASE: &str = "https://api.themoviedb.org/3";
pub const DEFAULT_IMAGE_BASE: &str = "https://image.tmdb.org/t/p";

pub const POSTER_SIZE: &str = "w500";
pub const BACKDROP_SIZE: &str = "original";
pub const PROFILE_SIZE: &str = "w185";

const CAST_LIMIT: usize = 10;
const TRAILER_SITE: &str = "YouTube";

/// Which client call failed; drives the user-facing message.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    Trending,
    Search,
    Popular,
    Details,
}

impl Operation {
    pub fn failure_message(&self) -> &'static str {
        match self {
            Operation::Trending => "Failed to fetch trending movies",
            Operation::Search => "Failed to search movies",
            Operation::Popular => "Failed to fetch popular movies",
            Operation::Details => "Failed to fetch movie details",
        }
    }
}

/// Upstream failure, tagged by cause. `Display` only ever shows the
/// operation's message; the cause stays available for logs.
#[derive(Debug, Error)]
pub enum TmdbError {
    #[error("{}", .op.failure_message())]
    Unauthorized { op: Operation },
    #[error("{}", .op.failure_message())]
    NotFound { op: Operation },
    #[error("{}", .op.failure_message())]
    RateLimited { op: Operation },
    #[error("{}", .op.failure_message())]
    Transport {
        op: Operation,
        #[source]
        source: reqwest::Error,
    },
    #[error("{}", .op.failure_message())]
    Unknown {
        op: Operation,
        status: Option<u16>,
        detail: String,
    },
}

impl TmdbError {
    pub fn operation(&self) -> Operation {
        match self {
            TmdbError::Unauthorized { op }
            | TmdbError::NotFound { op }
            | TmdbError::RateLimited { op }
            | TmdbError::Transport { op, .. }
            | TmdbError::Unknown { op, .. } => *op,
        }
    }

    fn from_status(op: Operation, status: StatusCode, body: String) -> Self {
        match status {
            StatusCode::UNAUTHORIZED => TmdbError::Unauthorized { op },
            StatusCode::NOT_FOUND => TmdbError::NotFound { op },
            StatusCode::TOO_MANY_REQUESTS => TmdbError::RateLimited { op },
            _ => TmdbError::Unknown {
                op,
                status: Some(status.as_u16()),
                detail: body,
            },
        }
    }
}

#[async_trait]
pub trait TmdbApi: Send + Sync {
    async fn trending(&self, window: TimeWindow, page: u32) -> Result<Vec<MovieSummary>, TmdbError>;
    async fn search_movies(&self, query: &str, page: u32) -> Result<SearchResults, TmdbError>;
    async fn popular(&self, page: u32) -> Result<Vec<MovieSummary>, TmdbError>;
    async fn movie_details(&self, id: i64) -> Result<MovieDetail, TmdbError>;
}

#[derive(Debug, Clone)]
pub struct TmdbClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl TmdbClient {
    pub fn new(base_url: &str, api_key: Option<String>) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        }
    }

    /// Absent keys are sent empty; TMDB rejects them with 401.
    fn key(&self) -> &str {
        self.api_key.as_deref().unwrap_or_default()
    }

    async fn get_json<T: for<'de> Deserialize<'de>>(
        &self,
        op: Operation,
        path_and_query: &str,
    ) -> Result<T, TmdbError> {
        debug!("TMDB GET {}", path_and_query);
        let url = format!(
            "{}{path_and_query}&api_key={}",
            self.base_url,
            urlencoding::encode(self.key())
        );
        let res = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|source| TmdbError::Transport { op, source })?;
        let status = res.status();
        let text = res
            .text()
            .await
            .map_err(|source| TmdbError::Transport { op, source })?;
        if !status.is_success() {
            return Err(TmdbError::from_status(op, status, text));
        }
        serde_json::from_str(&text).map_err(|e| TmdbError::Unknown {
            op,
            status: Some(status.as_u16()),
            detail: format!("JSON parse failed: {e}"),
        })
    }
}

#[async_trait]
impl TmdbApi for TmdbClient {
    async fn trending(&self, window: TimeWindow, page: u32) -> Result<Vec<MovieSummary>, TmdbError> {
        let path = format!("/trending/movie/{}?page={page}", window.as_str());
        let data: ListResponse = self.get_json(Operation::Trending, &path).await?;
        Ok(data.results)
    }

    async fn search_movies(&self, query: &str, page: u32) -> Result<SearchResults, TmdbError> {
        let path = format!(
            "/search/movie?query={}&page={page}",
            urlencoding::encode(query)
        );
        let data: ListResponse = self.get_json(Operation::Search, &path).await?;
        Ok(SearchResults {
            results: data.results,
            total_pages: data.total_pages,
            total_results: data.total_results,
        })
    }

    async fn popular(&self, page: u32) -> Result<Vec<MovieSummary>, TmdbError> {
        let path = format!("/movie/popular?page={page}");
        let data: ListResponse = self.get_json(Operation::Popular, &path).await?;
        Ok(data.results)
    }

    async fn movie_details(&self, id: i64) -> Result<MovieDetail, TmdbError> {
        let path = format!("/movie/{id}?append_to_response=credits,videos");
        let data: MovieAppended = self.get_json(Operation::Details, &path).await?;
        Ok(map_detail(data))
    }
}

/// Builds absolute image URLs from TMDB relative paths.
#[derive(Debug, Clone)]
pub struct ImageUrls {
    base: String,
}

impl ImageUrls {
    pub fn new(base: &str) -> Self {
        Self {
            base: base.trim_end_matches('/').to_string(),
        }
    }

    pub fn url(&self, path: Option<&str>, size: &str) -> Option<String> {
        let path = path?.trim_start_matches('/');
        if path.is_empty() {
            return None;
        }
        Some(format!("{}/{size}/{path}", self.base))
    }

    pub fn poster_url(&self, path: Option<&str>, size: &str) -> Option<String> {
        self.url(path, size)
    }

    pub fn backdrop_url(&self, path: Option<&str>, size: &str) -> Option<String> {
        self.url(path, size)
    }

    pub fn profile_url(&self, path: Option<&str>) -> Option<String> {
        self.url(path, PROFILE_SIZE)
    }
}

impl Default for ImageUrls {
    fn default() -> Self {
        Self::new(DEFAULT_IMAGE_BASE)
    }
}

#[derive(Debug, Deserialize)]
struct ListResponse {
    #[serde(default)]
    results: Vec<MovieSummary>,
    #[serde(default)]
    total_pages: u32,
    #[serde(default)]
    total_results: u32,
}

#[derive(Debug, Deserialize)]
struct DetailFields {
    id: i64,
    title: String,
    #[serde(default)]
    overview: Option<String>,
    poster_path: Option<String>,
    backdrop_path: Option<String>,
    release_date: Option<String>,
    vote_average: Option<f64>,
    runtime: Option<u32>,
    #[serde(default)]
    genres: Vec<Genre>,
}

#[derive(Debug, Deserialize, Default)]
struct Credits {
    #[serde(default)]
    cast: Vec<CastMember>,
}

#[derive(Debug, Deserialize, Default)]
struct Videos {
    #[serde(default)]
    results: Vec<Video>,
}

#[derive(Debug, Deserialize)]
struct Video {
    key: String,
    site: String,
    #[serde(rename = "type")]
    video_type: String,
}

#[derive(Debug, Deserialize)]
struct MovieAppended {
    #[serde(flatten)]
    detail: DetailFields,
    #[serde(default)]
    credits: Option<Credits>,
    #[serde(default)]
    videos: Option<Videos>,
}

fn map_detail(data: MovieAppended) -> MovieDetail {
    let MovieAppended {
        detail,
        credits,
        videos,
    } = data;
    let cast = top_cast(credits.unwrap_or_default().cast, CAST_LIMIT);
    let trailer_key = select_trailer(&videos.unwrap_or_default());

    MovieDetail {
        id: detail.id,
        title: detail.title,
        poster_path: detail.poster_path,
        release_date: detail.release_date,
        vote_average: detail.vote_average,
        overview: detail.overview.unwrap_or_default(),
        runtime_minutes: detail.runtime,
        genres: detail.genres,
        backdrop_path: detail.backdrop_path,
        cast,
        trailer_key,
    }
}

fn top_cast(mut list: Vec<CastMember>, max: usize) -> Vec<CastMember> {
    list.truncate(max);
    list
}

fn select_trailer(videos: &Videos) -> Option<String> {
    videos
        .results
        .iter()
        .find(|v| v.video_type == "Trailer" && v.site.eq_ignore_ascii_case(TRAILER_SITE))
        .map(|v| v.key.clone())
}
