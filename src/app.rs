use crate::config::Config;
use crate::favorites::{FavoritesRepo, FileKvStore};
use crate::models::MovieSummary;
use crate::pages::{DetailPage, FavoritesPage, HomePage, PageContext, SearchPage};
use crate::render;
use crate::tmdb::{ImageUrls, TmdbApi, TmdbClient};
use anyhow::Result;
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
    Form, Router,
};
use serde::Deserialize;
use std::sync::Arc;
use tokio::sync::Mutex;
use tower_http::limit::RequestBodyLimitLayer;
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

const MAX_BODY_BYTES: usize = 64 * 1024; // forms only carry one movie summary

#[derive(Clone)]
pub struct AppState {
    pub ctx: PageContext,
    pub images: ImageUrls,
    pub api_key_status: String,
    pub views: Arc<Mutex<Views>>,
}

/// Most recently mounted controllers, so page actions hit the state being viewed.
#[derive(Default)]
pub struct Views {
    pub home: Option<HomePage>,
    pub search: Option<SearchPage>,
    pub detail: Option<DetailPage>,
}

impl AppState {
    pub fn new(tmdb: Arc<dyn TmdbApi>, favorites: FavoritesRepo, images: ImageUrls) -> Self {
        Self {
            ctx: PageContext::new(tmdb, favorites),
            images,
            api_key_status: crate::config::api_key_status(None),
            views: Arc::new(Mutex::new(Views::default())),
        }
    }

    pub fn with_api_key_status(mut self, status: String) -> Self {
        self.api_key_status = status;
        self
    }
}

#[derive(Debug, Deserialize)]
pub struct SearchParams {
    pub query: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct RemoveForm {
    pub id: i64,
}

#[derive(Debug, Clone, Copy)]
enum HomeList {
    Trending,
    Popular,
}

pub async fn run_server(config: Config) -> Result<()> {
    if config.api_key.is_none() {
        warn!("TMDB_API_KEY is not set - upstream requests will be rejected");
    }
    let tmdb: Arc<dyn TmdbApi> = Arc::new(TmdbClient::new(
        &config.api_base_url,
        config.api_key.clone(),
    ));
    let store = FileKvStore::new(&config.data_dir)?;
    info!("Favorites stored under {}", store.dir().display());
    let favorites = FavoritesRepo::new(Arc::new(store));

    let state = AppState::new(tmdb, favorites, ImageUrls::new(&config.image_base_url))
        .with_api_key_status(config.api_key_status());
    let app = build_router(state);

    info!("Listening on {}", config.addr);
    let listener = tokio::net::TcpListener::bind(config.addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;
    Ok(())
}

pub fn build_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/home/trending/more", post(more_trending))
        .route("/home/popular/more", post(more_popular))
        .route("/home/favorites", post(home_toggle))
        .route("/search", get(search))
        .route("/search/favorites", post(search_toggle))
        .route("/movie/:id", get(detail))
        .route("/movie/:id/favorite", post(detail_toggle))
        .route("/favorites", get(favorites))
        .route("/favorites/remove", post(favorites_remove))
        .route("/health", get(health))
        .route("/status", get(status))
        .layer(RequestBodyLimitLayer::new(MAX_BODY_BYTES))
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn health() -> &'static str {
    "OK"
}

async fn status(State(state): State<AppState>) -> String {
    state.api_key_status.clone()
}

async fn home(State(state): State<AppState>) -> Response {
    let page = match HomePage::mount(state.ctx.clone()).await {
        Ok(p) => p,
        Err(e) => return storage_error(e),
    };
    let html = render::home_page(&page, &state.images);
    state.views.lock().await.home = Some(page);
    Html(html).into_response()
}

async fn more_trending(State(state): State<AppState>) -> Response {
    load_more(&state, HomeList::Trending).await
}

async fn more_popular(State(state): State<AppState>) -> Response {
    load_more(&state, HomeList::Popular).await
}

async fn load_more(state: &AppState, list: HomeList) -> Response {
    let mut page = match take_home(state).await {
        Ok(p) => p,
        Err(e) => return storage_error(e),
    };
    match list {
        HomeList::Trending => page.load_more_trending().await,
        HomeList::Popular => page.load_more_popular().await,
    }
    let html = render::home_page(&page, &state.images);
    state.views.lock().await.home = Some(page);
    Html(html).into_response()
}

async fn home_toggle(State(state): State<AppState>, Form(movie): Form<MovieSummary>) -> Response {
    let mut page = match take_home(&state).await {
        Ok(p) => p,
        Err(e) => return storage_error(e),
    };
    let result = page
        .toggle_favorite(movie)
        .map(|_| render::home_page(&page, &state.images));
    state.views.lock().await.home = Some(page);
    html_or_error(result)
}

/// Takes the parked home view out of its slot, mounting a fresh one if none is parked.
/// The views lock is released before any upstream call.
async fn take_home(state: &AppState) -> Result<HomePage> {
    let parked = state.views.lock().await.home.take();
    match parked {
        Some(page) => Ok(page),
        None => HomePage::mount(state.ctx.clone()).await,
    }
}

async fn search(State(state): State<AppState>, Query(params): Query<SearchParams>) -> Response {
    let page = match SearchPage::mount(state.ctx.clone(), params.query.as_deref()).await {
        Ok(p) => p,
        Err(e) => return storage_error(e),
    };
    let html = render::search_page(&page, &state.images);
    state.views.lock().await.search = Some(page);
    Html(html).into_response()
}

async fn search_toggle(
    State(state): State<AppState>,
    Query(params): Query<SearchParams>,
    Form(movie): Form<MovieSummary>,
) -> Response {
    let query = params.query.as_deref().map(str::trim);
    let parked = state
        .views
        .lock()
        .await
        .search
        .take()
        .filter(|p| p.query() == query.filter(|q| !q.is_empty()));
    let mut page = match parked {
        Some(p) => p,
        None => match SearchPage::mount(state.ctx.clone(), query).await {
            Ok(p) => p,
            Err(e) => return storage_error(e),
        },
    };
    let result = page
        .toggle_favorite(movie)
        .map(|_| render::search_page(&page, &state.images));
    state.views.lock().await.search = Some(page);
    html_or_error(result)
}

async fn detail(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let page = match DetailPage::mount(state.ctx.clone(), &id).await {
        Ok(p) => p,
        Err(e) => return storage_error(e),
    };
    let html = render::detail_page(&page, &state.images);
    state.views.lock().await.detail = Some(page);
    Html(html).into_response()
}

async fn detail_toggle(State(state): State<AppState>, Path(id): Path<String>) -> Response {
    let wanted = id.trim().parse::<i64>().ok();
    let parked = state
        .views
        .lock()
        .await
        .detail
        .take()
        .filter(|p| wanted.is_some() && p.movie_id() == wanted);
    let mut page = match parked {
        Some(p) => p,
        None => match DetailPage::mount(state.ctx.clone(), &id).await {
            Ok(p) => p,
            Err(e) => return storage_error(e),
        },
    };
    let result = page
        .toggle_favorite()
        .map(|_| render::detail_page(&page, &state.images));
    state.views.lock().await.detail = Some(page);
    html_or_error(result)
}

async fn favorites(State(state): State<AppState>) -> Response {
    let result = FavoritesPage::mount(state.ctx.clone())
        .map(|page| render::favorites_page(&page, &state.images));
    html_or_error(result)
}

async fn favorites_remove(
    State(state): State<AppState>,
    Form(form): Form<RemoveForm>,
) -> Response {
    let result = FavoritesPage::mount(state.ctx.clone()).and_then(|mut page| {
        page.remove(form.id)?;
        Ok(render::favorites_page(&page, &state.images))
    });
    html_or_error(result)
}

fn html_or_error(result: Result<String>) -> Response {
    match result {
        Ok(html) => Html(html).into_response(),
        Err(e) => storage_error(e),
    }
}

fn storage_error(err: anyhow::Error) -> Response {
    error!("Favorites storage failed: {:?}", err);
    let body = render::layout(
        "Error",
        &render::error_panel("Could not access saved favorites", true),
    );
    (StatusCode::INTERNAL_SERVER_ERROR, Html(body)).into_response()
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            error!("Failed to install Ctrl+C handler: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        use tokio::signal::unix::{signal, SignalKind};
        match signal(SignalKind::terminate()) {
            Ok(mut term) => {
                term.recv().await;
            }
            Err(e) => {
                error!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Shutdown signal received (Ctrl+C)");
        }
        _ = terminate => {
            info!("Shutdown signal received (SIGTERM)");
        }
    }
}
