//! Per-route controllers. Each one is mounted with a [`PageContext`],
//! owns its view state and exposes the actions its page offers.

use anyhow::Result;
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{error, info, warn};

use crate::favorites::{FavoritesList, FavoritesRepo};
use crate::models::{MovieDetail, MovieSummary, SearchResults, TimeWindow};
use crate::tmdb::{TmdbApi, TmdbError};

pub const MOVIE_NOT_FOUND: &str = "Movie not found";

/// Services every controller is built from.
#[derive(Clone)]
pub struct PageContext {
    pub tmdb: Arc<dyn TmdbApi>,
    pub favorites: FavoritesRepo,
}

impl PageContext {
    pub fn new(tmdb: Arc<dyn TmdbApi>, favorites: FavoritesRepo) -> Self {
        Self { tmdb, favorites }
    }
}

/// Outcome of a settled fetch. Pages are rendered only after mount returns,
/// so the in-flight phase never outlives the request future.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadState<T> {
    Ready(T),
    Failed(String),
}

impl<T> LoadState<T> {
    fn from_result(res: Result<T, TmdbError>) -> Self {
        match res {
            Ok(v) => LoadState::Ready(v),
            Err(e) => LoadState::Failed(e.to_string()),
        }
    }
}

/// One paged list on the home page.
#[derive(Debug, Clone, PartialEq)]
pub struct ListSection {
    pub state: LoadState<Vec<MovieSummary>>,
    pub page: u32,
}

impl ListSection {
    fn settled(res: Result<Vec<MovieSummary>, TmdbError>, label: &str) -> Self {
        if let Err(e) = &res {
            error!("Error fetching {} movies: {:?}", label, e);
        }
        let state = LoadState::from_result(res);
        let page = if matches!(state, LoadState::Ready(_)) { 1 } else { 0 };
        Self { state, page }
    }

    pub fn movies(&self) -> &[MovieSummary] {
        match &self.state {
            LoadState::Ready(movies) => movies,
            _ => &[],
        }
    }

    /// Appends a fetched page, skipping ids already listed.
    fn append(&mut self, page: u32, fetched: Vec<MovieSummary>) -> usize {
        let mut movies = match std::mem::replace(&mut self.state, LoadState::Ready(Vec::new())) {
            LoadState::Ready(movies) => movies,
            LoadState::Failed(_) => Vec::new(),
        };
        let mut seen: HashSet<i64> = movies.iter().map(|m| m.id).collect();
        let before = movies.len();
        movies.extend(fetched.into_iter().filter(|m| seen.insert(m.id)));
        let added = movies.len() - before;
        self.state = LoadState::Ready(movies);
        self.page = page;
        added
    }

    fn next_page(&self) -> u32 {
        match self.state {
            LoadState::Ready(_) => self.page + 1,
            _ => 1,
        }
    }
}

pub struct HomePage {
    ctx: PageContext,
    pub trending: ListSection,
    pub popular: ListSection,
    pub favorites: FavoritesList,
}

impl HomePage {
    /// Fetches trending and popular concurrently; each list settles on its own.
    pub async fn mount(ctx: PageContext) -> Result<Self> {
        let favorites = ctx.favorites.load()?;
        let (trending, popular) = tokio::join!(
            ctx.tmdb.trending(TimeWindow::Week, 1),
            ctx.tmdb.popular(1)
        );
        Ok(Self {
            trending: ListSection::settled(trending, "trending"),
            popular: ListSection::settled(popular, "popular"),
            ctx,
            favorites,
        })
    }

    pub async fn load_more_trending(&mut self) {
        let next = self.trending.next_page();
        match self.ctx.tmdb.trending(TimeWindow::Week, next).await {
            Ok(movies) => {
                let added = self.trending.append(next, movies);
                info!("Loaded trending page {} ({} new)", next, added);
            }
            Err(e) => error!("Error loading more trending: {:?}", e),
        }
    }

    pub async fn load_more_popular(&mut self) {
        let next = self.popular.next_page();
        match self.ctx.tmdb.popular(next).await {
            Ok(movies) => {
                let added = self.popular.append(next, movies);
                info!("Loaded popular page {} ({} new)", next, added);
            }
            Err(e) => error!("Error loading more popular: {:?}", e),
        }
    }

    pub fn toggle_favorite(&mut self, movie: MovieSummary) -> Result<bool> {
        self.ctx.favorites.toggle(&mut self.favorites, movie)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    /// No usable query; nothing was fetched.
    Prompt,
    Ready {
        query: String,
        results: SearchResults,
    },
    Failed {
        query: String,
        message: String,
    },
}

pub struct SearchPage {
    ctx: PageContext,
    pub state: SearchState,
    pub favorites: FavoritesList,
}

impl SearchPage {
    pub async fn mount(ctx: PageContext, query: Option<&str>) -> Result<Self> {
        let favorites = ctx.favorites.load()?;
        let query = query.map(str::trim).filter(|q| !q.is_empty());
        let state = match query {
            None => SearchState::Prompt,
            Some(q) => match ctx.tmdb.search_movies(q, 1).await {
                Ok(results) => {
                    info!("Search '{}' returned {} movies", q, results.results.len());
                    SearchState::Ready {
                        query: q.to_string(),
                        results,
                    }
                }
                Err(e) => {
                    error!("Search error for '{}': {:?}", q, e);
                    SearchState::Failed {
                        query: q.to_string(),
                        message: e.to_string(),
                    }
                }
            },
        };
        Ok(Self {
            ctx,
            state,
            favorites,
        })
    }

    pub fn query(&self) -> Option<&str> {
        match &self.state {
            SearchState::Prompt => None,
            SearchState::Ready { query, .. } | SearchState::Failed { query, .. } => Some(query),
        }
    }

    pub fn movies(&self) -> &[MovieSummary] {
        match &self.state {
            SearchState::Ready { results, .. } => &results.results,
            _ => &[],
        }
    }

    pub fn toggle_favorite(&mut self, movie: MovieSummary) -> Result<bool> {
        self.ctx.favorites.toggle(&mut self.favorites, movie)
    }
}

pub fn count_label(count: usize) -> String {
    format!("Found {} {}", count, if count == 1 { "movie" } else { "movies" })
}

#[derive(Debug, Clone, PartialEq)]
pub enum DetailState {
    Ready {
        movie: Box<MovieDetail>,
        is_favorite: bool,
    },
    Failed(String),
}

pub struct DetailPage {
    ctx: PageContext,
    pub state: DetailState,
}

impl DetailPage {
    pub async fn mount(ctx: PageContext, raw_id: &str) -> Result<Self> {
        let state = match raw_id.trim().parse::<i64>() {
            Err(_) => {
                warn!("Rejecting movie id '{}'", raw_id);
                DetailState::Failed(MOVIE_NOT_FOUND.to_string())
            }
            Ok(id) => match ctx.tmdb.movie_details(id).await {
                Ok(movie) => {
                    let is_favorite = ctx.favorites.load()?.contains(movie.id);
                    DetailState::Ready {
                        movie: Box::new(movie),
                        is_favorite,
                    }
                }
                Err(e) => {
                    error!("Error fetching movie {}: {:?}", id, e);
                    DetailState::Failed(e.to_string())
                }
            },
        };
        Ok(Self { ctx, state })
    }

    pub fn movie_id(&self) -> Option<i64> {
        match &self.state {
            DetailState::Ready { movie, .. } => Some(movie.id),
            DetailState::Failed(_) => None,
        }
    }

    /// No-op on a failed page.
    pub fn toggle_favorite(&mut self) -> Result<bool> {
        let DetailState::Ready { movie, is_favorite } = &mut self.state else {
            return Ok(false);
        };
        *is_favorite = self.ctx.favorites.toggle_stored(movie.summary())?;
        Ok(*is_favorite)
    }
}

pub struct FavoritesPage {
    ctx: PageContext,
    pub favorites: FavoritesList,
}

impl FavoritesPage {
    pub fn mount(ctx: PageContext) -> Result<Self> {
        let favorites = ctx.favorites.load()?;
        Ok(Self { ctx, favorites })
    }

    /// Every listed movie is already a favorite, so toggling here only removes.
    pub fn remove(&mut self, id: i64) -> Result<bool> {
        self.ctx.favorites.remove(&mut self.favorites, id)
    }

    pub fn heading_label(&self) -> String {
        match self.favorites.len() {
            0 => "No favorites yet. Start adding movies!".to_string(),
            1 => "You have 1 favorite movie".to_string(),
            n => format!("You have {n} favorite movies"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{CastMember, Genre};
    use crate::tmdb::Operation;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Mutex;

    fn movie(id: i64) -> MovieSummary {
        MovieSummary {
            id,
            title: format!("Movie {id}"),
            poster_path: None,
            release_date: Some("2021-06-01".to_string()),
            vote_average: Some(6.5),
        }
    }

    #[derive(Default)]
    struct FakeTmdb {
        fail_popular: bool,
        fail_trending: bool,
        // Fails the next trending call only.
        trending_outage: AtomicBool,
        trending_pages: Mutex<Vec<u32>>,
        searches: Mutex<Vec<String>>,
    }

    #[async_trait]
    impl TmdbApi for FakeTmdb {
        async fn trending(&self, window: TimeWindow, page: u32) -> Result<Vec<MovieSummary>, TmdbError> {
            assert_eq!(window, TimeWindow::Week);
            self.trending_pages.lock().unwrap().push(page);
            if self.fail_trending || self.trending_outage.swap(false, Ordering::SeqCst) {
                return Err(TmdbError::RateLimited { op: Operation::Trending });
            }
            // Page 2 overlaps page 1 on id 2.
            Ok(match page {
                1 => vec![movie(1), movie(2)],
                _ => vec![movie(2), movie(3)],
            })
        }

        async fn search_movies(&self, query: &str, _page: u32) -> Result<SearchResults, TmdbError> {
            self.searches.lock().unwrap().push(query.to_string());
            if query == "broken" {
                return Err(TmdbError::Unknown {
                    op: Operation::Search,
                    status: Some(500),
                    detail: String::new(),
                });
            }
            let results = vec![movie(30), movie(10), movie(20)];
            Ok(SearchResults {
                total_results: results.len() as u32,
                total_pages: 1,
                results,
            })
        }

        async fn popular(&self, page: u32) -> Result<Vec<MovieSummary>, TmdbError> {
            if self.fail_popular {
                return Err(TmdbError::NotFound { op: Operation::Popular });
            }
            Ok(vec![movie(100 + page as i64)])
        }

        async fn movie_details(&self, id: i64) -> Result<MovieDetail, TmdbError> {
            if id == 404 {
                return Err(TmdbError::NotFound { op: Operation::Details });
            }
            Ok(MovieDetail {
                id,
                title: format!("Movie {id}"),
                poster_path: Some("/p.jpg".to_string()),
                release_date: Some("2010-07-16".to_string()),
                vote_average: Some(8.8),
                overview: "Dreams.".to_string(),
                runtime_minutes: Some(148),
                genres: vec![Genre { id: 1, name: "Sci-Fi".to_string() }],
                backdrop_path: None,
                cast: vec![CastMember {
                    id: 1,
                    name: "Lead".to_string(),
                    character: "Cobb".to_string(),
                    profile_path: None,
                }],
                trailer_key: None,
            })
        }
    }

    fn ctx(tmdb: FakeTmdb) -> (PageContext, Arc<FakeTmdb>) {
        let tmdb = Arc::new(tmdb);
        (PageContext::new(tmdb.clone(), FavoritesRepo::in_memory()), tmdb)
    }

    fn ids(movies: &[MovieSummary]) -> Vec<i64> {
        movies.iter().map(|m| m.id).collect()
    }

    /// Collects formatted tracing output for assertions.
    #[derive(Clone, Default)]
    struct LogBuffer(Arc<Mutex<Vec<u8>>>);

    impl LogBuffer {
        fn contents(&self) -> String {
            String::from_utf8_lossy(&self.0.lock().unwrap()).into_owned()
        }
    }

    impl std::io::Write for LogBuffer {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[tokio::test]
    async fn home_keeps_trending_when_popular_fails() {
        let (ctx, _) = ctx(FakeTmdb {
            fail_popular: true,
            ..Default::default()
        });
        let page = HomePage::mount(ctx).await.unwrap();
        assert_eq!(ids(page.trending.movies()), vec![1, 2]);
        assert_eq!(
            page.popular.state,
            LoadState::Failed("Failed to fetch popular movies".to_string())
        );
    }

    #[tokio::test]
    async fn home_logs_popular_failure() {
        let logs = LogBuffer::default();
        let writer = logs.clone();
        let subscriber = tracing_subscriber::fmt()
            .with_writer(move || writer.clone())
            .with_ansi(false)
            .finish();
        let _guard = tracing::subscriber::set_default(subscriber);

        let (ctx, _) = ctx(FakeTmdb {
            fail_popular: true,
            ..Default::default()
        });
        HomePage::mount(ctx).await.unwrap();

        let out = logs.contents();
        assert!(out.contains("ERROR"), "{out}");
        assert!(out.contains("Error fetching popular movies"), "{out}");
        assert!(!out.contains("Error fetching trending movies"), "{out}");
    }

    #[tokio::test]
    async fn trending_load_more_advances_page_and_dedupes() {
        let (ctx, tmdb) = ctx(FakeTmdb::default());
        let mut page = HomePage::mount(ctx).await.unwrap();
        page.load_more_trending().await;
        assert_eq!(ids(page.trending.movies()), vec![1, 2, 3]);
        assert_eq!(page.trending.page, 2);
        assert_eq!(*tmdb.trending_pages.lock().unwrap(), vec![1, 2]);
    }

    #[tokio::test]
    async fn popular_load_more_appends_next_page() {
        let (ctx, _) = ctx(FakeTmdb::default());
        let mut page = HomePage::mount(ctx).await.unwrap();
        page.load_more_popular().await;
        page.load_more_popular().await;
        assert_eq!(ids(page.popular.movies()), vec![101, 102, 103]);
        assert_eq!(page.popular.page, 3);
    }

    #[tokio::test]
    async fn failed_load_more_keeps_list() {
        let (ctx, _) = ctx(FakeTmdb {
            fail_trending: true,
            ..Default::default()
        });
        let mut page = HomePage::mount(ctx).await.unwrap();
        page.load_more_trending().await;
        assert!(matches!(page.trending.state, LoadState::Failed(_)));
        assert_eq!(page.trending.page, 0);
        assert_eq!(ids(page.popular.movies()), vec![101]);
    }

    #[tokio::test]
    async fn load_more_on_failed_list_starts_over() {
        let (ctx, tmdb) = ctx(FakeTmdb {
            trending_outage: AtomicBool::new(true),
            ..Default::default()
        });
        let mut page = HomePage::mount(ctx).await.unwrap();
        assert!(page.trending.movies().is_empty());
        page.load_more_trending().await;
        assert_eq!(ids(page.trending.movies()), vec![1, 2]);
        assert_eq!(page.trending.page, 1);
        assert_eq!(*tmdb.trending_pages.lock().unwrap(), vec![1, 1]);
    }

    #[tokio::test]
    async fn home_toggle_writes_through() {
        let (ctx, _) = ctx(FakeTmdb::default());
        let repo = ctx.favorites.clone();
        let mut page = HomePage::mount(ctx).await.unwrap();
        assert!(page.toggle_favorite(movie(2)).unwrap());
        assert!(repo.load().unwrap().contains(2));
        assert!(!page.toggle_favorite(movie(2)).unwrap());
        assert!(repo.load().unwrap().is_empty());
    }

    #[tokio::test]
    async fn blank_query_prompts_without_fetching() {
        let (ctx, tmdb) = ctx(FakeTmdb::default());
        for q in [None, Some(""), Some("   ")] {
            let page = SearchPage::mount(ctx.clone(), q).await.unwrap();
            assert_eq!(page.state, SearchState::Prompt);
        }
        assert!(tmdb.searches.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn search_keeps_upstream_order() {
        let (ctx, tmdb) = ctx(FakeTmdb::default());
        let page = SearchPage::mount(ctx, Some(" batman ")).await.unwrap();
        assert_eq!(ids(page.movies()), vec![30, 10, 20]);
        assert_eq!(page.query(), Some("batman"));
        assert_eq!(*tmdb.searches.lock().unwrap(), vec!["batman".to_string()]);
    }

    #[tokio::test]
    async fn search_failure_carries_message() {
        let (ctx, _) = ctx(FakeTmdb::default());
        let page = SearchPage::mount(ctx, Some("broken")).await.unwrap();
        assert_eq!(
            page.state,
            SearchState::Failed {
                query: "broken".to_string(),
                message: "Failed to search movies".to_string(),
            }
        );
    }

    #[test]
    fn count_label_pluralizes() {
        assert_eq!(count_label(0), "Found 0 movies");
        assert_eq!(count_label(1), "Found 1 movie");
        assert_eq!(count_label(7), "Found 7 movies");
    }

    #[tokio::test]
    async fn detail_reports_favorite_and_toggles_storage() {
        let (ctx, _) = ctx(FakeTmdb::default());
        let repo = ctx.favorites.clone();
        repo.save(&FavoritesList::new(vec![movie(27205)])).unwrap();

        let mut page = DetailPage::mount(ctx, "27205").await.unwrap();
        assert!(matches!(page.state, DetailState::Ready { is_favorite: true, .. }));
        assert!(!page.toggle_favorite().unwrap());
        assert!(repo.load().unwrap().is_empty());
        assert!(page.toggle_favorite().unwrap());
        let stored = repo.load().unwrap();
        assert_eq!(stored.movies()[0].title, "Movie 27205");
        assert_eq!(stored.movies()[0].vote_average, Some(8.8));
    }

    #[tokio::test]
    async fn detail_failures_are_terminal() {
        let (ctx, _) = ctx(FakeTmdb::default());
        let page = DetailPage::mount(ctx.clone(), "abc").await.unwrap();
        assert_eq!(page.state, DetailState::Failed(MOVIE_NOT_FOUND.to_string()));

        let mut page = DetailPage::mount(ctx, "404").await.unwrap();
        assert_eq!(
            page.state,
            DetailState::Failed("Failed to fetch movie details".to_string())
        );
        assert!(!page.toggle_favorite().unwrap());
    }

    #[test]
    fn favorites_page_only_removes() {
        let repo = FavoritesRepo::in_memory();
        repo.save(&FavoritesList::new(vec![movie(1), movie(2)])).unwrap();
        let ctx = PageContext::new(Arc::new(FakeTmdb::default()), repo.clone());

        let mut page = FavoritesPage::mount(ctx).unwrap();
        assert_eq!(page.heading_label(), "You have 2 favorite movies");
        assert!(page.remove(1).unwrap());
        assert_eq!(page.heading_label(), "You have 1 favorite movie");
        assert!(!page.remove(99).unwrap());
        assert!(page.remove(2).unwrap());
        assert_eq!(page.heading_label(), "No favorites yet. Start adding movies!");
        assert!(repo.load().unwrap().is_empty());
    }
}
