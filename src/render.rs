//! HTML rendering for the four views and their shared pieces.

use crate::favorites::FavoritesList;
use crate::models::{format_rating, format_runtime, release_year, MovieSummary};
use crate::pages::{
    count_label, DetailPage, DetailState, FavoritesPage, HomePage, ListSection, LoadState,
    SearchPage, SearchState,
};
use crate::tmdb::{ImageUrls, BACKDROP_SIZE, POSTER_SIZE};

const BRAND: &str = "MovieFlix";
const PAGE_BG: &str = "min-h-screen bg-linear-to-br from-gray-900 via-purple-900 to-black text-white";

pub fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for ch in input.chars() {
        match ch {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#39;"),
            _ => out.push(ch),
        }
    }
    out
}

/// Wraps a page body with the document shell and navigation bar.
pub fn layout(title: &str, body: &str) -> String {
    let title = escape_html(title);
    let nav = nav_bar();
    format!(
        r#"<!DOCTYPE html>
<html lang="en">
<head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>{title} | {BRAND}</title>
    <script src="https://cdn.jsdelivr.net/npm/@tailwindcss/browser@4"></script>
</head>
<body class="bg-black">
{nav}
<main class="{PAGE_BG}">
{body}
</main>
</body>
</html>"#
    )
}

pub fn nav_bar() -> String {
    format!(
        r#"<nav class="bg-black bg-opacity-90 sticky top-0 z-50 border-b border-gray-800">
    <div class="container mx-auto px-4 py-3 flex flex-col md:flex-row items-center justify-between gap-4">
        <a href="/" class="flex items-center gap-2 hover:opacity-80">
            <span class="text-3xl">🎬</span>
            <span class="text-2xl font-bold text-white">{BRAND}</span>
        </a>
        <div class="flex items-center gap-6">
            <a href="/" class="text-gray-300 hover:text-white font-medium">Home</a>
            <a href="/favorites" class="text-gray-300 hover:text-white font-medium">Favorites</a>
        </div>
        <form action="/search" method="get" class="w-full md:w-auto">
            <input type="text" name="query" placeholder="Search movies..." required
                class="w-full md:w-96 px-4 py-2.5 bg-gray-800 text-white placeholder-gray-400 rounded-full focus:outline-none focus:ring-2 focus:ring-blue-500">
        </form>
    </div>
</nav>"#
    )
}

pub fn error_panel(message: &str, back_home: bool) -> String {
    let message = escape_html(message);
    let back = if back_home {
        r#"<a href="/" class="inline-block px-6 py-3 bg-blue-600 rounded-lg hover:bg-blue-700">Back to Home</a>"#
    } else {
        ""
    };
    format!(
        r#"<div class="flex items-center justify-center py-32">
    <div class="text-center">
        <p class="text-red-500 text-2xl mb-4">Error: {message}</p>
        {back}
    </div>
</div>"#
    )
}

fn favorite_form(movie: &MovieSummary, is_favorite: bool, action: &str) -> String {
    let optional = |name: &str, value: Option<String>| {
        value
            .map(|v| format!(r#"<input type="hidden" name="{name}" value="{}">"#, escape_html(&v)))
            .unwrap_or_default()
    };
    let fields = [
        format!(r#"<input type="hidden" name="id" value="{}">"#, movie.id),
        format!(
            r#"<input type="hidden" name="title" value="{}">"#,
            escape_html(&movie.title)
        ),
        optional("poster_path", movie.poster_path.clone()),
        optional("release_date", movie.release_date.clone()),
        optional("vote_average", movie.vote_average.map(|v| v.to_string())),
    ]
    .join("");
    let (label, heart) = if is_favorite {
        ("Remove from favorites", "text-red-500")
    } else {
        ("Add to favorites", "text-white")
    };
    format!(
        r#"<form method="post" action="{}" class="absolute top-2 right-2 z-10">
    {fields}
    <button type="submit" title="{label}" aria-label="{label}" class="p-2 bg-black bg-opacity-50 rounded-full hover:bg-opacity-70 {heart}">{}</button>
</form>"#,
        escape_html(action),
        if is_favorite { "♥" } else { "♡" }
    )
}

/// Poster falls back to a titled placeholder when missing or when the image fails to load.
pub fn movie_card(
    movie: &MovieSummary,
    is_favorite: bool,
    action: &str,
    images: &ImageUrls,
) -> String {
    let title = escape_html(&movie.title);
    let year = release_year(movie.release_date.as_deref())
        .map(|y| y.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let rating = format_rating(movie.vote_average).unwrap_or_else(|| "N/A".to_string());
    let placeholder = |hidden: bool| {
        format!(
            r#"<div class="w-full h-full bg-gray-800 flex items-center justify-center p-4"{}><p class="text-gray-500 text-sm text-center">{title}</p></div>"#,
            if hidden { " hidden" } else { "" }
        )
    };
    let poster = match images.poster_url(movie.poster_path.as_deref(), POSTER_SIZE) {
        Some(url) => format!(
            r#"<img src="{}" alt="{title}" loading="lazy" class="w-full h-full object-cover" onerror="this.hidden=true;this.nextElementSibling.hidden=false">{}"#,
            escape_html(&url),
            placeholder(true)
        ),
        None => placeholder(false),
    };
    let id = movie.id;
    let form = favorite_form(movie, is_favorite, action);
    format!(
        r#"<div class="movie-card group relative bg-gray-900 rounded-lg overflow-hidden shadow-lg" data-movie-id="{id}">
    <a href="/movie/{id}"><div class="relative aspect-2/3 overflow-hidden bg-gray-800 min-h-[300px]">{poster}</div></a>
    <div class="p-4">
        <a href="/movie/{id}"><h3 class="text-white font-semibold text-lg mb-1 line-clamp-1 hover:text-blue-400">{title}</h3></a>
        <div class="flex items-center justify-between text-sm text-gray-400">
            <span>{year}</span>
            <span>★ {rating}</span>
        </div>
    </div>
    {form}
</div>"#
    )
}

pub fn movie_grid(
    movies: &[MovieSummary],
    favorites: &FavoritesList,
    action: &str,
    images: &ImageUrls,
) -> String {
    if movies.is_empty() {
        return r#"<div class="text-center py-20"><p class="text-gray-400 text-xl">No movies found</p></div>"#
            .to_string();
    }
    let cards: String = movies
        .iter()
        .map(|m| movie_card(m, favorites.contains(m.id), action, images))
        .collect();
    format!(
        r#"<div class="flex justify-center"><div class="grid grid-cols-2 sm:grid-cols-3 md:grid-cols-4 lg:grid-cols-5 gap-8">{cards}</div></div>"#
    )
}

fn home_section(
    id: &str,
    heading: &str,
    more_label: &str,
    section: &ListSection,
    favorites: &FavoritesList,
    images: &ImageUrls,
) -> String {
    // A failed list is only logged; the section stays empty.
    let content = match &section.state {
        LoadState::Ready(movies) => movie_grid(movies, favorites, "/home/favorites", images),
        LoadState::Failed(_) => String::new(),
    };
    let count = section.movies().len();
    format!(
        r#"<section id="{id}" class="mb-24 py-8">
    <div class="flex items-center justify-between mb-10">
        <h2 class="text-3xl md:text-4xl font-bold">{heading}</h2>
        <span class="text-gray-400 text-sm">{count} movies</span>
    </div>
    {content}
    <form method="post" action="/home/{id}/more" class="flex justify-center mt-12">
        <button type="submit" class="px-8 py-4 bg-linear-to-r from-blue-600 to-purple-600 rounded-full font-semibold">Load More {more_label}</button>
    </form>
</section>"#
    )
}

pub fn home_page(page: &HomePage, images: &ImageUrls) -> String {
    let trending = home_section(
        "trending",
        "🔥 Trending This Week",
        "Trending",
        &page.trending,
        &page.favorites,
        images,
    );
    let popular = home_section(
        "popular",
        "⭐ Popular Movies",
        "Popular",
        &page.popular,
        &page.favorites,
        images,
    );
    let body = format!(
        r#"<div class="container mx-auto px-4 py-12">
    <div class="mb-20 text-center">
        <h1 class="text-5xl md:text-6xl font-bold mb-6">Discover Movies</h1>
        <p class="text-xl text-gray-300 max-w-2xl mx-auto">Explore trending movies, search your favorites, and create your watchlist</p>
    </div>
    {trending}
    {popular}
</div>"#
    );
    layout("Home", &body)
}

pub fn search_page(page: &SearchPage, images: &ImageUrls) -> String {
    let body = match &page.state {
        SearchState::Prompt => r#"<div class="flex items-center justify-center py-32"><p class="text-2xl text-gray-400">Enter a search term to find movies</p></div>"#.to_string(),
        SearchState::Failed { message, .. } => error_panel(message, false),
        SearchState::Ready { query, results } => {
            let action = format!("/search/favorites?query={}", urlencoding::encode(query));
            let grid = movie_grid(&results.results, &page.favorites, &action, images);
            format!(
                r#"<div class="container mx-auto px-4 py-12">
    <div class="mb-8">
        <h1 class="text-4xl md:text-5xl font-bold mb-3">Search Results for "{}"</h1>
        <p class="text-gray-400 text-lg">{}</p>
    </div>
    {grid}
</div>"#,
                escape_html(query),
                count_label(results.results.len())
            )
        }
    };
    layout("Search", &body)
}

pub fn detail_page(page: &DetailPage, images: &ImageUrls) -> String {
    let (movie, is_favorite) = match &page.state {
        DetailState::Failed(message) => return layout("Error", &error_panel(message, true)),
        DetailState::Ready { movie, is_favorite } => (movie, *is_favorite),
    };
    let title = escape_html(&movie.title);
    let backdrop = images
        .backdrop_url(movie.backdrop_path.as_deref(), BACKDROP_SIZE)
        .map(|url| {
            format!(
                r#"<div class="h-96 bg-cover bg-center" style="background-image: url('{}')"></div>"#,
                escape_html(&url)
            )
        })
        .unwrap_or_default();
    let poster = images
        .poster_url(movie.poster_path.as_deref(), POSTER_SIZE)
        .map(|url| {
            format!(
                r#"<img src="{}" alt="{title}" class="w-64 rounded-lg shadow-2xl">"#,
                escape_html(&url)
            )
        })
        .unwrap_or_else(|| {
            r#"<div class="w-64 h-96 bg-gray-800 rounded-lg flex items-center justify-center"><span class="text-4xl">🎬</span></div>"#.to_string()
        });
    let year = release_year(movie.release_date.as_deref())
        .map(|y| y.to_string())
        .unwrap_or_else(|| "N/A".to_string());
    let runtime = format_runtime(movie.runtime_minutes).unwrap_or_else(|| "N/A".to_string());
    let rating = format_rating(movie.vote_average).unwrap_or_else(|| "N/A".to_string());
    let genres: String = movie
        .genres
        .iter()
        .map(|g| {
            format!(
                r#"<span class="genre px-4 py-2 bg-blue-600 bg-opacity-30 rounded-full text-sm">{}</span>"#,
                escape_html(&g.name)
            )
        })
        .collect();
    let overview = if movie.overview.trim().is_empty() {
        "No overview available.".to_string()
    } else {
        escape_html(&movie.overview)
    };
    let trailer = movie
        .trailer_key
        .as_deref()
        .map(|key| {
            format!(
                r#"<div class="mb-8"><h2 class="text-2xl font-bold mb-3">Trailer</h2><div class="aspect-video"><iframe class="w-full h-full rounded-lg" src="https://www.youtube.com/embed/{}" title="Movie Trailer" allowfullscreen></iframe></div></div>"#,
                urlencoding::encode(key)
            )
        })
        .unwrap_or_default();
    let cast: String = movie
        .cast
        .iter()
        .map(|person| {
            let photo = images
                .profile_url(person.profile_path.as_deref())
                .map(|url| {
                    format!(
                        r#"<img src="{}" alt="{}" class="w-full h-32 object-cover rounded-lg mb-2">"#,
                        escape_html(&url),
                        escape_html(&person.name)
                    )
                })
                .unwrap_or_else(|| {
                    r#"<div class="w-full h-32 bg-gray-800 rounded-lg mb-2 flex items-center justify-center"><span class="text-3xl">👤</span></div>"#.to_string()
                });
            format!(
                r#"<div class="cast-member text-center">{photo}<p class="font-semibold text-sm">{}</p><p class="text-gray-400 text-xs">{}</p></div>"#,
                escape_html(&person.name),
                escape_html(&person.character)
            )
        })
        .collect();
    let cast_section = if movie.cast.is_empty() {
        String::new()
    } else {
        format!(
            r#"<div><h2 class="text-2xl font-bold mb-4">Cast</h2><div class="grid grid-cols-2 sm:grid-cols-3 md:grid-cols-5 gap-4">{cast}</div></div>"#
        )
    };
    let (heart_label, heart) = if is_favorite {
        ("Remove from favorites", "♥")
    } else {
        ("Add to favorites", "♡")
    };
    let id = movie.id;
    let body = format!(
        r#"{backdrop}
<div class="container mx-auto px-4 py-12">
    <div class="flex flex-col md:flex-row gap-8">
        <div class="shrink-0">{poster}</div>
        <div class="flex-1">
            <div class="flex items-start justify-between mb-4">
                <div>
                    <h1 class="text-5xl font-bold mb-2">{title}</h1>
                    <div class="flex items-center gap-4 text-gray-400">
                        <span>{year}</span><span>•</span><span>{runtime}</span><span>•</span><span>★ {rating}/10</span>
                    </div>
                </div>
                <form method="post" action="/movie/{id}/favorite">
                    <button type="submit" title="{heart_label}" aria-label="{heart_label}" class="p-3 bg-white bg-opacity-10 rounded-full text-3xl">{heart}</button>
                </form>
            </div>
            <div class="flex flex-wrap gap-2 mb-6">{genres}</div>
            <div class="mb-8"><h2 class="text-2xl font-bold mb-3">Overview</h2><p class="text-gray-300 leading-relaxed">{overview}</p></div>
            {trailer}
            {cast_section}
        </div>
    </div>
</div>"#
    );
    layout(&movie.title, &body)
}

pub fn favorites_page(page: &FavoritesPage, images: &ImageUrls) -> String {
    let content = if page.favorites.is_empty() {
        r#"<div class="text-center py-20">
    <p class="text-2xl text-gray-400 mb-4">Your favorites list is empty</p>
    <p class="text-gray-500">Click the heart icon on any movie to add it here</p>
</div>"#
            .to_string()
    } else {
        movie_grid(
            page.favorites.movies(),
            &page.favorites,
            "/favorites/remove",
            images,
        )
    };
    let body = format!(
        r#"<div class="container mx-auto px-4 py-8">
    <div class="mb-8">
        <h1 class="text-4xl font-bold mb-2">♥ My Favorites</h1>
        <p class="text-gray-400">{}</p>
    </div>
    {content}
</div>"#,
        page.heading_label()
    );
    layout("Favorites", &body)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn movie(id: i64, title: &str) -> MovieSummary {
        MovieSummary {
            id,
            title: title.to_string(),
            poster_path: Some("/poster.jpg".to_string()),
            release_date: Some("1999-03-31".to_string()),
            vote_average: Some(8.17),
        }
    }

    #[test]
    fn escapes_markup() {
        assert_eq!(escape_html(r#"<a href="x">'&'</a>"#), "&lt;a href=&quot;x&quot;&gt;&#39;&amp;&#39;&lt;/a&gt;");
    }

    #[test]
    fn card_shows_year_rating_and_fallback() {
        let images = ImageUrls::new("https://img.test/t/p/");
        let html = movie_card(&movie(603, "The <Matrix>"), false, "/home/favorites", &images);
        assert!(html.contains("The &lt;Matrix&gt;"));
        assert!(html.contains("1999"));
        assert!(html.contains("★ 8.2"));
        assert!(html.contains(r#"src="https://img.test/t/p/w500/poster.jpg""#));
        assert!(html.contains("onerror="));
        assert!(html.contains("Add to favorites"));
        assert!(html.contains(r#"href="/movie/603""#));
    }

    #[test]
    fn card_without_data_uses_placeholders() {
        let bare = MovieSummary {
            id: 1,
            title: "Unknown".to_string(),
            poster_path: None,
            release_date: None,
            vote_average: None,
        };
        let html = movie_card(&bare, true, "/favorites/remove", &ImageUrls::default());
        assert!(!html.contains("<img"));
        assert!(html.contains("N/A"));
        assert!(html.contains("Remove from favorites"));
        assert!(!html.contains("name=\"poster_path\""));
    }

    #[test]
    fn grid_marks_favorites_by_id() {
        let favorites = FavoritesList::new(vec![movie(2, "Two")]);
        let html = movie_grid(
            &[movie(1, "One"), movie(2, "Two")],
            &favorites,
            "/home/favorites",
            &ImageUrls::default(),
        );
        assert_eq!(html.matches("movie-card").count(), 2);
        assert_eq!(html.matches("Remove from favorites").count(), 2);
        assert_eq!(html.matches("Add to favorites").count(), 2);
    }

    #[test]
    fn empty_grid_says_so() {
        let html = movie_grid(&[], &FavoritesList::default(), "/x", &ImageUrls::default());
        assert!(html.contains("No movies found"));
    }

    #[test]
    fn error_panel_offers_way_home() {
        assert!(error_panel("Movie not found", true).contains("Back to Home"));
        assert!(!error_panel("Failed to search movies", false).contains("Back to Home"));
    }
}
