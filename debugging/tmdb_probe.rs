//! Run one TMDB client call and print the mapped result.
//! Usage:
//!   cargo run --bin tmdb_probe -- trending [day|week]
//!   cargo run --bin tmdb_probe -- popular [page]
//!   cargo run --bin tmdb_probe -- search <query> [page]
//!   cargo run --bin tmdb_probe -- movie <tmdb_id>
//! Reads TMDB_API_KEY and TMDB_BASE_URL from the environment (.env supported).

use anyhow::{Context, Result};
use dotenvy::dotenv;
use movieflix::config::Config;
use movieflix::models::TimeWindow;
use movieflix::tmdb::{ImageUrls, TmdbApi, TmdbClient, POSTER_SIZE};
use serde_json::{json, Value};
use std::env;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq)]
enum Call {
    Trending,
    Popular,
    Search,
    Movie,
}

impl FromStr for Call {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "trending" => Ok(Call::Trending),
            "popular" => Ok(Call::Popular),
            "search" => Ok(Call::Search),
            "movie" => Ok(Call::Movie),
            _ => Err(anyhow::anyhow!(
                "call must be one of 'trending', 'popular', 'search', 'movie'"
            )),
        }
    }
}

fn usage() -> ! {
    eprintln!("Usage: cargo run --bin tmdb_probe -- trending [day|week]");
    eprintln!("       cargo run --bin tmdb_probe -- popular [page]");
    eprintln!("       cargo run --bin tmdb_probe -- search <query> [page]");
    eprintln!("       cargo run --bin tmdb_probe -- movie <tmdb_id>");
    std::process::exit(1);
}

fn page_arg(arg: Option<&String>) -> Result<u32> {
    match arg {
        None => Ok(1),
        Some(p) => p
            .parse::<u32>()
            .ok()
            .filter(|&p| p > 0)
            .context("page must be a positive integer"),
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        usage();
    }

    let call = Call::from_str(&args[1])?;
    let config = Config::from_env()?;
    eprintln!("{}", config.api_key_status());
    let client = TmdbClient::new(&config.api_base_url, config.api_key.clone());
    let images = ImageUrls::new(&config.image_base_url);

    let output: Value = match call {
        Call::Trending => {
            let window = args
                .get(2)
                .map(|w| TimeWindow::from_str(w))
                .transpose()?
                .unwrap_or_default();
            let movies = client.trending(window, 1).await?;
            json!(movies)
        }
        Call::Popular => {
            let movies = client.popular(page_arg(args.get(2))?).await?;
            json!(movies)
        }
        Call::Search => {
            let Some(query) = args.get(2) else { usage() };
            let results = client.search_movies(query, page_arg(args.get(3))?).await?;
            json!(results)
        }
        Call::Movie => {
            let id: i64 = args
                .get(2)
                .context("missing tmdb_id")?
                .parse()
                .context("tmdb_id must be an integer")?;
            let movie = client.movie_details(id).await?;
            let poster = images.poster_url(movie.poster_path.as_deref(), POSTER_SIZE);
            json!({ "movie": movie, "poster_url": poster })
        }
    };

    println!("{}", serde_json::to_string_pretty(&output)?);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_defaults_to_one_and_rejects_zero() {
        assert_eq!(page_arg(None).unwrap(), 1);
        assert_eq!(page_arg(Some(&"3".to_string())).unwrap(), 3);
        assert!(page_arg(Some(&"0".to_string())).is_err());
        assert!(page_arg(Some(&"-2".to_string())).is_err());
    }
}
