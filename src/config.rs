use anyhow::{Context, Result};
use std::env;
use std::net::SocketAddr;
use std::path::PathBuf;

use crate::tmdb::{DEFAULT_API_BASE, DEFAULT_IMAGE_BASE};

const DEFAULT_DATA_DIR: &str = "data";
const DEFAULT_ADDR: &str = "0.0.0.0:3146";
const KEY_PREVIEW_CHARS: usize = 8;

#[derive(Debug, Clone)]
pub struct Config {
    pub api_key: Option<String>,
    pub api_base_url: String,
    pub image_base_url: String,
    pub data_dir: PathBuf,
    pub addr: SocketAddr,
}

impl Config {
    pub fn from_env() -> Result<Self> {
        let addr = var_or("MOVIEFLIX_ADDR", DEFAULT_ADDR);
        Ok(Self {
            api_key: env::var("TMDB_API_KEY").ok().filter(|k| !k.trim().is_empty()),
            api_base_url: var_or("TMDB_BASE_URL", DEFAULT_API_BASE),
            image_base_url: var_or("TMDB_IMAGE_BASE_URL", DEFAULT_IMAGE_BASE),
            data_dir: PathBuf::from(var_or("MOVIEFLIX_DATA_DIR", DEFAULT_DATA_DIR)),
            addr: addr
                .parse()
                .with_context(|| format!("MOVIEFLIX_ADDR is not a socket address: {addr}"))?,
        })
    }

    /// Status line for the key; only a short prefix is ever shown.
    pub fn api_key_status(&self) -> String {
        api_key_status(self.api_key.as_deref())
    }
}

pub fn api_key_status(api_key: Option<&str>) -> String {
    match api_key {
        Some(key) => {
            let preview: String = key.chars().take(KEY_PREVIEW_CHARS).collect();
            format!("TMDB API Key Loaded ({preview}...)")
        }
        None => "API Key Not Found".to_string(),
    }
}

fn var_or(key: &str, default: &str) -> String {
    env::var(key)
        .ok()
        .filter(|v| !v.trim().is_empty())
        .unwrap_or_else(|| default.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn key_status_only_shows_prefix() {
        assert_eq!(
            api_key_status(Some("0123456789abcdef")),
            "TMDB API Key Loaded (01234567...)"
        );
        assert_eq!(api_key_status(None), "API Key Not Found");
    }
}
