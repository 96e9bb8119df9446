use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};

/// Minimal movie record used by list views and persisted as a favorite.
#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct MovieSummary {
    pub id: i64,
    pub title: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub poster_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub release_date: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vote_average: Option<f64>,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct Genre {
    pub id: i64,
    pub name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq)]
pub struct CastMember {
    pub id: i64,
    pub name: String,
    #[serde(default)]
    pub character: String,
    #[serde(default)]
    pub profile_path: Option<String>,
}

/// Full movie record shown on the detail page.
#[derive(Debug, Serialize, Clone, PartialEq)]
pub struct MovieDetail {
    pub id: i64,
    pub title: String,
    pub poster_path: Option<String>,
    pub release_date: Option<String>,
    pub vote_average: Option<f64>,
    pub overview: String,
    pub runtime_minutes: Option<u32>,
    pub genres: Vec<Genre>,
    pub backdrop_path: Option<String>,
    pub cast: Vec<CastMember>,
    pub trailer_key: Option<String>,
}

impl MovieDetail {
    pub fn summary(&self) -> MovieSummary {
        MovieSummary {
            id: self.id,
            title: self.title.clone(),
            poster_path: self.poster_path.clone(),
            release_date: self.release_date.clone(),
            vote_average: self.vote_average,
        }
    }
}

#[derive(Debug, Serialize, Clone, PartialEq, Default)]
pub struct SearchResults {
    pub results: Vec<MovieSummary>,
    pub total_pages: u32,
    pub total_results: u32,
}

/// Scope of the trending endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum TimeWindow {
    Day,
    #[default]
    Week,
}

impl TimeWindow {
    pub fn as_str(&self) -> &'static str {
        match self {
            TimeWindow::Day => "day",
            TimeWindow::Week => "week",
        }
    }
}

impl std::str::FromStr for TimeWindow {
    type Err = anyhow::Error;
    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "day" => Ok(TimeWindow::Day),
            "week" => Ok(TimeWindow::Week),
            _ => Err(anyhow::anyhow!("time window must be 'day' or 'week'")),
        }
    }
}

/// Release year as shown on cards, `None` when the date is missing or unparsable.
pub fn release_year(date: Option<&str>) -> Option<i32> {
    date.and_then(|d| d.trim().parse::<NaiveDate>().ok())
        .map(|d| d.year())
}

/// Rating with one decimal. A zero rating counts as unrated.
pub fn format_rating(vote_average: Option<f64>) -> Option<String> {
    vote_average
        .filter(|v| *v != 0.0)
        .map(|v| format!("{v:.1}"))
}

pub fn format_runtime(minutes: Option<u32>) -> Option<String> {
    minutes
        .filter(|m| *m > 0)
        .map(|m| format!("{}h {}m", m / 60, m % 60))
}
