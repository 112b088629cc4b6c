use reqwest::blocking::Client;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;

use crate::models::CatalogExercise;

pub const DEFAULT_CATALOG_URL: &str = "https://wger.de/api/v2/exerciseinfo/?limit=100";

const MAX_PAGES: usize = 5;
const ENGLISH: u64 = 2;

#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("Catalog rate limit reached")]
    RateLimited,
    #[error("{0}")]
    ServerError(String),
    #[error("Network error: {0}")]
    Network(String),
    #[error("Parse error: {0}")]
    Parse(String),
}

#[derive(Debug, Deserialize)]
struct Page<T> {
    #[serde(default)]
    next: Option<String>,
    #[serde(default = "Vec::new")]
    results: Vec<T>,
}

#[derive(Debug, Deserialize)]
struct RawExercise {
    id: u64,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    category: Option<RawCategory>,
    #[serde(default)]
    translations: Vec<RawTranslation>,
}

#[derive(Debug, Deserialize)]
struct RawCategory {
    name: String,
}

#[derive(Debug, Deserialize)]
struct RawTranslation {
    name: String,
    #[serde(default)]
    language: Option<u64>,
}

impl RawExercise {
    fn into_exercise(self) -> Option<CatalogExercise> {
        let name = self
            .translations
            .iter()
            .find(|translation| translation.language == Some(ENGLISH))
            .or_else(|| self.translations.first())
            .map(|translation| translation.name.clone())
            .or(self.name)?;
        let name = name.trim().to_string();
        if name.is_empty() {
            return None;
        }
        Some(CatalogExercise {
            id: self.id,
            name,
            category: self.category.map(|category| category.name),
        })
    }
}

pub struct CatalogClient {
    client: Client,
    url: String,
}

impl CatalogClient {
    pub fn new(url: String) -> Result<Self, CatalogError> {
        let client = Client::builder()
            .user_agent("liftlog-tui")
            .timeout(Duration::from_secs(20))
            .build()
            .map_err(|err| CatalogError::Network(err.to_string()))?;
        Ok(Self { client, url })
    }

    /// Follows `next` links for at most a handful of pages.
    pub fn fetch_exercises(&self) -> Result<Vec<CatalogExercise>, CatalogError> {
        let mut exercises = Vec::new();
        let mut next = Some(self.url.clone());
        let mut pages = 0;

        while let Some(url) = next.take() {
            if pages == MAX_PAGES {
                tracing::debug!(pages, "catalog page limit reached");
                break;
            }
            let page: Page<RawExercise> = self.fetch(&url)?;
            pages += 1;
            exercises.extend(page.results.into_iter().filter_map(RawExercise::into_exercise));
            next = page.next;
        }

        tracing::info!(count = exercises.len(), pages, "fetched exercise catalog");
        Ok(exercises)
    }

    fn fetch<T: DeserializeOwned>(&self, url: &str) -> Result<T, CatalogError> {
        let response = self
            .client
            .get(url)
            .header("Accept", "application/json")
            .send()
            .map_err(|err| CatalogError::Network(err.to_string()))?;

        if response.status() == 429 {
            return Err(CatalogError::RateLimited);
        }

        if response.status().is_server_error() {
            return Err(CatalogError::ServerError(format!(
                "Catalog API error: {}",
                response.status()
            )));
        }

        if !response.status().is_success() {
            return Err(CatalogError::Network(format!(
                "Catalog API error: {}",
                response.status()
            )));
        }

        response
            .json::<T>()
            .map_err(|err| CatalogError::Parse(err.to_string()))
    }
}
