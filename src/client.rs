use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

#[derive(Debug, Error)]
pub enum ClientError {
    #[error("request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("HTTP error! status: {0}")]
    Status(reqwest::StatusCode),
}

#[derive(Serialize)]
struct RecipeRequest<'a> {
    ingredients: &'a [String],
}

#[derive(Deserialize)]
struct RecipeBody {
    #[serde(default)]
    recipe: Option<String>,
}

/// Calls the recipe service's `POST /api/recipe` endpoint.
#[derive(Debug, Clone)]
pub struct RecipeClient {
    http: reqwest::Client,
    endpoint: String,
}

impl RecipeClient {
    pub fn new(api_url: &str) -> Self {
        RecipeClient {
            http: reqwest::Client::new(),
            endpoint: format!("{}/api/recipe", api_url.trim_end_matches('/')),
        }
    }

    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Returns the generated recipe, or an empty string when the service
    /// answered without one.
    pub async fn fetch_recipe(&self, ingredients: &[String]) -> Result<String, ClientError> {
        debug!(count = ingredients.len(), endpoint = %self.endpoint, "Requesting recipe");
        let response = self
            .http
            .post(&self.endpoint)
            .json(&RecipeRequest { ingredients })
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(ClientError::Status(response.status()));
        }

        let body: RecipeBody = response.json().await?;
        Ok(body.recipe.unwrap_or_default())
    }
}

/// Splits free-form input like `"eggs, milk,, flour "` into ingredient names.
pub fn parse_ingredients(text: &str) -> Vec<String> {
    text.split(',')
        .map(str::trim)
        .filter(|item| !item.is_empty())
        .map(str::to_owned)
        .collect()
}
