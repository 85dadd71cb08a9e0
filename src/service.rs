use std::sync::Arc;

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, error};

use crate::error::ServiceError;
use crate::generator::{GenerationError, RecipeGenerator};

pub const SYSTEM_PROMPT: &str = "You are a professional chef. Write clear, practical recipes.";
pub const TEMPERATURE: f32 = 0.7;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecipeResponse {
    pub recipe: String,
}

pub fn user_prompt(ingredients: &[String]) -> String {
    format!(
        "Create a recipe using these ingredients: {}",
        ingredients.join(", ")
    )
}

/// Extracts the `ingredients` array from a request body. Any other fields are
/// ignored.
pub fn ingredients_from_payload(payload: &Value) -> Result<Vec<String>, ServiceError> {
    let items = payload
        .get("ingredients")
        .and_then(Value::as_array)
        .filter(|items| !items.is_empty())
        .ok_or(ServiceError::InvalidInput)?;

    items
        .iter()
        .map(|item| {
            item.as_str()
                .map(str::to_owned)
                .ok_or(ServiceError::InvalidInput)
        })
        .collect()
}

/// Stateless front for a [`RecipeGenerator`].
#[derive(Clone)]
pub struct RecipeService {
    generator: Arc<dyn RecipeGenerator>,
}

impl RecipeService {
    pub fn new(generator: Arc<dyn RecipeGenerator>) -> Self {
        RecipeService { generator }
    }

    pub async fn generate_recipe(
        &self,
        ingredients: &[String],
    ) -> Result<RecipeResponse, ServiceError> {
        if ingredients.is_empty() {
            return Err(ServiceError::InvalidInput);
        }

        debug!(count = ingredients.len(), "Generating recipe");
        let prompt = user_prompt(ingredients);
        match self
            .generator
            .generate(SYSTEM_PROMPT, &prompt, TEMPERATURE)
            .await
        {
            Ok(recipe) if !recipe.trim().is_empty() => Ok(RecipeResponse { recipe }),
            Ok(_) => {
                error!("Provider returned an empty recipe");
                Err(ServiceError::GenerationFailed(
                    GenerationError::EmptyCompletion,
                ))
            }
            Err(e) => {
                error!(error = %e, "Recipe generation failed");
                Err(ServiceError::GenerationFailed(e))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::generator::MockRecipeGenerator;
    use serde_json::json;

    fn ingredients(items: &[&str]) -> Vec<String> {
        items.iter().map(|s| s.to_string()).collect()
    }

    #[test]
    fn payload_with_strings_is_accepted() {
        let payload = json!({ "ingredients": ["eggs", "spinach"], "extra": true });
        assert_eq!(
            ingredients_from_payload(&payload).unwrap(),
            ingredients(&["eggs", "spinach"])
        );
    }

    #[test]
    fn payload_without_array_is_rejected() {
        for payload in [
            json!({ "ingredients": [] }),
            json!({ "ingredients": "eggs" }),
            json!({ "ingredients": null }),
            json!({ "other": ["eggs"] }),
            json!(["eggs"]),
            json!({ "ingredients": ["eggs", 3] }),
        ] {
            assert!(
                matches!(
                    ingredients_from_payload(&payload),
                    Err(ServiceError::InvalidInput)
                ),
                "{payload} should be rejected"
            );
        }
    }

    #[test]
    fn user_prompt_joins_ingredients() {
        assert_eq!(
            user_prompt(&ingredients(&["rice", "beans", "lime"])),
            "Create a recipe using these ingredients: rice, beans, lime"
        );
    }

    #[tokio::test]
    async fn provider_text_is_returned_verbatim() {
        let mut generator = MockRecipeGenerator::new();
        generator
            .expect_generate()
            .withf(|system, user, temperature| {
                system.to_string() == SYSTEM_PROMPT
                    && user.to_string() == "Create a recipe using these ingredients: eggs, cheese"
                    && (*temperature - TEMPERATURE).abs() < f32::EPSILON
            })
            .times(1)
            .returning(|_, _, _| Ok("## Cheese Omelette\n- eggs\n- cheese".to_string()));

        let service = RecipeService::new(Arc::new(generator));
        let response = service
            .generate_recipe(&ingredients(&["eggs", "cheese"]))
            .await
            .unwrap();
        assert_eq!(response.recipe, "## Cheese Omelette\n- eggs\n- cheese");
    }

    #[tokio::test]
    async fn provider_errors_collapse_to_generation_failed() {
        let mut generator = MockRecipeGenerator::new();
        generator.expect_generate().returning(|_, _, _| {
            Err(GenerationError::Status {
                status: 429,
                body: "rate limited".to_string(),
            })
        });

        let service = RecipeService::new(Arc::new(generator));
        let err = service
            .generate_recipe(&ingredients(&["flour"]))
            .await
            .unwrap_err();
        assert!(matches!(err, ServiceError::GenerationFailed(_)));
        assert_eq!(err.to_string(), "Failed to generate recipe");
    }

    #[tokio::test]
    async fn blank_provider_text_is_a_failure() {
        let mut generator = MockRecipeGenerator::new();
        generator
            .expect_generate()
            .returning(|_, _, _| Ok("  \n".to_string()));

        let service = RecipeService::new(Arc::new(generator));
        let err = service
            .generate_recipe(&ingredients(&["flour"]))
            .await
            .unwrap_err();
        assert!(matches!(
            err,
            ServiceError::GenerationFailed(GenerationError::EmptyCompletion)
        ));
    }

    #[tokio::test]
    async fn empty_ingredients_never_reach_provider() {
        let mut generator = MockRecipeGenerator::new();
        generator.expect_generate().times(0);

        let service = RecipeService::new(Arc::new(generator));
        let err = service.generate_recipe(&[]).await.unwrap_err();
        assert!(matches!(err, ServiceError::InvalidInput));
    }
}
