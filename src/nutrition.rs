//! # Nutritionix Module
//!
//! Natural-language nutrient lookup. A food name goes in, the nutrition facts
//! of one serving come out.

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::json;
use tracing::debug;

use crate::config::NutritionixCredentials;
use crate::service_errors::ServiceError;

pub const NUTRITIONIX_SERVICE: &str = "nutritionix";
pub const NUTRITIONIX_ENDPOINT: &str = "https://trackapi.nutritionix.com/v2/natural/nutrients";

/// Nutrition facts for one serving of a food
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct NutritionFacts {
    pub food_name: String,
    pub serving_qty: f64,
    pub serving_unit: String,
    pub serving_weight_grams: Option<f64>,
    pub calories: f64,
    pub protein_g: f64,
    pub total_fat_g: f64,
    pub saturated_fat_g: f64,
    pub total_carbohydrate_g: f64,
    pub dietary_fiber_g: f64,
    pub sugars_g: f64,
    pub sodium_mg: f64,
    pub potassium_mg: f64,
    pub cholesterol_mg: f64,
}

/// Anything that can look up nutrition facts by food name
#[async_trait]
pub trait NutritionLookup: Send + Sync {
    /// `Ok(None)` when the service knows no such food
    async fn lookup(&self, query: &str) -> Result<Option<NutritionFacts>, ServiceError>;
}

#[derive(Debug, Deserialize)]
struct NutrientsResponse {
    #[serde(default)]
    foods: Vec<FoodItem>,
}

#[derive(Debug, Deserialize)]
struct FoodItem {
    food_name: String,
    serving_qty: Option<f64>,
    serving_unit: Option<String>,
    serving_weight_grams: Option<f64>,
    nf_calories: Option<f64>,
    nf_protein: Option<f64>,
    nf_total_fat: Option<f64>,
    nf_saturated_fat: Option<f64>,
    nf_total_carbohydrate: Option<f64>,
    nf_dietary_fiber: Option<f64>,
    nf_sugars: Option<f64>,
    nf_sodium: Option<f64>,
    nf_potassium: Option<f64>,
    nf_cholesterol: Option<f64>,
}

impl From<FoodItem> for NutritionFacts {
    fn from(item: FoodItem) -> Self {
        Self {
            food_name: item.food_name,
            serving_qty: item.serving_qty.unwrap_or(1.0),
            serving_unit: item.serving_unit.unwrap_or_else(|| "serving".to_string()),
            serving_weight_grams: item.serving_weight_grams,
            calories: item.nf_calories.unwrap_or_default(),
            protein_g: item.nf_protein.unwrap_or_default(),
            total_fat_g: item.nf_total_fat.unwrap_or_default(),
            saturated_fat_g: item.nf_saturated_fat.unwrap_or_default(),
            total_carbohydrate_g: item.nf_total_carbohydrate.unwrap_or_default(),
            dietary_fiber_g: item.nf_dietary_fiber.unwrap_or_default(),
            sugars_g: item.nf_sugars.unwrap_or_default(),
            sodium_mg: item.nf_sodium.unwrap_or_default(),
            potassium_mg: item.nf_potassium.unwrap_or_default(),
            cholesterol_mg: item.nf_cholesterol.unwrap_or_default(),
        }
    }
}

/// First food of a `natural/nutrients` response body
pub fn parse_nutrients_response(body: &str) -> Result<Option<NutritionFacts>, ServiceError> {
    let response: NutrientsResponse =
        serde_json::from_str(body).map_err(|e| ServiceError::decode(NUTRITIONIX_SERVICE, e))?;
    Ok(response.foods.into_iter().next().map(NutritionFacts::from))
}

/// Nutritionix REST client
#[derive(Debug, Clone)]
pub struct NutritionixClient {
    http: reqwest::Client,
    credentials: NutritionixCredentials,
    endpoint: String,
}

impl NutritionixClient {
    pub fn new(http: reqwest::Client, credentials: NutritionixCredentials) -> Self {
        Self {
            http,
            credentials,
            endpoint: NUTRITIONIX_ENDPOINT.to_string(),
        }
    }

    pub fn with_endpoint(mut self, endpoint: impl Into<String>) -> Self {
        self.endpoint = endpoint.into();
        self
    }
}

#[async_trait]
impl NutritionLookup for NutritionixClient {
    async fn lookup(&self, query: &str) -> Result<Option<NutritionFacts>, ServiceError> {
        let response = self
            .http
            .post(&self.endpoint)
            .header("x-app-id", &self.credentials.app_id)
            .header("x-app-key", &self.credentials.api_key)
            .json(&json!({ "query": query }))
            .send()
            .await
            .map_err(|e| ServiceError::transport(NUTRITIONIX_SERVICE, e))?;

        let status = response.status();
        let text = response
            .text()
            .await
            .map_err(|e| ServiceError::transport(NUTRITIONIX_SERVICE, e))?;

        // 404 is how the natural endpoint says "couldn't match any of your foods"
        if status == StatusCode::NOT_FOUND {
            debug!(query, "Nutritionix has no match");
            return Ok(None);
        }
        if !status.is_success() {
            return Err(ServiceError::Status {
                service: NUTRITIONIX_SERVICE,
                status: status.as_u16(),
                body: text,
            });
        }

        parse_nutrients_response(&text)
    }
}
