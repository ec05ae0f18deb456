//! # Macro Estimator Module
//!
//! Turns a food photo into a nutrition report: Vision names what it sees,
//! and the confident labels are tried against Nutritionix in order until
//! one of them is a known food.

use std::collections::HashSet;
use std::sync::Arc;

use image::ImageFormat;
use tracing::{debug, info, warn};

use crate::circuit_breaker::CircuitBreaker;
use crate::nutrition::{NutritionFacts, NutritionLookup, NUTRITIONIX_SERVICE};
use crate::retry::with_retry;
use crate::service_errors::ServiceError;
use crate::settings::{BotSettings, RecoveryConfig};
use crate::vision::{Label, LabelDetector, VISION_SERVICE};

/// Minimum bytes needed to recognize an image format
pub const MIN_FORMAT_BYTES: usize = 8;

/// The identified food and its nutrition facts
#[derive(Debug, Clone, PartialEq)]
pub struct FoodReport {
    /// Vision label that produced a match
    pub food: String,
    pub facts: NutritionFacts,
}

/// Check size and magic bytes of an incoming image
pub fn validate_image(bytes: &[u8], max_bytes: usize) -> Result<ImageFormat, ServiceError> {
    if bytes.len() < MIN_FORMAT_BYTES {
        return Err(ServiceError::ImageRejected(format!(
            "{} bytes is too small to be an image",
            bytes.len()
        )));
    }
    if bytes.len() > max_bytes {
        return Err(ServiceError::ImageRejected(format!(
            "{} bytes exceeds the {max_bytes} byte limit",
            bytes.len()
        )));
    }

    let format = image::guess_format(bytes)
        .map_err(|_| ServiceError::ImageRejected("unrecognized image format".to_string()))?;

    // Formats the Vision API accepts
    let supported = matches!(
        format,
        ImageFormat::Jpeg
            | ImageFormat::Png
            | ImageFormat::Gif
            | ImageFormat::WebP
            | ImageFormat::Bmp
            | ImageFormat::Tiff
            | ImageFormat::Ico
    );
    if !supported {
        return Err(ServiceError::ImageRejected(format!(
            "unsupported image format: {format:?}"
        )));
    }
    Ok(format)
}

/// Labels scoring strictly above `threshold`, in order, without case-insensitive duplicates
pub fn food_candidates(labels: &[Label], threshold: f32) -> Vec<String> {
    let mut seen = HashSet::new();
    labels
        .iter()
        .filter(|label| label.score > threshold)
        .map(|label| label.description.trim())
        .filter(|description| !description.is_empty())
        .filter(|description| seen.insert(description.to_lowercase()))
        .map(str::to_string)
        .collect()
}

/// Photo-to-macros pipeline shared by all handlers
pub struct MacroEstimator {
    detector: Arc<dyn LabelDetector>,
    nutrition: Arc<dyn NutritionLookup>,
    threshold: f32,
    max_image_bytes: usize,
    recovery: RecoveryConfig,
    vision_breaker: CircuitBreaker,
    nutrition_breaker: CircuitBreaker,
}

impl MacroEstimator {
    pub fn new(
        detector: Arc<dyn LabelDetector>,
        nutrition: Arc<dyn NutritionLookup>,
        settings: &BotSettings,
    ) -> Self {
        Self {
            detector,
            nutrition,
            threshold: settings.label_confidence_threshold,
            max_image_bytes: settings.max_image_bytes,
            recovery: settings.recovery.clone(),
            vision_breaker: CircuitBreaker::new(VISION_SERVICE, settings.recovery.clone()),
            nutrition_breaker: CircuitBreaker::new(NUTRITIONIX_SERVICE, settings.recovery.clone()),
        }
    }

    pub fn max_image_bytes(&self) -> usize {
        self.max_image_bytes
    }

    /// Identify the food in `image` and look up its nutrition facts
    ///
    /// Returns `Ok(None)` when no label is confident enough or none of the
    /// confident labels is a food Nutritionix knows.
    pub async fn estimate(&self, image: &[u8]) -> Result<Option<FoodReport>, ServiceError> {
        let format = validate_image(image, self.max_image_bytes)?;
        debug!(?format, bytes = image.len(), "Image accepted");

        let labels = with_retry(&self.vision_breaker, &self.recovery, || {
            self.detector.detect_labels(image)
        })
        .await?;

        for label in &labels {
            debug!(label = %label.description, score = label.score, "Detected label");
        }

        let candidates = food_candidates(&labels, self.threshold);
        if candidates.is_empty() {
            info!(
                labels = labels.len(),
                threshold = self.threshold,
                "No label above confidence threshold"
            );
            return Ok(None);
        }

        let mut last_error = None;
        let mut any_answered = false;

        for candidate in candidates {
            let result = with_retry(&self.nutrition_breaker, &self.recovery, || {
                self.nutrition.lookup(&candidate)
            })
            .await;

            match result {
                Ok(Some(facts)) => {
                    info!(food = %candidate, "Found nutrition data");
                    return Ok(Some(FoodReport {
                        food: candidate,
                        facts,
                    }));
                }
                Ok(None) => {
                    debug!(food = %candidate, "No nutrition data for label");
                    any_answered = true;
                }
                Err(e @ ServiceError::CircuitOpen(_)) => return Err(e),
                Err(e) => {
                    warn!(food = %candidate, error = %e, "Nutrition lookup failed");
                    last_error = Some(e);
                }
            }
        }

        match last_error {
            Some(e) if !any_answered => Err(e),
            _ => Ok(None),
        }
    }
}
