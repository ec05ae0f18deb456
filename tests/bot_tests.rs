use macrocalbot::bot::ui_builder::{
    format_food_report, format_grams, format_quantity, format_serving, format_whole, title_case,
};
use macrocalbot::estimator::FoodReport;
use macrocalbot::nutrition::NutritionFacts;

#[cfg(test)]
mod tests {
    use super::*;

    fn banana_report() -> FoodReport {
        FoodReport {
            food: "banana".to_string(),
            facts: NutritionFacts {
                food_name: "banana".to_string(),
                serving_qty: 1.0,
                serving_unit: "medium".to_string(),
                serving_weight_grams: Some(118.0),
                calories: 105.02,
                protein_g: 1.29,
                total_fat_g: 0.39,
                saturated_fat_g: 0.13,
                total_carbohydrate_g: 26.96,
                dietary_fiber_g: 3.07,
                sugars_g: 14.43,
                sodium_mg: 1.18,
                potassium_mg: 422.44,
                cholesterol_mg: 0.0,
            },
        }
    }

    #[test]
    fn test_title_case() {
        assert_eq!(title_case("banana"), "Banana");
        assert_eq!(title_case("chicken  BREAST"), "Chicken Breast");
        assert_eq!(title_case(""), "");
    }

    #[test]
    fn test_number_formatting() {
        assert_eq!(format_grams(26.96), "27.0");
        assert_eq!(format_grams(0.39), "0.4");
        assert_eq!(format_whole(422.44), "422");
        assert_eq!(format_whole(1.5), "2");
        assert_eq!(format_quantity(1.0), "1");
        assert_eq!(format_quantity(0.25), "0.25");
        assert_eq!(format_quantity(1.5), "1.5");
    }

    #[test]
    fn test_serving_description() {
        let report = banana_report();
        assert_eq!(format_serving(&report.facts), "1 medium (118 g)");

        let mut facts = report.facts;
        facts.serving_weight_grams = None;
        facts.serving_qty = 0.5;
        facts.serving_unit = "cup".to_string();
        assert_eq!(format_serving(&facts), "0.5 cup");
    }

    #[test]
    fn test_report_in_english() {
        let message = format_food_report(&banana_report(), Some("en"));

        assert!(message.starts_with("🍽 Identified Food: Banana"));
        assert!(message.contains("Serving: 1 medium (118 g)"));
        assert!(message.contains("• Calories: 105 kcal"));
        assert!(message.contains("• Fat: 0.4g"));
        assert!(message.contains("• Carbohydrates: 27.0g"));
        assert!(message.contains("     ├ Fiber: 3.1g"));
        assert!(message.contains("     └ Sugar: 14.4g"));
        assert!(message.contains("• Potassium: 422mg"));
        assert!(message.contains("• Cholesterol: 0mg"));
        assert!(!message.contains('\u{2068}')); // no Unicode isolation marks
    }

    #[test]
    fn test_report_in_french() {
        let message = format_food_report(&banana_report(), Some("fr-FR"));
        assert!(message.starts_with("🍽 Aliment identifié : Banana"));
        assert!(message.contains("Glucides : 27.0g"));
    }
}
