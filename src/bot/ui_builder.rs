//! UI Builder module for formatting bot replies

use crate::estimator::FoodReport;
use crate::localization::{t_args_lang, t_lang};
use crate::nutrition::NutritionFacts;

const SEPARATOR: &str = "━━━━━━━━━━━━━━━━━━━━━";

/// Capitalize the first letter of every word
pub fn title_case(text: &str) -> String {
    text.split_whitespace()
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

/// Grams with one decimal
pub fn format_grams(value: f64) -> String {
    format!("{value:.1}")
}

/// Milligrams and kilocalories rounded to whole numbers
pub fn format_whole(value: f64) -> String {
    format!("{:.0}", value.round())
}

/// Quantity with at most two decimals and no trailing zeros
pub fn format_quantity(value: f64) -> String {
    let rendered = format!("{value:.2}");
    rendered
        .trim_end_matches('0')
        .trim_end_matches('.')
        .to_string()
}

/// "1 medium (118 g)"
pub fn format_serving(facts: &NutritionFacts) -> String {
    let mut serving = format!("{} {}", format_quantity(facts.serving_qty), facts.serving_unit);
    if let Some(grams) = facts.serving_weight_grams {
        serving.push_str(&format!(" ({} g)", format_quantity(grams)));
    }
    serving
}

/// Full nutrition report for a chat reply
pub fn format_food_report(report: &FoodReport, language_code: Option<&str>) -> String {
    let facts = &report.facts;
    let food = title_case(&report.food);
    let serving = format_serving(facts);
    let line = |key: &str, value: String| t_args_lang(key, &[("value", value.as_str())], language_code);

    let lines = [
        t_args_lang("report-title", &[("food", food.as_str())], language_code),
        t_args_lang("report-serving", &[("serving", serving.as_str())], language_code),
        String::new(),
        t_lang("report-macros-header", language_code),
        SEPARATOR.to_string(),
        line("report-calories", format_whole(facts.calories)),
        line("report-protein", format_grams(facts.protein_g)),
        line("report-fat", format_grams(facts.total_fat_g)),
        line("report-carbs", format_grams(facts.total_carbohydrate_g)),
        line("report-fiber", format_grams(facts.dietary_fiber_g)),
        line("report-sugar", format_grams(facts.sugars_g)),
        String::new(),
        t_lang("report-minerals-header", language_code),
        SEPARATOR.to_string(),
        line("report-sodium", format_whole(facts.sodium_mg)),
        line("report-potassium", format_whole(facts.potassium_mg)),
        line("report-cholesterol", format_whole(facts.cholesterol_mg)),
    ];

    lines.join("\n")
}
