//! Nutrition estimate parsing
//!
//! Meal logging asks an external model for a nutrition estimate and gets back
//! free text that should contain one JSON object. This module pulls that
//! object out and turns it into a [`MealEntry`].

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::ComputeError;
use crate::types::MealEntry;

/// Name used when the estimate does not provide one
pub const DEFAULT_MEAL_NAME: &str = "Meal";

/// Nutrition values as returned by the model; every field is optional.
///
/// Numbers may arrive quoted (`"250"`); values that are not numeric are
/// treated as missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NutritionEstimate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub calories: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub protein: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub fat: Option<f64>,
    #[serde(default, deserialize_with = "lenient_number")]
    pub carbs: Option<f64>,
}

fn lenient_number<'de, D>(deserializer: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = Value::deserialize(deserializer)?;
    Ok(match raw {
        Value::Number(n) => n.as_f64(),
        Value::String(s) => s.trim().parse::<f64>().ok().filter(|v| v.is_finite()),
        _ => None,
    })
}

impl NutritionEstimate {
    /// Parse the JSON object spanning the first `{` to the last `}` of `reply`
    pub fn from_reply(reply: &str) -> Result<Self, ComputeError> {
        let start = reply
            .find('{')
            .ok_or_else(|| ComputeError::EstimateParse("no JSON object in reply".to_string()))?;
        let end = reply
            .rfind('}')
            .filter(|&end| end > start)
            .ok_or_else(|| ComputeError::EstimateParse("unterminated JSON object in reply".to_string()))?;

        serde_json::from_str(&reply[start..=end])
            .map_err(|e| ComputeError::EstimateParse(e.to_string()))
    }

    /// Convert into a meal entry; missing or negative numbers become 0
    pub fn into_meal(self, user_id: impl Into<String>, created_at: DateTime<Utc>) -> MealEntry {
        let name = self
            .name
            .map(|n| n.trim().to_string())
            .filter(|n| !n.is_empty())
            .unwrap_or_else(|| DEFAULT_MEAL_NAME.to_string());

        let calories = non_negative(self.calories).round().min(f64::from(u32::MAX)) as u32;

        MealEntry::new(
            user_id,
            name,
            calories,
            non_negative(self.protein),
            non_negative(self.fat),
            non_negative(self.carbs),
            created_at,
        )
    }
}

fn non_negative(value: Option<f64>) -> f64 {
    value.filter(|v| v.is_finite() && *v > 0.0).unwrap_or(0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn test_extracts_object_from_chatter() {
        let reply = "Sure! Here it is:\n```json\n{\"name\": \"Omelette\", \"calories\": 312.6, \
                     \"protein\": 21, \"fat\": 24.5, \"carbs\": 1.2}\n```";
        let estimate = NutritionEstimate::from_reply(reply).unwrap();

        assert_eq!(estimate.name.as_deref(), Some("Omelette"));
        assert_eq!(estimate.calories, Some(312.6));

        let at = Utc.with_ymd_and_hms(2024, 1, 15, 9, 0, 0).unwrap();
        let meal = estimate.into_meal("u1", at);
        assert_eq!(meal.calories, 313);
        assert_eq!(meal.protein, 21.0);
        assert_eq!(meal.user_id, "u1");
        assert_eq!(meal.created_at, at);
        assert!(meal.validate().is_ok());
    }

    #[test]
    fn test_missing_fields_default() {
        let estimate = NutritionEstimate::from_reply("{}").unwrap();
        let meal = estimate.into_meal("u1", Utc::now());

        assert_eq!(meal.name, DEFAULT_MEAL_NAME);
        assert_eq!(meal.calories, 0);
        assert_eq!(meal.carbs, 0.0);
    }

    #[test]
    fn test_negative_values_clamped() {
        let estimate = NutritionEstimate::from_reply(r#"{"name": " ", "calories": -50, "fat": -3}"#).unwrap();
        let meal = estimate.into_meal("u1", Utc::now());

        assert_eq!(meal.name, DEFAULT_MEAL_NAME);
        assert_eq!(meal.calories, 0);
        assert_eq!(meal.fat, 0.0);
    }

    #[test]
    fn test_quoted_numbers_accepted() {
        let reply = r#"{"name": "Kanapka", "calories": "250", "protein": " 10.5 ", "fat": "a little", "carbs": null}"#;
        let estimate = NutritionEstimate::from_reply(reply).unwrap();

        assert_eq!(estimate.calories, Some(250.0));
        assert_eq!(estimate.protein, Some(10.5));
        assert_eq!(estimate.fat, None);
        assert_eq!(estimate.carbs, None);

        let meal = estimate.into_meal("u1", Utc::now());
        assert_eq!(meal.name, "Kanapka");
        assert_eq!(meal.calories, 250);
        assert_eq!(meal.fat, 0.0);
    }

    #[test]
    fn test_no_object() {
        assert!(matches!(
            NutritionEstimate::from_reply("I cannot see any food here."),
            Err(ComputeError::EstimateParse(_))
        ));
        assert!(NutritionEstimate::from_reply("} oops {").is_err());
        assert!(NutritionEstimate::from_reply("{\"calories\": }").is_err());
    }
}
