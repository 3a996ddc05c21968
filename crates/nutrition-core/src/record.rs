//! Record types for the nutrition sync service
//!
//! Defines the stored row, the create and partial-update payloads, and the
//! denormalized document that is mirrored into the search index.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::{NutritionError, Result};

/// A food nutrition record as held by the system of record
///
/// `id` is assigned by the store and never changes. `food_cd` is the unique
/// business key. Every numeric field is optional: absence means "unknown",
/// not zero.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NutritionRecord {
    pub id: i64,
    pub food_cd: String,
    pub food_name: String,
    pub group_name: Option<String>,
    pub research_year: Option<String>,
    pub maker_name: Option<String>,
    pub ref_name: Option<String>,
    pub serving_size: Option<f64>,
    pub calorie: Option<f64>,
    pub carbohydrate: Option<f64>,
    pub protein: Option<f64>,
    #[serde(alias = "province")]
    pub fat: Option<f64>,
    pub sugars: Option<f64>,
    pub salt: Option<f64>,
    pub cholesterol: Option<f64>,
    pub saturated_fatty_acids: Option<f64>,
    pub trans_fat: Option<f64>,
}

impl NutritionRecord {
    /// Apply a partial update in place; fields absent from the patch keep their values
    pub fn apply(&mut self, patch: &RecordPatch) {
        if let Some(ref v) = patch.food_cd {
            self.food_cd = v.trim().to_string();
        }
        if let Some(ref v) = patch.food_name {
            self.food_name = v.trim().to_string();
        }
        merge(&mut self.group_name, &patch.group_name);
        merge(&mut self.research_year, &patch.research_year);
        merge(&mut self.maker_name, &patch.maker_name);
        merge(&mut self.ref_name, &patch.ref_name);
        merge(&mut self.serving_size, &patch.serving_size);
        merge(&mut self.calorie, &patch.calorie);
        merge(&mut self.carbohydrate, &patch.carbohydrate);
        merge(&mut self.protein, &patch.protein);
        merge(&mut self.fat, &patch.fat);
        merge(&mut self.sugars, &patch.sugars);
        merge(&mut self.salt, &patch.salt);
        merge(&mut self.cholesterol, &patch.cholesterol);
        merge(&mut self.saturated_fatty_acids, &patch.saturated_fatty_acids);
        merge(&mut self.trans_fat, &patch.trans_fat);
    }

    /// Project into the search index document
    pub fn to_document(&self) -> IndexDocument {
        IndexDocument::from(self)
    }
}

fn merge<T: Clone>(field: &mut Option<T>, update: &Option<Option<T>>) {
    if let Some(value) = update {
        *field = value.clone();
    }
}

/// Payload for creating a record
///
/// `food_cd` and `food_name` are required. Any client-supplied `id` is ignored.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewRecord {
    #[serde(default)]
    pub food_cd: String,
    #[serde(default)]
    pub food_name: String,
    #[serde(default)]
    pub group_name: Option<String>,
    #[serde(default)]
    pub research_year: Option<String>,
    #[serde(default)]
    pub maker_name: Option<String>,
    #[serde(default)]
    pub ref_name: Option<String>,
    #[serde(default)]
    pub serving_size: Option<f64>,
    #[serde(default)]
    pub calorie: Option<f64>,
    #[serde(default)]
    pub carbohydrate: Option<f64>,
    #[serde(default)]
    pub protein: Option<f64>,
    #[serde(default, alias = "province")]
    pub fat: Option<f64>,
    #[serde(default)]
    pub sugars: Option<f64>,
    #[serde(default)]
    pub salt: Option<f64>,
    #[serde(default)]
    pub cholesterol: Option<f64>,
    #[serde(default)]
    pub saturated_fatty_acids: Option<f64>,
    #[serde(default)]
    pub trans_fat: Option<f64>,
}

impl NewRecord {
    /// Minimal record with just the required fields
    pub fn new(food_cd: impl Into<String>, food_name: impl Into<String>) -> Self {
        Self {
            food_cd: food_cd.into(),
            food_name: food_name.into(),
            ..Default::default()
        }
    }

    /// Reject blank required fields and normalize the key fields
    pub fn validate(mut self) -> Result<Self> {
        self.food_cd = self.food_cd.trim().to_string();
        self.food_name = self.food_name.trim().to_string();

        if self.food_cd.is_empty() {
            return Err(NutritionError::validation("food_cd is required"));
        }
        if self.food_name.is_empty() {
            return Err(NutritionError::validation("food_name is required"));
        }
        Ok(self)
    }

    /// Attach the store-assigned id
    pub fn into_record(self, id: i64) -> NutritionRecord {
        NutritionRecord {
            id,
            food_cd: self.food_cd,
            food_name: self.food_name,
            group_name: self.group_name,
            research_year: self.research_year,
            maker_name: self.maker_name,
            ref_name: self.ref_name,
            serving_size: self.serving_size,
            calorie: self.calorie,
            carbohydrate: self.carbohydrate,
            protein: self.protein,
            fat: self.fat,
            sugars: self.sugars,
            salt: self.salt,
            cholesterol: self.cholesterol,
            saturated_fatty_acids: self.saturated_fatty_acids,
            trans_fat: self.trans_fat,
        }
    }
}

/// Partial update payload
///
/// Optional attributes are tri-state: absent (`None`, keep), explicit JSON
/// `null` (`Some(None)`, clear) or a value (`Some(Some(v))`, set). The two
/// required fields can be replaced but never cleared.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct RecordPatch {
    #[serde(default)]
    pub food_cd: Option<String>,
    #[serde(default)]
    pub food_name: Option<String>,
    #[serde(default, deserialize_with = "present")]
    pub group_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub research_year: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub maker_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub ref_name: Option<Option<String>>,
    #[serde(default, deserialize_with = "present")]
    pub serving_size: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub calorie: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub carbohydrate: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub protein: Option<Option<f64>>,
    #[serde(default, alias = "province", deserialize_with = "present")]
    pub fat: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub sugars: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub salt: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub cholesterol: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub saturated_fatty_acids: Option<Option<f64>>,
    #[serde(default, deserialize_with = "present")]
    pub trans_fat: Option<Option<f64>>,
}

/// Marks a field as supplied, keeping an explicit `null` distinct from absence
fn present<'de, T, D>(deserializer: D) -> std::result::Result<Option<Option<T>>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

impl RecordPatch {
    /// Reject blank replacements for the required fields
    pub fn validate(&self) -> Result<()> {
        if matches!(self.food_cd, Some(ref v) if v.trim().is_empty()) {
            return Err(NutritionError::validation("food_cd must not be blank"));
        }
        if matches!(self.food_name, Some(ref v) if v.trim().is_empty()) {
            return Err(NutritionError::validation("food_name must not be blank"));
        }
        Ok(())
    }

    /// New business key, if the patch supplies one
    pub fn food_cd(&self) -> Option<&str> {
        self.food_cd.as_deref().map(str::trim)
    }
}

/// Search index projection of a record
///
/// Keyed by the record id rendered as a string. Fields without a value are
/// omitted from the serialized document instead of being stored as null.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IndexDocument {
    pub id: i64,
    #[serde(default)]
    pub food_cd: String,
    #[serde(default)]
    pub food_name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub group_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub research_year: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub maker_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub serving_size: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub calorie: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub carbohydrate: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub protein: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub fat: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sugars: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub salt: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub cholesterol: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub saturated_fatty_acids: Option<f64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trans_fat: Option<f64>,
}

impl IndexDocument {
    /// Document id in the index
    pub fn doc_id(&self) -> String {
        self.id.to_string()
    }

    /// Serialize to the JSON source stored in the index
    pub fn to_source(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }
}

impl From<&NutritionRecord> for IndexDocument {
    fn from(r: &NutritionRecord) -> Self {
        Self {
            id: r.id,
            food_cd: r.food_cd.clone(),
            food_name: r.food_name.clone(),
            group_name: r.group_name.clone(),
            research_year: r.research_year.clone(),
            maker_name: r.maker_name.clone(),
            ref_name: r.ref_name.clone(),
            serving_size: r.serving_size,
            calorie: r.calorie,
            carbohydrate: r.carbohydrate,
            protein: r.protein,
            fat: r.fat,
            sugars: r.sugars,
            salt: r.salt,
            cholesterol: r.cholesterol,
            saturated_fatty_acids: r.saturated_fatty_acids,
            trans_fat: r.trans_fat,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn rice() -> NutritionRecord {
        NewRecord {
            maker_name: Some("Farm".into()),
            calorie: Some(100.0),
            ..NewRecord::new("T1", "Rice")
        }
        .into_record(1)
    }

    #[test]
    fn test_validate_rejects_blank_required_fields() {
        assert!(NewRecord::new("  ", "Rice").validate().is_err());
        assert!(NewRecord::new("T1", "").validate().is_err());

        let ok = NewRecord::new(" T1 ", " Rice ").validate().unwrap();
        assert_eq!(ok.food_cd, "T1");
        assert_eq!(ok.food_name, "Rice");
    }

    #[test]
    fn test_new_record_ignores_client_id_and_accepts_province() {
        let input: NewRecord = serde_json::from_value(json!({
            "id": 42,
            "food_cd": "API_TEST001",
            "food_name": "Soup",
            "province": 0.5
        }))
        .unwrap();
        assert_eq!(input.fat, Some(0.5));
        assert_eq!(input.into_record(1).id, 1);
    }

    #[test]
    fn test_patch_distinguishes_null_from_absent() {
        let patch: RecordPatch =
            serde_json::from_value(json!({"calorie": 120.5, "maker_name": null})).unwrap();
        assert_eq!(patch.calorie, Some(Some(120.5)));
        assert_eq!(patch.maker_name, Some(None));
        assert_eq!(patch.group_name, None);

        let mut record = rice();
        record.apply(&patch);
        assert_eq!(record.calorie, Some(120.5));
        assert_eq!(record.maker_name, None);
        assert_eq!(record.food_name, "Rice");
        assert_eq!(record.food_cd, "T1");
    }

    #[test]
    fn test_patch_rejects_blank_key() {
        let patch = RecordPatch {
            food_cd: Some(" ".into()),
            ..Default::default()
        };
        assert!(patch.validate().is_err());
        assert!(RecordPatch::default().validate().is_ok());
    }

    #[test]
    fn test_document_omits_missing_values() {
        let source = rice().to_document().to_source().unwrap();
        let obj = source.as_object().unwrap();

        assert_eq!(obj["id"], json!(1));
        assert_eq!(obj["food_cd"], json!("T1"));
        assert_eq!(obj["calorie"], json!(100.0));
        assert!(!obj.contains_key("protein"));
        assert!(!obj.contains_key("group_name"));
        assert_eq!(rice().to_document().doc_id(), "1");
    }
}
