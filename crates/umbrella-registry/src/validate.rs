//! Runtime validator for untyped stage output
//!
//! Checks parsed JSON against a [`StageSchema`] and reports the first
//! offending field. Nothing is coerced or defaulted: a string where a number
//! belongs, a missing category or a score of 1.2 is a violation.

use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fmt;

use crate::results::StageResult;
use crate::schema::{FieldKind, FieldSpec, StageSchema};

/// First schema mismatch found in a stage's output
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    /// Path of the offending field (ex: `metrics[3].value`)
    pub field: String,
    pub detail: String,
}

impl Violation {
    fn new(field: impl Into<String>, detail: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            detail: detail.into(),
        }
    }
}

impl fmt::Display for Violation {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}: {}", self.field, self.detail)
    }
}

impl std::error::Error for Violation {}

/// Validate `value` against `schema`
pub fn validate(schema: &StageSchema, value: &Value) -> Result<(), Violation> {
    let object = value
        .as_object()
        .ok_or_else(|| Violation::new("$", format!("expected a JSON object, got {}", kind_of(value))))?;

    for spec in schema.fields {
        let field = object
            .get(spec.name)
            .ok_or_else(|| Violation::new(spec.name, "missing required field"))?;
        check_field(schema, spec, field)?;
    }
    Ok(())
}

/// Validate and map onto the typed variant for the schema's stage.
/// Undeclared top-level fields are dropped before the typed mapping.
pub fn parse_stage_result(schema: &StageSchema, value: Value) -> Result<StageResult, Violation> {
    validate(schema, &value)?;
    let declared = match value {
        Value::Object(mut object) => {
            object.retain(|name, _| schema.field(name).is_some());
            Value::Object(object)
        }
        other => other,
    };
    StageResult::from_validated(schema.key, declared)
        .map_err(|e| Violation::new("$", e.to_string()))
}

fn check_field(schema: &StageSchema, spec: &FieldSpec, value: &Value) -> Result<(), Violation> {
    match spec.kind {
        FieldKind::Text => expect_str(spec.name, value).map(|_| ()),
        FieldKind::Bool => match value {
            Value::Bool(_) => Ok(()),
            other => Err(type_error(spec.name, "a boolean", other)),
        },
        FieldKind::Score => check_score(schema, spec.name, value),
        FieldKind::TextList => {
            let items = expect_array(spec.name, value)?;
            for (i, item) in items.iter().enumerate() {
                expect_str(&format!("{}[{}]", spec.name, i), item)?;
            }
            Ok(())
        }
        FieldKind::CategoryMap => check_category_map(schema, spec.name, value),
        FieldKind::MetricList => check_metric_list(schema, spec.name, value),
    }
}

fn check_score(schema: &StageSchema, path: &str, value: &Value) -> Result<(), Violation> {
    let score = value
        .as_f64()
        .ok_or_else(|| type_error(path, "a number", value))?;
    let range = schema.value_range;
    if !range.contains(score) {
        return Err(Violation::new(
            path,
            format!("{} is outside [{}, {}]", score, range.min, range.max),
        ));
    }
    Ok(())
}

fn check_category_map(schema: &StageSchema, name: &str, value: &Value) -> Result<(), Violation> {
    let map: &Map<String, Value> = value
        .as_object()
        .ok_or_else(|| type_error(name, "an object", value))?;

    for category in schema.categories {
        let path = format!("{}.{}", name, category.key);
        let score = map
            .get(category.key)
            .ok_or_else(|| Violation::new(path.as_str(), "missing category"))?;
        check_score(schema, &path, score)?;
    }

    if let Some(extra) = map
        .keys()
        .find(|k| !schema.categories.iter().any(|c| c.key == k.as_str()))
    {
        return Err(Violation::new(
            format!("{}.{}", name, extra),
            "unexpected category",
        ));
    }
    Ok(())
}

fn check_metric_list(schema: &StageSchema, name: &str, value: &Value) -> Result<(), Violation> {
    let items = expect_array(name, value)?;
    let mut seen = HashSet::new();

    for (i, item) in items.iter().enumerate() {
        let path = format!("{}[{}]", name, i);
        let metric = item
            .as_object()
            .ok_or_else(|| type_error(&path, "an object", item))?;

        let label_path = format!("{path}.name");
        let label = metric
            .get("name")
            .ok_or_else(|| Violation::new(label_path.as_str(), "missing required field"))
            .and_then(|v| expect_str(&label_path, v))?;
        let category = schema.category_for_label(label).ok_or_else(|| {
            Violation::new(label_path.as_str(), format!("unexpected category '{label}'"))
        })?;
        if !seen.insert(category.key) {
            return Err(Violation::new(
                label_path,
                format!("duplicate category '{}'", category.label),
            ));
        }

        let value_path = format!("{path}.value");
        let score = metric
            .get("value")
            .ok_or_else(|| Violation::new(value_path.as_str(), "missing required field"))?;
        check_score(schema, &value_path, score)?;

        let description_path = format!("{path}.description");
        metric
            .get("description")
            .ok_or_else(|| Violation::new(description_path.as_str(), "missing required field"))
            .and_then(|v| expect_str(&description_path, v))?;
    }

    if let Some(missing) = schema.categories.iter().find(|c| !seen.contains(c.key)) {
        return Err(Violation::new(
            name,
            format!("missing category '{}'", missing.label),
        ));
    }
    Ok(())
}

fn expect_str<'v>(path: &str, value: &'v Value) -> Result<&'v str, Violation> {
    value.as_str().ok_or_else(|| type_error(path, "a string", value))
}

fn expect_array<'v>(path: &str, value: &'v Value) -> Result<&'v Vec<Value>, Violation> {
    value
        .as_array()
        .ok_or_else(|| type_error(path, "an array", value))
}

fn type_error(path: &str, expected: &str, got: &Value) -> Violation {
    Violation::new(path, format!("expected {}, got {}", expected, kind_of(got)))
}

fn kind_of(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "boolean",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry::SchemaRegistry;
    use serde_json::json;
    use umbrella_core::StageKey;

    fn text_schema() -> &'static StageSchema {
        SchemaRegistry::standard()
            .unwrap()
            .schema(StageKey::TextModeration)
    }

    fn text_output() -> Value {
        json!({
            "isSafe": true,
            "reason": "Small talk about the weather",
            "metrics": [
                { "name": "Hate Speech", "value": 0.0, "description": "none" },
                { "name": "Violence/Threats", "value": 0.0, "description": "none" },
                { "name": "Sexual Content", "value": 0.0, "description": "none" },
                { "name": "Self-Harm", "value": 0.0, "description": "none" },
                { "name": "Illegal Activities", "value": 0.0, "description": "none" },
                { "name": "Harassment/Bullying", "value": 0.0, "description": "none" }
            ],
            "confidenceScore": 0.95,
            "recommendedAction": "No action needed"
        })
    }

    #[test]
    fn test_valid_output_passes() {
        assert_eq!(validate(text_schema(), &text_output()), Ok(()));
    }

    #[test]
    fn test_missing_field_is_named() {
        let mut output = text_output();
        output.as_object_mut().unwrap().remove("reason");
        let violation = validate(text_schema(), &output).unwrap_err();
        assert_eq!(violation.field, "reason");
    }

    #[test]
    fn test_out_of_range_metric() {
        let mut output = text_output();
        output["metrics"][1]["value"] = json!(1.5);
        let violation = validate(text_schema(), &output).unwrap_err();
        assert_eq!(violation.field, "metrics[1].value");
    }

    #[test]
    fn test_string_score_is_not_coerced() {
        let mut output = text_output();
        output["confidenceScore"] = json!("0.9");
        let violation = validate(text_schema(), &output).unwrap_err();
        assert_eq!(violation.field, "confidenceScore");
        assert!(violation.detail.contains("expected a number"));
    }

    #[test]
    fn test_duplicate_metric_rejected() {
        let mut output = text_output();
        output["metrics"][5]["name"] = json!("hate speech");
        let violation = validate(text_schema(), &output).unwrap_err();
        assert_eq!(violation.field, "metrics[5].name");
        assert!(violation.detail.contains("duplicate"));
    }

    #[test]
    fn test_missing_metric_category_rejected() {
        let mut output = text_output();
        output["metrics"].as_array_mut().unwrap().pop();
        let violation = validate(text_schema(), &output).unwrap_err();
        assert_eq!(violation.field, "metrics");
        assert!(violation.detail.contains("Harassment/Bullying"));
    }

    #[test]
    fn test_unknown_metric_rejected() {
        let mut output = text_output();
        output["metrics"][0]["name"] = json!("Spam");
        let violation = validate(text_schema(), &output).unwrap_err();
        assert_eq!(violation.field, "metrics[0].name");
    }

    #[test]
    fn test_non_object_rejected() {
        let violation = validate(text_schema(), &json!([1, 2, 3])).unwrap_err();
        assert_eq!(violation.field, "$");
    }

    #[test]
    fn test_category_map_must_match_exactly() {
        let registry = SchemaRegistry::standard().unwrap();
        let schema = registry.schema(StageKey::ImageDescription);
        let mut output = json!({
            "description": "A sunny beach",
            "analysis": "Harmless holiday photo",
            "contentCategories": {
                "violence": 0.0, "gore": 0.0, "sexualContent": 0.05, "hateSpeech": 0.0,
                "harassment": 0.0, "selfHarm": 0.0, "illegalActivity": 0.0
            },
            "objectsDetected": ["sand", "umbrella", "sea"]
        });
        assert!(parse_stage_result(schema, output.clone()).is_ok());

        output["contentCategories"]["weapons"] = json!(0.2);
        let violation = validate(schema, &output).unwrap_err();
        assert_eq!(violation.field, "contentCategories.weapons");

        output["contentCategories"].as_object_mut().unwrap().remove("weapons");
        output["contentCategories"].as_object_mut().unwrap().remove("gore");
        let violation = validate(schema, &output).unwrap_err();
        assert_eq!(violation.field, "contentCategories.gore");
    }
}
