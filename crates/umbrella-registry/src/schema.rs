//! Stage schemas
//!
//! A [`StageSchema`] describes the JSON object one stage must return: its
//! required fields, the score categories it reports and the range every
//! score must fall in. The same description drives prompt rendering and
//! output validation.

use serde::Serialize;
use umbrella_core::StageKey;

/// Inclusive range every numeric score must fall in
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ValueRange {
    pub min: f64,
    pub max: f64,
}

impl ValueRange {
    pub const UNIT: ValueRange = ValueRange { min: 0.0, max: 1.0 };

    pub fn contains(&self, value: f64) -> bool {
        value.is_finite() && value >= self.min && value <= self.max
    }
}

/// JSON type a field must carry
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    Text,
    Bool,
    /// Number inside the schema's value range
    Score,
    TextList,
    /// Object keyed by exactly the schema's category keys, each a score
    CategoryMap,
    /// Array of `{name, value, description}`, one per category label
    MetricList,
}

impl FieldKind {
    pub fn is_categorized(&self) -> bool {
        matches!(self, FieldKind::CategoryMap | FieldKind::MetricList)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldSpec {
    pub name: &'static str,
    pub kind: FieldKind,
    /// Short guidance shown to the inference service
    pub hint: &'static str,
}

impl FieldSpec {
    pub const fn new(name: &'static str, kind: FieldKind, hint: &'static str) -> Self {
        Self { name, kind, hint }
    }
}

/// One score category. `key` is the JSON map key used by descriptive stages,
/// `label` the display name used in metric lists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct Category {
    pub key: &'static str,
    pub label: &'static str,
}

impl Category {
    pub const fn new(key: &'static str, label: &'static str) -> Self {
        Self { key, label }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct StageSchema {
    pub key: StageKey,
    pub fields: &'static [FieldSpec],
    pub categories: &'static [Category],
    pub value_range: ValueRange,
}

impl StageSchema {
    pub fn required_fields(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.fields.iter().map(|f| f.name)
    }

    pub fn category_keys(&self) -> impl Iterator<Item = &'static str> + '_ {
        self.categories.iter().map(|c| c.key)
    }

    pub fn value_range(&self) -> ValueRange {
        self.value_range
    }

    pub fn field(&self, name: &str) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.name == name)
    }

    /// The field that carries the category scores
    pub fn categorized_field(&self) -> Option<&FieldSpec> {
        self.fields.iter().find(|f| f.kind.is_categorized())
    }

    /// Verdict-shaped schemas report their categories as a metric list
    pub fn is_verdict_shaped(&self) -> bool {
        self.categorized_field()
            .map(|f| f.kind == FieldKind::MetricList)
            .unwrap_or(false)
    }

    /// Resolve a metric name to its category. Surrounding whitespace and
    /// ASCII case are ignored; nothing else is.
    pub fn category_for_label(&self, name: &str) -> Option<&'static Category> {
        let wanted = name.trim();
        self.categories
            .iter()
            .find(|c| c.label.eq_ignore_ascii_case(wanted))
    }

    /// Position of a category in declaration order
    pub fn category_position(&self, category: &Category) -> Option<usize> {
        self.categories.iter().position(|c| c.key == category.key)
    }
}
