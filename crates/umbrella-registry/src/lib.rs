//! Umbrella Registry: what each stage must return
//!
//! Maps every (modality, stage) pair to a [`StageSchema`], validates raw
//! inference output against it and lifts the result into a typed
//! [`StageResult`] variant.
//!
//! ```text
//! raw text → JSON → validate(schema) → StageResult::{TextModeration, ImageDescription, ...}
//! ```

pub mod registry;
pub mod results;
pub mod schema;
pub mod validate;

pub use registry::{RegistryError, SchemaRegistry, VERDICT_FIELDS};
pub use results::{
    DeepfakeIndicators, ImageCategories, ImageDescription, Judgement, ManipulationIndicators,
    StageResult, VoiceCategories, VoiceTranscript,
};
pub use schema::{Category, FieldKind, FieldSpec, StageSchema, ValueRange};
pub use validate::{parse_stage_result, validate, Violation};
