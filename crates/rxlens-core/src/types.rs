//! Prescription extraction types shared by the store, the extractor and the server.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Outcome reported by the model for one prescription image.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExtractionStatus {
    Success,
    Partial,
    Error,
}

/// Legibility of the source image as judged by the model.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ImageQuality {
    Good,
    Fair,
    Poor,
}

/// One medication line read off the prescription.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MedicationEntry {
    pub name: String,
    pub dosage: String,
    pub frequency: String,
    pub duration: String,
    pub quantity: f64,
    pub instructions: String,
    pub confidence: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrescriptionMetadata {
    /// Free-form, usually ISO `YYYY-MM-DD`. Not validated.
    pub prescription_date: String,
    pub doctor_name: String,
    pub image_quality: ImageQuality,
    pub has_handwriting: bool,
}

/// Structured output of a single extraction call.
///
/// Enum fields are constrained by the response schema sent to the provider;
/// values outside it fail deserialization rather than being coerced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExtractionResult {
    pub status: ExtractionStatus,
    pub confidence: f64,
    pub extracted_text: String,
    pub medications: Vec<MedicationEntry>,
    pub metadata: PrescriptionMetadata,
    pub errors: Vec<String>,
}

impl ExtractionResult {
    /// Check numeric ranges the schema cannot express.
    pub fn validate(&self) -> crate::Result<()> {
        if !is_unit_interval(self.confidence) {
            return Err(crate::Error::Validation(format!(
                "confidence must be within [0, 1], got {}",
                self.confidence
            )));
        }

        for (i, med) in self.medications.iter().enumerate() {
            if !is_unit_interval(med.confidence) {
                return Err(crate::Error::Validation(format!(
                    "medications[{}].confidence must be within [0, 1], got {}",
                    i, med.confidence
                )));
            }
            if !med.quantity.is_finite() || med.quantity < 0.0 {
                return Err(crate::Error::Validation(format!(
                    "medications[{}].quantity must be non-negative, got {}",
                    i, med.quantity
                )));
            }
        }

        Ok(())
    }

    /// Doctor name as printed on the prescription, if any.
    pub fn doctor_name(&self) -> Option<&str> {
        let name = self.metadata.doctor_name.trim();
        (!name.is_empty()).then_some(name)
    }
}

fn is_unit_interval(v: f64) -> bool {
    v.is_finite() && (0.0..=1.0).contains(&v)
}

/// Payload accepted by the Result Store and the archive.
///
/// Always a JSON object, kept exactly as the caller sent it. Objects shaped
/// like an [`ExtractionResult`] are also parsed and range-checked; other
/// objects are stored without interpretation.
#[derive(Debug, Clone, PartialEq)]
pub struct StoragePayload {
    object: Map<String, Value>,
    extraction: Option<ExtractionResult>,
}

impl StoragePayload {
    /// Classify an incoming JSON value, rejecting shapes that cannot be stored.
    pub fn from_value(value: Value) -> crate::Result<Self> {
        let Value::Object(object) = value else {
            return Err(crate::Error::Validation("data must be a JSON object".into()));
        };

        let extraction = ExtractionResult::deserialize(&Value::Object(object.clone())).ok();
        if let Some(result) = &extraction {
            result.validate()?;
        }
        Ok(Self { object, extraction })
    }

    /// Like [`from_value`](Self::from_value), but the object must be a valid
    /// extraction result.
    pub fn extraction_from_value(value: Value) -> crate::Result<Self> {
        if !value.is_object() {
            return Err(crate::Error::Validation(
                "Invalid extraction result: expected a JSON object".into(),
            ));
        }
        if let Err(e) = ExtractionResult::deserialize(&value) {
            return Err(crate::Error::Validation(format!("Invalid extraction result: {}", e)));
        }
        Self::from_value(value)
    }

    pub fn as_extraction(&self) -> Option<&ExtractionResult> {
        self.extraction.as_ref()
    }

    pub fn as_object(&self) -> &Map<String, Value> {
        &self.object
    }

    /// Doctor name of a typed payload, if present and non-blank.
    pub fn doctor_name(&self) -> Option<&str> {
        self.extraction.as_ref().and_then(|r| r.doctor_name())
    }

    pub fn into_value(self) -> Value {
        Value::Object(self.object)
    }
}

impl From<ExtractionResult> for StoragePayload {
    fn from(result: ExtractionResult) -> Self {
        let object = match serde_json::to_value(&result) {
            Ok(Value::Object(object)) => object,
            _ => Map::new(),
        };
        Self {
            object,
            extraction: Some(result),
        }
    }
}

/// One entry of the Result Store.
///
/// `data` is read back as whatever JSON the file holds; only new appends go
/// through [`StoragePayload`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoredPrescriptionRecord {
    /// Millisecond epoch at creation, bumped to stay strictly increasing.
    pub id: i64,
    pub data: Value,
    /// RFC 3339 timestamp set at write time.
    pub created_at: String,
}

/// Location of a result written to the archive.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SavedResult {
    pub filename: String,
    pub filepath: String,
}
