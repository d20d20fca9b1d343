//! Extraction instruction and response schema sent with every call.

use serde_json::{json, Value};

pub const EXTRACTION_PROMPT: &str = "\
You are a medical prescription reader. Analyze the attached prescription image \
and extract its contents as JSON with exactly this shape:\n\
{\n\
  \"status\": \"success\" | \"partial\" | \"error\",\n\
  \"confidence\": number between 0 and 1,\n\
  \"extracted_text\": full text recognized in the image,\n\
  \"medications\": [{\n\
    \"name\": string, \"dosage\": string, \"frequency\": string,\n\
    \"duration\": string, \"quantity\": number, \"instructions\": string,\n\
    \"confidence\": number between 0 and 1\n\
  }],\n\
  \"metadata\": {\n\
    \"prescription_date\": ISO date (YYYY-MM-DD) if present,\n\
    \"doctor_name\": string,\n\
    \"image_quality\": \"good\" | \"fair\" | \"poor\",\n\
    \"has_handwriting\": boolean\n\
  },\n\
  \"errors\": [string]\n\
}\n\
Rules:\n\
- Use \"success\" when every medication was read clearly, \"partial\" when some fields \
are illegible, and \"error\" when the image is not a readable prescription.\n\
- Use an empty string for any text field you cannot read and 0 for an unknown quantity.\n\
- List every problem you encountered in \"errors\"; leave it empty on success.\n\
- Do not invent medications that are not visible in the image.";

fn string() -> Value {
    json!({ "type": "STRING" })
}

fn number() -> Value {
    json!({ "type": "NUMBER" })
}

fn string_enum(values: &[&str]) -> Value {
    json!({ "type": "STRING", "enum": values })
}

/// Response schema in the provider's OpenAPI subset. Every key is required.
pub fn response_schema() -> Value {
    let medication = json!({
        "type": "OBJECT",
        "properties": {
            "name": string(),
            "dosage": string(),
            "frequency": string(),
            "duration": string(),
            "quantity": number(),
            "instructions": string(),
            "confidence": number(),
        },
        "required": [
            "name",
            "dosage",
            "frequency",
            "duration",
            "quantity",
            "instructions",
            "confidence"
        ],
    });

    let metadata = json!({
        "type": "OBJECT",
        "properties": {
            "prescription_date": string(),
            "doctor_name": string(),
            "image_quality": string_enum(&["good", "fair", "poor"]),
            "has_handwriting": { "type": "BOOLEAN" },
        },
        "required": ["prescription_date", "doctor_name", "image_quality", "has_handwriting"],
    });

    json!({
        "type": "OBJECT",
        "properties": {
            "status": string_enum(&["success", "partial", "error"]),
            "confidence": number(),
            "extracted_text": string(),
            "medications": { "type": "ARRAY", "items": medication },
            "metadata": metadata,
            "errors": { "type": "ARRAY", "items": string() },
        },
        "required": ["status", "confidence", "extracted_text", "medications", "metadata", "errors"],
    })
}
