//! Product-mention extraction
//!
//! Builds the prompts sent to the chat model, calls it, and validates the
//! response against the extraction schema.

pub mod openai;
pub mod prompt;
pub mod schema;

pub use openai::{OpenAIClient, DEFAULT_EXTRACTION_MODEL};
pub use prompt::{build_prompt, build_strict_prompt, SYSTEM_PROMPT};
pub use schema::{extract_json, validate_response, ExtractionPayload, ValidatedExtraction};
