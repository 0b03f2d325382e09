mod references;
mod structure;
mod types;

use serde_json::Value;

use crate::dsl::schema::WorkflowDocument;

pub use types::{Diagnostic, DiagnosticLevel, ValidationReport};

/// Parse and validate document text.
///
/// Structure is checked on the raw JSON first so every problem gets a field
/// path; cross-field checks only run once the structure is sound.
pub fn validate_document_text(content: &str) -> Result<WorkflowDocument, ValidationReport> {
    match serde_json::from_str::<Value>(content) {
        Ok(value) => validate_document(&value),
        Err(err) => Err(ValidationReport::from_diagnostics(vec![Diagnostic::error(
            "E001",
            format!("Document parse error: {}", err),
            "",
        )])),
    }
}

pub fn validate_document(value: &Value) -> Result<WorkflowDocument, ValidationReport> {
    let mut diagnostics = structure::validate(value);
    let has_structure_errors = diagnostics
        .iter()
        .any(|d| d.level == DiagnosticLevel::Error);
    if has_structure_errors {
        return Err(ValidationReport::from_diagnostics(diagnostics));
    }

    let doc: WorkflowDocument = match serde_json::from_value(value.clone()) {
        Ok(doc) => doc,
        Err(err) => {
            diagnostics.push(Diagnostic::error(
                "E001",
                format!("Document does not match the workflow shape: {}", err),
                "",
            ));
            return Err(ValidationReport::from_diagnostics(diagnostics));
        }
    };

    diagnostics.extend(references::validate(&doc));
    let report = ValidationReport::from_diagnostics(diagnostics);
    if report.is_valid {
        for warning in report.warnings() {
            tracing::warn!(code = %warning.code, field = ?warning.field_path, "{}", warning.message);
        }
        Ok(doc)
    } else {
        Err(report)
    }
}
