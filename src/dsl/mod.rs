pub mod parser;
pub mod schema;
pub mod validation;

pub use parser::{parse_document, serialize_document};
pub use schema::*;
pub use validation::{
    validate_document, validate_document_text, Diagnostic, DiagnosticLevel, ValidationReport,
};
