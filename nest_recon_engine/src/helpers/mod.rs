pub mod doc_number;

pub use doc_number::{format_document_number, parse_document_number, DOC_NUMBER_PAD_WIDTH};
