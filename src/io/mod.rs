//! Document formats and loading of custom-field configurations.

mod format;
mod input;
mod output;

pub use format::DocumentFormat;
pub use input::{load_fields_config_str, load_fields_config_value, parse_document_str};
pub use output::{render_document, write_document};
