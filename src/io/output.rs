use std::fs::File;
use std::io::{self, Write};
use std::path::Path;

use anyhow::{Context, Result};
use serde_json::Value;

use super::DocumentFormat;

/// Serializes `value` in `format`.
pub fn render_document(value: &Value, format: DocumentFormat, pretty: bool) -> Result<String> {
    match format {
        DocumentFormat::Json if pretty => {
            serde_json::to_string_pretty(value).context("failed to serialize JSON")
        }
        DocumentFormat::Json => serde_json::to_string(value).context("failed to serialize JSON"),
        #[cfg(feature = "yaml")]
        DocumentFormat::Yaml => serde_yaml::to_string(value).context("failed to serialize YAML"),
        #[cfg(feature = "toml")]
        DocumentFormat::Toml if pretty => {
            toml::to_string_pretty(value).context("failed to serialize TOML")
        }
        #[cfg(feature = "toml")]
        DocumentFormat::Toml => toml::to_string(value).context("failed to serialize TOML"),
    }
}

/// Writes `payload` plus a trailing newline to `path`, or to stdout when no
/// path is given.
pub fn write_document(path: Option<&Path>, payload: &str) -> Result<()> {
    match path {
        None => {
            let mut stdout = io::stdout().lock();
            stdout
                .write_all(payload.as_bytes())
                .and_then(|_| stdout.write_all(b"\n"))
                .and_then(|_| stdout.flush())
                .context("failed to write to stdout")
        }
        Some(path) => {
            let mut file = File::create(path)
                .with_context(|| format!("failed to create {}", path.display()))?;
            file.write_all(payload.as_bytes())
                .and_then(|_| file.write_all(b"\n"))
                .with_context(|| format!("failed to write {}", path.display()))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::fs;
    use std::time::{SystemTime, UNIX_EPOCH};

    #[test]
    fn compact_and_pretty_json() {
        let value = json!({"b": 1, "a": [true]});
        assert_eq!(
            render_document(&value, DocumentFormat::Json, false).unwrap(),
            r#"{"b":1,"a":[true]}"#
        );
        assert!(
            render_document(&value, DocumentFormat::Json, true)
                .unwrap()
                .contains("\n  \"b\": 1")
        );
    }

    #[test]
    fn writes_to_file_destination() {
        let path = std::env::temp_dir().join(format!(
            "customfields-test-{}",
            SystemTime::now()
                .duration_since(UNIX_EPOCH)
                .unwrap()
                .as_nanos()
        ));
        write_document(Some(&path), r#"{"ok":true}"#).unwrap();
        assert_eq!(fs::read_to_string(&path).unwrap(), "{\"ok\":true}\n");
        let _ = fs::remove_file(path);
    }
}
