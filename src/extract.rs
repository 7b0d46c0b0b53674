//! Embedded metadata extraction for downloaded files.
//!
//! The default extractor shells out to `exiftool -json <file>`. The flat
//! field map it returns is folded into a [`Document`](crate::models::Document)'s
//! `metadata_text` with [`flatten`], and the `Author` field is lifted out on
//! its own.

use std::collections::BTreeMap;
use std::path::Path;
use std::process::Stdio;

use async_trait::async_trait;
use serde_json::Value;
use tokio::process::Command;

use crate::config::ExtractorConfig;
use crate::error::FetchError;

/// Field copied into `Document::author`.
pub const AUTHOR_FIELD: &str = "Author";

/// Per-file bookkeeping emitted by exiftool; it names our temp file, not the document.
const SOURCE_FILE_FIELD: &str = "SourceFile";

#[async_trait]
pub trait MetadataExtractor: Send + Sync {
    /// Field name → value for the file at `path`.
    async fn extract(&self, path: &Path) -> Result<BTreeMap<String, String>, FetchError>;
}

pub struct ExifTool {
    program: String,
    args: Vec<String>,
}

impl ExifTool {
    pub fn new(config: &ExtractorConfig) -> Self {
        Self {
            program: config.program.clone(),
            args: config.args.clone(),
        }
    }
}

#[async_trait]
impl MetadataExtractor for ExifTool {
    async fn extract(&self, path: &Path) -> Result<BTreeMap<String, String>, FetchError> {
        let output = Command::new(&self.program)
            .arg("-json")
            .args(&self.args)
            .arg(path)
            .stdin(Stdio::null())
            .output()
            .await;

        let output = match output {
            Ok(output) => output,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(FetchError::Extractor(format!(
                    "{} not found in PATH",
                    self.program
                )));
            }
            Err(e) => return Err(FetchError::Io(e)),
        };

        // exiftool exits non-zero for unreadable files but may still print JSON
        // carrying an "Error" field, which parse_exiftool_json reports.
        if !output.status.success() && output.stdout.is_empty() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(FetchError::Extractor(format!(
                "{} exited with {}: {}",
                self.program,
                output.status,
                stderr.trim()
            )));
        }

        parse_exiftool_json(&output.stdout)
    }
}

/// Parse `exiftool -json` output (an array with one object per file).
pub fn parse_exiftool_json(stdout: &[u8]) -> Result<BTreeMap<String, String>, FetchError> {
    let records: Vec<serde_json::Map<String, Value>> = serde_json::from_slice(stdout)
        .map_err(|e| FetchError::Extractor(format!("unreadable exiftool output: {}", e)))?;

    let mut fields = BTreeMap::new();
    for record in records {
        if let Some(err) = record.get("Error") {
            return Err(FetchError::Extractor(value_to_string(err)));
        }
        for (key, value) in record {
            if key == SOURCE_FILE_FIELD {
                continue;
            }
            fields.insert(key, value_to_string(&value));
        }
    }
    Ok(fields)
}

fn value_to_string(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        Value::Null => String::new(),
        Value::Array(items) => items
            .iter()
            .map(value_to_string)
            .collect::<Vec<_>>()
            .join(", "),
        other => other.to_string(),
    }
}

/// Fold every field into one `"[key] value"` line, in key order.
pub fn flatten(fields: &BTreeMap<String, String>) -> String {
    let mut text = String::new();
    for (key, value) in fields {
        text.push_str(&format!("[{}] {}\n", key, value));
    }
    text
}

pub fn author_of(fields: &BTreeMap<String, String>) -> String {
    fields.get(AUTHOR_FIELD).cloned().unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_exiftool_array() {
        let out = br#"[{
            "SourceFile": "/tmp/harvest_abc",
            "Author": "Ana Lima",
            "PageCount": 3,
            "Keywords": ["saude", "orcamento"],
            "Linearized": false
        }]"#;
        let fields = parse_exiftool_json(out).unwrap();
        assert!(!fields.contains_key("SourceFile"));
        assert_eq!(fields["Author"], "Ana Lima");
        assert_eq!(fields["PageCount"], "3");
        assert_eq!(fields["Keywords"], "saude, orcamento");
        assert_eq!(fields["Linearized"], "false");
    }

    #[test]
    fn error_field_fails_extraction() {
        let out = br#"[{"SourceFile": "/tmp/x", "Error": "File format error"}]"#;
        let err = parse_exiftool_json(out).unwrap_err();
        assert!(err.to_string().contains("File format error"));
    }

    #[test]
    fn flatten_is_key_ordered() {
        let mut fields = BTreeMap::new();
        fields.insert("Title".to_string(), "PL 1/2021".to_string());
        fields.insert("Author".to_string(), "Ana".to_string());
        assert_eq!(flatten(&fields), "[Author] Ana\n[Title] PL 1/2021\n");
        assert_eq!(author_of(&fields), "Ana");
        assert_eq!(author_of(&BTreeMap::new()), "");
    }

    #[tokio::test]
    async fn missing_binary_is_extractor_error() {
        let tool = ExifTool::new(&ExtractorConfig {
            program: "definitely-not-a-real-exiftool".into(),
            args: vec![],
        });
        let err = tool.extract(Path::new("/dev/null")).await.unwrap_err();
        assert!(matches!(err, FetchError::Extractor(_)));
    }
}
