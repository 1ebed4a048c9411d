use crate::editing::EditOperation;
use crate::models::Report;
use std::fs;
use std::path::{Path, PathBuf};

#[derive(Debug, thiserror::Error)]
pub enum IoError {
    #[error("File not found: {0}")]
    NotFound(PathBuf),
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Invalid report data in {path}: {source}")]
    InvalidReport {
        path: PathBuf,
        source: serde_json::Error,
    },
    #[error("Failed to encode requests: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Read the ingested report and normalize it for layout
pub fn load_report(path: &Path) -> Result<Report, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    let content = fs::read_to_string(path)?;
    let mut report: Report =
        serde_json::from_str(&content).map_err(|source| IoError::InvalidReport {
            path: path.to_path_buf(),
            source,
        })?;
    report.normalize();
    Ok(report)
}

/// Read a document template; the anchor must appear in it
pub fn read_template(path: &Path) -> Result<String, IoError> {
    if !path.exists() {
        return Err(IoError::NotFound(path.to_path_buf()));
    }
    fs::read_to_string(path).map_err(IoError::Io)
}

/// Write applied batches in the store's batch-update body format
pub fn write_requests(path: &Path, batches: &[Vec<EditOperation>]) -> Result<(), IoError> {
    let bodies: Vec<serde_json::Value> = batches
        .iter()
        .map(|ops| {
            serde_json::json!({
                "requests": ops.iter().map(EditOperation::to_request).collect::<Vec<_>>()
            })
        })
        .collect();

    write_file(path, &serde_json::to_string_pretty(&bodies)?)
}

/// Write content, creating parent directories as needed
pub fn write_file(path: &Path, content: &str) -> Result<(), IoError> {
    if let Some(parent) = path.parent()
        && !parent.as_os_str().is_empty()
    {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, content).map_err(IoError::Io)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    const REPORT: &str = r#"{
        "charts": [{ "uri": "https://charts/total.png", "category": "total" }],
        "topics": [{
            "name": "Cost",
            "questions": [{
                "text": "How do you manage cost?",
                "items": [
                    { "name": "Budgets", "checked": false,
                      "best_practices": "Set budgets\nTag resources\nReview",
                      "best_practice_refs": "https://budgets" },
                    { "name": "None of the above", "checked": false, "none_of_the_above": true }
                ]
            }]
        }]
    }"#;

    #[test]
    fn test_load_report_normalizes() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("report.json");
        fs::write(&path, REPORT).unwrap();

        let report = load_report(&path).unwrap();

        let question = &report.topics[0].questions[0];
        assert_eq!(question.items.len(), 1);
        assert!(question.not_applicable);
        assert_eq!(
            question.items[0].best_practice_refs,
            vec!["https://budgets", "NA", "NA"]
        );
    }

    #[test]
    fn test_load_report_missing_file() {
        let result = load_report(Path::new("/this/path/does/not/exist.json"));

        assert!(matches!(result, Err(IoError::NotFound(_))));
    }

    #[test]
    fn test_load_report_invalid_json() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("broken.json");
        fs::write(&path, "{ not json").unwrap();

        let result = load_report(&path);

        assert!(matches!(result, Err(IoError::InvalidReport { .. })));
    }

    #[test]
    fn test_write_requests_creates_parent_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/requests.json");
        let batches = vec![vec![EditOperation::InsertText {
            index: 1,
            text: "Hi\n".to_string(),
        }]];

        write_requests(&path, &batches).unwrap();

        let written: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(written[0]["requests"][0]["insertText"]["text"], "Hi\n");
    }
}
