use anyhow::{Context, Result};
use std::fs;
use std::path::Path;
use tracing::info;

use trimline_core::StaticProposer;

/// Load recorded boundary proposals from a JSON file keyed by section.
pub fn load_proposals(path: impl AsRef<Path>) -> Result<StaticProposer> {
    let path = path.as_ref();
    let json = fs::read_to_string(path)
        .with_context(|| format!("failed to read proposals file {}", path.display()))?;
    let proposer = StaticProposer::from_json(&json)
        .with_context(|| format!("invalid proposals in {}", path.display()))?;
    info!(path = %path.display(), sections = proposer.len(), "loaded boundary proposals");
    Ok(proposer)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn loads_sections_from_disk() {
        let mut file = NamedTempFile::new().unwrap();
        write!(
            file,
            r#"{{"index": {{"startLine": 400, "confidence": 0.9}}, "frontMatter": {{"endLine": 12, "confidence": 0.8}}}}"#
        )
        .unwrap();

        let proposer = load_proposals(file.path()).unwrap();
        assert_eq!(proposer.len(), 2);
    }

    #[test]
    fn out_of_range_confidence_is_an_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"index": {{"startLine": 400, "confidence": 1.5}}}}"#).unwrap();

        let err = load_proposals(file.path()).unwrap_err();
        assert!(format!("{err:#}").contains("outside [0, 1]"));
    }

    #[test]
    fn missing_file_names_the_path() {
        let err = load_proposals("/nonexistent/proposals.json").unwrap_err();
        assert!(err.to_string().contains("/nonexistent/proposals.json"));
    }
}
