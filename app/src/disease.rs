// ==============================================================================
// disease.rs - Gene to Disease Code Lookup
// ==============================================================================
// Description: Loads the OMIM gene/disease mapping used to annotate variants
// Author: Matt Barham
// Created: 2026-10-13
// Modified: 2026-10-19
// Version: 1.0.0
// ==============================================================================
// Format: Tab-delimited text, comment lines start with '#'
// Example:
//   # gene    mim_number
//   BRCA1    113705
//   MLH1     120436
// Columns after the second are ignored.
// ==============================================================================

use csv::{ReaderBuilder, Trim};
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use thiserror::Error;
use tracing::{info, warn};

/// Errors that can occur while loading the lookup file
#[derive(Error, Debug)]
pub enum DiseaseParseError {
    #[error("Failed to read disease lookup: {0}")]
    Csv(#[from] csv::Error),

    #[error("Invalid line format at line {line}: {details}")]
    InvalidFormat { line: u64, details: String },
}

/// Gene symbol to disease code mapping, loaded once per run
#[derive(Debug, Clone, Default)]
pub struct DiseaseLookup {
    codes: HashMap<String, String>,
}

impl DiseaseLookup {
    /// Load the lookup from a file on disk
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, DiseaseParseError> {
        let file = std::fs::File::open(path.as_ref()).map_err(csv::Error::from)?;
        let lookup = Self::from_reader(file)?;

        if lookup.is_empty() {
            warn!("Disease lookup {:?} contains no entries", path.as_ref());
        } else {
            info!("Loaded {} disease codes from {:?}", lookup.len(), path.as_ref());
        }

        Ok(lookup)
    }

    /// Parse lookup entries; a later line for the same gene replaces an earlier one
    pub fn from_reader<R: Read>(reader: R) -> Result<Self, DiseaseParseError> {
        let mut reader = ReaderBuilder::new()
            .delimiter(b'\t')
            .has_headers(false)
            .comment(Some(b'#'))
            .flexible(true)
            .quoting(false)
            .trim(Trim::All)
            .from_reader(reader);

        let mut codes = HashMap::new();

        for result in reader.records() {
            let record = result?;
            let line = record.position().map(|p| p.line()).unwrap_or_default();

            // Skip whitespace-only lines
            if record.iter().all(|field| field.is_empty()) {
                continue;
            }

            let (gene, code) = match (record.get(0), record.get(1)) {
                (Some(gene), Some(code)) if !gene.is_empty() && !code.is_empty() => (gene, code),
                _ => {
                    return Err(DiseaseParseError::InvalidFormat {
                        line,
                        details: format!("Expected gene and disease code, found {} field(s)", record.len()),
                    })
                }
            };

            codes.insert(gene.to_string(), code.to_string());
        }

        Ok(Self { codes })
    }

    /// Disease code for a gene symbol; a miss is not an error
    pub fn lookup(&self, gene: &str) -> Option<&str> {
        self.codes.get(gene).map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.codes.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes.is_empty()
    }
}

impl<G: Into<String>, C: Into<String>> FromIterator<(G, C)> for DiseaseLookup {
    fn from_iter<I: IntoIterator<Item = (G, C)>>(iter: I) -> Self {
        Self {
            codes: iter.into_iter().map(|(g, c)| (g.into(), c.into())).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn create_test_file(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file.flush().unwrap();
        file
    }

    #[test]
    fn test_parse_valid_file() {
        let contents = "\
# gene\tmim_number
BRCA1\t113705
MLH1\t120436\tmutL homolog 1

  PMS2  \t  600259
";
        let file = create_test_file(contents);
        let lookup = DiseaseLookup::from_path(file.path()).unwrap();

        assert_eq!(lookup.len(), 3);
        assert_eq!(lookup.lookup("BRCA1"), Some("113705"));
        assert_eq!(lookup.lookup("MLH1"), Some("120436"));
        assert_eq!(lookup.lookup("PMS2"), Some("600259"));
        assert_eq!(lookup.lookup("TTN"), None);
    }

    #[test]
    fn test_later_entry_wins() {
        let lookup = DiseaseLookup::from_reader("BRCA2\t600185\nBRCA2\t612555\n".as_bytes()).unwrap();
        assert_eq!(lookup.lookup("BRCA2"), Some("612555"));
    }

    #[test]
    fn test_missing_code_is_rejected() {
        let result = DiseaseLookup::from_reader("BRCA1\t113705\nMLH1\n".as_bytes());
        match result.unwrap_err() {
            DiseaseParseError::InvalidFormat { line, .. } => assert_eq!(line, 2),
            other => panic!("Expected InvalidFormat error, got {:?}", other),
        }
    }

    #[test]
    fn test_comments_only() {
        let lookup = DiseaseLookup::from_reader("# nothing here\n".as_bytes()).unwrap();
        assert!(lookup.is_empty());
    }

    #[test]
    fn test_missing_file() {
        let result = DiseaseLookup::from_path("/nonexistent/omim.txt");
        assert!(matches!(result, Err(DiseaseParseError::Csv(_))));
    }
}
