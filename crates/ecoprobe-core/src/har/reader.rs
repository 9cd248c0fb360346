use super::types::Har;
use crate::{Error, Result};
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::Path;

pub struct HarReader;

impl HarReader {
    /// Read and parse a HAR file from the given path
    pub fn from_file(path: &Path) -> Result<Har> {
        tracing::debug!("Reading HAR file from: {}", path.display());

        let file = File::open(path)?;
        let har = Self::from_reader(BufReader::new(file))?;

        tracing::info!(
            "Parsed {} with {} entries",
            path.display(),
            har.log.entries.len()
        );

        Ok(har)
    }

    /// Parse a HAR document from any reader
    pub fn from_reader<R: Read>(reader: R) -> Result<Har> {
        let har: Har = serde_json::from_reader(reader)?;
        Ok(har)
    }

    /// Parse a HAR document from a JSON string
    pub fn from_str(content: &str) -> Result<Har> {
        let har: Har = serde_json::from_str(content)?;

        tracing::debug!("Parsed HAR string with {} entries", har.log.entries.len());

        Ok(har)
    }

    /// Check that every entry can be measured
    pub fn validate(har: &Har) -> Result<()> {
        if har.log.version.is_empty() {
            return Err(Error::InvalidStructure("Missing HAR version".to_string()));
        }

        if har.log.entries.is_empty() {
            tracing::warn!("HAR contains no entries, network rules will stay pending");
        }

        if let Some(idx) = har
            .log
            .entries
            .iter()
            .position(|entry| entry.request.url.trim().is_empty())
        {
            return Err(Error::InvalidStructure(format!(
                "Entry {} has empty request URL",
                idx
            )));
        }

        Ok(())
    }
}
