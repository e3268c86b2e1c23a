//! Contact list file formats, chosen by file extension.

pub mod csv;
pub mod vcard;

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, info};

use crate::config::{CsvConfig, Settings};
use crate::contact::ContactItem;

const VCARD_EXTENSIONS: &[&str] = &["vcf", "vcard"];
const CSV_EXTENSIONS: &[&str] = &["csv"];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum VCardVersion {
    V21,
    V30,
    V40,
}

impl VCardVersion {
    pub fn as_str(self) -> &'static str {
        match self {
            VCardVersion::V21 => "2.1",
            VCardVersion::V30 => "3.0",
            VCardVersion::V40 => "4.0",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value.trim() {
            "2.1" => Some(VCardVersion::V21),
            "3.0" => Some(VCardVersion::V30),
            "4.0" => Some(VCardVersion::V40),
            _ => None,
        }
    }
}

impl fmt::Display for VCardVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Error)]
pub enum FormatError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write {path}: {source}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("unknown file format: {0}")]
    UnknownFormat(PathBuf),
    #[error("no vCards found in {0}")]
    NoCards(PathBuf),
    #[error("invalid vCard #{index}: {message}")]
    InvalidCard { index: usize, message: String },
    #[error("invalid quoted-printable value: {0}")]
    QuotedPrintable(String),
    #[error("unsupported text encoding {0}")]
    UnsupportedEncoding(String),
    #[error("CSV error: {0}")]
    Csv(#[from] ::csv::Error),
}

/// Contents of a file plus the non-fatal problems found while reading it.
#[derive(Debug, Default)]
pub struct Loaded {
    pub items: Vec<ContactItem>,
    /// vCard version the file was written in, when the file is a vCard.
    pub version: Option<VCardVersion>,
    pub warnings: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FileFormat {
    VCard,
    Csv,
}

impl FileFormat {
    pub fn for_path(path: &Path) -> Option<Self> {
        let ext = path.extension()?.to_str()?.to_ascii_lowercase();
        if VCARD_EXTENSIONS.contains(&ext.as_str()) {
            Some(FileFormat::VCard)
        } else if CSV_EXTENSIONS.contains(&ext.as_str()) {
            Some(FileFormat::Csv)
        } else {
            None
        }
    }
}

/// Opens and saves contact lists, dispatching on the file extension.
#[derive(Debug, Clone, Default)]
pub struct FormatRegistry {
    csv: CsvConfig,
}

impl FormatRegistry {
    pub fn new(csv: CsvConfig) -> Self {
        Self { csv }
    }

    pub fn csv_config(&self) -> &CsvConfig {
        &self.csv
    }

    pub fn set_csv_config(&mut self, csv: CsvConfig) {
        self.csv = csv;
    }

    /// File dialog filters: description and extensions.
    pub fn supported_filters() -> Vec<(&'static str, &'static [&'static str])> {
        vec![("vCard", VCARD_EXTENSIONS), ("CSV", CSV_EXTENSIONS)]
    }

    pub fn open(&self, path: &Path, settings: &Settings) -> Result<Loaded, FormatError> {
        let format =
            FileFormat::for_path(path).ok_or_else(|| FormatError::UnknownFormat(path.to_path_buf()))?;
        let raw = fs::read(path).map_err(|source| FormatError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        let loaded = match format {
            FileFormat::VCard => {
                let text = String::from_utf8_lossy(&raw);
                let loaded = vcard::read(&text, settings)?;
                if loaded.items.is_empty() {
                    return Err(FormatError::NoCards(path.to_path_buf()));
                }
                loaded
            }
            FileFormat::Csv => csv::read(&raw, &self.csv)?,
        };
        info!(
            path = %path.display(),
            records = loaded.items.len(),
            warnings = loaded.warnings.len(),
            "opened contact list"
        );
        Ok(loaded)
    }

    /// Write `items` to `path`. `original` is the vCard version the list was
    /// loaded with; it is kept when the settings ask for it and it can be
    /// written. Returns the warnings produced while writing.
    pub fn save(
        &self,
        path: &Path,
        items: &[ContactItem],
        original: Option<VCardVersion>,
        settings: &Settings,
    ) -> Result<Vec<String>, FormatError> {
        let format =
            FileFormat::for_path(path).ok_or_else(|| FormatError::UnknownFormat(path.to_path_buf()))?;
        let (bytes, warnings) = match format {
            FileFormat::VCard => {
                let version = output_version(original, settings);
                debug!(version = %version, "writing vCard");
                let (text, warnings) = vcard::write(items, version, settings);
                (text.into_bytes(), warnings)
            }
            FileFormat::Csv => (csv::write(items, &self.csv)?, Vec::new()),
        };
        fs::write(path, bytes).map_err(|source| FormatError::Write {
            path: path.to_path_buf(),
            source,
        })?;
        info!(path = %path.display(), records = items.len(), "saved contact list");
        Ok(warnings)
    }
}

/// Version used when saving: the file's own version if wanted and writable,
/// otherwise the preferred one.
pub fn output_version(original: Option<VCardVersion>, settings: &Settings) -> VCardVersion {
    match original {
        Some(v @ (VCardVersion::V21 | VCardVersion::V30)) if settings.use_original_file_version => v,
        _ => match settings.preferred_vcard_version {
            VCardVersion::V30 => VCardVersion::V30,
            _ => VCardVersion::V21,
        },
    }
}
