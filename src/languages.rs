use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::{debug, warn};

pub const FALLBACK_LANGUAGE_CODE: &str = "en_GB";
pub const FALLBACK_NATIVE_NAME: &str = "English (United Kingdom)";

const SYSTEM_TRANSLATIONS_DIR: &str = "/usr/share/doublecontact/translations";

/// Text encodings the CSV reader accepts.
const AVAILABLE_CODECS: &[&str] = &["UTF-8"];

#[derive(Debug, Error)]
pub enum LanguageError {
    #[error("failed to open language table {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// ISO-639 language table: native name to code, plus the lookups needed to
/// resolve the host language.
#[derive(Debug, Default, Clone)]
pub struct LanguageCatalog {
    codes_by_native: BTreeMap<String, String>,
    native_by_english: BTreeMap<String, String>,
    english_by_code: BTreeMap<String, String>,
}

impl LanguageCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a tab-separated `code, English name, native name` table.
    ///
    /// Previous entries are discarded. Lines with fewer than three fields are
    /// skipped. Returns the number of entries loaded.
    pub fn load(&mut self, path: &Path) -> Result<usize, LanguageError> {
        let raw = fs::read(path).map_err(|source| LanguageError::Open {
            path: path.to_path_buf(),
            source,
        })?;
        let text = String::from_utf8_lossy(&raw);
        Ok(self.load_str(&text))
    }

    pub fn load_str(&mut self, text: &str) -> usize {
        self.codes_by_native.clear();
        self.native_by_english.clear();
        self.english_by_code.clear();

        let mut skipped = 0usize;
        for (line_no, record) in text.lines().enumerate() {
            let record = record.trim_end_matches(['\r', '\n']);
            if record.is_empty() {
                continue;
            }
            let fields: Vec<&str> = record.split('\t').filter(|f| !f.is_empty()).collect();
            let [code, english, native, ..] = fields.as_slice() else {
                skipped += 1;
                debug!(line = line_no + 1, "skipping malformed language table line");
                continue;
            };
            self.codes_by_native
                .insert(native.to_string(), code.to_string());
            self.native_by_english
                .insert(english.to_string(), native.to_string());
            self.english_by_code
                .insert(code.to_string(), english.to_string());
        }
        if skipped > 0 {
            warn!(skipped, "language table contained malformed lines");
        }
        self.codes_by_native.len()
    }

    pub fn is_empty(&self) -> bool {
        self.codes_by_native.is_empty()
    }

    pub fn native_names(&self) -> Vec<String> {
        self.codes_by_native.keys().cloned().collect()
    }

    pub fn native_name_to_code(&self, name: &str) -> &str {
        self.codes_by_native
            .get(name)
            .map(String::as_str)
            .unwrap_or(FALLBACK_LANGUAGE_CODE)
    }

    /// Native name of the host language, or English (United Kingdom).
    pub fn system_language_native_name(&self, locale: &SystemLocale) -> String {
        let english = self
            .english_by_code
            .get(&locale.code)
            .or_else(|| self.english_by_code.get(&locale.language));
        english
            .and_then(|name| self.native_by_english.get(name))
            .cloned()
            .unwrap_or_else(|| FALLBACK_NATIVE_NAME.to_string())
    }

    pub fn available_codecs() -> Vec<String> {
        AVAILABLE_CODECS.iter().map(|c| c.to_string()).collect()
    }
}

/// Directory holding installed translation resources.
pub fn translations_dir() -> PathBuf {
    let system = Path::new(SYSTEM_TRANSLATIONS_DIR);
    if system.is_dir() {
        system.to_path_buf()
    } else {
        executable_dir()
    }
}

pub fn executable_dir() -> PathBuf {
    env::current_exe()
        .ok()
        .and_then(|exe| exe.parent().map(Path::to_path_buf))
        .unwrap_or_else(|| PathBuf::from("."))
}

/// Translation catalog for a language code. The built-in language needs none.
pub fn translation_file(code: &str) -> Option<PathBuf> {
    if code == FALLBACK_LANGUAGE_CODE {
        return None;
    }
    Some(translations_dir().join(format!("doublecontact_{code}.toml")))
}

/// Host language and default date/time formats, taken from the POSIX locale
/// environment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SystemLocale {
    /// Full code such as `ru_RU`.
    pub code: String,
    /// Language part such as `ru`.
    pub language: String,
    pub date_format: String,
    pub time_format: String,
}

impl SystemLocale {
    pub fn detect() -> Self {
        let raw = ["LC_ALL", "LC_MESSAGES", "LANG"]
            .iter()
            .filter_map(|var| env::var(var).ok())
            .find(|value| !value.is_empty())
            .unwrap_or_default();
        Self::from_posix(&raw)
    }

    /// Parse `ru_RU.UTF-8@euro` style values; `C`/`POSIX`/empty map to en_GB.
    pub fn from_posix(raw: &str) -> Self {
        let base = raw
            .split(['.', '@'])
            .next()
            .unwrap_or_default()
            .trim();
        let code = if base.is_empty() || base == "C" || base == "POSIX" {
            FALLBACK_LANGUAGE_CODE.to_string()
        } else {
            base.to_string()
        };
        let language = code.split('_').next().unwrap_or_default().to_string();
        let (date_format, time_format) = default_formats(&code, &language);
        Self {
            code,
            language,
            date_format: date_format.to_string(),
            time_format: time_format.to_string(),
        }
    }
}

fn default_formats(code: &str, language: &str) -> (&'static str, &'static str) {
    match (code, language) {
        ("en_US", _) => ("M/d/yy", "h:mm AP"),
        (_, "en") => ("dd/MM/yyyy", "HH:mm"),
        (_, "ru" | "uk" | "be" | "de" | "pl" | "cs" | "fi" | "nb" | "tr") => ("dd.MM.yyyy", "HH:mm"),
        (_, "fr" | "es" | "it" | "pt") => ("dd/MM/yyyy", "HH:mm"),
        _ => ("yyyy-MM-dd", "HH:mm"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    const TABLE: &str = "en_GB\tEnglish\tEnglish (United Kingdom)\n\
                         ru_RU\tRussian\tРусский\r\n\
                         broken line\n\
                         uk_UA\tUkrainian\tУкраїнська\n";

    #[test]
    fn load_skips_malformed_lines() {
        let mut catalog = LanguageCatalog::new();
        assert_eq!(catalog.load_str(TABLE), 3);
        assert_eq!(catalog.native_name_to_code("Русский"), "ru_RU");
        assert_eq!(catalog.native_name_to_code("Українська"), "uk_UA");
    }

    #[test]
    fn unknown_names_fall_back_to_en_gb() {
        let mut catalog = LanguageCatalog::new();
        catalog.load_str(TABLE);
        assert_eq!(catalog.native_name_to_code("Klingon"), "en_GB");
        assert_eq!(LanguageCatalog::new().native_name_to_code("Русский"), "en_GB");
    }

    #[test]
    fn load_fails_for_missing_file() {
        let dir = TempDir::new().unwrap();
        let mut catalog = LanguageCatalog::new();
        let err = catalog.load(&dir.path().join("missing.utf8")).unwrap_err();
        assert!(matches!(err, LanguageError::Open { .. }));
    }

    #[test]
    fn load_reads_file_and_replaces_entries() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("iso639-1.utf8");
        fs::write(&path, TABLE).unwrap();

        let mut catalog = LanguageCatalog::new();
        catalog.load_str("de_DE\tGerman\tDeutsch\n");
        assert_eq!(catalog.load(&path).unwrap(), 3);
        assert_eq!(catalog.native_name_to_code("Deutsch"), "en_GB");
        assert_eq!(
            catalog.native_names(),
            vec!["English (United Kingdom)", "Русский", "Українська"]
        );
    }

    #[test]
    fn system_language_resolves_through_english_name() {
        let mut catalog = LanguageCatalog::new();
        catalog.load_str(TABLE);
        let locale = SystemLocale::from_posix("ru_RU.UTF-8");
        assert_eq!(catalog.system_language_native_name(&locale), "Русский");

        let unknown = SystemLocale::from_posix("ja_JP.UTF-8");
        assert_eq!(
            catalog.system_language_native_name(&unknown),
            FALLBACK_NATIVE_NAME
        );
    }

    #[test]
    fn posix_locale_parsing() {
        let locale = SystemLocale::from_posix("de_DE.UTF-8@euro");
        assert_eq!(locale.code, "de_DE");
        assert_eq!(locale.language, "de");
        assert_eq!(locale.date_format, "dd.MM.yyyy");

        let c = SystemLocale::from_posix("C");
        assert_eq!(c.code, "en_GB");
        assert_eq!(c.date_format, "dd/MM/yyyy");
    }

    #[test]
    fn built_in_language_needs_no_translation_file() {
        assert!(translation_file("en_GB").is_none());
        let path = translation_file("ru_RU").unwrap();
        assert!(path.ends_with("doublecontact_ru_RU.toml"));
    }
}
