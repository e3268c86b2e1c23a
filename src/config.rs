use std::fs;
use std::path::{Path, PathBuf};

use directories::{BaseDirs, UserDirs};
use serde::Deserialize;
use toml::{Table, Value};
use tracing::{debug, warn};

use crate::contact::ContactColumn;
use crate::formats::VCardVersion;
use crate::languages::SystemLocale;

pub const SETTINGS_FILE_NAME: &str = "doublecontact.toml";
const APP_NAME: &str = "doublecontact";

const KNOWN_SECTIONS: &[&str] = &["Locale", "General", "VisibleColumns", "Saving", "Loading", "CSV"];

// =============================================================================
// Settings
// =============================================================================

/// Preferences shared by the whole program. Owned by the entry point and
/// passed by reference.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub date_format: String,
    pub time_format: String,
    pub use_system_date_time_format: bool,
    pub open_last_files_at_startup: bool,
    pub columns: Vec<ContactColumn>,
    pub preferred_vcard_version: VCardVersion,
    pub use_original_file_version: bool,
    pub default_country_rule: i64,
    pub skip_time_from_date: bool,
    pub add_x_to_non_standard_types: bool,
    pub replace_nlns_names: bool,
    pub default_empty_phone_type: String,
    pub warn_on_non_standard_types: bool,
}

impl Settings {
    pub fn defaults_for(locale: &SystemLocale) -> Self {
        Self {
            date_format: locale.date_format.clone(),
            time_format: locale.time_format.clone(),
            use_system_date_time_format: true,
            open_last_files_at_startup: true,
            columns: ContactColumn::DEFAULT.to_vec(),
            preferred_vcard_version: VCardVersion::V21,
            use_original_file_version: true,
            default_country_rule: 0,
            skip_time_from_date: false,
            add_x_to_non_standard_types: false,
            replace_nlns_names: false,
            default_empty_phone_type: "voice".to_string(),
            warn_on_non_standard_types: true,
        }
    }

    /// Re-derive date/time formats from the host locale when the user asked
    /// to follow it.
    pub fn update_formats(&mut self, locale: &SystemLocale) {
        if self.use_system_date_time_format {
            self.date_format = locale.date_format.clone();
            self.time_format = locale.time_format.clone();
        }
    }
}

/// Generic CSV profile parameters.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CsvConfig {
    pub profile: String,
    pub encoding: String,
    pub separator: String,
}

impl Default for CsvConfig {
    fn default() -> Self {
        Self {
            profile: String::new(),
            encoding: "UTF-8".to_string(),
            separator: ",".to_string(),
        }
    }
}

// =============================================================================
// Store
// =============================================================================

#[derive(Debug)]
struct Storage {
    path: PathBuf,
    doc: Table,
}

/// Key-value settings persisted as a TOML document of `[Section]` tables.
///
/// Keys are addressed as `Section/Key`. When the backing file cannot be
/// located or parsed the store is unavailable: getters return their
/// fallbacks and setters do nothing.
#[derive(Debug)]
pub struct ConfigStore {
    storage: Option<Storage>,
    locale: SystemLocale,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PortableMarker {
    #[serde(rename = "General")]
    general: PortableGeneral,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct PortableGeneral {
    #[serde(rename = "IsPortable")]
    is_portable: bool,
}

impl ConfigStore {
    /// Use the settings file next to the executable when it declares
    /// `General/IsPortable = true`, else the per-user config directory.
    pub fn prepare(exe_dir: &Path, locale: SystemLocale) -> Self {
        let portable_path = exe_dir.join(SETTINGS_FILE_NAME);
        if is_portable(&portable_path) {
            debug!(path = %portable_path.display(), "using portable settings");
            return Self::at(&portable_path, locale);
        }
        match standard_path() {
            Some(path) => Self::at(&path, locale),
            None => {
                warn!("unable to determine config directory; settings will not persist");
                Self::unavailable(locale)
            }
        }
    }

    pub fn at(path: &Path, locale: SystemLocale) -> Self {
        let doc = if path.exists() {
            let raw = match fs::read_to_string(path) {
                Ok(raw) => raw,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to read settings");
                    return Self::unavailable(locale);
                }
            };
            match raw.parse::<Table>() {
                Ok(doc) => doc,
                Err(err) => {
                    warn!(path = %path.display(), error = %err, "failed to parse settings as TOML");
                    return Self::unavailable(locale);
                }
            }
        } else {
            Table::new()
        };
        warn_unknown_sections(&doc);
        Self {
            storage: Some(Storage {
                path: path.to_path_buf(),
                doc,
            }),
            locale,
        }
    }

    pub fn unavailable(locale: SystemLocale) -> Self {
        Self {
            storage: None,
            locale,
        }
    }

    pub fn is_available(&self) -> bool {
        self.storage.is_some()
    }

    pub fn path(&self) -> Option<&Path> {
        self.storage.as_ref().map(|s| s.path.as_path())
    }

    pub fn locale(&self) -> &SystemLocale {
        &self.locale
    }

    // -------------------------------------------------------------------------
    // Whole-settings access
    // -------------------------------------------------------------------------

    pub fn read(&self, settings: &mut Settings) {
        if !self.is_available() {
            return;
        }
        settings.date_format = self.get_str("Locale/DateFormat", &self.locale.date_format);
        settings.time_format = self.get_str("Locale/TimeFormat", &self.locale.time_format);
        settings.use_system_date_time_format = self.get_bool("Locale/UseSystemDateTimeFormat", true);
        settings.update_formats(&self.locale);

        settings.open_last_files_at_startup = self.get_bool("General/OpenLastFilesAtStartup", true);

        settings.columns.clear();
        let count = self.get_int("VisibleColumns/Count", 0).max(0);
        for i in 1..=count {
            let candidate = self.get_str(&format!("VisibleColumns/Column{i}"), "");
            match ContactColumn::from_header(&candidate) {
                Some(column) => settings.columns.push(column),
                None => debug!(column = %candidate, "ignoring unknown visible column"),
            }
        }
        if settings.columns.is_empty() {
            settings.columns = ContactColumn::DEFAULT.to_vec();
        }

        settings.preferred_vcard_version =
            match self.get_str("Saving/PreferredVCardVersion", "2.1").as_str() {
                "2.1" => VCardVersion::V21,
                _ => VCardVersion::V30,
            };
        settings.use_original_file_version = self.get_bool("Saving/UseOriginalFileVCardVersion", true);
        settings.default_country_rule = self.get_int("Saving/DefaultCountryRule", 0);
        settings.skip_time_from_date = self.get_bool("Saving/SkipTimeFromDate", false);
        settings.add_x_to_non_standard_types = self.get_bool("Saving/AddXToNonStandardTypes", false);
        settings.replace_nlns_names = self.get_bool("Saving/ReplaceNLNSNames", false);

        settings.default_empty_phone_type = self.get_str("Loading/DefaultEmptyPhoneType", "voice");
        settings.warn_on_non_standard_types = self.get_bool("Loading/WarnOnNonStandardTypes", true);
    }

    pub fn write(&mut self, settings: &mut Settings) {
        if !self.is_available() {
            return;
        }
        settings.update_formats(&self.locale);
        self.set_value("Locale/DateFormat", Value::from(settings.date_format.as_str()));
        self.set_value("Locale/TimeFormat", Value::from(settings.time_format.as_str()));
        self.set_value("Locale/UseSystemDateTimeFormat", Value::from(settings.use_system_date_time_format));

        self.set_value("General/OpenLastFilesAtStartup", Value::from(settings.open_last_files_at_startup));

        if let Some(storage) = self.storage.as_mut() {
            storage.doc.remove("VisibleColumns");
        }
        self.set_value("VisibleColumns/Count", Value::from(settings.columns.len() as i64));
        for (i, column) in settings.columns.iter().enumerate() {
            self.set_value(&format!("VisibleColumns/Column{}", i + 1), Value::from(column.header()));
        }

        let version = match settings.preferred_vcard_version {
            VCardVersion::V30 => "3.0",
            _ => "2.1",
        };
        self.set_value("Saving/PreferredVCardVersion", Value::from(version));
        self.set_value("Saving/UseOriginalFileVCardVersion", Value::from(settings.use_original_file_version));
        self.set_value("Saving/DefaultCountryRule", Value::from(settings.default_country_rule));
        self.set_value("Saving/SkipTimeFromDate", Value::from(settings.skip_time_from_date));
        self.set_value("Saving/AddXToNonStandardTypes", Value::from(settings.add_x_to_non_standard_types));
        self.set_value("Saving/ReplaceNLNSNames", Value::from(settings.replace_nlns_names));

        self.set_value("Loading/DefaultEmptyPhoneType", Value::from(settings.default_empty_phone_type.as_str()));
        self.set_value("Loading/WarnOnNonStandardTypes", Value::from(settings.warn_on_non_standard_types));
        self.flush();
    }

    // -------------------------------------------------------------------------
    // Independent accessors
    // -------------------------------------------------------------------------

    pub fn read_language(&self) -> String {
        self.get_str("General/Language", "")
    }

    pub fn write_language(&mut self, language: &str) {
        self.set_and_flush("General/Language", Value::from(language));
    }

    pub fn last_contact_file(&self) -> String {
        if !self.is_available() {
            return String::new();
        }
        self.get_str("General/LastContactFile", &default_document_dir())
    }

    pub fn set_last_contact_file(&mut self, path: &str) {
        self.set_and_flush("General/LastContactFile", Value::from(path));
    }

    pub fn last_image_file(&self) -> String {
        if !self.is_available() {
            return String::new();
        }
        self.get_str("General/LastImageFile", &default_image_dir())
    }

    pub fn set_last_image_file(&mut self, path: &str) {
        self.set_and_flush("General/LastImageFile", Value::from(path));
    }

    pub fn show_two_panels(&self) -> bool {
        if !self.is_available() {
            return false;
        }
        self.get_bool("General/ShowTwoPanels", true)
    }

    pub fn set_show_two_panels(&mut self, value: bool) {
        self.set_and_flush("General/ShowTwoPanels", Value::from(value));
    }

    pub fn sorting_enabled(&self) -> bool {
        self.get_bool("General/SortingEnabled", false)
    }

    pub fn set_sorting_enabled(&mut self, value: bool) {
        self.set_and_flush("General/SortingEnabled", Value::from(value));
    }

    /// CSV profile settings, or `None` when the store is unavailable.
    pub fn csv_config(&self) -> Option<CsvConfig> {
        if !self.is_available() {
            return None;
        }
        let defaults = CsvConfig::default();
        Some(CsvConfig {
            profile: self.get_str("CSV/LastProfile", &defaults.profile),
            encoding: self.get_str("CSV/GenericProfileEncoding", &defaults.encoding),
            separator: self.get_str("CSV/GenericProfileSeparator", &defaults.separator),
        })
    }

    pub fn set_csv_config(&mut self, config: &CsvConfig) {
        if !self.is_available() {
            return;
        }
        self.set_value("CSV/LastProfile", Value::from(config.profile.as_str()));
        self.set_value("CSV/GenericProfileEncoding", Value::from(config.encoding.as_str()));
        self.set_value("CSV/GenericProfileSeparator", Value::from(config.separator.as_str()));
        self.flush();
    }

    // -------------------------------------------------------------------------
    // Raw key access
    // -------------------------------------------------------------------------

    fn value(&self, key: &str) -> Option<&Value> {
        let storage = self.storage.as_ref()?;
        let (section, name) = split_key(key);
        storage.doc.get(section)?.as_table()?.get(name)
    }

    fn get_str(&self, key: &str, default: &str) -> String {
        match self.value(key) {
            Some(Value::String(s)) => s.clone(),
            Some(Value::Integer(i)) => i.to_string(),
            Some(Value::Float(f)) => f.to_string(),
            Some(Value::Boolean(b)) => b.to_string(),
            _ => default.to_string(),
        }
    }

    fn get_bool(&self, key: &str, default: bool) -> bool {
        match self.value(key) {
            Some(Value::Boolean(b)) => *b,
            Some(Value::String(s)) => match s.trim().to_ascii_lowercase().as_str() {
                "true" | "1" => true,
                "false" | "0" => false,
                _ => default,
            },
            Some(Value::Integer(i)) => *i != 0,
            _ => default,
        }
    }

    fn get_int(&self, key: &str, default: i64) -> i64 {
        match self.value(key) {
            Some(Value::Integer(i)) => *i,
            Some(Value::String(s)) => s.trim().parse().unwrap_or(default),
            _ => default,
        }
    }

    fn set_value(&mut self, key: &str, value: Value) {
        let Some(storage) = self.storage.as_mut() else {
            return;
        };
        let (section, name) = split_key(key);
        let entry = storage
            .doc
            .entry(section.to_string())
            .or_insert_with(|| Value::Table(Table::new()));
        if !entry.is_table() {
            *entry = Value::Table(Table::new());
        }
        if let Value::Table(table) = entry {
            table.insert(name.to_string(), value);
        }
    }

    fn set_and_flush(&mut self, key: &str, value: Value) {
        if !self.is_available() {
            return;
        }
        self.set_value(key, value);
        self.flush();
    }

    fn flush(&self) {
        let Some(storage) = self.storage.as_ref() else {
            return;
        };
        if let Some(parent) = storage.path.parent() {
            if let Err(err) = fs::create_dir_all(parent) {
                warn!(path = %parent.display(), error = %err, "failed to create settings directory");
                return;
            }
        }
        let serialized = match toml::to_string_pretty(&storage.doc) {
            Ok(text) => text,
            Err(err) => {
                warn!(error = %err, "failed to serialize settings");
                return;
            }
        };
        if let Err(err) = fs::write(&storage.path, serialized) {
            warn!(path = %storage.path.display(), error = %err, "failed to write settings");
        }
    }
}

fn split_key(key: &str) -> (&str, &str) {
    key.split_once('/').unwrap_or(("General", key))
}

fn is_portable(path: &Path) -> bool {
    let Ok(raw) = fs::read_to_string(path) else {
        return false;
    };
    toml::from_str::<PortableMarker>(&raw)
        .map(|marker| marker.general.is_portable)
        .unwrap_or(false)
}

fn standard_path() -> Option<PathBuf> {
    let base = BaseDirs::new()?;
    Some(base.config_dir().join(APP_NAME).join(SETTINGS_FILE_NAME))
}

fn default_document_dir() -> String {
    UserDirs::new()
        .and_then(|dirs| dirs.document_dir().map(Path::to_path_buf))
        .or_else(home::home_dir)
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn default_image_dir() -> String {
    UserDirs::new()
        .and_then(|dirs| dirs.picture_dir().map(Path::to_path_buf))
        .or_else(home::home_dir)
        .map(|p| p.display().to_string())
        .unwrap_or_default()
}

fn warn_unknown_sections(doc: &Table) {
    for key in doc.keys() {
        if !KNOWN_SECTIONS.contains(&key.as_str()) {
            warn!("unknown settings section `{}`", key);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn locale() -> SystemLocale {
        SystemLocale::from_posix("ru_RU.UTF-8")
    }

    fn store_in(dir: &TempDir) -> ConfigStore {
        ConfigStore::at(&dir.path().join(SETTINGS_FILE_NAME), locale())
    }

    #[test]
    fn missing_keys_read_as_defaults() {
        let dir = TempDir::new().unwrap();
        let store = store_in(&dir);
        let mut settings = Settings::defaults_for(&SystemLocale::from_posix("C"));
        store.read(&mut settings);

        assert_eq!(settings, Settings::defaults_for(&locale()));
        assert_eq!(settings.default_empty_phone_type, "voice");
        assert_eq!(settings.preferred_vcard_version, VCardVersion::V21);
        assert_eq!(settings.columns, ContactColumn::DEFAULT.to_vec());
        assert!(store.show_two_panels());
        assert!(!store.sorting_enabled());
        assert_eq!(store.read_language(), "");
        assert_eq!(store.csv_config(), Some(CsvConfig::default()));
    }

    #[test]
    fn write_then_fresh_read_round_trips() {
        let dir = TempDir::new().unwrap();
        let mut settings = Settings::defaults_for(&locale());
        settings.use_system_date_time_format = false;
        settings.date_format = "yyyy-MM-dd".into();
        settings.time_format = "HH:mm:ss".into();
        settings.open_last_files_at_startup = false;
        settings.columns = vec![ContactColumn::FullName, ContactColumn::Email];
        settings.preferred_vcard_version = VCardVersion::V30;
        settings.use_original_file_version = false;
        settings.default_country_rule = 3;
        settings.skip_time_from_date = true;
        settings.add_x_to_non_standard_types = true;
        settings.replace_nlns_names = true;
        settings.default_empty_phone_type = "cell".into();
        settings.warn_on_non_standard_types = false;

        let mut store = store_in(&dir);
        store.write(&mut settings);
        store.write_language("Русский");
        store.set_last_contact_file("/tmp/a.vcf");
        store.set_last_image_file("/tmp/a.png");
        store.set_show_two_panels(false);
        store.set_sorting_enabled(true);
        let csv = CsvConfig {
            profile: "generic".into(),
            encoding: "UTF-8".into(),
            separator: ";".into(),
        };
        store.set_csv_config(&csv);

        let fresh = store_in(&dir);
        let mut loaded = Settings::defaults_for(&locale());
        fresh.read(&mut loaded);
        assert_eq!(loaded, settings);
        assert_eq!(fresh.read_language(), "Русский");
        assert_eq!(fresh.last_contact_file(), "/tmp/a.vcf");
        assert_eq!(fresh.last_image_file(), "/tmp/a.png");
        assert!(!fresh.show_two_panels());
        assert!(fresh.sorting_enabled());
        assert_eq!(fresh.csv_config(), Some(csv));
    }

    #[test]
    fn system_formats_override_stored_ones() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE_NAME),
            "[Locale]\nDateFormat = \"yyyy\"\nUseSystemDateTimeFormat = true\n",
        )
        .unwrap();
        let mut settings = Settings::defaults_for(&locale());
        store_in(&dir).read(&mut settings);
        assert_eq!(settings.date_format, "dd.MM.yyyy");
    }

    #[test]
    fn unknown_columns_are_dropped() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE_NAME),
            "[VisibleColumns]\nCount = 3\nColumn1 = \"Email\"\nColumn2 = \"Shoe size\"\nColumn3 = \"Phone\"\n",
        )
        .unwrap();
        let mut settings = Settings::defaults_for(&locale());
        store_in(&dir).read(&mut settings);
        assert_eq!(settings.columns, vec![ContactColumn::Email, ContactColumn::Phone]);
    }

    #[test]
    fn unsupported_version_reads_as_3_0() {
        let dir = TempDir::new().unwrap();
        fs::write(
            dir.path().join(SETTINGS_FILE_NAME),
            "[Saving]\nPreferredVCardVersion = \"4.0\"\n",
        )
        .unwrap();
        let mut settings = Settings::defaults_for(&locale());
        store_in(&dir).read(&mut settings);
        assert_eq!(settings.preferred_vcard_version, VCardVersion::V30);
    }

    #[test]
    fn broken_file_makes_store_unavailable() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&path, "[General\nnot toml").unwrap();

        let mut store = ConfigStore::at(&path, locale());
        assert!(!store.is_available());
        assert_eq!(store.read_language(), "");
        assert!(!store.show_two_panels());
        assert_eq!(store.last_contact_file(), "");
        assert!(store.csv_config().is_none());

        store.set_show_two_panels(true);
        store.write_language("Русский");
        assert_eq!(fs::read_to_string(&path).unwrap(), "[General\nnot toml");

        let mut settings = Settings::defaults_for(&SystemLocale::from_posix("C"));
        let before = settings.clone();
        store.read(&mut settings);
        assert_eq!(settings, before);
    }

    #[test]
    fn portable_flag_selects_executable_directory() {
        let dir = TempDir::new().unwrap();
        let portable = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&portable, "[General]\nIsPortable = true\nLanguage = \"Русский\"\n").unwrap();

        let store = ConfigStore::prepare(dir.path(), locale());
        assert_eq!(store.path(), Some(portable.as_path()));
        assert_eq!(store.read_language(), "Русский");
    }

    #[test]
    fn non_portable_file_is_ignored() {
        let dir = TempDir::new().unwrap();
        let portable = dir.path().join(SETTINGS_FILE_NAME);
        fs::write(&portable, "[General]\nIsPortable = false\n").unwrap();
        assert!(!is_portable(&portable));
        assert!(!is_portable(&dir.path().join("absent.toml")));
    }

    #[test]
    fn setters_persist_immediately() {
        let dir = TempDir::new().unwrap();
        let mut store = store_in(&dir);
        store.set_sorting_enabled(true);
        let raw = fs::read_to_string(dir.path().join(SETTINGS_FILE_NAME)).unwrap();
        assert!(raw.contains("SortingEnabled = true"));
    }
}
