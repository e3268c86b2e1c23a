use crate::config::{CsvConfig, Settings};
use crate::contact::ContactColumn;
use crate::formats::VCardVersion;
use crate::languages::LanguageCatalog;
use crate::model::COUNTRY_RULES;

use super::edit::LineEditor;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SettingKey {
    OpenLastFiles,
    UseSystemFormat,
    DateFormat,
    TimeFormat,
    Columns,
    PreferredVersion,
    UseOriginalVersion,
    CountryRule,
    SkipTime,
    AddX,
    ReplaceNlns,
    EmptyPhoneType,
    WarnTypes,
    CsvEncoding,
    CsvSeparator,
}

impl SettingKey {
    pub const ALL: [SettingKey; 15] = [
        SettingKey::OpenLastFiles,
        SettingKey::UseSystemFormat,
        SettingKey::DateFormat,
        SettingKey::TimeFormat,
        SettingKey::Columns,
        SettingKey::PreferredVersion,
        SettingKey::UseOriginalVersion,
        SettingKey::CountryRule,
        SettingKey::SkipTime,
        SettingKey::AddX,
        SettingKey::ReplaceNlns,
        SettingKey::EmptyPhoneType,
        SettingKey::WarnTypes,
        SettingKey::CsvEncoding,
        SettingKey::CsvSeparator,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SettingKey::OpenLastFiles => "Open last files at startup",
            SettingKey::UseSystemFormat => "Use system date/time format",
            SettingKey::DateFormat => "Date format",
            SettingKey::TimeFormat => "Time format",
            SettingKey::Columns => "Visible columns",
            SettingKey::PreferredVersion => "Preferred vCard version",
            SettingKey::UseOriginalVersion => "Keep original file version",
            SettingKey::CountryRule => "Default country rule",
            SettingKey::SkipTime => "Skip time from date",
            SettingKey::AddX => "Add X- to non-standard types",
            SettingKey::ReplaceNlns => "Replace NL/NS names",
            SettingKey::EmptyPhoneType => "Default empty phone type",
            SettingKey::WarnTypes => "Warn on non-standard types",
            SettingKey::CsvEncoding => "CSV encoding",
            SettingKey::CsvSeparator => "CSV separator",
        }
    }

    fn is_text(self) -> bool {
        matches!(
            self,
            SettingKey::DateFormat
                | SettingKey::TimeFormat
                | SettingKey::Columns
                | SettingKey::EmptyPhoneType
                | SettingKey::CsvSeparator
        )
    }

    pub fn value(self, settings: &Settings, csv: &CsvConfig) -> String {
        let flag = |on: bool| if on { "yes" } else { "no" }.to_string();
        match self {
            SettingKey::OpenLastFiles => flag(settings.open_last_files_at_startup),
            SettingKey::UseSystemFormat => flag(settings.use_system_date_time_format),
            SettingKey::DateFormat => settings.date_format.clone(),
            SettingKey::TimeFormat => settings.time_format.clone(),
            SettingKey::Columns => settings
                .columns
                .iter()
                .map(|c| c.header())
                .collect::<Vec<_>>()
                .join(", "),
            SettingKey::PreferredVersion => settings.preferred_vcard_version.to_string(),
            SettingKey::UseOriginalVersion => flag(settings.use_original_file_version),
            SettingKey::CountryRule => usize::try_from(settings.default_country_rule)
                .ok()
                .and_then(|i| COUNTRY_RULES.get(i))
                .map(|(_, label)| label.to_string())
                .unwrap_or_default(),
            SettingKey::SkipTime => flag(settings.skip_time_from_date),
            SettingKey::AddX => flag(settings.add_x_to_non_standard_types),
            SettingKey::ReplaceNlns => flag(settings.replace_nlns_names),
            SettingKey::EmptyPhoneType => settings.default_empty_phone_type.clone(),
            SettingKey::WarnTypes => flag(settings.warn_on_non_standard_types),
            SettingKey::CsvEncoding => csv.encoding.clone(),
            SettingKey::CsvSeparator => csv.separator.clone(),
        }
    }

    /// Flip a flag or step through a choice list.
    fn cycle(self, settings: &mut Settings, csv: &mut CsvConfig, forward: bool) {
        match self {
            SettingKey::OpenLastFiles => {
                settings.open_last_files_at_startup = !settings.open_last_files_at_startup
            }
            SettingKey::UseSystemFormat => {
                settings.use_system_date_time_format = !settings.use_system_date_time_format
            }
            SettingKey::PreferredVersion => {
                settings.preferred_vcard_version = match settings.preferred_vcard_version {
                    VCardVersion::V21 => VCardVersion::V30,
                    _ => VCardVersion::V21,
                }
            }
            SettingKey::UseOriginalVersion => {
                settings.use_original_file_version = !settings.use_original_file_version
            }
            SettingKey::CountryRule => {
                let count = COUNTRY_RULES.len() as i64;
                let step = if forward { 1 } else { count - 1 };
                settings.default_country_rule =
                    (settings.default_country_rule.clamp(0, count - 1) + step) % count;
            }
            SettingKey::SkipTime => settings.skip_time_from_date = !settings.skip_time_from_date,
            SettingKey::AddX => {
                settings.add_x_to_non_standard_types = !settings.add_x_to_non_standard_types
            }
            SettingKey::ReplaceNlns => settings.replace_nlns_names = !settings.replace_nlns_names,
            SettingKey::WarnTypes => {
                settings.warn_on_non_standard_types = !settings.warn_on_non_standard_types
            }
            SettingKey::CsvEncoding => {
                let codecs = LanguageCatalog::available_codecs();
                let current = codecs
                    .iter()
                    .position(|c| c.eq_ignore_ascii_case(&csv.encoding))
                    .unwrap_or(0);
                let next = if forward {
                    current + 1
                } else {
                    current + codecs.len().saturating_sub(1)
                };
                if let Some(codec) = codecs.get(next % codecs.len().max(1)) {
                    csv.encoding = codec.clone();
                }
            }
            SettingKey::DateFormat
            | SettingKey::TimeFormat
            | SettingKey::Columns
            | SettingKey::EmptyPhoneType
            | SettingKey::CsvSeparator => {}
        }
    }

    fn set_text(self, settings: &mut Settings, csv: &mut CsvConfig, text: &str) {
        let text = text.trim();
        match self {
            SettingKey::DateFormat if !text.is_empty() => settings.date_format = text.to_string(),
            SettingKey::TimeFormat if !text.is_empty() => settings.time_format = text.to_string(),
            SettingKey::Columns => {
                let columns: Vec<ContactColumn> = text
                    .split(',')
                    .filter_map(|name| ContactColumn::from_header(name.trim()))
                    .collect();
                if !columns.is_empty() {
                    settings.columns = columns;
                }
            }
            SettingKey::EmptyPhoneType => settings.default_empty_phone_type = text.to_string(),
            SettingKey::CsvSeparator if !text.is_empty() => csv.separator = text.to_string(),
            _ => {}
        }
    }
}

/// Draft copy of the settings and CSV profile being edited.
#[derive(Debug, Clone)]
pub struct SettingsModal {
    pub draft: Settings,
    pub csv: CsvConfig,
    pub selected: usize,
    pub editor: Option<LineEditor>,
}

impl SettingsModal {
    pub fn new(settings: &Settings, csv: &CsvConfig) -> Self {
        Self {
            draft: settings.clone(),
            csv: csv.clone(),
            selected: 0,
            editor: None,
        }
    }

    pub fn value(&self, key: SettingKey) -> String {
        key.value(&self.draft, &self.csv)
    }

    pub fn current(&self) -> SettingKey {
        SettingKey::ALL[self.selected % SettingKey::ALL.len()]
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % SettingKey::ALL.len();
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + SettingKey::ALL.len() - 1) % SettingKey::ALL.len();
    }

    /// Enter on a row: start or finish text editing, or flip the value.
    pub fn activate(&mut self) {
        let key = self.current();
        if let Some(editor) = self.editor.take() {
            key.set_text(&mut self.draft, &mut self.csv, editor.value());
        } else if key.is_text() {
            self.editor = Some(LineEditor::new(&self.value(key)));
        } else {
            key.cycle(&mut self.draft, &mut self.csv, true);
        }
    }

    pub fn cycle(&mut self, forward: bool) {
        self.current().cycle(&mut self.draft, &mut self.csv, forward);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::SystemLocale;

    fn modal() -> SettingsModal {
        SettingsModal::new(
            &Settings::defaults_for(&SystemLocale::from_posix("en_GB")),
            &CsvConfig::default(),
        )
    }

    fn select(modal: &mut SettingsModal, key: SettingKey) {
        modal.selected = SettingKey::ALL.iter().position(|k| *k == key).unwrap();
    }

    #[test]
    fn flags_and_choices_cycle() {
        let mut m = modal();
        select(&mut m, SettingKey::SkipTime);
        m.activate();
        assert!(m.draft.skip_time_from_date);

        select(&mut m, SettingKey::PreferredVersion);
        m.activate();
        assert_eq!(m.draft.preferred_vcard_version, VCardVersion::V30);

        select(&mut m, SettingKey::CountryRule);
        m.cycle(false);
        assert_eq!(m.draft.default_country_rule, COUNTRY_RULES.len() as i64 - 1);
        m.cycle(true);
        assert_eq!(m.draft.default_country_rule, 0);
    }

    #[test]
    fn column_text_ignores_unknown_headers() {
        let mut m = modal();
        select(&mut m, SettingKey::Columns);
        m.activate();
        m.editor.as_mut().unwrap().set_value("First name, Shoe size, Phone");
        m.activate();
        assert!(m.editor.is_none());
        assert_eq!(
            m.draft.columns,
            vec![ContactColumn::FirstName, ContactColumn::Phone]
        );
    }

    #[test]
    fn csv_profile_is_edited_in_the_draft() {
        let mut m = modal();
        select(&mut m, SettingKey::CsvSeparator);
        m.activate();
        m.editor.as_mut().unwrap().set_value(";");
        m.activate();
        assert_eq!(m.csv.separator, ";");
        assert_eq!(m.value(SettingKey::CsvSeparator), ";");

        select(&mut m, SettingKey::CsvEncoding);
        m.csv.encoding = "utf-8".into();
        m.cycle(true);
        assert_eq!(m.csv.encoding, "UTF-8");
    }
}
