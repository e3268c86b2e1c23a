use std::path::{Path, PathBuf};

use rlibphonenumber::{PhoneNumberFormat, PHONE_NUMBER_UTIL};
use tracing::{debug, info};

use crate::config::Settings;
use crate::contact::{phone_digits, ContactColumn, ContactItem, Email, Phone};
use crate::formats::{FormatError, FormatRegistry, VCardVersion};

/// Regions selectable as `Saving/DefaultCountryRule`, by index.
pub const COUNTRY_RULES: &[(&str, &str)] = &[
    ("RU", "Russia (+7)"),
    ("UA", "Ukraine (+380)"),
    ("BY", "Belarus (+375)"),
    ("KZ", "Kazakhstan (+7)"),
    ("US", "United States (+1)"),
    ("GB", "United Kingdom (+44)"),
    ("DE", "Germany (+49)"),
];

const TEST_DATA_SOURCE: &str = "Test data";
const MIN_CONVERTIBLE_DIGITS: usize = 7;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ViewMode {
    #[default]
    Standard,
    /// Panel whose rows drive pairing in compare mode.
    CompareMain,
    CompareOpposite,
}

impl ViewMode {
    pub fn is_compare(self) -> bool {
        !matches!(self, ViewMode::Standard)
    }

    /// Mode the other panel takes when this panel enters `self`.
    pub fn counterpart(self) -> Self {
        match self {
            ViewMode::Standard => ViewMode::Standard,
            ViewMode::CompareMain => ViewMode::CompareOpposite,
            ViewMode::CompareOpposite => ViewMode::CompareMain,
        }
    }
}

/// One panel's contact list.
#[derive(Debug, Clone, Default)]
pub struct ContactModel {
    items: Vec<ContactItem>,
    view_mode: ViewMode,
    source: String,
    path: Option<PathBuf>,
    changed: bool,
    version: Option<VCardVersion>,
    visible_columns: Vec<ContactColumn>,
}

impl ContactModel {
    pub fn new(columns: &[ContactColumn]) -> Self {
        Self {
            visible_columns: columns.to_vec(),
            ..Self::default()
        }
    }

    pub fn items(&self) -> &[ContactItem] {
        &self.items
    }

    pub fn item(&self, row: usize) -> Option<&ContactItem> {
        self.items.get(row)
    }

    pub fn row_count(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn view_mode(&self) -> ViewMode {
        self.view_mode
    }

    /// Path or description of where the list came from; empty for a new list.
    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    /// Last path component of the source, as shown in panel headers.
    pub fn display_name(&self) -> &str {
        self.source
            .rsplit(std::path::MAIN_SEPARATOR)
            .next()
            .unwrap_or_default()
    }

    pub fn changed(&self) -> bool {
        self.changed
    }

    pub fn version(&self) -> Option<VCardVersion> {
        self.version
    }

    pub fn visible_columns(&self) -> &[ContactColumn] {
        &self.visible_columns
    }

    pub fn set_visible_columns(&mut self, columns: &[ContactColumn]) {
        self.visible_columns = columns.to_vec();
    }

    pub fn column_count(&self) -> usize {
        self.visible_columns.len()
    }

    pub fn cell(&self, row: usize, column: usize, date_format: &str) -> String {
        match (self.items.get(row), self.visible_columns.get(column)) {
            (Some(item), Some(col)) => item.cell(*col, date_format),
            _ => String::new(),
        }
    }

    // -------------------------------------------------------------------------
    // Files
    // -------------------------------------------------------------------------

    /// Replace the list with the contents of `path`. Returns load warnings.
    pub fn open(
        &mut self,
        path: &Path,
        registry: &FormatRegistry,
        settings: &Settings,
    ) -> Result<Vec<String>, FormatError> {
        let loaded = registry.open(path, settings)?;
        self.items = loaded.items;
        self.version = loaded.version;
        self.path = Some(path.to_path_buf());
        self.source = path.display().to_string();
        self.changed = false;
        Ok(loaded.warnings)
    }

    pub fn save_as(
        &mut self,
        path: &Path,
        registry: &FormatRegistry,
        settings: &Settings,
    ) -> Result<Vec<String>, FormatError> {
        let warnings = registry.save(path, &self.items, self.version, settings)?;
        self.path = Some(path.to_path_buf());
        self.source = path.display().to_string();
        self.changed = false;
        Ok(warnings)
    }

    pub fn close(&mut self) {
        self.items.clear();
        self.path = None;
        self.source.clear();
        self.changed = false;
        self.version = None;
    }

    /// Fill the list with sample records.
    pub fn test_list(&mut self) {
        let mut ivanov = ContactItem::with_names("Иван", "Иванов");
        ivanov.phones.push(Phone::new("+7 912 345-67-89", &["cell"]));
        ivanov.birthday = Some("1975-03-08".to_string());

        let mut petrov = ContactItem::with_names("Пётр Петров", "");
        petrov.phones.push(Phone::new("8 (343) 222-33-44, 8 (343) 222-33-45", &["home"]));

        let mut smith = ContactItem::with_names("John", "Smith");
        smith.full_name = "John Smith".to_string();
        smith.emails.push(Email::new("john.smith@example.com", &["internet"]));
        smith.organization = "Acme".to_string();

        let mut doe = ContactItem::with_names("Jane\\", "Doe\\");
        doe.phones.push(Phone::new("555-0100", &["work", "voice"]));
        doe.note = "Met at the conference".to_string();

        let mut smith_again = ContactItem::with_names("Smith", "John");
        smith_again.phones.push(Phone::new("+1 (555) 010-0200", &["cell"]));

        self.items = vec![ivanov, petrov, smith, doe, smith_again];
        self.path = None;
        self.source = TEST_DATA_SOURCE.to_string();
        self.changed = false;
        self.version = None;
    }

    // -------------------------------------------------------------------------
    // Rows
    // -------------------------------------------------------------------------

    pub fn add_row(&mut self, mut item: ContactItem) -> usize {
        item.clear_pair();
        self.items.push(item);
        self.changed = true;
        self.items.len() - 1
    }

    pub fn set_row(&mut self, row: usize, mut item: ContactItem) -> bool {
        let Some(slot) = self.items.get_mut(row) else {
            return false;
        };
        item.clear_pair();
        *slot = item;
        self.changed = true;
        true
    }

    /// Remove the given rows; out-of-range and repeated rows are ignored.
    pub fn remove_rows(&mut self, rows: &[usize]) -> usize {
        let mut rows: Vec<usize> = rows.iter().copied().filter(|r| *r < self.items.len()).collect();
        rows.sort_unstable();
        rows.dedup();
        for row in rows.iter().rev() {
            self.items.remove(*row);
        }
        if !rows.is_empty() {
            self.changed = true;
        }
        rows.len()
    }

    pub fn copy_rows(&self, rows: &[usize], target: &mut ContactModel) -> usize {
        let mut copied = 0;
        for row in rows {
            if let Some(item) = self.items.get(*row) {
                target.add_row(item.clone());
                copied += 1;
            }
        }
        copied
    }

    pub fn apply_multi_edit(&mut self, rows: &[usize], edit: &MultiEdit) -> usize {
        self.for_rows(rows, |item| edit.apply(item))
    }

    // -------------------------------------------------------------------------
    // Bulk record fixes. Each returns how many rows changed.
    // -------------------------------------------------------------------------

    pub fn swap_names(&mut self, rows: &[usize]) -> usize {
        self.for_rows(rows, |item| {
            item.swap_names();
            true
        })
    }

    pub fn split_names(&mut self, rows: &[usize]) -> usize {
        self.for_rows(rows, ContactItem::split_names)
    }

    pub fn drop_slashes(&mut self, rows: &[usize]) -> usize {
        self.for_rows(rows, ContactItem::drop_slashes)
    }

    pub fn split_numbers(&mut self, rows: &[usize]) -> usize {
        self.for_rows(rows, ContactItem::split_numbers)
    }

    pub fn generate_full_names(&mut self, rows: &[usize]) -> usize {
        self.for_rows(rows, ContactItem::generate_full_name)
    }

    pub fn drop_full_names(&mut self, rows: &[usize]) -> usize {
        self.for_rows(rows, ContactItem::drop_full_name)
    }

    /// Rewrite local numbers in international E.164 form using the region
    /// selected by `country_rule`.
    pub fn intl_phone_prefix(&mut self, rows: &[usize], country_rule: i64) -> usize {
        let region = usize::try_from(country_rule)
            .ok()
            .and_then(|i| COUNTRY_RULES.get(i))
            .unwrap_or(&COUNTRY_RULES[0])
            .0;
        debug!(region, "converting phone numbers to international form");
        self.for_rows(rows, |item| {
            let mut changed = false;
            for phone in &mut item.phones {
                if let Some(converted) = international_number(&phone.number, region) {
                    if converted != phone.number {
                        phone.number = converted;
                        changed = true;
                    }
                }
            }
            changed
        })
    }

    fn for_rows(&mut self, rows: &[usize], mut f: impl FnMut(&mut ContactItem) -> bool) -> usize {
        let mut count = 0;
        for row in rows {
            if let Some(item) = self.items.get_mut(*row) {
                if f(item) {
                    count += 1;
                }
            }
        }
        if count > 0 {
            self.changed = true;
        }
        count
    }

    // -------------------------------------------------------------------------
    // Compare mode
    // -------------------------------------------------------------------------

    /// Switch this panel to `mode`, the other panel to its counterpart, and
    /// recompute pairs.
    pub fn set_view_mode(&mut self, mode: ViewMode, opposite: &mut ContactModel) {
        self.view_mode = mode;
        opposite.view_mode = mode.counterpart();
        match mode {
            ViewMode::CompareOpposite => refresh_pairs(opposite, self),
            _ => refresh_pairs(self, opposite),
        }
    }

    fn clear_pairs(&mut self) {
        for item in &mut self.items {
            item.clear_pair();
        }
    }
}

/// Recompute pairs between `main` and `opposite`. For every main row in
/// order, the first unpaired similar opposite row becomes its pair.
pub fn refresh_pairs(main: &mut ContactModel, opposite: &mut ContactModel) {
    main.clear_pairs();
    opposite.clear_pairs();
    if !main.view_mode.is_compare() {
        return;
    }
    let mut pairs = 0usize;
    for i in 0..main.items.len() {
        let found = (0..opposite.items.len())
            .find(|&j| !opposite.items[j].pair_item() && main.items[i].similar_to(&opposite.items[j]));
        if let Some(j) = found {
            main.items[i].set_pair(j);
            opposite.items[j].set_pair(i);
            pairs += 1;
        }
    }
    info!(pairs, "compared contact lists");
}

fn international_number(number: &str, region: &str) -> Option<String> {
    let trimmed = number.trim();
    if trimmed.starts_with('+') || phone_digits(trimmed).len() < MIN_CONVERTIBLE_DIGITS {
        return None;
    }
    let parsed = PHONE_NUMBER_UTIL.parse(trimmed, region).ok()?;
    Some(
        PHONE_NUMBER_UTIL
            .format(&parsed, PhoneNumberFormat::E164)
            .into_owned(),
    )
}

// =============================================================================
// Multi-record editing
// =============================================================================

/// Fields that can be set on several records at once.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SharedField {
    LastName,
    Organization,
    Title,
    Url,
    Note,
    Birthday,
}

impl SharedField {
    pub const ALL: [SharedField; 6] = [
        SharedField::LastName,
        SharedField::Organization,
        SharedField::Title,
        SharedField::Url,
        SharedField::Note,
        SharedField::Birthday,
    ];

    pub fn label(self) -> &'static str {
        match self {
            SharedField::LastName => "Last name",
            SharedField::Organization => "Organization",
            SharedField::Title => "Title",
            SharedField::Url => "URL",
            SharedField::Note => "Note",
            SharedField::Birthday => "Birthday",
        }
    }

    pub fn get(self, item: &ContactItem) -> String {
        match self {
            SharedField::LastName => item.last_name.clone(),
            SharedField::Organization => item.organization.clone(),
            SharedField::Title => item.title.clone(),
            SharedField::Url => item.url.clone(),
            SharedField::Note => item.note.clone(),
            SharedField::Birthday => item.birthday.clone().unwrap_or_default(),
        }
    }

    pub fn set(self, item: &mut ContactItem, value: &str) {
        let value = value.to_string();
        match self {
            SharedField::LastName => item.last_name = value,
            SharedField::Organization => item.organization = value,
            SharedField::Title => item.title = value,
            SharedField::Url => item.url = value,
            SharedField::Note => item.note = value,
            SharedField::Birthday => item.birthday = (!value.is_empty()).then_some(value),
        }
    }

    /// The value all `items` share, or `None` when they differ.
    pub fn common_value(self, items: &[ContactItem]) -> Option<String> {
        let first = self.get(items.first()?);
        items.iter().all(|i| self.get(i) == first).then_some(first)
    }
}

/// Changes made in the multi-record editor. Only fields the user touched
/// are present.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct MultiEdit {
    changes: Vec<(SharedField, String)>,
}

impl MultiEdit {
    pub fn set(&mut self, field: SharedField, value: impl Into<String>) {
        let value = value.into();
        match self.changes.iter_mut().find(|(f, _)| *f == field) {
            Some(entry) => entry.1 = value,
            None => self.changes.push((field, value)),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.changes.is_empty()
    }

    pub fn changes(&self) -> &[(SharedField, String)] {
        &self.changes
    }

    pub fn apply(&self, item: &mut ContactItem) -> bool {
        let mut changed = false;
        for (field, value) in &self.changes {
            if field.get(item) != *value {
                field.set(item, value);
                changed = true;
            }
        }
        changed
    }
}
