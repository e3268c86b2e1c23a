use crossterm::event::{Event, KeyEvent};
use tui_input::backend::crossterm::EventHandler;
use tui_input::Input;

use crate::contact::{ContactItem, Email, Phone};
use crate::model::{MultiEdit, SharedField};

const LIST_SEPARATOR: &str = "; ";
const ADDRESS_SEPARATOR: &str = " | ";

/// Single-line text box backed by `tui_input`.
#[derive(Debug, Default, Clone)]
pub struct LineEditor {
    input: Input,
}

impl LineEditor {
    pub fn new(current: &str) -> Self {
        Self {
            input: Input::new(current.to_string()),
        }
    }

    pub fn value(&self) -> &str {
        self.input.value()
    }

    pub fn set_value(&mut self, value: &str) {
        self.input = Input::new(value.to_string());
    }

    pub fn visual_cursor(&self) -> usize {
        self.input.visual_cursor()
    }

    /// Feed a key to the input. Returns true when the value or cursor changed.
    pub fn handle_key_event(&mut self, key: KeyEvent) -> bool {
        self.input.handle_event(&Event::Key(key)).is_some()
    }
}

// =============================================================================
// Record fields as editable text
// =============================================================================

/// Fields of a record as shown in the editors. Phones and emails are a
/// `; `-separated list of `value (type,type)` entries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContactField {
    LastName,
    FirstName,
    MiddleName,
    Prefix,
    Suffix,
    FullName,
    Nickname,
    Phones,
    Emails,
    Birthday,
    Organization,
    Title,
    Addresses,
    Url,
    Note,
}

impl ContactField {
    pub const ALL: [ContactField; 15] = [
        ContactField::LastName,
        ContactField::FirstName,
        ContactField::MiddleName,
        ContactField::Prefix,
        ContactField::Suffix,
        ContactField::FullName,
        ContactField::Nickname,
        ContactField::Phones,
        ContactField::Emails,
        ContactField::Birthday,
        ContactField::Organization,
        ContactField::Title,
        ContactField::Addresses,
        ContactField::Url,
        ContactField::Note,
    ];

    pub fn label(self) -> &'static str {
        match self {
            ContactField::LastName => "Last name",
            ContactField::FirstName => "First name",
            ContactField::MiddleName => "Middle name",
            ContactField::Prefix => "Prefix",
            ContactField::Suffix => "Suffix",
            ContactField::FullName => "Full name",
            ContactField::Nickname => "Nickname",
            ContactField::Phones => "Phones",
            ContactField::Emails => "Emails",
            ContactField::Birthday => "Birthday",
            ContactField::Organization => "Organization",
            ContactField::Title => "Title",
            ContactField::Addresses => "Addresses",
            ContactField::Url => "URL",
            ContactField::Note => "Note",
        }
    }

    pub fn get(self, item: &ContactItem) -> String {
        match self {
            ContactField::LastName => item.last_name.clone(),
            ContactField::FirstName => item.first_name.clone(),
            ContactField::MiddleName => item.middle_name.clone(),
            ContactField::Prefix => item.prefix.clone(),
            ContactField::Suffix => item.suffix.clone(),
            ContactField::FullName => item.full_name.clone(),
            ContactField::Nickname => item.nickname.clone(),
            ContactField::Phones => item
                .phones
                .iter()
                .map(|p| typed_entry(&p.number, &p.types))
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
            ContactField::Emails => item
                .emails
                .iter()
                .map(|e| typed_entry(&e.address, &e.types))
                .collect::<Vec<_>>()
                .join(LIST_SEPARATOR),
            ContactField::Birthday => item.birthday.clone().unwrap_or_default(),
            ContactField::Organization => item.organization.clone(),
            ContactField::Title => item.title.clone(),
            ContactField::Addresses => item.addresses.join(ADDRESS_SEPARATOR),
            ContactField::Url => item.url.clone(),
            ContactField::Note => item.note.clone(),
        }
    }

    pub fn set(self, item: &mut ContactItem, text: &str) {
        let value = text.trim().to_string();
        match self {
            ContactField::LastName => item.last_name = value,
            ContactField::FirstName => item.first_name = value,
            ContactField::MiddleName => item.middle_name = value,
            ContactField::Prefix => item.prefix = value,
            ContactField::Suffix => item.suffix = value,
            ContactField::FullName => item.full_name = value,
            ContactField::Nickname => item.nickname = value,
            ContactField::Phones => {
                item.phones = parse_typed_list(&value)
                    .into_iter()
                    .map(|(number, types)| Phone { number, types })
                    .collect();
            }
            ContactField::Emails => {
                item.emails = parse_typed_list(&value)
                    .into_iter()
                    .map(|(address, types)| Email { address, types })
                    .collect();
            }
            ContactField::Birthday => item.birthday = (!value.is_empty()).then_some(value),
            ContactField::Organization => item.organization = value,
            ContactField::Title => item.title = value,
            ContactField::Addresses => {
                item.addresses = value
                    .split(ADDRESS_SEPARATOR.trim())
                    .map(str::trim)
                    .filter(|a| !a.is_empty())
                    .map(str::to_string)
                    .collect();
            }
            ContactField::Url => item.url = value,
            ContactField::Note => item.note = value,
        }
    }
}

fn typed_entry(value: &str, types: &[String]) -> String {
    if types.is_empty() {
        value.to_string()
    } else {
        format!("{} ({})", value, types.join(","))
    }
}

/// `"555 (cell,voice); 777"` -> `[("555", [cell, voice]), ("777", [])]`
fn parse_typed_list(text: &str) -> Vec<(String, Vec<String>)> {
    text.split(';')
        .map(str::trim)
        .filter(|entry| !entry.is_empty())
        .map(|entry| match entry.strip_suffix(')').and_then(|e| e.rsplit_once('(')) {
            Some((value, types)) => (
                value.trim().to_string(),
                types
                    .split(',')
                    .map(str::trim)
                    .filter(|t| !t.is_empty())
                    .map(str::to_ascii_lowercase)
                    .collect(),
            ),
            None => (entry.to_string(), Vec::new()),
        })
        .collect()
}

// =============================================================================
// Forms
// =============================================================================

/// Editor for one record.
#[derive(Debug, Clone)]
pub struct ContactForm {
    original: ContactItem,
    inputs: Vec<LineEditor>,
    pub selected: usize,
}

impl ContactForm {
    pub fn new(item: &ContactItem) -> Self {
        Self {
            original: item.clone(),
            inputs: ContactField::ALL
                .iter()
                .map(|field| LineEditor::new(&field.get(item)))
                .collect(),
            selected: 0,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = (ContactField, &LineEditor)> {
        ContactField::ALL.iter().copied().zip(self.inputs.iter())
    }

    pub fn current_mut(&mut self) -> Option<&mut LineEditor> {
        self.inputs.get_mut(self.selected)
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % self.inputs.len();
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + self.inputs.len() - 1) % self.inputs.len();
    }

    /// The edited record; fields without an editor row are kept.
    pub fn to_item(&self) -> ContactItem {
        let mut item = self.original.clone();
        for (field, input) in self.rows() {
            field.set(&mut item, input.value());
        }
        item
    }
}

/// Editor for the fields several records share.
#[derive(Debug, Clone)]
pub struct MultiForm {
    initial: Vec<String>,
    inputs: Vec<LineEditor>,
    pub selected: usize,
}

impl MultiForm {
    /// Fields with different values across `items` start empty.
    pub fn new(items: &[ContactItem]) -> Self {
        let initial: Vec<String> = SharedField::ALL
            .iter()
            .map(|field| field.common_value(items).unwrap_or_default())
            .collect();
        Self {
            inputs: initial.iter().map(|v| LineEditor::new(v)).collect(),
            initial,
            selected: 0,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = (SharedField, &LineEditor)> {
        SharedField::ALL.iter().copied().zip(self.inputs.iter())
    }

    pub fn current_mut(&mut self) -> Option<&mut LineEditor> {
        self.inputs.get_mut(self.selected)
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % self.inputs.len();
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + self.inputs.len() - 1) % self.inputs.len();
    }

    /// Only fields the user touched.
    pub fn to_edit(&self) -> MultiEdit {
        let mut edit = MultiEdit::default();
        for ((field, input), initial) in self.rows().zip(&self.initial) {
            if input.value() != initial {
                edit.set(field, input.value());
            }
        }
        edit
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PairColumn {
    First,
    Second,
}

/// Two records side by side; any field can be copied across.
#[derive(Debug, Clone)]
pub struct PairForm {
    first: ContactForm,
    second: ContactForm,
    pub column: PairColumn,
    pub selected: usize,
}

impl PairForm {
    pub fn new(first: &ContactItem, second: &ContactItem) -> Self {
        Self {
            first: ContactForm::new(first),
            second: ContactForm::new(second),
            column: PairColumn::First,
            selected: 0,
        }
    }

    pub fn rows(&self) -> impl Iterator<Item = (ContactField, &LineEditor, &LineEditor)> {
        self.first
            .rows()
            .zip(self.second.inputs.iter())
            .map(|((field, a), b)| (field, a, b))
    }

    pub fn current_mut(&mut self) -> Option<&mut LineEditor> {
        let form = match self.column {
            PairColumn::First => &mut self.first,
            PairColumn::Second => &mut self.second,
        };
        form.inputs.get_mut(self.selected)
    }

    pub fn select_next(&mut self) {
        self.selected = (self.selected + 1) % ContactField::ALL.len();
    }

    pub fn select_prev(&mut self) {
        self.selected = (self.selected + ContactField::ALL.len() - 1) % ContactField::ALL.len();
    }

    pub fn switch_column(&mut self) {
        self.column = match self.column {
            PairColumn::First => PairColumn::Second,
            PairColumn::Second => PairColumn::First,
        };
    }

    /// Copy the selected field from `from` into the other record.
    pub fn copy_field(&mut self, from: PairColumn) {
        let (source, target) = match from {
            PairColumn::First => (&self.first, &mut self.second),
            PairColumn::Second => (&self.second, &mut self.first),
        };
        if let (Some(value), Some(input)) = (
            source.inputs.get(self.selected).map(|i| i.value().to_string()),
            target.inputs.get_mut(self.selected),
        ) {
            input.set_value(&value);
        }
    }

    pub fn to_items(&self) -> (ContactItem, ContactItem) {
        (self.first.to_item(), self.second.to_item())
    }
}
