use std::fmt;

use deunicode::deunicode;
use strsim::jaro_winkler;

use crate::dates;

/// Phone types understood by vCard 2.1/3.0 readers without an `X-` prefix.
pub const STANDARD_PHONE_TYPES: &[&str] = &[
    "home", "work", "cell", "voice", "fax", "pager", "msg", "pref", "video", "bbs", "modem",
    "car", "isdn", "pcs", "text", "textphone", "main", "other",
];

pub const STANDARD_EMAIL_TYPES: &[&str] = &["internet", "home", "work", "pref", "x400"];

/// Minimum Jaro-Winkler score for two display names to count as the same person.
const NAME_SIMILARITY_THRESHOLD: f64 = 0.92;

/// Phone numbers are compared on their trailing digits so that trunk and
/// international prefixes (`8 912...` vs `+7 912...`) do not break a match.
const PHONE_MATCH_DIGITS: usize = 10;
const PHONE_MIN_DIGITS: usize = 7;

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Phone {
    pub number: String,
    pub types: Vec<String>,
}

impl Phone {
    pub fn new(number: impl Into<String>, types: &[&str]) -> Self {
        Self {
            number: number.into(),
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn has_standard_types(&self) -> bool {
        self.types.iter().all(|t| is_standard_type(t, STANDARD_PHONE_TYPES))
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Email {
    pub address: String,
    pub types: Vec<String>,
}

impl Email {
    pub fn new(address: impl Into<String>, types: &[&str]) -> Self {
        Self {
            address: address.into(),
            types: types.iter().map(|t| t.to_string()).collect(),
        }
    }

    pub fn has_standard_types(&self) -> bool {
        self.types.iter().all(|t| is_standard_type(t, STANDARD_EMAIL_TYPES))
    }
}

pub fn is_standard_type(value: &str, standard: &[&str]) -> bool {
    standard.iter().any(|s| s.eq_ignore_ascii_case(value))
}

/// One address-book record.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContactItem {
    pub last_name: String,
    pub first_name: String,
    pub middle_name: String,
    pub prefix: String,
    pub suffix: String,
    pub full_name: String,
    pub nickname: String,
    pub phones: Vec<Phone>,
    pub emails: Vec<Email>,
    /// ISO-8601 date, optionally followed by a time (`1980-05-12T10:00:00`).
    pub birthday: Option<String>,
    pub organization: String,
    pub title: String,
    /// Raw `ADR` values, components separated by `;`.
    pub addresses: Vec<String>,
    pub url: String,
    pub note: String,
    /// Source lines this program does not model, written back untouched.
    pub unknown_tags: Vec<String>,
    pair: Option<usize>,
}

impl ContactItem {
    pub fn with_names(first: &str, last: &str) -> Self {
        Self {
            first_name: first.to_string(),
            last_name: last.to_string(),
            ..Self::default()
        }
    }

    /// Whether this record has a matching record in the opposite panel.
    pub fn pair_item(&self) -> bool {
        self.pair.is_some()
    }

    /// Row of the matching record in the opposite panel.
    pub fn pair_index(&self) -> Option<usize> {
        self.pair
    }

    pub(crate) fn set_pair(&mut self, index: usize) {
        self.pair = Some(index);
    }

    pub(crate) fn clear_pair(&mut self) {
        self.pair = None;
    }

    pub fn is_empty(&self) -> bool {
        self.visible_name().is_empty()
            && self.phones.is_empty()
            && self.emails.is_empty()
            && self.organization.is_empty()
    }

    /// Full name built from the structured name parts.
    pub fn formatted_name(&self) -> String {
        [
            &self.prefix,
            &self.first_name,
            &self.middle_name,
            &self.last_name,
            &self.suffix,
        ]
        .iter()
        .map(|part| part.trim())
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ")
    }

    /// Name shown for the record: explicit full name, then name parts, then nickname.
    pub fn visible_name(&self) -> String {
        let full = self.full_name.trim();
        if !full.is_empty() {
            return full.to_string();
        }
        let formatted = self.formatted_name();
        if !formatted.is_empty() {
            return formatted;
        }
        if !self.organization.trim().is_empty() {
            return self.organization.trim().to_string();
        }
        self.nickname.trim().to_string()
    }

    pub fn swap_names(&mut self) {
        std::mem::swap(&mut self.first_name, &mut self.last_name);
    }

    /// Split a name stored in one field ("John Smith" as first name) into
    /// first, middle and last name. Returns whether anything changed.
    pub fn split_names(&mut self) -> bool {
        let source = if !self.first_name.trim().is_empty() && self.last_name.trim().is_empty() {
            self.first_name.clone()
        } else if !self.last_name.trim().is_empty() && self.first_name.trim().is_empty() {
            self.last_name.clone()
        } else if self.first_name.trim().is_empty() && self.last_name.trim().is_empty() {
            self.full_name.clone()
        } else {
            return false;
        };

        let words: Vec<&str> = source.split_whitespace().collect();
        match words.as_slice() {
            [] | [_] => false,
            [first, last] => {
                self.first_name = first.to_string();
                self.last_name = last.to_string();
                true
            }
            [first, middle @ .., last] => {
                self.first_name = first.to_string();
                self.middle_name = middle.join(" ");
                self.last_name = last.to_string();
                true
            }
        }
    }

    /// Remove stray backslashes left by badly escaped exports (`Smith\, John`).
    pub fn drop_slashes(&mut self) -> bool {
        let mut changed = false;
        for field in [
            &mut self.last_name,
            &mut self.first_name,
            &mut self.middle_name,
            &mut self.prefix,
            &mut self.suffix,
            &mut self.full_name,
            &mut self.nickname,
            &mut self.organization,
            &mut self.title,
        ] {
            if field.contains('\\') {
                *field = field.replace('\\', "");
                changed = true;
            }
        }
        changed
    }

    /// Split phone values holding several numbers (`"123, 456"`) into
    /// separate phones sharing the original types.
    pub fn split_numbers(&mut self) -> bool {
        let mut changed = false;
        let mut phones = Vec::with_capacity(self.phones.len());
        for phone in self.phones.drain(..) {
            let parts: Vec<&str> = phone
                .number
                .split([',', ';'])
                .map(str::trim)
                .filter(|p| !p.is_empty())
                .collect();
            if parts.len() > 1 {
                changed = true;
                for part in parts {
                    phones.push(Phone {
                        number: part.to_string(),
                        types: phone.types.clone(),
                    });
                }
            } else {
                phones.push(phone);
            }
        }
        self.phones = phones;
        changed
    }

    pub fn generate_full_name(&mut self) -> bool {
        let formatted = self.formatted_name();
        if formatted.is_empty() || formatted == self.full_name {
            return false;
        }
        self.full_name = formatted;
        true
    }

    pub fn drop_full_name(&mut self) -> bool {
        if self.full_name.is_empty() {
            return false;
        }
        self.full_name.clear();
        true
    }

    /// Two records describe the same person when they share a phone number,
    /// an email address, or a near-identical name.
    pub fn similar_to(&self, other: &ContactItem) -> bool {
        let shares_phone = self.phones.iter().any(|a| {
            other
                .phones
                .iter()
                .any(|b| phones_match(&a.number, &b.number))
        });
        if shares_phone {
            return true;
        }

        let shares_email = self.emails.iter().any(|a| {
            other
                .emails
                .iter()
                .any(|b| !a.address.trim().is_empty() && a.address.trim().eq_ignore_ascii_case(b.address.trim()))
        });
        if shares_email {
            return true;
        }

        let a = normalize_name(&self.visible_name());
        let b = normalize_name(&other.visible_name());
        !a.is_empty() && !b.is_empty() && jaro_winkler(&a, &b) >= NAME_SIMILARITY_THRESHOLD
    }

    /// Text shown in a table cell for the given column.
    pub fn cell(&self, column: ContactColumn, date_format: &str) -> String {
        match column {
            ContactColumn::LastName => self.last_name.clone(),
            ContactColumn::FirstName => self.first_name.clone(),
            ContactColumn::MiddleName => self.middle_name.clone(),
            ContactColumn::FullName => self.full_name.clone(),
            ContactColumn::VisibleName => self.visible_name(),
            ContactColumn::Nickname => self.nickname.clone(),
            ContactColumn::Phone => self.phones.first().map(|p| p.number.clone()).unwrap_or_default(),
            ContactColumn::Email => self.emails.first().map(|e| e.address.clone()).unwrap_or_default(),
            ContactColumn::Birthday => self
                .birthday
                .as_deref()
                .map(|raw| dates::format_date(raw, date_format))
                .unwrap_or_default(),
            ContactColumn::Organization => self.organization.clone(),
            ContactColumn::Title => self.title.clone(),
            ContactColumn::Address => self
                .addresses
                .first()
                .map(|adr| {
                    adr.split(';')
                        .map(str::trim)
                        .filter(|p| !p.is_empty())
                        .collect::<Vec<_>>()
                        .join(", ")
                })
                .unwrap_or_default(),
            ContactColumn::Note => self.note.lines().next().unwrap_or_default().to_string(),
        }
    }
}

pub fn phone_digits(number: &str) -> String {
    number.chars().filter(|c| c.is_ascii_digit()).collect()
}

fn phones_match(a: &str, b: &str) -> bool {
    let a = phone_digits(a);
    let b = phone_digits(b);
    if a.len() < PHONE_MIN_DIGITS || b.len() < PHONE_MIN_DIGITS {
        return false;
    }
    let tail = |s: &str| -> String {
        let skip = s.len().saturating_sub(PHONE_MATCH_DIGITS);
        s[skip..].to_string()
    };
    tail(&a) == tail(&b)
}

/// Lowercase ASCII form of a name with words sorted, so "Иванов Иван"
/// and "Ivan Ivanov" compare equal.
pub fn normalize_name(name: &str) -> String {
    let ascii = deunicode(name).to_lowercase();
    let mut words: Vec<&str> = ascii
        .split(|c: char| !c.is_alphanumeric())
        .filter(|w| !w.is_empty())
        .collect();
    words.sort_unstable();
    words.join(" ")
}

/// Columns a panel can display.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ContactColumn {
    LastName,
    FirstName,
    MiddleName,
    FullName,
    VisibleName,
    Nickname,
    Phone,
    Email,
    Birthday,
    Organization,
    Title,
    Address,
    Note,
}

impl ContactColumn {
    pub const ALL: [ContactColumn; 13] = [
        ContactColumn::LastName,
        ContactColumn::FirstName,
        ContactColumn::MiddleName,
        ContactColumn::FullName,
        ContactColumn::VisibleName,
        ContactColumn::Nickname,
        ContactColumn::Phone,
        ContactColumn::Email,
        ContactColumn::Birthday,
        ContactColumn::Organization,
        ContactColumn::Title,
        ContactColumn::Address,
        ContactColumn::Note,
    ];

    pub const DEFAULT: [ContactColumn; 3] = [
        ContactColumn::LastName,
        ContactColumn::FirstName,
        ContactColumn::Phone,
    ];

    /// Header text, also the name stored in the settings file.
    pub fn header(self) -> &'static str {
        match self {
            ContactColumn::LastName => "Last name",
            ContactColumn::FirstName => "First name",
            ContactColumn::MiddleName => "Middle name",
            ContactColumn::FullName => "Full name",
            ContactColumn::VisibleName => "Visible name",
            ContactColumn::Nickname => "Nickname",
            ContactColumn::Phone => "Phone",
            ContactColumn::Email => "Email",
            ContactColumn::Birthday => "Birthday",
            ContactColumn::Organization => "Organization",
            ContactColumn::Title => "Title",
            ContactColumn::Address => "Address",
            ContactColumn::Note => "Note",
        }
    }

    pub fn from_header(name: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|c| c.header() == name)
    }
}

impl fmt::Display for ContactColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.header())
    }
}
