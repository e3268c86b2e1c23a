//! Generic CSV profile: one header row, one record per line, numbered
//! `Phone N` / `Email N` columns with matching `… type` columns.

use std::collections::HashMap;

use csv::{ReaderBuilder, WriterBuilder};
use tracing::debug;

use super::{FormatError, Loaded};
use crate::config::CsvConfig;
use crate::contact::{ContactItem, Email, Phone};
use crate::languages::LanguageCatalog;

const UTF8_BOM: &[u8] = b"\xEF\xBB\xBF";

const TEXT_COLUMNS: &[&str] = &[
    "Last name",
    "First name",
    "Middle name",
    "Prefix",
    "Suffix",
    "Full name",
    "Nickname",
    "Birthday",
    "Organization",
    "Title",
    "Address",
    "URL",
    "Note",
];

fn check_encoding(config: &CsvConfig) -> Result<(), FormatError> {
    let encoding = config.encoding.trim();
    if encoding.is_empty()
        || LanguageCatalog::available_codecs()
            .iter()
            .any(|codec| codec.eq_ignore_ascii_case(encoding))
    {
        Ok(())
    } else {
        Err(FormatError::UnsupportedEncoding(config.encoding.clone()))
    }
}

fn separator_byte(separator: &str) -> u8 {
    match separator {
        "\\t" | "\t" | "Tab" | "tab" => b'\t',
        s if s.len() == 1 => s.as_bytes()[0],
        _ => b',',
    }
}

fn split_types(raw: &str) -> Vec<String> {
    raw.split([',', ' '])
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .map(str::to_ascii_lowercase)
        .collect()
}

fn set_text(item: &mut ContactItem, column: &str, value: &str) -> bool {
    let value = value.to_string();
    match column {
        "Last name" => item.last_name = value,
        "First name" => item.first_name = value,
        "Middle name" => item.middle_name = value,
        "Prefix" => item.prefix = value,
        "Suffix" => item.suffix = value,
        "Full name" => item.full_name = value,
        "Nickname" => item.nickname = value,
        "Birthday" => item.birthday = (!value.is_empty()).then_some(value),
        "Organization" => item.organization = value,
        "Title" => item.title = value,
        "Address" => {
            if !value.is_empty() {
                item.addresses.push(value);
            }
        }
        "URL" => item.url = value,
        "Note" => item.note = value,
        _ => return false,
    }
    true
}

/// `Phone 2 type` -> (`Phone`, 2, true)
fn numbered_column(header: &str) -> Option<(&str, usize, bool)> {
    let (kind, rest) = header.split_once(' ')?;
    if kind != "Phone" && kind != "Email" {
        return None;
    }
    let (number, is_type) = match rest.strip_suffix(" type") {
        Some(number) => (number, true),
        None => (rest, false),
    };
    let number: usize = number.trim().parse().ok()?;
    (number > 0).then_some((kind, number, is_type))
}

pub fn read(raw: &[u8], config: &CsvConfig) -> Result<Loaded, FormatError> {
    check_encoding(config)?;
    let body = raw.strip_prefix(UTF8_BOM).unwrap_or(raw);
    let mut reader = ReaderBuilder::new()
        .delimiter(separator_byte(&config.separator))
        .flexible(true)
        .from_reader(body);

    let headers: Vec<String> = reader.headers()?.iter().map(|h| h.trim().to_string()).collect();
    let mut loaded = Loaded::default();
    for header in &headers {
        if !TEXT_COLUMNS.contains(&header.as_str()) && numbered_column(header).is_none() {
            loaded.warnings.push(format!("Unknown CSV column '{}'", header));
        }
    }

    for record in reader.records() {
        let record = record?;
        let mut item = ContactItem::default();
        let mut phones: HashMap<usize, Phone> = HashMap::new();
        let mut emails: HashMap<usize, Email> = HashMap::new();

        for (header, value) in headers.iter().zip(record.iter()) {
            if set_text(&mut item, header, value) {
                continue;
            }
            match numbered_column(header) {
                Some(("Phone", n, false)) => phones.entry(n).or_default().number = value.to_string(),
                Some(("Phone", n, true)) => phones.entry(n).or_default().types = split_types(value),
                Some((_, n, false)) => emails.entry(n).or_default().address = value.to_string(),
                Some((_, n, true)) => emails.entry(n).or_default().types = split_types(value),
                None => {}
            }
        }

        let mut phones: Vec<(usize, Phone)> = phones.into_iter().collect();
        phones.sort_by_key(|(n, _)| *n);
        item.phones = phones
            .into_iter()
            .map(|(_, p)| p)
            .filter(|p| !p.number.trim().is_empty())
            .collect();

        let mut emails: Vec<(usize, Email)> = emails.into_iter().collect();
        emails.sort_by_key(|(n, _)| *n);
        item.emails = emails
            .into_iter()
            .map(|(_, e)| e)
            .filter(|e| !e.address.trim().is_empty())
            .collect();

        loaded.items.push(item);
    }
    debug!(records = loaded.items.len(), "parsed CSV");
    Ok(loaded)
}

pub fn write(items: &[ContactItem], config: &CsvConfig) -> Result<Vec<u8>, FormatError> {
    check_encoding(config)?;
    let max_phones = items.iter().map(|i| i.phones.len()).max().unwrap_or(0);
    let max_emails = items.iter().map(|i| i.emails.len()).max().unwrap_or(0);

    let mut headers: Vec<String> = TEXT_COLUMNS.iter().map(|c| c.to_string()).collect();
    for n in 1..=max_phones {
        headers.push(format!("Phone {n}"));
        headers.push(format!("Phone {n} type"));
    }
    for n in 1..=max_emails {
        headers.push(format!("Email {n}"));
        headers.push(format!("Email {n} type"));
    }

    let mut w = WriterBuilder::new()
        .delimiter(separator_byte(&config.separator))
        .from_writer(Vec::new());
    w.write_record(&headers)?;

    for item in items {
        let mut record: Vec<String> = vec![
            item.last_name.clone(),
            item.first_name.clone(),
            item.middle_name.clone(),
            item.prefix.clone(),
            item.suffix.clone(),
            item.full_name.clone(),
            item.nickname.clone(),
            item.birthday.clone().unwrap_or_default(),
            item.organization.clone(),
            item.title.clone(),
            item.addresses.first().cloned().unwrap_or_default(),
            item.url.clone(),
            item.note.clone(),
        ];
        for n in 0..max_phones {
            let phone = item.phones.get(n);
            record.push(phone.map(|p| p.number.clone()).unwrap_or_default());
            record.push(phone.map(|p| p.types.join(",")).unwrap_or_default());
        }
        for n in 0..max_emails {
            let email = item.emails.get(n);
            record.push(email.map(|e| e.address.clone()).unwrap_or_default());
            record.push(email.map(|e| e.types.join(",")).unwrap_or_default());
        }
        w.write_record(&record)?;
    }
    w.flush().map_err(csv::Error::from)?;
    w.into_inner()
        .map_err(|err| FormatError::Csv(csv::Error::from(err.into_error())))
}
