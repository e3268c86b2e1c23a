//! vCard reader (2.1, 3.0 and 4.0) and writer (2.1 and 3.0).
//!
//! 2.1 and 3.0 cards go through a line-level reader that understands
//! folding, quoted-printable values, bare 2.1 type parameters and 3.0
//! `TYPE=` lists. 4.0 cards are handed to `vcard4`.

use vcard4::parameter::{Parameters, TypeParameter};
use vcard4::property::{TextOrUriProperty, TextProperty};
use vcard4::Vcard;

use super::{FormatError, Loaded, VCardVersion};
use crate::config::Settings;
use crate::contact::{
    is_standard_type, ContactItem, Email, Phone, STANDARD_EMAIL_TYPES, STANDARD_PHONE_TYPES,
};
use crate::dates;

const BEGIN_VCARD: &str = "BEGIN:VCARD";
const END_VCARD: &str = "END:VCARD";
const LINE_END: &str = "\r\n";

// =============================================================================
// Reading
// =============================================================================

pub fn read(text: &str, settings: &Settings) -> Result<Loaded, FormatError> {
    let mut loaded = Loaded::default();
    for (index, lines) in split_cards(text).iter().enumerate() {
        let unfolded = unfold_lines(lines);
        let version = card_version(&unfolded);
        loaded.version.get_or_insert(version);

        let mut item = match version {
            VCardVersion::V40 => from_vcard4(lines, index)?,
            _ => read_card(&unfolded, index, &mut loaded.warnings),
        };
        check_types(&mut item, index, settings, &mut loaded.warnings);
        loaded.items.push(item);
    }
    Ok(loaded)
}

/// Group lines into cards. Text outside `BEGIN`/`END` is ignored and a card
/// cut off by the end of input is kept.
fn split_cards(content: &str) -> Vec<Vec<String>> {
    let mut cards = Vec::new();
    let mut current: Option<Vec<String>> = None;
    for line in content.lines().map(|l| l.trim_end_matches('\r')) {
        if line.eq_ignore_ascii_case(BEGIN_VCARD) {
            cards.extend(current.replace(Vec::new()));
        }
        let Some(card) = current.as_mut() else {
            continue;
        };
        card.push(line.to_string());
        if line.eq_ignore_ascii_case(END_VCARD) {
            cards.extend(current.take());
        }
    }
    cards.extend(current);
    cards
}

/// Join whitespace continuations and quoted-printable soft breaks.
fn unfold_lines(lines: &[String]) -> Vec<String> {
    let mut unfolded: Vec<String> = Vec::with_capacity(lines.len());
    for line in lines {
        let continuation = line.starts_with([' ', '\t']);
        match unfolded.last_mut() {
            Some(last) if continuation || ends_with_soft_break(last.as_str()) => {
                if ends_with_soft_break(last.as_str()) {
                    last.pop();
                }
                if continuation {
                    last.push_str(line.trim_start_matches([' ', '\t']));
                } else {
                    last.push_str(line);
                }
            }
            _ => unfolded.push(line.clone()),
        }
    }
    unfolded
}

fn ends_with_soft_break(line: &str) -> bool {
    line.ends_with('=')
        && line
            .split_once(':')
            .is_some_and(|(lhs, _)| parse_parameters(lhs.split(';').skip(1)).quoted_printable)
}

fn card_version(lines: &[String]) -> VCardVersion {
    lines
        .iter()
        .filter_map(|line| line.split_once(':'))
        .find(|(name, _)| name.trim().eq_ignore_ascii_case("VERSION"))
        .and_then(|(_, value)| VCardVersion::parse(value))
        .unwrap_or(VCardVersion::V21)
}

#[derive(Debug, Default)]
struct LineParams {
    types: Vec<String>,
    quoted_printable: bool,
}

fn parse_parameters<'a>(raw_params: impl Iterator<Item = &'a str>) -> LineParams {
    let mut parsed = LineParams::default();
    for param in raw_params {
        let trimmed = param.trim();
        if trimmed.is_empty() {
            continue;
        }
        match trimmed.split_once('=') {
            Some((name, value)) => handle_named_parameter(name, value, &mut parsed),
            None => handle_positional_parameter(trimmed, &mut parsed),
        }
    }
    parsed
}

fn handle_named_parameter(name: &str, value: &str, parsed: &mut LineParams) {
    match name.trim().to_ascii_uppercase().as_str() {
        "ENCODING" => {
            if value.trim().eq_ignore_ascii_case("QUOTED-PRINTABLE") {
                parsed.quoted_printable = true;
            }
        }
        "TYPE" => {
            for part in clean_quotes(value).split(',') {
                let item = part.trim();
                if !item.is_empty() {
                    parsed.types.push(item.to_ascii_lowercase());
                }
            }
        }
        // CHARSET is always UTF-8 here; anything else is ignored
        _ => {}
    }
}

fn handle_positional_parameter(param: &str, parsed: &mut LineParams) {
    if param.eq_ignore_ascii_case("QUOTED-PRINTABLE") {
        parsed.quoted_printable = true;
    } else if !param.eq_ignore_ascii_case("BASE64") && !param.eq_ignore_ascii_case("8BIT") {
        parsed.types.push(param.to_ascii_lowercase());
    }
}

fn split_group(property: &str) -> (Option<&str>, &str) {
    match property.find('.') {
        Some(pos) => (Some(&property[..pos]), &property[pos + 1..]),
        None => (None, property),
    }
}

fn clean_quotes(value: &str) -> &str {
    let trimmed = value.trim();
    if trimmed.len() >= 2 && trimmed.starts_with('"') && trimmed.ends_with('"') {
        &trimmed[1..trimmed.len() - 1]
    } else {
        trimmed
    }
}

fn read_card(lines: &[String], index: usize, warnings: &mut Vec<String>) -> ContactItem {
    let mut item = ContactItem::default();
    for line in lines {
        if line.eq_ignore_ascii_case(BEGIN_VCARD) || line.eq_ignore_ascii_case(END_VCARD) || line.is_empty() {
            continue;
        }
        let Some((lhs, raw_value)) = line.split_once(':') else {
            warnings.push(format!("Record {}: malformed line '{}'", index + 1, line));
            continue;
        };
        let mut parts = lhs.split(';');
        let (_, name) = split_group(parts.next().unwrap_or_default());
        let params = parse_parameters(parts);

        let value = if params.quoted_printable {
            match decode_quoted_printable(raw_value) {
                Ok(decoded) => decoded.replace("\r\n", "\n").replace('\r', "\n"),
                Err(err) => {
                    warnings.push(format!("Record {}: {}", index + 1, err));
                    raw_value.to_string()
                }
            }
        } else {
            raw_value.to_string()
        };

        match name.trim().to_ascii_uppercase().as_str() {
            "VERSION" => {}
            "FN" => item.full_name = unescape(&value),
            "N" => {
                let mut components = split_structured(&value).into_iter();
                item.last_name = components.next().unwrap_or_default();
                item.first_name = components.next().unwrap_or_default();
                item.middle_name = components.next().unwrap_or_default();
                item.prefix = components.next().unwrap_or_default();
                item.suffix = components.next().unwrap_or_default();
            }
            "NICKNAME" => item.nickname = unescape(&value),
            "TEL" => item.phones.push(Phone {
                number: unescape(value.trim()),
                types: params.types,
            }),
            "EMAIL" => item.emails.push(Email {
                address: unescape(value.trim()),
                types: params.types,
            }),
            "BDAY" => item.birthday = Some(value.trim().to_string()),
            "ORG" => item.organization = join_components(&split_structured(&value)),
            "TITLE" => item.title = unescape(&value),
            "ADR" => item.addresses.push(join_components(&split_structured(&value))),
            "URL" => item.url = value.trim().to_string(),
            "NOTE" => item.note = unescape(&value),
            _ => item.unknown_tags.push(line.clone()),
        }
    }
    item
}

fn from_vcard4(lines: &[String], index: usize) -> Result<ContactItem, FormatError> {
    let block = lines.join(LINE_END);
    let invalid = |message: String| FormatError::InvalidCard {
        index: index + 1,
        message,
    };
    let card = vcard4::parse(&block)
        .map_err(|err| invalid(err.to_string()))?
        .into_iter()
        .next()
        .ok_or_else(|| invalid("card failed to parse".to_string()))?;
    Ok(item_from_vcard4(&card))
}

fn item_from_vcard4(card: &Vcard) -> ContactItem {
    let mut item = ContactItem::default();
    item.full_name = first_text(&card.formatted_name);
    item.nickname = first_text(&card.nickname);
    item.title = first_text(&card.title);
    item.note = first_text(&card.note);
    item.organization = card
        .org
        .first()
        .map(|p| join_components(&p.value))
        .unwrap_or_default();
    item.birthday = card.bday.as_ref().map(|b| b.to_string());
    item.url = card.url.first().map(|p| p.value.to_string()).unwrap_or_default();

    if let Some(name) = &card.name {
        let part = |i: usize| name.value.get(i).cloned().unwrap_or_default();
        item.last_name = part(0);
        item.first_name = part(1);
        item.middle_name = part(2);
        item.prefix = part(3);
        item.suffix = part(4);
    }

    for prop in &card.tel {
        let (number, parameters) = match prop {
            TextOrUriProperty::Text(text) => (text.value.clone(), text.parameters.as_ref()),
            TextOrUriProperty::Uri(uri) => {
                let value = uri.value.to_string();
                let number = value
                    .strip_prefix("tel:")
                    .map(str::to_string)
                    .unwrap_or(value);
                (number, uri.parameters.as_ref())
            }
        };
        item.phones.push(Phone {
            number,
            types: parameter_types(parameters),
        });
    }

    for prop in &card.email {
        item.emails.push(Email {
            address: prop.value.clone(),
            types: parameter_types(prop.parameters.as_ref()),
        });
    }

    item.addresses = card.address.iter().map(|p| p.value.to_string()).collect();
    item.unknown_tags = card
        .extensions
        .iter()
        .map(|ext| format!("{}:{}", ext.name.to_uppercase(), ext.value))
        .collect();
    item
}

fn first_text(props: &[TextProperty]) -> String {
    props.first().map(|p| p.value.clone()).unwrap_or_default()
}

fn parameter_types(parameters: Option<&Parameters>) -> Vec<String> {
    parameters
        .and_then(|p| p.types.as_ref())
        .map(|types| types.iter().map(type_parameter_to_string).collect())
        .unwrap_or_default()
}

fn type_parameter_to_string(param: &TypeParameter) -> String {
    match param {
        TypeParameter::Telephone(value) => value.to_string().to_ascii_lowercase(),
        TypeParameter::Related(value) => value.to_string().to_ascii_lowercase(),
        TypeParameter::Home => "home".to_string(),
        TypeParameter::Work => "work".to_string(),
        TypeParameter::Extension(value) => value.to_ascii_lowercase(),
    }
}

/// Fill empty phone types and report types outside the standard set.
fn check_types(item: &mut ContactItem, index: usize, settings: &Settings, warnings: &mut Vec<String>) {
    let default_type = settings.default_empty_phone_type.trim();
    for phone in &mut item.phones {
        if phone.types.is_empty() && !default_type.is_empty() {
            phone.types.push(default_type.to_ascii_lowercase());
        }
    }
    if !settings.warn_on_non_standard_types {
        return;
    }
    for phone in &item.phones {
        for t in &phone.types {
            if !is_standard_type(t, STANDARD_PHONE_TYPES) && !is_extension_type(t) {
                warnings.push(format!("Record {}: non-standard phone type '{}'", index + 1, t));
            }
        }
    }
    for email in &item.emails {
        for t in &email.types {
            if !is_standard_type(t, STANDARD_EMAIL_TYPES) && !is_extension_type(t) {
                warnings.push(format!("Record {}: non-standard email type '{}'", index + 1, t));
            }
        }
    }
}

fn is_extension_type(value: &str) -> bool {
    value.len() > 2 && value.get(..2).is_some_and(|p| p.eq_ignore_ascii_case("x-"))
}

fn decode_quoted_printable(input: &str) -> Result<String, FormatError> {
    let raw = input.as_bytes();
    let mut bytes = Vec::with_capacity(raw.len());
    let mut i = 0usize;
    while i < raw.len() {
        if raw[i] != b'=' {
            bytes.push(raw[i]);
            i += 1;
            continue;
        }
        let rest = &raw[i + 1..];
        if rest.is_empty() {
            break;
        }
        let after_break = rest
            .strip_prefix(b"\r\n")
            .or_else(|| rest.strip_prefix(b"\n"))
            .or_else(|| rest.strip_prefix(b"\r"));
        if let Some(after) = after_break {
            i = raw.len() - after.len();
            continue;
        }
        let value = match rest {
            [high, low, ..] => hex_digit(*high)
                .zip(hex_digit(*low))
                .map(|(h, l)| (h << 4) | l)
                .ok_or_else(|| {
                    FormatError::QuotedPrintable(format!(
                        "bad escape ={}",
                        String::from_utf8_lossy(&rest[..2])
                    ))
                })?,
            _ => return Err(FormatError::QuotedPrintable("truncated escape".to_string())),
        };
        bytes.push(value);
        i += 3;
    }
    String::from_utf8(bytes).map_err(|_| FormatError::QuotedPrintable("not UTF-8 text".to_string()))
}

fn hex_digit(byte: u8) -> Option<u8> {
    (byte as char).to_digit(16).map(|d| d as u8)
}

/// Split a structured value on unescaped `;` and unescape each component.
fn split_structured(value: &str) -> Vec<String> {
    let mut components = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => {
                current.push(ch);
                if let Some(next) = chars.next() {
                    current.push(next);
                }
            }
            ';' => components.push(unescape(&std::mem::take(&mut current))),
            _ => current.push(ch),
        }
    }
    components.push(unescape(&current));
    components
}

/// Structured values are kept as one string: components joined by `;`,
/// with a literal `;` or `\` inside a component stored as `\;` or `\\`.
fn join_components(components: &[String]) -> String {
    components
        .iter()
        .map(|c| c.replace('\\', "\\\\").replace(';', "\\;"))
        .collect::<Vec<_>>()
        .join(";")
}

fn split_components(value: &str) -> Vec<String> {
    let mut components = Vec::new();
    let mut current = String::new();
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        match ch {
            '\\' => match chars.next() {
                Some(next @ (';' | '\\')) => current.push(next),
                Some(next) => {
                    current.push('\\');
                    current.push(next);
                }
                None => current.push('\\'),
            },
            ';' => components.push(std::mem::take(&mut current)),
            _ => current.push(ch),
        }
    }
    components.push(current);
    components
}

fn unescape(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    let mut chars = value.chars();
    while let Some(ch) = chars.next() {
        if ch != '\\' {
            out.push(ch);
            continue;
        }
        match chars.next() {
            Some('n' | 'N') => out.push('\n'),
            Some(other @ (',' | ';' | '\\' | ':')) => out.push(other),
            Some(other) => {
                out.push('\\');
                out.push(other);
            }
            None => out.push('\\'),
        }
    }
    out
}

// =============================================================================
// Writing
// =============================================================================

/// Serialize `items` as vCard `version` (2.1 or 3.0). Returns the text and
/// any warnings about types written as-is.
pub fn write(items: &[ContactItem], version: VCardVersion, settings: &Settings) -> (String, Vec<String>) {
    let version = match version {
        VCardVersion::V30 => VCardVersion::V30,
        _ => VCardVersion::V21,
    };
    let mut out = String::new();
    let mut warnings = Vec::new();
    for (index, item) in items.iter().enumerate() {
        let mut card = CardWriter::new(version);
        card.raw(BEGIN_VCARD);
        card.raw(&format!("VERSION:{}", version));

        let name = [
            &item.last_name,
            &item.first_name,
            &item.middle_name,
            &item.prefix,
            &item.suffix,
        ]
        .iter()
        .map(|part| escape(part, version))
        .collect::<Vec<_>>()
        .join(";");
        card.property("N", Vec::new(), &name);
        if !item.full_name.is_empty() {
            card.property("FN", Vec::new(), &escape(&item.full_name, version));
        }
        if !item.nickname.is_empty() {
            card.property("NICKNAME", Vec::new(), &escape(&item.nickname, version));
        }
        for phone in &item.phones {
            let params = type_params(&phone.types, STANDARD_PHONE_TYPES, version, settings, index, &mut warnings);
            card.property("TEL", params, &phone.number);
        }
        for email in &item.emails {
            let params = type_params(&email.types, STANDARD_EMAIL_TYPES, version, settings, index, &mut warnings);
            card.property("EMAIL", params, &email.address);
        }
        if let Some(birthday) = &item.birthday {
            let value = if settings.skip_time_from_date {
                dates::date_part(birthday)
            } else {
                birthday.trim()
            };
            card.property("BDAY", Vec::new(), value);
        }
        if !item.organization.is_empty() {
            card.property("ORG", Vec::new(), &escape_structured(&item.organization, version));
        }
        if !item.title.is_empty() {
            card.property("TITLE", Vec::new(), &escape(&item.title, version));
        }
        for address in &item.addresses {
            card.property("ADR", Vec::new(), &escape_structured(address, version));
        }
        if !item.url.is_empty() {
            card.property("URL", Vec::new(), &item.url);
        }
        if !item.note.is_empty() {
            card.property("NOTE", Vec::new(), &escape(&item.note, version));
        }
        for tag in &item.unknown_tags {
            card.raw(tag);
        }
        card.raw(END_VCARD);
        out.push_str(&card.finish());
    }
    (out, warnings)
}

struct CardWriter {
    version: VCardVersion,
    lines: Vec<String>,
}

impl CardWriter {
    fn new(version: VCardVersion) -> Self {
        Self {
            version,
            lines: Vec::new(),
        }
    }

    fn raw(&mut self, line: &str) {
        self.lines.push(line.to_string());
    }

    /// 2.1 has no escape for line breaks or a default charset, so such
    /// values are written quoted-printable.
    fn property(&mut self, name: &str, mut params: Vec<String>, value: &str) {
        let needs_qp = self.version == VCardVersion::V21 && (!value.is_ascii() || value.contains('\n'));
        let value = if needs_qp {
            if !value.is_ascii() {
                params.push("CHARSET=UTF-8".to_string());
            }
            params.push("ENCODING=QUOTED-PRINTABLE".to_string());
            encode_quoted_printable(value)
        } else {
            value.to_string()
        };
        self.lines.push(format_property_line(name, &params, &value));
    }

    fn finish(self) -> String {
        let mut text = self.lines.join(LINE_END);
        text.push_str(LINE_END);
        text
    }
}

fn format_property_line(name: &str, params: &[String], value: &str) -> String {
    let mut buffer = String::from(name);
    for param in params {
        buffer.push(';');
        buffer.push_str(param);
    }
    buffer.push(':');
    buffer.push_str(value);
    buffer
}

fn type_params(
    types: &[String],
    standard: &[&str],
    version: VCardVersion,
    settings: &Settings,
    index: usize,
    warnings: &mut Vec<String>,
) -> Vec<String> {
    let rendered: Vec<String> = types
        .iter()
        .filter(|t| !t.trim().is_empty())
        .map(|t| {
            let t = t.trim();
            if is_standard_type(t, standard) || is_extension_type(t) {
                t.to_ascii_uppercase()
            } else if settings.add_x_to_non_standard_types {
                format!("X-{}", t.to_ascii_uppercase())
            } else {
                if settings.warn_on_non_standard_types {
                    warnings.push(format!("Record {}: non-standard type '{}' written as is", index + 1, t));
                }
                t.to_ascii_uppercase()
            }
        })
        .collect();

    match version {
        VCardVersion::V30 if !rendered.is_empty() => vec![format!("TYPE={}", rendered.join(","))],
        VCardVersion::V30 => Vec::new(),
        _ => rendered,
    }
}

fn escape(value: &str, version: VCardVersion) -> String {
    let mut out = String::with_capacity(value.len());
    for ch in value.chars() {
        match (ch, version) {
            (';', _) => out.push_str("\\;"),
            ('\\', _) => out.push_str("\\\\"),
            (',', VCardVersion::V30) => out.push_str("\\,"),
            ('\n', VCardVersion::V30) => out.push_str("\\n"),
            _ => out.push(ch),
        }
    }
    out
}

/// Escape each component of a structured value.
fn escape_structured(value: &str, version: VCardVersion) -> String {
    split_components(value)
        .iter()
        .map(|part| escape(part, version))
        .collect::<Vec<_>>()
        .join(";")
}

fn encode_quoted_printable(value: &str) -> String {
    let normalized = value.replace("\r\n", "\n").replace('\n', "\r\n");
    let mut out = String::with_capacity(normalized.len() * 3);
    for byte in normalized.bytes() {
        match byte {
            b'=' => out.push_str("=3D"),
            33..=126 | b' ' => out.push(byte as char),
            _ => out.push_str(&format!("={:02X}", byte)),
        }
    }
    if out.ends_with(' ') {
        out.pop();
        out.push_str("=20");
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::languages::SystemLocale;

    fn settings() -> Settings {
        Settings::defaults_for(&SystemLocale::from_posix("en_GB"))
    }

    #[test]
    fn unfold_lines_handles_quoted_printable_soft_breaks() {
        let lines = vec![
            "NOTE;ENCODING=QUOTED-PRINTABLE:Hello=".to_string(),
            "World".to_string(),
        ];
        assert_eq!(
            unfold_lines(&lines),
            vec!["NOTE;ENCODING=QUOTED-PRINTABLE:HelloWorld".to_string()]
        );
    }

    #[test]
    fn unfold_lines_joins_continuation_lines() {
        let lines = vec!["NOTE:Hello".to_string(), " World".to_string()];
        assert_eq!(unfold_lines(&lines), vec!["NOTE:HelloWorld".to_string()]);
    }

    #[test]
    fn unfold_lines_does_not_merge_non_qp_lines() {
        let lines = vec!["PHOTO;ENCODING=BASE64:abc=".to_string(), "END:VCARD".to_string()];
        assert_eq!(unfold_lines(&lines), lines);
    }

    #[test]
    fn decode_quoted_printable_handles_utf8_and_soft_breaks() {
        assert_eq!(decode_quoted_printable("Soft=\nBreak").unwrap(), "SoftBreak");
        assert_eq!(decode_quoted_printable("Trailing=").unwrap(), "Trailing");
        assert_eq!(decode_quoted_printable("=D0=98=D0=B2=D0=B0=D0=BD").unwrap(), "Иван");
        assert!(decode_quoted_printable("bad=Z1").is_err());
    }

    #[test]
    fn reads_vcard_21_with_bare_types() {
        let text = "BEGIN:VCARD\r\n\
                    VERSION:2.1\r\n\
                    N;CHARSET=UTF-8;ENCODING=QUOTED-PRINTABLE:=D0=9F=D0=B5=D1=82=D1=80=D0=BE=D0=B2;=D0=98=D0=B2=D0=B0=D0=BD;;;\r\n\
                    TEL;CELL;PREF:+79120000000\r\n\
                    TEL:555-0100\r\n\
                    X-SKYPE:ivan.petrov\r\n\
                    END:VCARD\r\n";
        let loaded = read(text, &settings()).unwrap();
        assert_eq!(loaded.version, Some(VCardVersion::V21));
        let item = &loaded.items[0];
        assert_eq!(item.last_name, "Петров");
        assert_eq!(item.first_name, "Иван");
        assert_eq!(item.phones[0].types, vec!["cell", "pref"]);
        assert_eq!(item.phones[1].types, vec!["voice"]);
        assert_eq!(item.unknown_tags, vec!["X-SKYPE:ivan.petrov"]);
        assert!(loaded.warnings.is_empty());
    }

    #[test]
    fn reads_vcard_30_type_lists_and_escapes() {
        let text = "BEGIN:VCARD\n\
                    VERSION:3.0\n\
                    N:Smith;John;;;\n\
                    FN:John Smith\n\
                    TEL;TYPE=WORK,VOICE:+1 555 0100\n\
                    EMAIL;TYPE=INTERNET:john@example.com\n\
                    ORG:Acme\\, Inc.;Sales\n\
                    NOTE:first\\nsecond\n\
                    END:VCARD\n";
        let loaded = read(text, &settings()).unwrap();
        assert_eq!(loaded.version, Some(VCardVersion::V30));
        let item = &loaded.items[0];
        assert_eq!(item.full_name, "John Smith");
        assert_eq!(item.phones[0].types, vec!["work", "voice"]);
        assert_eq!(item.emails[0].address, "john@example.com");
        assert_eq!(item.organization, "Acme, Inc.;Sales");
        assert_eq!(item.note, "first\nsecond");
    }

    #[test]
    fn non_standard_types_warn_when_enabled() {
        let text = "BEGIN:VCARD\nVERSION:3.0\nN:A;B;;;\nTEL;TYPE=SATELLITE:123\nTEL;TYPE=X-CUSTOM:456\nEND:VCARD\n";
        let loaded = read(text, &settings()).unwrap();
        assert_eq!(loaded.warnings.len(), 1);
        assert!(loaded.warnings[0].contains("satellite"));

        let mut quiet = settings();
        quiet.warn_on_non_standard_types = false;
        assert!(read(text, &quiet).unwrap().warnings.is_empty());
    }

    #[test]
    fn empty_phone_type_uses_configured_default() {
        let text = "BEGIN:VCARD\nVERSION:3.0\nN:A;B;;;\nTEL:123\nEND:VCARD\n";
        let mut s = settings();
        s.default_empty_phone_type = "cell".into();
        let loaded = read(text, &s).unwrap();
        assert_eq!(loaded.items[0].phones[0].types, vec!["cell"]);
    }

    #[test]
    fn reads_vcard_40_through_vcard4() {
        let text = "BEGIN:VCARD\r\n\
                    VERSION:4.0\r\n\
                    FN:Jane Doe\r\n\
                    N:Doe;Jane;;;\r\n\
                    TEL;TYPE=cell:+1 555 0100\r\n\
                    EMAIL;TYPE=work:jane@example.com\r\n\
                    BDAY:19850412\r\n\
                    END:VCARD\r\n";
        let loaded = read(text, &settings()).unwrap();
        assert_eq!(loaded.version, Some(VCardVersion::V40));
        let item = &loaded.items[0];
        assert_eq!(item.full_name, "Jane Doe");
        assert_eq!(item.last_name, "Doe");
        assert_eq!(item.first_name, "Jane");
        assert_eq!(item.phones[0].number, "+1 555 0100");
        assert_eq!(item.phones[0].types, vec!["cell"]);
        assert_eq!(item.emails[0].types, vec!["work"]);
        let birthday = item.birthday.as_deref().and_then(dates::parse_date);
        assert_eq!(birthday, Some(time::macros::date!(1985 - 04 - 12)));
    }

    #[test]
    fn invalid_vcard_40_is_an_error() {
        let text = "BEGIN:VCARD\nVERSION:4.0\nBDAY:not a date\nGARBAGE LINE\nEND:VCARD\n";
        let err = read(text, &settings()).unwrap_err();
        assert!(matches!(err, FormatError::InvalidCard { index: 1, .. }));
    }

    #[test]
    fn writes_21_non_ascii_as_quoted_printable() {
        let item = ContactItem::with_names("Иван", "Петров");
        let (text, _) = write(&[item], VCardVersion::V21, &settings());
        assert!(text.contains("N;CHARSET=UTF-8;ENCODING=QUOTED-PRINTABLE:=D0=9F"));
        let loaded = read(&text, &settings()).unwrap();
        assert_eq!(loaded.items[0].first_name, "Иван");
        assert_eq!(loaded.items[0].last_name, "Петров");
    }

    #[test]
    fn writes_type_parameters_per_version() {
        let mut item = ContactItem::with_names("John", "Smith");
        item.phones.push(Phone::new("123", &["cell", "satellite"]));

        let (v21, _) = write(&[item.clone()], VCardVersion::V21, &settings());
        assert!(v21.contains("TEL;CELL;SATELLITE:123\r\n"));

        let mut s = settings();
        s.add_x_to_non_standard_types = true;
        let (v30, warnings) = write(&[item], VCardVersion::V30, &s);
        assert!(v30.contains("TEL;TYPE=CELL,X-SATELLITE:123\r\n"));
        assert!(v30.starts_with("BEGIN:VCARD\r\nVERSION:3.0\r\n"));
        assert!(warnings.is_empty());
    }

    #[test]
    fn skip_time_from_date_drops_time() {
        let mut item = ContactItem::with_names("John", "Smith");
        item.birthday = Some("1980-05-12T10:00:00".into());
        let (kept, _) = write(&[item.clone()], VCardVersion::V30, &settings());
        assert!(kept.contains("BDAY:1980-05-12T10:00:00"));

        let mut s = settings();
        s.skip_time_from_date = true;
        let (skipped, _) = write(&[item], VCardVersion::V30, &s);
        assert!(skipped.contains("BDAY:1980-05-12\r\n"));
    }

    #[test]
    fn unknown_tags_are_written_back() {
        let mut item = ContactItem::with_names("John", "Smith");
        item.unknown_tags.push("X-SKYPE:john".into());
        let (text, _) = write(&[item], VCardVersion::V30, &settings());
        assert!(text.contains("\r\nX-SKYPE:john\r\nEND:VCARD\r\n"));
    }

    #[test]
    fn escapes_30_text_values() {
        let mut item = ContactItem::with_names("John", "Smith");
        item.note = "a, b\nc".into();
        let (text, _) = write(&[item], VCardVersion::V30, &settings());
        assert!(text.contains("NOTE:a\\, b\\nc\r\n"));
    }

    #[test]
    fn backslashes_survive_21_round_trip() {
        let mut item = ContactItem::with_names("Jane\\", "Doe\\");
        item.note = "C:\\new folder".into();
        item.title = "a\\;b".into();
        let (text, _) = write(&[item], VCardVersion::V21, &settings());
        assert!(text.contains("N:Doe\\\\;Jane\\\\;;;\r\n"));

        let loaded = read(&text, &settings()).unwrap();
        let back = &loaded.items[0];
        assert_eq!(back.first_name, "Jane\\");
        assert_eq!(back.last_name, "Doe\\");
        assert_eq!(back.note, "C:\\new folder");
        assert_eq!(back.title, "a\\;b");
    }

    #[test]
    fn multibyte_types_do_not_panic() {
        let text = "BEGIN:VCARD\nVERSION:3.0\nN:A;B;;;\nTEL;TYPE=手机:123\nEMAIL;TYPE=xé:a@b.c\nEND:VCARD\n";
        let loaded = read(text, &settings()).unwrap();
        assert_eq!(loaded.items[0].phones[0].types, vec!["手机"]);
        assert_eq!(loaded.warnings.len(), 2);

        let (written, _) = write(&loaded.items, VCardVersion::V30, &settings());
        assert!(written.contains("TEL;TYPE=手机:123\r\n"));
        assert!(!is_extension_type("xé"));
        assert!(is_extension_type("X-ÉTÉ"));
    }

    #[test]
    fn escaped_semicolons_stay_inside_structured_components() {
        let text = "BEGIN:VCARD\nVERSION:3.0\nN:A;B;;;\nORG:Acme\\; Ltd;Sales\nADR:;;Main st\\; 1;Town;;;\nEND:VCARD\n";
        let loaded = read(text, &settings()).unwrap();
        let item = &loaded.items[0];
        assert_eq!(split_components(&item.organization), vec!["Acme; Ltd", "Sales"]);
        assert_eq!(split_components(&item.addresses[0])[2], "Main st; 1");

        let (written, _) = write(&loaded.items, VCardVersion::V30, &settings());
        assert!(written.contains("ORG:Acme\\; Ltd;Sales\r\n"));
        assert!(written.contains("ADR:;;Main st\\; 1;Town;;;\r\n"));
    }

    #[test]
    fn split_cards_keeps_truncated_card_and_skips_noise() {
        let cards = split_cards("junk\nBEGIN:VCARD\nFN:A\nEND:VCARD\nBEGIN:VCARD\nFN:B\n");
        assert_eq!(cards.len(), 2);
        assert_eq!(cards[0], vec!["BEGIN:VCARD", "FN:A", "END:VCARD"]);
        assert_eq!(cards[1], vec!["BEGIN:VCARD", "FN:B"]);
    }

    #[test]
    fn bad_quoted_printable_is_a_warning() {
        let text = "BEGIN:VCARD\nVERSION:2.1\nN:A;B;;;\nNOTE;ENCODING=QUOTED-PRINTABLE:bad=Z1\nEND:VCARD\n";
        let loaded = read(text, &settings()).unwrap();
        assert_eq!(loaded.items[0].note, "bad=Z1");
        assert!(loaded.warnings[0].contains("quoted-printable"));
    }
}
