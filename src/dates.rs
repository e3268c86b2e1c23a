//! Date handling for birthday values and the user's display format.
//!
//! Display formats are stored in the settings file using the familiar
//! `dd.MM.yyyy` / `HH:mm` token style and converted to `time` format
//! descriptions on use.

use time::format_description;
use time::macros::format_description as fd;
use time::Date;

/// Parse the date part of a vCard date value (`1980-05-12`, `19800512`,
/// `1980-05-12T10:00:00Z`).
pub fn parse_date(raw: &str) -> Option<Date> {
    let date_part = date_part(raw);
    Date::parse(date_part, fd!("[year]-[month]-[day]"))
        .or_else(|_| Date::parse(date_part, fd!("[year][month][day]")))
        .ok()
}

/// The value without its time-of-day part.
pub fn date_part(raw: &str) -> &str {
    let trimmed = raw.trim();
    match trimmed.find('T') {
        Some(pos) => &trimmed[..pos],
        None => trimmed,
    }
}

/// Render a stored date with a `dd.MM.yyyy`-style format. Unparsable values
/// are shown as stored.
pub fn format_date(raw: &str, display_format: &str) -> String {
    let Some(date) = parse_date(raw) else {
        return raw.to_string();
    };
    let description = to_time_description(display_format);
    format_description::parse(&description)
        .ok()
        .and_then(|items| date.format(&items).ok())
        .unwrap_or_else(|| raw.to_string())
}

/// Convert `yyyy`, `MM`, `dd`, `HH`, `mm`, `ss` style tokens into a `time`
/// format description.
pub fn to_time_description(format: &str) -> String {
    const TOKENS: &[(&str, &str)] = &[
        ("yyyy", "[year]"),
        ("yy", "[year repr:last_two]"),
        ("MMMM", "[month repr:long]"),
        ("MMM", "[month repr:short]"),
        ("MM", "[month]"),
        ("M", "[month padding:none]"),
        ("dddd", "[weekday]"),
        ("ddd", "[weekday repr:short]"),
        ("dd", "[day]"),
        ("d", "[day padding:none]"),
        ("HH", "[hour]"),
        ("hh", "[hour repr:12]"),
        ("H", "[hour padding:none]"),
        ("h", "[hour repr:12 padding:none]"),
        ("mm", "[minute]"),
        ("m", "[minute padding:none]"),
        ("ss", "[second]"),
        ("s", "[second padding:none]"),
        ("AP", "[period]"),
        ("ap", "[period case:lower]"),
    ];

    let mut out = String::with_capacity(format.len() * 2);
    let mut rest = format;
    'outer: while !rest.is_empty() {
        for (token, replacement) in TOKENS {
            if let Some(tail) = rest.strip_prefix(token) {
                out.push_str(replacement);
                rest = tail;
                continue 'outer;
            }
        }
        let mut chars = rest.chars();
        if let Some(ch) = chars.next() {
            if ch == '[' {
                out.push_str("[[");
            } else {
                out.push(ch);
            }
        }
        rest = chars.as_str();
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_extended_and_basic_dates() {
        assert!(parse_date("1980-05-12").is_some());
        assert!(parse_date("19800512").is_some());
        assert!(parse_date("1980-05-12T10:00:00Z").is_some());
        assert!(parse_date("--0512").is_none());
    }

    #[test]
    fn formats_with_display_tokens() {
        assert_eq!(format_date("1980-05-02", "dd.MM.yyyy"), "02.05.1980");
        assert_eq!(format_date("1980-05-02", "d/M/yy"), "2/5/80");
        assert_eq!(format_date("1980-05-02", "yyyy-MM-dd"), "1980-05-02");
    }

    #[test]
    fn unparsable_values_pass_through() {
        assert_eq!(format_date("sometime", "dd.MM.yyyy"), "sometime");
    }

    #[test]
    fn date_part_drops_time() {
        assert_eq!(date_part("1980-05-12T10:00:00"), "1980-05-12");
        assert_eq!(date_part("1980-05-12"), "1980-05-12");
    }

    #[test]
    fn brackets_are_escaped() {
        assert_eq!(to_time_description("[dd]"), "[[[day]]");
    }
}
