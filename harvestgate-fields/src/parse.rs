// harvestgate-fields/src/parse.rs
// ============================================================================
// Module: Type Parsers
// Description: Stage 3 of the pipeline — dispatches by field type to a
//              registered parser. Every parser is total: it never panics and
//              never performs I/O, returning a value plus reasons/errors
//              instead of raising.
// ============================================================================

use std::sync::LazyLock;

use regex::Regex;

use crate::types::FieldType;
use crate::types::FieldValue;
use crate::types::Money;
use crate::types::PhoneFormat;
use crate::types::SmartConfig;

/// The outcome of one parser invocation: a candidate value plus the reasons
/// and errors accumulated while producing it.
#[derive(Debug, Default)]
pub struct ParseOutcome {
    /// The parsed value, or [`FieldValue::Null`] when parsing failed.
    pub value: FieldValue,
    /// Positive signals (e.g. `valid_email_format`).
    pub reasons: Vec<String>,
    /// Parse-level errors (e.g. `invalid_email_format`).
    pub errors: Vec<String>,
}

impl ParseOutcome {
    fn ok(value: FieldValue, reason: &str) -> Self {
        Self {
            value,
            reasons: vec![reason.to_string()],
            errors: Vec::new(),
        }
    }

    fn err(error: &str) -> Self {
        Self {
            value: FieldValue::Null,
            reasons: Vec::new(),
            errors: vec![error.to_string()],
        }
    }
}

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[expect(clippy::unwrap_used, reason = "pattern is a fixed literal, compiles by construction")]
    Regex::new(r"^[A-Za-z0-9._%+-]+@[A-Za-z0-9.-]+\.[A-Za-z]{2,}$").unwrap()
});

static ZIP_RE: LazyLock<Regex> = LazyLock::new(|| {
    #[expect(clippy::unwrap_used, reason = "pattern is a fixed literal, compiles by construction")]
    Regex::new(r"^\d{5}(-\d{4})?$").unwrap()
});

/// Collapses interior whitespace runs to a single space and trims the ends.
fn collapse_whitespace(input: &str) -> String {
    input.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn parse_email(cleaned: &str) -> ParseOutcome {
    let lowered = cleaned.to_lowercase();
    if EMAIL_RE.is_match(&lowered) {
        ParseOutcome::ok(FieldValue::Text(lowered), "valid_email_format")
    } else {
        ParseOutcome::err("invalid_email_format")
    }
}

fn digits_only(input: &str) -> String {
    input.chars().filter(char::is_ascii_digit).collect()
}

fn parse_phone(cleaned: &str, format: PhoneFormat) -> ParseOutcome {
    let digits = digits_only(cleaned);
    if digits.len() < 7 || digits.len() > 15 {
        return ParseOutcome::err("invalid_phone_format");
    }
    let rendered = match format {
        PhoneFormat::E164 => format!("+{digits}"),
        PhoneFormat::International => format!("+{digits}"),
        PhoneFormat::National => digits.clone(),
    };
    ParseOutcome::ok(FieldValue::Text(rendered), "valid_phone_format")
}

fn parse_url(cleaned: &str) -> ParseOutcome {
    let candidate = if cleaned.contains("://") {
        cleaned.to_string()
    } else {
        format!("https://{cleaned}")
    };
    match url::Url::parse(&candidate) {
        Ok(parsed) if matches!(parsed.scheme(), "http" | "https") && parsed.host().is_some() => {
            ParseOutcome::ok(FieldValue::Text(parsed.into()), "valid_url_format")
        }
        _ => ParseOutcome::err("invalid_url_format"),
    }
}

fn parse_zip(cleaned: &str) -> ParseOutcome {
    if ZIP_RE.is_match(cleaned) {
        ParseOutcome::ok(FieldValue::Text(cleaned.to_string()), "valid_zip_format")
    } else {
        ParseOutcome::err("invalid_zip_format")
    }
}

fn parse_plain_text(cleaned: &str) -> ParseOutcome {
    ParseOutcome::ok(FieldValue::Text(collapse_whitespace(cleaned)), "normalized_text")
}

/// Strips thousands separators and currency/percent symbols before a numeric
/// parse.
fn strip_numeric_noise(input: &str) -> String {
    input
        .chars()
        .filter(|c| c.is_ascii_digit() || *c == '.' || *c == '-')
        .collect()
}

fn parse_number(cleaned: &str) -> ParseOutcome {
    let stripped = strip_numeric_noise(cleaned);
    stripped.parse::<f64>().map_or_else(
        |_| ParseOutcome::err("invalid_number_format"),
        |n| ParseOutcome::ok(FieldValue::Number(n), "valid_number_format"),
    )
}

fn parse_integer(cleaned: &str) -> ParseOutcome {
    let stripped = strip_numeric_noise(cleaned);
    stripped.parse::<f64>().map_or_else(
        |_| ParseOutcome::err("invalid_integer_format"),
        |n| {
            #[expect(clippy::cast_possible_truncation, reason = "values outside i64 range are rejected by the caller's validation pass")]
            let truncated = n.trunc() as i64;
            ParseOutcome::ok(FieldValue::Integer(truncated), "valid_integer_format")
        },
    )
}

fn currency_for_symbol(cleaned: &str) -> &'static str {
    if cleaned.contains('€') {
        "EUR"
    } else if cleaned.contains('£') {
        "GBP"
    } else if cleaned.contains('¥') {
        "JPY"
    } else {
        "USD"
    }
}

fn parse_money(cleaned: &str) -> ParseOutcome {
    let currency = currency_for_symbol(cleaned);
    let stripped = strip_numeric_noise(cleaned);
    stripped.parse::<f64>().map_or_else(
        |_| ParseOutcome::err("invalid_money_format"),
        |amount| {
            ParseOutcome::ok(
                FieldValue::Money(Money {
                    amount,
                    currency: currency.to_string(),
                }),
                "valid_money_format",
            )
        },
    )
}

fn parse_percentage(cleaned: &str) -> ParseOutcome {
    let trimmed = cleaned.trim_end_matches('%').trim();
    let stripped = strip_numeric_noise(trimmed);
    stripped.parse::<f64>().map_or_else(
        |_| ParseOutcome::err("invalid_percentage_format"),
        |n| ParseOutcome::ok(FieldValue::Number(n), "valid_percentage_format"),
    )
}

fn parse_rating(cleaned: &str) -> ParseOutcome {
    let first_token = cleaned.split(['/', ' ']).next().unwrap_or(cleaned);
    let stripped = strip_numeric_noise(first_token);
    stripped.parse::<f64>().map_or_else(
        |_| ParseOutcome::err("invalid_rating_format"),
        |n| ParseOutcome::ok(FieldValue::Number(n), "valid_rating_format"),
    )
}

fn parse_boolean(cleaned: &str) -> ParseOutcome {
    match cleaned.to_lowercase().as_str() {
        "true" | "yes" | "y" | "1" => ParseOutcome::ok(FieldValue::Boolean(true), "valid_boolean_format"),
        "false" | "no" | "n" | "0" => ParseOutcome::ok(FieldValue::Boolean(false), "valid_boolean_format"),
        _ => ParseOutcome::err("invalid_boolean_format"),
    }
}

fn parse_date_like(cleaned: &str, field_type: FieldType) -> ParseOutcome {
    use time::format_description::well_known::Rfc3339;
    use time::macros::format_description;

    if field_type == FieldType::Date {
        let fmt = format_description!("[year]-[month]-[day]");
        return time::Date::parse(cleaned, &fmt).map_or_else(
            |_| ParseOutcome::err("invalid_date_format"),
            |d| ParseOutcome::ok(FieldValue::Text(d.to_string()), "valid_date_format"),
        );
    }
    if field_type == FieldType::Time {
        let fmt = format_description!("[hour]:[minute]:[second]");
        let fallback = format_description!("[hour]:[minute]");
        return time::Time::parse(cleaned, &fmt)
            .or_else(|_| time::Time::parse(cleaned, &fallback))
            .map_or_else(
                |_| ParseOutcome::err("invalid_time_format"),
                |t| ParseOutcome::ok(FieldValue::Text(t.to_string()), "valid_time_format"),
            );
    }
    // DateTime: normalize to RFC 3339 (ISO-8601).
    time::OffsetDateTime::parse(cleaned, &Rfc3339).map_or_else(
        |_| ParseOutcome::err("invalid_datetime_format"),
        |dt| {
            dt.format(&Rfc3339).map_or_else(
                |_| ParseOutcome::err("invalid_datetime_format"),
                |s| ParseOutcome::ok(FieldValue::Text(s), "valid_datetime_format"),
            )
        },
    )
}

/// Dispatches `cleaned` (already trimmed) to the parser registered for
/// `field_type`.
#[must_use]
pub fn parse(field_type: FieldType, cleaned: &str, smart: &SmartConfig) -> ParseOutcome {
    match field_type {
        FieldType::Email => parse_email(cleaned),
        FieldType::Phone | FieldType::Mobile | FieldType::Fax => parse_phone(cleaned, smart.phone_format),
        FieldType::Url | FieldType::ImageUrl => parse_url(cleaned),
        FieldType::ZipCode => parse_zip(cleaned),
        FieldType::Address
        | FieldType::City
        | FieldType::State
        | FieldType::Country
        | FieldType::PersonName
        | FieldType::FirstName
        | FieldType::LastName
        | FieldType::Company
        | FieldType::JobTitle
        | FieldType::String
        | FieldType::Text
        | FieldType::Html
        | FieldType::Category => parse_plain_text(cleaned),
        FieldType::Number | FieldType::Decimal => parse_number(cleaned),
        FieldType::Integer => parse_integer(cleaned),
        FieldType::Money => parse_money(cleaned),
        FieldType::Percentage => parse_percentage(cleaned),
        FieldType::Rating => parse_rating(cleaned),
        FieldType::Date | FieldType::Time | FieldType::DateTime => parse_date_like(cleaned, field_type),
        FieldType::Boolean => parse_boolean(cleaned),
    }
}
