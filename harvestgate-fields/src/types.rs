// harvestgate-fields/src/types.rs
// ============================================================================
// Module: Field Types
// Description: The field type catalogue, typed values, and pipeline inputs.
// ============================================================================

use serde::Deserialize;
use serde::Serialize;

/// The closed set of field types the pipeline knows how to parse.
///
/// Unknown types (deserialized from an unrecognized tag, or constructed via
/// [`FieldType::from_tag`]) fall back to [`FieldType::String`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldType {
    /// Contact: email address.
    Email,
    /// Contact: phone number.
    Phone,
    /// Contact: fax number.
    Fax,
    /// Contact: mobile phone number.
    Mobile,
    /// Location: a web URL.
    Url,
    /// Location: a URL pointing at an image.
    ImageUrl,
    /// Location: a street address.
    Address,
    /// Location: a city name.
    City,
    /// Location: a state or province.
    State,
    /// Location: a postal code.
    ZipCode,
    /// Location: a country name.
    Country,
    /// Person/business: a person's full name.
    PersonName,
    /// Person/business: a person's first name.
    FirstName,
    /// Person/business: a person's last name.
    LastName,
    /// Person/business: a company name.
    Company,
    /// Person/business: a job title.
    JobTitle,
    /// Numeric: a generic number.
    Number,
    /// Numeric: a whole number.
    Integer,
    /// Numeric: a fixed-point decimal.
    Decimal,
    /// Numeric: an amount with a currency.
    Money,
    /// Numeric: a percentage.
    Percentage,
    /// Numeric: a rating (e.g. out of 5).
    Rating,
    /// Temporal: a calendar date.
    Date,
    /// Temporal: a time of day.
    Time,
    /// Temporal: a date and time, normalized to ISO-8601.
    DateTime,
    /// Generic: a short string.
    String,
    /// Generic: a long free-form text blob.
    Text,
    /// Generic: an HTML fragment.
    Html,
    /// Generic: a value from a closed category set.
    Category,
    /// Generic: a boolean flag.
    Boolean,
}

impl FieldType {
    /// Resolves an arbitrary type tag to a [`FieldType`], falling back to
    /// [`FieldType::String`] for anything unrecognized.
    #[must_use]
    pub fn from_tag(tag: &str) -> Self {
        match tag {
            "email" => Self::Email,
            "phone" => Self::Phone,
            "fax" => Self::Fax,
            "mobile" => Self::Mobile,
            "url" => Self::Url,
            "image_url" => Self::ImageUrl,
            "address" => Self::Address,
            "city" => Self::City,
            "state" => Self::State,
            "zip_code" => Self::ZipCode,
            "country" => Self::Country,
            "person_name" => Self::PersonName,
            "first_name" => Self::FirstName,
            "last_name" => Self::LastName,
            "company" => Self::Company,
            "job_title" => Self::JobTitle,
            "number" => Self::Number,
            "integer" => Self::Integer,
            "decimal" => Self::Decimal,
            "money" => Self::Money,
            "percentage" => Self::Percentage,
            "rating" => Self::Rating,
            "date" => Self::Date,
            "time" => Self::Time,
            "datetime" => Self::DateTime,
            "text" => Self::Text,
            "html" => Self::Html,
            "category" => Self::Category,
            "boolean" => Self::Boolean,
            _ => Self::String,
        }
    }

    /// The tag this type serializes as, for payload construction.
    #[must_use]
    pub const fn tag(self) -> &'static str {
        match self {
            Self::Email => "email",
            Self::Phone => "phone",
            Self::Fax => "fax",
            Self::Mobile => "mobile",
            Self::Url => "url",
            Self::ImageUrl => "image_url",
            Self::Address => "address",
            Self::City => "city",
            Self::State => "state",
            Self::ZipCode => "zip_code",
            Self::Country => "country",
            Self::PersonName => "person_name",
            Self::FirstName => "first_name",
            Self::LastName => "last_name",
            Self::Company => "company",
            Self::JobTitle => "job_title",
            Self::Number => "number",
            Self::Integer => "integer",
            Self::Decimal => "decimal",
            Self::Money => "money",
            Self::Percentage => "percentage",
            Self::Rating => "rating",
            Self::Date => "date",
            Self::Time => "time",
            Self::DateTime => "datetime",
            Self::String => "string",
            Self::Text => "text",
            Self::Html => "html",
            Self::Category => "category",
            Self::Boolean => "boolean",
        }
    }
}

/// A monetary amount with its currency, the typed output of [`FieldType::Money`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Money {
    /// The numeric amount.
    pub amount: f64,
    /// ISO-4217-ish currency code, defaulting to `"USD"` when the raw string
    /// carries no currency marker.
    pub currency: String,
}

/// The typed output a parser stage produces, or [`FieldValue::Null`] when the
/// field is absent, invalid, or not yet confidently resolved.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "value", rename_all = "snake_case")]
pub enum FieldValue {
    /// No value: missing, invalid, or optional-and-absent.
    Null,
    /// A normalized text value (used by most field types, including
    /// ISO-8601-normalized dates/times).
    Text(String),
    /// A floating-point numeric value.
    Number(f64),
    /// A whole-number numeric value.
    Integer(i64),
    /// A monetary amount.
    Money(Money),
    /// A boolean flag.
    Boolean(bool),
}

impl FieldValue {
    /// True for every variant except [`FieldValue::Null`].
    #[must_use]
    pub const fn is_present(&self) -> bool {
        !matches!(self, Self::Null)
    }
}

/// Per-type smart configuration influencing how a value is parsed.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SmartConfig {
    /// Preferred phone rendering, consulted by [`FieldType::Phone`] and
    /// [`FieldType::Mobile`].
    #[serde(default)]
    pub phone_format: PhoneFormat,
    /// IANA timezone name used to resolve [`FieldType::DateTime`] values that
    /// carry no explicit offset. Defaults to UTC when absent.
    #[serde(default)]
    pub timezone: Option<String>,
}

/// The phone-number rendering a job prefers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PhoneFormat {
    /// `+<country><number>`, no punctuation.
    #[default]
    E164,
    /// Local formatting without a country code.
    National,
    /// Full international formatting with a leading `+`.
    International,
}

/// Validation rules applied after parsing.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ValidationRules {
    /// Field must be present; an absent required field is an error, not a
    /// skip.
    #[serde(default)]
    pub required: bool,
    /// Minimum string length, for string-like types.
    #[serde(default)]
    pub min_len: Option<usize>,
    /// Maximum string length, for string-like types.
    #[serde(default)]
    pub max_len: Option<usize>,
    /// Minimum numeric value, for number-like types.
    #[serde(default)]
    pub min_value: Option<f64>,
    /// Maximum numeric value, for number-like types.
    #[serde(default)]
    pub max_value: Option<f64>,
    /// Closed enumeration the normalized value must belong to.
    #[serde(default)]
    pub allowed_values: Option<Vec<String>>,
    /// Domains an email or URL value's host must belong to.
    #[serde(default)]
    pub allowed_domains: Option<Vec<String>>,
    /// A custom regex the normalized value must fully match.
    #[serde(default)]
    pub pattern: Option<String>,
}

/// The evidence-bearing output of the field pipeline for one `(field_name,
/// raw_string)` pair.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldResult {
    /// The typed, validated (and possibly consensus-promoted) value.
    pub value: FieldValue,
    /// The original raw string as supplied, trimmed.
    pub raw: String,
    /// Confidence in `[0, 1]`, rounded to two decimals.
    pub confidence: f64,
    /// Positive signals accumulated while scoring (e.g. `optional_not_provided`,
    /// `promoted_from_consensus`).
    pub reasons: Vec<String>,
    /// Validation and parse errors, drawn from [`crate::ValidationErrorKind`]
    /// plus parser-specific messages.
    pub errors: Vec<String>,
    /// The field type this result was parsed under.
    pub field_type: FieldType,
}

impl FieldResult {
    /// True when no error was recorded for this field.
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.errors.is_empty()
    }
}
