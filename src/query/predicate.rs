//! Predicate types and parsing from `field=value` parameters

use chrono::{DateTime, Duration, NaiveDate, NaiveDateTime, Utc};

use crate::types::{Record, Status, TIMESTAMP_DISPLAY_FORMAT};

use super::QueryError;

/// Case-insensitive equality without allocating
fn eq_caseless(a: &str, b: &str) -> bool {
    a.chars()
        .flat_map(char::to_lowercase)
        .eq(b.chars().flat_map(char::to_lowercase))
}

/// Inclusive range with optional ends
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Bounds<T> {
    pub min: Option<T>,
    pub max: Option<T>,
}

impl<T: PartialOrd> Bounds<T> {
    pub fn new(min: Option<T>, max: Option<T>) -> Self {
        Self { min, max }
    }

    pub fn contains(&self, value: &T) -> bool {
        self.min.as_ref().map_or(true, |min| value >= min)
            && self.max.as_ref().map_or(true, |max| value <= max)
    }
}

/// Free-text token, stored lower-cased
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TextQuery {
    needle: String,
}

impl TextQuery {
    pub fn new(token: &str) -> Self {
        Self {
            needle: token.trim().to_lowercase(),
        }
    }

    pub fn needle(&self) -> &str {
        &self.needle
    }

    /// True if any field's display text contains the token
    pub fn matches(&self, record: &Record) -> bool {
        if self.needle.is_empty() {
            return true;
        }
        record
            .field_texts()
            .iter()
            .any(|text| text.to_lowercase().contains(&self.needle))
    }
}

/// One structured constraint
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldFilter {
    /// Exact item, case-insensitive
    Item(String),
    Status(Status),
    /// Exact actor
    Actor(String),
    /// Notes contain the text, case-insensitive (stored lower-cased)
    NotesContain(String),
    Quantity(Bounds<u64>),
    Timestamp(Bounds<DateTime<Utc>>),
}

impl FieldFilter {
    pub fn matches(&self, record: &Record) -> bool {
        match self {
            FieldFilter::Item(item) => eq_caseless(&record.item, item),
            FieldFilter::Status(status) => record.status == *status,
            FieldFilter::Actor(actor) => record.actor == *actor,
            FieldFilter::NotesContain(text) => record
                .notes
                .as_deref()
                .map_or(false, |notes| notes.to_lowercase().contains(text.as_str())),
            FieldFilter::Quantity(bounds) => bounds.contains(&record.quantity),
            FieldFilter::Timestamp(bounds) => bounds.contains(&record.timestamp),
        }
    }

    /// Parse one `field=value` pair
    ///
    /// Ranges are written `min..max`; either end may be omitted. A single
    /// quantity is an exact match and a single date covers that whole day.
    pub fn parse(field: &str, value: &str) -> Result<Self, QueryError> {
        let value = value.trim();
        match field {
            "item" => Ok(FieldFilter::Item(value.to_string())),
            "status" => value
                .parse::<Status>()
                .map(FieldFilter::Status)
                .map_err(|e| QueryError::invalid(field, value, e.to_string())),
            "actor" => Ok(FieldFilter::Actor(value.to_string())),
            "notes" => Ok(FieldFilter::NotesContain(value.to_lowercase())),
            "quantity" => parse_quantity_bounds(value).map(FieldFilter::Quantity),
            "timestamp" => parse_timestamp_bounds(value).map(FieldFilter::Timestamp),
            other => Err(QueryError::UnknownField(other.to_string())),
        }
    }
}

fn split_range(value: &str) -> Option<(&str, &str)> {
    value.split_once("..").map(|(a, b)| (a.trim(), b.trim()))
}

fn parse_quantity(field_value: &str, raw: &str) -> Result<Option<u64>, QueryError> {
    if raw.is_empty() {
        return Ok(None);
    }
    raw.parse::<u64>()
        .map(Some)
        .map_err(|_| QueryError::invalid("quantity", field_value, "expected a non-negative integer"))
}

fn parse_quantity_bounds(value: &str) -> Result<Bounds<u64>, QueryError> {
    let bounds = match split_range(value) {
        Some((min, max)) => Bounds::new(parse_quantity(value, min)?, parse_quantity(value, max)?),
        None => {
            let exact = parse_quantity(value, value)?;
            Bounds::new(exact, exact)
        }
    };

    if let (Some(min), Some(max)) = (bounds.min, bounds.max) {
        if min > max {
            return Err(QueryError::invalid("quantity", value, "empty range"));
        }
    }
    Ok(bounds)
}

/// Parsed instant, remembering whether only a date was given
enum Moment {
    At(DateTime<Utc>),
    Day(NaiveDate),
}

impl Moment {
    fn start(&self) -> DateTime<Utc> {
        match self {
            Moment::At(at) => *at,
            Moment::Day(day) => day.and_time(chrono::NaiveTime::MIN).and_utc(),
        }
    }

    fn end(&self) -> DateTime<Utc> {
        match self {
            Moment::At(at) => *at,
            Moment::Day(_) => self.start() + Duration::days(1) - Duration::nanoseconds(1),
        }
    }
}

/// Accepts RFC 3339, `YYYY-MM-DD HH:MM:SS` (UTC) or `YYYY-MM-DD`
fn parse_moment(field_value: &str, raw: &str) -> Result<Option<Moment>, QueryError> {
    if raw.is_empty() {
        return Ok(None);
    }
    if let Ok(at) = DateTime::parse_from_rfc3339(raw) {
        return Ok(Some(Moment::At(at.with_timezone(&Utc))));
    }
    if let Ok(at) = NaiveDateTime::parse_from_str(raw, TIMESTAMP_DISPLAY_FORMAT) {
        return Ok(Some(Moment::At(at.and_utc())));
    }
    if let Ok(day) = NaiveDate::parse_from_str(raw, "%Y-%m-%d") {
        return Ok(Some(Moment::Day(day)));
    }
    Err(QueryError::invalid(
        "timestamp",
        field_value,
        "expected YYYY-MM-DD, YYYY-MM-DD HH:MM:SS or RFC 3339",
    ))
}

fn parse_timestamp_bounds(value: &str) -> Result<Bounds<DateTime<Utc>>, QueryError> {
    let bounds = match split_range(value) {
        Some((from, to)) => Bounds::new(
            parse_moment(value, from)?.map(|i| i.start()),
            parse_moment(value, to)?.map(|i| i.end()),
        ),
        None => {
            let at = parse_moment(value, value)?;
            Bounds::new(at.as_ref().map(Moment::start), at.as_ref().map(Moment::end))
        }
    };

    if let (Some(from), Some(to)) = (bounds.min, bounds.max) {
        if from > to {
            return Err(QueryError::invalid("timestamp", value, "empty range"));
        }
    }
    Ok(bounds)
}

/// Filter expression over records
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Predicate {
    /// Matches everything
    #[default]
    All,
    Text(TextQuery),
    /// Every constraint must hold
    Fields(Vec<FieldFilter>),
    /// Every predicate must hold
    And(Vec<Predicate>),
}

impl Predicate {
    pub fn text(token: &str) -> Self {
        let query = TextQuery::new(token);
        if query.needle().is_empty() {
            Predicate::All
        } else {
            Predicate::Text(query)
        }
    }

    pub fn fields(filters: Vec<FieldFilter>) -> Self {
        if filters.is_empty() {
            Predicate::All
        } else {
            Predicate::Fields(filters)
        }
    }

    /// Build a predicate from request parameters
    ///
    /// `q` carries the free-text token, every other key names a field.
    /// Parameters with blank values are ignored, as empty form inputs are.
    pub fn from_params<I, K, V>(params: I) -> Result<Self, QueryError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: AsRef<str>,
    {
        let mut text = None;
        let mut filters = Vec::new();

        for (key, value) in params {
            let (key, value) = (key.as_ref(), value.as_ref());
            if value.trim().is_empty() {
                continue;
            }
            if key == "q" {
                text = Some(Predicate::text(value));
            } else {
                filters.push(FieldFilter::parse(key, value)?);
            }
        }

        let fields = Predicate::fields(filters);
        Ok(match text {
            None => fields,
            Some(text) if fields.is_all() => text,
            Some(text) => Predicate::And(vec![fields, text]),
        })
    }

    pub fn is_all(&self) -> bool {
        matches!(self, Predicate::All)
    }

    pub fn matches(&self, record: &Record) -> bool {
        match self {
            Predicate::All => true,
            Predicate::Text(query) => query.matches(record),
            Predicate::Fields(filters) => filters.iter().all(|f| f.matches(record)),
            Predicate::And(predicates) => predicates.iter().all(|p| p.matches(record)),
        }
    }
}
