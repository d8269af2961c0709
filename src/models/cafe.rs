use chrono::{Duration, Local, NaiveDateTime};
use serde::Serialize;
use sqlx::FromRow;
use std::collections::BTreeMap;
use std::fmt;

/// Storage format of `last_visited`. Fixed width, so string order matches time order.
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Length of the window during which a visited cafe is skipped by the picker.
pub const REVISIT_WINDOW_DAYS: i64 = 7;

#[derive(Debug, Clone, Serialize, FromRow)]
pub struct Cafe {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub last_visited: Option<String>,
}

impl Cafe {
    pub fn last_visited_at(&self) -> Option<NaiveDateTime> {
        let raw = self.last_visited.as_deref()?;
        match parse_timestamp(raw) {
            Some(ts) => Some(ts),
            None => {
                tracing::warn!(id = self.id, last_visited = raw, "unparseable last_visited");
                None
            }
        }
    }

    pub fn visited_since(&self, cutoff: NaiveDateTime) -> bool {
        self.last_visited_at().is_some_and(|ts| ts >= cutoff)
    }
}

/// A cafe annotated for display.
#[derive(Debug, Clone, Serialize)]
pub struct CafeView {
    pub id: i64,
    pub name: String,
    pub url: String,
    pub last_visited: Option<String>,
    #[serde(skip)]
    pub last_visited_label: Option<String>,
    pub visited_this_week: bool,
    #[serde(skip)]
    pub is_selected: bool,
}

impl CafeView {
    pub fn new(cafe: Cafe, now: NaiveDateTime) -> Self {
        let visited_this_week = cafe.visited_since(revisit_cutoff(now));
        let last_visited_label = cafe.last_visited_at().map(|ts| format_last_visited(ts, now));
        Self {
            id: cafe.id,
            name: cafe.name,
            url: cafe.url,
            last_visited: cafe.last_visited,
            last_visited_label,
            visited_this_week,
            is_selected: false,
        }
    }

    pub fn last_visited_display(&self) -> &str {
        self.last_visited_label.as_deref().unwrap_or("never")
    }
}

pub fn now_local() -> NaiveDateTime {
    Local::now().naive_local()
}

pub fn format_timestamp(ts: NaiveDateTime) -> String {
    ts.format(TIMESTAMP_FORMAT).to_string()
}

pub fn parse_timestamp(raw: &str) -> Option<NaiveDateTime> {
    NaiveDateTime::parse_from_str(raw, TIMESTAMP_FORMAT).ok()
}

/// Oldest visit time that still counts as "this week" at `now`.
pub fn revisit_cutoff(now: NaiveDateTime) -> NaiveDateTime {
    now - Duration::days(REVISIT_WINDOW_DAYS)
}

fn format_last_visited(visited: NaiveDateTime, now: NaiveDateTime) -> String {
    let diff = now - visited;

    if diff.num_days() > 30 {
        format!("{} months ago", diff.num_days() / 30)
    } else if diff.num_days() == 1 {
        "yesterday".to_string()
    } else if diff.num_days() > 0 {
        format!("{} days ago", diff.num_days())
    } else if diff.num_hours() > 0 {
        format!("{} hours ago", diff.num_hours())
    } else {
        "just now".to_string()
    }
}

/// Field name to message, in field order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, String>);

impl FieldErrors {
    pub fn insert(&mut self, field: &str, message: impl Into<String>) {
        self.0.insert(field.to_string(), message.into());
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl fmt::Display for FieldErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (field, message) in &self.0 {
            if !first {
                f.write_str("; ")?;
            }
            write!(f, "{field}: {message}")?;
            first = false;
        }
        Ok(())
    }
}

/// Trimmed, non-empty name and url for an add or update.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CafeInput {
    pub name: String,
    pub url: String,
}

impl CafeInput {
    pub fn parse(name: &str, url: &str) -> Result<Self, FieldErrors> {
        let name = name.trim();
        let url = url.trim();
        let mut errors = FieldErrors::default();

        if name.is_empty() {
            errors.insert("cafe_name", "Name is required");
        }
        if url.is_empty() {
            errors.insert("cafe_url", "URL is required");
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(Self {
            name: name.to_string(),
            url: normalize_url(url),
        })
    }
}

/// Prefixes `https://` onto a bare host such as `bluebottlecoffee.com`.
/// Anything else is stored as typed.
fn normalize_url(url: &str) -> String {
    match url::Url::parse(url) {
        Err(url::ParseError::RelativeUrlWithoutBase) => {
            let prefixed = format!("https://{url}");
            match url::Url::parse(&prefixed) {
                Ok(parsed) if parsed.host_str().is_some_and(|h| h.contains('.')) => prefixed,
                _ => url.to_string(),
            }
        }
        _ => url.to_string(),
    }
}
