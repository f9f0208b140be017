//! Page requests, page responses and the filter-query builder.

use std::fmt;

use serde::Serialize;

/// Default page size when the caller does not specify one.
pub const DEFAULT_LIMIT: u32 = 50;

/// Largest page the management API serves.
pub const MAX_LIMIT: u32 = 500;

// ---------------------------------------------------------------------------
// ListQuery / Page
// ---------------------------------------------------------------------------

/// One page request against a list endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListQuery {
    pub limit: u32,
    pub offset: Option<u32>,
    pub filter: Option<FilterExpr>,
    /// Server-side ordering, e.g. `createdAt:DESC`.
    pub sort: Option<String>,
}

impl Default for ListQuery {
    fn default() -> Self {
        Self::limit(DEFAULT_LIMIT)
    }
}

impl ListQuery {
    pub fn limit(limit: u32) -> Self {
        Self {
            limit: limit.clamp(1, MAX_LIMIT),
            offset: None,
            filter: None,
            sort: None,
        }
    }

    pub fn with_offset(mut self, offset: u32) -> Self {
        self.offset = Some(offset);
        self
    }

    pub fn with_filter(mut self, filter: FilterExpr) -> Self {
        self.filter = Some(filter);
        self
    }

    pub fn with_sort(mut self, sort: impl Into<String>) -> Self {
        self.sort = Some(sort.into());
        self
    }

    /// Query-string pairs (`limit`, `offset`, `q`, `sort`).
    pub fn params(&self) -> Vec<(&'static str, String)> {
        let mut params = vec![("limit", self.limit.to_string())];
        if let Some(offset) = self.offset {
            params.push(("offset", offset.to_string()));
        }
        if let Some(filter) = &self.filter {
            params.push(("q", filter.to_string()));
        }
        if let Some(sort) = &self.sort {
            params.push(("sort", sort.clone()));
        }
        params
    }
}

/// One page of results plus the backend's total match count.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Page<T> {
    pub content: Vec<T>,
    pub total: u64,
}

impl<T> Page<T> {
    pub fn empty() -> Self {
        Self {
            content: Vec::new(),
            total: 0,
        }
    }
}

impl<T> Default for Page<T> {
    fn default() -> Self {
        Self::empty()
    }
}

// ---------------------------------------------------------------------------
// FilterExpr
// ---------------------------------------------------------------------------

/// A filter-query expression (`field==value`, `;` for and, `,` for or,
/// `*` as wildcard).
///
/// Only construction lives here; the server interprets the result.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FilterExpr {
    text: String,
    /// Top-level `,` present; needs parentheses under `;`.
    disjunction: bool,
}

/// Characters that force a value to be quoted.
const RESERVED: &[char] = &[';', ',', '(', ')', '"', '\'', ' ', '=', '!', '<', '>'];

fn quote(value: &str) -> String {
    if value.is_empty() || value.contains(RESERVED) {
        format!("\"{}\"", value.replace('\\', "\\\\").replace('"', "\\\""))
    } else {
        value.to_string()
    }
}

impl FilterExpr {
    fn comparison(field: &str, op: &str, value: &str) -> Self {
        Self {
            text: format!("{field}{op}{}", quote(value)),
            disjunction: false,
        }
    }

    /// `field==value`. A `*` inside `value` is passed through as a wildcard.
    pub fn eq(field: &str, value: &str) -> Self {
        Self::comparison(field, "==", value)
    }

    /// `field!=value`.
    pub fn ne(field: &str, value: &str) -> Self {
        Self::comparison(field, "!=", value)
    }

    /// `field==*value*`.
    pub fn contains(field: &str, value: &str) -> Self {
        Self::eq(field, &format!("*{value}*"))
    }

    /// `field==a,field==b,...`; `None` for an empty set.
    pub fn any_of<I, S>(field: &str, values: I) -> Option<Self>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        values
            .into_iter()
            .map(|v| Self::eq(field, v.as_ref()))
            .reduce(Self::or)
    }

    /// `self;other`.
    pub fn and(self, other: FilterExpr) -> Self {
        Self {
            text: format!("{};{}", self.grouped(), other.grouped()),
            disjunction: false,
        }
    }

    /// `self,other`.
    pub fn or(self, other: FilterExpr) -> Self {
        Self {
            text: format!("{},{}", self.text, other.text),
            disjunction: true,
        }
    }

    /// Wrap caller-supplied raw filter text.
    pub fn raw(text: impl Into<String>) -> Self {
        let text = text.into();
        let disjunction = top_level_contains(&text, ',');
        Self { text, disjunction }
    }

    pub fn as_str(&self) -> &str {
        &self.text
    }

    fn grouped(&self) -> String {
        if self.disjunction {
            format!("({})", self.text)
        } else {
            self.text.clone()
        }
    }
}

/// Whether `needle` occurs outside parentheses and quotes.
fn top_level_contains(text: &str, needle: char) -> bool {
    let mut depth = 0usize;
    let mut quoted = false;
    let mut escaped = false;
    for c in text.chars() {
        match c {
            _ if escaped => escaped = false,
            '\\' if quoted => escaped = true,
            '"' => quoted = !quoted,
            '(' if !quoted => depth += 1,
            ')' if !quoted => depth = depth.saturating_sub(1),
            c if c == needle && !quoted && depth == 0 => return true,
            _ => {}
        }
    }
    false
}

impl fmt::Display for FilterExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}
