//! Case-insensitive substring search over catalog records.

use crate::models::{Coffee, Distributor};

/// A normalised search query. Blank queries match everything.
#[derive(Debug, Clone)]
pub struct Query {
    needle: Option<String>,
}

impl Query {
    pub fn new(raw: &str) -> Self {
        let trimmed = raw.trim();
        Self {
            needle: (!trimmed.is_empty()).then(|| trimmed.to_lowercase()),
        }
    }

    pub fn is_blank(&self) -> bool {
        self.needle.is_none()
    }

    /// Returns true if any of `fields` contains the query.
    pub fn matches_any<'a>(&self, fields: impl IntoIterator<Item = &'a str>) -> bool {
        match &self.needle {
            None => true,
            Some(needle) => fields
                .into_iter()
                .any(|field| field.to_lowercase().contains(needle.as_str())),
        }
    }
}

pub(crate) fn distributor_matches(query: &Query, d: &Distributor) -> bool {
    query.matches_any([
        d.name.as_str(),
        d.country.as_str(),
        d.region.as_str(),
        d.contact.as_str(),
        d.description.as_str(),
    ])
}

/// `distributor_name` is the resolved owner name, empty when unknown.
pub(crate) fn coffee_matches(query: &Query, c: &Coffee, distributor_name: &str) -> bool {
    query.matches_any([
        c.name.as_str(),
        c.origin.as_str(),
        c.variety.as_str(),
        c.process.as_str(),
        c.roast_level.as_str(),
        c.notes.as_str(),
        distributor_name,
    ])
}
