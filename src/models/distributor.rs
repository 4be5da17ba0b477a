use serde::{Deserialize, Serialize};
use std::fmt;

use super::new_id;

/// A coffee distributor (roaster, importer or farm shop).
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Distributor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub country: String,
    #[serde(default)]
    pub region: String,
    #[serde(default)]
    pub contact: String,
    #[serde(default)]
    pub description: String,
}

/// Editable distributor fields, as submitted by the add/update forms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DistributorFields {
    pub name: String,
    pub country: String,
    pub region: String,
    pub contact: String,
    pub description: String,
}

impl DistributorFields {
    pub fn new(
        name: impl Into<String>,
        country: impl Into<String>,
        region: impl Into<String>,
        contact: impl Into<String>,
    ) -> Self {
        Self {
            name: name.into(),
            country: country.into(),
            region: region.into(),
            contact: contact.into(),
            description: String::new(),
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = description.into();
        self
    }

    /// Returns the first required field that is blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("country", &self.country),
            ("region", &self.region),
            ("contact", &self.contact),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }
}

impl From<&Distributor> for DistributorFields {
    fn from(d: &Distributor) -> Self {
        Self {
            name: d.name.clone(),
            country: d.country.clone(),
            region: d.region.clone(),
            contact: d.contact.clone(),
            description: d.description.clone(),
        }
    }
}

impl Distributor {
    pub fn new(fields: DistributorFields) -> Self {
        let mut distributor = Self {
            id: new_id(),
            name: String::new(),
            country: String::new(),
            region: String::new(),
            contact: String::new(),
            description: String::new(),
        };
        distributor.apply(fields);
        distributor
    }

    /// Overwrites every editable field, keeping the id.
    pub fn apply(&mut self, fields: DistributorFields) {
        self.name = fields.name.trim().to_string();
        self.country = fields.country.trim().to_string();
        self.region = fields.region.trim().to_string();
        self.contact = fields.contact.trim().to_string();
        self.description = fields.description.trim().to_string();
    }

    /// "Region, Country" with empty parts left out.
    pub fn location(&self) -> String {
        [self.region.as_str(), self.country.as_str()]
            .into_iter()
            .filter(|s| !s.is_empty())
            .collect::<Vec<_>>()
            .join(", ")
    }
}

impl fmt::Display for Distributor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "{}", self.name)?;
        writeln!(f, "{}", "=".repeat(self.name.chars().count()))?;
        writeln!(f, "ID: {}", self.id)?;
        writeln!(f, "Location: {}", self.location())?;
        writeln!(f, "Contact: {}", self.contact)?;
        if self.description.is_empty() {
            writeln!(f, "\nNo additional description.")?;
        } else {
            writeln!(f, "\n{}", self.description)?;
        }
        Ok(())
    }
}
