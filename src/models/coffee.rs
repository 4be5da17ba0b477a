use serde::{Deserialize, Serialize};
use std::fmt;

use super::new_id;
use super::number::lenient_f64;

/// Package sizes a coffee is priced at.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PriceTier {
    Grams250,
    Grams500,
    Kilo,
}

impl PriceTier {
    pub const ALL: [PriceTier; 3] = [PriceTier::Grams250, PriceTier::Grams500, PriceTier::Kilo];

    pub fn grams(self) -> u32 {
        match self {
            PriceTier::Grams250 => 250,
            PriceTier::Grams500 => 500,
            PriceTier::Kilo => 1000,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            PriceTier::Grams250 => "250g",
            PriceTier::Grams500 => "500g",
            PriceTier::Kilo => "1kg",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Coffee {
    pub id: String,
    /// Owning distributor; may be empty or point at a deleted distributor.
    #[serde(default)]
    pub distributor_id: String,
    pub name: String,
    #[serde(default)]
    pub origin: String,
    /// Metres above sea level.
    #[serde(default, deserialize_with = "lenient_f64")]
    pub altitude: f64,
    #[serde(default)]
    pub variety: String,
    #[serde(default)]
    pub process: String,
    #[serde(default)]
    pub roast_level: String,
    /// Cupping score (SCA scale).
    #[serde(default, deserialize_with = "lenient_f64")]
    pub score: f64,
    /// Tasting notes.
    #[serde(default)]
    pub notes: String,
    #[serde(rename = "price250", default, deserialize_with = "lenient_f64")]
    pub price_250g: f64,
    #[serde(rename = "price500", default, deserialize_with = "lenient_f64")]
    pub price_500g: f64,
    #[serde(rename = "price1000", default, deserialize_with = "lenient_f64")]
    pub price_1kg: f64,
}

/// Editable coffee fields, as submitted by the add/update forms.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CoffeeFields {
    pub distributor_id: String,
    pub name: String,
    pub origin: String,
    pub altitude: f64,
    pub variety: String,
    pub process: String,
    pub roast_level: String,
    pub score: f64,
    pub notes: String,
    pub price_250g: f64,
    pub price_500g: f64,
    pub price_1kg: f64,
}

impl CoffeeFields {
    pub fn new(
        distributor_id: impl Into<String>,
        name: impl Into<String>,
        origin: impl Into<String>,
    ) -> Self {
        Self {
            distributor_id: distributor_id.into(),
            name: name.into(),
            origin: origin.into(),
            ..Self::default()
        }
    }

    pub fn with_profile(
        mut self,
        variety: impl Into<String>,
        process: impl Into<String>,
        roast_level: impl Into<String>,
    ) -> Self {
        self.variety = variety.into();
        self.process = process.into();
        self.roast_level = roast_level.into();
        self
    }

    pub fn with_altitude(mut self, metres: f64) -> Self {
        self.altitude = metres;
        self
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = score;
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = notes.into();
        self
    }

    pub fn with_prices(mut self, price_250g: f64, price_500g: f64, price_1kg: f64) -> Self {
        self.price_250g = price_250g;
        self.price_500g = price_500g;
        self.price_1kg = price_1kg;
        self
    }

    /// Returns the first required text field that is blank, if any.
    pub fn missing_field(&self) -> Option<&'static str> {
        [
            ("name", &self.name),
            ("origin", &self.origin),
            ("variety", &self.variety),
            ("process", &self.process),
            ("roast_level", &self.roast_level),
        ]
        .into_iter()
        .find(|(_, value)| value.trim().is_empty())
        .map(|(field, _)| field)
    }

    /// Returns the first numeric field that is negative or not finite, if any.
    pub fn invalid_number(&self) -> Option<&'static str> {
        [
            ("altitude", self.altitude),
            ("score", self.score),
            ("price_250g", self.price_250g),
            ("price_500g", self.price_500g),
            ("price_1kg", self.price_1kg),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite() || *value < 0.0)
        .map(|(field, _)| field)
    }
}

impl From<&Coffee> for CoffeeFields {
    fn from(c: &Coffee) -> Self {
        Self {
            distributor_id: c.distributor_id.clone(),
            name: c.name.clone(),
            origin: c.origin.clone(),
            altitude: c.altitude,
            variety: c.variety.clone(),
            process: c.process.clone(),
            roast_level: c.roast_level.clone(),
            score: c.score,
            notes: c.notes.clone(),
            price_250g: c.price_250g,
            price_500g: c.price_500g,
            price_1kg: c.price_1kg,
        }
    }
}

impl Coffee {
    pub fn new(fields: CoffeeFields) -> Self {
        let mut coffee = Self {
            id: new_id(),
            distributor_id: String::new(),
            name: String::new(),
            origin: String::new(),
            altitude: 0.0,
            variety: String::new(),
            process: String::new(),
            roast_level: String::new(),
            score: 0.0,
            notes: String::new(),
            price_250g: 0.0,
            price_500g: 0.0,
            price_1kg: 0.0,
        };
        coffee.apply(fields);
        coffee
    }

    /// Overwrites every editable field, keeping the id.
    pub fn apply(&mut self, fields: CoffeeFields) {
        self.distributor_id = fields.distributor_id.trim().to_string();
        self.name = fields.name.trim().to_string();
        self.origin = fields.origin.trim().to_string();
        self.altitude = fields.altitude;
        self.variety = fields.variety.trim().to_string();
        self.process = fields.process.trim().to_string();
        self.roast_level = fields.roast_level.trim().to_string();
        self.score = fields.score;
        self.notes = fields.notes.trim().to_string();
        self.price_250g = fields.price_250g;
        self.price_500g = fields.price_500g;
        self.price_1kg = fields.price_1kg;
    }

    pub fn price(&self, tier: PriceTier) -> f64 {
        match tier {
            PriceTier::Grams250 => self.price_250g,
            PriceTier::Grams500 => self.price_500g,
            PriceTier::Kilo => self.price_1kg,
        }
    }

    /// Unit price per 100 g for a package size.
    pub fn price_per_100g(&self, tier: PriceTier) -> f64 {
        self.price(tier) * 100.0 / f64::from(tier.grams())
    }

    /// Renders the coffee with the given distributor label.
    pub fn render(&self, distributor: &str) -> String {
        let mut out = String::new();
        let title = format!("{} · {}", self.name, distributor);
        out.push_str(&format!("{}\n", title));
        out.push_str(&format!("{}\n", "=".repeat(title.chars().count())));
        out.push_str(&format!("ID: {}\n", self.id));
        out.push_str(&format!("Origin: {}\n", self.origin));
        out.push_str(&format!("SCA score: {} points\n", self.score));
        out.push_str(&format!("Altitude: {} masl\n", self.altitude));
        out.push_str(&format!("Variety: {}\n", self.variety));
        out.push_str(&format!("Process: {}\n", self.process));
        out.push_str(&format!("Roast: {}\n", self.roast_level));
        if !self.notes.is_empty() {
            out.push_str(&format!("Tasting notes: {}\n", self.notes));
        }
        out.push_str("\nPrices:\n");
        for tier in PriceTier::ALL {
            out.push_str(&format!(
                "  {:<5} ${:.2} (${:.2}/100g)\n",
                tier.label(),
                self.price(tier),
                self.price_per_100g(tier)
            ));
        }
        out
    }
}

impl fmt::Display for Coffee {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({}) ${:.2}/500g", self.name, self.origin, self.price_500g)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn fields() -> CoffeeFields {
        CoffeeFields::new("d1", "Geisha Lot 7", "Huila")
            .with_profile("Geisha", "Washed", "Light")
            .with_altitude(1850.0)
            .with_score(88.5)
            .with_notes("jasmine, bergamot")
            .with_prices(15.0, 27.5, 50.0)
    }

    #[test]
    fn test_price_per_100g() {
        let coffee = Coffee::new(fields());
        assert_eq!(coffee.price_per_100g(PriceTier::Grams250), 6.0);
        assert_eq!(coffee.price_per_100g(PriceTier::Grams500), 5.5);
        assert_eq!(coffee.price_per_100g(PriceTier::Kilo), 5.0);
    }

    #[test]
    fn test_missing_field() {
        assert_eq!(fields().missing_field(), None);

        let mut f = fields();
        f.roast_level = String::new();
        assert_eq!(f.missing_field(), Some("roast_level"));

        // distributor is optional
        let mut f = fields();
        f.distributor_id = String::new();
        assert_eq!(f.missing_field(), None);
    }

    #[test]
    fn test_invalid_number() {
        assert_eq!(fields().invalid_number(), None);
        assert_eq!(fields().with_score(-1.0).invalid_number(), Some("score"));
        assert_eq!(
            fields().with_altitude(f64::NAN).invalid_number(),
            Some("altitude")
        );
    }

    #[test]
    fn test_json_uses_legacy_field_names() {
        let coffee = Coffee::new(fields());
        let value = serde_json::to_value(&coffee).unwrap();
        assert_eq!(value["distributorId"], "d1");
        assert_eq!(value["roastLevel"], "Light");
        assert_eq!(value["notes"], "jasmine, bergamot");
        assert_eq!(value["price500"], 27.5);
        assert_eq!(value["price1000"], 50.0);
    }

    #[test]
    fn test_reads_string_numbers() {
        let json = r#"{"id":"1","distributorId":"9","name":"Bourbon","origin":"Nariño",
            "altitude":"2000","variety":"Bourbon","process":"Natural","roastLevel":"Medium",
            "score":"86","notes":"cacao","price250":"12","price500":"22.50","price1000":""}"#;
        let coffee: Coffee = serde_json::from_str(json).unwrap();
        assert_eq!(coffee.altitude, 2000.0);
        assert_eq!(coffee.score, 86.0);
        assert_eq!(coffee.price_500g, 22.5);
        assert_eq!(coffee.price_1kg, 0.0);
    }

    #[test]
    fn test_render() {
        let coffee = Coffee::new(fields());
        let output = coffee.render("Finca Alta");
        assert!(output.contains("Geisha Lot 7 · Finca Alta"));
        assert!(output.contains("SCA score: 88.5 points"));
        assert!(output.contains("$27.50 ($5.50/100g)"));
    }
}
