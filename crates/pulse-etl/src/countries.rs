//! Static country reference data
//!
//! Maps country name to ISO code and geocoordinates. Loaded once at startup
//! and never mutated; the position of a country in the directory (1-based)
//! is its surrogate id in the `country` table, so the entry order is part of
//! the schema contract.

/// Geocoordinates of the reference observation point for a country
#[derive(Debug, Clone, PartialEq)]
pub struct Coordinates {
    pub lat: &'static str,
    pub lon: &'static str,
    pub alt: &'static str,
    /// Reference city used in raw artifact filenames
    pub city: &'static str,
}

/// One immutable country entry
#[derive(Debug, Clone, PartialEq)]
pub struct Country {
    /// Lowercase natural key
    pub name: &'static str,
    /// ISO 3166-1 alpha-2 code
    pub code: &'static str,
    pub coordinates: Coordinates,
}

const DEFAULT_COUNTRIES: &[Country] = &[
    Country {
        name: "greece",
        code: "GR",
        coordinates: Coordinates {
            lat: "37.98",
            lon: "23.73",
            alt: "43",
            city: "athens",
        },
    },
    Country {
        name: "thailand",
        code: "TH",
        coordinates: Coordinates {
            lat: "13.75",
            lon: "100.50",
            alt: "43",
            city: "bangkok",
        },
    },
    Country {
        name: "norway",
        code: "NO",
        coordinates: Coordinates {
            lat: "59.91",
            lon: "10.75",
            alt: "23",
            city: "oslo",
        },
    },
];

/// Immutable directory of the countries the pipeline ingests
#[derive(Debug, Clone)]
pub struct CountryDirectory {
    entries: Vec<Country>,
}

impl Default for CountryDirectory {
    fn default() -> Self {
        Self {
            entries: DEFAULT_COUNTRIES.to_vec(),
        }
    }
}

impl CountryDirectory {
    /// All entries in deterministic enumeration order
    pub fn entries(&self) -> &[Country] {
        &self.entries
    }

    /// Country names in enumeration order
    pub fn names(&self) -> Vec<&'static str> {
        self.entries.iter().map(|c| c.name).collect()
    }

    /// Look up a country by name; comparison is case-normalized
    pub fn get(&self, name: &str) -> Option<&Country> {
        let lowered = name.to_lowercase();
        self.entries.iter().find(|c| c.name == lowered)
    }

    /// Coordinates for a country, if known
    pub fn coordinates(&self, name: &str) -> Option<&Coordinates> {
        self.get(name).map(|c| &c.coordinates)
    }

    /// ISO code for a country, if known
    pub fn code(&self, name: &str) -> Option<&'static str> {
        self.get(name).map(|c| c.code)
    }
}
