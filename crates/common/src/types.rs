//! Core entity types for the Earth REST API

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;
use crate::API_PREFIX;

/// Minimal user record attached to every entity as its creator
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserMinimal {
    pub email: String,
    pub name: String,
}

/// Continent classification, serialized as its integer code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum ContinentType {
    Invalid = 0,
    Asia = 1,
    Africa = 2,
    Europe = 3,
    NorthAmerica = 4,
    SouthAmerica = 5,
    Oceania = 6,
    Antarctica = 7,
}

impl Default for ContinentType {
    fn default() -> Self {
        Self::Invalid
    }
}

impl TryFrom<u8> for ContinentType {
    type Error = Error;

    fn try_from(code: u8) -> Result<Self, Self::Error> {
        match code {
            0 => Ok(Self::Invalid),
            1 => Ok(Self::Asia),
            2 => Ok(Self::Africa),
            3 => Ok(Self::Europe),
            4 => Ok(Self::NorthAmerica),
            5 => Ok(Self::SouthAmerica),
            6 => Ok(Self::Oceania),
            7 => Ok(Self::Antarctica),
            other => Err(Error::UnknownContinentType(other)),
        }
    }
}

impl From<ContinentType> for u8 {
    fn from(kind: ContinentType) -> Self {
        kind as u8
    }
}

/// A continent.
///
/// `uuid`, `created` and `updated` are populated by the server only and are
/// left out of the serialized form while unset.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Continent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    pub kind: Option<ContinentType>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub area_by_km2: Option<i64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserMinimal>,

    /// Timestamps are opaque: continents carry protobuf timestamp objects,
    /// countries and cities RFC 3339 strings.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<serde_json::Value>,

    /// Fields not modelled above, carried verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Country-specific details.
///
/// `continent` is an informational back-reference, never a source of truth.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CountryDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub phone_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub iso_code: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub currency: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<Continent>,

    /// Fields not modelled above, carried verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Country {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent_uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<CountryDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserMinimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<serde_json::Value>,

    /// Fields not modelled above, carried verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// City-specific details, with optional back-references to its parents
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CityDetails {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub is_capital: Option<bool>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent: Option<Continent>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country: Option<Country>,

    /// Fields not modelled above, carried verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct City {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub continent_uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub country_uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub uuid: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<CityDetails>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub creator: Option<UserMinimal>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub created: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub updated: Option<serde_json::Value>,

    /// Fields not modelled above, carried verbatim
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// Entity kinds served by the API
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntityKind {
    Continent,
    Country,
    City,
}

impl EntityKind {
    pub const ALL: [EntityKind; 3] = [Self::Continent, Self::Country, Self::City];

    pub fn as_str(&self) -> &'static str {
        match self {
            EntityKind::Continent => "continent",
            EntityKind::Country => "country",
            EntityKind::City => "city",
        }
    }

    fn plural(&self) -> &'static str {
        match self {
            EntityKind::Continent => "continents",
            EntityKind::Country => "countries",
            EntityKind::City => "cities",
        }
    }

    /// POST endpoint creating one entity
    pub fn create_path(&self) -> String {
        format!("{}/{}/create", API_PREFIX, self.as_str())
    }

    /// PUT endpoint updating one entity identified by the body's uuid
    pub fn update_path(&self) -> String {
        format!("{}/{}/update", API_PREFIX, self.as_str())
    }

    /// DELETE endpoint; the uuid travels as the `uuid` query parameter
    pub fn delete_path(&self) -> String {
        format!("{}/{}/delete", API_PREFIX, self.as_str())
    }

    /// GET endpoint listing every live entity of this kind
    pub fn list_path(&self) -> String {
        format!("{}/{}", API_PREFIX, self.plural())
    }

    /// Kinds whose live uuid must exist before this kind can be created
    pub fn parents(&self) -> &'static [EntityKind] {
        match self {
            EntityKind::Continent => &[],
            EntityKind::Country => &[EntityKind::Continent],
            EntityKind::City => &[EntityKind::Continent, EntityKind::Country],
        }
    }

    /// Field a child carries to reference an entity of this kind
    pub fn reference_field(&self) -> &'static str {
        match self {
            EntityKind::Continent => "continent_uuid",
            EntityKind::Country => "country_uuid",
            EntityKind::City => "city_uuid",
        }
    }
}

impl fmt::Display for EntityKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EntityKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "continent" | "continents" => Ok(Self::Continent),
            "country" | "countries" => Ok(Self::Country),
            "city" | "cities" => Ok(Self::City),
            _ => Err(Error::UnknownKind(s.to_string())),
        }
    }
}

/// Any entity the API hands back, tagged by kind
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", content = "entity", rename_all = "snake_case")]
pub enum AnyEntity {
    Continent(Continent),
    Country(Country),
    City(City),
}

impl AnyEntity {
    pub fn kind(&self) -> EntityKind {
        match self {
            AnyEntity::Continent(_) => EntityKind::Continent,
            AnyEntity::Country(_) => EntityKind::Country,
            AnyEntity::City(_) => EntityKind::City,
        }
    }

    /// Server-assigned identifier, `None` before creation
    pub fn uuid(&self) -> Option<&str> {
        let uuid = match self {
            AnyEntity::Continent(c) => c.uuid.as_deref(),
            AnyEntity::Country(c) => c.uuid.as_deref(),
            AnyEntity::City(c) => c.uuid.as_deref(),
        };
        uuid.filter(|u| !u.is_empty())
    }

    /// Bare entity of `kind` known only by its uuid
    pub fn with_uuid(kind: EntityKind, uuid: impl Into<String>) -> Self {
        let uuid = Some(uuid.into());
        match kind {
            EntityKind::Continent => Continent {
                uuid,
                ..Default::default()
            }
            .into(),
            EntityKind::Country => Country {
                uuid,
                ..Default::default()
            }
            .into(),
            EntityKind::City => City {
                uuid,
                ..Default::default()
            }
            .into(),
        }
    }

    pub fn name(&self) -> Option<&str> {
        match self {
            AnyEntity::Continent(c) => c.name.as_deref(),
            AnyEntity::Country(c) => c.name.as_deref(),
            AnyEntity::City(c) => c.name.as_deref(),
        }
    }

    /// Serialized body as exchanged with the API
    pub fn to_value(&self) -> serde_json::Result<serde_json::Value> {
        match self {
            AnyEntity::Continent(c) => serde_json::to_value(c),
            AnyEntity::Country(c) => serde_json::to_value(c),
            AnyEntity::City(c) => serde_json::to_value(c),
        }
    }

    /// Decode an API body as an entity of the given kind
    pub fn from_value(kind: EntityKind, value: serde_json::Value) -> serde_json::Result<Self> {
        Ok(match kind {
            EntityKind::Continent => AnyEntity::Continent(serde_json::from_value(value)?),
            EntityKind::Country => AnyEntity::Country(serde_json::from_value(value)?),
            EntityKind::City => AnyEntity::City(serde_json::from_value(value)?),
        })
    }
}

impl From<Continent> for AnyEntity {
    fn from(value: Continent) -> Self {
        AnyEntity::Continent(value)
    }
}

impl From<Country> for AnyEntity {
    fn from(value: Country) -> Self {
        AnyEntity::Country(value)
    }
}

impl From<City> for AnyEntity {
    fn from(value: City) -> Self {
        AnyEntity::City(value)
    }
}
