//! Canonical seed entities and the live "current" instance of each kind
//!
//! A fixture starts as a seed, then gets overwritten with the server's answer
//! after every create/update so later steps see live identifiers. Dependent
//! kinds read their parents' uuids from here: a country needs the current
//! continent, a city needs both the continent and the country.

use earth_common::{
    AnyEntity, City, CityDetails, Continent, ContinentType, Country, CountryDetails, EntityKind,
    UserMinimal,
};
use serde_json::{Map, Value};

use crate::error::{E2eError, E2eResult};
use crate::matcher::{assign, remove_properties};

/// Fields populated by the server only
pub const SYSTEM_FIELDS: [&str; 3] = ["uuid", "created", "updated"];

pub fn default_creator() -> UserMinimal {
    UserMinimal {
        email: "makkara.sinappi@gmail.com".to_string(),
        name: "Makkara Sinappi".to_string(),
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct FixtureCatalog {
    pub continent: Continent,
    pub country: Country,
    pub city: City,
}

impl Default for FixtureCatalog {
    fn default() -> Self {
        Self {
            continent: Continent {
                name: Some("Europe".to_string()),
                kind: Some(ContinentType::Europe),
                area_by_km2: Some(366033131),
                creator: Some(default_creator()),
                ..Default::default()
            },
            country: Country {
                name: Some("Finland".to_string()),
                details: Some(CountryDetails {
                    phone_code: Some("358".to_string()),
                    iso_code: Some("FI / FIN".to_string()),
                    currency: Some("€".to_string()),
                    continent: Some(Continent::default()),
                    ..Default::default()
                }),
                creator: Some(default_creator()),
                ..Default::default()
            },
            city: City {
                name: Some("Helsinki".to_string()),
                details: Some(CityDetails {
                    is_capital: Some(true),
                    ..Default::default()
                }),
                creator: Some(default_creator()),
                ..Default::default()
            },
        }
    }
}

impl FixtureCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn current(&self, kind: EntityKind) -> AnyEntity {
        match kind {
            EntityKind::Continent => self.continent.clone().into(),
            EntityKind::Country => self.country.clone().into(),
            EntityKind::City => self.city.clone().into(),
        }
    }

    pub fn current_value(&self, kind: EntityKind) -> E2eResult<Value> {
        Ok(self.current(kind).to_value()?)
    }

    /// Live uuid of the current fixture, `None` until it has been created
    pub fn uuid(&self, kind: EntityKind) -> Option<&str> {
        let uuid = match kind {
            EntityKind::Continent => self.continent.uuid.as_deref(),
            EntityKind::Country => self.country.uuid.as_deref(),
            EntityKind::City => self.city.uuid.as_deref(),
        };
        uuid.filter(|u| !u.is_empty())
    }

    /// Supersede the current fixture of the entity's kind
    pub fn replace(&mut self, entity: AnyEntity) {
        match entity {
            AnyEntity::Continent(c) => self.continent = c,
            AnyEntity::Country(c) => self.country = c,
            AnyEntity::City(c) => self.city = c,
        }
    }

    pub fn replace_value(&mut self, kind: EntityKind, value: Value) -> E2eResult<()> {
        self.replace(AnyEntity::from_value(kind, value)?);
        Ok(())
    }

    /// Merge `patch` onto the current fixture, e.g. to customise seeds
    pub fn seed(&mut self, kind: EntityKind, patch: &Value) -> E2eResult<()> {
        let merged = assign(&self.current_value(kind)?, patch);
        self.replace_value(kind, merged)
    }

    /// Live parent references, e.g. `{"continent_uuid": ...}` for a country
    fn parent_refs(&self, kind: EntityKind) -> E2eResult<Value> {
        let mut refs = Map::new();
        for parent in kind.parents() {
            let uuid = self
                .uuid(*parent)
                .ok_or(E2eError::MissingParent {
                    kind,
                    parent: *parent,
                })?;
            refs.insert(
                parent.reference_field().to_string(),
                Value::String(uuid.to_string()),
            );
        }
        Ok(Value::Object(refs))
    }

    /// Body for creating the current fixture. Fields already on the fixture
    /// win over the injected parent references.
    pub fn create_payload(&self, kind: EntityKind) -> E2eResult<Value> {
        Ok(assign(&self.parent_refs(kind)?, &self.current_value(kind)?))
    }

    /// Body for updating the current fixture with `patch`; keeps its uuid
    pub fn update_payload(&self, kind: EntityKind, patch: &Value) -> E2eResult<Value> {
        Ok(assign(&self.current_value(kind)?, patch))
    }

    /// Body for a fresh sibling of the current fixture: system fields
    /// stripped, then `patch` applied
    pub fn sibling_payload(&self, kind: EntityKind, patch: &Value) -> E2eResult<Value> {
        let base = remove_properties(&self.current_value(kind)?, &SYSTEM_FIELDS);
        let base = assign(&self.parent_refs(kind)?, &base);
        Ok(assign(&base, patch))
    }
}
