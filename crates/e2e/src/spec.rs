//! Declarative YAML test specification

use std::collections::HashMap;
use std::path::Path;

use earth_common::EntityKind;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

use crate::error::{E2eError, E2eResult};

/// A complete test specification parsed from YAML
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TestSpec {
    /// Unique name for this test
    pub name: String,

    /// Human-readable description
    #[serde(default)]
    pub description: String,

    /// Tags for filtering tests
    #[serde(default)]
    pub tags: Vec<String>,

    /// Patches merged onto the built-in seed fixtures before the first step
    #[serde(default)]
    pub fixtures: HashMap<EntityKind, Value>,

    /// Per-step timeout override
    #[serde(default)]
    pub step_timeout_ms: Option<u64>,

    /// Steps to execute in order
    pub steps: Vec<TestStep>,
}

/// A single step in a test
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum TestStep {
    /// GET the ping endpoint and expect 200
    Ping,

    /// Create the current fixture and adopt the server's answer
    Create { kind: EntityKind },

    /// Merge `patch` onto the current fixture, PUT it, adopt the answer
    Update { kind: EntityKind, patch: Value },

    /// Create a sibling of the current fixture and track it under `group`
    CreateForDelete {
        kind: EntityKind,
        #[serde(default)]
        patch: Value,
        group: String,
    },

    /// Delete every member of a tracker group concurrently
    DeleteGroup { group: String },

    /// List entities of a kind, optionally asserting how many there are
    List {
        kind: EntityKind,
        #[serde(default)]
        expect_count: Option<usize>,
    },

    /// Reload current fixtures from the list endpoints
    Refresh { kinds: Vec<EntityKind> },

    /// Log a message (for debugging)
    Log { message: String },
}

impl TestStep {
    /// Short label used in logs and results
    pub fn describe(&self) -> String {
        match self {
            TestStep::Ping => "ping".to_string(),
            TestStep::Create { kind } => format!("create {kind}"),
            TestStep::Update { kind, .. } => format!("update {kind}"),
            TestStep::CreateForDelete { kind, group, .. } => {
                format!("create {kind} for delete ({group})")
            }
            TestStep::DeleteGroup { group } => format!("delete {group}"),
            TestStep::List { kind, .. } => format!("list {kind}"),
            TestStep::Refresh { kinds } => {
                let kinds: Vec<&str> = kinds.iter().map(EntityKind::as_str).collect();
                format!("refresh {}", kinds.join(", "))
            }
            TestStep::Log { .. } => "log".to_string(),
        }
    }
}

impl TestSpec {
    /// Parse a test spec from YAML string
    pub fn from_yaml(yaml: &str) -> E2eResult<Self> {
        serde_yaml::from_str(yaml).map_err(E2eError::from)
    }

    /// Parse a test spec from a YAML file
    pub fn from_file(path: &Path) -> E2eResult<Self> {
        let content = std::fs::read_to_string(path)?;
        Self::from_yaml(&content)
    }

    /// Load all test specs from a directory, sorted by file name
    pub fn load_all(dir: &Path) -> E2eResult<Vec<Self>> {
        let mut specs = Vec::new();

        for entry in walkdir::WalkDir::new(dir)
            .sort_by_file_name()
            .into_iter()
            .filter_map(|e| e.ok())
            .filter(|e| {
                e.path()
                    .extension()
                    .map(|ext| ext == "yaml" || ext == "yml")
                    .unwrap_or(false)
            })
        {
            let spec = Self::from_file(entry.path())?;
            specs.push(spec);
        }

        Ok(specs)
    }

    /// Filter specs by tag
    pub fn filter_by_tag<'a>(specs: &'a [Self], tag: &str) -> Vec<&'a Self> {
        specs.iter().filter(|s| s.tags.iter().any(|t| t == tag)).collect()
    }

    /// The canonical Earth API sequence: for each kind, create, update,
    /// create a throwaway sibling, delete it, and check one entity is left.
    /// Kinds run in dependency order: continent, country, city.
    pub fn earth() -> Self {
        let mut steps = vec![TestStep::Ping];

        let updates = [
            (
                EntityKind::Continent,
                json!({"name": "Europe #Updated", "area_by_km2": 266033131}),
                json!({"name": "Asia", "type": 1, "area_by_km2": 266033131}),
            ),
            (
                EntityKind::Country,
                json!({"name": "Finland #Updated"}),
                json!({
                    "name": "French",
                    "details": {"phone_code": "68", "iso_code": "Fr / FR", "currency": "€"},
                }),
            ),
            (
                EntityKind::City,
                json!({"name": "Helsinki #Updated"}),
                json!({"name": "Seinäjoki", "details": {"is_capital": false}}),
            ),
        ];

        for (kind, update, sibling) in updates {
            let group = format!("delete_{kind}");
            steps.push(TestStep::Create { kind });
            steps.push(TestStep::Update { kind, patch: update });
            steps.push(TestStep::CreateForDelete {
                kind,
                patch: sibling,
                group: group.clone(),
            });
            steps.push(TestStep::DeleteGroup { group });
            steps.push(TestStep::List {
                kind,
                expect_count: Some(1),
            });
        }

        Self {
            name: "earth-rest-api".to_string(),
            description: "Create, update, list and delete continents, countries and cities"
                .to_string(),
            tags: vec!["smoke".to_string()],
            fixtures: HashMap::new(),
            step_timeout_ms: None,
            steps,
        }
    }
}
