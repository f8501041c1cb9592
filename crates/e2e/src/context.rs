//! Per-run test context and the step operations executed against it
//!
//! A [`TestContext`] is created at the start of a suite and dropped at its
//! end. It owns the API client, the fixture catalog and the lifecycle
//! tracker, so nothing leaks from one run into the next.

use earth_common::{AnyEntity, EntityKind};
use serde_json::Value;
use tokio::task::JoinSet;
use tracing::{debug, info, warn};

use crate::client::ApiClient;
use crate::error::{E2eError, E2eResult};
use crate::fixtures::FixtureCatalog;
use crate::matcher::{deep_match, remove_properties, MatchError};
use crate::spec::TestStep;
use crate::tracker::LifecycleTracker;

pub const PING_PATH: &str = "/api/v1/ping";

/// Fields whose value the server refreshes on every write
const VOLATILE_FIELDS: [&str; 1] = ["updated"];

pub struct TestContext {
    pub client: ApiClient,
    pub fixtures: FixtureCatalog,
    pub tracker: LifecycleTracker<AnyEntity>,
}

fn response_uuid(kind: EntityKind, response: &Value) -> E2eResult<String> {
    match response.get("uuid").and_then(Value::as_str) {
        Some(uuid) if !uuid.is_empty() => Ok(uuid.to_string()),
        _ => Err(E2eError::MissingUuid { kind }),
    }
}

/// Match a submitted payload against the server's echo, ignoring the
/// volatile fields on both sides
fn assert_echoed(payload: &Value, response: &Value) -> Result<(), MatchError> {
    deep_match(
        &remove_properties(payload, &VOLATILE_FIELDS),
        &remove_properties(response, &VOLATILE_FIELDS),
    )
}

impl TestContext {
    pub fn new(client: ApiClient) -> Self {
        Self::with_fixtures(client, FixtureCatalog::default())
    }

    pub fn with_fixtures(client: ApiClient, fixtures: FixtureCatalog) -> Self {
        Self {
            client,
            fixtures,
            tracker: LifecycleTracker::new(),
        }
    }

    /// Run one declarative step
    pub async fn execute_step(&mut self, step: &TestStep) -> E2eResult<()> {
        match step {
            TestStep::Ping => self.ping().await,
            TestStep::Create { kind } => self.create(*kind).await.map(|_| ()),
            TestStep::Update { kind, patch } => self.update(*kind, patch).await.map(|_| ()),
            TestStep::CreateForDelete { kind, patch, group } => {
                self.create_for_delete(*kind, patch, group).await.map(|_| ())
            }
            TestStep::DeleteGroup { group } => self.teardown_group(group).await.map(|_| ()),
            TestStep::List { kind, expect_count } => {
                let results = self.list(*kind).await?;
                if let Some(expected) = expect_count {
                    if results.len() != *expected {
                        return Err(E2eError::UnexpectedCount {
                            kind: *kind,
                            expected: *expected,
                            actual: results.len(),
                        });
                    }
                }
                Ok(())
            }
            TestStep::Refresh { kinds } => self.refresh(kinds).await,
            TestStep::Log { message } => {
                info!("{}", message);
                Ok(())
            }
        }
    }

    pub async fn ping(&self) -> E2eResult<()> {
        let resp = self.client.get(PING_PATH, &[]).await?;
        if resp.status.as_u16() != 200 {
            return Err(E2eError::StepFailed {
                step: "ping".to_string(),
                reason: format!("expected status 200, got {}", resp.status),
            });
        }
        Ok(())
    }

    /// Create the current fixture of `kind` and adopt the server's answer
    pub async fn create(&mut self, kind: EntityKind) -> E2eResult<AnyEntity> {
        let payload = self.fixtures.create_payload(kind)?;
        let response: Value = self.client.post(&kind.create_path(), &payload).await?;
        let uuid = response_uuid(kind, &response)?;
        assert_echoed(&payload, &response)?;

        debug!("Created {} {}", kind, uuid);
        let entity = AnyEntity::from_value(kind, response)?;
        self.fixtures.replace(entity.clone());
        Ok(entity)
    }

    /// Merge `patch` onto the current fixture and PUT it. The uuid must
    /// survive the update.
    pub async fn update(&mut self, kind: EntityKind, patch: &Value) -> E2eResult<AnyEntity> {
        let expected_uuid = self
            .fixtures
            .uuid(kind)
            .ok_or(E2eError::NotCreated { kind })?
            .to_string();
        let payload = self.fixtures.update_payload(kind, patch)?;
        let response: Value = self.client.update(&kind.update_path(), &payload).await?;

        let uuid = response_uuid(kind, &response)?;
        if uuid != expected_uuid {
            return Err(E2eError::UuidChanged {
                kind,
                expected: expected_uuid,
                actual: uuid,
            });
        }
        assert_echoed(&payload, &response)?;

        debug!("Updated {} {}", kind, uuid);
        let entity = AnyEntity::from_value(kind, response)?;
        self.fixtures.replace(entity.clone());
        Ok(entity)
    }

    /// Create a sibling of the current fixture and track it under `group`
    /// for later deletion. The catalog is left untouched.
    ///
    /// The entity is tracked as soon as the server hands out its uuid, so it
    /// stays reachable for teardown even when the echo check fails.
    pub async fn create_for_delete(
        &mut self,
        kind: EntityKind,
        patch: &Value,
        group: &str,
    ) -> E2eResult<AnyEntity> {
        let payload = self.fixtures.sibling_payload(kind, patch)?;
        let response: Value = self.client.post(&kind.create_path(), &payload).await?;
        let uuid = response_uuid(kind, &response)?;

        debug!("Created {} {} for deletion in {}", kind, uuid, group);
        let decoded = AnyEntity::from_value(kind, response.clone());
        let tracked = match &decoded {
            Ok(entity) => entity.clone(),
            Err(_) => AnyEntity::with_uuid(kind, uuid),
        };
        self.tracker.append(group, tracked);

        let entity = decoded?;
        deep_match(&payload, &response)?;
        Ok(entity)
    }

    /// Delete every member of `group` concurrently and wait for all of them.
    ///
    /// On success the group is removed. If any deletion fails the group keeps
    /// only the members that were not deleted and the first failure is
    /// returned.
    pub async fn teardown_group(&mut self, group: &str) -> E2eResult<usize> {
        let members = self
            .tracker
            .get(group)
            .ok_or_else(|| E2eError::GroupNotFound(group.to_string()))?
            .to_vec();

        let mut tasks = JoinSet::new();
        for (index, member) in members.iter().enumerate() {
            let client = self.client.clone();
            let kind = member.kind();
            let uuid = member.uuid().map(str::to_string);
            tasks.spawn(async move {
                let result = match uuid {
                    Some(uuid) => client
                        .delete(&kind.delete_path(), &[("uuid", uuid.as_str())])
                        .await
                        .map(|_| ()),
                    None => Err(E2eError::MissingUuid { kind }),
                };
                (index, result)
            });
        }

        let mut deleted = vec![false; members.len()];
        let mut first_error = None;
        while let Some(joined) = tasks.join_next().await {
            match joined {
                Ok((index, Ok(()))) => deleted[index] = true,
                Ok((_, Err(e))) => {
                    first_error.get_or_insert(e);
                }
                Err(e) => {
                    first_error.get_or_insert(E2eError::Join(e));
                }
            }
        }

        let count = deleted.iter().filter(|d| **d).count();
        match first_error {
            None => {
                self.tracker.delete(group);
                info!("Deleted {} entities from {}", count, group);
                Ok(count)
            }
            Some(e) => {
                let remaining: Vec<AnyEntity> = members
                    .into_iter()
                    .zip(deleted)
                    .filter(|(_, deleted)| !deleted)
                    .map(|(member, _)| member)
                    .collect();
                warn!(
                    "Teardown of {} left {} of {} entities: {}",
                    group,
                    remaining.len(),
                    count + remaining.len(),
                    e
                );
                self.tracker.retain(group, remaining);
                Err(e)
            }
        }
    }

    /// Tear down every group still registered, reporting the first failure
    pub async fn teardown_all(&mut self) -> E2eResult<usize> {
        let groups: Vec<String> = self.tracker.keys().into_iter().map(str::to_string).collect();
        let mut total = 0;
        let mut first_error = None;
        for group in groups {
            match self.teardown_group(&group).await {
                Ok(count) => total += count,
                Err(e) => {
                    first_error.get_or_insert(e);
                }
            }
        }
        match first_error {
            Some(e) => Err(e),
            None => Ok(total),
        }
    }

    pub async fn list(&self, kind: EntityKind) -> E2eResult<Vec<Value>> {
        self.client.json(&kind.list_path(), &[]).await
    }

    /// Reload current fixtures from the list endpoints, concurrently. Each
    /// fixture is replaced by the listed entity sharing its uuid.
    pub async fn refresh(&mut self, kinds: &[EntityKind]) -> E2eResult<()> {
        let lists =
            futures::future::try_join_all(kinds.iter().map(|kind| self.list(*kind))).await?;

        for (kind, results) in kinds.iter().zip(lists) {
            let uuid = self
                .fixtures
                .uuid(*kind)
                .ok_or(E2eError::NotCreated { kind: *kind })?
                .to_string();
            let found = results
                .into_iter()
                .find(|item| item.get("uuid").and_then(Value::as_str) == Some(uuid.as_str()))
                .ok_or_else(|| MatchError::NotFound {
                    id_field: "uuid".to_string(),
                    id: Value::String(uuid.clone()),
                })?;
            self.fixtures.replace_value(*kind, found)?;
        }
        Ok(())
    }
}
