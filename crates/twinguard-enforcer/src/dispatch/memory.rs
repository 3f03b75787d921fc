//! In-process policy and thing stores.
//!
//! Used by the evaluation binary and integration tests in place of the
//! persistent stores. Modifications bump a per-thing revision and publish a
//! `ThingEvent` on a broadcast channel.

use std::sync::Arc;

use async_trait::async_trait;
use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::sync::broadcast;

use twinguard_core::error::{Result, TwinGuardError};
use twinguard_core::model::{Policy, ResourcePath};
use twinguard_core::signals::{ThingCommand, ThingEvent};

use super::dispatcher::{PolicyProvider, ThingHandler};

const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Thing id -> guarding policy.
#[derive(Default)]
pub struct InMemoryPolicies {
    map: DashMap<String, Arc<Policy>>,
}

impl InMemoryPolicies {
    pub fn new() -> Self {
        Self { map: DashMap::new() }
    }

    pub fn insert(&self, thing_id: impl Into<String>, policy: Arc<Policy>) {
        self.map.insert(thing_id.into(), policy);
    }
}

#[async_trait]
impl PolicyProvider for InMemoryPolicies {
    async fn policy_for(&self, thing_id: &str) -> Result<Arc<Policy>> {
        self.map
            .get(thing_id)
            .map(|p| Arc::clone(p.value()))
            .ok_or_else(|| TwinGuardError::NotFound(format!("no policy for thing: {thing_id}")))
    }
}

struct StoredThing {
    doc: Value,
    revision: u64,
}

/// Thing id -> thing document.
pub struct InMemoryThings {
    things: DashMap<String, StoredThing>,
    events: broadcast::Sender<ThingEvent>,
}

impl Default for InMemoryThings {
    fn default() -> Self {
        Self::new()
    }
}

impl InMemoryThings {
    pub fn new() -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        Self {
            things: DashMap::new(),
            events,
        }
    }

    pub fn insert(&self, thing_id: impl Into<String>, doc: Value) {
        self.things.insert(thing_id.into(), StoredThing { doc, revision: 1 });
    }

    pub fn get(&self, thing_id: &str) -> Option<Value> {
        self.things.get(thing_id).map(|t| t.doc.clone())
    }

    pub fn subscribe(&self) -> broadcast::Receiver<ThingEvent> {
        self.events.subscribe()
    }

    fn modify(&self, cmd: &ThingCommand) -> Result<()> {
        let mut thing = self
            .things
            .get_mut(cmd.thing_id())
            .ok_or_else(|| TwinGuardError::NotFound(format!("thing: {}", cmd.thing_id())))?;

        let path = cmd.resource_path();
        match cmd {
            ThingCommand::ModifyAttribute { value, .. } | ThingCommand::ModifyFeatureProperty { value, .. } => {
                set_path(&mut thing.doc, &path, value.clone())?;
            }
            ThingCommand::DeleteAttribute { .. } | ThingCommand::DeleteFeatureProperty { .. } => {
                remove_path(&mut thing.doc, &path)?;
            }
            _ => return Err(TwinGuardError::Internal(format!("{} is not a modification", cmd.name()))),
        }
        thing.revision += 1;
        let revision = thing.revision;
        drop(thing);

        if let Some(event) = ThingEvent::from_command(cmd, revision) {
            // No subscribers is not an error.
            let _ = self.events.send(event);
        }
        Ok(())
    }
}

#[async_trait]
impl ThingHandler for InMemoryThings {
    async fn handle(&self, cmd: &ThingCommand) -> Result<Option<Value>> {
        if !cmd.is_query() {
            self.modify(cmd)?;
            return Ok(None);
        }

        let thing = self
            .things
            .get(cmd.thing_id())
            .ok_or_else(|| TwinGuardError::NotFound(format!("thing: {}", cmd.thing_id())))?;
        let path = cmd.resource_path();
        get_path(&thing.doc, &path)
            .cloned()
            .map(Some)
            .ok_or_else(|| TwinGuardError::NotFound(format!("{}{path}", cmd.thing_id())))
    }
}

fn get_path<'a>(doc: &'a Value, path: &ResourcePath) -> Option<&'a Value> {
    path.segments().iter().try_fold(doc, |v, seg| match v {
        Value::Object(m) => m.get(seg),
        Value::Array(a) => seg.parse::<usize>().ok().and_then(|i| a.get(i)),
        _ => None,
    })
}

/// Set `value` at `path`, creating intermediate objects.
fn set_path(doc: &mut Value, path: &ResourcePath, value: Value) -> Result<()> {
    let Some((last, parents)) = path.segments().split_last() else {
        *doc = value;
        return Ok(());
    };

    let mut cur = doc;
    for seg in parents {
        cur = match cur {
            Value::Object(m) => m.entry(seg.clone()).or_insert_with(|| Value::Object(Map::new())),
            _ => return Err(TwinGuardError::BadRequest(format!("{path}: parent is not an object"))),
        };
    }
    match cur {
        Value::Object(m) => {
            m.insert(last.clone(), value);
            Ok(())
        }
        _ => Err(TwinGuardError::BadRequest(format!("{path}: parent is not an object"))),
    }
}

fn remove_path(doc: &mut Value, path: &ResourcePath) -> Result<()> {
    let not_found = || TwinGuardError::NotFound(format!("{path}"));
    let (last, parents) = path.segments().split_last().ok_or_else(not_found)?;

    let mut cur = doc;
    for seg in parents {
        cur = match cur {
            Value::Object(m) => m.get_mut(seg).ok_or_else(not_found)?,
            _ => return Err(not_found()),
        };
    }
    match cur {
        Value::Object(m) => m.remove(last).map(|_| ()).ok_or_else(not_found),
        _ => Err(not_found()),
    }
}
