use std::collections::HashMap;

use serde_json::Map;
use serde_json::Value;

use super::StreamEvent;
use crate::ChildAdded;

/// Derives child-added notifications for the watched collection from the
/// raw `put`/`patch` stream.
///
/// A child fires the first time it is seen with a non-empty value. The
/// tracker mirrors each known child's subtree and prunes nodes left empty by
/// `null` writes the way the database does, so a child whose last log is
/// deleted is forgotten and fires again when it gets a new one. Writes below
/// a child that still has data are changes, not additions. The mirror
/// outlives a single connection so a reconnect snapshot only fires for
/// children added in between.
#[derive(Debug)]
pub struct ChildTracker {
    known: HashMap<String, Value>,
    seeded: bool,
    notify_existing: bool,
}

impl ChildTracker {
    /// `notify_existing` controls whether children present in the very first
    /// snapshot fire.
    pub fn new(notify_existing: bool) -> Self {
        Self {
            known: HashMap::new(),
            seeded: false,
            notify_existing,
        }
    }

    pub fn known_children(&self) -> usize {
        self.known.len()
    }

    pub fn apply(
        &mut self,
        event: StreamEvent,
    ) -> Vec<ChildAdded> {
        let mut added = Vec::new();
        match event {
            StreamEvent::Put { path, data } => {
                let segments = split_path(&path);
                if segments.is_empty() {
                    self.replace_root(data, &mut added);
                } else {
                    self.write_at(&segments, data, &mut added);
                }
            }
            StreamEvent::Patch { path, data } => {
                let base = split_path(&path);
                if let Value::Object(children) = data {
                    for (key, value) in children {
                        let mut segments = base.clone();
                        segments.extend(split_path(&key));
                        if segments.is_empty() {
                            continue;
                        }
                        self.write_at(&segments, value, &mut added);
                    }
                }
            }
            StreamEvent::KeepAlive | StreamEvent::Cancel(_) | StreamEvent::AuthRevoked(_) => {}
        }
        added
    }

    fn replace_root(
        &mut self,
        data: Value,
        added: &mut Vec<ChildAdded>,
    ) {
        let fire = self.seeded || self.notify_existing;
        self.seeded = true;

        let children = match data {
            Value::Object(children) => children,
            _ => {
                self.known.clear();
                return;
            }
        };

        let previous = std::mem::take(&mut self.known);
        for (key, value) in children {
            if is_empty(&value) {
                continue;
            }
            if fire && !previous.contains_key(&key) {
                added.push(ChildAdded::new(key.clone(), value.clone()));
            }
            self.known.insert(key, value);
        }
    }

    fn write_at(
        &mut self,
        segments: &[String],
        data: Value,
        added: &mut Vec<ChildAdded>,
    ) {
        let (child, rest) = match segments.split_first() {
            Some(split) => split,
            None => return,
        };

        match self.known.get_mut(child) {
            Some(subtree) => {
                write_value(subtree, rest, data);
                if is_empty(subtree) {
                    self.known.remove(child);
                }
            }
            None => {
                let mut subtree = Value::Null;
                write_value(&mut subtree, rest, data);
                if is_empty(&subtree) {
                    return;
                }
                added.push(ChildAdded::new(child.clone(), subtree.clone()));
                self.known.insert(child.clone(), subtree);
            }
        }
    }
}

/// Sets `data` at `path` below `node`, dropping objects emptied on the way
fn write_value(
    node: &mut Value,
    path: &[String],
    data: Value,
) {
    let Some((key, rest)) = path.split_first() else {
        *node = data;
        return;
    };

    if !node.is_object() {
        if data.is_null() {
            return;
        }
        *node = Value::Object(Map::new());
    }
    if let Value::Object(map) = node {
        let entry = map.entry(key.clone()).or_insert(Value::Null);
        write_value(entry, rest, data);
        if is_empty(entry) {
            map.remove(key);
        }
    }
}

/// `null` and `{}` both mean "no data" to the database
fn is_empty(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Object(map) => map.is_empty(),
        _ => false,
    }
}

fn split_path(path: &str) -> Vec<String> {
    path.split('/')
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect()
}
