use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use serde_json::{Map, Value};

/// Address of one record collection in the replica.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum StoreKey {
    /// A single report record.
    Report(String),
    /// The actions of a report, keyed by action id.
    ReportActions(String),
    /// A single transaction record.
    Transaction(String),
}

const REPORT_PREFIX: &str = "report_";
const REPORT_ACTIONS_PREFIX: &str = "reportActions_";
const TRANSACTION_PREFIX: &str = "transactions_";

impl StoreKey {
    pub fn id(&self) -> &str {
        match self {
            Self::Report(id) | Self::ReportActions(id) | Self::Transaction(id) => id,
        }
    }
}

impl fmt::Display for StoreKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Report(id) => write!(f, "{}{}", REPORT_PREFIX, id),
            Self::ReportActions(id) => write!(f, "{}{}", REPORT_ACTIONS_PREFIX, id),
            Self::Transaction(id) => write!(f, "{}{}", TRANSACTION_PREFIX, id),
        }
    }
}

impl FromStr for StoreKey {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // reportActions_ shares a prefix with report_, check it first
        if let Some(id) = s.strip_prefix(REPORT_ACTIONS_PREFIX) {
            return Ok(Self::ReportActions(id.to_string()));
        }
        if let Some(id) = s.strip_prefix(REPORT_PREFIX) {
            return Ok(Self::Report(id.to_string()));
        }
        if let Some(id) = s.strip_prefix(TRANSACTION_PREFIX) {
            return Ok(Self::Transaction(id.to_string()));
        }
        Err(format!("unknown store key: {}", s))
    }
}

impl Serialize for StoreKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for StoreKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UpdateMethod {
    /// Deep merge; `null` removes a key.
    Merge,
    /// Replace the whole record.
    Set,
}

/// One write against the replica.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StoreUpdate {
    pub method: UpdateMethod,
    pub key: StoreKey,
    pub value: Value,
}

impl StoreUpdate {
    pub fn merge(key: StoreKey, value: Value) -> Self {
        Self {
            method: UpdateMethod::Merge,
            key,
            value,
        }
    }

    pub fn set(key: StoreKey, value: Value) -> Self {
        Self {
            method: UpdateMethod::Set,
            key,
            value,
        }
    }
}

/// Which list of a batch is being applied.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Phase {
    /// Written before the request is sent.
    Optimistic,
    /// Written once the server confirms.
    Success,
    /// Written when the server rejects the request.
    Failure,
}

/// The three update lists that accompany one local mutation.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct OptimisticBatch {
    pub optimistic_data: Vec<StoreUpdate>,
    pub success_data: Vec<StoreUpdate>,
    pub failure_data: Vec<StoreUpdate>,
}

impl OptimisticBatch {
    pub fn updates(&self, phase: Phase) -> &[StoreUpdate] {
        match phase {
            Phase::Optimistic => &self.optimistic_data,
            Phase::Success => &self.success_data,
            Phase::Failure => &self.failure_data,
        }
    }

    pub fn extend(&mut self, other: OptimisticBatch) {
        self.optimistic_data.extend(other.optimistic_data);
        self.success_data.extend(other.success_data);
        self.failure_data.extend(other.failure_data);
    }
}

/// Merges `patch` into `target`. Objects merge key by key, `null` removes the
/// key, every other value replaces what was there.
pub fn deep_merge(target: &mut Value, patch: &Value) {
    let Value::Object(patch_map) = patch else {
        *target = strip_nulls(patch);
        return;
    };
    if !target.is_object() {
        *target = Value::Object(Map::new());
    }
    let Value::Object(target_map) = target else {
        return;
    };
    for (key, value) in patch_map {
        if value.is_null() {
            target_map.remove(key);
            continue;
        }
        match target_map.get_mut(key) {
            Some(existing) if existing.is_object() && value.is_object() => deep_merge(existing, value),
            _ => {
                target_map.insert(key.clone(), strip_nulls(value));
            }
        }
    }
}

/// A merge patch that turns `current` into `target`. Keys `target` lacks are
/// written as `null`, nested objects are patched key by key.
pub fn replacement_patch(current: &Value, target: &Value) -> Value {
    let (Value::Object(current_map), Value::Object(target_map)) = (current, target) else {
        return target.clone();
    };
    let mut patch: Map<String, Value> = current_map
        .keys()
        .filter(|key| !target_map.contains_key(*key))
        .map(|key| (key.clone(), Value::Null))
        .collect();
    for (key, value) in target_map {
        let entry = match current_map.get(key) {
            Some(existing) => replacement_patch(existing, value),
            None => value.clone(),
        };
        patch.insert(key.clone(), entry);
    }
    Value::Object(patch)
}

fn strip_nulls(value: &Value) -> Value {
    match value {
        Value::Object(map) => Value::Object(
            map.iter()
                .filter(|(_, v)| !v.is_null())
                .map(|(k, v)| (k.clone(), strip_nulls(v)))
                .collect(),
        ),
        other => other.clone(),
    }
}
