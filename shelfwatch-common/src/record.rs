//! Inventory event records and the normalizer
//!
//! The upstream inventory API returns loosely typed JSON: keys may be
//! camelCase, lowercase, or the warehouse's native field names, and values may
//! be wrapped in DynamoDB attribute-value objects. [`normalize_items`] turns
//! whatever arrived into a list of [`InventoryEvent`]s and never fails; entries
//! that are not objects are dropped.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::debug;

use crate::time::parse_timestamp;

/// Accepted wire keys for each field, in lookup priority order
pub mod keys {
    pub const ITEM_ID: &[&str] = &["itemId", "itemid", "item_id"];
    pub const EMPLOYEE: &[&str] = &["employee", "入庫員工"];
    pub const TIMESTAMP: &[&str] = &["timestamp", "入庫時間"];
    pub const SHELF_LOCATION: &[&str] = &["shelfLocation", "shelf_location", "貨架位置"];
    pub const ITEM_TYPE: &[&str] = &["itemType", "item_type", "物品類型"];
    pub const IS_ISSUED: &[&str] = &["isIssued", "is_issued", "是否出庫"];
    pub const IS_VIOLATION: &[&str] = &["isViolation", "is_violation", "是否違規"];
    pub const VIOLATION_CONTENT: &[&str] =
        &["violationContent", "violation_content", "違規內容"];
}

/// One historical record of an item moving through the warehouse
///
/// Field order matters: the derived `Ord` is the structural tie-break used by
/// change detection.
#[derive(Debug, Clone, Default, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InventoryEvent {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employee: Option<String>,
    /// Raw timestamp text as sent upstream
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub timestamp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shelf_location: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub item_type: Option<String>,
    /// `true` marks an outbound (removal) record
    #[serde(default)]
    pub is_issued: bool,
    #[serde(default)]
    pub is_violation: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub violation_content: Option<String>,
}

impl InventoryEvent {
    /// Validating constructor over one raw API entry
    ///
    /// Returns `None` unless the entry is a JSON object (after unwrapping a
    /// DynamoDB `M` wrapper). Individual fields of the wrong type are left unset
    /// rather than rejecting the record.
    pub fn from_json(raw: &Value) -> Option<Self> {
        let unwrapped = unwrap_attribute_value(raw);
        let fields = unwrapped.as_object()?;

        Some(Self {
            item_id: string_field(fields, keys::ITEM_ID),
            employee: string_field(fields, keys::EMPLOYEE),
            timestamp: string_field(fields, keys::TIMESTAMP),
            shelf_location: string_field(fields, keys::SHELF_LOCATION),
            item_type: string_field(fields, keys::ITEM_TYPE),
            is_issued: flag_field(fields, keys::IS_ISSUED),
            is_violation: flag_field(fields, keys::IS_VIOLATION),
            violation_content: string_field(fields, keys::VIOLATION_CONTENT),
        })
    }

    /// Inbound record (item entering storage)
    pub fn is_inbound(&self) -> bool {
        !self.is_issued
    }

    /// Parsed timestamp; `None` when missing or unparsable
    pub fn ordering_key(&self) -> Option<DateTime<Utc>> {
        self.timestamp.as_deref().and_then(parse_timestamp)
    }

    pub fn item_id_str(&self) -> &str {
        self.item_id.as_deref().unwrap_or("")
    }

    pub fn shelf_location_str(&self) -> &str {
        self.shelf_location.as_deref().unwrap_or("")
    }
}

/// Normalize the API's item list
///
/// A non-array input yields an empty list. Array entries that are not objects
/// (null, numbers, strings, nested arrays) are dropped.
pub fn normalize_items(raw: &Value) -> Vec<InventoryEvent> {
    let Some(entries) = raw.as_array() else {
        debug!(kind = json_kind(raw), "Item list is not an array, treating as empty");
        return Vec::new();
    };

    let events: Vec<InventoryEvent> = entries.iter().filter_map(InventoryEvent::from_json).collect();

    let dropped = entries.len() - events.len();
    if dropped > 0 {
        debug!(dropped, kept = events.len(), "Dropped malformed inventory records");
    }

    events
}

/// Unwrap a DynamoDB attribute value (`{"S": "x"}`, `{"M": {...}}`, ...)
///
/// Values that are not single-key type wrappers are returned unchanged (maps
/// are unwrapped member-wise).
pub fn unwrap_attribute_value(value: &Value) -> Value {
    let Value::Object(map) = value else {
        return value.clone();
    };

    if map.len() == 1 {
        if let Some((tag, inner)) = map.iter().next() {
            match (tag.as_str(), inner) {
                ("S", Value::String(_)) | ("BOOL", Value::Bool(_)) => return inner.clone(),
                ("N", Value::String(text)) => {
                    return serde_json::from_str::<serde_json::Number>(text)
                        .map(Value::Number)
                        .unwrap_or_else(|_| Value::String(text.clone()));
                }
                ("N", Value::Number(_)) => return inner.clone(),
                ("NULL", _) => return Value::Null,
                ("L", Value::Array(items)) => {
                    return Value::Array(items.iter().map(unwrap_attribute_value).collect());
                }
                ("M", Value::Object(_)) => return unwrap_attribute_value(inner),
                _ => {}
            }
        }
    }

    Value::Object(
        map.iter()
            .map(|(key, member)| (key.clone(), unwrap_attribute_value(member)))
            .collect(),
    )
}

fn lookup<'a>(fields: &'a Map<String, Value>, names: &[&str]) -> Option<&'a Value> {
    names.iter().find_map(|name| fields.get(*name))
}

fn string_field(fields: &Map<String, Value>, names: &[&str]) -> Option<String> {
    match lookup(fields, names)? {
        Value::String(text) => Some(text.clone()),
        Value::Number(number) => Some(number.to_string()),
        _ => None,
    }
}

fn flag_field(fields: &Map<String, Value>, names: &[&str]) -> bool {
    matches!(lookup(fields, names), Some(Value::Bool(true)))
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "bool",
        Value::Number(_) => "number",
        Value::String(_) => "string",
        Value::Array(_) => "array",
        Value::Object(_) => "object",
    }
}
