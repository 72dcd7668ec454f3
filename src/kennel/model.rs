//! # Domain Model
//!
//! The whole site lives in one [`Document`]: the account table and the ordered
//! list of pet records. The JSON wire names (`users`, `pets`, `photos`, `type`)
//! are kept so documents written by older clients keep loading.
//!
//! Ids are normalized on ingress: a record may carry `"id": 42` or
//! `"id": "42"`, both deserialize into the same [`ItemId`], so lookups are
//! plain equality.

use chrono::Utc;
use serde::de::{self, Deserializer, Visitor};
use serde::{Deserialize, Serialize, Serializer};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::KennelError;

/// Canonical item identifier (creation time in milliseconds).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct ItemId(pub u64);

impl ItemId {
    /// Next id for a new record: the current time in milliseconds, bumped past
    /// every id already in use so ids are never reused.
    pub fn generate(existing: &[Item]) -> Result<Self, KennelError> {
        let now = u64::try_from(Utc::now().timestamp_millis()).unwrap_or(0);
        let max = existing.iter().map(|item| item.id.0).max().unwrap_or(0);
        if now > max {
            return Ok(ItemId(now));
        }
        max.checked_add(1).map(ItemId).ok_or_else(|| {
            KennelError::Validation(format!(
                "item id {max} is the largest possible; give the new item an explicit id"
            ))
        })
    }
}

impl fmt::Display for ItemId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for ItemId {
    type Err = KennelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim();
        if let Ok(n) = trimmed.parse::<u64>() {
            return Ok(ItemId(n));
        }
        // Ids that went through a float somewhere ("42.0")
        match trimmed.parse::<f64>() {
            Ok(f) if f >= 0.0 && f.fract() == 0.0 && f <= u64::MAX as f64 => Ok(ItemId(f as u64)),
            _ => Err(KennelError::InvalidId(s.to_string())),
        }
    }
}

impl From<u64> for ItemId {
    fn from(value: u64) -> Self {
        ItemId(value)
    }
}

impl Serialize for ItemId {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u64(self.0)
    }
}

impl<'de> Deserialize<'de> for ItemId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct IdVisitor;

        impl Visitor<'_> for IdVisitor {
            type Value = ItemId;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("an item id as a number or numeric string")
            }

            fn visit_u64<E: de::Error>(self, v: u64) -> Result<ItemId, E> {
                Ok(ItemId(v))
            }

            fn visit_i64<E: de::Error>(self, v: i64) -> Result<ItemId, E> {
                u64::try_from(v)
                    .map(ItemId)
                    .map_err(|_| E::custom(format!("negative item id {v}")))
            }

            fn visit_f64<E: de::Error>(self, v: f64) -> Result<ItemId, E> {
                v.to_string().parse().map_err(E::custom)
            }

            fn visit_str<E: de::Error>(self, v: &str) -> Result<ItemId, E> {
                v.parse().map_err(E::custom)
            }
        }

        deserializer.deserialize_any(IdVisitor)
    }
}

/// Display bucket of a record. Set by an admin, never changed automatically.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum LifecycleStatus {
    #[default]
    Breeding,
    Puppy,
    Graduate,
    /// Also catches statuses this version does not know.
    #[serde(other)]
    Memorial,
}

impl LifecycleStatus {
    pub const ALL: [LifecycleStatus; 4] = [
        LifecycleStatus::Breeding,
        LifecycleStatus::Puppy,
        LifecycleStatus::Graduate,
        LifecycleStatus::Memorial,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            LifecycleStatus::Breeding => "breeding",
            LifecycleStatus::Puppy => "puppy",
            LifecycleStatus::Graduate => "graduate",
            LifecycleStatus::Memorial => "memorial",
        }
    }
}

impl fmt::Display for LifecycleStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for LifecycleStatus {
    type Err = KennelError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "breeding" => Ok(LifecycleStatus::Breeding),
            "puppy" => Ok(LifecycleStatus::Puppy),
            "graduate" => Ok(LifecycleStatus::Graduate),
            "memorial" => Ok(LifecycleStatus::Memorial),
            other => Err(KennelError::Validation(format!(
                "unknown status '{other}' (expected breeding, puppy, graduate or memorial)"
            ))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    #[serde(other)]
    Guest,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Guest => f.write_str("guest"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Account {
    /// Stored as-is in the shared document (see DESIGN.md, hardening).
    pub password: String,
    pub role: Role,
    #[serde(default)]
    pub email: String,
}

/// Reference to a picture: an inline data URL or a URL to a committed file.
pub type AssetRef = String;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    pub id: ItemId,
    #[serde(default, deserialize_with = "string_or_number")]
    pub name: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub breed: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub age: String,
    #[serde(rename = "type", default, deserialize_with = "string_or_number")]
    pub species: String,
    #[serde(default, deserialize_with = "string_or_number")]
    pub gender: String,
    #[serde(default, deserialize_with = "null_as_default")]
    pub status: LifecycleStatus,
    #[serde(default, deserialize_with = "string_or_number")]
    pub description: String,
    #[serde(rename = "photos", default, deserialize_with = "null_as_default")]
    pub media: Vec<AssetRef>,
    /// Fields written by other clients that this version does not model.
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

/// Input for a new record. The id is optional; one is generated when absent.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewItem {
    pub id: Option<ItemId>,
    pub name: String,
    pub breed: String,
    pub age: String,
    pub species: String,
    pub gender: String,
    pub status: LifecycleStatus,
    pub description: String,
    pub media: Vec<AssetRef>,
}

impl NewItem {
    pub fn into_item(self, id: ItemId) -> Item {
        Item {
            id,
            name: self.name,
            breed: self.breed,
            age: self.age,
            species: self.species,
            gender: self.gender,
            status: self.status,
            description: self.description,
            media: self.media,
            extra: serde_json::Map::new(),
        }
    }
}

/// Field-wise patch; `None` keeps the stored value.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ItemPatch {
    pub name: Option<String>,
    pub breed: Option<String>,
    pub age: Option<String>,
    pub species: Option<String>,
    pub gender: Option<String>,
    pub status: Option<LifecycleStatus>,
    pub description: Option<String>,
    pub media: Option<Vec<AssetRef>>,
}

impl ItemPatch {
    pub fn is_empty(&self) -> bool {
        *self == ItemPatch::default()
    }

    /// Merge over `item`. The id is never touched.
    pub fn apply(self, item: &mut Item) {
        if let Some(v) = self.name {
            item.name = v;
        }
        if let Some(v) = self.breed {
            item.breed = v;
        }
        if let Some(v) = self.age {
            item.age = v;
        }
        if let Some(v) = self.species {
            item.species = v;
        }
        if let Some(v) = self.gender {
            item.gender = v;
        }
        if let Some(v) = self.status {
            item.status = v;
        }
        if let Some(v) = self.description {
            item.description = v;
        }
        if let Some(v) = self.media {
            item.media = v;
        }
    }
}

/// The single persisted unit: accounts and items.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct Document {
    #[serde(rename = "users", default, deserialize_with = "null_as_default")]
    pub accounts: BTreeMap<String, Account>,
    #[serde(rename = "pets", default, deserialize_with = "null_as_default")]
    pub items: Vec<Item>,
}

impl Document {
    pub fn new() -> Self {
        Self::default()
    }

    /// No accounts and no items.
    pub fn is_empty(&self) -> bool {
        self.accounts.is_empty() && self.items.is_empty()
    }

    pub fn item_count(&self) -> usize {
        self.items.len()
    }

    /// Case-insensitive account lookup; returns the stored key.
    pub fn find_account(&self, username: &str) -> Option<(&str, &Account)> {
        let wanted = username.trim().to_lowercase();
        self.accounts
            .iter()
            .find(|(name, _)| name.to_lowercase() == wanted)
            .map(|(name, account)| (name.as_str(), account))
    }

    pub fn find_item(&self, id: ItemId) -> Option<&Item> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn items_by_status(&self, status: LifecycleStatus) -> Vec<&Item> {
        self.items.iter().filter(|item| item.status == status).collect()
    }
}

fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// Form fields were stored as whatever the browser produced: strings mostly,
/// numbers sometimes (`"age": 3`), occasionally `null`.
fn string_or_number<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let value = Option::<serde_json::Value>::deserialize(deserializer)?;
    Ok(match value {
        None | Some(serde_json::Value::Null) => String::new(),
        Some(serde_json::Value::String(s)) => s,
        Some(other) => other.to_string(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn numeric_and_string_ids_normalize() {
        let json = r#"{"users":{},"pets":[{"id":42,"name":"A"},{"id":"43","name":"B"}]}"#;
        let doc: Document = serde_json::from_str(json).unwrap();
        assert_eq!(doc.items[0].id, ItemId(42));
        assert_eq!(doc.items[1].id, ItemId(43));
        assert!(doc.find_item("43".parse().unwrap()).is_some());
    }

    #[test]
    fn absent_or_null_fields_become_empty() {
        let doc: Document = serde_json::from_str("{}").unwrap();
        assert!(doc.accounts.is_empty());
        assert!(doc.items.is_empty());

        let doc: Document = serde_json::from_str(r#"{"users":null,"pets":null}"#).unwrap();
        assert!(doc.is_empty());
    }

    #[test]
    fn wire_names_are_preserved() {
        let json = r#"{"id":1,"name":"Rex","type":"dog","status":"puppy","photos":["data:x"],"age":3}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        assert_eq!(item.species, "dog");
        assert_eq!(item.status, LifecycleStatus::Puppy);
        assert_eq!(item.media, vec!["data:x".to_string()]);
        assert_eq!(item.age, "3");

        let out = serde_json::to_value(&item).unwrap();
        assert_eq!(out["type"], "dog");
        assert_eq!(out["photos"][0], "data:x");
        assert_eq!(out["id"], 1);
    }

    #[test]
    fn unknown_fields_survive_round_trip() {
        let json = r#"{"id":7,"name":"Bella","pedigree":"RKF-123"}"#;
        let item: Item = serde_json::from_str(json).unwrap();
        let out = serde_json::to_value(&item).unwrap();
        assert_eq!(out["pedigree"], "RKF-123");
    }

    #[test]
    fn status_defaults_and_unknown_values() {
        let item: Item = serde_json::from_str(r#"{"id":1}"#).unwrap();
        assert_eq!(item.status, LifecycleStatus::Breeding);
        let item: Item = serde_json::from_str(r#"{"id":1,"status":"retired"}"#).unwrap();
        assert_eq!(item.status, LifecycleStatus::Memorial);
    }

    #[test]
    fn bad_ids_are_rejected() {
        assert!("abc".parse::<ItemId>().is_err());
        assert!("-3".parse::<ItemId>().is_err());
        assert_eq!("42.0".parse::<ItemId>().unwrap(), ItemId(42));
    }

    #[test]
    fn account_lookup_ignores_case() {
        let mut doc = Document::new();
        doc.accounts.insert(
            "Admin".to_string(),
            Account {
                password: "x".into(),
                role: Role::Admin,
                email: String::new(),
            },
        );
        let (key, account) = doc.find_account("admin").unwrap();
        assert_eq!(key, "Admin");
        assert_eq!(account.role, Role::Admin);
        assert!(doc.find_account("guest").is_none());
    }

    #[test]
    fn generated_ids_never_collide() {
        let far_future = ItemId(u64::MAX - 10);
        let existing = vec![NewItem::default().into_item(far_future)];
        assert_eq!(ItemId::generate(&existing).unwrap(), ItemId(u64::MAX - 9));
        assert!(ItemId::generate(&[]).unwrap().0 > 0);
    }

    #[test]
    fn id_generation_stops_at_the_largest_id() {
        let existing = vec![NewItem::default().into_item(ItemId(u64::MAX))];
        assert!(matches!(
            ItemId::generate(&existing),
            Err(KennelError::Validation(_))
        ));
    }

    #[test]
    fn patch_keeps_id_and_untouched_fields() {
        let mut item = NewItem {
            name: "Rex".into(),
            breed: "Husky".into(),
            ..Default::default()
        }
        .into_item(ItemId(5));
        ItemPatch {
            name: Some("Max".into()),
            ..Default::default()
        }
        .apply(&mut item);
        assert_eq!(item.id, ItemId(5));
        assert_eq!(item.name, "Max");
        assert_eq!(item.breed, "Husky");
    }
}
