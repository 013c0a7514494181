//! `Dragonfly` (Redis-compatible) game state.
//!
//! Every document is keyed by its owner. Plots are stored as JSON strings
//! and replaced whole; profiles are hashes so that counters can be changed
//! atomically by a server-side script without rewriting the document.
//!
//! # Key Patterns
//!
//! | Pattern | Type | Description |
//! |---------|------|-------------|
//! | `farm:{owner}` | JSON | The player's farm plot |
//! | `profile:{owner}` | Hash | Balance, inventory, stats, challenges |
//! | `scenario:{owner}` | JSON | The active explore scenario |
//!
//! # Profile Hash Fields
//!
//! | Field | Value |
//! |-------|-------|
//! | `created_at` | RFC 3339 timestamp |
//! | `balance` | Integer, cents |
//! | `inventory:{item}` | Integer count, removed at zero |
//! | `stats:{name}` | Integer counter |
//! | `challenges` | JSON challenge board |

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use fred::prelude::*;
use serde::Serialize;
use serde::de::DeserializeOwned;

use dafarmz_core::challenges::Challenges;
use dafarmz_core::store::{Credit, Farm, GameStore, Profile, StoreError};
use dafarmz_farm::Scenario;
use dafarmz_types::{ItemKey, OwnerId};

use crate::error::DbError;

const CREATED_AT: &str = "created_at";
const BALANCE: &str = "balance";
const CHALLENGES: &str = "challenges";
const INVENTORY_PREFIX: &str = "inventory:";
const STATS_PREFIX: &str = "stats:";

/// Write every field, but only if the hash does not exist yet.
const CREATE_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 1 then
  return 0
end
redis.call('HSET', KEYS[1], unpack(ARGV))
return 1
";

/// Write fields, but only into a hash that already exists.
const UPDATE_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return 0
end
redis.call('HSET', KEYS[1], unpack(ARGV))
return 1
";

/// Apply field/delta pairs all or nothing.
///
/// Returns `{status, field, current}` where status is `ok`, `missing`,
/// `insufficient`, `overflow`, or `corrupt`. Every result is checked before
/// the first `HINCRBY`, and counters are capped at 2^53 - 1 so Lua's double
/// arithmetic stays exact. Inventory fields that reach zero are deleted.
const CREDIT_SCRIPT: &str = r"
if redis.call('EXISTS', KEYS[1]) == 0 then
  return {'missing', '', '0'}
end
local limit = 9007199254740991
for i = 1, #ARGV, 2 do
  local raw = redis.call('HGET', KEYS[1], ARGV[i]) or '0'
  local current = tonumber(raw)
  if current == nil then
    return {'corrupt', ARGV[i], raw}
  end
  local next = current + tonumber(ARGV[i + 1])
  if next < 0 then
    return {'insufficient', ARGV[i], raw}
  end
  if next > limit then
    return {'overflow', ARGV[i], raw}
  end
end
for i = 1, #ARGV, 2 do
  local field = ARGV[i]
  local next = redis.call('HINCRBY', KEYS[1], field, ARGV[i + 1])
  if next == 0 and string.sub(field, 1, 10) == 'inventory:' then
    redis.call('HDEL', KEYS[1], field)
  end
end
return {'ok', '', '0'}
";

fn farm_key(owner: OwnerId) -> String {
    format!("farm:{owner}")
}

fn profile_key(owner: OwnerId) -> String {
    format!("profile:{owner}")
}

fn scenario_key(owner: OwnerId) -> String {
    format!("scenario:{owner}")
}

/// Connection handle to a `Dragonfly` (Redis-compatible) instance.
///
/// Wraps a [`fred::prelude::Client`] and implements [`GameStore`] over
/// the key patterns above.
#[derive(Clone)]
pub struct DragonflyPool {
    client: Client,
}

impl core::fmt::Debug for DragonflyPool {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("DragonflyPool").finish_non_exhaustive()
    }
}

impl DragonflyPool {
    /// Connect to `Dragonfly` at the given URL.
    ///
    /// The URL should follow the Redis URL scheme:
    /// `redis://host:port` or `redis://host:port/db`
    ///
    /// # Errors
    ///
    /// Returns [`DbError::Config`] if the URL cannot be parsed.
    /// Returns [`DbError::Dragonfly`] if the connection fails.
    pub async fn connect(url: &str) -> Result<Self, DbError> {
        let config = Config::from_url(url)
            .map_err(|e| DbError::Config(format!("Invalid Dragonfly URL: {e}")))?;

        let client = Builder::from_config(config).build()?;
        client.init().await?;

        tracing::info!("Connected to Dragonfly");
        Ok(Self { client })
    }

    // =========================================================================
    // Generic JSON get/set/delete
    // =========================================================================

    /// Serialize `value` as JSON and store it at `key`.
    pub async fn set_json<T: Serialize + Sync>(&self, key: &str, value: &T) -> Result<(), DbError> {
        let json = serde_json::to_string(value)?;
        let _: () = self.client.set(key, json.as_str(), None, None, false).await?;
        Ok(())
    }

    /// Read the value at `key` and deserialize it from JSON.
    pub async fn get_json<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, DbError> {
        let value: Option<String> = self.client.get(key).await?;
        value
            .map(|s| serde_json::from_str(&s))
            .transpose()
            .map_err(DbError::from)
    }

    /// Delete a key. Returns whether it existed.
    pub async fn delete(&self, key: &str) -> Result<bool, DbError> {
        let removed: u32 = self.client.del(key).await?;
        Ok(removed > 0)
    }

    // =========================================================================
    // Profiles -- profile:{owner}
    // =========================================================================

    async fn read_profile(&self, owner: OwnerId) -> Result<Option<Profile>, DbError> {
        let fields: HashMap<String, String> = self.client.hgetall(profile_key(owner)).await?;
        if fields.is_empty() {
            return Ok(None);
        }
        profile_from_fields(owner, &fields).map(Some)
    }

    async fn write_profile(&self, profile: &Profile) -> Result<bool, DbError> {
        let args = flatten(profile_to_fields(profile)?);
        let created: i64 = self
            .client
            .eval(CREATE_SCRIPT, vec![profile_key(profile.owner)], args)
            .await?;
        Ok(created == 1)
    }

    async fn write_challenges(
        &self,
        owner: OwnerId,
        challenges: &Challenges,
    ) -> Result<bool, DbError> {
        let json = serde_json::to_string(challenges)?;
        let updated: i64 = self
            .client
            .eval(
                UPDATE_SCRIPT,
                vec![profile_key(owner)],
                vec![CHALLENGES.to_owned(), json],
            )
            .await?;
        Ok(updated == 1)
    }

    async fn apply_credit(&self, owner: OwnerId, credit: &Credit) -> Result<Profile, StoreError> {
        let reply: Vec<String> = self
            .client
            .eval(CREDIT_SCRIPT, vec![profile_key(owner)], flatten(credit_fields(credit)))
            .await
            .map_err(DbError::from)?;

        credit_reply(owner, credit, &reply)?;
        self.read_profile(owner)
            .await?
            .ok_or(StoreError::ProfileNotFound(owner))
    }

    /// Return a reference to the underlying [`Client`].
    pub const fn client(&self) -> &Client {
        &self.client
    }
}

impl GameStore for DragonflyPool {
    async fn load_farm(&self, owner: OwnerId) -> Result<Option<Farm>, StoreError> {
        Ok(self.get_json(&farm_key(owner)).await?)
    }

    async fn save_farm(&self, farm: &Farm) -> Result<(), StoreError> {
        Ok(self.set_json(&farm_key(farm.owner), farm).await?)
    }

    async fn load_profile(&self, owner: OwnerId) -> Result<Option<Profile>, StoreError> {
        Ok(self.read_profile(owner).await?)
    }

    async fn create_profile(&self, profile: &Profile) -> Result<bool, StoreError> {
        Ok(self.write_profile(profile).await?)
    }

    async fn credit(&self, owner: OwnerId, credit: &Credit) -> Result<Profile, StoreError> {
        self.apply_credit(owner, credit).await
    }

    async fn save_challenges(
        &self,
        owner: OwnerId,
        challenges: &Challenges,
    ) -> Result<(), StoreError> {
        if self.write_challenges(owner, challenges).await? {
            Ok(())
        } else {
            Err(StoreError::ProfileNotFound(owner))
        }
    }

    async fn load_scenario(&self, owner: OwnerId) -> Result<Option<Scenario>, StoreError> {
        Ok(self.get_json(&scenario_key(owner)).await?)
    }

    async fn save_scenario(&self, owner: OwnerId, scenario: &Scenario) -> Result<(), StoreError> {
        Ok(self.set_json(&scenario_key(owner), scenario).await?)
    }

    async fn delete_scenario(&self, owner: OwnerId) -> Result<bool, StoreError> {
        Ok(self.delete(&scenario_key(owner)).await?)
    }
}

// =============================================================================
// Hash encoding
// =============================================================================

/// Profile as hash field/value pairs.
fn profile_to_fields(profile: &Profile) -> Result<Vec<(String, String)>, DbError> {
    let mut fields = vec![
        (CREATED_AT.to_owned(), profile.created_at.to_rfc3339()),
        (BALANCE.to_owned(), profile.balance.to_string()),
        (CHALLENGES.to_owned(), serde_json::to_string(&profile.challenges)?),
    ];
    fields.extend(
        profile
            .inventory
            .iter()
            .map(|(key, count)| (format!("{INVENTORY_PREFIX}{key}"), count.to_string())),
    );
    fields.extend(
        profile
            .stats
            .iter()
            .map(|(name, value)| (format!("{STATS_PREFIX}{name}"), value.to_string())),
    );
    Ok(fields)
}

/// Rebuild a profile from its hash fields. Unknown fields are ignored.
fn profile_from_fields(
    owner: OwnerId,
    fields: &HashMap<String, String>,
) -> Result<Profile, DbError> {
    let key = profile_key(owner);
    let corrupt = |reason: String| DbError::Corrupt {
        key: key.clone(),
        reason,
    };

    let created_at = fields
        .get(CREATED_AT)
        .ok_or_else(|| corrupt(format!("missing {CREATED_AT}")))?;
    let created_at = DateTime::parse_from_rfc3339(created_at)
        .map_err(|e| corrupt(format!("bad {CREATED_AT}: {e}")))?
        .with_timezone(&Utc);

    let challenges = fields
        .get(CHALLENGES)
        .ok_or_else(|| corrupt(format!("missing {CHALLENGES}")))?;
    let challenges: Challenges = serde_json::from_str(challenges)?;

    let balance = match fields.get(BALANCE) {
        Some(raw) => parse_counter(raw).map_err(|e| corrupt(format!("bad {BALANCE}: {e}")))?,
        None => 0,
    };

    let mut profile = Profile::new(owner, created_at, balance, challenges);
    for (field, raw) in fields {
        if let Some(item) = field.strip_prefix(INVENTORY_PREFIX) {
            let count = parse_counter(raw).map_err(|e| corrupt(format!("bad {field}: {e}")))?;
            if count > 0 {
                profile.inventory.insert(ItemKey::parse(item), count);
            }
        } else if let Some(name) = field.strip_prefix(STATS_PREFIX) {
            let value = parse_counter(raw).map_err(|e| corrupt(format!("bad {field}: {e}")))?;
            profile.stats.insert(name.to_owned(), value);
        }
    }
    Ok(profile)
}

fn parse_counter(raw: &str) -> Result<u64, core::num::ParseIntError> {
    raw.trim().parse()
}

/// Credit as hash field/delta pairs. Zero deltas are dropped.
fn credit_fields(credit: &Credit) -> Vec<(String, String)> {
    let mut fields = Vec::new();
    if credit.balance != 0 {
        fields.push((BALANCE.to_owned(), credit.balance.to_string()));
    }
    fields.extend(
        credit
            .items
            .iter()
            .filter(|(_, delta)| **delta != 0)
            .map(|(key, delta)| (format!("{INVENTORY_PREFIX}{key}"), delta.to_string())),
    );
    fields.extend(
        credit
            .stats
            .iter()
            .filter(|(_, delta)| **delta != 0)
            .map(|(name, delta)| (format!("{STATS_PREFIX}{name}"), delta.to_string())),
    );
    fields
}

/// Interpret the `{status, field, current}` reply of the credit script.
fn credit_reply(owner: OwnerId, credit: &Credit, reply: &[String]) -> Result<(), StoreError> {
    let field = reply.get(1).map_or("", String::as_str);
    let current = reply.get(2).map_or("", String::as_str);
    match reply.first().map(String::as_str) {
        Some("ok") => Ok(()),
        Some("missing") => Err(StoreError::ProfileNotFound(owner)),
        Some("insufficient") => Err(StoreError::Insufficient {
            what: display_field(field).to_owned(),
            available: current.parse().unwrap_or(0),
            needed: credit_delta(credit, field).unsigned_abs(),
        }),
        Some("overflow") => Err(StoreError::Overflow(display_field(field).to_owned())),
        Some("corrupt") => Err(DbError::Corrupt {
            key: profile_key(owner),
            reason: format!("field {field} holds non-numeric {current:?}"),
        }
        .into()),
        other => Err(DbError::Config(format!("unexpected credit reply: {other:?}")).into()),
    }
}

/// The delta a credit applies to a hash field.
fn credit_delta(credit: &Credit, field: &str) -> i64 {
    if field == BALANCE {
        return credit.balance;
    }
    if let Some(item) = field.strip_prefix(INVENTORY_PREFIX) {
        return credit.items.get(&ItemKey::parse(item)).copied().unwrap_or(0);
    }
    field
        .strip_prefix(STATS_PREFIX)
        .and_then(|name| credit.stats.get(name))
        .copied()
        .unwrap_or(0)
}

/// A hash field name as a player would recognise it.
fn display_field(field: &str) -> &str {
    field
        .strip_prefix(INVENTORY_PREFIX)
        .or_else(|| field.strip_prefix(STATS_PREFIX))
        .unwrap_or(field)
}

fn flatten(pairs: Vec<(String, String)>) -> Vec<String> {
    pairs
        .into_iter()
        .flat_map(|(field, value)| [field, value])
        .collect()
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;

    use super::*;

    fn profile() -> Profile {
        let at = Utc
            .with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .unwrap_or_default();
        let board = Challenges {
            last_refreshed_at: at,
            max_active: 1,
            options: Vec::new(),
        };
        let mut profile = Profile::new(OwnerId(7), at, 1_250, board);
        profile.inventory.insert(ItemKey::parse("plant:apple"), 3);
        profile.stats.insert("xp".to_owned(), 40);
        profile.stats.insert("plant.seed:apple".to_owned(), 2);
        profile
    }

    fn reply(parts: [&str; 3]) -> Vec<String> {
        parts.iter().map(|part| (*part).to_owned()).collect()
    }

    #[test]
    fn credit_reply_maps_each_status() {
        let owner = OwnerId(7);
        let credit = Credit::new().balance(-300).stat("xp", 5);

        assert!(credit_reply(owner, &credit, &reply(["ok", "", "0"])).is_ok());
        assert!(matches!(
            credit_reply(owner, &credit, &reply(["missing", "", "0"])),
            Err(StoreError::ProfileNotFound(OwnerId(7)))
        ));
        assert!(matches!(
            credit_reply(owner, &credit, &reply(["insufficient", "balance", "120"])),
            Err(StoreError::Insufficient { available: 120, needed: 300, .. })
        ));
        assert!(matches!(
            credit_reply(owner, &credit, &reply(["overflow", "stats:xp", "9007199254740990"])),
            Err(StoreError::Overflow(field)) if field == "xp"
        ));
        assert!(matches!(
            credit_reply(owner, &credit, &reply(["corrupt", "balance", "abc"])),
            Err(StoreError::Backend { .. })
        ));
        assert!(matches!(
            credit_reply(owner, &credit, &[]),
            Err(StoreError::Backend { .. })
        ));
    }

    #[test]
    fn profile_hash_round_trip() {
        let original = profile();
        let fields: HashMap<String, String> = profile_to_fields(&original)
            .unwrap_or_default()
            .into_iter()
            .collect();
        assert_eq!(fields.get("inventory:plant:apple").map(String::as_str), Some("3"));
        assert_eq!(fields.get("stats:plant.seed:apple").map(String::as_str), Some("2"));

        let decoded = profile_from_fields(OwnerId(7), &fields);
        assert!(decoded.is_ok_and(|p| p == original));
    }

    #[test]
    fn corrupt_counters_are_reported() {
        let mut fields: HashMap<String, String> = profile_to_fields(&profile())
            .unwrap_or_default()
            .into_iter()
            .collect();
        fields.insert("balance".to_owned(), "lots".to_owned());
        assert!(matches!(
            profile_from_fields(OwnerId(7), &fields),
            Err(DbError::Corrupt { .. })
        ));

        fields.remove("created_at");
        assert!(profile_from_fields(OwnerId(7), &fields).is_err());
    }

    #[test]
    fn credit_fields_skip_zero_deltas() {
        let credit = Credit::new()
            .balance(-300)
            .item(ItemKey::parse("seed:apple"), 3)
            .item(ItemKey::parse("seed:corn"), 0)
            .stat("buy.count", 3);
        let fields = credit_fields(&credit);
        assert_eq!(fields.len(), 3);
        assert_eq!(credit_delta(&credit, "balance"), -300);
        assert_eq!(credit_delta(&credit, "inventory:seed:apple"), 3);
        assert_eq!(credit_delta(&credit, "stats:buy.count"), 3);
        assert_eq!(credit_delta(&credit, "stats:missing"), 0);
        assert_eq!(display_field("inventory:seed:apple"), "seed:apple");
    }

    #[test]
    fn flatten_interleaves_pairs() {
        let flat = flatten(vec![
            ("a".to_owned(), "1".to_owned()),
            ("b".to_owned(), "2".to_owned()),
        ]);
        assert_eq!(flat, ["a", "1", "b", "2"]);
    }
}
