//! Yield resolution: odds and amount ranges to concrete item counts.

use std::collections::BTreeMap;

use rand::Rng;
use serde::{Deserialize, Serialize};

use dafarmz_types::{ItemKey, YieldSpec, YieldTable};

/// Draw a concrete amount for one yield spec.
///
/// A uniform `u` in `[0, 1)` is drawn first. The yield triggers only when
/// `odds` is positive and not below `u`, so `odds = 1.0` always triggers and
/// `odds = 0.0` never does. A triggered yield with both `min_amount` and
/// `max_amount` set returns a uniform integer from that inclusive range
/// (reversed bounds are swapped). Otherwise it returns the fixed `amount`.
pub fn resolve(spec: &YieldSpec, rng: &mut impl Rng) -> u32 {
    let roll: f64 = rng.random();
    if spec.odds.is_nan() || spec.odds <= 0.0 || spec.odds < roll {
        return 0;
    }

    match (spec.min_amount, spec.max_amount) {
        (Some(min), Some(max)) => {
            let (low, high) = if min <= max { (min, max) } else { (max, min) };
            rng.random_range(low..=high)
        }
        _ => spec.amount,
    }
}

/// Sum of the XP rewards in a yield table.
pub fn table_xp(table: &YieldTable) -> u32 {
    table
        .values()
        .fold(0_u32, |acc, spec| acc.saturating_add(spec.xp))
}

// ---------------------------------------------------------------------------
// YieldTotals
// ---------------------------------------------------------------------------

/// Aggregated item counts from one or more harvests.
///
/// Only positive amounts are stored, so an empty harvest serializes as `{}`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct YieldTotals(BTreeMap<ItemKey, u32>);

impl YieldTotals {
    /// An empty set of totals.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Add `amount` of `key`. Zero amounts are ignored.
    pub fn add(&mut self, key: ItemKey, amount: u32) {
        if amount == 0 {
            return;
        }
        let entry = self.0.entry(key).or_insert(0);
        *entry = entry.saturating_add(amount);
    }

    /// Resolve every entry of `table` and add the results.
    pub fn add_table(&mut self, table: &YieldTable, rng: &mut impl Rng) {
        for (key, spec) in table {
            let amount = resolve(spec, rng);
            self.add(key.clone(), amount);
        }
    }

    /// Merge another set of totals into this one.
    pub fn merge(&mut self, other: Self) {
        for (key, amount) in other.0 {
            self.add(key, amount);
        }
    }

    /// Amount of `key`, or 0.
    pub fn get(&self, key: &ItemKey) -> u32 {
        self.0.get(key).copied().unwrap_or(0)
    }

    /// Whether nothing was produced.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate over `(item, amount)` pairs in key order.
    pub fn iter(&self) -> impl Iterator<Item = (&ItemKey, u32)> {
        self.0.iter().map(|(key, amount)| (key, *amount))
    }

    /// Consume into the underlying map.
    pub fn into_inner(self) -> BTreeMap<ItemKey, u32> {
        self.0
    }
}

impl<'a> IntoIterator for &'a YieldTotals {
    type Item = (&'a ItemKey, &'a u32);
    type IntoIter = std::collections::btree_map::Iter<'a, ItemKey, u32>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}

#[cfg(test)]
mod tests {
    use rand::SeedableRng;
    use rand::rngs::SmallRng;

    use super::*;

    #[test]
    fn certain_fixed_yield_always_returns_amount() {
        let mut rng = SmallRng::seed_from_u64(42);
        let spec = YieldSpec::fixed(5);
        for _ in 0..1000 {
            assert_eq!(resolve(&spec, &mut rng), 5);
        }
    }

    #[test]
    fn zero_odds_never_triggers() {
        let mut rng = SmallRng::seed_from_u64(42);
        let spec = YieldSpec::fixed(5).with_odds(0.0);
        for _ in 0..1000 {
            assert_eq!(resolve(&spec, &mut rng), 0);
        }
    }

    #[test]
    fn degenerate_range_returns_its_bound() {
        let mut rng = SmallRng::seed_from_u64(7);
        let spec = YieldSpec::ranged(2, 2);
        for _ in 0..1000 {
            assert_eq!(resolve(&spec, &mut rng), 2);
        }
    }

    #[test]
    fn range_stays_inclusive_and_swaps_reversed_bounds() {
        let mut rng = SmallRng::seed_from_u64(11);
        let spec = YieldSpec::ranged(6, 3);
        let mut seen = [false; 4];
        for _ in 0..1000 {
            let got = resolve(&spec, &mut rng);
            assert!((3..=6).contains(&got), "got {got}");
            if let Some(slot) = got.checked_sub(3).and_then(|i| seen.get_mut(i as usize)) {
                *slot = true;
            }
        }
        assert!(seen.iter().all(|hit| *hit), "every value in range drawn");
    }

    #[test]
    fn only_min_set_uses_fixed_amount() {
        let mut rng = SmallRng::seed_from_u64(3);
        let mut spec = YieldSpec::fixed(4);
        spec.min_amount = Some(10);
        assert_eq!(resolve(&spec, &mut rng), 4);
    }

    #[test]
    fn partial_odds_trigger_sometimes() {
        let mut rng = SmallRng::seed_from_u64(99);
        let spec = YieldSpec::fixed(1).with_odds(0.5);
        let hits: u32 = (0..1000).map(|_| resolve(&spec, &mut rng)).sum();
        assert!((350..=650).contains(&hits), "hits = {hits}");
    }

    #[test]
    fn nan_odds_never_trigger() {
        let mut rng = SmallRng::seed_from_u64(1);
        let spec = YieldSpec::fixed(9).with_odds(f64::NAN);
        assert_eq!(resolve(&spec, &mut rng), 0);
    }

    #[test]
    fn totals_skip_zero_and_merge_by_addition() {
        let apple = ItemKey::parse("plant:apple");
        let coin = ItemKey::parse("item:coin");

        let mut totals = YieldTotals::new();
        totals.add(apple.clone(), 2);
        totals.add(coin.clone(), 0);
        assert_eq!(totals.get(&coin), 0);
        assert_eq!(totals.iter().count(), 1);

        let mut more = YieldTotals::new();
        more.add(apple.clone(), 3);
        more.add(coin.clone(), 10);
        totals.merge(more);

        assert_eq!(totals.get(&apple), 5);
        assert_eq!(totals.get(&coin), 10);
    }

    #[test]
    fn table_xp_sums_entries() {
        let mut table = YieldTable::new();
        table.insert(ItemKey::parse("plant:apple"), YieldSpec::fixed(1).with_xp(5));
        table.insert(ItemKey::parse("item:coin"), YieldSpec::fixed(3).with_xp(2));
        assert_eq!(table_xp(&table), 7);
    }

    #[test]
    fn empty_totals_serialize_as_empty_object() {
        let json = serde_json::to_string(&YieldTotals::new()).unwrap_or_default();
        assert_eq!(json, "{}");
    }
}
