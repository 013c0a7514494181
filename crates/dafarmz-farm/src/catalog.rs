//! Immutable crop and item reference data.
//!
//! The catalog is built once from configuration and shared by reference.
//! Reloading builds a fresh catalog and swaps it in wholesale; plants
//! already in the ground keep the data they snapshotted at planting.
//!
//! Planets ride along in the same catalog. They are read-only lore: the
//! list a player browses, each with its biomes in order of progression.

use std::collections::BTreeMap;

use dafarmz_types::{CropDefinition, ItemCategory, ItemKey, PlanetDefinition};

use crate::error::FarmError;

/// Read-only lookup table of every item the game knows about.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CropCatalog {
    items: BTreeMap<ItemKey, CropDefinition>,
    planets: Vec<PlanetDefinition>,
}

impl CropCatalog {
    /// Build a catalog, rejecting duplicate keys.
    pub fn new(definitions: impl IntoIterator<Item = CropDefinition>) -> Result<Self, FarmError> {
        let mut items = BTreeMap::new();
        for definition in definitions {
            let key = definition.key.clone();
            if items.insert(key.clone(), definition).is_some() {
                return Err(FarmError::DuplicateItem(key));
            }
        }
        Ok(Self {
            items,
            planets: Vec::new(),
        })
    }

    /// Attach the planet list, rejecting names used twice (ignoring case).
    pub fn with_planets(
        mut self,
        planets: impl IntoIterator<Item = PlanetDefinition>,
    ) -> Result<Self, FarmError> {
        for planet in planets {
            if self.planet(&planet.name).is_some() {
                return Err(FarmError::DuplicatePlanet(planet.name));
            }
            self.planets.push(planet);
        }
        Ok(self)
    }

    /// Every planet, in catalog order.
    pub fn planets(&self) -> &[PlanetDefinition] {
        &self.planets
    }

    /// Look up a planet by name, ignoring case.
    pub fn planet(&self, name: &str) -> Option<&PlanetDefinition> {
        let name = name.trim();
        self.planets
            .iter()
            .find(|planet| planet.name.eq_ignore_ascii_case(name))
    }

    /// Look up an item by key.
    pub fn get(&self, key: &ItemKey) -> Option<&CropDefinition> {
        self.items.get(key)
    }

    /// Look up an item by key, failing with [`FarmError::UnknownItem`].
    pub fn require(&self, key: &ItemKey) -> Result<&CropDefinition, FarmError> {
        self.get(key)
            .ok_or_else(|| FarmError::UnknownItem(key.clone()))
    }

    /// Look up an item by display name, ignoring case.
    pub fn find_by_name(&self, name: &str) -> Option<&CropDefinition> {
        let name = name.trim();
        self.items
            .values()
            .find(|item| item.name.eq_ignore_ascii_case(name))
    }

    /// Resolve what a player typed: an exact key first, then a display name.
    pub fn lookup(&self, raw: &str) -> Option<&CropDefinition> {
        self.get(&ItemKey::parse(raw.trim()))
            .or_else(|| self.find_by_name(raw))
    }

    /// The seed definition a planted `plant:<name>` grew from.
    pub fn crop_for_plant(&self, plant: &ItemKey) -> Option<&CropDefinition> {
        if plant.category != ItemCategory::Plant {
            return None;
        }
        self.get(&ItemKey::new(ItemCategory::Seed, &plant.name))
    }

    /// Items the shop sells to a player of `level`.
    pub fn buyable(&self, level: u32) -> impl Iterator<Item = &CropDefinition> {
        self.items
            .values()
            .filter(move |item| item.is_buyable() && item.level_required <= level)
    }

    /// Seeds a player of `level` is allowed to grow.
    pub fn seeds_for_level(&self, level: u32) -> impl Iterator<Item = &CropDefinition> {
        self.of_category(ItemCategory::Seed)
            .filter(move |item| item.level_required <= level)
    }

    /// Every item of one category.
    pub fn of_category(&self, category: ItemCategory) -> impl Iterator<Item = &CropDefinition> {
        self.items
            .values()
            .filter(move |item| item.key.category == category)
    }

    /// Every item, in key order.
    pub fn iter(&self) -> impl Iterator<Item = &CropDefinition> {
        self.items.values()
    }

    /// Number of items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Whether the catalog is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use dafarmz_types::Environment;

    use super::*;

    fn def(key: &str, name: &str, cost: u64, level: u32) -> CropDefinition {
        let mut item = CropDefinition::new(key, name);
        item.cost = cost;
        item.level_required = level;
        item
    }

    fn catalog() -> CropCatalog {
        CropCatalog::new([
            def("seed:apple", "Apple Seed", 100, 0),
            def("seed:pumpkin", "Pumpkin Seed", 400, 5),
            def("plant:apple", "Apple", 0, 0),
            def("obstruction:rock", "Rock", 0, 0),
        ])
        .unwrap_or_default()
    }

    #[test]
    fn rejects_duplicates() {
        let result = CropCatalog::new([
            def("seed:apple", "Apple Seed", 100, 0),
            def("seed:apple", "Other Apple", 50, 0),
        ]);
        assert!(matches!(result, Err(FarmError::DuplicateItem(_))));
    }

    #[test]
    fn lookup_by_key_and_name() {
        let catalog = catalog();
        assert_eq!(catalog.len(), 4);
        assert!(catalog.get(&ItemKey::parse("seed:apple")).is_some());
        assert_eq!(
            catalog.find_by_name("pumpkin seed").map(|i| i.key.to_string()),
            Some("seed:pumpkin".to_owned())
        );
        assert_eq!(
            catalog.lookup(" Rock ").map(|i| i.key.to_string()),
            Some("obstruction:rock".to_owned())
        );
        assert!(matches!(
            catalog.require(&ItemKey::parse("seed:durian")),
            Err(FarmError::UnknownItem(_))
        ));
    }

    #[test]
    fn shop_respects_cost_and_level() {
        let catalog = catalog();
        let at_zero: Vec<String> = catalog.buyable(0).map(|i| i.key.to_string()).collect();
        assert_eq!(at_zero, ["seed:apple"]);
        assert_eq!(catalog.buyable(5).count(), 2);
        assert_eq!(catalog.seeds_for_level(4).count(), 1);
    }

    fn planet(name: &str, biomes: &[Environment]) -> PlanetDefinition {
        PlanetDefinition {
            name: name.to_owned(),
            description: String::new(),
            biomes: biomes.to_vec(),
        }
    }

    #[test]
    fn planets_keep_order_and_reject_duplicates() {
        let catalog = catalog().with_planets([
            planet("Terra", &[Environment::Grassland, Environment::RockyRivers]),
            planet("Glacius", &[Environment::ArcticWasteland]),
        ]);
        assert!(catalog.is_ok());
        let catalog = catalog.unwrap_or_default();
        let names: Vec<&str> = catalog.planets().iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, ["Terra", "Glacius"]);
        assert_eq!(
            catalog.planet("terra").and_then(|p| p.biomes.first().copied()),
            Some(Environment::Grassland)
        );

        let twice =
            CropCatalog::default().with_planets([planet("Terra", &[]), planet("TERRA", &[])]);
        assert!(matches!(twice, Err(FarmError::DuplicatePlanet(_))));
    }

    #[test]
    fn plant_maps_back_to_seed() {
        let catalog = catalog();
        let seed = catalog.crop_for_plant(&ItemKey::parse("plant:apple"));
        assert_eq!(seed.map(|s| s.key.to_string()), Some("seed:apple".to_owned()));
        assert!(catalog.crop_for_plant(&ItemKey::parse("seed:apple")).is_none());
    }
}
