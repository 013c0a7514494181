//! The game service: one method per player command.
//!
//! Every mutating command follows the same shape:
//!
//! 1. take the owner's lock ([`OwnerLocks`]),
//! 2. load the documents it needs from the [`GameStore`],
//! 3. mutate them in memory with the `dafarmz-farm` mechanics,
//! 4. save the documents back,
//! 5. credit the profile through one atomic [`Credit`].
//!
//! Steps 4 and 5 are separate round trips. A crash between them loses the
//! reward (at most once), never duplicates it.

use std::sync::{Arc, PoisonError, RwLock};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use dafarmz_farm::{
    CropCatalog, FarmError, HarvestOutcome, Location, Plot, Scenario, YieldTotals, current_stage,
    growth, visual_stage,
};
use dafarmz_types::{CropDefinition, Environment, ItemKey, OwnerId, PlanetDefinition, ScenarioId};

use crate::challenges::{COIN, COUNT, ChallengeAction, ChallengeError, ChallengeOption, Challenges, XP};
use crate::clock::Clock;
use crate::config::GameConfig;
use crate::leveling::Leveling;
use crate::locks::OwnerLocks;
use crate::store::{Credit, Farm, GameStore, Profile, StoreError, XP_STAT};

/// Errors surfaced to a player command.
#[derive(Debug, thiserror::Error)]
pub enum GameError {
    /// The owner has no profile yet.
    #[error("you don't have a farm yet")]
    NotRegistered(OwnerId),

    /// The owner already has a profile.
    #[error("you already have a farm")]
    AlreadyRegistered(OwnerId),

    /// A location or scenario interaction was rejected.
    #[error(transparent)]
    Farm(#[from] FarmError),

    /// No catalog item matches what the player typed.
    #[error("unknown item: {0}")]
    UnknownItem(String),

    /// The location is occupied or the item is not a seed.
    #[error("you can't plant that here ({location})")]
    CannotPlant {
        /// The requested location.
        location: Location,
    },

    /// The item needs a higher player level.
    #[error("you need level {required} for that (you are level {level})")]
    LevelTooLow {
        /// Level the item requires.
        required: u32,
        /// The player's level.
        level: u32,
    },

    /// No cell on the farm was ready.
    #[error("nothing to harvest")]
    NothingToHarvest,

    /// The shop does not sell the item.
    #[error("{0} is not for sale")]
    NotForSale(ItemKey),

    /// The shop does not buy the item.
    #[error("{0} can't be sold")]
    NotSellable(ItemKey),

    /// A trade quantity of zero.
    #[error("quantity must be at least 1")]
    InvalidQuantity,

    /// A payment to a player without a profile.
    #[error("recipient {0} does not have a farm")]
    UnknownRecipient(OwnerId),

    /// A payment from a player to themselves.
    #[error("you can't pay yourself")]
    SelfPayment,

    /// The player lacks the balance or items for a trade.
    #[error("not enough {what}: you have {available}, need {needed}")]
    NotEnough {
        /// What ran short.
        what: String,
        /// What the player has.
        available: u64,
        /// What the command needed.
        needed: u64,
    },

    /// The owner has no active scenario.
    #[error("you are not exploring anywhere")]
    NoScenario,

    /// A challenge operation was rejected.
    #[error(transparent)]
    Challenge(#[from] ChallengeError),

    /// An amount does not fit in the counters.
    #[error("amount too large")]
    Overflow,

    /// Storage failed.
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for GameError {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::ProfileNotFound(owner) => Self::NotRegistered(owner),
            StoreError::Insufficient {
                what,
                available,
                needed,
            } => Self::NotEnough {
                what,
                available,
                needed,
            },
            StoreError::Overflow(_) => Self::Overflow,
            other @ StoreError::Backend { .. } => Self::Store(other),
        }
    }
}

// ---------------------------------------------------------------------------
// Views and reports
// ---------------------------------------------------------------------------

/// A profile with its derived level.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProfileSummary {
    /// The stored profile.
    pub profile: Profile,
    /// Current level.
    pub level: u32,
    /// Current experience.
    pub xp: u64,
    /// Experience at which the next level starts.
    pub next_level_xp: u64,
}

/// One occupied cell as a player sees it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CellView {
    /// Where the cell is.
    pub location: Location,
    /// What occupies it.
    pub key: ItemKey,
    /// Raw growth stage.
    pub stage: u32,
    /// Lifecycle image index.
    pub visual_stage: u32,
    /// Whether it can be harvested now.
    pub ready: bool,
    /// Harvests left, for growing items.
    pub yields_remaining: Option<u32>,
}

/// A plot rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlotView {
    /// The plot's environment.
    pub environment: Environment,
    /// Grid width.
    pub columns: u8,
    /// Grid height.
    pub rows: u32,
    /// Occupied cells in location order.
    pub cells: Vec<CellView>,
}

impl PlotView {
    /// Describe `plot` as of `now`.
    pub fn new(plot: &Plot, columns: u8, rows: u32, now: DateTime<Utc>) -> Self {
        let cells = plot
            .iter()
            .map(|(location, item)| {
                let data = item.data.as_ref();
                CellView {
                    location,
                    key: item.key.clone(),
                    stage: data.map_or(0, |d| current_stage(d, now)),
                    visual_stage: data.map_or(0, |d| visual_stage(d, now)),
                    ready: data.is_some_and(|d| growth::is_ready(d, now)),
                    yields_remaining: data.map(|d| d.yields_remaining),
                }
            })
            .collect();
        Self {
            environment: plot.environment,
            columns,
            rows,
            cells,
        }
    }
}

/// An active scenario rendered for display.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ScenarioView {
    /// Scenario id.
    pub id: ScenarioId,
    /// Level it was stocked for.
    pub level: u32,
    /// When it was generated.
    pub created_at: DateTime<Utc>,
    /// Its cells.
    pub plot: PlotView,
}

/// Result of planting a seed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlantReport {
    /// Where it was planted.
    pub location: Location,
    /// The plant now in the cell.
    pub key: ItemKey,
    /// XP awarded.
    pub xp: u64,
}

/// Result of a harvest or scenario interaction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HarvestReport {
    /// Items produced.
    pub yields: YieldTotals,
    /// XP awarded.
    pub xp: u64,
    /// Cells harvested.
    pub harvested: Vec<Location>,
    /// Cells that died.
    pub died: Vec<Location>,
    /// Balance after crediting.
    pub balance: u64,
}

/// Result of a buy or sell.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TradeReport {
    /// The item traded.
    pub item: ItemKey,
    /// Units traded.
    pub quantity: u64,
    /// Cents paid or received.
    pub total: u64,
    /// Balance afterwards.
    pub balance: u64,
    /// Units held afterwards.
    pub held: u64,
}

/// Result of a player-to-player payment.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PaymentReport {
    /// Who paid.
    pub from: OwnerId,
    /// Who was paid.
    pub to: OwnerId,
    /// Cents transferred.
    pub amount: u64,
    /// The payer's balance afterwards.
    pub balance: u64,
}

/// Result of claiming a challenge.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClaimReport {
    /// The claimed option.
    pub claimed: ChallengeOption,
    /// Balance afterwards.
    pub balance: u64,
    /// XP afterwards.
    pub xp: u64,
}

// ---------------------------------------------------------------------------
// GameService
// ---------------------------------------------------------------------------

/// Orchestrates player commands over a [`GameStore`].
pub struct GameService<S> {
    store: S,
    config: GameConfig,
    catalog: RwLock<Arc<CropCatalog>>,
    clock: Arc<dyn Clock>,
    leveling: Leveling,
    locks: OwnerLocks,
}

impl<S> core::fmt::Debug for GameService<S> {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("GameService")
            .field("config", &self.config)
            .field("leveling", &self.leveling)
            .finish_non_exhaustive()
    }
}

impl<S: GameStore> GameService<S> {
    /// Build a service.
    pub fn new(store: S, config: GameConfig, catalog: CropCatalog, clock: Arc<dyn Clock>) -> Self {
        let leveling = Leveling::from_config(&config.leveling);
        Self {
            store,
            config,
            catalog: RwLock::new(Arc::new(catalog)),
            clock,
            leveling,
            locks: OwnerLocks::new(),
        }
    }

    /// The underlying store.
    pub const fn store(&self) -> &S {
        &self.store
    }

    /// The game configuration.
    pub const fn config(&self) -> &GameConfig {
        &self.config
    }

    /// The XP curve.
    pub const fn leveling(&self) -> &Leveling {
        &self.leveling
    }

    /// A snapshot of the current catalog.
    pub fn catalog(&self) -> Arc<CropCatalog> {
        Arc::clone(&self.catalog.read().unwrap_or_else(PoisonError::into_inner))
    }

    /// Swap in a new catalog. Plants already in the ground are unaffected.
    pub fn replace_catalog(&self, catalog: CropCatalog) {
        let items = catalog.len();
        *self.catalog.write().unwrap_or_else(PoisonError::into_inner) = Arc::new(catalog);
        info!(items, "catalog replaced");
    }

    /// Current time according to the service's clock.
    pub fn now(&self) -> DateTime<Utc> {
        self.clock.now()
    }

    // -----------------------------------------------------------------------
    // Profiles
    // -----------------------------------------------------------------------

    /// Register a player: a profile with a fresh challenge board, and an
    /// empty farm.
    pub async fn setup(&self, owner: OwnerId) -> Result<ProfileSummary, GameError> {
        let _guard = self.locks.lock(owner).await;
        if self.store.load_profile(owner).await?.is_some() {
            return Err(GameError::AlreadyRegistered(owner));
        }

        let now = self.now();
        let catalog = self.catalog();
        let challenges = {
            let mut rng = rand::rng();
            Challenges::generate(1, &self.config.challenges, &catalog, now, &mut rng)
        };
        let profile = Profile::new(owner, now, self.config.economy.starting_balance, challenges);
        if !self.store.create_profile(&profile).await? {
            return Err(GameError::AlreadyRegistered(owner));
        }
        if self.store.load_farm(owner).await?.is_none() {
            self.store.save_farm(&Farm::new(owner)).await?;
        }

        info!(%owner, "player registered");
        Ok(self.summarize(profile))
    }

    /// A player's profile with level information.
    pub async fn profile(&self, owner: OwnerId) -> Result<ProfileSummary, GameError> {
        let profile = self.require_profile(owner).await?;
        Ok(self.summarize(profile))
    }

    /// Credit the vote bonus. Weekend votes pay more.
    pub async fn vote(&self, owner: OwnerId, is_weekend: bool) -> Result<u64, GameError> {
        let economy = &self.config.economy;
        let bonus = if is_weekend {
            economy.weekend_vote_bonus
        } else {
            economy.vote_bonus
        };
        let credit = Credit::new()
            .balance(to_delta(bonus)?)
            .stat("vote.count", 1);
        self.store.credit(owner, &credit).await?;
        info!(%owner, bonus, is_weekend, "vote bonus credited");
        Ok(bonus)
    }

    /// Transfer `amount` cents from one player to another.
    ///
    /// Both players must be registered. The recipient is checked before the
    /// payer is debited; if crediting the recipient still fails, the payer is
    /// refunded.
    pub async fn pay(
        &self,
        from: OwnerId,
        to: OwnerId,
        amount: u64,
    ) -> Result<PaymentReport, GameError> {
        if amount == 0 {
            return Err(GameError::InvalidQuantity);
        }
        if from == to {
            return Err(GameError::SelfPayment);
        }
        let delta = to_delta(amount)?;

        // Fixed order so two opposite payments cannot deadlock.
        let (first, second) = if from < to { (from, to) } else { (to, from) };
        let _first = self.locks.lock(first).await;
        let _second = self.locks.lock(second).await;

        self.require_profile(from).await?;
        if self.store.load_profile(to).await?.is_none() {
            return Err(GameError::UnknownRecipient(to));
        }

        let sent = Credit::new()
            .balance(delta.saturating_neg())
            .stat("pay.sent", delta);
        let payer = self.store.credit(from, &sent).await?;

        let received = Credit::new()
            .balance(delta)
            .stat("pay.received", delta);
        if let Err(err) = self.store.credit(to, &received).await {
            warn!(%from, %to, amount, error = %err, "payment not delivered, refunding");
            let refund = Credit::new()
                .balance(delta)
                .stat("pay.sent", delta.saturating_neg());
            self.store.credit(from, &refund).await?;
            return Err(match err {
                StoreError::ProfileNotFound(_) => GameError::UnknownRecipient(to),
                other => other.into(),
            });
        }

        info!(%from, %to, amount, "payment sent");
        Ok(PaymentReport {
            from,
            to,
            amount,
            balance: payer.balance,
        })
    }

    // -----------------------------------------------------------------------
    // Farm
    // -----------------------------------------------------------------------

    /// The player's farm as of now.
    pub async fn farm(&self, owner: OwnerId) -> Result<PlotView, GameError> {
        let farm = self.require_farm(owner).await?;
        let grid = &self.config.farm;
        Ok(PlotView::new(&farm.plot, grid.columns, grid.rows, self.now()))
    }

    /// Plant a seed at a location.
    ///
    /// `seed` may be an item key (`seed:apple`) or a display name.
    pub async fn plant(
        &self,
        owner: OwnerId,
        location: &str,
        seed: &str,
    ) -> Result<PlantReport, GameError> {
        let location = self.farm_location(location)?;
        let catalog = self.catalog();
        let crop = lookup(&catalog, seed)?;

        let _guard = self.locks.lock(owner).await;
        let profile = self.require_profile(owner).await?;
        self.check_level(&profile, crop)?;

        let mut farm = self
            .store
            .load_farm(owner)
            .await?
            .unwrap_or_else(|| Farm::new(owner));
        if !farm.plot.plant(location, crop, self.now()) {
            return Err(GameError::CannotPlant { location });
        }
        self.store.save_farm(&farm).await?;

        let xp = u64::from(self.config.farm.plant_xp);
        let credit = Credit::new()
            .stat(XP_STAT, to_delta(xp)?)
            .stat("plant.count", 1)
            .stat(format!("plant.{}", crop.key), 1);
        self.store.credit(owner, &credit).await?;
        self.record_progress(owner, ChallengeAction::Plant, &crop.key.to_string(), 1)
            .await?;

        let key = crop.key.as_plant();
        info!(%owner, %location, %key, "planted");
        Ok(PlantReport { location, key, xp })
    }

    /// Harvest every ready cell on the farm.
    pub async fn harvest(&self, owner: OwnerId) -> Result<HarvestReport, GameError> {
        let _guard = self.locks.lock(owner).await;
        let mut farm = self.require_farm(owner).await?;

        let now = self.now();
        let outcome = {
            let mut rng = rand::rng();
            farm.plot.harvest(now, &mut rng)
        };
        if outcome.is_empty() {
            return Err(GameError::NothingToHarvest);
        }
        self.store.save_farm(&farm).await?;

        let xp = u64::from(outcome.xp);
        let credit = reward_credit(&outcome.yields, xp, "harvest")?;
        let profile = self.store.credit(owner, &credit).await?;
        self.record_progress(owner, ChallengeAction::Harvest, COUNT, 1)
            .await?;

        info!(
            %owner,
            cells = outcome.harvested.len(),
            died = outcome.died.len(),
            xp,
            "harvested farm"
        );
        Ok(report(outcome, xp, profile.balance))
    }

    /// Clear a cell. Returns whether anything was there.
    pub async fn remove_plant(&self, owner: OwnerId, location: &str) -> Result<bool, GameError> {
        let location = self.farm_location(location)?;
        let _guard = self.locks.lock(owner).await;
        let mut farm = self.require_farm(owner).await?;
        let Some(removed) = farm.plot.remove_plant(location) else {
            return Ok(false);
        };
        self.store.save_farm(&farm).await?;
        info!(%owner, %location, key = %removed.key, "removed plant");
        Ok(true)
    }

    // -----------------------------------------------------------------------
    // Shop
    // -----------------------------------------------------------------------

    /// The planets players can read about, in catalog order.
    pub fn planets(&self) -> Vec<PlanetDefinition> {
        self.catalog().planets().to_vec()
    }

    /// Items the shop sells. With an owner, only items at their level.
    pub async fn shop(&self, owner: Option<OwnerId>) -> Result<Vec<CropDefinition>, GameError> {
        let level = match owner {
            Some(owner) => self.level_of(&self.require_profile(owner).await?),
            None => u32::MAX,
        };
        Ok(self.catalog().buyable(level).cloned().collect())
    }

    /// Buy `quantity` units of an item.
    pub async fn buy(
        &self,
        owner: OwnerId,
        item: &str,
        quantity: u64,
    ) -> Result<TradeReport, GameError> {
        if quantity == 0 {
            return Err(GameError::InvalidQuantity);
        }
        let catalog = self.catalog();
        let def = lookup(&catalog, item)?;
        if !def.is_buyable() {
            return Err(GameError::NotForSale(def.key.clone()));
        }
        let total = def.cost.checked_mul(quantity).ok_or(GameError::Overflow)?;

        let _guard = self.locks.lock(owner).await;
        let profile = self.require_profile(owner).await?;
        self.check_level(&profile, def)?;

        let credit = Credit::new()
            .balance(to_delta(total)?.saturating_neg())
            .item(def.key.clone(), to_delta(quantity)?)
            .stat("buy.count", to_delta(quantity)?);
        let profile = self.store.credit(owner, &credit).await?;
        self.record_progress(owner, ChallengeAction::Buy, &def.key.to_string(), quantity)
            .await?;

        info!(%owner, item = %def.key, quantity, total, "bought");
        Ok(TradeReport {
            item: def.key.clone(),
            quantity,
            total,
            balance: profile.balance,
            held: profile.item_count(&def.key),
        })
    }

    /// Sell `quantity` units of an item back to the shop.
    pub async fn sell(
        &self,
        owner: OwnerId,
        item: &str,
        quantity: u64,
    ) -> Result<TradeReport, GameError> {
        if quantity == 0 {
            return Err(GameError::InvalidQuantity);
        }
        let catalog = self.catalog();
        let def = lookup(&catalog, item)?;
        if def.resell_price == 0 {
            return Err(GameError::NotSellable(def.key.clone()));
        }
        let total = def
            .resell_price
            .checked_mul(quantity)
            .ok_or(GameError::Overflow)?;

        let _guard = self.locks.lock(owner).await;
        let credit = Credit::new()
            .item(def.key.clone(), to_delta(quantity)?.saturating_neg())
            .balance(to_delta(total)?)
            .stat("sell.count", to_delta(quantity)?);
        let profile = self.store.credit(owner, &credit).await?;
        self.record_progress(owner, ChallengeAction::Sell, &def.key.to_string(), quantity)
            .await?;

        info!(%owner, item = %def.key, quantity, total, "sold");
        Ok(TradeReport {
            item: def.key.clone(),
            quantity,
            total,
            balance: profile.balance,
            held: profile.item_count(&def.key),
        })
    }

    // -----------------------------------------------------------------------
    // Challenges
    // -----------------------------------------------------------------------

    /// The player's challenge board.
    pub async fn challenges(&self, owner: OwnerId) -> Result<Challenges, GameError> {
        Ok(self.require_profile(owner).await?.challenges)
    }

    /// Regenerate the challenge board, at most once per refresh interval.
    pub async fn refresh_challenges(&self, owner: OwnerId) -> Result<Challenges, GameError> {
        let _guard = self.locks.lock(owner).await;
        let profile = self.require_profile(owner).await?;
        let level = self.challenge_level(&profile);
        let mut challenges = profile.challenges;

        let catalog = self.catalog();
        let now = self.now();
        {
            let mut rng = rand::rng();
            challenges.refresh(level, &self.config.challenges, &catalog, now, &mut rng)?;
        }
        // The limit follows the current configuration.
        challenges.max_active = self.config.challenges.max_active;
        self.store.save_challenges(owner, &challenges).await?;
        info!(%owner, options = challenges.options.len(), "challenges refreshed");
        Ok(challenges)
    }

    /// Accept the challenge at `index`.
    pub async fn accept_challenge(
        &self,
        owner: OwnerId,
        index: usize,
    ) -> Result<Challenges, GameError> {
        let _guard = self.locks.lock(owner).await;
        let mut challenges = self.require_profile(owner).await?.challenges;
        challenges.accept(index)?;
        self.store.save_challenges(owner, &challenges).await?;
        info!(%owner, index, "challenge accepted");
        Ok(challenges)
    }

    /// Claim a completed challenge and credit its rewards.
    pub async fn claim_challenge(
        &self,
        owner: OwnerId,
        index: usize,
    ) -> Result<ClaimReport, GameError> {
        let _guard = self.locks.lock(owner).await;
        let profile = self.require_profile(owner).await?;
        let level = self.challenge_level(&profile);
        let mut challenges = profile.challenges;

        let catalog = self.catalog();
        let claimed = {
            let mut rng = rand::rng();
            challenges.claim(index, level, &catalog, &mut rng)?
        };
        self.store.save_challenges(owner, &challenges).await?;

        let mut credit = Credit::new().stat("challenge.count", 1);
        for (key, amount) in &claimed.rewards {
            let delta = to_delta(*amount)?;
            credit = match key.to_string().as_str() {
                COIN => credit.balance(delta),
                XP => credit.stat(XP_STAT, delta).stat("challenge.xp", delta),
                _ => credit.item(key.clone(), delta),
            };
            credit = credit.stat(format!("challenge.{key}"), delta);
        }
        let profile = self.store.credit(owner, &credit).await?;

        info!(%owner, index, description = %claimed.description, "challenge claimed");
        Ok(ClaimReport {
            claimed,
            balance: profile.balance,
            xp: profile.xp(),
        })
    }

    // -----------------------------------------------------------------------
    // Scenarios
    // -----------------------------------------------------------------------

    /// Generate a new scenario at the player's level, replacing any active one.
    pub async fn explore(&self, owner: OwnerId) -> Result<ScenarioView, GameError> {
        let _guard = self.locks.lock(owner).await;
        let profile = self.require_profile(owner).await?;
        let level = self.level_of(&profile);

        let catalog = self.catalog();
        let now = self.now();
        let scenario = {
            let mut rng = rand::rng();
            Scenario::generate(&self.config.scenario.settings(), level, &catalog, now, &mut rng)
        };
        self.store.save_scenario(owner, &scenario).await?;

        info!(
            %owner,
            environment = %scenario.plot.environment,
            cells = scenario.plot.len(),
            "scenario generated"
        );
        Ok(self.scenario_view(&scenario, now))
    }

    /// The player's active scenario.
    pub async fn scenario(&self, owner: OwnerId) -> Result<ScenarioView, GameError> {
        let scenario = self
            .store
            .load_scenario(owner)
            .await?
            .ok_or(GameError::NoScenario)?;
        Ok(self.scenario_view(&scenario, self.now()))
    }

    /// Harvest one scenario cell on the spot.
    pub async fn interact(&self, owner: OwnerId, location: &str) -> Result<HarvestReport, GameError> {
        let settings = &self.config.scenario;
        let location = Location::parse(location)?.ensure_within(settings.columns, settings.rows)?;

        let _guard = self.locks.lock(owner).await;
        self.require_profile(owner).await?;
        let mut scenario = self
            .store
            .load_scenario(owner)
            .await?
            .ok_or(GameError::NoScenario)?;

        let now = self.now();
        let outcome = {
            let mut rng = rand::rng();
            scenario.interact(location, now, &mut rng)?
        };
        self.store.save_scenario(owner, &scenario).await?;

        // Scenario finds pay a flat amount; per-yield XP only applies on the farm.
        let xp = u64::from(settings.interact_xp);
        let credit = reward_credit(&outcome.yields, xp, "scenario.harvest")?;
        let profile = self.store.credit(owner, &credit).await?;

        info!(%owner, %location, xp, "scenario cell collected");
        Ok(report(outcome, xp, profile.balance))
    }

    /// Leave the active scenario. Returns whether there was one.
    pub async fn leave_scenario(&self, owner: OwnerId) -> Result<bool, GameError> {
        let _guard = self.locks.lock(owner).await;
        Ok(self.store.delete_scenario(owner).await?)
    }

    // -----------------------------------------------------------------------
    // Helpers
    // -----------------------------------------------------------------------

    async fn require_profile(&self, owner: OwnerId) -> Result<Profile, GameError> {
        self.store
            .load_profile(owner)
            .await?
            .ok_or(GameError::NotRegistered(owner))
    }

    async fn require_farm(&self, owner: OwnerId) -> Result<Farm, GameError> {
        self.store
            .load_farm(owner)
            .await?
            .ok_or(GameError::NotRegistered(owner))
    }

    /// Advance challenge progress and persist the board if it changed.
    async fn record_progress(
        &self,
        owner: OwnerId,
        action: ChallengeAction,
        item: &str,
        by: u64,
    ) -> Result<(), GameError> {
        let mut challenges = self.require_profile(owner).await?.challenges;
        if challenges.record_progress(action, item, by) {
            self.store.save_challenges(owner, &challenges).await?;
            debug!(%owner, ?action, item, by, "challenge progress");
        }
        Ok(())
    }

    fn farm_location(&self, raw: &str) -> Result<Location, GameError> {
        let grid = &self.config.farm;
        Ok(Location::parse(raw)?.ensure_within(grid.columns, grid.rows)?)
    }

    fn level_of(&self, profile: &Profile) -> u32 {
        self.leveling.level_from_xp(profile.xp())
    }

    /// Challenges are generated one level above the player.
    fn challenge_level(&self, profile: &Profile) -> u32 {
        self.level_of(profile).saturating_add(1)
    }

    fn check_level(&self, profile: &Profile, item: &CropDefinition) -> Result<(), GameError> {
        let level = self.level_of(profile);
        if item.level_required > level {
            return Err(GameError::LevelTooLow {
                required: item.level_required,
                level,
            });
        }
        Ok(())
    }

    fn summarize(&self, profile: Profile) -> ProfileSummary {
        let xp = profile.xp();
        ProfileSummary {
            level: self.leveling.level_from_xp(xp),
            xp,
            next_level_xp: self.leveling.next_level_xp(xp),
            profile,
        }
    }

    fn scenario_view(&self, scenario: &Scenario, now: DateTime<Utc>) -> ScenarioView {
        let settings = &self.config.scenario;
        ScenarioView {
            id: scenario.id,
            level: scenario.level,
            created_at: scenario.created_at,
            plot: PlotView::new(&scenario.plot, settings.columns, settings.rows, now),
        }
    }
}

/// Resolve what a player typed against the catalog.
fn lookup<'a>(catalog: &'a CropCatalog, raw: &str) -> Result<&'a CropDefinition, GameError> {
    catalog
        .lookup(raw)
        .ok_or_else(|| GameError::UnknownItem(raw.trim().to_owned()))
}

fn to_delta(amount: u64) -> Result<i64, GameError> {
    i64::try_from(amount).map_err(|_overflow| GameError::Overflow)
}

/// Turn harvested items and XP into a credit with `<prefix>.*` stats.
///
/// `item:coin` goes to the balance and `item:xp` to experience; everything
/// else lands in the inventory.
fn reward_credit(yields: &YieldTotals, xp: u64, prefix: &str) -> Result<Credit, GameError> {
    let mut bonus_xp = 0_u64;
    let mut credit = Credit::new().stat(format!("{prefix}.count"), 1);
    for (key, amount) in yields.iter() {
        let delta = i64::from(amount);
        credit = match key.to_string().as_str() {
            COIN => credit.balance(delta),
            XP => {
                bonus_xp = bonus_xp.saturating_add(u64::from(amount));
                credit
            }
            _ => credit.item(key.clone(), delta),
        };
        credit = credit.stat(format!("{prefix}.{key}"), delta);
    }
    let total_xp = to_delta(xp.saturating_add(bonus_xp))?;
    Ok(credit
        .stat(XP_STAT, total_xp)
        .stat(format!("{prefix}.xp"), total_xp))
}

fn report(outcome: HarvestOutcome, xp: u64, balance: u64) -> HarvestReport {
    HarvestReport {
        yields: outcome.yields,
        xp,
        harvested: outcome.harvested,
        died: outcome.died,
        balance,
    }
}

#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone};

    use dafarmz_types::YieldSpec;

    use super::*;
    use crate::clock::ManualClock;
    use crate::store::MemoryStore;

    fn t0() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0)
            .single()
            .unwrap_or_default()
    }

    fn key(raw: &str) -> ItemKey {
        ItemKey::parse(raw)
    }

    fn catalog() -> CropCatalog {
        let mut apple = CropDefinition::new("seed:apple", "Apple Seed");
        apple.cost = 100;
        apple.grow_time_hr = 1.0;
        apple.total_yields = 2;
        apple
            .yields
            .insert(key("plant:apple"), YieldSpec::fixed(1).with_xp(5));

        let mut produce = CropDefinition::new("plant:apple", "Apple");
        produce.resell_price = 30;

        let mut pumpkin = CropDefinition::new("seed:pumpkin", "Pumpkin Seed");
        pumpkin.cost = 500;
        pumpkin.level_required = 5;

        let mut chest = CropDefinition::new("treasure:chest", "Chest");
        chest.yields.insert(key("item:coin"), YieldSpec::fixed(250));

        CropCatalog::new([apple, produce, pumpkin, chest]).unwrap_or_default()
    }

    struct Harness {
        service: GameService<MemoryStore>,
        clock: Arc<ManualClock>,
    }

    fn harness_with(config: GameConfig) -> Harness {
        let clock = Arc::new(ManualClock::new(t0()));
        let service = GameService::new(MemoryStore::new(), config, catalog(), clock.clone());
        Harness { service, clock }
    }

    fn harness() -> Harness {
        let mut config = GameConfig::default();
        config.economy.starting_balance = 1_000;
        harness_with(config)
    }

    const OWNER: OwnerId = OwnerId(42);

    #[tokio::test]
    async fn setup_creates_profile_and_farm_once() {
        let h = harness();
        let summary = h.service.setup(OWNER).await;
        assert!(summary.as_ref().is_ok_and(|s| s.profile.balance == 1_000));
        assert!(summary.is_ok_and(|s| s.profile.challenges.options.len() == 3));

        assert!(h.service.farm(OWNER).await.is_ok_and(|f| f.cells.is_empty()));
        assert!(matches!(
            h.service.setup(OWNER).await,
            Err(GameError::AlreadyRegistered(_))
        ));
    }

    #[tokio::test]
    async fn commands_require_registration() {
        let h = harness();
        assert!(matches!(
            h.service.harvest(OWNER).await,
            Err(GameError::NotRegistered(_))
        ));
        assert!(matches!(
            h.service.plant(OWNER, "A1", "seed:apple").await,
            Err(GameError::NotRegistered(_))
        ));
        assert!(matches!(
            h.service.vote(OWNER, false).await,
            Err(GameError::NotRegistered(_))
        ));
    }

    #[tokio::test]
    async fn plant_and_harvest_apple_over_time() {
        let h = harness();
        assert!(h.service.setup(OWNER).await.is_ok());

        let planted = h.service.plant(OWNER, "a1", "Apple Seed").await;
        assert!(planted.is_ok_and(|p| p.key == key("plant:apple") && p.xp == 10));

        h.clock.advance(Duration::minutes(30));
        assert!(matches!(
            h.service.harvest(OWNER).await,
            Err(GameError::NothingToHarvest)
        ));

        h.clock.advance(Duration::minutes(31));
        let first = h.service.harvest(OWNER).await;
        assert!(first.as_ref().is_ok_and(|r| r.yields.get(&key("plant:apple")) == 1));
        assert!(first.is_ok_and(|r| r.xp == 5 && r.died.is_empty()));

        h.clock.advance(Duration::minutes(61));
        let last = h.service.harvest(OWNER).await;
        assert!(last.is_ok_and(|r| r.died.len() == 1));
        assert!(h.service.farm(OWNER).await.is_ok_and(|f| f.cells.is_empty()));

        let profile = h.service.profile(OWNER).await;
        let profile = profile.map(|s| s.profile);
        assert!(profile.as_ref().is_ok_and(|p| p.item_count(&key("plant:apple")) == 2));
        assert!(profile.as_ref().is_ok_and(|p| p.xp() == 20));
        assert!(profile.as_ref().is_ok_and(|p| p.stat("harvest.count") == 2));
        assert!(profile.as_ref().is_ok_and(|p| p.stat("plant.count") == 1));
        assert!(profile.is_ok_and(|p| p.stat("plant.seed:apple") == 1));
    }

    #[tokio::test]
    async fn planting_is_rejected_on_bad_input() {
        let h = harness();
        assert!(h.service.setup(OWNER).await.is_ok());
        assert!(h.service.plant(OWNER, "A1", "seed:apple").await.is_ok());

        assert!(matches!(
            h.service.plant(OWNER, "A1", "seed:apple").await,
            Err(GameError::CannotPlant { .. })
        ));
        assert!(matches!(
            h.service.plant(OWNER, "A2", "plant:apple").await,
            Err(GameError::CannotPlant { .. })
        ));
        assert!(matches!(
            h.service.plant(OWNER, "Z9", "seed:apple").await,
            Err(GameError::Farm(FarmError::LocationOutOfBounds { .. }))
        ));
        assert!(matches!(
            h.service.plant(OWNER, "nowhere", "seed:apple").await,
            Err(GameError::Farm(FarmError::InvalidLocation(_)))
        ));
        assert!(matches!(
            h.service.plant(OWNER, "A2", "seed:durian").await,
            Err(GameError::UnknownItem(_))
        ));
        assert!(matches!(
            h.service.plant(OWNER, "A2", "seed:pumpkin").await,
            Err(GameError::LevelTooLow { required: 5, .. })
        ));
    }

    #[tokio::test]
    async fn remove_plant_is_idempotent() {
        let h = harness();
        assert!(h.service.setup(OWNER).await.is_ok());
        assert!(h.service.plant(OWNER, "B2", "seed:apple").await.is_ok());
        assert!(h.service.remove_plant(OWNER, "B2").await.is_ok_and(|r| r));
        assert!(h.service.remove_plant(OWNER, "B2").await.is_ok_and(|r| !r));
    }

    #[tokio::test]
    async fn buy_and_sell_move_money_and_items() {
        let h = harness();
        assert!(h.service.setup(OWNER).await.is_ok());

        let bought = h.service.buy(OWNER, "seed:apple", 3).await;
        assert!(bought.is_ok_and(|t| t.total == 300 && t.balance == 700 && t.held == 3));

        assert!(matches!(
            h.service.buy(OWNER, "seed:apple", 8).await,
            Err(GameError::NotEnough { needed: 800, available: 700, .. })
        ));
        assert!(matches!(
            h.service.buy(OWNER, "seed:apple", 0).await,
            Err(GameError::InvalidQuantity)
        ));
        assert!(matches!(
            h.service.buy(OWNER, "plant:apple", 1).await,
            Err(GameError::NotForSale(_))
        ));
        assert!(matches!(
            h.service.sell(OWNER, "plant:apple", 1).await,
            Err(GameError::NotEnough { .. })
        ));
        assert!(matches!(
            h.service.sell(OWNER, "seed:apple", 1).await,
            Err(GameError::NotSellable(_))
        ));
    }

    #[tokio::test]
    async fn selling_harvested_produce() {
        let h = harness();
        assert!(h.service.setup(OWNER).await.is_ok());
        assert!(h.service.plant(OWNER, "A1", "seed:apple").await.is_ok());
        h.clock.advance(Duration::hours(1));
        assert!(h.service.harvest(OWNER).await.is_ok());

        let sold = h.service.sell(OWNER, "Apple", 1).await;
        assert!(sold.is_ok_and(|t| t.total == 30 && t.balance == 1_030 && t.held == 0));
    }

    #[tokio::test]
    async fn shop_filters_by_level() {
        let h = harness();
        assert!(h.service.setup(OWNER).await.is_ok());
        let everything = h.service.shop(None).await;
        assert!(everything.is_ok_and(|items| items.len() == 2));
        let mine = h.service.shop(Some(OWNER)).await;
        assert!(mine.is_ok_and(|items| items.len() == 1));
    }

    #[tokio::test]
    async fn vote_pays_weekend_bonus() {
        let h = harness();
        assert!(h.service.setup(OWNER).await.is_ok());
        assert!(h.service.vote(OWNER, false).await.is_ok_and(|b| b == 500));
        assert!(h.service.vote(OWNER, true).await.is_ok_and(|b| b == 1000));
        let balance = h.service.profile(OWNER).await.map(|s| s.profile.balance);
        assert!(balance.is_ok_and(|b| b == 2_500));
    }

    #[tokio::test]
    async fn challenge_flow_from_accept_to_claim() {
        let h = harness();
        assert!(h.service.setup(OWNER).await.is_ok());

        // Replace the random board with a known harvest goal.
        let mut goal = crate::challenges::GoalTable::new();
        goal.entry(ChallengeAction::Harvest)
            .or_default()
            .insert(COUNT.to_owned(), 1);
        let mut rewards = std::collections::BTreeMap::new();
        rewards.insert(key(COIN), 200);
        rewards.insert(key(XP), 50);
        let board = Challenges {
            last_refreshed_at: t0(),
            max_active: 1,
            options: vec![ChallengeOption {
                description: "Harvest your farm 1 times".to_owned(),
                rewards,
                goal_stats: goal,
                ..ChallengeOption::default()
            }],
        };
        assert!(h.service.store().save_challenges(OWNER, &board).await.is_ok());

        assert!(matches!(
            h.service.claim_challenge(OWNER, 0).await,
            Err(GameError::Challenge(ChallengeError::NotCompleted(0)))
        ));
        assert!(h.service.accept_challenge(OWNER, 0).await.is_ok());

        assert!(h.service.plant(OWNER, "A1", "seed:apple").await.is_ok());
        h.clock.advance(Duration::hours(1));
        assert!(h.service.harvest(OWNER).await.is_ok());

        let claimed = h.service.claim_challenge(OWNER, 0).await;
        // 1000 start + 200 reward; 10 plant + 5 harvest + 50 reward XP.
        assert!(claimed.as_ref().is_ok_and(|c| c.balance == 1_200));
        assert!(claimed.is_ok_and(|c| c.xp == 65));

        let board = h.service.challenges(OWNER).await;
        assert!(board.is_ok_and(|b| b.options.len() == 1 && b.active() == 0));
        let stats = h.service.profile(OWNER).await.map(|s| s.profile);
        assert!(stats.is_ok_and(|p| p.stat("challenge.count") == 1 && p.stat("challenge.xp") == 50));
    }

    #[tokio::test]
    async fn refresh_waits_a_day() {
        let h = harness();
        assert!(h.service.setup(OWNER).await.is_ok());
        assert!(matches!(
            h.service.refresh_challenges(OWNER).await,
            Err(GameError::Challenge(ChallengeError::TooSoon { .. }))
        ));
        h.clock.advance(Duration::hours(24));
        assert!(h.service.refresh_challenges(OWNER).await.is_ok());
    }

    #[tokio::test]
    async fn scenario_explore_interact_leave() {
        let mut config = GameConfig::default();
        config.scenario.fill_chance = 1.0;
        config.scenario.obstruction_chance = 0.0;
        config.scenario.treasure_chance = 1.0;
        let h = harness_with(config);
        assert!(h.service.setup(OWNER).await.is_ok());

        assert!(matches!(
            h.service.scenario(OWNER).await,
            Err(GameError::NoScenario)
        ));

        let view = h.service.explore(OWNER).await;
        assert!(view.as_ref().is_ok_and(|v| v.plot.cells.len() == 25));
        assert!(view.is_ok_and(|v| v.plot.cells.iter().all(|c| c.key == key("treasure:chest"))));

        let found = h.service.interact(OWNER, "C3").await;
        assert!(found.as_ref().is_ok_and(|r| r.balance == 250 && r.xp == 10));
        assert!(found.is_ok_and(|r| r.yields.get(&key("item:coin")) == 250));

        assert!(matches!(
            h.service.interact(OWNER, "C3").await,
            Err(GameError::Farm(FarmError::NothingHere(_)))
        ));

        let stats = h.service.profile(OWNER).await.map(|s| s.profile);
        assert!(stats.is_ok_and(|p| p.stat("scenario.harvest.count") == 1 && p.xp() == 10));

        assert!(h.service.leave_scenario(OWNER).await.is_ok_and(|left| left));
        assert!(h.service.leave_scenario(OWNER).await.is_ok_and(|left| !left));
    }

    #[tokio::test]
    async fn scenario_plants_pay_flat_interact_xp() {
        let mut config = GameConfig::default();
        config.scenario.fill_chance = 1.0;
        config.scenario.obstruction_chance = 0.0;
        config.scenario.treasure_chance = 0.0;
        let h = harness_with(config);
        assert!(h.service.setup(OWNER).await.is_ok());
        assert!(h.service.explore(OWNER).await.is_ok());

        let found = h.service.interact(OWNER, "A1").await;
        assert!(found.as_ref().is_ok_and(|r| r.xp == 10));
        assert!(found.is_ok_and(|r| r.yields.get(&key("plant:apple")) == 1));

        let profile = h.service.profile(OWNER).await.map(|s| s.profile);
        assert!(profile.is_ok_and(|p| p.xp() == 10 && p.item_count(&key("plant:apple")) == 1));
    }

    #[tokio::test]
    async fn pay_moves_coins_between_players() {
        let h = harness();
        let friend = OwnerId(7);
        assert!(h.service.setup(OWNER).await.is_ok());
        assert!(h.service.setup(friend).await.is_ok());

        let paid = h.service.pay(OWNER, friend, 300).await;
        assert!(paid.is_ok_and(|r| r.balance == 700 && r.amount == 300));

        let payer = h.service.profile(OWNER).await.map(|s| s.profile);
        assert!(payer.is_ok_and(|p| p.balance == 700 && p.stat("pay.sent") == 300));
        let payee = h.service.profile(friend).await.map(|s| s.profile);
        assert!(payee.is_ok_and(|p| p.balance == 1_300 && p.stat("pay.received") == 300));
    }

    #[tokio::test]
    async fn pay_rejects_bad_transfers_without_moving_coins() {
        let h = harness();
        let friend = OwnerId(7);
        let stranger = OwnerId(99);
        assert!(h.service.setup(OWNER).await.is_ok());
        assert!(h.service.setup(friend).await.is_ok());

        assert!(matches!(
            h.service.pay(OWNER, friend, 0).await,
            Err(GameError::InvalidQuantity)
        ));
        assert!(matches!(
            h.service.pay(OWNER, OWNER, 10).await,
            Err(GameError::SelfPayment)
        ));
        assert!(matches!(
            h.service.pay(OWNER, friend, 5_000).await,
            Err(GameError::NotEnough { available: 1_000, needed: 5_000, .. })
        ));
        assert!(matches!(
            h.service.pay(OWNER, stranger, 10).await,
            Err(GameError::UnknownRecipient(_))
        ));
        assert!(matches!(
            h.service.pay(stranger, OWNER, 10).await,
            Err(GameError::NotRegistered(_))
        ));

        let payer = h.service.profile(OWNER).await.map(|s| s.profile);
        assert!(payer.is_ok_and(|p| p.balance == 1_000 && p.stat("pay.sent") == 0));
        let payee = h.service.profile(friend).await.map(|s| s.profile);
        assert!(payee.is_ok_and(|p| p.balance == 1_000));
    }

    #[tokio::test]
    async fn concurrent_harvests_do_not_double_count() {
        let h = Arc::new(harness());
        assert!(h.service.setup(OWNER).await.is_ok());
        assert!(h.service.plant(OWNER, "A1", "seed:apple").await.is_ok());
        h.clock.advance(Duration::hours(1));

        let a = Arc::clone(&h);
        let b = Arc::clone(&h);
        let (ra, rb) = tokio::join!(
            async move { a.service.harvest(OWNER).await },
            async move { b.service.harvest(OWNER).await },
        );
        let succeeded = [ra.is_ok(), rb.is_ok()].iter().filter(|ok| **ok).count();
        assert_eq!(succeeded, 1);

        let profile = h.service.profile(OWNER).await.map(|s| s.profile);
        assert!(profile.is_ok_and(|p| p.item_count(&key("plant:apple")) == 1));
    }

    #[tokio::test]
    async fn catalog_can_be_replaced() {
        let h = harness();
        assert_eq!(h.service.catalog().len(), 4);
        assert!(h.service.planets().is_empty());

        let terra = PlanetDefinition {
            name: "Terra".to_owned(),
            description: String::new(),
            biomes: vec![Environment::Grassland],
        };
        let replacement = CropCatalog::default().with_planets([terra]);
        h.service.replace_catalog(replacement.unwrap_or_default());
        assert!(h.service.catalog().is_empty());
        assert_eq!(h.service.planets().len(), 1);
    }
}
