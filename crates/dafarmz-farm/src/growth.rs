//! Growth clock: elapsed wall-clock time to discrete growth stages.
//!
//! Nothing here advances on a tick. A plant's stage is derived from its
//! timestamps whenever it is looked at, with `now` passed in by the caller.
//!
//! Stage numbering for a lifecycle of length `L`:
//!
//! - Plain crops grow through stages `0..=L-1` and are ready at `L-1`.
//! - Crops with a regrowth visual grow through `0..=L-2` and are ready at
//!   `L-2`. The last lifecycle entry (`L-1`) is the "just harvested" image,
//!   shown only after a harvest while the plant grows back.
//!
//! Bad reference data (missing or non-positive grow time) never panics: the
//! plant stays at stage 0 and is not harvestable.

use chrono::{DateTime, Utc};
use tracing::warn;

use dafarmz_types::{PlotItem, PlotItemData};

/// Milliseconds in one hour.
const MILLIS_PER_HOUR: f64 = 3_600_000.0;

// ---------------------------------------------------------------------------
// Raw stage
// ---------------------------------------------------------------------------

/// Growth stage reached `now`, counting whole grow periods since `reference`.
///
/// Returns 0 when there is no reference time, when the clock reads earlier
/// than the reference, or when `grow_time_hr` is unusable (a warning is
/// logged in that last case).
pub fn growth_stage(
    reference: Option<DateTime<Utc>>,
    grow_time_hr: Option<f64>,
    now: DateTime<Utc>,
) -> u32 {
    let Some(reference) = reference else {
        return 0;
    };
    checked_stage(reference, grow_time_hr, now).unwrap_or(0)
}

/// Like [`growth_stage`], but `None` when the grow time is unusable.
fn checked_stage(
    reference: DateTime<Utc>,
    grow_time_hr: Option<f64>,
    now: DateTime<Utc>,
) -> Option<u32> {
    let period_ms = match grow_time_hr {
        Some(hours) if hours.is_finite() && hours > 0.0 => hours * MILLIS_PER_HOUR,
        other => {
            warn!(grow_time_hr = ?other, "unusable grow time, plant stays at stage 0");
            return None;
        }
    };

    let elapsed_ms = now.signed_duration_since(reference).num_milliseconds();
    if elapsed_ms <= 0 {
        return Some(0);
    }

    // Elapsed milliseconds fit comfortably in f64's mantissa for any
    // realistic plant age, and the float-to-int cast saturates.
    #[allow(
        clippy::cast_precision_loss,
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss
    )]
    let stage = (elapsed_ms as f64 / period_ms).floor() as u32;
    Some(stage)
}

// ---------------------------------------------------------------------------
// Readiness
// ---------------------------------------------------------------------------

/// Stage at which a crop with this lifecycle becomes harvestable.
///
/// A crop whose final growth index is 0 is ready as soon as it is planted;
/// `yields_remaining` bounds how often it can be picked.
pub const fn ready_stage(lifecycle_stages: u32, has_regrowth_visual: bool) -> u32 {
    let offset = if has_regrowth_visual { 2 } else { 1 };
    lifecycle_stages.saturating_sub(offset)
}

/// The time growth is measured from: the last harvest, or planting.
pub const fn reference_time(data: &PlotItemData) -> DateTime<Utc> {
    match data.last_harvested_at {
        Some(at) => at,
        None => data.planted_at,
    }
}

/// Current stage of a plot item: its preset stage if one is set, otherwise
/// the stage derived from its timestamps.
pub fn current_stage(data: &PlotItemData, now: DateTime<Utc>) -> u32 {
    data.preset_stage.unwrap_or_else(|| {
        growth_stage(Some(reference_time(data)), data.grow_time_hr, now)
    })
}

/// Whether the item's yields can be collected `now`.
///
/// Items without growth data are never harvestable.
pub fn can_harvest(item: &PlotItem, now: DateTime<Utc>) -> bool {
    item.data.as_ref().is_some_and(|data| is_ready(data, now))
}

/// Readiness check on the growth data itself.
pub fn is_ready(data: &PlotItemData, now: DateTime<Utc>) -> bool {
    let ready = ready_stage(data.lifecycle_stages, data.has_regrowth_visual);
    let stage = match data.preset_stage {
        Some(preset) => Some(preset),
        None => checked_stage(reference_time(data), data.grow_time_hr, now),
    };
    stage.is_some_and(|stage| stage >= ready)
}

// ---------------------------------------------------------------------------
// Visuals
// ---------------------------------------------------------------------------

/// Index into the item's lifecycle images to show `now`.
///
/// Always within `0..lifecycle_stages`. A regrowth crop that has been
/// harvested and is still growing back shows its final "just harvested"
/// image; everything else shows its growth stage capped at ready.
pub fn visual_stage(data: &PlotItemData, now: DateTime<Utc>) -> u32 {
    let last = data.lifecycle_stages.saturating_sub(1);
    let ready = ready_stage(data.lifecycle_stages, data.has_regrowth_visual);
    let stage = current_stage(data, now);

    let regrowing = data.has_regrowth_visual
        && data.preset_stage.is_none()
        && data.last_harvested_at.is_some()
        && stage < ready;
    if regrowing {
        return last;
    }
    stage.min(ready).min(last)
}
