//! Plain structure-shift models.

use super::{EntryModel, MarketContext};
use crate::domain::{EntrySignal, ModelTier};

/// Structure shift plus the newest gap on the same side.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssFvg;

impl EntryModel for MssFvg {
    fn name(&self) -> &'static str {
        "MSS+FVG"
    }

    fn tier(&self) -> ModelTier {
        ModelTier::Basic
    }

    fn evaluate(&self, ctx: &MarketContext<'_>) -> Option<EntrySignal> {
        let direction = ctx.mss?.direction();
        let fvg = ctx.first_fvg(direction)?;
        Some(EntrySignal::new(
            direction,
            self.name(),
            self.tier(),
            Some(fvg.clone()),
        ))
    }
}

/// Structure shift plus the most recent order block on the same side.
#[derive(Debug, Clone, Copy, Default)]
pub struct MssOrderBlock;

impl EntryModel for MssOrderBlock {
    fn name(&self) -> &'static str {
        "MSS+OB"
    }

    fn tier(&self) -> ModelTier {
        ModelTier::Basic
    }

    fn evaluate(&self, ctx: &MarketContext<'_>) -> Option<EntrySignal> {
        let direction = ctx.mss?.direction();
        let side = direction.zone_side();
        let ob = ctx.order_blocks.iter().rev().find(|z| z.side == side)?;
        Some(EntrySignal::new(
            direction,
            self.name(),
            self.tier(),
            Some(ob.clone()),
        ))
    }
}
