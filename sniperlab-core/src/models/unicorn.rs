//! Unicorn: sweep, structure shift and an order block overlapping a gap.

use super::{EntryModel, MarketContext};
use crate::domain::{EntrySignal, ModelTier, Zone, ZoneKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct Unicorn;

impl EntryModel for Unicorn {
    fn name(&self) -> &'static str {
        "Unicorn (LS+BB+FVG)"
    }

    fn tier(&self) -> ModelTier {
        ModelTier::Premium
    }

    /// The newest order block must intersect one of the live gaps, and the
    /// sweep has to argue for the same direction as the shift.
    fn evaluate(&self, ctx: &MarketContext<'_>) -> Option<EntrySignal> {
        let direction = ctx.mss?.direction();
        if ctx.sweep?.direction() != direction {
            return None;
        }
        let ob = ctx.order_blocks.last()?;
        let (lo, hi) = ctx.fvgs.iter().find_map(|fvg| ob.overlap(fvg))?;
        let zone = Zone::new(
            ZoneKind::Overlap,
            direction.zone_side(),
            lo,
            hi,
            ob.origin_index,
        )?;
        Some(EntrySignal::new(direction, self.name(), self.tier(), Some(zone)))
    }
}
