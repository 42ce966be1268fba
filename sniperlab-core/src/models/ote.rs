//! OTE pullback: the latest close sits inside the 61.8%–78.6% retracement of
//! the current impulse leg.

use super::{EntryModel, MarketContext};
use crate::domain::{Direction, EntrySignal, ModelTier, Zone, ZoneKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct OtePullback;

impl EntryModel for OtePullback {
    fn name(&self) -> &'static str {
        "OTE Pullback"
    }

    fn tier(&self) -> ModelTier {
        ModelTier::Advanced
    }

    fn evaluate(&self, ctx: &MarketContext<'_>) -> Option<EntrySignal> {
        let leg = ctx.leg?;
        let close = ctx.last()?.close;
        if !leg.in_ote(close) {
            return None;
        }
        let anchor = match leg.direction {
            Direction::Buy => ctx.swings.last_low(),
            Direction::Sell => ctx.swings.last_high(),
        }?;
        let zone = Zone::new(
            ZoneKind::Retracement,
            leg.direction.zone_side(),
            leg.ote_low,
            leg.ote_high,
            anchor,
        )?;
        Some(EntrySignal::new(
            leg.direction,
            self.name(),
            self.tier(),
            Some(zone),
        ))
    }
}
