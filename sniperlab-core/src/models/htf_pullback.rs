//! Higher-timeframe structure with a pullback on the evaluated series.

use super::{EntryModel, MarketContext};
use crate::domain::{Direction, EntrySignal, ModelTier, Zone, ZoneKind};

/// Fires only when a higher-timeframe series was supplied and both series
/// shifted structure the same way. BUY needs the latest low under the
/// previous low; SELL mirrors it. The zone is the previous bar's range.
#[derive(Debug, Clone, Copy, Default)]
pub struct HtfPullback;

impl EntryModel for HtfPullback {
    fn name(&self) -> &'static str {
        "HTF MSS + LTF Pullback"
    }

    fn tier(&self) -> ModelTier {
        ModelTier::Basic
    }

    fn evaluate(&self, ctx: &MarketContext<'_>) -> Option<EntrySignal> {
        let higher = ctx.higher_mss?;
        if ctx.mss? != higher {
            return None;
        }
        let n = ctx.bars.len();
        if n < 3 {
            return None;
        }
        let (prev, last) = (&ctx.bars[n - 2], &ctx.bars[n - 1]);
        let direction = higher.direction();
        let pulled_back = match direction {
            Direction::Buy => last.low < prev.low,
            Direction::Sell => last.high > prev.high,
        };
        if !pulled_back {
            return None;
        }
        let zone = Zone::new(
            ZoneKind::Range,
            direction.zone_side(),
            prev.low.min(prev.open).min(prev.close),
            prev.high.max(prev.open).max(prev.close),
            n - 2,
        )?;
        Some(EntrySignal::new(direction, self.name(), self.tier(), Some(zone)))
    }
}
