//! Breaker retest: price returns into the newest breaker block.

use super::{EntryModel, MarketContext};
use crate::domain::{Direction, EntrySignal, ModelTier, ZoneSide};

#[derive(Debug, Clone, Copy, Default)]
pub struct BreakerRetest;

impl EntryModel for BreakerRetest {
    fn name(&self) -> &'static str {
        "Breaker Block Retest"
    }

    fn tier(&self) -> ModelTier {
        ModelTier::Advanced
    }

    fn evaluate(&self, ctx: &MarketContext<'_>) -> Option<EntrySignal> {
        let breaker = ctx.breakers.first()?;
        let last = ctx.last()?;
        let (lo, hi) = (breaker.lower(), breaker.upper());

        let direction = match breaker.side {
            ZoneSide::Bull if last.low <= hi && last.close >= lo => Direction::Buy,
            ZoneSide::Bear if last.high >= lo && last.close <= hi => Direction::Sell,
            _ => return None,
        };
        Some(EntrySignal::new(
            direction,
            self.name(),
            self.tier(),
            Some(breaker.clone()),
        ))
    }
}
