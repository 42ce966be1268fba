//! ICT 2022: liquidity sweep, structure shift the same way, then a gap.

use super::{EntryModel, MarketContext};
use crate::domain::{EntrySignal, ModelTier};

#[derive(Debug, Clone, Copy, Default)]
pub struct Ict2022;

impl EntryModel for Ict2022 {
    fn name(&self) -> &'static str {
        "ICT 2022 (LS+MSS+FVG)"
    }

    fn tier(&self) -> ModelTier {
        ModelTier::Advanced
    }

    fn evaluate(&self, ctx: &MarketContext<'_>) -> Option<EntrySignal> {
        let direction = ctx.mss?.direction();
        if ctx.sweep?.direction() != direction {
            return None;
        }
        let fvg = ctx.first_fvg(direction)?;
        Some(EntrySignal::new(
            direction,
            self.name(),
            self.tier(),
            Some(fvg.clone()),
        ))
    }
}
