//! Liquidity sweep into a balanced price range.

use super::{EntryModel, MarketContext};
use crate::detect::detect_bpr;
use crate::domain::{EntrySignal, ModelTier, Zone, ZoneKind};

#[derive(Debug, Clone, Copy, Default)]
pub struct SweepBpr;

impl EntryModel for SweepBpr {
    fn name(&self) -> &'static str {
        "LS+BPR"
    }

    fn tier(&self) -> ModelTier {
        ModelTier::Basic
    }

    fn evaluate(&self, ctx: &MarketContext<'_>) -> Option<EntrySignal> {
        let direction = ctx.sweep?.direction();
        let (lo, hi) = detect_bpr(&ctx.fvgs)?;
        let origin = ctx.bars.len().checked_sub(1)?;
        let zone = Zone::new(ZoneKind::Overlap, direction.zone_side(), lo, hi, origin)?;
        Some(EntrySignal::new(direction, self.name(), self.tier(), Some(zone)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Direction, SweepKind, ZoneSide};
    use crate::models::{bare_context, flat_bars};

    #[test]
    fn sell_side_sweep_buys_the_range() {
        let bars = flat_bars(60);
        let mut ctx = bare_context(&bars);
        ctx.sweep = Some(SweepKind::SellSide);
        ctx.fvgs = vec![
            Zone::new(ZoneKind::Fvg, ZoneSide::Bear, 98.0, 101.0, 45).unwrap(),
            Zone::new(ZoneKind::Fvg, ZoneSide::Bull, 96.0, 99.0, 30).unwrap(),
        ];
        let sig = SweepBpr.evaluate(&ctx).unwrap();
        assert_eq!(sig.direction, Direction::Buy);
        let z = sig.zone.unwrap();
        assert_eq!((z.lower(), z.upper()), (98.0, 99.0));
        assert_eq!(z.side, ZoneSide::Bull);
    }

    #[test]
    fn no_sweep_no_signal() {
        let bars = flat_bars(60);
        let mut ctx = bare_context(&bars);
        ctx.fvgs = vec![
            Zone::new(ZoneKind::Fvg, ZoneSide::Bear, 98.0, 101.0, 45).unwrap(),
            Zone::new(ZoneKind::Fvg, ZoneSide::Bull, 96.0, 99.0, 30).unwrap(),
        ];
        assert!(SweepBpr.evaluate(&ctx).is_none());
    }
}
