//! SMT divergence models. Both need a correlated series in the context.

use super::{EntryModel, MarketContext};
use crate::domain::{Direction, EntrySignal, ModelTier};

/// Divergence and structure shift agreeing on one direction.
fn aligned_direction(ctx: &MarketContext<'_>) -> Option<Direction> {
    let smt = ctx.smt?;
    (ctx.mss? == smt).then(|| smt.direction())
}

/// SMT + MSS + inverted FVG: the newest gap on the opposite side, which the
/// shift has run through.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtInverseFvg;

impl EntryModel for SmtInverseFvg {
    fn name(&self) -> &'static str {
        "SMT+MSS+IFVG"
    }

    fn tier(&self) -> ModelTier {
        ModelTier::Premium
    }

    fn evaluate(&self, ctx: &MarketContext<'_>) -> Option<EntrySignal> {
        let direction = aligned_direction(ctx)?;
        let fvg = ctx.first_fvg(direction.opposite())?;
        Some(EntrySignal::new(
            direction,
            self.name(),
            self.tier(),
            Some(fvg.clone()),
        ))
    }
}

/// SMT + MSS + the newest order block, when it sits on the trade's side.
#[derive(Debug, Clone, Copy, Default)]
pub struct SmtBreaker;

impl EntryModel for SmtBreaker {
    fn name(&self) -> &'static str {
        "SMT+MSS+BB"
    }

    fn tier(&self) -> ModelTier {
        ModelTier::Premium
    }

    fn evaluate(&self, ctx: &MarketContext<'_>) -> Option<EntrySignal> {
        let direction = aligned_direction(ctx)?;
        let ob = ctx.order_blocks.last()?;
        if ob.side != direction.zone_side() {
            return None;
        }
        Some(EntrySignal::new(
            direction,
            self.name(),
            self.tier(),
            Some(ob.clone()),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{StructureShift, Zone, ZoneKind, ZoneSide};
    use crate::models::{bare_context, flat_bars};

    #[test]
    fn inverse_fvg_takes_opposite_gap() {
        let bars = flat_bars(60);
        let mut ctx = bare_context(&bars);
        ctx.smt = Some(StructureShift::Bull);
        ctx.mss = Some(StructureShift::Bull);
        ctx.fvgs = vec![
            Zone::new(ZoneKind::Fvg, ZoneSide::Bull, 90.0, 92.0, 50).unwrap(),
            Zone::new(ZoneKind::Fvg, ZoneSide::Bear, 97.0, 99.0, 45).unwrap(),
        ];
        let sig = SmtInverseFvg.evaluate(&ctx).unwrap();
        assert_eq!(sig.direction, Direction::Buy);
        assert_eq!(sig.zone.unwrap().side, ZoneSide::Bear);
    }

    #[test]
    fn disagreeing_divergence_does_not_fire() {
        let bars = flat_bars(60);
        let mut ctx = bare_context(&bars);
        ctx.smt = Some(StructureShift::Bear);
        ctx.mss = Some(StructureShift::Bull);
        ctx.fvgs = vec![Zone::new(ZoneKind::Fvg, ZoneSide::Bull, 90.0, 92.0, 50).unwrap()];
        assert!(SmtInverseFvg.evaluate(&ctx).is_none());
        assert!(SmtBreaker.evaluate(&ctx).is_none());
    }

    #[test]
    fn breaker_variant_needs_matching_newest_block() {
        let bars = flat_bars(60);
        let mut ctx = bare_context(&bars);
        ctx.smt = Some(StructureShift::Bear);
        ctx.mss = Some(StructureShift::Bear);
        ctx.order_blocks = vec![
            Zone::new(ZoneKind::OrderBlock, ZoneSide::Bear, 103.0, 105.0, 20).unwrap(),
            Zone::new(ZoneKind::OrderBlock, ZoneSide::Bull, 95.0, 97.0, 30).unwrap(),
        ];
        assert!(SmtBreaker.evaluate(&ctx).is_none());

        ctx.order_blocks.reverse();
        let sig = SmtBreaker.evaluate(&ctx).unwrap();
        assert_eq!(sig.direction, Direction::Sell);
        assert_eq!(sig.zone.unwrap().origin_index, 20);
    }
}
