//! Silver Bullet: price trades back into the freshest gap on heavy volume.

use super::{EntryModel, MarketContext};
use crate::domain::{Direction, EntrySignal, ModelTier, ZoneSide};

/// Volume multiple over the trailing mean that counts as displacement.
pub const VOLUME_RATIO: f64 = 1.5;
/// Trailing window for the volume mean, current bar included.
pub const VOLUME_WINDOW: usize = 20;

#[derive(Debug, Clone, Copy, Default)]
pub struct SilverBullet;

impl EntryModel for SilverBullet {
    fn name(&self) -> &'static str {
        "Silver Bullet (Fresh FVG)"
    }

    fn tier(&self) -> ModelTier {
        ModelTier::Premium
    }

    fn evaluate(&self, ctx: &MarketContext<'_>) -> Option<EntrySignal> {
        let fvg = ctx.fvgs.first()?;
        let last = ctx.last()?;

        let window = &ctx.bars[ctx.bars.len().saturating_sub(VOLUME_WINDOW)..];
        let mean = window.iter().map(|b| b.volume).sum::<f64>() / window.len() as f64;
        if last.volume <= mean * VOLUME_RATIO {
            return None;
        }

        let direction = match fvg.side {
            ZoneSide::Bull if last.low <= fvg.upper() => Direction::Buy,
            ZoneSide::Bear if last.high >= fvg.lower() => Direction::Sell,
            _ => return None,
        };
        Some(EntrySignal::new(
            direction,
            self.name(),
            self.tier(),
            Some(fvg.clone()),
        ))
    }
}
