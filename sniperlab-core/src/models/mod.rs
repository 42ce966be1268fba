//! Entry models and the priority aggregator.
//!
//! Each model is a small rule over a shared [`MarketContext`]. The aggregator
//! walks an ordered list of models and returns the first signal. Models never
//! look at portfolio state and never read past the last bar they are given.

pub mod bpr;
pub mod breaker_retest;
pub mod htf_pullback;
pub mod ict2022;
pub mod mss;
pub mod ote;
pub mod silver_bullet;
pub mod smt;
pub mod unicorn;

pub use bpr::SweepBpr;
pub use breaker_retest::BreakerRetest;
pub use htf_pullback::HtfPullback;
pub use ict2022::Ict2022;
pub use mss::{MssFvg, MssOrderBlock};
pub use ote::OtePullback;
pub use silver_bullet::SilverBullet;
pub use smt::{SmtBreaker, SmtInverseFvg};
pub use unicorn::Unicorn;

use crate::detect::{
    detect_breakers, detect_mss, detect_smt, detect_sweep, impulse_leg, FvgDetector, ImpulseLeg,
    OrderBlockDetector, SwingLocator, Swings, SWEEP_LOOKBACK,
};
use crate::domain::{Bar, Direction, EntrySignal, ModelTier, StructureShift, SweepKind, Zone};

/// Bars required before any model is evaluated.
pub const MIN_BARS: usize = 60;

/// What the aggregator is asked to evaluate.
///
/// `bars` is the series being traded. `pair` is a correlated series for the
/// SMT models; `higher` is a higher-timeframe series for the HTF pullback.
#[derive(Debug, Clone, Copy)]
pub struct ModelInput<'a> {
    pub bars: &'a [Bar],
    pub pair: Option<&'a [Bar]>,
    pub higher: Option<&'a [Bar]>,
}

impl<'a> ModelInput<'a> {
    pub fn new(bars: &'a [Bar]) -> Self {
        Self {
            bars,
            pair: None,
            higher: None,
        }
    }

    pub fn with_pair(mut self, pair: &'a [Bar]) -> Self {
        self.pair = Some(pair);
        self
    }

    pub fn with_higher(mut self, higher: &'a [Bar]) -> Self {
        self.higher = Some(higher);
        self
    }
}

/// Features shared by every model, computed once per evaluation.
#[derive(Debug, Clone)]
pub struct MarketContext<'a> {
    pub bars: &'a [Bar],
    pub pair: Option<&'a [Bar]>,
    pub higher: Option<&'a [Bar]>,
    pub swings: Swings,
    /// Newest first.
    pub fvgs: Vec<Zone>,
    /// Origin ascending; the last one is the newest.
    pub order_blocks: Vec<Zone>,
    /// Newest first.
    pub breakers: Vec<Zone>,
    pub mss: Option<StructureShift>,
    pub sweep: Option<SweepKind>,
    pub smt: Option<StructureShift>,
    pub leg: Option<ImpulseLeg>,
    pub higher_mss: Option<StructureShift>,
}

impl<'a> MarketContext<'a> {
    pub fn build(input: ModelInput<'a>) -> Self {
        let bars = input.bars;
        let locator = SwingLocator::default();
        let swings = locator.locate(bars);

        let fvgs = FvgDetector::default().detect(bars);
        let order_blocks = OrderBlockDetector::default().detect(bars, &swings);
        let breakers = detect_breakers(bars);
        let mss = detect_mss(bars, &swings);
        let sweep = detect_sweep(bars, SWEEP_LOOKBACK);
        let smt = input.pair.and_then(|pair| detect_smt(bars, pair));
        let leg = impulse_leg(bars, &swings);
        let higher_mss = input
            .higher
            .and_then(|higher| detect_mss(higher, &locator.locate(higher)));

        Self {
            bars,
            pair: input.pair,
            higher: input.higher,
            swings,
            fvgs,
            order_blocks,
            breakers,
            mss,
            sweep,
            smt,
            leg,
            higher_mss,
        }
    }

    pub fn last(&self) -> Option<&Bar> {
        self.bars.last()
    }

    /// Newest FVG on the demand (BUY) or supply (SELL) side.
    pub fn first_fvg(&self, direction: Direction) -> Option<&Zone> {
        let side = direction.zone_side();
        self.fvgs.iter().find(|z| z.side == side)
    }
}

/// A named entry rule.
pub trait EntryModel: Send + Sync {
    /// Model name as it appears in signal records.
    fn name(&self) -> &'static str;

    fn tier(&self) -> ModelTier;

    /// Returns a signal when the rule fires on the latest bar.
    fn evaluate(&self, ctx: &MarketContext<'_>) -> Option<EntrySignal>;
}

/// Ordered list of models; the first that fires wins.
pub struct EntryModelAggregator {
    models: Vec<Box<dyn EntryModel>>,
    min_bars: usize,
}

impl Default for EntryModelAggregator {
    fn default() -> Self {
        Self::with_models(vec![
            Box::new(Unicorn),
            Box::new(SilverBullet),
            Box::new(Ict2022),
            Box::new(BreakerRetest),
            Box::new(SweepBpr),
            Box::new(OtePullback),
            Box::new(SmtInverseFvg),
            Box::new(SmtBreaker),
            Box::new(MssFvg),
            Box::new(MssOrderBlock),
            Box::new(HtfPullback),
        ])
    }
}

impl EntryModelAggregator {
    pub fn with_models(models: Vec<Box<dyn EntryModel>>) -> Self {
        Self {
            models,
            min_bars: MIN_BARS,
        }
    }

    pub fn model_names(&self) -> Vec<&'static str> {
        self.models.iter().map(|m| m.name()).collect()
    }

    pub fn evaluate(&self, input: ModelInput<'_>) -> Option<EntrySignal> {
        self.evaluate_directed(input, None)
    }

    /// Like [`evaluate`](Self::evaluate), but models firing against `direction`
    /// are skipped and the search continues down the list.
    pub fn evaluate_directed(
        &self,
        input: ModelInput<'_>,
        direction: Option<Direction>,
    ) -> Option<EntrySignal> {
        if input.bars.len() < self.min_bars {
            return None;
        }
        let ctx = MarketContext::build(input);
        self.evaluate_context(&ctx, direction)
    }

    /// Evaluate against a context the caller already built.
    pub fn evaluate_context(
        &self,
        ctx: &MarketContext<'_>,
        direction: Option<Direction>,
    ) -> Option<EntrySignal> {
        if ctx.bars.len() < self.min_bars {
            return None;
        }
        self.models
            .iter()
            .filter_map(|model| model.evaluate(ctx))
            .find(|signal| direction.map_or(true, |d| signal.direction == d))
    }
}

impl std::fmt::Debug for EntryModelAggregator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EntryModelAggregator")
            .field("models", &self.model_names())
            .field("min_bars", &self.min_bars)
            .finish()
    }
}

/// Context with no detections over `bars`, for exercising single models.
#[cfg(test)]
pub fn bare_context(bars: &[Bar]) -> MarketContext<'_> {
    MarketContext {
        bars,
        pair: None,
        higher: None,
        swings: SwingLocator::default().locate(&[]),
        fvgs: Vec::new(),
        order_blocks: Vec::new(),
        breakers: Vec::new(),
        mss: None,
        sweep: None,
        smt: None,
        leg: None,
        higher_mss: None,
    }
}

/// `n` flat daily bars around 100.
#[cfg(test)]
pub fn flat_bars(n: usize) -> Vec<Bar> {
    (0..n)
        .map(|i| crate::detect::bar_ohlc(i, 100.0, 101.0, 99.0, 100.0))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{ZoneKind, ZoneSide};

    struct Always(Direction, &'static str);

    impl EntryModel for Always {
        fn name(&self) -> &'static str {
            self.1
        }

        fn tier(&self) -> ModelTier {
            ModelTier::Basic
        }

        fn evaluate(&self, _ctx: &MarketContext<'_>) -> Option<EntrySignal> {
            Some(EntrySignal::new(self.0, self.1, ModelTier::Basic, None))
        }
    }

    #[test]
    fn default_priority_order() {
        let names = EntryModelAggregator::default().model_names();
        assert_eq!(
            names,
            vec![
                "Unicorn (LS+BB+FVG)",
                "Silver Bullet (Fresh FVG)",
                "ICT 2022 (LS+MSS+FVG)",
                "Breaker Block Retest",
                "LS+BPR",
                "OTE Pullback",
                "SMT+MSS+IFVG",
                "SMT+MSS+BB",
                "MSS+FVG",
                "MSS+OB",
                "HTF MSS + LTF Pullback",
            ]
        );
    }

    #[test]
    fn first_match_wins() {
        let agg = EntryModelAggregator::with_models(vec![
            Box::new(Always(Direction::Sell, "first")),
            Box::new(Always(Direction::Buy, "second")),
        ]);
        let bars = flat_bars(60);
        let sig = agg.evaluate(ModelInput::new(&bars)).unwrap();
        assert_eq!(sig.model, "first");
    }

    #[test]
    fn direction_filter_skips_opposite_models() {
        let agg = EntryModelAggregator::with_models(vec![
            Box::new(Always(Direction::Sell, "first")),
            Box::new(Always(Direction::Buy, "second")),
        ]);
        let bars = flat_bars(60);
        let sig = agg
            .evaluate_directed(ModelInput::new(&bars), Some(Direction::Buy))
            .unwrap();
        assert_eq!(sig.model, "second");
    }

    #[test]
    fn fewer_than_sixty_bars_is_no_setup() {
        let agg = EntryModelAggregator::with_models(vec![Box::new(Always(Direction::Buy, "x"))]);
        let bars = flat_bars(59);
        assert!(agg.evaluate(ModelInput::new(&bars)).is_none());
    }

    #[test]
    fn flat_market_has_no_setup() {
        let bars = flat_bars(80);
        let ctx = MarketContext::build(ModelInput::new(&bars));
        assert!(ctx.fvgs.is_empty());
        assert!(ctx.mss.is_none());
        assert!(EntryModelAggregator::default()
            .evaluate_context(&ctx, None)
            .is_none());
    }

    #[test]
    fn first_fvg_by_side() {
        let bars = flat_bars(3);
        let mut ctx = bare_context(&bars);
        ctx.fvgs = vec![
            Zone::new(ZoneKind::Fvg, ZoneSide::Bear, 5.0, 6.0, 9).unwrap(),
            Zone::new(ZoneKind::Fvg, ZoneSide::Bull, 1.0, 2.0, 7).unwrap(),
            Zone::new(ZoneKind::Fvg, ZoneSide::Bull, 3.0, 4.0, 5).unwrap(),
        ];
        assert_eq!(ctx.first_fvg(Direction::Buy).unwrap().origin_index, 7);
        assert_eq!(ctx.first_fvg(Direction::Sell).unwrap().origin_index, 9);
    }
}
