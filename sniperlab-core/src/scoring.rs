//! Setup scoring: a table lookup plus a bounded sum in `[0, 5]`.

use serde::{Deserialize, Serialize};

use crate::domain::{Bar, CandlePattern, ModelTier, ScoreResult};

pub const MAX_SCORE: f64 = 5.0;

/// Points for the model class.
pub fn tier_points(tier: ModelTier) -> f64 {
    match tier {
        ModelTier::Premium => 2.5,
        ModelTier::Advanced => 1.8,
        ModelTier::Basic => 1.0,
    }
}

/// Points for the confirming candle.
pub fn pattern_points(pattern: CandlePattern) -> f64 {
    match pattern {
        CandlePattern::Engulfing | CandlePattern::Fakey | CandlePattern::OutsideBar => 1.5,
        CandlePattern::PinBar | CandlePattern::MorningStar | CandlePattern::EveningStar => 1.0,
        CandlePattern::ReversalBar | CandlePattern::KeyReversal => 0.5,
    }
}

/// Points for each independent bonus flag.
pub const BONUS_POINTS: f64 = 0.5;

/// Everything the score depends on. Nothing here names the model that fired.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub struct ScoreInputs {
    pub tier: Option<ModelTier>,
    pub pattern: Option<CandlePattern>,
    pub volume_spike: bool,
    pub sweep: bool,
    pub trend_agreement: bool,
}

pub fn score(inputs: &ScoreInputs) -> ScoreResult {
    let mut total = 0.0;
    let mut tags = Vec::new();

    if let Some(tier) = inputs.tier {
        total += tier_points(tier);
        tags.push(
            match tier {
                ModelTier::Premium => "premium model",
                ModelTier::Advanced => "advanced model",
                ModelTier::Basic => "basic structure",
            }
            .to_string(),
        );
    }
    if let Some(pattern) = inputs.pattern {
        total += pattern_points(pattern);
        tags.push(pattern.name().to_lowercase());
    }
    let bonuses = [
        (inputs.volume_spike, "volume spike"),
        (inputs.sweep, "liquidity sweep"),
        (inputs.trend_agreement, "trend agreement"),
    ];
    for (flag, tag) in bonuses {
        if flag {
            total += BONUS_POINTS;
            tags.push(tag.to_string());
        }
    }

    ScoreResult {
        raw_score: total.clamp(0.0, MAX_SCORE),
        tags,
    }
}

impl ScoreResult {
    /// Add `bonus` (e.g. for lower-timeframe confirmation), staying within the cap.
    pub fn with_bonus(mut self, bonus: f64, tag: &str) -> Self {
        self.raw_score = (self.raw_score + bonus).clamp(0.0, MAX_SCORE);
        self.tags.push(tag.to_string());
        self
    }
}

/// Latest volume above 1.2x the mean of the five volumes before it.
pub fn volume_spike(bars: &[Bar]) -> bool {
    let n = bars.len();
    if n < 6 {
        return false;
    }
    let mean = bars[n - 6..n - 1].iter().map(|b| b.volume).sum::<f64>() / 5.0;
    bars[n - 1].volume > mean * 1.2
}
