//! Breaker blocks: an opposing candle whose range is taken out by the next close.

use crate::domain::{Bar, Zone, ZoneKind, ZoneSide};

/// Breakers, newest first. The latest bar never completes a breaker.
///
/// A down-close bar followed by a close above its high is a bull breaker; an
/// up-close bar followed by a close below its low is a bear breaker. The zone
/// is the broken bar's full range.
pub fn detect_breakers(bars: &[Bar]) -> Vec<Zone> {
    let n = bars.len();
    if n < 3 {
        return Vec::new();
    }
    (1..n - 1)
        .rev()
        .filter_map(|cur| {
            let prev = &bars[cur - 1];
            let close = bars[cur].close;
            let side = if prev.is_down() && close > prev.high {
                ZoneSide::Bull
            } else if prev.is_up() && close < prev.low {
                ZoneSide::Bear
            } else {
                return None;
            };
            Zone::new(ZoneKind::Breaker, side, prev.low, prev.high, cur - 1)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::detect::bar_ohlc;

    #[test]
    fn bull_breaker_from_down_candle() {
        let bars = vec![
            bar_ohlc(0, 12.0, 12.5, 9.5, 10.0), // down
            bar_ohlc(1, 10.0, 13.5, 10.0, 13.0), // closes above 12.5
            bar_ohlc(2, 13.0, 14.0, 12.0, 13.5),
        ];
        let zones = detect_breakers(&bars);
        assert_eq!(zones.len(), 1);
        assert_eq!(zones[0].side, ZoneSide::Bull);
        assert_eq!((zones[0].lower(), zones[0].upper()), (9.5, 12.5));
        assert_eq!(zones[0].origin_index, 0);
    }

    #[test]
    fn latest_bar_is_excluded() {
        let bars = vec![
            bar_ohlc(0, 10.0, 10.5, 9.0, 10.0),
            bar_ohlc(1, 10.0, 11.0, 9.8, 10.8), // up
            bar_ohlc(2, 10.0, 10.2, 9.0, 9.5),  // closes below 9.8, but it is the latest bar
        ];
        assert!(detect_breakers(&bars).is_empty());
    }

    #[test]
    fn newest_first() {
        let bars = vec![
            bar_ohlc(0, 12.0, 12.5, 9.5, 10.0),
            bar_ohlc(1, 10.0, 13.5, 10.0, 13.0), // bull breaker of bar 0
            bar_ohlc(2, 13.0, 13.2, 12.0, 12.2), // down
            bar_ohlc(3, 12.2, 14.0, 12.1, 13.8), // bull breaker of bar 2
            bar_ohlc(4, 13.8, 14.0, 13.0, 13.5),
        ];
        let zones = detect_breakers(&bars);
        assert_eq!(zones.len(), 2);
        assert_eq!(zones[0].origin_index, 2);
        assert_eq!(zones[1].origin_index, 0);
    }
}
