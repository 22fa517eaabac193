//! Directional Movement / ADX
//!
//! Simplified ADX: +DM/-DM and TR are summed over the trailing window and
//! the reported ADX is the resulting DX, without Wilder smoothing of the DX
//! series. This is a deliberate approximation kept for parity with the
//! regime and trend thresholds (ADX 25/40) that were tuned against it;
//! replacing it with a fully smoothed ADX shifts those boundaries.

use crate::domain::candle::Candle;

/// Directional indicators for the latest bar: (adx, plus_di, minus_di)
pub fn adx(candles: &[Candle], period: usize) -> (f64, f64, f64) {
    if period == 0 || candles.len() < period + 1 {
        return (0.0, 0.0, 0.0);
    }

    let start = candles.len() - period;
    let mut tr_sum = 0.0;
    let mut plus_dm_sum = 0.0;
    let mut minus_dm_sum = 0.0;

    for i in start..candles.len() {
        let current = &candles[i];
        let prev = &candles[i - 1];

        let hl = current.high - current.low;
        let hc = (current.high - prev.close).abs();
        let lc = (current.low - prev.close).abs();
        tr_sum += hl.max(hc).max(lc);

        let up_move = current.high - prev.high;
        let down_move = prev.low - current.low;
        if up_move > down_move && up_move > 0.0 {
            plus_dm_sum += up_move;
        } else if down_move > up_move && down_move > 0.0 {
            minus_dm_sum += down_move;
        }
    }

    if tr_sum <= 0.0 {
        return (0.0, 0.0, 0.0);
    }
    let plus_di = plus_dm_sum / tr_sum * 100.0;
    let minus_di = minus_dm_sum / tr_sum * 100.0;

    let di_sum = plus_di + minus_di;
    let dx = if di_sum > 0.0 {
        (plus_di - minus_di).abs() / di_sum * 100.0
    } else {
        0.0
    };

    (dx, plus_di, minus_di)
}
