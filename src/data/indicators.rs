//! Technical indicators over a daily close series
//!
//! Every function looks at the tail of the series and returns `None` when the
//! history is too short for the requested window.

use serde::{Deserialize, Serialize};

pub const RSI_PERIOD: usize = 14;
pub const MACD_FAST: usize = 12;
pub const MACD_SLOW: usize = 26;
pub const MACD_SIGNAL: usize = 9;
pub const BB_PERIOD: usize = 20;
pub const BB_STD: f64 = 2.0;

/// Simple moving average of the last `period` values
pub fn sma(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() < period {
        return None;
    }
    let window = &values[values.len() - period..];
    Some(window.iter().sum::<f64>() / period as f64)
}

/// Exponential moving average series, alpha = 2 / (period + 1), seeded with the first value
pub fn ema_series(values: &[f64], period: usize) -> Vec<f64> {
    let mut out = Vec::with_capacity(values.len());
    let Some(&first) = values.first() else {
        return out;
    };
    let alpha = 2.0 / (period as f64 + 1.0);
    let mut prev = first;
    out.push(prev);
    for &v in &values[1..] {
        prev = alpha * v + (1.0 - alpha) * prev;
        out.push(prev);
    }
    out
}

/// RSI from simple averages of the last `period` gains and losses
pub fn rsi(values: &[f64], period: usize) -> Option<f64> {
    if period == 0 || values.len() <= period {
        return None;
    }
    let tail = &values[values.len() - period - 1..];
    let (mut gain, mut loss) = (0.0, 0.0);
    for pair in tail.windows(2) {
        let change = pair[1] - pair[0];
        if change > 0.0 {
            gain += change;
        } else {
            loss -= change;
        }
    }
    let avg_gain = gain / period as f64;
    let avg_loss = loss / period as f64;

    if avg_loss == 0.0 {
        return Some(if avg_gain == 0.0 { 50.0 } else { 100.0 });
    }
    let rs = avg_gain / avg_loss;
    Some(100.0 - 100.0 / (1.0 + rs))
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Macd {
    pub macd: f64,
    pub signal: f64,
    pub histogram: f64,
}

pub fn macd(values: &[f64], fast: usize, slow: usize, signal: usize) -> Option<Macd> {
    if fast == 0 || slow <= fast || values.len() < slow {
        return None;
    }
    let fast_ema = ema_series(values, fast);
    let slow_ema = ema_series(values, slow);
    let line: Vec<f64> = fast_ema
        .iter()
        .zip(&slow_ema)
        .map(|(f, s)| f - s)
        .collect();
    let signal_line = ema_series(&line, signal);

    let macd = *line.last()?;
    let signal = *signal_line.last()?;
    Some(Macd {
        macd,
        signal,
        histogram: macd - signal,
    })
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct Bollinger {
    pub upper: f64,
    pub middle: f64,
    pub lower: f64,
}

/// Bands at `num_std` sample standard deviations around the SMA
pub fn bollinger(values: &[f64], period: usize, num_std: f64) -> Option<Bollinger> {
    if period < 2 {
        return None;
    }
    let middle = sma(values, period)?;
    let window = &values[values.len() - period..];
    let variance = window.iter().map(|v| (v - middle).powi(2)).sum::<f64>() / (period - 1) as f64;
    let std = variance.sqrt();
    Some(Bollinger {
        upper: middle + num_std * std,
        middle,
        lower: middle - num_std * std,
    })
}

/// Indicator bundle quoted by the technical analyst
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct TechnicalSnapshot {
    pub last_close: Option<f64>,
    pub sma_10: Option<f64>,
    pub sma_20: Option<f64>,
    pub sma_50: Option<f64>,
    pub rsi_14: Option<f64>,
    pub macd: Option<Macd>,
    pub bollinger: Option<Bollinger>,
}

impl TechnicalSnapshot {
    pub fn compute(closes: &[f64]) -> Self {
        Self {
            last_close: closes.last().copied(),
            sma_10: sma(closes, 10),
            sma_20: sma(closes, 20),
            sma_50: sma(closes, 50),
            rsi_14: rsi(closes, RSI_PERIOD),
            macd: macd(closes, MACD_FAST, MACD_SLOW, MACD_SIGNAL),
            bollinger: bollinger(closes, BB_PERIOD, BB_STD),
        }
    }

    pub fn render(&self) -> String {
        fn fmt(v: Option<f64>) -> String {
            v.map(|x| format!("{:.2}", x))
                .unwrap_or_else(|| "n/a (insufficient history)".to_string())
        }

        let mut lines = vec![
            format!("Last close: {}", fmt(self.last_close)),
            format!("SMA(10): {}", fmt(self.sma_10)),
            format!("SMA(20): {}", fmt(self.sma_20)),
            format!("SMA(50): {}", fmt(self.sma_50)),
            format!("RSI(14): {}", fmt(self.rsi_14)),
        ];
        match &self.macd {
            Some(m) => lines.push(format!(
                "MACD(12,26,9): line {:.4}, signal {:.4}, histogram {:.4}",
                m.macd, m.signal, m.histogram
            )),
            None => lines.push("MACD(12,26,9): n/a (insufficient history)".to_string()),
        }
        match &self.bollinger {
            Some(b) => lines.push(format!(
                "Bollinger(20, 2): upper {:.2}, middle {:.2}, lower {:.2}",
                b.upper, b.middle, b.lower
            )),
            None => lines.push("Bollinger(20, 2): n/a (insufficient history)".to_string()),
        }
        lines.join("\n")
    }
}
