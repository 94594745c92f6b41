//! Bead layout for a ten-rod abacus.

use crate::ABACUS_DIGITS;
use serde::{Deserialize, Serialize};
use std::fmt::Write;

/// Largest value that fits on the rods without overflow.
pub const MAX_DISPLAY_VALUE: u64 = 9_999_999_999;

/// Beads on each rod.
pub const BEADS_PER_ROD: u8 = 10;

/// Digits of a value laid out one per rod, most significant first.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AbacusFrame {
    /// Active bead count per rod, from 10^9 down to 10^0
    pub digits: [u8; ABACUS_DIGITS],
    /// The value had more than ten integer digits; only the lowest ten are shown
    pub overflow: bool,
    /// No value has arrived yet
    pub loading: bool,
}

/// One rod of the frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Rod {
    /// Power of ten this rod represents
    pub power: u32,
    /// Beads pushed to the active side
    pub active: u8,
}

impl AbacusFrame {
    /// Lay out `value` on the rods.
    ///
    /// Fractions are truncated. Negative and non-finite values show as zero.
    /// Values above [`MAX_DISPLAY_VALUE`] keep their lowest ten digits and
    /// set `overflow`.
    pub fn from_value(value: f64, loading: bool) -> Self {
        let whole = if value.is_finite() && value > 0.0 {
            value.trunc() as u64
        } else {
            0
        };
        let overflow = whole > MAX_DISPLAY_VALUE;
        let mut remaining = whole % (MAX_DISPLAY_VALUE + 1);

        let mut digits = [0u8; ABACUS_DIGITS];
        for slot in digits.iter_mut().rev() {
            *slot = (remaining % 10) as u8;
            remaining /= 10;
        }

        Self {
            digits,
            overflow,
            loading,
        }
    }

    /// Frame shown before any value is known.
    pub fn loading() -> Self {
        Self::from_value(0.0, true)
    }

    pub fn rods(&self) -> impl Iterator<Item = Rod> + '_ {
        self.digits.iter().enumerate().map(|(index, &active)| Rod {
            power: (ABACUS_DIGITS - index - 1) as u32,
            active,
        })
    }

    /// The displayed number, i.e. the digits read back as an integer.
    pub fn displayed_value(&self) -> u64 {
        self.digits
            .iter()
            .fold(0u64, |acc, &digit| acc * 10 + u64::from(digit))
    }

    /// Draw the frame as text, one rod per line.
    pub fn render_text(&self) -> String {
        let mut out = String::new();
        if self.loading {
            out.push_str("Loading...\n");
        }
        for rod in self.rods() {
            let beads: String = (0..BEADS_PER_ROD)
                .map(|bead| if bead < rod.active { '●' } else { '○' })
                .collect();
            let _ = writeln!(out, "10^{} |{}|", rod.power, beads);
        }
        if self.overflow {
            out.push_str("(value exceeds ten digits, showing lowest digits)\n");
        }
        out
    }
}

impl Default for AbacusFrame {
    fn default() -> Self {
        Self::loading()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_digits_are_padded() {
        let frame = AbacusFrame::from_value(8_065_312_345.0, false);
        assert_eq!(frame.digits, [8, 0, 6, 5, 3, 1, 2, 3, 4, 5]);
        assert!(!frame.overflow);

        let small = AbacusFrame::from_value(42.0, false);
        assert_eq!(small.digits, [0, 0, 0, 0, 0, 0, 0, 0, 4, 2]);
    }

    #[test]
    fn test_max_value_fits() {
        let frame = AbacusFrame::from_value(MAX_DISPLAY_VALUE as f64, false);
        assert_eq!(frame.digits, [9; ABACUS_DIGITS]);
        assert!(!frame.overflow);
    }

    #[test]
    fn test_overflow_keeps_lowest_digits() {
        let frame = AbacusFrame::from_value(10_000_000_000.0, false);
        assert!(frame.overflow);
        assert_eq!(frame.displayed_value(), 0);

        let debt = AbacusFrame::from_value(34_000_001_234_567.0, false);
        assert!(debt.overflow);
        assert_eq!(debt.displayed_value(), 1_234_567);
    }

    #[test]
    fn test_invalid_values_show_zero() {
        for value in [f64::NAN, f64::INFINITY, -5.0] {
            let frame = AbacusFrame::from_value(value, false);
            assert_eq!(frame.displayed_value(), 0);
            assert!(!frame.overflow);
        }
    }

    #[test]
    fn test_fraction_truncated() {
        assert_eq!(AbacusFrame::from_value(12.99, false).displayed_value(), 12);
    }

    #[test]
    fn test_rods_ordered_by_power() {
        let frame = AbacusFrame::from_value(1_000_000_001.0, false);
        let rods: Vec<Rod> = frame.rods().collect();
        assert_eq!(rods.first(), Some(&Rod { power: 9, active: 1 }));
        assert_eq!(rods.last(), Some(&Rod { power: 0, active: 1 }));
    }

    #[test]
    fn test_render_text() {
        let text = AbacusFrame::from_value(3.0, false).render_text();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines.len(), ABACUS_DIGITS);
        assert_eq!(lines[9], "10^0 |●●●○○○○○○○|");
        assert!(AbacusFrame::loading().render_text().starts_with("Loading..."));
    }
}
