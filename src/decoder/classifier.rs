//! Duration classifier
//!
//! Maps a press or release duration to a Morse symbol or gap class.
//! Stateless: the same duration and thresholds always give the same answer.
//!
//! Press durations between 1.5 dots and half a dash fall in a dead zone and
//! produce [`Symbol::None`]. Those presses are dropped without contributing
//! to the current letter.

use serde::{Deserialize, Serialize};

/// Symbol produced by a press
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Symbol {
    Dot,
    Dash,
    /// Ambiguous or over-long press
    None,
}

impl Symbol {
    /// Character used in Morse patterns, if any
    pub fn as_char(self) -> Option<char> {
        match self {
            Symbol::Dot => Some('.'),
            Symbol::Dash => Some('-'),
            Symbol::None => None,
        }
    }
}

impl std::fmt::Display for Symbol {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Symbol::Dot => write!(f, "."),
            Symbol::Dash => write!(f, "-"),
            Symbol::None => write!(f, "none"),
        }
    }
}

/// Gap class produced by a release
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GapKind {
    /// Gap between symbols of one letter. [`Thresholds::classify_release`]
    /// reports these as [`GapKind::None`] since they never cross a boundary.
    IntraChar,
    /// Letter completed
    InterChar,
    /// Letter and word completed
    WordGap,
    /// No boundary crossed
    None,
}

/// Absolute Morse thresholds in seconds
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    pub dot: f64,
    pub dash: f64,
    pub inter_char: f64,
    pub word: f64,
}

impl Thresholds {
    /// Standard 1/3/3/7 ratios for the given unit
    pub fn from_unit(unit_secs: f64) -> Self {
        Self {
            dot: unit_secs,
            dash: unit_secs * 3.0,
            inter_char: unit_secs * 3.0,
            word: unit_secs * 7.0,
        }
    }

    /// Classify how long the key was held down
    pub fn classify_press(&self, duration: f64) -> Symbol {
        if duration <= 1.5 * self.dot {
            Symbol::Dot
        } else if duration >= 0.5 * self.dash && duration <= 1.5 * self.dash && duration < self.word
        {
            Symbol::Dash
        } else {
            Symbol::None
        }
    }

    /// Classify how long the key stayed up
    pub fn classify_release(&self, duration: f64) -> GapKind {
        if duration >= self.inter_char && duration < self.word {
            GapKind::InterChar
        } else if duration >= self.word {
            GapKind::WordGap
        } else {
            GapKind::None
        }
    }
}

impl Default for Thresholds {
    fn default() -> Self {
        Self::from_unit(0.2)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unit() -> Thresholds {
        Thresholds::from_unit(1.0)
    }

    #[test]
    fn test_dot_range() {
        let t = unit();
        for d in [0.0, 0.2, 1.0, 1.4, 1.5] {
            assert_eq!(t.classify_press(d), Symbol::Dot, "duration {d}");
        }
    }

    #[test]
    fn test_dash_range() {
        let t = unit();
        for d in [1.5001, 2.0, 3.0, 4.0, 4.5] {
            assert_eq!(t.classify_press(d), Symbol::Dash, "duration {d}");
        }
    }

    #[test]
    fn test_overlong_press_is_none() {
        let t = unit();
        assert_eq!(t.classify_press(4.6), Symbol::None);
        assert_eq!(t.classify_press(10.0), Symbol::None);
    }

    #[test]
    fn test_dead_zone() {
        // Wider dash so 1.5 dots < 0.5 dash.
        let t = Thresholds {
            dot: 1.0,
            dash: 4.0,
            inter_char: 3.0,
            word: 7.0,
        };
        assert_eq!(t.classify_press(1.5), Symbol::Dot);
        assert_eq!(t.classify_press(1.8), Symbol::None);
        assert_eq!(t.classify_press(2.0), Symbol::Dash);
    }

    #[test]
    fn test_dash_capped_by_word_length() {
        let t = Thresholds {
            dot: 1.0,
            dash: 6.0,
            inter_char: 3.0,
            word: 7.0,
        };
        assert_eq!(t.classify_press(6.9), Symbol::Dash);
        assert_eq!(t.classify_press(7.0), Symbol::None);
    }

    #[test]
    fn test_release_classes() {
        let t = unit();
        assert_eq!(t.classify_release(0.0), GapKind::None);
        assert_eq!(t.classify_release(1.0), GapKind::None);
        assert_eq!(t.classify_release(2.99), GapKind::None);
        assert_eq!(t.classify_release(3.0), GapKind::InterChar);
        assert_eq!(t.classify_release(6.99), GapKind::InterChar);
        assert_eq!(t.classify_release(7.0), GapKind::WordGap);
        assert_eq!(t.classify_release(1000.0), GapKind::WordGap);
    }

    #[test]
    fn test_classifier_is_repeatable() {
        let t = Thresholds::default();
        let first: Vec<_> = (0..50).map(|i| t.classify_press(i as f64 * 0.03)).collect();
        let second: Vec<_> = (0..50).map(|i| t.classify_press(i as f64 * 0.03)).collect();
        assert_eq!(first, second);

        let gaps: Vec<_> = (0..50).map(|i| t.classify_release(i as f64 * 0.05)).collect();
        let again: Vec<_> = (0..50).map(|i| t.classify_release(i as f64 * 0.05)).collect();
        assert_eq!(gaps, again);
    }
}
