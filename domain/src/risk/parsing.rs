//! Extract numeric levels from qualitative exit guidance.
//!
//! Handles phrases like `"below 92"`, `"20% below entry"`, `"1.5R then 2R"`
//! or `"118 / 125"`. Anything else yields nothing and is left to the
//! caller's fallback policy.

use regex::Regex;
use std::sync::LazyLock;

static LEVEL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)(\d+(?:\.\d+)?)\s*(%|percent\b|pct\b|r\b)?").expect("valid level regex")
});

/// A number found in the text and how it was qualified.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TextLevel {
    /// Absolute price.
    Price(f64),
    /// Percent of entry.
    Percent(f64),
    /// Multiple of risk (`2R`).
    RiskMultiple(f64),
}

pub fn extract_levels(text: &str) -> Vec<TextLevel> {
    LEVEL_RE
        .captures_iter(text)
        .filter_map(|caps| {
            let value: f64 = caps.get(1)?.as_str().parse().ok()?;
            let level = match caps.get(2).map(|m| m.as_str().to_ascii_lowercase()) {
                Some(q) if q == "r" => TextLevel::RiskMultiple(value),
                Some(_) => TextLevel::Percent(value),
                None => TextLevel::Price(value),
            };
            Some(level)
        })
        .collect()
}

/// Stop-loss guidance: an explicit percentage wins over a price level.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StopSpec {
    Percent(f64),
    Price(f64),
}

pub fn parse_stop(text: &str) -> Option<StopSpec> {
    let levels = extract_levels(text);
    levels
        .iter()
        .find_map(|l| match l {
            TextLevel::Percent(p) => Some(StopSpec::Percent(*p)),
            _ => None,
        })
        .or_else(|| {
            levels.iter().find_map(|l| match l {
                TextLevel::Price(p) => Some(StopSpec::Price(*p)),
                _ => None,
            })
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_extract_levels() {
        assert_eq!(extract_levels("below 92"), vec![TextLevel::Price(92.0)]);
        assert_eq!(
            extract_levels("book 1.5R, trail to 2r or 130"),
            vec![
                TextLevel::RiskMultiple(1.5),
                TextLevel::RiskMultiple(2.0),
                TextLevel::Price(130.0)
            ]
        );
        assert_eq!(extract_levels("15 percent"), vec![TextLevel::Percent(15.0)]);
        assert!(extract_levels("under the swing low").is_empty());
    }

    #[test]
    fn test_level_pattern_compiles_once() {
        // Whole match, number, qualifier
        assert_eq!(LEVEL_RE.captures_len(), 3);
        assert_eq!(extract_levels("2R"), extract_levels("2R"));
    }

    #[test]
    fn test_rupee_suffix_is_not_a_risk_multiple() {
        assert_eq!(extract_levels("92 rupees"), vec![TextLevel::Price(92.0)]);
    }

    #[test]
    fn test_parse_stop_prefers_percent() {
        assert_eq!(parse_stop("below 92"), Some(StopSpec::Price(92.0)));
        assert_eq!(parse_stop("92 or 12.5% whichever first"), Some(StopSpec::Percent(12.5)));
        assert_eq!(parse_stop("1R"), None);
        assert_eq!(parse_stop("structure break"), None);
    }
}
