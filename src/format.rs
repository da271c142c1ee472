//! Locale-aware number formatting for the info panel and legend.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
pub enum Locale {
    #[default]
    #[serde(rename = "pt-BR")]
    PtBr,
    #[serde(rename = "en-US")]
    EnUs,
}

impl Locale {
    pub fn decimal_separator(self) -> char {
        match self {
            Locale::PtBr => ',',
            Locale::EnUs => '.',
        }
    }

    pub fn thousands_separator(self) -> char {
        match self {
            Locale::PtBr => '.',
            Locale::EnUs => ',',
        }
    }
}

#[derive(Debug, thiserror::Error)]
#[error("unknown locale '{0}' (expected pt-BR or en-US)")]
pub struct LocaleParseError(String);

impl FromStr for Locale {
    type Err = LocaleParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pt-BR" | "pt" => Ok(Locale::PtBr),
            "en-US" | "en" => Ok(Locale::EnUs),
            other => Err(LocaleParseError(other.to_string())),
        }
    }
}

impl fmt::Display for Locale {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Locale::PtBr => "pt-BR",
            Locale::EnUs => "en-US",
        })
    }
}

/// Fixed-precision decimal with the locale's decimal separator.
pub fn decimal(value: f64, decimals: usize, locale: Locale) -> String {
    let text = format!("{:.*}", decimals, value);
    match locale.decimal_separator() {
        '.' => text,
        sep => text.replace('.', &sep.to_string()),
    }
}

/// Integer with the locale's thousands separator.
pub fn grouped(value: u64, locale: Locale) -> String {
    let digits = value.to_string();
    let sep = locale.thousands_separator();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(sep);
        }
        out.push(ch);
    }
    out
}

/// Coverage line for a "percentage of households without service" figure.
pub fn coverage(missing: Option<f64>, locale: Locale) -> String {
    match missing {
        Some(missing) => {
            let covered = (100.0 - missing).clamp(0.0, 100.0);
            format!("{}% coverage", decimal(covered, 1, locale))
        }
        None => "No data reported".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn coverage_is_complement_rounded_to_one_decimal() {
        assert_eq!(coverage(Some(28.88), Locale::PtBr), "71,1% coverage");
        assert_eq!(coverage(Some(28.88), Locale::EnUs), "71.1% coverage");
        assert_eq!(coverage(Some(0.0), Locale::PtBr), "100,0% coverage");
    }

    #[test]
    fn coverage_distinguishes_missing_from_zero() {
        assert_eq!(coverage(None, Locale::PtBr), "No data reported");
        assert_eq!(coverage(Some(100.0), Locale::PtBr), "0,0% coverage");
    }

    #[test]
    fn coverage_is_clamped() {
        assert_eq!(coverage(Some(-3.0), Locale::EnUs), "100.0% coverage");
        assert_eq!(coverage(Some(120.0), Locale::EnUs), "0.0% coverage");
    }

    #[test]
    fn thousands_grouping() {
        assert_eq!(grouped(167434, Locale::PtBr), "167.434");
        assert_eq!(grouped(6211223, Locale::EnUs), "6,211,223");
        assert_eq!(grouped(999, Locale::PtBr), "999");
        assert_eq!(grouped(0, Locale::PtBr), "0");
    }

    #[test]
    fn decimals_use_locale_separator() {
        assert_eq!(decimal(0.7614, 3, Locale::PtBr), "0,761");
        assert_eq!(decimal(19.94, 1, Locale::EnUs), "19.9");
    }

    #[test]
    fn locale_parses_short_and_long_tags() {
        assert_eq!("pt-BR".parse::<Locale>().unwrap(), Locale::PtBr);
        assert_eq!("en".parse::<Locale>().unwrap(), Locale::EnUs);
        assert!("fr-FR".parse::<Locale>().is_err());
    }
}
