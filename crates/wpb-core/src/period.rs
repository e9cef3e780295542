//! Data-taking periods and systematic variation modes.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::{Error, Result};

/// Run 2 Ultra-Legacy data-taking period.
///
/// `2016APV` ("preVFP") and `2016` ("postVFP") share a calendar year but use
/// different calibrations, so the year modifier is part of the period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum Period {
    /// 2016 preVFP.
    Y2016Apv,
    /// 2016 postVFP.
    Y2016,
    /// 2017.
    Y2017,
    /// 2018.
    Y2018,
}

impl Period {
    /// Build a period from a year (`"2016"`, `"2017"`, `"2018"`) and a year modifier (`""` or `"APV"`).
    pub fn from_parts(year: &str, year_mod: &str) -> Result<Self> {
        match (year, year_mod) {
            ("2016", "APV") => Ok(Period::Y2016Apv),
            ("2016", "") => Ok(Period::Y2016),
            ("2017", "") => Ok(Period::Y2017),
            ("2018", "") => Ok(Period::Y2018),
            _ => Err(Error::Configuration(format!(
                "unknown data-taking period: year='{year}', year_mod='{year_mod}'"
            ))),
        }
    }

    /// Calendar year without modifier.
    pub fn year(self) -> &'static str {
        match self {
            Period::Y2016Apv | Period::Y2016 => "2016",
            Period::Y2017 => "2017",
            Period::Y2018 => "2018",
        }
    }

    /// Year modifier (`"APV"` for 2016 preVFP, empty otherwise).
    pub fn year_mod(self) -> &'static str {
        match self {
            Period::Y2016Apv => "APV",
            _ => "",
        }
    }

    /// Year concatenated with its modifier, e.g. `"2016APV"`.
    pub fn tag(self) -> &'static str {
        match self {
            Period::Y2016Apv => "2016APV",
            Period::Y2016 => "2016",
            Period::Y2017 => "2017",
            Period::Y2018 => "2018",
        }
    }

    /// Period label used by the POG correction tables.
    pub fn pog_year(self) -> &'static str {
        match self {
            Period::Y2016Apv => "2016preVFP_UL",
            Period::Y2016 => "2016postVFP_UL",
            Period::Y2017 => "2017_UL",
            Period::Y2018 => "2018_UL",
        }
    }

    /// Whether the ECAL L1 pre-firing inefficiency affects this period.
    pub fn has_l1_prefiring(self) -> bool {
        !matches!(self, Period::Y2018)
    }

    /// All supported periods.
    pub fn all() -> [Period; 4] {
        [Period::Y2016Apv, Period::Y2016, Period::Y2017, Period::Y2018]
    }
}

impl fmt::Display for Period {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

impl FromStr for Period {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.strip_suffix("APV") {
            Some(year) => Period::from_parts(year, "APV"),
            None => Period::from_parts(s, ""),
        }
    }
}

impl TryFrom<String> for Period {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

impl From<Period> for String {
    fn from(p: Period) -> Self {
        p.tag().to_string()
    }
}

/// Systematic variation mode of a correction pass.
///
/// In `Nominal` mode every corrector registers its nominal factor plus the
/// up/down variants. In `Single` mode only nominal factors are registered,
/// which is what a job computing one specific systematic shift needs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Variation {
    /// Register nominal, up and down variants.
    #[default]
    Nominal,
    /// Compute a single named systematic; register only nominal factors.
    Single(String),
}

impl Variation {
    /// `true` in nominal mode.
    pub fn is_nominal(&self) -> bool {
        matches!(self, Variation::Nominal)
    }

    /// Variation label (`"nominal"` or the systematic name).
    pub fn as_str(&self) -> &str {
        match self {
            Variation::Nominal => "nominal",
            Variation::Single(name) => name,
        }
    }
}

impl From<&str> for Variation {
    fn from(s: &str) -> Self {
        if s == "nominal" { Variation::Nominal } else { Variation::Single(s.to_string()) }
    }
}

impl From<String> for Variation {
    fn from(s: String) -> Self {
        Variation::from(s.as_str())
    }
}

impl From<Variation> for String {
    fn from(v: Variation) -> Self {
        v.as_str().to_string()
    }
}

impl fmt::Display for Variation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_period_tags() {
        assert_eq!("2016APV".parse::<Period>().unwrap(), Period::Y2016Apv);
        assert_eq!("2017".parse::<Period>().unwrap(), Period::Y2017);
        assert!("2019".parse::<Period>().is_err());
        assert!(Period::from_parts("2017", "APV").is_err());
        for p in Period::all() {
            assert_eq!(p.tag().parse::<Period>().unwrap(), p);
        }
    }

    #[test]
    fn pog_years() {
        assert_eq!(Period::Y2016Apv.pog_year(), "2016preVFP_UL");
        assert_eq!(Period::Y2018.pog_year(), "2018_UL");
        assert_eq!(Period::Y2016Apv.year(), "2016");
        assert!(!Period::Y2018.has_l1_prefiring());
    }

    #[test]
    fn period_serde() {
        let p: Period = serde_json::from_str("\"2016APV\"").unwrap();
        assert_eq!(p, Period::Y2016Apv);
        assert_eq!(serde_json::to_string(&Period::Y2018).unwrap(), "\"2018\"");
        assert!(serde_json::from_str::<Period>("\"2015\"").is_err());
    }

    #[test]
    fn variation_modes() {
        assert!(Variation::from("nominal").is_nominal());
        let v = Variation::from("pileup");
        assert!(!v.is_nominal());
        assert_eq!(v.as_str(), "pileup");
    }
}
