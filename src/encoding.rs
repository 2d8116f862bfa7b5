//! Ordinal code tables for the categorical match inputs.
//!
//! The codes are positions in the orderings the classifier was trained with.
//! Variant order and `code()` values must not change.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown {axis} label: {label:?}")]
pub struct UnknownLabel {
    pub axis: &'static str,
    pub label: String,
}

/// Shared surface of the closed category enums.
pub trait Category: Copy + Sized + 'static {
    const AXIS: &'static str;
    const ALL: &'static [Self];

    fn label(self) -> &'static str;
    fn code(self) -> u8;

    fn from_label(raw: &str) -> Result<Self, UnknownLabel> {
        let wanted = raw.trim();
        Self::ALL
            .iter()
            .copied()
            .find(|c| c.label().eq_ignore_ascii_case(wanted))
            .ok_or_else(|| UnknownLabel {
                axis: Self::AXIS,
                label: raw.to_string(),
            })
    }

    fn labels() -> Vec<&'static str> {
        Self::ALL.iter().map(|c| c.label()).collect()
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Surface {
    Carpet,
    Clay,
    Grass,
    Hard,
}

impl Category for Surface {
    const AXIS: &'static str = "surface";
    const ALL: &'static [Self] = &[Self::Carpet, Self::Clay, Self::Grass, Self::Hard];

    fn label(self) -> &'static str {
        match self {
            Self::Carpet => "Carpet",
            Self::Clay => "Clay",
            Self::Grass => "Grass",
            Self::Hard => "Hard",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Carpet => 0,
            Self::Clay => 1,
            Self::Grass => 2,
            Self::Hard => 3,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Court {
    Outdoor,
    Indoor,
}

impl Category for Court {
    const AXIS: &'static str = "court";
    const ALL: &'static [Self] = &[Self::Outdoor, Self::Indoor];

    fn label(self) -> &'static str {
        match self {
            Self::Outdoor => "Outdoor",
            Self::Indoor => "Indoor",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Outdoor => 0,
            Self::Indoor => 1,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Series {
    Atp250,
    Atp500,
    GrandSlam,
    International,
    InternationalGold,
    Masters,
    Masters1000,
    MastersCup,
}

impl Category for Series {
    const AXIS: &'static str = "series";
    const ALL: &'static [Self] = &[
        Self::Atp250,
        Self::Atp500,
        Self::GrandSlam,
        Self::International,
        Self::InternationalGold,
        Self::Masters,
        Self::Masters1000,
        Self::MastersCup,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::Atp250 => "ATP250",
            Self::Atp500 => "ATP500",
            Self::GrandSlam => "Grand Slam",
            Self::International => "International",
            Self::InternationalGold => "International Gold",
            Self::Masters => "Masters",
            Self::Masters1000 => "Masters 1000",
            Self::MastersCup => "Masters Cup",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::Atp250 => 0,
            Self::Atp500 => 1,
            Self::GrandSlam => 2,
            Self::International => 3,
            Self::InternationalGold => 4,
            Self::Masters => 5,
            Self::Masters1000 => 6,
            Self::MastersCup => 7,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Round {
    First,
    Second,
    Third,
    Fourth,
    Quarterfinals,
    RoundRobin,
    Semifinals,
    Final,
}

impl Category for Round {
    const AXIS: &'static str = "round";
    const ALL: &'static [Self] = &[
        Self::First,
        Self::Second,
        Self::Third,
        Self::Fourth,
        Self::Quarterfinals,
        Self::RoundRobin,
        Self::Semifinals,
        Self::Final,
    ];

    fn label(self) -> &'static str {
        match self {
            Self::First => "1st Round",
            Self::Second => "2nd Round",
            Self::Third => "3rd Round",
            Self::Fourth => "4th Round",
            Self::Quarterfinals => "Quarterfinals",
            Self::RoundRobin => "Round Robin",
            Self::Semifinals => "Semifinals",
            Self::Final => "The Final",
        }
    }

    fn code(self) -> u8 {
        match self {
            Self::First => 0,
            Self::Second => 1,
            Self::Third => 2,
            Self::Fourth => 3,
            Self::Quarterfinals => 4,
            Self::RoundRobin => 5,
            Self::Semifinals => 6,
            Self::Final => 7,
        }
    }
}

/// Match length in sets. The feature value is the set count itself.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BestOf {
    Three,
    Five,
}

impl BestOf {
    pub const ALL: [BestOf; 2] = [BestOf::Three, BestOf::Five];

    pub fn sets(self) -> u8 {
        match self {
            Self::Three => 3,
            Self::Five => 5,
        }
    }

    pub fn from_sets(sets: u8) -> Option<Self> {
        match sets {
            3 => Some(Self::Three),
            5 => Some(Self::Five),
            _ => None,
        }
    }
}

impl FromStr for BestOf {
    type Err = UnknownLabel;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .parse::<u8>()
            .ok()
            .and_then(Self::from_sets)
            .ok_or_else(|| UnknownLabel {
                axis: "best-of",
                label: raw.to_string(),
            })
    }
}

macro_rules! category_str_impls {
    ($($ty:ty),*) => {
        $(
            impl FromStr for $ty {
                type Err = UnknownLabel;

                fn from_str(raw: &str) -> Result<Self, Self::Err> {
                    <$ty as Category>::from_label(raw)
                }
            }

            impl fmt::Display for $ty {
                fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                    f.write_str(self.label())
                }
            }
        )*
    };
}

category_str_impls!(Surface, Court, Series, Round);

impl fmt::Display for BestOf {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.sets())
    }
}
