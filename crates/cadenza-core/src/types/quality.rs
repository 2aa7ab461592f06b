//! Audio quality tiers.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::Error;

/// One audio bitrate level attempted as a unit.
///
/// Serialized as the plain kbps integer (`320`, `256`, `128`, `92`).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u32", into = "u32")]
pub enum QualityTier {
    Kbps320,
    Kbps256,
    Kbps128,
    Kbps92,
}

impl QualityTier {
    /// Fixed descending priority used when no tier is preferred.
    pub const DEFAULT_ORDER: [Self; 4] = [Self::Kbps320, Self::Kbps256, Self::Kbps128, Self::Kbps92];

    /// Bitrate in kbps.
    pub const fn kbps(self) -> u32 {
        match self {
            Self::Kbps320 => 320,
            Self::Kbps256 => 256,
            Self::Kbps128 => 128,
            Self::Kbps92 => 92,
        }
    }

    pub const fn from_kbps(kbps: u32) -> Option<Self> {
        match kbps {
            320 => Some(Self::Kbps320),
            256 => Some(Self::Kbps256),
            128 => Some(Self::Kbps128),
            92 => Some(Self::Kbps92),
            _ => None,
        }
    }

    /// Tier search order: the preferred tier first, then the default order without it.
    pub fn search_order(preferred: Option<Self>) -> Vec<Self> {
        match preferred {
            Some(first) => std::iter::once(first)
                .chain(Self::DEFAULT_ORDER.into_iter().filter(|q| *q != first))
                .collect(),
            None => Self::DEFAULT_ORDER.to_vec(),
        }
    }
}

impl TryFrom<u32> for QualityTier {
    type Error = Error;

    fn try_from(kbps: u32) -> Result<Self, Self::Error> {
        Self::from_kbps(kbps).ok_or_else(|| {
            Error::InvalidInput(format!(
                "unsupported quality {kbps}, expected one of 320, 256, 128, 92"
            ))
        })
    }
}

impl From<QualityTier> for u32 {
    fn from(tier: QualityTier) -> Self {
        tier.kbps()
    }
}

impl fmt::Display for QualityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}kbps", self.kbps())
    }
}
