use std::collections::HashMap;
use std::fs;
use std::path::Path;

use tracing::{info, warn};

use crate::error::ConfigError;

/// Rank assigned to any player missing from the table.
pub const SENTINEL_RANK: u32 = 1000;

#[derive(Debug, Clone, Default)]
pub struct PlayerRankTable {
    ranks: HashMap<String, u32>,
    display: Vec<String>,
}

impl PlayerRankTable {
    pub fn from_entries<I, S>(entries: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = (S, u32)>,
        S: AsRef<str>,
    {
        let mut ranks: HashMap<String, u32> = HashMap::new();
        for (name, rank) in entries {
            let name = name.as_ref();
            let key = canonical_name(name);
            if key.is_empty() {
                return Err(ConfigError::Invalid {
                    what: "rank table",
                    reason: "empty player name".to_string(),
                });
            }
            if rank == 0 {
                return Err(ConfigError::Invalid {
                    what: "rank table",
                    reason: format!("player {name:?} has rank 0"),
                });
            }
            // Same player under different casing: keep the better rank.
            ranks
                .entry(key)
                .and_modify(|r| *r = (*r).min(rank))
                .or_insert(rank);
        }

        let mut display = ranks.keys().map(|k| title_case(k)).collect::<Vec<_>>();
        display.sort();
        Ok(Self { ranks, display })
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let raw = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            what: "rank table",
            path: path.to_path_buf(),
            source,
        })?;
        let entries: HashMap<String, u32> =
            serde_json::from_str(&raw).map_err(|source| ConfigError::Parse {
                what: "rank table",
                path: path.to_path_buf(),
                source,
            })?;
        let table = Self::from_entries(entries)?;
        if table.is_empty() {
            return Err(ConfigError::Invalid {
                what: "rank table",
                reason: format!("{} contains no players", path.display()),
            });
        }
        info!(players = table.len(), path = %path.display(), "loaded rank table");
        Ok(table)
    }

    /// The table's rank for `player`, `None` when unranked.
    pub fn lookup(&self, player: &str) -> Option<u32> {
        self.ranks.get(&canonical_name(player)).copied()
    }

    /// Rank used as a feature; unranked players get [`SENTINEL_RANK`].
    pub fn rank(&self, player: &str) -> u32 {
        self.lookup(player).unwrap_or_else(|| {
            warn!(player, rank = SENTINEL_RANK, "player not in rank table");
            SENTINEL_RANK
        })
    }

    /// Title-cased player names, sorted, for selection lists.
    pub fn players(&self) -> &[String] {
        &self.display
    }

    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }
}

pub fn canonical_name(input: &str) -> String {
    input
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

fn title_case(canonical: &str) -> String {
    let mut out = String::with_capacity(canonical.len());
    let mut at_word_start = true;
    for ch in canonical.chars() {
        if ch.is_alphabetic() {
            if at_word_start {
                out.extend(ch.to_uppercase());
            } else {
                out.push(ch);
            }
            at_word_start = false;
        } else {
            out.push(ch);
            at_word_start = true;
        }
    }
    out
}
