//! Protocol phase and packet direction.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Stage of a connection's protocol lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Phase {
    Login,
    Configuration,
    Play,
}

impl Phase {
    pub const ALL: [Phase; 3] = [Phase::Login, Phase::Configuration, Phase::Play];

    pub fn as_str(self) -> &'static str {
        match self {
            Phase::Login => "login",
            Phase::Configuration => "configuration",
            Phase::Play => "play",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which endpoint receives packets on a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Direction {
    Clientbound,
    Serverbound,
}

impl Direction {
    pub const ALL: [Direction; 2] = [Direction::Clientbound, Direction::Serverbound];

    pub fn as_str(self) -> &'static str {
        match self {
            Direction::Clientbound => "clientbound",
            Direction::Serverbound => "serverbound",
        }
    }

    pub fn opposite(self) -> Direction {
        match self {
            Direction::Clientbound => Direction::Serverbound,
            Direction::Serverbound => Direction::Clientbound,
        }
    }
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_matches_serde_names() {
        assert_eq!(Phase::Configuration.to_string(), "configuration");
        assert_eq!(Direction::Serverbound.to_string(), "serverbound");
        assert_eq!(Direction::Clientbound.opposite(), Direction::Serverbound);
    }
}
