//! Data types for the version manifest

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// `versions.json` as published next to the server artifacts
#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Manifest {
    pub latest: Latest,
    /// Newest first
    pub versions: Vec<Version>,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
pub struct Latest {
    pub snapshot: String,
    pub release: String,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Version {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: VersionType,
    pub time: DateTime<Utc>,
    pub release_time: DateTime<Utc>,
}

/// Classification tag of a published build
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VersionType {
    Release,
    Snapshot,
    OldBeta,
    OldAlpha,
    /// Any tag this build does not know about
    #[serde(other)]
    Other,
}

/// Which builds the updater follows
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Channel {
    Release,
    #[default]
    Snapshot,
}

impl Channel {
    pub fn from_release_only(release_only: bool) -> Self {
        if release_only {
            Channel::Release
        } else {
            Channel::Snapshot
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Channel::Release => "release",
            Channel::Snapshot => "snapshot",
        }
    }

    pub fn accepts(&self, kind: VersionType) -> bool {
        match self {
            Channel::Release => kind == VersionType::Release,
            Channel::Snapshot => kind == VersionType::Snapshot,
        }
    }
}

impl std::str::FromStr for Channel {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "release" => Ok(Channel::Release),
            "snapshot" => Ok(Channel::Snapshot),
            _ => Err(format!("Unknown channel: {}", s)),
        }
    }
}

impl std::fmt::Display for Channel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl Manifest {
    /// The first version in manifest order that the channel accepts.
    ///
    /// The manifest lists versions newest first, so first-match is "newest". Timestamps
    /// are deliberately not compared.
    pub fn newest(&self, channel: Channel) -> Option<&Version> {
        let newest = self.versions.iter().find(|v| channel.accepts(v.kind));
        debug!(%channel, newest = ?newest.map(|v| v.id.as_str()), "Selected newest version");
        newest
    }
}
