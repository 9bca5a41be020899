//! Celebrity and vote models.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

/// Which way a vote goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum VoteType {
    Roseanne,
    NotRoseanne,
}

impl VoteType {
    pub fn as_str(&self) -> &'static str {
        match self {
            VoteType::Roseanne => "roseanne",
            VoteType::NotRoseanne => "not-roseanne",
        }
    }
}

impl std::fmt::Display for VoteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for VoteType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "roseanne" => Ok(VoteType::Roseanne),
            "not-roseanne" => Ok(VoteType::NotRoseanne),
            _ => Err(format!("unknown vote type: {}", s)),
        }
    }
}

/// A stored celebrity entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct Celebrity {
    pub id: String,
    pub name: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub submitted_by: Option<String>,
    pub approved: bool,
    pub created_at: Option<NaiveDateTime>,
}

/// Public view of an approved entry with its vote counts.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct CelebritySummary {
    pub id: String,
    pub name: String,
    pub subtitle: Option<String>,
    pub image_url: String,
    pub roseanne_votes: i64,
    pub not_roseanne_votes: i64,
}

/// Vote counts for one entry.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
#[serde(rename_all = "camelCase")]
pub struct VoteTotals {
    pub roseanne_votes: i64,
    pub not_roseanne_votes: i64,
}

impl VoteTotals {
    pub fn add(&mut self, vote: VoteType) {
        match vote {
            VoteType::Roseanne => self.roseanne_votes += 1,
            VoteType::NotRoseanne => self.not_roseanne_votes += 1,
        }
    }
}

/// Entry to insert.
#[derive(Debug, Clone)]
pub struct NewCelebrity {
    pub id: String,
    pub name: String,
    pub subtitle: String,
    pub image_url: String,
    pub submitted_by: String,
    pub approved: bool,
}

impl NewCelebrity {
    /// Build an entry whose id is the slug of its name.
    pub fn from_name(
        name: impl Into<String>,
        subtitle: impl Into<String>,
        image_url: impl Into<String>,
        submitted_by: impl Into<String>,
        approved: bool,
    ) -> Self {
        let name = name.into();
        Self {
            id: slugify(&name),
            name,
            subtitle: subtitle.into(),
            image_url: image_url.into(),
            submitted_by: submitted_by.into(),
            approved,
        }
    }
}

/// Fields an admin may change while approving.
#[derive(Debug, Clone, Default)]
pub struct CelebrityUpdate {
    pub name: Option<String>,
    pub subtitle: Option<String>,
    pub image_url: Option<String>,
    pub approved: bool,
}

/// Id, name and image of an entry.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, sqlx::FromRow)]
pub struct ImageRecord {
    pub id: String,
    pub name: String,
    pub image_url: String,
}

/// Read a loosely typed approval flag: true unless `false` or `"false"`.
pub fn approval_flag(value: Option<&serde_json::Value>) -> bool {
    match value {
        Some(serde_json::Value::Bool(false)) => false,
        Some(serde_json::Value::String(s)) => s != "false",
        _ => true,
    }
}

/// Derive an entry id from its name.
///
/// Lowercases, maps anything outside `[a-z0-9]` to `-` and collapses dash runs.
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars().flat_map(char::to_lowercase) {
        let c = if c.is_ascii_lowercase() || c.is_ascii_digit() {
            c
        } else {
            '-'
        };
        if c == '-' && slug.ends_with('-') {
            continue;
        }
        slug.push(c);
    }
    slug
}

/// Entries written by `init-db`.
pub const SEED_CELEBRITIES: &[(&str, &str, &str, &str)] = &[
    (
        "melissa-mccarthy",
        "Melissa McCarthy",
        "Comedian & Actress",
        "https://raw.githubusercontent.com/williamsongrowth/roseanne-game/main/images/Melissa%20McCarthy.jpg",
    ),
    (
        "amy-schumer",
        "Amy Schumer",
        "Stand-up Comedian",
        "https://raw.githubusercontent.com/williamsongrowth/roseanne-game/main/images/Amy%20Schumer.jpg",
    ),
    (
        "tina-fey",
        "Tina Fey",
        "Writer & Comedian",
        "https://raw.githubusercontent.com/williamsongrowth/roseanne-game/main/images/Tina%20Fey.jpg",
    ),
    (
        "rebel-wilson",
        "Rebel Wilson",
        "Actress & Comedian",
        "https://raw.githubusercontent.com/williamsongrowth/roseanne-game/main/images/Rebel%20Wilson.png",
    ),
    (
        "rosie-odonnell",
        "Rosie O'Donnell",
        "TV Host & Comedian",
        "https://raw.githubusercontent.com/williamsongrowth/roseanne-game/main/images/Rosie%20ODonnell.png",
    ),
];
