//! Generation aggregate and its append-only entries.
//!
//! A generation is one avatar-creation session owned by a single user. Its
//! `status` field doubles as the cross-process lock: only `Idle` generations
//! may start a pipeline run and every run returns the generation to `Idle`.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use rand::Rng;
use rand::distributions::Alphanumeric;
use serde::{Deserialize, Serialize};
use url::Url;
use uuid::Uuid;

use super::{AvatarStyle, UserId};

/// Longest accepted generation identifier.
pub const GENERATION_ID_MAX_LEN: usize = 64;
const GENERATED_ID_LEN: usize = 10;

/// Validation errors for [`GenerationId`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum GenerationIdError {
    /// The identifier was empty.
    #[error("generation id must not be empty")]
    Empty,
    /// The identifier exceeded [`GENERATION_ID_MAX_LEN`].
    #[error("generation id must be at most {max} characters")]
    TooLong {
        /// Maximum accepted length.
        max: usize,
    },
    /// The identifier contained characters outside `[A-Za-z0-9_-]`.
    #[error("generation id may only contain letters, digits, '-' and '_'")]
    InvalidCharacter,
}

/// Opaque, caller-supplied generation identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct GenerationId(String);

impl GenerationId {
    /// Validate an identifier.
    pub fn new(input: impl Into<String>) -> Result<Self, GenerationIdError> {
        let raw: String = input.into();
        if raw.is_empty() {
            return Err(GenerationIdError::Empty);
        }
        if raw.len() > GENERATION_ID_MAX_LEN {
            return Err(GenerationIdError::TooLong {
                max: GENERATION_ID_MAX_LEN,
            });
        }
        if !raw
            .bytes()
            .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(GenerationIdError::InvalidCharacter);
        }
        Ok(Self(raw))
    }

    /// Generate a fresh random identifier for callers that do not supply one.
    pub fn generate() -> Self {
        let token: String = rand::thread_rng()
            .sample_iter(&Alphanumeric)
            .take(GENERATED_ID_LEN)
            .map(char::from)
            .collect();
        Self(token)
    }

    /// Borrow the identifier.
    pub fn as_str(&self) -> &str {
        self.0.as_str()
    }
}

impl AsRef<str> for GenerationId {
    fn as_ref(&self) -> &str {
        self.as_str()
    }
}

impl fmt::Display for GenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for GenerationId {
    type Error = GenerationIdError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<GenerationId> for String {
    fn from(value: GenerationId) -> Self {
        value.0
    }
}

/// Persisted lock state of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationStatus {
    /// No pipeline is running.
    Idle,
    /// A pipeline run holds the generation.
    InProgress,
}

impl GenerationStatus {
    /// Storage spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Idle => "IDLE",
            Self::InProgress => "IN_PROGRESS",
        }
    }
}

/// Error raised when a stored enum value is not recognised.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown {kind} value: {value}")]
pub struct UnknownVariantError {
    /// Which enum failed to parse.
    pub kind: &'static str,
    /// The rejected input.
    pub value: String,
}

impl FromStr for GenerationStatus {
    type Err = UnknownVariantError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "IDLE" => Ok(Self::Idle),
            "IN_PROGRESS" => Ok(Self::InProgress),
            other => Err(UnknownVariantError {
                kind: "generation status",
                value: other.to_owned(),
            }),
        }
    }
}

/// Whether a generation shows up in the community feed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum GenerationVisibility {
    /// Listed in the community feed once it has an entry.
    Public,
    /// Visible to the owner only.
    #[default]
    Private,
}

impl GenerationVisibility {
    /// Storage spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Public => "PUBLIC",
            Self::Private => "PRIVATE",
        }
    }
}

impl FromStr for GenerationVisibility {
    type Err = UnknownVariantError;

    /// Case-insensitive so HTML form values such as `public` are accepted.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "PUBLIC" => Ok(Self::Public),
            "PRIVATE" => Ok(Self::Private),
            _ => Err(UnknownVariantError {
                kind: "generation visibility",
                value: s.to_owned(),
            }),
        }
    }
}

/// Derived classification of a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum GenerationPhase {
    /// Idle with no entries; ready for a first run.
    Fresh,
    /// Idle with fewer entries than the cap; can be regenerated.
    Ongoing,
    /// Idle with the maximum number of entries; terminal.
    Finalized,
    /// A pipeline run currently holds the generation.
    InProgress,
}

impl GenerationPhase {
    /// Wire spelling.
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Fresh => "fresh",
            Self::Ongoing => "ongoing",
            Self::Finalized => "finalized",
            Self::InProgress => "in_progress",
        }
    }
}

/// One successfully synthesised avatar.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GenerationEntry {
    /// System-generated identifier.
    pub id: Uuid,
    /// Parent generation.
    pub generation_id: GenerationId,
    /// Override prompt used for regeneration; `None` for the first pass.
    pub prompt: Option<String>,
    /// Durable storage location of the image.
    pub image_url: Url,
    /// Creation timestamp; defines entry order.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp.
    pub updated_at: DateTime<Utc>,
}

/// Generation aggregate with its entries in creation order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Generation {
    /// Identifier.
    pub id: GenerationId,
    /// Owning user.
    pub user_id: UserId,
    /// Style fixed by the first successful entry.
    pub style: Option<AvatarStyle>,
    /// Community feed visibility.
    pub visibility: GenerationVisibility,
    /// Lock state.
    pub status: GenerationStatus,
    /// Creation timestamp.
    pub created_at: DateTime<Utc>,
    /// Last modification timestamp, bumped on lock acquisition and commit.
    pub updated_at: DateTime<Utc>,
    /// Entries ordered by `created_at`.
    pub entries: Vec<GenerationEntry>,
}

impl Generation {
    /// Build an empty, idle generation.
    pub fn new(
        id: GenerationId,
        user_id: UserId,
        visibility: GenerationVisibility,
        now: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id,
            style: None,
            visibility,
            status: GenerationStatus::Idle,
            created_at: now,
            updated_at: now,
            entries: Vec::new(),
        }
    }

    /// True when `user` owns this generation.
    pub fn is_owned_by(&self, user: &UserId) -> bool {
        self.user_id.as_uuid() == user.as_uuid()
    }

    /// Number of entries, saturating at `u32::MAX`.
    pub fn entry_count(&self) -> u32 {
        u32::try_from(self.entries.len()).unwrap_or(u32::MAX)
    }

    /// Most recently created entry, if any.
    pub fn latest_entry(&self) -> Option<&GenerationEntry> {
        self.entries.iter().max_by_key(|entry| entry.created_at)
    }

    /// Classify the generation against the configured entry cap.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use avatar_backend::domain::{
    ///     Generation, GenerationId, GenerationPhase, GenerationVisibility, UserId,
    /// };
    ///
    /// let generation = Generation::new(
    ///     GenerationId::generate(),
    ///     UserId::random(),
    ///     GenerationVisibility::Private,
    ///     Utc::now(),
    /// );
    /// assert_eq!(generation.phase(3), GenerationPhase::Fresh);
    /// ```
    pub fn phase(&self, max_entries: u32) -> GenerationPhase {
        if self.status == GenerationStatus::InProgress {
            return GenerationPhase::InProgress;
        }
        let count = self.entry_count();
        if count == 0 {
            GenerationPhase::Fresh
        } else if count >= max_entries {
            GenerationPhase::Finalized
        } else {
            GenerationPhase::Ongoing
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;
    use rstest::{fixture, rstest};

    #[fixture]
    fn generation() -> Generation {
        Generation::new(
            GenerationId::new("gen_1").expect("valid id"),
            UserId::random(),
            GenerationVisibility::Private,
            Utc::now(),
        )
    }

    fn entry(generation: &Generation, offset_secs: i64, prompt: Option<&str>) -> GenerationEntry {
        let at = generation.created_at + Duration::seconds(offset_secs);
        GenerationEntry {
            id: Uuid::new_v4(),
            generation_id: generation.id.clone(),
            prompt: prompt.map(str::to_owned),
            image_url: Url::parse(&format!("https://cdn.example.test/{offset_secs}.webp"))
                .expect("valid url"),
            created_at: at,
            updated_at: at,
        }
    }

    #[rstest]
    #[case::empty("", GenerationIdError::Empty)]
    #[case::slash("a/b", GenerationIdError::InvalidCharacter)]
    #[case::space("a b", GenerationIdError::InvalidCharacter)]
    fn rejects_malformed_ids(#[case] raw: &str, #[case] expected: GenerationIdError) {
        assert_eq!(GenerationId::new(raw), Err(expected));
    }

    #[rstest]
    fn rejects_overlong_ids() {
        let raw = "a".repeat(GENERATION_ID_MAX_LEN + 1);
        assert_eq!(
            GenerationId::new(raw),
            Err(GenerationIdError::TooLong {
                max: GENERATION_ID_MAX_LEN
            })
        );
    }

    #[rstest]
    fn generated_ids_validate() {
        let id = GenerationId::generate();
        assert_eq!(id.as_str().len(), GENERATED_ID_LEN);
        assert_eq!(GenerationId::new(id.as_str()), Ok(id));
    }

    #[rstest]
    #[case(0, GenerationStatus::Idle, GenerationPhase::Fresh)]
    #[case(1, GenerationStatus::Idle, GenerationPhase::Ongoing)]
    #[case(2, GenerationStatus::Idle, GenerationPhase::Ongoing)]
    #[case(3, GenerationStatus::Idle, GenerationPhase::Finalized)]
    #[case(0, GenerationStatus::InProgress, GenerationPhase::InProgress)]
    #[case(3, GenerationStatus::InProgress, GenerationPhase::InProgress)]
    fn phase_follows_entries_and_status(
        mut generation: Generation,
        #[case] entries: i64,
        #[case] status: GenerationStatus,
        #[case] expected: GenerationPhase,
    ) {
        for offset in 0..entries {
            let next = entry(&generation, offset, None);
            generation.entries.push(next);
        }
        generation.status = status;
        assert_eq!(generation.phase(3), expected);
    }

    #[rstest]
    fn latest_entry_uses_creation_time(mut generation: Generation) {
        let newest = entry(&generation, 30, Some("newest"));
        let oldest = entry(&generation, 10, None);
        generation.entries = vec![newest.clone(), oldest];
        assert_eq!(generation.latest_entry(), Some(&newest));
    }

    #[rstest]
    fn ownership_compares_uuid(generation: Generation) {
        let upper = UserId::new(generation.user_id.as_uuid().to_string().to_uppercase())
            .expect("valid uppercase id");
        assert!(generation.is_owned_by(&upper));
        assert!(!generation.is_owned_by(&UserId::random()));
    }

    #[rstest]
    #[case("public", GenerationVisibility::Public)]
    #[case("PRIVATE", GenerationVisibility::Private)]
    fn visibility_parses_case_insensitively(
        #[case] raw: &str,
        #[case] expected: GenerationVisibility,
    ) {
        assert_eq!(raw.parse::<GenerationVisibility>(), Ok(expected));
    }

    #[rstest]
    fn status_round_trips_storage_spelling() {
        for status in [GenerationStatus::Idle, GenerationStatus::InProgress] {
            assert_eq!(status.as_str().parse::<GenerationStatus>(), Ok(status));
        }
        assert!("LOCKED".parse::<GenerationStatus>().is_err());
    }
}
