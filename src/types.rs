use serde::{Deserialize, Serialize};

/// Normalized metadata record, the engine's primary output
///
/// Constructed fresh per extraction call and never mutated after being
/// handed to a collaborator. Absent fields stay empty/`None`/zero; a
/// failed field extraction degrades that field, never the record.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MetadataRecord {
    /// Primary title; required whenever a record is returned
    pub title: String,
    /// Subtitle split off the title, empty when the title has none
    pub subtitle: String,
    /// Original/native title when the page renders a localized one
    pub original_title: Option<String>,
    /// Four-digit release year
    pub year: Option<i32>,
    /// Series or episode of a series
    pub is_series: bool,
    /// Identifier of the parent series; only meaningful when `is_series`
    pub series_id: Option<String>,
    /// Runtime in minutes, 0 means unknown
    pub runtime_minutes: u32,
    /// Free-text classification string, locale-dependent
    pub content_rating: Option<String>,
    /// Comma-joined director names, capped to a bounded length
    pub director: Option<String>,
    /// Comma-joined writer names
    pub writer: Option<String>,
    /// Comma-joined creator names (series pages credit creators instead)
    pub creator: Option<String>,
    /// Aggregate rating on a 0.0-10.0 scale
    pub rating: Option<f64>,
    /// Comma-joined countries of origin
    pub country: Option<String>,
    /// Comma-joined languages, lower-cased
    pub language: Option<String>,
    /// Genres in site presentation order
    pub genres: Vec<String>,
    /// Plot text; absent for some episodes
    pub plot: Option<String>,
    /// Full-resolution cover image URL, empty when the page has none
    pub cover_url: String,
    /// Credited cast in on-page order; duplicates allowed
    pub cast: Vec<CastEntry>,
    /// Character-encoding label of the source document
    pub encoding: String,
}

impl MetadataRecord {
    /// Wire representation of the cast list, one `name::role::id` line
    /// per entry in on-page order
    #[must_use]
    pub fn cast_wire(&self) -> String {
        self.cast
            .iter()
            .map(CastEntry::wire_line)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

/// One credited person/role pairing for a work
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastEntry {
    pub actor_name: String,
    /// Role text, whitespace-normalized and stripped of markup; the
    /// extractor guarantees it never contains a literal `::`
    pub role: String,
    /// Provider-prefixed person identifier
    pub person_id: String,
}

impl CastEntry {
    #[must_use]
    pub fn wire_line(&self) -> String {
        format!("{}::{}::{}", self.actor_name, self.role, self.person_id)
    }
}

/// One row of a search listing, in page order
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// Provider-prefixed identifier
    pub id: String,
    pub title: String,
    pub subtitle: Option<String>,
    pub year: Option<i32>,
}

/// One recommended title that passed the rating/year filters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Recommendation {
    pub id: String,
    pub title: String,
    pub year: Option<i32>,
    pub rating: Option<f64>,
}

/// Canonical page and portrait for a resolved person
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActorProfile {
    /// Canonical person path on the provider, e.g. `/name/nm0000638/`
    pub profile_path: String,
    pub portrait_url: String,
}

/// A detail extraction together with its accumulated degradations
///
/// Secondary fetch failures and per-field fallbacks land in `warnings`;
/// only the initial page fetch failing aborts the whole request.
#[derive(Debug, Clone)]
pub struct DetailOutcome {
    pub record: MetadataRecord,
    pub warnings: Vec<String>,
}
