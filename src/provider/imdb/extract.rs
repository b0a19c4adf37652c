//! Dual-path field extraction and record assembly.
//!
//! Every field has a structured-path accessor and a rendered-path
//! accessor; the structured path wins when present and any single field
//! failing degrades that field to absent, never the whole record.

use super::{
    locator,
    rendered::{self, strip_tags},
    structured::{CreditsConnection, RawCredit, StructuredDoc},
};
use crate::{
    Result,
    types::{CastEntry, MetadataRecord},
};
use async_trait::async_trait;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::{debug, warn};

/// Bound on the comma-joined director string; excess is truncated with a
/// warning, never an error
const MAX_DIRECTOR_LEN: usize = 255;

/// A fetched detail/credits document with its decoded structured block
///
/// When the embedded blob is present and well-formed the accessors
/// prefer it; otherwise they pattern-match the rendered markup.
pub struct Page {
    pub html: String,
    pub structured: Option<StructuredDoc>,
    pub encoding: String,
}

/// Where the cover image comes from, resolved lazily by the caller
/// since two of the variants need another fetch
#[derive(Debug, Clone, PartialEq)]
pub enum CoverSource {
    /// Structured primary-image URL, usable as-is
    Direct(String),
    /// Media-viewer page path holding the full-resolution image
    Viewer(String),
    /// Inline poster URL with its size suffix already rewritten
    Inline(String),
    None,
}

impl Page {
    pub fn new(html: String, encoding: String) -> Self {
        let structured = StructuredDoc::from_html(&html);
        if structured.is_none() {
            debug!("No structured block, using rendered path only");
        }
        Self {
            html,
            structured,
            encoding,
        }
    }

    pub fn is_series(&self) -> bool {
        self.structured
            .as_ref()
            .and_then(StructuredDoc::is_series)
            .unwrap_or_else(|| rendered::is_series(&self.html))
    }

    /// Parent-series identifier; `None` on a series main page, where the
    /// page's own identifier is the series identifier
    pub fn series_id(&self) -> Option<String> {
        self.structured
            .as_ref()
            .and_then(StructuredDoc::series_id)
            .or_else(|| rendered::series_link_id(&self.html))
    }

    /// Title, subtitle and year under the site's formatting conventions
    pub fn title_parts(&self) -> (String, String, Option<i32>) {
        let tag = rendered::title_tag(&self.html);
        let year = self
            .structured
            .as_ref()
            .and_then(StructuredDoc::year)
            .or_else(|| tag.as_ref().and_then(|t| t.year));

        // episodes use the quoted-title convention: series title as the
        // main title, episode title as the subtitle
        if let Some(doc) = &self.structured
            && doc.is_episode()
            && let Some(series_title) = doc.series_title()
        {
            let subtitle = doc.title().unwrap_or_default();
            return (series_title, subtitle, year);
        }

        if let Some(tag) = &tag
            && let Some(subtitle) = &tag.episode_subtitle
        {
            return (tag.raw.clone(), subtitle.clone(), year);
        }

        let raw = self
            .structured
            .as_ref()
            .and_then(StructuredDoc::title)
            .or_else(|| tag.map(|t| t.raw));

        match raw {
            Some(raw) => {
                let (title, subtitle) = split_title(&raw);
                (title, subtitle, year)
            }
            None => (String::new(), String::new(), year),
        }
    }

    /// Complete title string, subtitle still attached
    pub fn full_title(&self) -> Option<String> {
        self.structured
            .as_ref()
            .and_then(StructuredDoc::title)
            .or_else(|| rendered::title_tag(&self.html).map(|tag| tag.raw))
    }

    pub fn year(&self) -> Option<i32> {
        self.structured
            .as_ref()
            .and_then(StructuredDoc::year)
            .or_else(|| rendered::title_tag(&self.html).and_then(|tag| tag.year))
    }

    pub fn runtime_minutes(&self) -> u32 {
        self.structured
            .as_ref()
            .and_then(StructuredDoc::runtime_seconds)
            .map(|seconds| u32::try_from(seconds / 60).unwrap_or(0))
            .unwrap_or_else(|| rendered::runtime_minutes(&self.html))
    }

    pub fn rating(&self) -> Option<f64> {
        self.structured
            .as_ref()
            .and_then(StructuredDoc::rating)
            .or_else(|| rendered::rating(&self.html))
            .filter(|r| (0.0..=10.0).contains(r))
    }

    pub fn genres(&self) -> Vec<String> {
        if let Some(doc) = &self.structured {
            if let Some(genres) = doc.genres_full() {
                return genres;
            }
            // the compact summary block only carries headline genres
            if let Some(mut genres) = doc.genres_summary() {
                genres.truncate(3);
                return genres;
            }
        }

        rendered::genres(&self.html).unwrap_or_default()
    }

    pub fn country(&self) -> Option<String> {
        self.structured
            .as_ref()
            .and_then(StructuredDoc::countries)
            .or_else(|| rendered::countries(&self.html))
            .map(|countries| countries.join(", "))
    }

    pub fn language(&self) -> Option<String> {
        self.structured
            .as_ref()
            .and_then(StructuredDoc::languages)
            .or_else(|| rendered::languages(&self.html))
            .map(|languages| languages.join(", ").to_lowercase())
    }

    pub fn cover_source(&self) -> CoverSource {
        if let Some(url) = self.structured.as_ref().and_then(StructuredDoc::primary_image) {
            return CoverSource::Direct(url);
        }
        if let Some(path) = rendered::cover_viewer_path(&self.html) {
            return CoverSource::Viewer(path);
        }
        if let Some(url) = rendered::inline_poster_url(&self.html) {
            return CoverSource::Inline(url);
        }
        CoverSource::None
    }

    /// Candidate ids from the similar-titles section, page order
    pub fn recommendation_ids(&self) -> Vec<String> {
        self.structured
            .as_ref()
            .and_then(StructuredDoc::recommendation_ids)
            .unwrap_or_else(|| rendered::recommendation_ids(&self.html))
    }

    /// Assemble the base record; cast, cover resolution and series
    /// enrichment are layered on by the caller
    pub fn base_record(&self, warnings: &mut Vec<String>) -> MetadataRecord {
        let (title, subtitle, year) = self.title_parts();
        let doc = self.structured.as_ref();

        let director = doc
            .and_then(|d| d.principal_credits("director"))
            .or_else(|| rendered::directors(&self.html))
            .map(|names| cap_credits(&names.join(", "), warnings));

        MetadataRecord {
            title,
            subtitle,
            original_title: doc
                .and_then(StructuredDoc::original_title)
                .or_else(|| rendered::original_title(&self.html)),
            year,
            is_series: self.is_series(),
            series_id: None,
            runtime_minutes: self.runtime_minutes(),
            content_rating: doc
                .and_then(StructuredDoc::content_rating)
                .or_else(|| rendered::content_rating(&self.html)),
            director,
            writer: doc
                .and_then(|d| d.principal_credits("writer"))
                .map(|names| names.join(", ")),
            creator: doc
                .and_then(|d| d.principal_credits("creator"))
                .map(|names| names.join(", ")),
            rating: self.rating(),
            country: self.country(),
            language: self.language(),
            genres: self.genres(),
            plot: doc
                .and_then(StructuredDoc::plot)
                .or_else(|| rendered::plot(&self.html)),
            cover_url: String::new(),
            cast: Vec::new(),
            encoding: self.encoding.clone(),
        }
    }
}

/// Split a raw title on the first `" - "`, retrying with `": "`, the
/// whole string being the title when neither separator exists
#[must_use]
pub fn split_title(raw: &str) -> (String, String) {
    for separator in [" - ", ": "] {
        if let Some((title, subtitle)) = raw.split_once(separator) {
            return (title.trim().to_string(), subtitle.trim().to_string());
        }
    }
    (raw.trim().to_string(), String::new())
}

fn cap_credits(joined: &str, warnings: &mut Vec<String>) -> String {
    if joined.len() <= MAX_DIRECTOR_LEN {
        return joined.to_string();
    }

    let mut end = MAX_DIRECTOR_LEN;
    while !joined.is_char_boundary(end) {
        end -= 1;
    }

    warn!("Director list truncated to {end} bytes");
    warnings.push(format!("director list truncated to {end} bytes"));
    joined[..end].to_string()
}

/// Normalize a role string for the wire format
///
/// Collapses whitespace, converts HTML space entities, strips markup,
/// maps embedded control characters to a literal apostrophe and keeps
/// the text free of the `::` field separator.
#[must_use]
pub fn normalize_role(raw: &str) -> String {
    let text = raw.replace("&nbsp;", " ");
    let text = strip_tags(&text);
    let text = decode_entities(&text);

    let collapsed = text.split_whitespace().collect::<Vec<_>>().join(" ");

    let cleaned: String = collapsed
        .chars()
        .map(|c| {
            if c.is_control() || ('\u{80}'..='\u{9f}').contains(&c) {
                '\''
            } else {
                c
            }
        })
        .collect();

    // filler left by the upstream in some series cast lists
    let mut cleaned = cleaned.replace("/ ... ", "");

    // a single replace pass leaves "::" behind for longer colon runs
    while cleaned.contains("::") {
        cleaned = cleaned.replace("::", ":");
    }

    cleaned.trim().to_string()
}

static NUMERIC_ENTITY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"&#(x[0-9a-fA-F]+|\d+);").unwrap());

fn decode_entities(text: &str) -> String {
    let text = NUMERIC_ENTITY_RE.replace_all(text, |caps: &regex::Captures| {
        let body = &caps[1];
        let code = if let Some(hex) = body.strip_prefix('x') {
            u32::from_str_radix(hex, 16).ok()
        } else {
            body.parse().ok()
        };

        code.and_then(char::from_u32)
            .map_or_else(|| caps[0].to_string(), String::from)
    });

    text.replace("&quot;", "\"")
        .replace("&apos;", "'")
        .replace("&lt;", "<")
        .replace("&gt;", ">")
        .replace("&amp;", "&")
}

/// Turn a structured credit into a normalized cast entry
#[must_use]
pub fn cast_entry(credit: &RawCredit) -> CastEntry {
    let mut role = credit.characters.join(" / ");

    for attribute in &credit.attributes {
        if role.is_empty() {
            role = format!("({attribute})");
        } else {
            role.push_str(&format!(" ({attribute})"));
        }
    }

    if let Some(total) = credit.episode_total {
        let noun = if total == 1 { "episode" } else { "episodes" };
        role.push_str(&format!(", {total} {noun}"));

        if let Some((start, end)) = credit.year_range {
            match end {
                Some(end) if end != start => role.push_str(&format!(", {start}-{end}")),
                _ => role.push_str(&format!(", {start}")),
            }
        }
    }

    CastEntry {
        actor_name: normalize_role(&credit.name),
        role: normalize_role(&role),
        person_id: locator::prefixed(&credit.person_id),
    }
}

/// One page of the cast listing ready for accumulation
#[derive(Debug, Clone, Default)]
pub struct CreditsPage {
    pub entries: Vec<CastEntry>,
    pub total: Option<u64>,
    pub has_next: bool,
    pub cursor: Option<String>,
}

impl From<CreditsConnection> for CreditsPage {
    fn from(connection: CreditsConnection) -> Self {
        Self {
            entries: connection.credits.iter().map(cast_entry).collect(),
            total: connection.total,
            has_next: connection.has_next,
            cursor: connection.cursor,
        }
    }
}

/// Source of cast pages, one initial page plus cursor-addressed ones
#[async_trait]
pub trait CreditsSource: Sync {
    async fn first_page(&self) -> Result<CreditsPage>;
    async fn page_after(&self, cursor: &str) -> Result<CreditsPage>;
}

enum PagerState {
    Start,
    Cursor(String),
    Done,
}

/// Lazy walk over the cast pages; callers can stop consuming at any
/// point without fetching the remaining pages
pub struct CastPager<'a, S: CreditsSource> {
    source: &'a S,
    state: PagerState,
}

impl<'a, S: CreditsSource> CastPager<'a, S> {
    pub fn new(source: &'a S) -> Self {
        Self {
            source,
            state: PagerState::Start,
        }
    }

    pub async fn next_page(&mut self) -> Option<Result<CreditsPage>> {
        let result = match &self.state {
            PagerState::Start => self.source.first_page().await,
            PagerState::Cursor(cursor) => self.source.page_after(cursor).await,
            PagerState::Done => return None,
        };

        self.state = match &result {
            Ok(page) => match (&page.cursor, page.has_next) {
                (Some(cursor), true) => PagerState::Cursor(cursor.clone()),
                _ => PagerState::Done,
            },
            Err(_) => PagerState::Done,
        };

        Some(result)
    }
}

/// Accumulate cast entries in page order, short-circuiting once `limit`
/// entries have been collected
pub async fn collect_cast<S: CreditsSource>(
    source: &S,
    limit: Option<usize>,
) -> Result<Vec<CastEntry>> {
    let mut pager = CastPager::new(source);
    let mut entries = Vec::new();

    while let Some(page) = pager.next_page().await {
        entries.extend(page?.entries);

        if let Some(limit) = limit
            && entries.len() >= limit
        {
            entries.truncate(limit);
            break;
        }
    }

    Ok(entries)
}

/// Best-effort merge of series-page fields into an episode record
///
/// Fills only the still-missing fields, never overwriting a value the
/// episode page already produced.
pub fn merge_from_series(record: &mut MetadataRecord, series: &MetadataRecord) {
    if record.runtime_minutes == 0 {
        record.runtime_minutes = series.runtime_minutes;
    }
    if record.country.is_none() {
        record.country = series.country.clone();
    }
    if record.language.is_none() {
        record.language = series.language.clone();
    }
    if record.cover_url.is_empty() {
        record.cover_url = series.cover_url.clone();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    #[test]
    fn test_split_title_dash() {
        assert_eq!(
            split_title("Star Wars: Episode I - The Phantom Menace"),
            (
                "Star Wars: Episode I".to_string(),
                "The Phantom Menace".to_string()
            )
        );
    }

    #[test]
    fn test_split_title_colon_fallback() {
        assert_eq!(
            split_title("Smokin' Aces 2: Assassins' Ball"),
            ("Smokin' Aces 2".to_string(), "Assassins' Ball".to_string())
        );
    }

    #[test]
    fn test_split_title_no_separator() {
        assert_eq!(split_title("Cars"), ("Cars".to_string(), String::new()));
    }

    #[test]
    fn test_normalize_role_whitespace_and_markup() {
        assert_eq!(
            normalize_role("  Dr. John\n 'J.D.'&nbsp;<b>Dorian</b>  "),
            "Dr. John 'J.D.' Dorian"
        );
    }

    #[test]
    fn test_normalize_role_control_chars_become_apostrophe() {
        assert_eq!(normalize_role("Liyuan\u{92}s Bodyguard"), "Liyuan's Bodyguard");
    }

    #[test]
    fn test_normalize_role_never_contains_separator() {
        assert_eq!(normalize_role("a::b::c"), "a:b:c");
    }

    #[test]
    fn test_normalize_role_collapses_longer_colon_runs() {
        let role = normalize_role("Narrator::: Voice");
        assert_eq!(role, "Narrator: Voice");
        assert!(!role.contains("::"));

        assert!(!normalize_role("a::::b").contains("::"));
    }

    #[test]
    fn test_normalize_role_strips_series_filler() {
        assert_eq!(normalize_role("Nurse / ... (uncredited)"), "Nurse (uncredited)");
    }

    #[test]
    fn test_normalize_role_numeric_entities() {
        assert_eq!(normalize_role("Padm&#233;"), "Padmé");
        assert_eq!(normalize_role("Q&amp;A"), "Q&A");
    }

    #[test]
    fn test_cast_entry_episode_suffix() {
        let credit = RawCredit {
            person_id: "nm2032293".to_string(),
            name: "Mona Weiss".to_string(),
            characters: vec!["Nurse".to_string()],
            attributes: vec!["uncredited".to_string()],
            episode_total: Some(2),
            year_range: Some((2006, None)),
        };

        let entry = cast_entry(&credit);
        assert_eq!(entry.actor_name, "Mona Weiss");
        assert_eq!(entry.role, "Nurse (uncredited), 2 episodes, 2006");
        assert_eq!(entry.person_id, "imdb:nm2032293");
    }

    #[test]
    fn test_cast_entry_year_range_and_multiple_characters() {
        let credit = RawCredit {
            person_id: "nm0103785".to_string(),
            name: "Zach Braff".to_string(),
            characters: vec![
                "Dr. John 'J.D.' Dorian".to_string(),
                "Mrs. Zeebee".to_string(),
            ],
            attributes: Vec::new(),
            episode_total: Some(182),
            year_range: Some((2001, Some(2010))),
        };

        assert_eq!(
            cast_entry(&credit).role,
            "Dr. John 'J.D.' Dorian / Mrs. Zeebee, 182 episodes, 2001-2010"
        );
    }

    #[test]
    fn test_cap_credits_truncates_with_warning() {
        let long = "x".repeat(300);
        let mut warnings = Vec::new();
        let capped = cap_credits(&long, &mut warnings);

        assert_eq!(capped.len(), 255);
        assert_eq!(warnings.len(), 1);

        let mut none = Vec::new();
        assert_eq!(cap_credits("George Lucas", &mut none), "George Lucas");
        assert!(none.is_empty());
    }

    #[test]
    fn test_merge_from_series_fills_only_missing() {
        let mut episode = MetadataRecord {
            title: "The Inspector Lynley Mysteries".to_string(),
            subtitle: "Playing for the Ashes".to_string(),
            language: Some("english".to_string()),
            ..MetadataRecord::default()
        };

        let series = MetadataRecord {
            title: "The Inspector Lynley Mysteries".to_string(),
            runtime_minutes: 89,
            country: Some("United Kingdom".to_string()),
            language: Some("english, french".to_string()),
            cover_url: "https://img.example/series.jpg".to_string(),
            ..MetadataRecord::default()
        };

        merge_from_series(&mut episode, &series);

        assert_eq!(episode.runtime_minutes, 89);
        assert_eq!(episode.country.as_deref(), Some("United Kingdom"));
        // episode's own values are preserved
        assert_eq!(episode.language.as_deref(), Some("english"));
        assert_eq!(episode.subtitle, "Playing for the Ashes");
        assert_eq!(episode.cover_url, "https://img.example/series.jpg");
    }

    struct FakeSource {
        pages: Vec<CreditsPage>,
        fetches: AtomicUsize,
    }

    impl FakeSource {
        fn new(per_page: &[usize]) -> Self {
            let total = per_page.len();
            let pages = per_page
                .iter()
                .enumerate()
                .map(|(i, &count)| CreditsPage {
                    entries: (0..count)
                        .map(|j| CastEntry {
                            actor_name: format!("Actor {i}-{j}"),
                            role: format!("Role {i}-{j}"),
                            person_id: format!("imdb:nm{i}{j}"),
                        })
                        .collect(),
                    total: None,
                    has_next: i < total - 1,
                    cursor: if i < total - 1 {
                        Some(format!("cursor-{i}"))
                    } else {
                        None
                    },
                })
                .collect();

            Self {
                pages,
                fetches: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl CreditsSource for FakeSource {
        async fn first_page(&self) -> Result<CreditsPage> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            Ok(self.pages[0].clone())
        }

        async fn page_after(&self, cursor: &str) -> Result<CreditsPage> {
            self.fetches.fetch_add(1, Ordering::SeqCst);
            let index: usize = cursor.strip_prefix("cursor-").unwrap().parse().unwrap();
            Ok(self.pages[index + 1].clone())
        }
    }

    #[tokio::test]
    async fn test_pagination_fetches_each_page_once() {
        let source = FakeSource::new(&[50, 50, 20]);
        let cast = collect_cast(&source, None).await.unwrap();

        assert_eq!(source.fetches.load(Ordering::SeqCst), 3);
        assert_eq!(cast.len(), 120);
        // page order is preserved
        assert_eq!(cast[0].actor_name, "Actor 0-0");
        assert_eq!(cast[50].actor_name, "Actor 1-0");
        assert_eq!(cast[119].actor_name, "Actor 2-19");
    }

    #[tokio::test]
    async fn test_pagination_single_page_issues_one_fetch() {
        let source = FakeSource::new(&[18]);
        let cast = collect_cast(&source, None).await.unwrap();

        assert_eq!(source.fetches.load(Ordering::SeqCst), 1);
        assert_eq!(cast.len(), 18);
    }

    #[tokio::test]
    async fn test_pagination_short_circuits_at_limit() {
        let source = FakeSource::new(&[50, 50, 50, 50]);
        let cast = collect_cast(&source, Some(70)).await.unwrap();

        assert_eq!(cast.len(), 70);
        assert_eq!(source.fetches.load(Ordering::SeqCst), 2);
    }
}
