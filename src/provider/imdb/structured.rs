//! Structured path: accessors over the machine-readable page-data blob
//! embedded in the rendered document.
//!
//! The blob carries a compact above-the-fold summary plus a fuller main
//! column section; accessors return `None` for anything missing so the
//! caller can fall back to the rendered markup.

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;
use tracing::debug;

static PAGE_DATA_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<script[^>]+id="__NEXT_DATA__"[^>]*>(.*?)</script>"#).unwrap()
});

/// Parsed embedded page-data document
#[derive(Debug, Clone)]
pub struct StructuredDoc {
    root: Value,
}

/// Raw cast credit before role normalization
#[derive(Debug, Clone)]
pub struct RawCredit {
    pub person_id: String,
    pub name: String,
    pub characters: Vec<String>,
    pub attributes: Vec<String>,
    pub episode_total: Option<u64>,
    pub year_range: Option<(i64, Option<i64>)>,
}

/// One page of the cast listing with its pagination state
#[derive(Debug, Clone, Default)]
pub struct CreditsConnection {
    pub credits: Vec<RawCredit>,
    pub total: Option<u64>,
    pub has_next: bool,
    pub cursor: Option<String>,
}

impl StructuredDoc {
    /// Locate and decode the embedded blob; decode failures log and
    /// yield `None` so extraction falls back to the rendered path
    pub fn from_html(html: &str) -> Option<Self> {
        let raw = PAGE_DATA_RE.captures(html)?.get(1)?.as_str();
        match serde_json::from_str::<Value>(raw) {
            Ok(root) => Some(Self { root }),
            Err(e) => {
                debug!("Structured block decode failed, falling back: {e}");
                None
            }
        }
    }

    /// Parse a standalone JSON document (paginated credits responses)
    pub fn from_json(data: &str) -> Option<Self> {
        match serde_json::from_str::<Value>(data) {
            Ok(root) => Some(Self { root }),
            Err(e) => {
                debug!("Credits page decode failed: {e}");
                None
            }
        }
    }

    #[cfg(test)]
    pub fn from_value(root: Value) -> Self {
        Self { root }
    }

    fn above(&self) -> Option<&Value> {
        self.root.pointer("/props/pageProps/aboveTheFoldData")
    }

    fn main(&self) -> Option<&Value> {
        self.root.pointer("/props/pageProps/mainColumnData")
    }

    pub fn title(&self) -> Option<String> {
        non_empty(self.above()?.pointer("/titleText/text")?.as_str())
    }

    /// Original title, only when it differs from the rendered one
    pub fn original_title(&self) -> Option<String> {
        let original = non_empty(self.above()?.pointer("/originalTitleText/text")?.as_str())?;
        match self.title() {
            Some(title) if title == original => None,
            _ => Some(original),
        }
    }

    pub fn is_series(&self) -> Option<bool> {
        let kind = self.above()?.pointer("/titleType")?;
        let series = kind.pointer("/isSeries").and_then(Value::as_bool);
        let episode = kind.pointer("/isEpisode").and_then(Value::as_bool);
        match (series, episode) {
            (None, None) => None,
            _ => Some(series.unwrap_or(false) || episode.unwrap_or(false)),
        }
    }

    pub fn is_episode(&self) -> bool {
        self.above()
            .and_then(|a| a.pointer("/titleType/isEpisode"))
            .and_then(Value::as_bool)
            .unwrap_or(false)
    }

    /// Title of the parent series, for episode title formatting
    pub fn series_title(&self) -> Option<String> {
        non_empty(
            self.above()?
                .pointer("/series/series/titleText/text")?
                .as_str(),
        )
    }

    /// Parent series key for episodes, without the site-native prefix
    pub fn series_id(&self) -> Option<String> {
        let id = self.above()?.pointer("/series/series/id")?.as_str()?;
        Some(id.strip_prefix("tt").unwrap_or(id).to_string())
    }

    pub fn year(&self) -> Option<i32> {
        let year = self.above()?.pointer("/releaseYear/year")?.as_i64()?;
        i32::try_from(year).ok()
    }

    pub fn runtime_seconds(&self) -> Option<u64> {
        self.above()?.pointer("/runtime/seconds")?.as_u64()
    }

    pub fn rating(&self) -> Option<f64> {
        self.above()?
            .pointer("/ratingsSummary/aggregateRating")?
            .as_f64()
    }

    pub fn content_rating(&self) -> Option<String> {
        non_empty(self.above()?.pointer("/certificate/rating")?.as_str())
    }

    pub fn plot(&self) -> Option<String> {
        non_empty(self.above()?.pointer("/plot/plotText/plainText")?.as_str())
    }

    pub fn primary_image(&self) -> Option<String> {
        non_empty(self.above()?.pointer("/primaryImage/url")?.as_str())
    }

    /// Genres from the compact summary block; the caller caps these
    pub fn genres_summary(&self) -> Option<Vec<String>> {
        let genres = self.above()?.pointer("/genres/genres")?.as_array()?;
        collect_texts(genres, "/text")
    }

    /// Full genre listing from the main column, uncapped
    pub fn genres_full(&self) -> Option<Vec<String>> {
        let genres = self.main()?.pointer("/titleGenres/genres")?.as_array()?;
        collect_texts(genres, "/genre/text")
    }

    pub fn countries(&self) -> Option<Vec<String>> {
        let countries = self
            .main()?
            .pointer("/countriesOfOrigin/countries")?
            .as_array()?;
        collect_texts(countries, "/text")
    }

    pub fn languages(&self) -> Option<Vec<String>> {
        let languages = self
            .main()?
            .pointer("/spokenLanguages/spokenLanguages")?
            .as_array()?;
        collect_texts(languages, "/text")
    }

    /// Names from a dedicated credits category ("director", "writer",
    /// "creator")
    pub fn principal_credits(&self, category: &str) -> Option<Vec<String>> {
        let groups = self.above()?.pointer("/principalCredits")?.as_array()?;
        let group = groups.iter().find(|g| {
            g.pointer("/category/id").and_then(Value::as_str) == Some(category)
        })?;

        let names: Vec<String> = group
            .pointer("/credits")?
            .as_array()?
            .iter()
            .filter_map(|c| c.pointer("/name/nameText/text")?.as_str())
            .map(str::to_string)
            .collect();

        if names.is_empty() { None } else { Some(names) }
    }

    /// Candidate identifiers from the similar-titles section, page order
    pub fn recommendation_ids(&self) -> Option<Vec<String>> {
        let edges = self
            .main()?
            .pointer("/moreLikeThisTitles/edges")?
            .as_array()?;

        let ids: Vec<String> = edges
            .iter()
            .filter_map(|e| e.pointer("/node/id")?.as_str())
            .map(|id| id.strip_prefix("tt").unwrap_or(id).to_string())
            .collect();

        if ids.is_empty() { None } else { Some(ids) }
    }

    /// Cast connection embedded in a credits page
    pub fn cast_connection(&self) -> Option<CreditsConnection> {
        let cast = self
            .main()
            .and_then(|m| m.pointer("/cast"))
            .or_else(|| self.root.pointer("/cast"))?;
        parse_cast_connection(cast)
    }
}

fn parse_cast_connection(cast: &Value) -> Option<CreditsConnection> {
    let edges = cast.pointer("/edges")?.as_array()?;

    let credits = edges
        .iter()
        .filter_map(|edge| {
            let node = edge.pointer("/node")?;
            let person_id = node.pointer("/name/id")?.as_str()?.to_string();
            let name = node.pointer("/name/nameText/text")?.as_str()?.to_string();

            let characters = node
                .pointer("/characters")
                .and_then(Value::as_array)
                .map(|chars| {
                    chars
                        .iter()
                        .filter_map(|c| c.pointer("/name").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            let attributes = node
                .pointer("/attributes")
                .and_then(Value::as_array)
                .map(|attrs| {
                    attrs
                        .iter()
                        .filter_map(|a| a.pointer("/text").and_then(Value::as_str))
                        .map(str::to_string)
                        .collect()
                })
                .unwrap_or_default();

            let episode_total = node.pointer("/episodeCredits/total").and_then(Value::as_u64);
            let year_range = node
                .pointer("/episodeCredits/yearRange/year")
                .and_then(Value::as_i64)
                .map(|start| {
                    let end = node
                        .pointer("/episodeCredits/yearRange/endYear")
                        .and_then(Value::as_i64);
                    (start, end)
                });

            Some(RawCredit {
                person_id,
                name,
                characters,
                attributes,
                episode_total,
                year_range,
            })
        })
        .collect();

    let page_info = cast.pointer("/pageInfo");
    let has_next = page_info
        .and_then(|p| p.pointer("/hasNextPage"))
        .and_then(Value::as_bool)
        .unwrap_or(false);
    let cursor = page_info
        .and_then(|p| p.pointer("/endCursor"))
        .and_then(Value::as_str)
        .map(str::to_string);

    Some(CreditsConnection {
        credits,
        total: cast.pointer("/total").and_then(Value::as_u64),
        has_next,
        cursor,
    })
}

fn non_empty(text: Option<&str>) -> Option<String> {
    match text {
        Some(t) if !t.trim().is_empty() => Some(t.trim().to_string()),
        _ => None,
    }
}

fn collect_texts(items: &[Value], pointer: &str) -> Option<Vec<String>> {
    let texts: Vec<String> = items
        .iter()
        .filter_map(|item| item.pointer(pointer)?.as_str())
        .map(str::to_string)
        .collect();

    if texts.is_empty() { None } else { Some(texts) }
}
