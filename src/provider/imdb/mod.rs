//! IMDb metadata provider.
//!
//! Orchestrates the detail, credits, cover and person fetches; the field
//! extraction itself lives in [`extract`] with its structured/rendered
//! split.

pub(crate) mod extract;
pub(crate) mod locator;
pub(crate) mod rendered;
pub(crate) mod structured;

use self::extract::{CoverSource, CreditsPage, CreditsSource, Page, collect_cast};
use self::structured::StructuredDoc;
use crate::{
    Error, Result,
    config::EngineConfig,
    fetch::{FetchOptions, HttpClient},
    provider::{Capability, Provider, RecommendationFilter},
    types::{ActorProfile, CastEntry, DetailOutcome, MetadataRecord, Recommendation, SearchResult},
};
use async_trait::async_trait;
use futures::{StreamExt, stream};
use std::collections::HashSet;
use tracing::{debug, warn};

pub struct ImdbProvider {
    http: HttpClient,
    max_concurrency: usize,
}

impl ImdbProvider {
    pub fn new(config: EngineConfig) -> Result<Self> {
        let max_concurrency = config.max_concurrency.max(1);
        Ok(Self {
            http: HttpClient::new(config)?,
            max_concurrency,
        })
    }

    async fn fetch_page(&self, url: &str) -> Result<Page> {
        let response = self.http.fetch(url, &FetchOptions::cached()).await?;
        Ok(Page::new(response.data, response.encoding))
    }

    /// Resolve the cover source to a concrete full-size URL; an empty
    /// string means no cover, with the reason in `warnings`
    async fn resolve_cover(&self, source: CoverSource, warnings: &mut Vec<String>) -> String {
        match source {
            CoverSource::Direct(url) => rendered::full_size_cover(&url),
            CoverSource::Inline(url) => url,
            CoverSource::Viewer(path) => {
                let url = locator::absolute(&path);
                match self.http.fetch(&url, &FetchOptions::cached()).await {
                    Ok(response) => {
                        rendered::viewer_image_url(&response.data).unwrap_or_else(|| {
                            warnings.push("media viewer page had no full-size image".to_string());
                            String::new()
                        })
                    }
                    Err(e) => {
                        warn!("Cover viewer fetch failed: {e}");
                        warnings.push(format!("cover lookup failed: {e}"));
                        String::new()
                    }
                }
            }
            CoverSource::None => String::new(),
        }
    }

    /// Base record plus cover for a series main page, used to backfill an
    /// episode record
    async fn series_record(&self, series_id: &str) -> Result<MetadataRecord> {
        let page = self.fetch_page(&locator::detail_url(series_id)).await?;

        let mut scratch = Vec::new();
        let mut record = page.base_record(&mut scratch);
        record.cover_url = self.resolve_cover(page.cover_source(), &mut scratch).await;

        Ok(record)
    }

    async fn fetch_cast(
        &self,
        id: &str,
        detail_encoding: &str,
        warnings: &mut Vec<String>,
    ) -> Vec<CastEntry> {
        let source = HttpCreditsSource {
            http: &self.http,
            id: id.to_string(),
            detail_encoding: detail_encoding.to_string(),
        };

        match collect_cast(&source, None).await {
            Ok(cast) => cast,
            Err(e) => {
                warn!("Credits fetch failed: {e}");
                warnings.push(format!("cast lookup failed: {e}"));
                Vec::new()
            }
        }
    }

    /// Resolve one similar-title candidate; unreachable candidates are
    /// dropped from the listing, not fatal
    async fn recommendation_candidate(&self, id: String) -> Option<Recommendation> {
        match self.fetch_page(&locator::detail_url(&id)).await {
            Ok(page) => Some(Recommendation {
                id: locator::prefixed(&id),
                title: page.full_title().unwrap_or_default(),
                year: page.year(),
                rating: page.rating(),
            }),
            Err(e) => {
                debug!("Skipping recommendation candidate {id}: {e}");
                None
            }
        }
    }
}

#[async_trait]
impl Provider for ImdbProvider {
    fn id(&self) -> &'static str {
        "imdb"
    }

    fn name(&self) -> &'static str {
        "IMDb"
    }

    fn capabilities(&self) -> &[Capability] {
        &[Capability::Movie, Capability::Image]
    }

    async fn search(&self, query: &str, alternate_titles: bool) -> Result<Vec<SearchResult>> {
        let url = locator::search_url(query, alternate_titles);
        let response = self.http.fetch(&url, &FetchOptions::cached()).await?;

        // a single unambiguous match redirects straight to the title page
        if let Some(id) = locator::redirect_target_id(&response.source_url) {
            debug!("Direct match tt{id} for query {query:?}");
            let page = Page::new(response.data, response.encoding);
            let (title, subtitle, year) = page.title_parts();
            return Ok(vec![SearchResult {
                id: locator::prefixed(&id),
                title,
                subtitle: (!subtitle.is_empty()).then_some(subtitle),
                year,
            }]);
        }

        Ok(rendered::search_rows(&response.data)
            .into_iter()
            .map(|(id, title, year)| SearchResult {
                id: locator::prefixed(&id),
                title,
                subtitle: None,
                year,
            })
            .collect())
    }

    async fn fetch_detail(&self, id: &str) -> Result<DetailOutcome> {
        let id = locator::normalize_id(id).to_string();
        let page = self.fetch_page(&locator::detail_url(&id)).await?;

        let mut warnings = Vec::new();
        let mut record = page.base_record(&mut warnings);
        if record.title.is_empty() {
            return Err(Error::NotFound(format!("no title data for tt{id}")));
        }

        record.cover_url = self.resolve_cover(page.cover_source(), &mut warnings).await;

        if record.is_series {
            let series_id = page.series_id().unwrap_or_else(|| id.clone());

            // an episode page inherits still-missing fields from its series
            if series_id != id {
                match self.series_record(&series_id).await {
                    Ok(series) => extract::merge_from_series(&mut record, &series),
                    Err(e) => {
                        warn!("Series page fetch failed: {e}");
                        warnings.push(format!("series lookup failed: {e}"));
                    }
                }
            }

            record.series_id = Some(series_id);
        }

        record.cast = self.fetch_cast(&id, &record.encoding, &mut warnings).await;

        Ok(DetailOutcome { record, warnings })
    }

    async fn recommendations(
        &self,
        id: &str,
        filter: &RecommendationFilter,
    ) -> Result<Vec<Recommendation>> {
        let page = self.fetch_page(&locator::detail_url(id)).await?;
        let ids = page.recommendation_ids();

        // bounded concurrency, listing order preserved
        let candidates: Vec<Option<Recommendation>> = stream::iter(ids)
            .map(|candidate| self.recommendation_candidate(candidate))
            .buffered(self.max_concurrency)
            .collect()
            .await;

        let mut seen = HashSet::new();
        Ok(candidates
            .into_iter()
            .flatten()
            .filter(|candidate| passes_filter(candidate, filter))
            .filter(|candidate| !filter.dedup || seen.insert(candidate.id.clone()))
            .collect())
    }

    async fn resolve_actor(
        &self,
        name: Option<&str>,
        id: Option<&str>,
    ) -> Result<Option<ActorProfile>> {
        let url = locator::actor_url(name, id);
        let mut html = self.http.fetch(&url, &FetchOptions::cached()).await?.data;

        if let Some(link) = rendered::disambiguation_link(&html) {
            let target = locator::absolute(&link);
            debug!("Disambiguation page, following {target}");
            html = self.http.fetch(&target, &FetchOptions::cached()).await?.data;
        }

        Ok(rendered::actor_portrait(&html).map(|(path, portrait)| ActorProfile {
            profile_path: path,
            portrait_url: rendered::full_size_cover(&portrait),
        }))
    }
}

/// A candidate with a missing value fails any threshold set on it
fn passes_filter(candidate: &Recommendation, filter: &RecommendationFilter) -> bool {
    if let Some(min) = filter.min_rating
        && candidate.rating.is_none_or(|rating| rating < min)
    {
        return false;
    }

    if let Some(min) = filter.min_year
        && candidate.year.is_none_or(|year| year < min)
    {
        return false;
    }

    true
}

/// Cast pages served over HTTP: the full credits page first, then
/// cursor-addressed continuations
struct HttpCreditsSource<'a> {
    http: &'a HttpClient,
    id: String,
    detail_encoding: String,
}

impl HttpCreditsSource<'_> {
    fn parse(&self, data: &str) -> Option<CreditsPage> {
        StructuredDoc::from_html(data)
            .or_else(|| StructuredDoc::from_json(data))
            .and_then(|doc| doc.cast_connection())
            .map(CreditsPage::from)
    }
}

#[async_trait]
impl CreditsSource for HttpCreditsSource<'_> {
    async fn first_page(&self) -> Result<CreditsPage> {
        let url = locator::credits_url(&self.id);
        let response = self.http.fetch(&url, &FetchOptions::cached()).await?;

        if response.encoding != self.detail_encoding {
            debug!(
                "Credits page encoding {} differs from detail page {}",
                response.encoding, self.detail_encoding
            );
        }

        if let Some(page) = self.parse(&response.data) {
            return Ok(page);
        }

        // legacy rendered credits table, always a single page
        let entries = rendered::cast_rows(&response.data)
            .into_iter()
            .map(|(person_id, name, role)| CastEntry {
                actor_name: extract::normalize_role(&name),
                role: extract::normalize_role(&role),
                person_id: locator::prefixed(&person_id),
            })
            .collect();

        Ok(CreditsPage {
            entries,
            ..CreditsPage::default()
        })
    }

    async fn page_after(&self, cursor: &str) -> Result<CreditsPage> {
        let url = locator::credits_page_url(&self.id, cursor);
        let response = self.http.fetch(&url, &FetchOptions::cached()).await?;

        self.parse(&response.data)
            .ok_or_else(|| Error::Parse(format!("credits page after {cursor} has no cast data")))
    }
}
