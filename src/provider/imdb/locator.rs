//! Canonical URL construction for the upstream site.
//!
//! Identifiers are provider-prefixed opaque tokens (`imdb:0120915`); this
//! is the only module that looks inside them.

use url::Url;

pub const SERVER: &str = "https://www.imdb.com";
pub const ID_PREFIX: &str = "imdb:";

/// Strip the provider prefix (and any site-native `tt`/`nm` key prefix
/// already present is left alone for person ids)
#[must_use]
pub fn normalize_id(id: &str) -> &str {
    let id = id.strip_prefix(ID_PREFIX).unwrap_or(id);
    id.strip_prefix("tt").unwrap_or(id)
}

/// Re-attach the provider prefix
#[must_use]
pub fn prefixed(id: &str) -> String {
    format!("{ID_PREFIX}{id}")
}

#[must_use]
pub fn search_url(query: &str, alternate_titles: bool) -> String {
    let mut url = format!("{SERVER}/find?s=tt&q={}", urlencoding::encode(query));
    if alternate_titles {
        url.push_str("&s=tt&site=aka");
    }
    url
}

/// Detail page; the trailing slash avoids an upstream redirect
#[must_use]
pub fn detail_url(id: &str) -> String {
    format!("{SERVER}/title/tt{}/", normalize_id(id))
}

#[must_use]
pub fn credits_url(id: &str) -> String {
    format!("{SERVER}/title/tt{}/fullcredits", normalize_id(id))
}

/// Subsequent credits page addressed by the cursor from the previous one
#[must_use]
pub fn credits_page_url(id: &str, cursor: &str) -> String {
    format!(
        "{SERVER}/title/tt{}/fullcredits?after={}",
        normalize_id(id),
        urlencoding::encode(cursor)
    )
}

/// Person page by id when known, name search otherwise
#[must_use]
pub fn actor_url(name: Option<&str>, id: Option<&str>) -> String {
    match id {
        Some(id) => format!("{SERVER}/name/{}/", urlencoding::encode(id)),
        None => format!(
            "{SERVER}/find/?s=nm&q={}",
            urlencoding::encode(name.unwrap_or_default())
        ),
    }
}

/// Normalize a possibly relative link to an absolute URL on the site
#[must_use]
pub fn absolute(link: &str) -> String {
    if link.starts_with("http") {
        return link.to_string();
    }

    Url::parse(SERVER)
        .and_then(|base| base.join(link))
        .map(String::from)
        .unwrap_or_else(|_| format!("{SERVER}{link}"))
}

/// Direct-match redirect to a single title page, if this is one
#[must_use]
pub fn redirect_target_id(final_url: &str) -> Option<String> {
    let path = Url::parse(final_url).ok()?;
    if path.host_str()? != Url::parse(SERVER).ok()?.host_str()? {
        return None;
    }

    let mut segments = path.path_segments()?;
    if segments.next()? != "title" {
        return None;
    }

    let key = segments.next()?;
    let digits = key.strip_prefix("tt")?;
    if digits.is_empty() || !digits.chars().all(|c| c.is_ascii_digit()) {
        return None;
    }

    Some(digits.to_string())
}
