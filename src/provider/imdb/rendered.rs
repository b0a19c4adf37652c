//! Rendered path: pattern-matching accessors over the page markup.
//!
//! Stable fragments (search listings, portraits) go through CSS
//! selectors; the volatile hero/metadata fragments keep raw patterns
//! since their class names churn with every site redesign.

use once_cell::sync::Lazy;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

static OG_TYPE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"<meta property="og:type" content="video\.(episode|tv_show)"\s*/?>"#).unwrap()
});

static TITLE_EPISODE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<title>&quot;(.+?)&quot; (.+?) \(.*?(\d{4})\) - IMDb</title>").unwrap()
});

static TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)<title>(.+?) \([^)]*?(\d{4})[^)]*\) - IMDb</title>").unwrap()
});

static SERIES_LINK_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a [^>]*?data-testid="hero-title-block__series-link" href="/title/tt(\d+)/"#)
        .unwrap()
});

static ORIGINAL_TITLE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?s)>(?:Original title|Originaltitel): (.+?)</").unwrap()
});

static CONTENT_RATING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a [^>]*?href="/title/tt\d+/parentalguide/certificates\?ref_=tt_ov_pg">(.+?)</a>"#)
        .unwrap()
});

static LIST_ITEM_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<li role="presentation" class="ipc-inline-list__item">(.*?)</li>"#).unwrap()
});

static TECH_SPEC_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div class="ipc-metadata-list-item__content-container">(.*?)</div>"#)
        .unwrap()
});

static HOURS_MINUTES_RE: Lazy<Regex> = Lazy::new(|| {
    // two sentence forms: "2 Std. 16 Min." and "2h 16m", minutes optional
    Regex::new(r"(?i)^(\d+)\s*(?:Std\.|h)(?:\s*(\d+)\s*(?:Min\.|m))?$").unwrap()
});

static MINUTES_ONLY_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(?i)^(\d+)\s*(?:Min\.|m)$").unwrap());

static SPLICE_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<!--\s*-->").unwrap());

static DIRECTOR_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?i)ref_=tt_cl_dr_\d+">(.+?)</a>"#).unwrap());

static RATING_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r#"(?s)data-testid="hero-rating-bar__aggregate-rating__score"[^>]*><span[^>]*>(.+?)</span>"#,
    )
    .unwrap()
});

static COUNTRY_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)href="/search/title/\?country_of_origin[^"]*"[^>]*>(.+?)</a>"#).unwrap()
});

static LANGUAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)primary_language[^"]*?ref_=tt_dt_ln">(.+?)</a>"#).unwrap()
});

static GENRE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a class="[^"]+" href="/search/title\?genres=[^"]*"><span class="i[^"]*">(.+?)</span></a>"#)
        .unwrap()
});

static PLOT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<(?:p|div) data-testid="plot"[^>]*>.*?<span role="presentation" data-testid="plot-[^"]*"[^>]*>(.+?)</span><"#)
        .unwrap()
});

static COVER_VIEWER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<a class="ipc-lockup-overlay ipc-focusable" href="(/title/tt\d+/mediaviewer/\??rm[^"]+?)" aria-label="[^"]*?Poster"#)
        .unwrap()
});

static VIEWER_IMAGE_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div style="[^"]*" class="[^"]*"><img src="([^"]+)""#).unwrap()
});

static INLINE_POSTER_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div[^>]*class="poster"[^>]*>.*?<img[^>]*src="([^"]+?\.)_[vV][^"]*""#)
        .unwrap()
});

static RECOMMENDATION_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?is)<a class="ipc-lockup-overlay ipc-focusable" href="/title/tt(\d+)/\?ref_=tt_sims_tt_i_\d+" aria-label="View title page for"#)
        .unwrap()
});

static CAST_TABLE_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r#"(?s)<table class="cast_list">(.*)"#).unwrap());

static CAST_ROW_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<td class="primary_photo">\s*<a href="/name/(nm\d+)/?[^"]*"[^>]*>.+?<a [^>]*>(.+?)</a>.+?<td class="character">(.*?)</td>"#)
        .unwrap()
});

static TITLE_HREF_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^/title/tt(\d+)/").unwrap());

static DISAMBIGUATION_RES: Lazy<Vec<Regex>> = Lazy::new(|| {
    [
        r#"(?is)<b>Popular Names</b>.+?<a\s+href="(.*?)">"#,
        r#"(?is)<b>Names \(Exact Matches\)</b>.+?<a\s+href="(.*?)">"#,
        r#"(?is)<b>Names \(Approx Matches\)</b>.+?<a\s+href="(.*?)">"#,
    ]
    .iter()
    .map(|p| Regex::new(p).unwrap())
    .collect()
});

static ACTOR_PORTRAIT_RE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)<div class="[^"]* ipc-poster--baseAlt [^"]*.*?<img[^>]*src="(https[^"]+?)".*?href="(/name/nm\d+/)"#)
        .unwrap()
});

/// Series/episode landmark in the page metadata
pub fn is_series(html: &str) -> bool {
    OG_TYPE_RE.is_match(html)
}

/// Raw title-tag content
#[derive(Debug, Clone, PartialEq)]
pub struct TitleTag {
    /// Title text, still joined with any subtitle for non-episode pages
    pub raw: String,
    /// Subtitle from the quoted-episode convention, split upstream
    pub episode_subtitle: Option<String>,
    pub year: Option<i32>,
}

pub fn title_tag(html: &str) -> Option<TitleTag> {
    if let Some(caps) = TITLE_EPISODE_RE.captures(html) {
        return Some(TitleTag {
            raw: caps[1].trim().to_string(),
            episode_subtitle: Some(caps[2].trim().to_string()),
            year: caps[3].parse().ok(),
        });
    }

    let caps = TITLE_RE.captures(html)?;
    Some(TitleTag {
        raw: caps[1].trim().to_string(),
        episode_subtitle: None,
        year: caps[2].parse().ok(),
    })
}

/// Parent-series key from the episode hero block
pub fn series_link_id(html: &str) -> Option<String> {
    SERIES_LINK_RE
        .captures(html)
        .map(|caps| caps[1].to_string())
}

pub fn original_title(html: &str) -> Option<String> {
    ORIGINAL_TITLE_RE
        .captures(html)
        .map(|caps| caps[1].trim().to_string())
}

pub fn content_rating(html: &str) -> Option<String> {
    CONTENT_RATING_RE
        .captures(html)
        .map(|caps| caps[1].trim().to_string())
}

/// Runtime in minutes from the rendered phrase forms, 0 when unknown
///
/// Handles hour+minute compound phrases ("2h 16m", "2 Std. 16 Min."),
/// minutes-only phrases, and the technical-specification block that only
/// carries a minutes figure. Inline markup comments spliced between the
/// tokens are stripped before matching.
pub fn runtime_minutes(html: &str) -> u32 {
    let list_items = LIST_ITEM_RE
        .captures_iter(html)
        .map(|caps| caps[1].to_string());

    for item in list_items {
        if let Some(minutes) = runtime_phrase(&item) {
            return minutes;
        }
    }

    // runtime sometimes only appears in the technical spec section
    for caps in TECH_SPEC_RE.captures_iter(html) {
        let text = normalize_phrase(&caps[1]);
        if let Some(caps) = MINUTES_ONLY_RE.captures(&text) {
            return caps[1].parse().unwrap_or(0);
        }
    }

    0
}

fn runtime_phrase(item: &str) -> Option<u32> {
    let text = normalize_phrase(item);

    if let Some(caps) = HOURS_MINUTES_RE.captures(&text) {
        let hours: u32 = caps[1].parse().ok()?;
        let minutes: u32 = caps
            .get(2)
            .map_or(0, |m| m.as_str().parse().unwrap_or(0));
        return Some(hours * 60 + minutes);
    }

    if let Some(caps) = MINUTES_ONLY_RE.captures(&text) {
        return caps[1].parse().ok();
    }

    None
}

fn normalize_phrase(fragment: &str) -> String {
    let spliced = SPLICE_RE.replace_all(fragment, " ");
    spliced.split_whitespace().collect::<Vec<_>>().join(" ")
}

pub fn directors(html: &str) -> Option<Vec<String>> {
    collect_matches(&DIRECTOR_RE, html)
}

pub fn rating(html: &str) -> Option<f64> {
    RATING_RE
        .captures(html)?
        .get(1)?
        .as_str()
        .trim()
        .replace(',', ".")
        .parse()
        .ok()
}

pub fn countries(html: &str) -> Option<Vec<String>> {
    collect_matches(&COUNTRY_RE, html)
}

pub fn languages(html: &str) -> Option<Vec<String>> {
    collect_matches(&LANGUAGE_RE, html)
}

pub fn genres(html: &str) -> Option<Vec<String>> {
    collect_matches(&GENRE_RE, html)
}

pub fn plot(html: &str) -> Option<String> {
    PLOT_RE
        .captures(html)
        .map(|caps| caps[1].trim().to_string())
}

/// Anchor to the media-viewer page holding the full-resolution poster
pub fn cover_viewer_path(html: &str) -> Option<String> {
    COVER_VIEWER_RE
        .captures(html)
        .map(|caps| caps[1].to_string())
}

/// Full-resolution image URL inside a media-viewer page
pub fn viewer_image_url(html: &str) -> Option<String> {
    VIEWER_IMAGE_RE
        .captures(html)
        .map(|caps| full_size_cover(&caps[1]))
}

/// Smaller inline poster with its size suffix rewritten
pub fn inline_poster_url(html: &str) -> Option<String> {
    INLINE_POSTER_RE
        .captures(html)
        .map(|caps| format!("{}_V1_SY600_CR0,0,600_AL_.jpg", &caps[1]))
}

/// Rewrite any size-suffix token to the fixed large-size variant
#[must_use]
pub fn full_size_cover(url: &str) -> String {
    if let Some(pos) = url.find("._V1_") {
        format!("{}._V1_UY800_.jpg", &url[..pos])
    } else if let Some(base) = url.strip_suffix(".jpg") {
        format!("{base}.UY800_.jpg")
    } else {
        url.to_string()
    }
}

/// Candidate ids from the similar-titles overlay anchors, page order
pub fn recommendation_ids(html: &str) -> Vec<String> {
    RECOMMENDATION_RE
        .captures_iter(html)
        .map(|caps| caps[1].to_string())
        .collect()
}

/// Cast rows from the credits table: (person id, name, raw role markup)
pub fn cast_rows(html: &str) -> Vec<(String, String, String)> {
    let Some(table) = CAST_TABLE_RE.captures(html) else {
        return Vec::new();
    };

    // cut at the closing tag by hand; the table is large enough to make
    // a lazy .*?</table> match unreliable
    let table = &table[1];
    let table = table
        .find("</table")
        .map_or(table, |end| &table[..end]);

    CAST_ROW_RE
        .captures_iter(table)
        .map(|caps| {
            (
                caps[1].to_string(),
                strip_tags(&caps[2]).trim().to_string(),
                caps[3].to_string(),
            )
        })
        .collect()
}

/// Rows of a search results listing, in page order
///
/// Malformed rows (no parsable title link) are skipped, not fatal.
pub fn search_rows(html: &str) -> Vec<(String, String, Option<i32>)> {
    let document = Html::parse_document(html);
    let anchor_sel = Selector::parse("a.ipc-metadata-list-summary-item__t").unwrap();
    let year_sel = Selector::parse("span.ipc-metadata-list-summary-item__li").unwrap();

    document
        .select(&anchor_sel)
        .filter_map(|anchor| {
            let href = anchor.value().attr("href")?;
            let id = TITLE_HREF_RE.captures(href)?[1].to_string();

            let title = anchor.text().collect::<String>().trim().to_string();
            if title.is_empty() {
                return None;
            }

            let year = anchor
                .ancestors()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "li")
                .and_then(|item| {
                    item.select(&year_sel)
                        .filter_map(|span| {
                            span.text().collect::<String>().trim().parse::<i32>().ok()
                        })
                        .next()
                });

            Some((id, title, year))
        })
        .collect()
}

/// First link of a person-disambiguation page, when this is one
pub fn disambiguation_link(html: &str) -> Option<String> {
    DISAMBIGUATION_RES
        .iter()
        .find_map(|re| re.captures(html))
        .map(|caps| caps[1].to_string())
}

/// Canonical person path and portrait URL from a person page
pub fn actor_portrait(html: &str) -> Option<(String, String)> {
    ACTOR_PORTRAIT_RE
        .captures(html)
        .map(|caps| (caps[2].to_string(), caps[1].to_string()))
}

pub fn strip_tags(html: &str) -> String {
    static TAG_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"<[^>]*>").unwrap());
    TAG_RE.replace_all(html, "").into_owned()
}

fn collect_matches(re: &Regex, html: &str) -> Option<Vec<String>> {
    let matches: Vec<String> = re
        .captures_iter(html)
        .map(|caps| strip_tags(&caps[1]).trim().to_string())
        .filter(|text| !text.is_empty())
        .collect();

    if matches.is_empty() { None } else { Some(matches) }
}
