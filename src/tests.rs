//! Engine integration tests against fixture documents

#[cfg(test)]
mod record_tests {
    use crate::provider::imdb::extract::{CoverSource, Page, merge_from_series};
    use serde_json::json;

    fn movie_page_data() -> serde_json::Value {
        json!({
            "props": {
                "pageProps": {
                    "aboveTheFoldData": {
                        "titleText": { "text": "Star Wars: Episode I - The Phantom Menace" },
                        "originalTitleText": { "text": "Star Wars: Episode I - The Phantom Menace" },
                        "titleType": { "isSeries": false, "isEpisode": false },
                        "releaseYear": { "year": 1999 },
                        "runtime": { "seconds": 8160 },
                        "ratingsSummary": { "aggregateRating": 6.5 },
                        "certificate": { "rating": "PG" },
                        "plot": { "plotText": { "plainText": "Two Jedi escape a hostile blockade to find allies." } },
                        "primaryImage": { "url": "https://m.media-amazon.com/images/M/phantom._V1_SX300.jpg" },
                        "genres": { "genres": [
                            { "text": "Action" }, { "text": "Adventure" },
                            { "text": "Fantasy" }, { "text": "Sci-Fi" }
                        ]},
                        "principalCredits": [
                            {
                                "category": { "id": "director" },
                                "credits": [ { "name": { "nameText": { "text": "George Lucas" } } } ]
                            },
                            {
                                "category": { "id": "writer" },
                                "credits": [ { "name": { "nameText": { "text": "George Lucas" } } } ]
                            }
                        ]
                    },
                    "mainColumnData": {
                        "titleGenres": { "genres": [
                            { "genre": { "text": "Action" } }, { "genre": { "text": "Adventure" } },
                            { "genre": { "text": "Fantasy" } }, { "genre": { "text": "Sci-Fi" } }
                        ]},
                        "countriesOfOrigin": { "countries": [ { "text": "United States" } ] },
                        "spokenLanguages": { "spokenLanguages": [
                            { "text": "English" }, { "text": "Sandawe" }
                        ]},
                        "moreLikeThisTitles": { "edges": [
                            { "node": { "id": "tt0121765" } },
                            { "node": { "id": "tt0121766" } }
                        ]}
                    }
                }
            }
        })
    }

    fn page_with_data(data: &serde_json::Value) -> Page {
        let html = format!(
            r#"<html><head><title>Star Wars: Episode I - The Phantom Menace (1999) - IMDb</title></head><body><script id="__NEXT_DATA__" type="application/json">{data}</script></body></html>"#
        );
        Page::new(html, "utf-8".to_string())
    }

    #[test]
    fn test_movie_record_from_structured_data() {
        let page = page_with_data(&movie_page_data());
        let mut warnings = Vec::new();
        let record = page.base_record(&mut warnings);

        assert_eq!(record.title, "Star Wars: Episode I");
        assert_eq!(record.subtitle, "The Phantom Menace");
        // original title matching the rendered one is suppressed
        assert_eq!(record.original_title, None);
        assert_eq!(record.year, Some(1999));
        assert!(!record.is_series);
        assert_eq!(record.runtime_minutes, 136);
        assert_eq!(record.content_rating.as_deref(), Some("PG"));
        assert_eq!(record.director.as_deref(), Some("George Lucas"));
        assert_eq!(record.writer.as_deref(), Some("George Lucas"));
        assert_eq!(record.rating, Some(6.5));
        assert_eq!(record.country.as_deref(), Some("United States"));
        assert_eq!(record.language.as_deref(), Some("english, sandawe"));
        assert_eq!(record.genres, ["Action", "Adventure", "Fantasy", "Sci-Fi"]);
        assert_eq!(
            record.plot.as_deref(),
            Some("Two Jedi escape a hostile blockade to find allies.")
        );
        assert_eq!(record.encoding, "utf-8");
        assert!(warnings.is_empty());
    }

    #[test]
    fn test_movie_cover_and_recommendations() {
        let page = page_with_data(&movie_page_data());

        assert_eq!(
            page.cover_source(),
            CoverSource::Direct(
                "https://m.media-amazon.com/images/M/phantom._V1_SX300.jpg".to_string()
            )
        );
        assert_eq!(page.recommendation_ids(), ["0121765", "0121766"]);
    }

    #[test]
    fn test_standalone_film_record() {
        let data = json!({
            "props": {
                "pageProps": {
                    "aboveTheFoldData": {
                        "titleText": { "text": "Alpha" },
                        "titleType": { "isSeries": false, "isEpisode": false },
                        "releaseYear": { "year": 1999 },
                        "runtime": { "seconds": 8160 },
                        "ratingsSummary": { "aggregateRating": 7.4 }
                    },
                    "mainColumnData": {}
                }
            }
        });
        let html = format!(
            r#"<html><body><script id="__NEXT_DATA__" type="application/json">{data}</script></body></html>"#
        );
        let page = Page::new(html, "utf-8".to_string());

        let mut warnings = Vec::new();
        let record = page.base_record(&mut warnings);

        assert_eq!(record.title, "Alpha");
        assert_eq!(record.subtitle, "");
        assert_eq!(record.year, Some(1999));
        assert_eq!(record.runtime_minutes, 136);
        assert_eq!(record.rating, Some(7.4));
        assert!(!record.is_series);
    }

    #[test]
    fn test_movie_record_from_rendered_markup() {
        let html = concat!(
            r#"<html><head><title>Serpico (1973) - IMDb</title></head><body>"#,
            r#"<li role="presentation" class="ipc-inline-list__item">2h 10m</li>"#,
            r#"<a href="/name/nm0000199/?ref_=tt_cl_dr_1">Sidney Lumet</a>"#,
            r#"<span data-testid="hero-rating-bar__aggregate-rating__score" class="r"><span class="s">7.7</span></span>"#,
            r#"<a href="/search/title/?country_of_origin=US&ref_=tt_dt_cn" class="c">United States</a>"#,
            r#"<a href="/search/title?title_type=feature&primary_language=en&ref_=tt_dt_ln">English</a>"#,
            r#"<a class="chip" href="/search/title?genres=crime&explore=genres"><span class="ipc-chip__text">Crime</span></a>"#,
            r#"<p data-testid="plot" class="x"><span role="presentation" data-testid="plot-xl" class="y">An honest cop blows the whistle.</span></p>"#,
            r#"</body></html>"#,
        );
        let page = Page::new(html.to_string(), "iso-8859-1".to_string());
        let mut warnings = Vec::new();
        let record = page.base_record(&mut warnings);

        assert_eq!(record.title, "Serpico");
        assert_eq!(record.subtitle, "");
        assert_eq!(record.year, Some(1973));
        assert!(!record.is_series);
        assert_eq!(record.runtime_minutes, 130);
        assert_eq!(record.director.as_deref(), Some("Sidney Lumet"));
        assert_eq!(record.rating, Some(7.7));
        assert_eq!(record.country.as_deref(), Some("United States"));
        assert_eq!(record.language.as_deref(), Some("english"));
        assert_eq!(record.genres, ["Crime"]);
        assert_eq!(
            record.plot.as_deref(),
            Some("An honest cop blows the whistle.")
        );
        assert_eq!(record.encoding, "iso-8859-1");
    }

    #[test]
    fn test_episode_record_and_series_backfill() {
        let data = json!({
            "props": {
                "pageProps": {
                    "aboveTheFoldData": {
                        "titleText": { "text": "Playing for the Ashes" },
                        "titleType": { "isSeries": false, "isEpisode": true },
                        "series": { "series": {
                            "id": "tt0362357",
                            "titleText": { "text": "The Inspector Lynley Mysteries" }
                        }},
                        "releaseYear": { "year": 2003 }
                    },
                    "mainColumnData": {}
                }
            }
        });
        let html = format!(
            r#"<html><head><title>&quot;The Inspector Lynley Mysteries&quot; Playing for the Ashes (TV Episode 2003) - IMDb</title><meta property="og:type" content="video.episode"/></head><body><script id="__NEXT_DATA__" type="application/json">{data}</script></body></html>"#
        );
        let page = Page::new(html, "utf-8".to_string());

        assert!(page.is_series());
        assert_eq!(page.series_id().as_deref(), Some("0362357"));

        let mut warnings = Vec::new();
        let mut record = page.base_record(&mut warnings);
        assert_eq!(record.title, "The Inspector Lynley Mysteries");
        assert_eq!(record.subtitle, "Playing for the Ashes");
        assert_eq!(record.year, Some(2003));
        assert_eq!(record.runtime_minutes, 0);

        let series = crate::MetadataRecord {
            title: "The Inspector Lynley Mysteries".to_string(),
            runtime_minutes: 89,
            country: Some("United Kingdom".to_string()),
            language: Some("english".to_string()),
            cover_url: "https://img.example/lynley.jpg".to_string(),
            ..crate::MetadataRecord::default()
        };
        merge_from_series(&mut record, &series);

        assert_eq!(record.runtime_minutes, 89);
        assert_eq!(record.country.as_deref(), Some("United Kingdom"));
        assert_eq!(record.cover_url, "https://img.example/lynley.jpg");
        // episode identity fields are never overwritten
        assert_eq!(record.subtitle, "Playing for the Ashes");
    }
}

#[cfg(test)]
mod credits_tests {
    use crate::provider::imdb::extract::CreditsPage;
    use crate::provider::imdb::structured::StructuredDoc;
    use serde_json::json;

    #[test]
    fn test_cast_wire_from_credits_document() {
        let data = json!({
            "cast": {
                "edges": [
                    { "node": {
                        "name": { "id": "nm0000553", "nameText": { "text": "Liam Neeson" } },
                        "characters": [ { "name": "Qui-Gon Jinn" } ]
                    }},
                    { "node": {
                        "name": { "id": "nm0048652", "nameText": { "text": "Kenny Baker" } },
                        "characters": [ { "name": "R2-D2" } ]
                    }}
                ],
                "total": 2,
                "pageInfo": { "hasNextPage": false, "endCursor": null }
            }
        });

        let connection = StructuredDoc::from_json(&data.to_string())
            .and_then(|doc| doc.cast_connection())
            .unwrap();
        let page = CreditsPage::from(connection);

        assert_eq!(page.total, Some(2));
        assert!(!page.has_next);

        let record = crate::MetadataRecord {
            cast: page.entries,
            ..crate::MetadataRecord::default()
        };
        assert_eq!(
            record.cast_wire(),
            "Liam Neeson::Qui-Gon Jinn::imdb:nm0000553\nKenny Baker::R2-D2::imdb:nm0048652"
        );
    }

    #[test]
    fn test_series_credit_episode_suffix_in_wire() {
        let data = json!({
            "cast": {
                "edges": [
                    { "node": {
                        "name": { "id": "nm2032293", "nameText": { "text": "Mona Weiss" } },
                        "characters": [ { "name": "Nurse" } ],
                        "attributes": [ { "text": "uncredited" } ],
                        "episodeCredits": {
                            "total": 2,
                            "yearRange": { "year": 2006 }
                        }
                    }}
                ],
                "pageInfo": { "hasNextPage": false }
            }
        });

        let connection = StructuredDoc::from_json(&data.to_string())
            .and_then(|doc| doc.cast_connection())
            .unwrap();
        let page = CreditsPage::from(connection);

        assert_eq!(
            page.entries[0].wire_line(),
            "Mona Weiss::Nurse (uncredited), 2 episodes, 2006::imdb:nm2032293"
        );
    }
}

#[cfg(test)]
mod search_tests {
    use crate::provider::imdb::{locator, rendered};

    #[test]
    fn test_listing_rows_map_to_prefixed_results() {
        let html = concat!(
            r#"<ul class="ipc-metadata-list">"#,
            r#"<li class="ipc-metadata-list-summary-item">"#,
            r#"<a class="ipc-metadata-list-summary-item__t" href="/title/tt0104549/?ref_=fn_tt_1">Clerks</a>"#,
            r#"<span class="ipc-metadata-list-summary-item__li">1994</span>"#,
            r#"</li>"#,
            r#"<li class="ipc-metadata-list-summary-item">"#,
            r#"<a class="ipc-metadata-list-summary-item__t" href="/title/tt0424345/?ref_=fn_tt_2">Clerks II</a>"#,
            r#"<span class="ipc-metadata-list-summary-item__li">2006</span>"#,
            r#"</li>"#,
            r#"</ul>"#,
        );

        let rows = rendered::search_rows(html);
        assert_eq!(rows.len(), 2);
        assert_eq!(locator::prefixed(&rows[0].0), "imdb:0104549");
        assert_eq!(rows[0].1, "Clerks");
        assert_eq!(rows[0].2, Some(1994));
        assert_eq!(rows[1].1, "Clerks II");
        assert_eq!(rows[1].2, Some(2006));
    }

    #[test]
    fn test_direct_match_redirect_detected() {
        assert_eq!(
            locator::redirect_target_id("https://www.imdb.com/title/tt0104549/?ref_=fn_al_tt_1"),
            Some("0104549".to_string())
        );
    }
}
