//! HTML parsing of last.fm pages.

use super::AlbumPage;
use crate::stats::RawAlbumEntry;
use lazy_static::lazy_static;
use regex::Regex;
use scraper::{ElementRef, Html, Selector};

lazy_static! {
    static ref CHART_ROW: Selector = Selector::parse("tr").expect("valid selector");
    static ref CHART_NAME: Selector =
        Selector::parse("td.chartlist-name a").expect("valid selector");
    static ref CHART_ARTIST: Selector =
        Selector::parse("td.chartlist-artist a").expect("valid selector");
    static ref CHART_COUNT: Selector =
        Selector::parse("span.chartlist-count-bar-value").expect("valid selector");
    static ref CHART_INDEX: Selector = Selector::parse("td.chartlist-index").expect("valid selector");
    static ref METADATA_HEADING: Selector =
        Selector::parse("dt.catalogue-metadata-heading").expect("valid selector");
    static ref COVER_IMAGE: Selector = Selector::parse("a.cover-art img").expect("valid selector");
    static ref TRACK_COUNT: Regex = Regex::new(r"^\s*(\d+)\s+tracks?").expect("valid regex");
    static ref SCROBBLING_SINCE: Regex =
        Regex::new(r"scrobbling since \d{1,2} \w+ (\d{4})").expect("valid regex");
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .collect::<String>()
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
}

/// Chart rows of a library albums page, keeping ranks up to `max_items`.
/// Rows missing any of the four cells are skipped.
pub fn parse_library_chart(html: &str, max_items: usize) -> Vec<RawAlbumEntry> {
    let document = Html::parse_document(html);

    document
        .select(&CHART_ROW)
        .filter_map(|row| {
            let album = row.select(&CHART_NAME).next().map(element_text)?;
            let artist = row.select(&CHART_ARTIST).next().map(element_text)?;
            let count = row.select(&CHART_COUNT).next().map(element_text)?;
            let rank: u32 = row
                .select(&CHART_INDEX)
                .next()
                .map(element_text)?
                .parse()
                .ok()?;
            Some(RawAlbumEntry::new(album, artist, count, rank))
        })
        .filter(|entry| entry.rank as usize <= max_items)
        .collect()
}

/// Track count from the "Length" metadata entry (e.g. "11 tracks, 47:31")
/// and the cover art URL.
pub fn parse_album_page(html: &str) -> AlbumPage {
    let document = Html::parse_document(html);

    let track_count = document
        .select(&METADATA_HEADING)
        .find(|dt| element_text(*dt).contains("Length"))
        .and_then(|dt| {
            dt.next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|sibling| sibling.value().name() == "dd")
        })
        .and_then(|dd| {
            TRACK_COUNT
                .captures(&element_text(dd))
                .and_then(|c| c[1].parse().ok())
        });

    let cover_url = document
        .select(&COVER_IMAGE)
        .next()
        .and_then(|img| img.value().attr("src"))
        .filter(|src| !src.is_empty())
        .map(str::to_string);

    AlbumPage {
        track_count,
        cover_url,
    }
}

/// Year from the "scrobbling since 12 Mar 2009" line of a profile page.
pub fn parse_start_year(html: &str) -> Option<i32> {
    SCROBBLING_SINCE
        .captures(html)
        .and_then(|c| c[1].parse().ok())
}
