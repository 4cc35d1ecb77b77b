//! Release-year resolution
//!
//! Decides a song's original release year: normalize names, search the
//! catalog, score candidates, walk the best match down to its main release,
//! and validate the date. Any miss or failure falls back to the streaming
//! service's own album date, so `resolve` always produces a song.

use std::sync::Arc;

use trackdate_common::date::{current_year, is_valid_year, month_name, ReleaseDate};
use trackdate_common::model::{ProcessedSong, Song, Source, NOT_AVAILABLE};

use crate::services::catalog::{CatalogClient, CatalogError, Master, Release, SearchEntry};

/// A candidate must reach this score to be trusted over streaming metadata
const SCORE_THRESHOLD: u32 = 80;

/// Release-format descriptions that disqualify a main release: these
/// pressings predate or sidestep the real retail date
const EXCLUDED_FORMATS: [&str; 5] = ["promo", "sampler", "test pressing", "advance", "acetate"];

/// Lowercase, strip parenthesized/bracketed substrings and punctuation,
/// collapse whitespace. Idempotent.
pub fn normalize(input: &str) -> String {
    let mut depth_paren = 0u32;
    let mut depth_bracket = 0u32;
    let mut stripped = String::with_capacity(input.len());

    for c in input.chars() {
        match c {
            '(' => depth_paren += 1,
            ')' => depth_paren = depth_paren.saturating_sub(1),
            '[' => depth_bracket += 1,
            ']' => depth_bracket = depth_bracket.saturating_sub(1),
            _ if depth_paren == 0 && depth_bracket == 0 => stripped.push(c),
            _ => {}
        }
    }

    let filtered: String = stripped
        .chars()
        .filter(|c| c.is_ascii_alphanumeric() || matches!(c, ' ' | '_' | '-'))
        .collect();

    filtered
        .split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

/// Score a search candidate against the normalized artist and title.
///
/// Artist and title each contribute 40 for an exact match or 20 for a
/// containment match; a plausible year adds 20. Candidates whose title does
/// not split on `" - "` score zero.
pub fn score_candidate(
    entry: &SearchEntry,
    norm_artist: &str,
    norm_title: &str,
    current: i32,
) -> u32 {
    let Some((artist_part, title_part)) = entry.title.split_once(" - ") else {
        return 0;
    };

    let candidate_artist = normalize(artist_part);
    let candidate_title = normalize(title_part);

    let mut score = 0;

    if candidate_artist == norm_artist {
        score += 40;
    } else if candidate_artist.contains(norm_artist) {
        score += 20;
    }

    if candidate_title == norm_title {
        score += 40;
    } else if candidate_title.contains(norm_title) {
        score += 20;
    }

    if entry
        .year
        .as_deref()
        .is_some_and(|y| is_valid_year(y.trim(), current))
    {
        score += 20;
    }

    score
}

/// Resolve a song from its streaming-service metadata alone
pub fn fallback_to_streaming(song: &Song) -> ProcessedSong {
    let date = ReleaseDate::parse(&song.current_release_date, current_year());

    ProcessedSong {
        artist: song.artist.clone(),
        title: song.title.clone(),
        spotify_url: song.spotify_url.clone(),
        current_release_date: song.current_release_date.clone(),
        release_year: date.year,
        release_month: date.month,
        release_day: date.day,
        source: Source::Streaming,
        source_url: Some(song.spotify_url.clone()),
        error: None,
    }
}

/// Release-year resolver backed by the discography catalog
pub struct Resolver {
    catalog: Arc<CatalogClient>,
    /// Human-facing catalog site for citation URLs
    site_url: String,
}

impl Resolver {
    pub fn new(catalog: Arc<CatalogClient>, site_url: &str) -> Self {
        Self {
            catalog,
            site_url: site_url.trim_end_matches('/').to_string(),
        }
    }

    /// Resolve a song's original release date. Never fails: a catalog error
    /// is caught and reported through the fallback's `error` field, a miss
    /// (no candidate, low score, promo pressing, implausible year) falls
    /// back silently.
    pub async fn resolve(&self, song: &Song) -> ProcessedSong {
        match self.resolve_from_catalog(song).await {
            Ok(Some(processed)) => processed,
            Ok(None) => {
                tracing::debug!(
                    artist = %song.artist,
                    title = %song.title,
                    "no trusted catalog match, using streaming date"
                );
                fallback_to_streaming(song)
            }
            Err(e) => {
                tracing::warn!(
                    artist = %song.artist,
                    title = %song.title,
                    error = %e,
                    "catalog resolution failed, using streaming date"
                );
                let mut processed = fallback_to_streaming(song);
                processed.error = Some(e.to_string());
                processed
            }
        }
    }

    /// `Ok(None)` means the catalog had no answer worth trusting
    async fn resolve_from_catalog(
        &self,
        song: &Song,
    ) -> Result<Option<ProcessedSong>, CatalogError> {
        let norm_artist = normalize(&song.artist);
        let norm_title = normalize(&song.title);
        let current = current_year();

        let mut results = self
            .catalog
            .search(&format!("{norm_artist} {norm_title}"), 10)
            .await?;

        if results.is_empty() {
            results = self
                .catalog
                .search(&format!("artist:\"{norm_artist}\""), 20)
                .await?;
        }

        if results.is_empty() {
            return Ok(None);
        }

        // Highest score wins; ties keep the first-seen candidate, which the
        // ascending-year sort makes the earliest release rather than a
        // later reissue
        let mut best: Option<(&SearchEntry, u32)> = None;
        for entry in &results {
            let score = score_candidate(entry, &norm_artist, &norm_title, current);
            if best.is_none_or(|(_, best_score)| score > best_score) {
                best = Some((entry, score));
            }
        }

        let (best, score) = best.expect("results checked non-empty");
        if score < SCORE_THRESHOLD {
            tracing::debug!(
                artist = %song.artist,
                title = %song.title,
                score,
                "best candidate below threshold"
            );
            return Ok(None);
        }

        let master = self.catalog.get_master(best.id).await?;
        let Some(main_release) = master.main_release else {
            return Ok(None);
        };

        let release = self.catalog.get_release(main_release).await?;
        if is_excluded_pressing(&release) {
            tracing::debug!(master_id = best.id, "main release is a promo pressing");
            return Ok(None);
        }

        Ok(self.build_processed(song, best.id, &master, &release, current))
    }

    /// Parse the release date, defaulting the year to the master's when the
    /// release record has none; `None` when no plausible year survives
    fn build_processed(
        &self,
        song: &Song,
        master_id: u64,
        master: &Master,
        release: &Release,
        current: i32,
    ) -> Option<ProcessedSong> {
        let released = release.released.as_deref().unwrap_or("").trim();
        let mut parts = released.splitn(3, '-');

        let year_part = parts.next().unwrap_or("").trim();
        let year = if year_part.is_empty() {
            master.year?.to_string()
        } else {
            year_part.to_string()
        };

        if !is_valid_year(&year, current) {
            return None;
        }

        let month = parts
            .next()
            .and_then(|m| m.trim().parse::<u32>().ok())
            .and_then(month_name)
            .unwrap_or(NOT_AVAILABLE)
            .to_string();

        let day = parts
            .next()
            .and_then(|d| d.trim().parse::<u32>().ok())
            .filter(|d| (1..=31).contains(d))
            .map(|d| d.to_string())
            .unwrap_or_else(|| NOT_AVAILABLE.to_string());

        Some(ProcessedSong {
            artist: song.artist.clone(),
            title: song.title.clone(),
            spotify_url: song.spotify_url.clone(),
            current_release_date: song.current_release_date.clone(),
            release_year: year,
            release_month: month,
            release_day: day,
            source: Source::Catalog,
            source_url: Some(format!("{}/master/{}", self.site_url, master_id)),
            error: None,
        })
    }
}

/// True when the first format's descriptions mark a non-retail pressing
fn is_excluded_pressing(release: &Release) -> bool {
    let descriptions = release
        .formats
        .as_deref()
        .and_then(|formats| formats.first())
        .and_then(|format| format.descriptions.as_deref());

    let Some(descriptions) = descriptions else {
        return false;
    };

    descriptions.iter().any(|description| {
        let lowered = description.to_lowercase();
        EXCLUDED_FORMATS
            .iter()
            .any(|excluded| lowered.contains(excluded))
    })
}
