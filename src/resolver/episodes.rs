//! Episode-list resolution
//!
//! One listing page is turned into a canonical, de-duplicated, numbered list.
//! The listing markup is inconsistent: some cards carry a numbered heading,
//! some sit under a section heading naming the series, some have nothing. The
//! pipeline is:
//!
//! 1. [`extract_listing`] collects one [`ListingEntry`] per distinct content
//!    slug with the nearest heading and thumbnail
//! 2. [`classify`] decides explicit vs implicit numbering per entry
//! 3. [`reconcile`] orders, renumbers and repairs collisions
//!
//! All three steps are pure; only [`EpisodeListResolver::resolve`] touches the
//! network.

use super::{EpisodeRecord, SlugIndex};
use crate::browser::PageFetcher;
use crate::cache::TtlCache;
use crate::catalog::SeriesDescriptor;
use crate::config::SiteSettings;
use crate::utils::url::absolutize;
use crate::{Error, Result};
use regex::Regex;
use scraper::{ElementRef, Html, Selector};
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, LazyLock};
use url::Url;

/// Ancestors inspected per link, the link itself included
const ANCESTOR_DEPTH: usize = 8;

/// Season under which listing episodes are indexed
const LISTING_SEASON: u32 = 1;

static LINK_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("a[href]").expect("Invalid link selector"));

static HEADING_SELECTOR: LazyLock<Selector> = LazyLock::new(|| {
    Selector::parse("h1, h2, h3, h4, h5, h6").expect("Invalid heading selector")
});

static IMAGE_SELECTOR: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("img").expect("Invalid image selector"));

static NUMBERED_HEADING: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*(\d+)\s*[-–]\s*(.+?)\s*$").expect("Invalid numbered heading regex")
});

const IMAGE_ATTRIBUTES: [&str; 3] = ["src", "data-src", "data-lazy-src"];

/// One content link found on a listing page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListingEntry {
    pub slug: String,
    pub heading: Option<String>,
    pub thumbnail: Option<String>,
}

/// Working state of an episode before numbering is final
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpisodeDraft {
    pub slug: String,
    pub title: String,
    /// Number taken from the heading; `None` for implicit entries
    pub number: Option<u32>,
    pub heading: Option<String>,
    pub thumbnail: Option<String>,
}

impl EpisodeDraft {
    pub fn is_explicit(&self) -> bool {
        self.number.is_some()
    }
}

/// Resolves the episode list of one series
pub struct EpisodeListResolver {
    fetcher: Arc<PageFetcher>,
    cache: Arc<TtlCache<String, Arc<Vec<EpisodeRecord>>>>,
    slugs: Arc<SlugIndex>,
    site: SiteSettings,
    base: Url,
}

impl std::fmt::Debug for EpisodeListResolver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EpisodeListResolver")
            .field("base", &self.base.as_str())
            .finish_non_exhaustive()
    }
}

impl EpisodeListResolver {
    pub fn new(
        fetcher: Arc<PageFetcher>,
        cache: Arc<TtlCache<String, Arc<Vec<EpisodeRecord>>>>,
        slugs: Arc<SlugIndex>,
        site: SiteSettings,
    ) -> Result<Self> {
        let base = Url::parse(&site.base_url)?;
        Ok(Self {
            fetcher,
            cache,
            slugs,
            site,
            base,
        })
    }

    /// Episode list of `series`. Never fails: an unfetchable or empty listing
    /// yields an empty list, which is not cached.
    pub async fn resolve(&self, series: &SeriesDescriptor) -> Arc<Vec<EpisodeRecord>> {
        if let Some(records) = self.cache.get(&series.id).await {
            tracing::debug!(key = %series.id, "Episode list cache hit");
            return records;
        }

        match self.resolve_uncached(series).await {
            Ok(records) => {
                self.slugs
                    .replace_series(
                        &series.id,
                        LISTING_SEASON,
                        records.iter().map(|r| (r.number, r.source_slug.clone())),
                    )
                    .await;
                self.cache.put(series.id.clone(), records.clone()).await;
                records
            }
            Err(e) => {
                tracing::warn!(
                    key = %series.id,
                    phase = "episodes",
                    kind = e.kind(),
                    "Episode list unavailable: {}",
                    e
                );
                Arc::new(Vec::new())
            }
        }
    }

    async fn resolve_uncached(&self, series: &SeriesDescriptor) -> Result<Arc<Vec<EpisodeRecord>>> {
        let page_url = self.base.join(&series.listing_path)?;
        let markup = self.fetcher.fetch(page_url.as_str()).await?;

        let records = build_episode_list(&markup, &page_url, &series.name, &self.site);
        if records.is_empty() {
            return Err(Error::parse_empty(page_url.as_str()));
        }

        if series.expected_episodes > 0 && records.len() != series.expected_episodes as usize {
            tracing::warn!(
                key = %series.id,
                phase = "episodes",
                "Resolved {} episodes, catalog expects {}",
                records.len(),
                series.expected_episodes
            );
        }
        tracing::info!(key = %series.id, "Resolved {} episodes", records.len());

        Ok(Arc::new(records))
    }
}

/// Full listing-to-records pipeline over one page of markup
pub fn build_episode_list(
    markup: &str,
    page_url: &Url,
    series_name: &str,
    site: &SiteSettings,
) -> Vec<EpisodeRecord> {
    let entries = extract_listing(markup, page_url, site);
    let drafts = classify(entries, series_name, &site.branding_words);
    reconcile(drafts)
}

/// Collect distinct content links with their nearest heading and thumbnail.
/// The first occurrence of a slug wins.
pub fn extract_listing(markup: &str, page_url: &Url, site: &SiteSettings) -> Vec<ListingEntry> {
    let document = Html::parse_document(markup);
    let mut seen = HashSet::new();
    let mut entries = Vec::new();

    for link in document.select(&LINK_SELECTOR) {
        let Some(href) = link.value().attr("href") else {
            continue;
        };
        let Some(slug) = content_slug(page_url, href, &site.content_path_prefix) else {
            continue;
        };
        if !seen.insert(slug.clone()) {
            continue;
        }

        entries.push(ListingEntry {
            heading: nearest_heading(link),
            thumbnail: nearest_thumbnail(link, page_url, &site.thumbnail_marker),
            slug,
        });
    }

    entries
}

fn content_slug(page_url: &Url, href: &str, prefix: &str) -> Option<String> {
    let url = page_url.join(href.trim()).ok()?;
    if url.host_str() != page_url.host_str() {
        return None;
    }
    let rest = url.path().strip_prefix(prefix)?;
    let slug = rest.trim_matches('/').split('/').next()?;
    (!slug.is_empty()).then(|| slug.to_string())
}

fn ancestry(link: ElementRef<'_>) -> impl Iterator<Item = ElementRef<'_>> {
    std::iter::once(link)
        .chain(link.ancestors().filter_map(ElementRef::wrap))
        .take(ANCESTOR_DEPTH)
}

fn element_text(element: ElementRef<'_>) -> String {
    element
        .text()
        .flat_map(str::split_whitespace)
        .collect::<Vec<_>>()
        .join(" ")
}

fn nearest_heading(link: ElementRef<'_>) -> Option<String> {
    ancestry(link).find_map(|ancestor| {
        ancestor
            .select(&HEADING_SELECTOR)
            .map(element_text)
            .find(|text| !text.is_empty())
    })
}

fn nearest_thumbnail(link: ElementRef<'_>, page_url: &Url, marker: &str) -> Option<String> {
    ancestry(link).find_map(|ancestor| {
        ancestor.select(&IMAGE_SELECTOR).find_map(|img| {
            IMAGE_ATTRIBUTES
                .iter()
                .filter_map(|attr| img.value().attr(attr))
                .find(|src| src.contains(marker))
                .and_then(|src| absolutize(page_url, src))
        })
    })
}

/// Lower-cased words longer than two characters, branding words removed
pub fn significant_words(text: &str, branding: &[String]) -> HashSet<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|word| word.chars().count() > 2)
        .map(str::to_lowercase)
        .filter(|word| !branding.iter().any(|b| b.to_lowercase() == *word))
        .collect()
}

/// Title built from a slug: split on `-`/`_`, each token capitalized
pub fn title_from_slug(slug: &str) -> String {
    slug.split(['-', '_'])
        .filter(|token| !token.is_empty())
        .map(|token| {
            let mut chars = token.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

/// Decide explicit vs implicit numbering and the title for each entry
pub fn classify(entries: Vec<ListingEntry>, series_name: &str, branding: &[String]) -> Vec<EpisodeDraft> {
    let series_words = significant_words(series_name, branding);

    let mut drafts: Vec<EpisodeDraft> = entries
        .into_iter()
        .map(|entry| {
            let (number, title) = match entry.heading.as_deref() {
                Some(heading) => classify_heading(heading, &entry.slug, &series_words, branding),
                None => (None, title_from_slug(&entry.slug)),
            };
            EpisodeDraft {
                slug: entry.slug,
                title,
                number,
                heading: entry.heading,
                thumbnail: entry.thumbnail,
            }
        })
        .collect();

    // A title shared by several links is a section heading, not an episode title
    let mut counts: HashMap<String, usize> = HashMap::new();
    for draft in &drafts {
        *counts.entry(draft.title.to_lowercase()).or_default() += 1;
    }
    for draft in &mut drafts {
        if counts.get(&draft.title.to_lowercase()).copied().unwrap_or(0) > 1 {
            draft.title = title_from_slug(&draft.slug);
            draft.number = None;
        }
    }

    drafts
}

fn classify_heading(
    heading: &str,
    slug: &str,
    series_words: &HashSet<String>,
    branding: &[String],
) -> (Option<u32>, String) {
    let numbered = NUMBERED_HEADING
        .captures(heading)
        .and_then(|caps| Some((caps[1].parse::<u32>().ok()?, caps[2].to_string())));
    if let Some((number, title)) = numbered {
        return (Some(number), title);
    }

    if significant_words(heading, branding).is_subset(series_words) {
        (None, title_from_slug(slug))
    } else {
        (None, heading.to_string())
    }
}

/// Order and number drafts: explicit ascending, then implicit oldest-first
/// continuing after the highest explicit number, then collisions repaired.
pub fn reconcile(drafts: Vec<EpisodeDraft>) -> Vec<EpisodeRecord> {
    let (mut explicit, implicit): (Vec<_>, Vec<_>) =
        drafts.into_iter().partition(EpisodeDraft::is_explicit);
    explicit.sort_by_key(|draft| draft.number);

    let explicit_slugs: HashSet<String> = explicit.iter().map(|d| d.slug.clone()).collect();
    let mut next = explicit
        .iter()
        .filter_map(|d| d.number)
        .max()
        .unwrap_or(0)
        .saturating_add(1);

    let mut ordered: Vec<(u32, EpisodeDraft)> = explicit
        .into_iter()
        .map(|draft| (draft.number.unwrap_or_default(), draft))
        .collect();

    // Listings show newest first
    for draft in implicit
        .into_iter()
        .rev()
        .filter(|draft| !explicit_slugs.contains(&draft.slug))
    {
        ordered.push((next, draft));
        next = next.saturating_add(1);
    }

    let numbers: Vec<u32> = ordered.iter().map(|(number, _)| *number).collect();
    fix_collisions(&numbers)
        .into_iter()
        .zip(ordered)
        .map(|(number, (_, draft))| EpisodeRecord {
            number,
            title: draft.title,
            thumbnail: draft.thumbnail,
            source_slug: draft.slug,
        })
        .collect()
}

/// Replace each number that is 0 or already used with the smallest unused
/// positive integer above the previously assigned number, wrapping to 1 past
/// `u32::MAX`. Leaves valid lists untouched and does not fill gaps.
pub fn fix_collisions(numbers: &[u32]) -> Vec<u32> {
    let mut used = HashSet::with_capacity(numbers.len());
    let mut previous = 0u32;

    numbers
        .iter()
        .map(|&number| {
            let mut assigned = number;
            if assigned == 0 || used.contains(&assigned) {
                assigned = next_unused(&used, previous);
            }
            used.insert(assigned);
            previous = assigned;
            assigned
        })
        .collect()
}

fn next_unused(used: &HashSet<u32>, after: u32) -> u32 {
    (after.saturating_add(1)..=u32::MAX)
        .chain(1..=after)
        .find(|n| !used.contains(n))
        .unwrap_or(after)
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn site() -> SiteSettings {
        SiteSettings::default()
    }

    fn page_url() -> Url {
        Url::parse("https://www.pokeflix.tv/browse/pokemon-indigo-league").unwrap()
    }

    fn branding() -> Vec<String> {
        site().branding_words
    }

    fn entry(slug: &str, heading: Option<&str>) -> ListingEntry {
        ListingEntry {
            slug: slug.to_string(),
            heading: heading.map(str::to_string),
            thumbnail: None,
        }
    }

    fn summary(records: &[EpisodeRecord]) -> Vec<(u32, &str)> {
        records.iter().map(|r| (r.number, r.title.as_str())).collect()
    }

    #[test]
    fn test_extract_listing_dedups_and_finds_headings() {
        let markup = r#"
            <html><body>
              <div class="card">
                <a href="/v/01-pokemon-i-choose-you"><img data-src="/static/thumbnails/01-indigo-league/1.jpg"></a>
                <h4>01 - Pokémon, I Choose You!</h4>
              </div>
              <div class="card">
                <a href="https://www.pokeflix.tv/v/02-pokemon-emergency/">
                  <img src="/static/placeholder.gif" data-lazy-src="/static/thumbnails/01-indigo-league/2.jpg">
                </a>
                <h4>02 - Pokémon Emergency!</h4>
              </div>
              <a href="/v/01-pokemon-i-choose-you#comments">again</a>
              <a href="/browse/pokemon-orange-islands">next season</a>
              <a href="https://elsewhere.example/v/03-foreign">foreign</a>
            </body></html>
        "#;

        let entries = extract_listing(markup, &page_url(), &site());

        assert_eq!(
            entries,
            vec![
                ListingEntry {
                    slug: "01-pokemon-i-choose-you".into(),
                    heading: Some("01 - Pokémon, I Choose You!".into()),
                    thumbnail: Some(
                        "https://www.pokeflix.tv/static/thumbnails/01-indigo-league/1.jpg".into()
                    ),
                },
                ListingEntry {
                    slug: "02-pokemon-emergency".into(),
                    heading: Some("02 - Pokémon Emergency!".into()),
                    thumbnail: Some(
                        "https://www.pokeflix.tv/static/thumbnails/01-indigo-league/2.jpg".into()
                    ),
                },
            ]
        );
    }

    #[test]
    fn test_extract_listing_without_heading() {
        let markup = r#"<ul><li><a href="/v/pikachus-goodbye">x</a></li></ul>"#;
        let entries = extract_listing(markup, &page_url(), &site());
        assert_eq!(entries, vec![entry("pikachus-goodbye", None)]);
    }

    #[test]
    fn test_numbered_headings_sorted() {
        let drafts = classify(
            vec![
                entry("a", Some("01 - A")),
                entry("c", Some("03 - C")),
                entry("b", Some("02 - B")),
            ],
            "Pokémon: Indigo League",
            &branding(),
        );
        let records = reconcile(drafts);
        assert_eq!(summary(&records), vec![(1, "A"), (2, "B"), (3, "C")]);
    }

    #[test]
    fn test_implicit_entries_follow_explicit_oldest_first() {
        let drafts = classify(
            vec![
                entry("ep-one", Some("01 - One")),
                entry("ep-two", Some("02 - Two")),
                entry("ep-five", Some("05 - Five")),
                entry("newest-special", None),
                entry("older-special", None),
            ],
            "Pokémon: Indigo League",
            &branding(),
        );
        let records = reconcile(drafts);
        assert_eq!(
            summary(&records),
            vec![
                (1, "One"),
                (2, "Two"),
                (5, "Five"),
                (6, "Older Special"),
                (7, "Newest Special"),
            ]
        );
    }

    #[test]
    fn test_section_header_heading_uses_slug_title() {
        let drafts = classify(
            vec![
                entry("the-school-of-hard-knocks", Some("Pokémon: Indigo League")),
                entry("mystery-at-the-lighthouse", Some("Pokémon")),
                entry("bonus-clip", Some("Behind the Scenes")),
            ],
            "Pokémon: Indigo League",
            &branding(),
        );

        assert_eq!(drafts[0].title, "The School Of Hard Knocks");
        assert_eq!(drafts[1].title, "Mystery At The Lighthouse");
        assert_eq!(drafts[2].title, "Behind the Scenes");
        assert!(drafts.iter().all(|d| !d.is_explicit()));
    }

    #[test]
    fn test_short_coincidental_title_is_section_header() {
        // A real episode called "League" collides with the series name words
        let drafts = classify(
            vec![entry("league", Some("League"))],
            "Pokémon: Indigo League",
            &branding(),
        );
        assert_eq!(drafts[0].title, "League");
        assert_eq!(drafts[0].number, None);

        let drafts = classify(
            vec![entry("the-league-match", Some("League"))],
            "Pokémon: Indigo League",
            &branding(),
        );
        assert_eq!(drafts[0].title, "The League Match");
    }

    #[test]
    fn test_duplicate_titles_become_implicit() {
        let drafts = classify(
            vec![
                entry("ep-a", Some("07 - Special")),
                entry("ep-b", Some("08 - Special")),
                entry("ep-c", Some("09 - Unique")),
            ],
            "Pokémon: Indigo League",
            &branding(),
        );

        assert_eq!(drafts[0].title, "Ep A");
        assert_eq!(drafts[0].number, None);
        assert_eq!(drafts[1].title, "Ep B");
        assert_eq!(drafts[2].number, Some(9));

        let records = reconcile(drafts);
        assert_eq!(summary(&records), vec![(9, "Unique"), (10, "Ep B"), (11, "Ep A")]);
    }

    #[test]
    fn test_duplicate_source_number_is_masked() {
        let drafts = classify(
            vec![entry("x", Some("05 - X")), entry("y", Some("05 - Y"))],
            "Pokémon: Indigo League",
            &branding(),
        );
        let records = reconcile(drafts);
        assert_eq!(summary(&records), vec![(5, "X"), (6, "Y")]);
    }

    #[test]
    fn test_fix_collisions() {
        assert_eq!(fix_collisions(&[1, 2, 5]), vec![1, 2, 5]);
        assert_eq!(fix_collisions(&[0, 1, 1, 3]), vec![1, 2, 3, 4]);
        assert_eq!(fix_collisions(&[3, 3, 0]), vec![3, 4, 5]);
        assert_eq!(fix_collisions(&[]), Vec::<u32>::new());
    }

    #[test]
    fn test_numbers_at_the_top_of_the_range_stay_unique() {
        let drafts = classify(
            vec![
                entry("big", Some("4294967295 - Big")),
                entry("newest-special", None),
                entry("older-special", None),
            ],
            "Pokémon: Indigo League",
            &branding(),
        );
        let records = reconcile(drafts);

        assert_eq!(
            summary(&records),
            vec![(u32::MAX, "Big"), (1, "Older Special"), (2, "Newest Special")]
        );
        assert_eq!(fix_collisions(&[u32::MAX, u32::MAX, 0]), vec![u32::MAX, 1, 2]);
    }

    #[test]
    fn test_fix_collisions_is_idempotent() {
        let inputs: [&[u32]; 4] = [&[0, 0, 0], &[4, 4, 2, 2], &[1, 3, 3, 2], &[9, 1, 1]];
        for input in inputs {
            let once = fix_collisions(input);
            assert_eq!(fix_collisions(&once), once);
            let unique: HashSet<_> = once.iter().collect();
            assert_eq!(unique.len(), once.len());
            assert!(once.iter().all(|&n| n > 0));
        }
    }

    #[test]
    fn test_title_from_slug() {
        assert_eq!(title_from_slug("01-pokemon-i-choose-you"), "01 Pokemon I Choose You");
        assert_eq!(title_from_slug("pikachu_s--goodbye"), "Pikachu S Goodbye");
    }

    #[test]
    fn test_build_episode_list_end_to_end() {
        let markup = r#"
            <section>
              <h2>Pokémon: Indigo League</h2>
              <div><div><a href="/v/holiday-hi-jynx">x</a></div></div>
              <div><div><a href="/v/snow-way-out">x</a></div></div>
            </section>
            <section>
              <div class="card"><a href="/v/02-emergency"></a><h4>02 - Emergency!</h4></div>
              <div class="card"><a href="/v/01-i-choose-you"></a><h4>01 - I Choose You!</h4></div>
            </section>
        "#;

        let records = build_episode_list(markup, &page_url(), "Pokémon: Indigo League", &site());

        assert_eq!(
            summary(&records),
            vec![
                (1, "I Choose You!"),
                (2, "Emergency!"),
                (3, "Snow Way Out"),
                (4, "Holiday Hi Jynx"),
            ]
        );
        assert_eq!(records[2].source_slug, "snow-way-out");
    }
}
