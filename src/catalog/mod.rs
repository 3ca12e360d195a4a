//! Static content catalog
//!
//! Series and movie descriptors are read-only inputs to the resolvers. The
//! site's full catalog ships with the binary; a replacement can be loaded from
//! JSON.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// One episodic series on the origin site
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesDescriptor {
    pub id: String,
    pub name: String,
    /// Path of the listing page, relative to the site base
    #[serde(default)]
    pub listing_path: String,
    /// Directory of the series on the CDN
    pub cdn_path: String,
    #[serde(default)]
    pub expected_episodes: u32,
}

impl SeriesDescriptor {
    pub fn new(
        id: impl Into<String>,
        name: impl Into<String>,
        cdn_path: impl Into<String>,
        expected_episodes: u32,
    ) -> Self {
        let name = name.into();
        Self {
            id: id.into(),
            listing_path: format!("/browse/{}", slugify(&name)),
            name,
            cdn_path: cdn_path.into(),
            expected_episodes,
        }
    }

    /// Whether `episode` is inside the catalog's range. A series without an
    /// expected count accepts any positive number.
    pub fn has_episode(&self, episode: u32) -> bool {
        episode >= 1 && (self.expected_episodes == 0 || episode <= self.expected_episodes)
    }

    /// Direct CDN playlist for an episode: `<cdn>/<cdn_path>/<NN>/playlist.m3u8`
    pub fn cdn_playlist_url(&self, cdn_base: &str, episode: u32) -> String {
        format!(
            "{}/{}/{:02}/playlist.m3u8",
            cdn_base.trim_end_matches('/'),
            self.cdn_path.trim_matches('/'),
            episode
        )
    }
}

/// One feature-length movie
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MovieDescriptor {
    pub id: String,
    pub name: String,
    pub cdn_path: String,
    #[serde(default)]
    pub year: Option<u16>,
}

impl MovieDescriptor {
    pub fn cdn_playlist_url(&self, cdn_base: &str) -> String {
        format!(
            "{}/{}/playlist.m3u8",
            cdn_base.trim_end_matches('/'),
            self.cdn_path.trim_matches('/')
        )
    }
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub series: Vec<SeriesDescriptor>,
    #[serde(default)]
    pub movies: Vec<MovieDescriptor>,
}

impl Catalog {
    /// Catalog compiled into the binary
    pub fn builtin() -> Self {
        let series = [
            ("pokeflix-s01", "Pokémon: Indigo League", "01-indigo-league", 82),
            ("pokeflix-s02", "Pokémon: Orange Island Adventures", "02-orange-islands", 36),
            ("pokeflix-s03", "Pokémon: The Johto Journeys", "03-johto-journeys", 41),
            ("pokeflix-s04", "Pokémon: Johto League Champions", "04-johto-league", 52),
            ("pokeflix-s05", "Pokémon: Master Quest", "05-master-quest", 65),
            ("pokeflix-s06", "Pokémon: Advanced", "06-advanced", 40),
            ("pokeflix-s07", "Pokémon: Advanced Challenge", "07-advanced-challenge", 52),
            ("pokeflix-s08", "Pokémon: Advanced Battle", "08-advanced-battle", 53),
            ("pokeflix-s09", "Pokémon: Battle Frontier", "09-battle-frontier", 47),
            ("pokeflix-s10", "Pokémon: Diamond and Pearl", "10-diamond-pearl", 51),
            ("pokeflix-s11", "Pokémon: DP Battle Dimension", "11-dp-battle-dimension", 52),
            ("pokeflix-s12", "Pokémon: DP Galactic Battles", "12-dp-galactic-battles", 53),
            ("pokeflix-s13", "Pokémon: DP Sinnoh League Victors", "13-dp-sinnoh-league", 34),
            ("pokeflix-s14", "Pokémon: Black & White", "14-black-white", 48),
            ("pokeflix-s15", "Pokémon: BW Rival Destinies", "15-bw-rival-destinies", 49),
            ("pokeflix-s16", "Pokémon: BW Adventures in Unova", "16-bw-adventures-in-unova", 45),
            ("pokeflix-s17", "Pokémon: XY", "17-xy", 48),
            ("pokeflix-s18", "Pokémon: XY Kalos Quest", "18-xy-kalos-quest", 45),
            ("pokeflix-s19", "Pokémon: XYZ", "19-xyz", 48),
            ("pokeflix-s20", "Pokémon: Sun & Moon", "20-sun-moon", 43),
            ("pokeflix-s21", "Pokémon: Sun & Moon Ultra Adventures", "21-sun-moon-ultra-adventures", 49),
            ("pokeflix-s22", "Pokémon: Sun & Moon Ultra Legends", "22-sun-moon-ultra-legends", 54),
            ("pokeflix-s23", "Pokémon Journeys", "23-journeys", 48),
            ("pokeflix-s24", "Pokémon Master Journeys", "24-master-journeys", 42),
            ("pokeflix-s25", "Pokémon Ultimate Journeys", "25-ultimate-journeys", 53),
            ("pokeflix-s26", "Pokémon Horizons", "26-horizons", 45),
            ("pokeflix-s27", "Pokémon Horizons: The Search for Laqua", "27-horizons-search-for-laqua", 44),
            ("pokeflix-s28", "Pokémon Horizons: Rising Hope", "28-horizons-rising-hope", 12),
            ("pokeflix-sp-origins", "Pokémon Origins", "0-origins", 4),
            ("pokeflix-sp-generations", "Pokémon Generations", "0-generations", 18),
            ("pokeflix-sp-twilight", "Pokémon: Twilight Wings", "0-twilight-wings", 8),
            ("pokeflix-sp-evolutions", "Pokémon Evolutions", "0-evolutions", 8),
            ("pokeflix-sp-hisuian", "Pokémon: Hisuian Snow", "0-hisuian-snow", 3),
            ("pokeflix-sp-paldean", "Pokémon: Paldean Winds", "0-paldean-winds", 4),
            ("pokeflix-sp-mega", "Pokémon: Mega Evolution Specials", "0-mega-evolution", 4),
            ("pokeflix-sp-chronicles", "Pokémon Chronicles", "0-chronicles", 22),
            ("pokeflix-sp-mystery", "Pokémon Mystery Dungeon", "0-mystery-dungeon", 5),
            ("pokeflix-sp-pikachu", "Pikachu Shorts", "0-pikachu-shorts", 21),
            ("pokeflix-sp-specials", "Pokémon Specials", "0-specials", 23),
        ]
        .into_iter()
        .map(|(id, name, cdn, episodes)| SeriesDescriptor::new(id, name, cdn, episodes))
        .collect();

        let movies = [
            ("pokeflix-m01", "Pokémon: The First Movie - Mewtwo Strikes Back", "movies/01", 1998),
            ("pokeflix-m02", "Pokémon: The Movie 2000 - The Power of One", "movies/02", 1999),
            ("pokeflix-m03", "Pokémon 3: The Movie - Spell of the Unown", "movies/03", 2000),
            ("pokeflix-m04", "Pokémon 4Ever: Celebi - Voice of the Forest", "movies/04", 2001),
            ("pokeflix-m05", "Pokémon Heroes: Latios & Latias", "movies/05", 2002),
            ("pokeflix-m06", "Pokémon: Jirachi - Wish Maker", "movies/06", 2003),
            ("pokeflix-m07", "Pokémon: Destiny Deoxys", "movies/07", 2004),
            ("pokeflix-m08", "Pokémon: Lucario and the Mystery of Mew", "movies/08", 2005),
            ("pokeflix-m09", "Pokémon Ranger and the Temple of the Sea", "movies/09", 2006),
            ("pokeflix-m10", "Pokémon: The Rise of Darkrai", "movies/10", 2007),
            ("pokeflix-m11", "Pokémon: Giratina and the Sky Warrior", "movies/11", 2008),
            ("pokeflix-m12", "Pokémon: Arceus and the Jewel of Life", "movies/12", 2009),
            ("pokeflix-m13", "Pokémon: Zoroark - Master of Illusions", "movies/13", 2010),
            ("pokeflix-m14a", "Pokémon The Movie: Black - Victini and Reshiram", "movies/14-black", 2011),
            ("pokeflix-m14b", "Pokémon The Movie: White - Victini and Zekrom", "movies/14-white", 2011),
            ("pokeflix-m15", "Pokémon the Movie: Kyurem VS. The Sword of Justice", "movies/15", 2012),
            ("pokeflix-m16", "Pokémon the Movie: Genesect and the Legend Awakened", "movies/16", 2013),
            ("pokeflix-m17", "Pokémon the Movie: Diancie and the Cocoon of Destruction", "movies/17", 2014),
            ("pokeflix-m18", "Pokémon the Movie: Hoopa and the Clash of Ages", "movies/18", 2015),
            ("pokeflix-m19", "Pokémon the Movie: Volcanion and the Mechanical Marvel", "movies/19", 2016),
            ("pokeflix-m20", "Pokémon the Movie: I Choose You!", "movies/20", 2017),
            ("pokeflix-m21", "Pokémon the Movie: The Power of Us", "movies/21", 2018),
            ("pokeflix-m22", "Pokémon: Mewtwo Strikes Back Evolution", "movies/22", 2019),
            ("pokeflix-m23", "Pokémon the Movie: Secrets of the Jungle", "movies/23", 2020),
        ]
        .into_iter()
        .map(|(id, name, cdn_path, year)| MovieDescriptor {
            id: id.to_string(),
            name: name.to_string(),
            cdn_path: cdn_path.to_string(),
            year: Some(year),
        })
        .collect();

        Self { series, movies }
    }

    /// Load a catalog from a JSON file. Series without a listing path get one
    /// derived from their name.
    pub fn from_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)?;
        let mut catalog: Catalog = serde_json::from_str(&raw)?;
        for series in &mut catalog.series {
            if series.listing_path.is_empty() {
                series.listing_path = format!("/browse/{}", slugify(&series.name));
            }
        }
        if catalog.series.is_empty() && catalog.movies.is_empty() {
            return Err(Error::config(format!(
                "Catalog file {} contains no entries",
                path.display()
            )));
        }
        tracing::info!(
            "Loaded catalog from {}: {} series, {} movies",
            path.display(),
            catalog.series.len(),
            catalog.movies.len()
        );
        Ok(catalog)
    }

    /// Use `path` when given, the built-in catalog otherwise
    pub fn load(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::from_file(path),
            None => Ok(Self::builtin()),
        }
    }

    pub fn find_series(&self, id: &str) -> Option<&SeriesDescriptor> {
        self.series.iter().find(|s| s.id == id)
    }

    pub fn find_movie(&self, id: &str) -> Option<&MovieDescriptor> {
        self.movies.iter().find(|m| m.id == id)
    }
}

/// Lower-case ASCII slug: accents folded, runs of other characters become `-`
pub fn slugify(name: &str) -> String {
    let mut slug = String::with_capacity(name.len());
    for c in name.chars() {
        let c = match c {
            'é' | 'è' | 'ê' | 'É' => 'e',
            other => other,
        };
        if c.is_ascii_alphanumeric() {
            slug.push(c.to_ascii_lowercase());
        } else if !slug.is_empty() && !slug.ends_with('-') {
            slug.push('-');
        }
    }
    slug.trim_end_matches('-').to_string()
}
