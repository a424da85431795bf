use std::fmt;
use std::time::Instant;

use ahash::{HashMap, HashMapExt};
use polars::prelude::*;
use tracing::{debug, info};

use crate::data::{CatalogData, CatalogTable, GenreTable, Service};
use crate::rating::Rating;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum ContentType {
    Movie,
    Tv,
}

impl ContentType {
    /// Interpret a raw type flag: `0`, `movie` or `film` is a movie,
    /// anything else (null included) is tv.
    pub fn from_flag(raw: Option<&str>) -> Self {
        match raw.map(|r| r.trim().to_ascii_lowercase()).as_deref() {
            Some("0" | "movie" | "film") => ContentType::Movie,
            _ => ContentType::Tv,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            ContentType::Movie => "movie",
            ContentType::Tv => "tv",
        }
    }
}

impl fmt::Display for ContentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// The working relation: every catalog row of every service, tagged with its
/// service and left-joined to the genre table.
///
/// Rows keep source order within a service, services follow [`Service::ALL`].
/// Built once and shared read-only by the auditor and every query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Unified {
    pub service: Vec<Service>,
    /// Row index in the service's source table.
    pub source_row: Vec<usize>,
    pub title: Vec<String>,
    pub content_type: Vec<ContentType>,
    pub year: Vec<Option<i32>>,
    pub age: Vec<Option<String>>,
    pub imdb: Vec<Option<Rating>>,
    pub rotten_tomatoes: Vec<Option<Rating>>,
    pub genre: Vec<Option<String>>,
}

impl Unified {
    pub fn len(&self) -> usize {
        self.title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
    }

    pub fn to_frame(&self) -> PolarsResult<DataFrame> {
        let raw = |ratings: &[Option<Rating>]| -> Vec<Option<String>> {
            ratings
                .iter()
                .map(|r| r.as_ref().map(|r| r.raw.clone()))
                .collect()
        };
        let service: Vec<&str> = self.service.iter().map(|s| s.label()).collect();
        let content_type: Vec<&str> = self.content_type.iter().map(|t| t.label()).collect();
        let source_row: Vec<u64> = self.source_row.iter().map(|&r| r as u64).collect();

        DataFrame::new(vec![
            Column::new("service".into(), service),
            Column::new("source_row".into(), source_row),
            Column::new("title".into(), self.title.clone()),
            Column::new("type".into(), content_type),
            Column::new("year".into(), self.year.clone()),
            Column::new("age".into(), self.age.clone()),
            Column::new("imdb".into(), raw(&self.imdb)),
            Column::new("rotten_tomatoes".into(), raw(&self.rotten_tomatoes)),
            Column::new("genre".into(), self.genre.clone()),
        ])
    }
}

pub fn unify(data: &CatalogData) -> Unified {
    unify_tables(&data.tables(), &data.genres)
}

/// Multiset union of the catalogs followed by a left join on `title == film`.
///
/// No row is dropped or deduplicated: the output length is the sum of the
/// input lengths. A title without a genre row keeps a null genre. When the
/// genre table lists a film more than once its non-null genres are joined
/// with `", "` in table order, so one catalog row still yields one row.
pub fn unify_tables(tables: &[&CatalogTable], genres: &GenreTable) -> Unified {
    let start = Instant::now();

    let mut genre_m: HashMap<&str, Option<String>> = HashMap::with_capacity(genres.len());
    let mut duplicate_films = 0usize;
    for (film, genre) in genres.film.iter().zip(genres.genre.iter()) {
        match genre_m.get_mut(film.as_str()) {
            Some(joined) => {
                duplicate_films += 1;
                if let Some(genre) = genre {
                    match joined {
                        Some(existing) => {
                            existing.push_str(", ");
                            existing.push_str(genre);
                        }
                        None => *joined = Some(genre.clone()),
                    }
                }
            }
            None => {
                genre_m.insert(film.as_str(), genre.clone());
            }
        }
    }

    let rows = tables.iter().map(|t| t.len()).sum();
    let mut unified = Unified {
        service: Vec::with_capacity(rows),
        source_row: Vec::with_capacity(rows),
        title: Vec::with_capacity(rows),
        content_type: Vec::with_capacity(rows),
        year: Vec::with_capacity(rows),
        age: Vec::with_capacity(rows),
        imdb: Vec::with_capacity(rows),
        rotten_tomatoes: Vec::with_capacity(rows),
        genre: Vec::with_capacity(rows),
    };
    let mut misses = 0usize;

    for table in tables {
        for (i, title) in table.title.iter().enumerate() {
            let genre = match genre_m.get(title.as_str()) {
                Some(genre) => genre.as_deref(),
                None => {
                    misses += 1;
                    None
                }
            };

            unified.service.push(table.service);
            unified.source_row.push(i);
            unified.title.push(title.clone());
            unified
                .content_type
                .push(ContentType::from_flag(table.kind[i].as_deref()));
            unified.year.push(table.year[i]);
            unified.age.push(table.age[i].clone());
            unified.imdb.push(table.imdb[i].as_deref().map(Rating::parse));
            unified
                .rotten_tomatoes
                .push(table.rotten_tomatoes[i].as_deref().map(Rating::parse));
            unified.genre.push(genre.map(str::to_string));
        }
    }

    debug!(
        join_misses = misses,
        duplicate_films,
        elapsed = ?start.elapsed(),
        "joined genres"
    );
    info!(rows = unified.len(), "unified catalogs");
    unified
}
