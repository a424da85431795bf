use std::cmp::Ordering;
use std::time::Instant;

use ahash::{HashMap, HashMapExt};
use chrono::NaiveDate;
use polars::prelude::*;
use tracing::debug;

use crate::config::DivisivePolicy;
use crate::rating::Rating;
use crate::unify::Unified;

/// Which rows take part in a divergence query and how imdb is rescaled.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct DivergenceParams {
    pub min_year: i32,
    pub imdb_scale: f64,
}

impl Default for DivergenceParams {
    fn default() -> Self {
        Self {
            min_year: 2000,
            imdb_scale: 10.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct YearDivergence {
    pub year: i32,
    /// January 1st of `year`, for charting.
    pub date: Option<NaiveDate>,
    pub avg_difference: f64,
    pub samples: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TitleDivergence {
    pub title: String,
    pub avg_difference: f64,
    pub samples: usize,
}

/// `|imdb * scale - rotten_tomatoes|` for every qualifying row, with the row index.
///
/// A row qualifies when its year is at least `min_year` and both scores are
/// present and well formed.
fn row_differences(
    unified: &Unified,
    params: DivergenceParams,
) -> impl Iterator<Item = (usize, i32, f64)> + '_ {
    unified
        .year
        .iter()
        .zip(unified.imdb.iter())
        .zip(unified.rotten_tomatoes.iter())
        .enumerate()
        .filter_map(move |(i, ((year, imdb), rt))| {
            let year = (*year)?;
            if year < params.min_year {
                return None;
            }
            let imdb = imdb.as_ref().and_then(Rating::value)?;
            let rt = rt.as_ref().and_then(Rating::value)?;
            Some((i, year, (imdb * params.imdb_scale - rt).abs()))
        })
}

/// Mean critic/audience divergence per year, ascending by year.
pub fn divergence_by_year(unified: &Unified, params: DivergenceParams) -> Vec<YearDivergence> {
    let start = Instant::now();

    let mut year_m: HashMap<i32, (f64, usize)> = HashMap::new();
    let mut qualifying = 0usize;
    for (_, year, diff) in row_differences(unified, params) {
        let (sum, n) = year_m.entry(year).or_default();
        *sum += diff;
        *n += 1;
        qualifying += 1;
    }

    let mut res: Vec<YearDivergence> = year_m
        .into_iter()
        .map(|(year, (sum, n))| YearDivergence {
            year,
            date: NaiveDate::from_ymd_opt(year, 1, 1),
            avg_difference: sum / n as f64,
            samples: n,
        })
        .collect();
    res.sort_by_key(|r| r.year);

    debug!(
        years = res.len(),
        excluded = unified.len() - qualifying,
        elapsed = ?start.elapsed(),
        "divergence by year"
    );
    res
}

/// Titles ranked by mean divergence, highest first.
///
/// Rows sharing a title (the same title on several services, or listed twice)
/// form one group. Ties rank alphabetically by title.
pub fn divisive_titles(
    unified: &Unified,
    params: DivergenceParams,
    policy: DivisivePolicy,
) -> Vec<TitleDivergence> {
    let start = Instant::now();

    let mut title_m: HashMap<&str, (f64, usize)> = HashMap::new();
    for (i, _, diff) in row_differences(unified, params) {
        let (sum, n) = title_m.entry(unified.title[i].as_str()).or_default();
        *sum += diff;
        *n += 1;
    }

    let mut res: Vec<TitleDivergence> = title_m
        .into_iter()
        .filter(|(_, (_, n))| *n >= policy.min_samples)
        .map(|(title, (sum, n))| TitleDivergence {
            title: title.to_string(),
            avg_difference: sum / n as f64,
            samples: n,
        })
        .collect();
    res.sort_by(|a, b| {
        b.avg_difference
            .partial_cmp(&a.avg_difference)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.title.cmp(&b.title))
    });
    if let Some(limit) = policy.limit {
        res.truncate(limit);
    }

    debug!(titles = res.len(), elapsed = ?start.elapsed(), "divisive titles");
    res
}

pub fn divergence_by_year_frame(res: &[YearDivergence]) -> PolarsResult<DataFrame> {
    df!(
        "year" => res.iter().map(|r| r.year).collect::<Vec<_>>(),
        "date" => res
            .iter()
            .map(|r| r.date.map(|d| d.format("%Y-%m-%d").to_string()))
            .collect::<Vec<_>>(),
        "avg_difference" => res.iter().map(|r| r.avg_difference).collect::<Vec<_>>(),
        "samples" => res.iter().map(|r| r.samples as u64).collect::<Vec<_>>()
    )
}

pub fn divisive_titles_frame(res: &[TitleDivergence]) -> PolarsResult<DataFrame> {
    df!(
        "title" => res.iter().map(|r| r.title.as_str()).collect::<Vec<_>>(),
        "avg_difference" => res.iter().map(|r| r.avg_difference).collect::<Vec<_>>(),
        "samples" => res.iter().map(|r| r.samples as u64).collect::<Vec<_>>()
    )
}

// SELECT TO_DATE(year::text, 'YYYY') AS year,
//        AVG(ABS(CAST(SPLIT_PART(imdb, '/', 1) AS FLOAT) * 10
//              - CAST(SPLIT_PART(rotten_tomatoes, '/', 1) AS FLOAT))) AS avg_difference
// FROM unified
// WHERE year >= 2000
//   AND imdb IS NOT NULL
//   AND rotten_tomatoes IS NOT NULL
// GROUP BY 1
// ORDER BY 1;
//
// The by-title variant groups on title and orders by avg_difference DESC.

#[cfg(test)]
mod test_divergence {
    use super::*;
    use crate::data::{GenreTable, Service};
    use crate::unify::fixtures::*;
    use crate::unify::unify_tables;
    use pretty_assertions::assert_eq;

    #[test]
    fn same_title_on_two_services() {
        let amazon = catalog(
            Service::Amazon,
            &[("Movie A", Some("0"), Some(2005), None, Some("7.5/10"), Some("80/100"))],
        );
        let netflix = catalog(
            Service::Netflix,
            &[("Movie A", Some("0"), Some(2005), None, Some("6.0/10"), Some("50/100"))],
        );
        let unified = unify_tables(&[&amazon, &netflix], &GenreTable::empty());

        let by_year = divergence_by_year(&unified, DivergenceParams::default());
        assert_eq!(
            by_year,
            vec![YearDivergence {
                year: 2005,
                date: NaiveDate::from_ymd_opt(2005, 1, 1),
                avg_difference: 7.5,
                samples: 2,
            }]
        );

        let by_title =
            divisive_titles(&unified, DivergenceParams::default(), DivisivePolicy::default());
        assert_eq!(
            by_title,
            vec![TitleDivergence {
                title: "Movie A".into(),
                avg_difference: 7.5,
                samples: 2,
            }]
        );
    }

    #[test]
    fn old_and_incomplete_rows_are_filtered() {
        let hulu = catalog(
            Service::Hulu,
            &[
                ("Old", Some("0"), Some(1995), None, Some("5.0/10"), Some("90/100")),
                ("NoImdb", Some("0"), Some(2003), None, None, Some("90/100")),
                ("NoRt", Some("0"), Some(2003), None, Some("9.0/10"), None),
                ("Bad", Some("0"), Some(2003), None, Some("N/A"), Some("90/100")),
                ("NoYear", Some("0"), None, None, Some("5.0/10"), Some("90/100")),
                ("Kept", Some("0"), Some(2000), None, Some("8.0/10"), Some("70/100")),
            ],
        );
        let unified = unify_tables(&[&hulu], &GenreTable::empty());

        let by_year = divergence_by_year(&unified, DivergenceParams::default());
        assert_eq!(by_year.len(), 1);
        assert_eq!(by_year[0].year, 2000);
        assert_eq!(by_year[0].avg_difference, 10.0);

        let lenient = DivergenceParams {
            min_year: 1990,
            ..DivergenceParams::default()
        };
        let years: Vec<i32> = divergence_by_year(&unified, lenient)
            .iter()
            .map(|r| r.year)
            .collect();
        assert_eq!(years, vec![1995, 2000]);
    }

    #[test]
    fn titles_rank_descending_with_policy() -> PolarsResult<()> {
        let disney = catalog(
            Service::Disney,
            &[
                ("Calm", Some("0"), Some(2010), None, Some("7.0/10"), Some("71/100")),
                ("Wild", Some("0"), Some(2010), None, Some("2.0/10"), Some("95/100")),
                ("Split", Some("0"), Some(2011), None, Some("5.0/10"), Some("80/100")),
                ("Split", Some("1"), Some(2012), None, Some("5.0/10"), Some("60/100")),
                ("Also", Some("0"), Some(2012), None, Some("7.0/10"), Some("51/100")),
            ],
        );
        let unified = unify_tables(&[&disney], &GenreTable::empty());
        let params = DivergenceParams::default();

        let titles: Vec<(String, f64)> =
            divisive_titles(&unified, params, DivisivePolicy::default())
                .into_iter()
                .map(|r| (r.title, r.avg_difference))
                .collect();
        assert_eq!(
            titles,
            vec![
                ("Wild".to_string(), 75.0),
                ("Split".to_string(), 20.0),
                ("Also".to_string(), 19.0),
                ("Calm".to_string(), 1.0),
            ]
        );

        let strict = DivisivePolicy {
            min_samples: 2,
            limit: None,
        };
        let res = divisive_titles(&unified, params, strict);
        assert_eq!(res.len(), 1);
        assert_eq!(res[0].title, "Split");
        assert_eq!(res[0].samples, 2);

        let top = DivisivePolicy {
            min_samples: 1,
            limit: Some(2),
        };
        let res = divisive_titles(&unified, params, top);
        assert_eq!(divisive_titles_frame(&res)?.height(), 2);
        Ok(())
    }

    #[test]
    fn ties_break_by_title() {
        let amazon = catalog(
            Service::Amazon,
            &[
                ("Beta", Some("0"), Some(2010), None, Some("5.0/10"), Some("60/100")),
                ("Alpha", Some("0"), Some(2010), None, Some("5.0/10"), Some("40/100")),
            ],
        );
        let unified = unify_tables(&[&amazon], &GenreTable::empty());
        let res = divisive_titles(
            &unified,
            DivergenceParams::default(),
            DivisivePolicy::default(),
        );
        let titles: Vec<&str> = res.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["Alpha", "Beta"]);
    }

    #[test]
    fn year_frame_carries_iso_date() -> PolarsResult<()> {
        let res = vec![YearDivergence {
            year: 2019,
            date: NaiveDate::from_ymd_opt(2019, 1, 1),
            avg_difference: 3.0,
            samples: 1,
        }];
        let df = divergence_by_year_frame(&res)?;
        assert_eq!(df.column("date")?.str()?.get(0), Some("2019-01-01"));
        Ok(())
    }
}
