use std::time::Instant;

use memchr::memmem;
use polars::prelude::*;
use tracing::debug;

use crate::data::Service;
use crate::unify::Unified;

#[derive(Debug, Clone, PartialEq)]
pub struct FamilyShare {
    pub service: Service,
    pub family: usize,
    pub total: usize,
    /// `family / total` as a percentage.
    pub percent: f64,
}

/// Substring matcher over lower-cased genre strings.
pub struct FamilyMatcher {
    finders: Vec<memmem::Finder<'static>>,
}

impl FamilyMatcher {
    pub fn new<S: AsRef<str>>(keywords: &[S]) -> Self {
        let finders = keywords
            .iter()
            .map(|k| k.as_ref().trim().to_lowercase())
            .filter(|k| !k.is_empty())
            .map(|k| memmem::Finder::new(k.as_bytes()).into_owned())
            .collect();
        FamilyMatcher { finders }
    }

    /// Case-insensitive substring test; partial words count ("Kidsplay" matches "kids").
    pub fn is_family(&self, genre: Option<&str>) -> bool {
        let Some(genre) = genre else {
            return false;
        };
        let genre = genre.to_lowercase();
        self.finders
            .iter()
            .any(|finder| finder.find(genre.as_bytes()).is_some())
    }
}

/// Share of family rows per service. Null genres count toward the
/// denominator only. Services without rows are omitted.
pub fn family_share(unified: &Unified, matcher: &FamilyMatcher) -> Vec<FamilyShare> {
    let start = Instant::now();

    let mut counts = [(0usize, 0usize); 4];
    for (service, genre) in unified.service.iter().zip(unified.genre.iter()) {
        let (family, total) = &mut counts[*service as usize];
        *total += 1;
        if matcher.is_family(genre.as_deref()) {
            *family += 1;
        }
    }

    let res: Vec<FamilyShare> = Service::ALL
        .into_iter()
        .zip(counts)
        .filter(|(_, (_, total))| *total > 0)
        .map(|(service, (family, total))| FamilyShare {
            service,
            family,
            total,
            percent: family as f64 / total as f64 * 100.0,
        })
        .collect();

    debug!(groups = res.len(), elapsed = ?start.elapsed(), "family share");
    res
}

pub fn family_share_frame(res: &[FamilyShare]) -> PolarsResult<DataFrame> {
    df!(
        "service" => res.iter().map(|r| r.service.label()).collect::<Vec<_>>(),
        "family" => res.iter().map(|r| r.family as u64).collect::<Vec<_>>(),
        "total" => res.iter().map(|r| r.total as u64).collect::<Vec<_>>(),
        "percent" => res.iter().map(|r| r.percent).collect::<Vec<_>>()
    )
}

// SELECT service,
//        100.0 * SUM(CASE WHEN genre ILIKE '%kids%'
//                           OR genre ILIKE '%family%'
//                           OR genre ILIKE '%children%' THEN 1 ELSE 0 END)
//              / COUNT(*) AS percent
// FROM unified
// GROUP BY service;
