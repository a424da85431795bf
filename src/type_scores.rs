use std::time::Instant;

use ahash::{HashMap, HashMapExt};
use polars::prelude::*;
use tracing::debug;

use crate::data::Service;
use crate::rating::Rating;
use crate::unify::{ContentType, Unified};

#[derive(Debug, Clone, PartialEq)]
pub struct TypeScore {
    pub service: Service,
    pub content_type: ContentType,
    pub avg_score: f64,
    pub samples: usize,
}

/// Mean rotten_tomatoes score per (service, content type).
///
/// Null and malformed scores are left out of the mean; a group with no
/// usable score does not appear. Ordered by service, then movie before tv.
pub fn type_scores(unified: &Unified) -> Vec<TypeScore> {
    let start = Instant::now();

    let mut groups: HashMap<(Service, ContentType), (f64, usize)> = HashMap::new();
    let mut excluded = 0usize;

    for ((service, content_type), rating) in unified
        .service
        .iter()
        .zip(unified.content_type.iter())
        .zip(unified.rotten_tomatoes.iter())
    {
        if let Some(score) = rating.as_ref().and_then(Rating::value) {
            let (sum, n) = groups.entry((*service, *content_type)).or_default();
            *sum += score;
            *n += 1;
        } else {
            excluded += 1;
        }
    }

    let mut res: Vec<TypeScore> = groups
        .into_iter()
        .map(|((service, content_type), (sum, n))| TypeScore {
            service,
            content_type,
            avg_score: sum / n as f64,
            samples: n,
        })
        .collect();
    res.sort_by_key(|r| (r.service, r.content_type));

    debug!(groups = res.len(), excluded, elapsed = ?start.elapsed(), "type scores");
    res
}

pub fn type_scores_frame(res: &[TypeScore]) -> PolarsResult<DataFrame> {
    df!(
        "service" => res.iter().map(|r| r.service.label()).collect::<Vec<_>>(),
        "content_type" => res.iter().map(|r| r.content_type.label()).collect::<Vec<_>>(),
        "avg_score" => res.iter().map(|r| r.avg_score).collect::<Vec<_>>(),
        "samples" => res.iter().map(|r| r.samples as u64).collect::<Vec<_>>()
    )
}

// SELECT service,
//        CASE WHEN type = 0 THEN 'movie' ELSE 'tv' END AS content_type,
//        AVG(CAST(SPLIT_PART(rotten_tomatoes, '/', 1) AS INT)) AS avg_score
// FROM unified
// GROUP BY 1, 2;
