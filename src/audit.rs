use polars::prelude::*;
use tracing::info;

use crate::data::Service;
use crate::unify::Unified;

/// Null counts for the three sparsely populated columns.
///
/// A malformed score is present, not missing; only absent values count.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct QualityReport {
    pub rows: usize,
    pub imdb_missing: usize,
    pub age_missing: usize,
    pub rotten_tomatoes_missing: usize,
}

impl QualityReport {
    fn count(&mut self, u: &Unified, i: usize) {
        self.rows += 1;
        self.imdb_missing += u.imdb[i].is_none() as usize;
        self.age_missing += u.age[i].is_none() as usize;
        self.rotten_tomatoes_missing += u.rotten_tomatoes[i].is_none() as usize;
    }
}

pub fn audit(unified: &Unified) -> QualityReport {
    let mut report = QualityReport::default();
    for i in 0..unified.len() {
        report.count(unified, i);
    }
    info!(
        rows = report.rows,
        imdb_missing = report.imdb_missing,
        age_missing = report.age_missing,
        rotten_tomatoes_missing = report.rotten_tomatoes_missing,
        "audited unified catalog"
    );
    report
}

/// The same counts split by service. Services without rows are omitted.
pub fn audit_by_service(unified: &Unified) -> Vec<(Service, QualityReport)> {
    let mut reports = [QualityReport::default(); 4];
    for (i, service) in unified.service.iter().enumerate() {
        reports[*service as usize].count(unified, i);
    }
    Service::ALL
        .into_iter()
        .zip(reports)
        .filter(|(_, report)| report.rows > 0)
        .collect()
}

pub fn audit_frame(report: &QualityReport) -> PolarsResult<DataFrame> {
    df!(
        "imdb_missing" => [report.imdb_missing as u64],
        "age_missing" => [report.age_missing as u64],
        "rotten_tomatoes_missing" => [report.rotten_tomatoes_missing as u64],
        "rows" => [report.rows as u64]
    )
}

pub fn audit_by_service_frame(reports: &[(Service, QualityReport)]) -> PolarsResult<DataFrame> {
    let column = |f: fn(&QualityReport) -> usize| -> Vec<u64> {
        reports.iter().map(|(_, r)| f(r) as u64).collect()
    };
    df!(
        "service" => reports.iter().map(|(s, _)| s.label()).collect::<Vec<_>>(),
        "imdb_missing" => column(|r| r.imdb_missing),
        "age_missing" => column(|r| r.age_missing),
        "rotten_tomatoes_missing" => column(|r| r.rotten_tomatoes_missing),
        "rows" => column(|r| r.rows)
    )
}
