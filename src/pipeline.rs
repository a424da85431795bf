//! Loader -> Unifier -> Auditor -> Analytics, once per run.

use std::fs::{self, File};
use std::path::{Path, PathBuf};
use std::time::Instant;

use polars::prelude::*;
use tracing::{info, instrument};

use crate::audit::{QualityReport, audit, audit_by_service, audit_by_service_frame, audit_frame};
use crate::config::{AnalysisConfig, Config, OutputFormat};
use crate::data::{CatalogData, Service};
use crate::divergence::{
    DivergenceParams, TitleDivergence, YearDivergence, divergence_by_year,
    divergence_by_year_frame, divisive_titles, divisive_titles_frame,
};
use crate::error::Result;
use crate::family_share::{FamilyMatcher, FamilyShare, family_share, family_share_frame};
use crate::type_scores::{TypeScore, type_scores, type_scores_frame};
use crate::unify::{Unified, unify};

/// Every output relation of one run.
#[derive(Debug, Clone)]
pub struct Report {
    pub audit: QualityReport,
    pub audit_by_service: Vec<(Service, QualityReport)>,
    pub family_share: Vec<FamilyShare>,
    pub type_scores: Vec<TypeScore>,
    pub divergence_by_year: Vec<YearDivergence>,
    pub divisive_titles: Vec<TitleDivergence>,
    /// The unified relation, when requested through `output.include_unified`.
    pub unified: Option<DataFrame>,
}

impl Report {
    /// Output relations as named frames, in a fixed order.
    pub fn frames(&self) -> PolarsResult<Vec<(&'static str, DataFrame)>> {
        let mut frames = vec![
            ("audit", audit_frame(&self.audit)?),
            (
                "audit_by_service",
                audit_by_service_frame(&self.audit_by_service)?,
            ),
            ("family_share", family_share_frame(&self.family_share)?),
            ("type_scores", type_scores_frame(&self.type_scores)?),
            (
                "divergence_by_year",
                divergence_by_year_frame(&self.divergence_by_year)?,
            ),
            (
                "divisive_titles",
                divisive_titles_frame(&self.divisive_titles)?,
            ),
        ];
        if let Some(unified) = &self.unified {
            frames.push(("unified", unified.clone()));
        }
        Ok(frames)
    }

    /// Write one file per relation into `dir`, creating it if needed.
    pub fn write_to(&self, dir: &Path, format: OutputFormat) -> Result<Vec<PathBuf>> {
        fs::create_dir_all(dir)?;
        let mut written = Vec::new();
        for (name, mut df) in self.frames()? {
            let path = dir.join(format!("{name}.{}", format.extension()));
            let file = File::create(&path)?;
            match format {
                OutputFormat::Csv => CsvWriter::new(file).finish(&mut df)?,
                OutputFormat::Parquet => {
                    ParquetWriter::new(file).finish(&mut df)?;
                }
            }
            info!(path = %path.display(), rows = df.height(), "wrote result");
            written.push(path);
        }
        Ok(written)
    }
}

/// Run the auditor and all four queries over one unified relation.
pub fn analyze(unified: &Unified, analysis: &AnalysisConfig) -> Report {
    let matcher = FamilyMatcher::new(analysis.family_keywords.as_slice());
    let params = DivergenceParams {
        min_year: analysis.min_year,
        imdb_scale: analysis.imdb_scale,
    };

    Report {
        audit: audit(unified),
        audit_by_service: audit_by_service(unified),
        family_share: family_share(unified, &matcher),
        type_scores: type_scores(unified),
        divergence_by_year: divergence_by_year(unified, params),
        divisive_titles: divisive_titles(unified, params, analysis.divisive),
        unified: None,
    }
}

/// Load every source named by `config`, then unify and analyze.
#[instrument(skip_all)]
pub fn run(config: &Config) -> Result<Report> {
    let start = Instant::now();

    let data = CatalogData::load(&config.sources, &config.columns)?;
    let unified = unify(&data);
    let mut report = analyze(&unified, &config.analysis);
    if config.output.include_unified {
        report.unified = Some(unified.to_frame()?);
    }

    info!(rows = unified.len(), elapsed = ?start.elapsed(), "analysis complete");
    Ok(report)
}

#[cfg(test)]
mod test_pipeline {
    use super::*;
    use crate::data::GenreTable;
    use crate::unify::fixtures::*;
    use crate::unify::unify_tables;
    use tempfile::TempDir;

    fn sample() -> Unified {
        let amazon = catalog(
            Service::Amazon,
            &[("Movie A", Some("0"), Some(2005), Some("13+"), Some("7.5/10"), Some("80/100"))],
        );
        let netflix = catalog(
            Service::Netflix,
            &[("Movie A", Some("0"), Some(2005), None, Some("6.0/10"), Some("50/100"))],
        );
        unify_tables(&[&amazon, &netflix], &GenreTable::empty())
    }

    #[test]
    fn analyze_fills_every_relation() {
        let report = analyze(&sample(), &AnalysisConfig::default());
        assert_eq!(report.audit.rows, 2);
        assert_eq!(report.audit.age_missing, 1);
        assert_eq!(report.audit_by_service.len(), 2);
        assert_eq!(report.family_share.len(), 2);
        assert!(report.family_share.iter().all(|r| r.percent == 0.0));
        assert_eq!(report.type_scores.len(), 2);
        assert_eq!(report.divergence_by_year[0].avg_difference, 7.5);
        assert_eq!(report.divisive_titles[0].samples, 2);
    }

    #[test]
    fn writes_one_file_per_relation() -> Result<()> {
        let dir = TempDir::new()?;
        let report = analyze(&sample(), &AnalysisConfig::default());

        let written = report.write_to(dir.path(), OutputFormat::Csv)?;
        assert_eq!(written.len(), 6);
        assert!(written.iter().all(|p| p.exists()));

        let text = fs::read_to_string(dir.path().join("divergence_by_year.csv"))?;
        assert!(text.starts_with("year,date,avg_difference,samples"));
        assert!(text.contains("2005,2005-01-01,7.5,2"));
        Ok(())
    }

    #[test]
    fn unified_relation_is_exported_on_request() -> Result<()> {
        let dir = TempDir::new()?;
        let unified = sample();
        let mut report = analyze(&unified, &AnalysisConfig::default());
        report.unified = Some(unified.to_frame()?);

        let written = report.write_to(dir.path(), OutputFormat::Csv)?;
        assert_eq!(written.len(), 7);
        let text = fs::read_to_string(dir.path().join("unified.csv"))?;
        assert!(text.starts_with("service,source_row,title,type,year,age,imdb,rotten_tomatoes,genre"));
        assert_eq!(text.lines().count(), 3);
        Ok(())
    }

    #[test]
    fn parquet_output_round_trips_row_counts() -> Result<()> {
        let dir = TempDir::new()?;
        let report = analyze(&sample(), &AnalysisConfig::default());
        report.write_to(dir.path(), OutputFormat::Parquet)?;

        let df = ParquetReader::new(File::open(dir.path().join("family_share.parquet"))?)
            .finish()?;
        assert_eq!(df.height(), 2);
        Ok(())
    }
}
