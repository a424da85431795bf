use std::fmt;
use std::fs::File;
use std::path::{Path, PathBuf};

use polars::prelude::*;
use tracing::{debug, info};

use crate::config::{ColumnMap, SourcesConfig};
use crate::error::LoadError;

/// The four streaming services, in concatenation order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Service {
    Amazon,
    Hulu,
    Netflix,
    Disney,
}

impl Service {
    pub const ALL: [Service; 4] = [
        Service::Amazon,
        Service::Hulu,
        Service::Netflix,
        Service::Disney,
    ];

    pub fn label(self) -> &'static str {
        match self {
            Service::Amazon => "amazon",
            Service::Hulu => "hulu",
            Service::Netflix => "netflix",
            Service::Disney => "disney",
        }
    }
}

impl fmt::Display for Service {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

// One service's catalog. The fields the pipeline reads are pulled out as
// raw strings; everything else stays in `frame`.
//
//     title            text NOT NULL
//     type             movie/tv flag
//     year             integer
//     age              text
//     imdb             text, "X.Y/10"
//     rotten_tomatoes  text, "N/100"

pub struct CatalogTable {
    pub service: Service,
    pub frame: DataFrame,
    pub title: Vec<String>,
    pub kind: Vec<Option<String>>,
    pub year: Vec<Option<i32>>,
    pub age: Vec<Option<String>>,
    pub imdb: Vec<Option<String>>,
    pub rotten_tomatoes: Vec<Option<String>>,
}

impl CatalogTable {
    pub fn from_frame(
        service: Service,
        frame: DataFrame,
        columns: &ColumnMap,
    ) -> Result<Self, LoadError> {
        let table = service.label();
        let title = str_column(&frame, table, &columns.title)?
            .into_iter()
            .map(Option::unwrap_or_default)
            .collect();
        let year = str_column(&frame, table, &columns.year)?
            .into_iter()
            .map(|year| year.and_then(|y| parse_year(&y)))
            .collect();

        Ok(CatalogTable {
            service,
            title,
            kind: str_column(&frame, table, &columns.kind)?,
            year,
            age: str_column(&frame, table, &columns.age)?,
            imdb: str_column(&frame, table, &columns.imdb)?,
            rotten_tomatoes: str_column(&frame, table, &columns.rotten_tomatoes)?,
            frame,
        })
    }

    pub fn len(&self) -> usize {
        self.title.len()
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
    }
}

// film  text NOT NULL
// genre text
pub struct GenreTable {
    pub film: Vec<String>,
    pub genre: Vec<Option<String>>,
}

impl GenreTable {
    pub fn from_frame(frame: &DataFrame, columns: &ColumnMap) -> Result<Self, LoadError> {
        let film = str_column(frame, "genres", &columns.film)?;
        let genre = str_column(frame, "genres", &columns.genre)?;

        // A genre row without a film name can never match a title.
        let (film, genre) = film
            .into_iter()
            .zip(genre)
            .filter_map(|(film, genre)| film.map(|film| (film, genre)))
            .unzip();
        Ok(GenreTable { film, genre })
    }

    pub fn empty() -> Self {
        GenreTable {
            film: Vec::new(),
            genre: Vec::new(),
        }
    }

    pub fn len(&self) -> usize {
        self.film.len()
    }

    pub fn is_empty(&self) -> bool {
        self.film.is_empty()
    }
}

/// All five source relations of one analysis run.
pub struct CatalogData {
    pub amazon: CatalogTable,
    pub hulu: CatalogTable,
    pub netflix: CatalogTable,
    pub disney: CatalogTable,
    pub genres: GenreTable,
}

impl CatalogData {
    pub fn load(sources: &SourcesConfig, columns: &ColumnMap) -> Result<Self, LoadError> {
        let load = |service: Service| {
            let path = sources.catalog_path(service);
            let frame = read_frame(service.label(), &path)?;
            let table = CatalogTable::from_frame(service, frame, columns)?;
            info!(service = %service, rows = table.len(), path = %path.display(), "loaded catalog");
            Ok::<_, LoadError>(table)
        };

        let amazon = load(Service::Amazon)?;
        let hulu = load(Service::Hulu)?;
        let netflix = load(Service::Netflix)?;
        let disney = load(Service::Disney)?;

        let path = sources.genres_path();
        let genres = GenreTable::from_frame(&read_frame("genres", &path)?, columns)?;
        info!(rows = genres.len(), path = %path.display(), "loaded genre table");

        Ok(CatalogData {
            amazon,
            hulu,
            netflix,
            disney,
            genres,
        })
    }

    pub fn table(&self, service: Service) -> &CatalogTable {
        match service {
            Service::Amazon => &self.amazon,
            Service::Hulu => &self.hulu,
            Service::Netflix => &self.netflix,
            Service::Disney => &self.disney,
        }
    }

    pub fn tables(&self) -> [&CatalogTable; 4] {
        Service::ALL.map(|service| self.table(service))
    }
}

/// Read a table from a `.csv` or `.parquet` file.
///
/// CSV is read with schema inference turned off so every column comes back
/// as a nullable string.
pub fn read_frame(table: &str, path: &Path) -> Result<DataFrame, LoadError> {
    let unreadable = |source: PolarsError| LoadError::Unreadable {
        table: table.to_string(),
        path: path.to_path_buf(),
        source,
    };

    let extension = path
        .extension()
        .and_then(|ext| ext.to_str())
        .map(str::to_ascii_lowercase);
    debug!(table, path = %path.display(), ?extension, "reading table");

    match extension.as_deref() {
        Some("csv") => CsvReadOptions::default()
            .with_has_header(true)
            .with_infer_schema_length(Some(0))
            .try_into_reader_with_file_path(Some(PathBuf::from(path)))
            .and_then(|reader| reader.finish())
            .map_err(unreadable),
        Some("parquet") => {
            let file = File::open(path).map_err(|e| unreadable(e.into()))?;
            ParquetReader::new(file).finish().map_err(unreadable)
        }
        _ => Err(LoadError::UnsupportedFormat {
            table: table.to_string(),
            path: path.to_path_buf(),
        }),
    }
}

fn str_column(
    frame: &DataFrame,
    table: &str,
    name: &str,
) -> Result<Vec<Option<String>>, LoadError> {
    let column = frame
        .column(name)
        .map_err(|_| LoadError::MissingColumn {
            table: table.to_string(),
            column: name.to_string(),
        })?;
    let polars_err = |source: PolarsError| LoadError::Polars {
        table: table.to_string(),
        source,
    };

    let column = column.cast(&DataType::String).map_err(polars_err)?;
    let values = column
        .str()
        .map_err(polars_err)?
        .into_iter()
        .map(|opt| opt.map(|s| s.to_string()))
        .collect();
    Ok(values)
}

fn parse_year(raw: &str) -> Option<i32> {
    let raw = raw.trim();
    raw.parse::<i32>()
        .ok()
        .or_else(|| raw.parse::<f64>().ok().filter(|y| y.fract() == 0.0).map(|y| y as i32))
}

#[cfg(test)]
mod test_data {
    use super::*;
    use std::io::Write;
    use tempfile::TempDir;

    fn write(dir: &TempDir, name: &str, body: &str) -> std::io::Result<PathBuf> {
        let path = dir.path().join(name);
        File::create(&path)?.write_all(body.as_bytes())?;
        Ok(path)
    }

    #[test]
    fn csv_loads_as_raw_strings() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = write(
            &dir,
            "hulu.csv",
            "title,type,year,age,imdb,rotten_tomatoes,extra\n\
             Movie A,0,2005,13+,7.5/10,80/100,x\n\
             Show B,1,1999,,,,y\n",
        )?;

        let frame = read_frame("hulu", &path)?;
        let table = CatalogTable::from_frame(Service::Hulu, frame, &ColumnMap::default())?;

        assert_eq!(table.len(), 2);
        assert_eq!(table.title, vec!["Movie A", "Show B"]);
        assert_eq!(table.year, vec![Some(2005), Some(1999)]);
        assert_eq!(table.imdb, vec![Some("7.5/10".to_string()), None]);
        assert_eq!(table.age, vec![Some("13+".to_string()), None]);
        assert!(table.frame.column("extra").is_ok());
        Ok(())
    }

    #[test]
    fn missing_column_is_a_load_error() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = write(&dir, "disney.csv", "title,type,year,age,imdb\nA,0,2000,,\n")?;

        let frame = read_frame("disney", &path)?;
        let res = CatalogTable::from_frame(Service::Disney, frame, &ColumnMap::default());
        assert!(matches!(
            res,
            Err(LoadError::MissingColumn { ref column, .. }) if column == "rotten_tomatoes"
        ));
        Ok(())
    }

    #[test]
    fn unreadable_and_unsupported_sources() {
        let res = read_frame("amazon", Path::new("/no/such/amazon.csv"));
        assert!(matches!(res, Err(LoadError::Unreadable { .. })));

        let res = read_frame("amazon", Path::new("amazon.json"));
        assert!(matches!(res, Err(LoadError::UnsupportedFormat { .. })));
    }

    #[test]
    fn genre_rows_without_film_are_dropped() -> Result<(), Box<dyn std::error::Error>> {
        let dir = TempDir::new()?;
        let path = write(&dir, "genres.csv", "film,genre\nMovie A,Drama\n,Kids\nShow B,\n")?;

        let genres = GenreTable::from_frame(&read_frame("genres", &path)?, &ColumnMap::default())?;
        assert_eq!(genres.film, vec!["Movie A", "Show B"]);
        assert_eq!(genres.genre, vec![Some("Drama".to_string()), None]);
        Ok(())
    }

    #[test]
    fn year_parsing() {
        assert_eq!(parse_year("2005"), Some(2005));
        assert_eq!(parse_year(" 2005.0 "), Some(2005));
        assert_eq!(parse_year("2005.5"), None);
        assert_eq!(parse_year("unknown"), None);
    }
}
