//! Metadata store backed by a flat CSV table
//!
//! The table has exactly four named columns. A table lacking any of them is
//! treated as empty rather than migrated. Saves overwrite the whole file.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, warn};
use wardrobe_common::{Error, ItemRecord, Result};

pub const COL_IMAGE_PATH: &str = "Image Path";
pub const COL_CATEGORY: &str = "Category";
pub const COL_COLOR: &str = "Color";
pub const COL_SEASON: &str = "Season";

/// Canonical header, in write order
pub const HEADER: [&str; 4] = [COL_IMAGE_PATH, COL_CATEGORY, COL_COLOR, COL_SEASON];

/// Ordered collection of item records
///
/// Position is the only identity a record has; indices captured from one load
/// are invalid after any modification.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Catalog {
    items: Vec<ItemRecord>,
}

impl Catalog {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ItemRecord> {
        self.items.get(index)
    }

    pub fn items(&self) -> &[ItemRecord] {
        &self.items
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ItemRecord> {
        self.items.iter()
    }

    pub fn push(&mut self, item: ItemRecord) {
        self.items.push(item);
    }

    /// Remove the record at `index`, shifting later records down by one
    pub fn remove(&mut self, index: usize) -> Option<ItemRecord> {
        if index < self.items.len() {
            Some(self.items.remove(index))
        } else {
            None
        }
    }
}

impl From<Vec<ItemRecord>> for Catalog {
    fn from(items: Vec<ItemRecord>) -> Self {
        Self { items }
    }
}

impl<'a> IntoIterator for &'a Catalog {
    type Item = &'a ItemRecord;
    type IntoIter = std::slice::Iter<'a, ItemRecord>;

    fn into_iter(self) -> Self::IntoIter {
        self.items.iter()
    }
}

/// Positions of the required columns in a table header
struct ColumnMap {
    image_path: usize,
    category: usize,
    color: usize,
    season: usize,
}

impl ColumnMap {
    fn from_header(header: &csv::StringRecord) -> Option<Self> {
        let find = |name: &str| header.iter().position(|h| h == name);
        Some(Self {
            image_path: find(COL_IMAGE_PATH)?,
            category: find(COL_CATEGORY)?,
            color: find(COL_COLOR)?,
            season: find(COL_SEASON)?,
        })
    }

    fn record(&self, row: &csv::StringRecord) -> ItemRecord {
        let cell = |i: usize| row.get(i).unwrap_or_default().to_string();
        ItemRecord {
            image_path: cell(self.image_path),
            category: cell(self.category),
            color: cell(self.color),
            season: cell(self.season),
        }
    }
}

/// Reads and writes the catalog table on disk
#[derive(Debug, Clone)]
pub struct MetadataStore {
    path: PathBuf,
}

impl MetadataStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the persisted table
    ///
    /// A missing file, an empty file, or a header without all four required
    /// columns yields an empty catalog.
    pub fn load(&self) -> Result<Catalog> {
        let bytes = match std::fs::read(&self.path) {
            Ok(bytes) => bytes,
            Err(e) if e.kind() == ErrorKind::NotFound => {
                debug!(path = %self.path.display(), "Metadata table not found, starting empty");
                return Ok(Catalog::new());
            }
            Err(e) => return Err(e.into()),
        };

        parse_table(&bytes, &self.path)
    }

    /// Overwrite the table with the full catalog
    pub fn save(&self, catalog: &Catalog) -> Result<()> {
        let bytes = render_table(catalog)?;
        std::fs::write(&self.path, bytes)?;
        debug!(path = %self.path.display(), rows = catalog.len(), "Metadata table saved");
        Ok(())
    }

    /// Load, append one record, save
    pub fn append(&self, record: ItemRecord) -> Result<Catalog> {
        let mut catalog = self.load()?;
        catalog.push(record);
        self.save(&catalog)?;
        Ok(catalog)
    }
}

fn parse_table(bytes: &[u8], path: &Path) -> Result<Catalog> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .from_reader(bytes);

    let header = reader
        .headers()
        .map_err(|e| Error::Store(format!("{}: {}", path.display(), e)))?
        .clone();

    let Some(columns) = ColumnMap::from_header(&header) else {
        warn!(
            path = %path.display(),
            header = ?header.iter().collect::<Vec<_>>(),
            "Metadata table is missing required columns, treating as empty"
        );
        return Ok(Catalog::new());
    };

    let mut catalog = Catalog::new();
    for row in reader.records() {
        let row = row.map_err(|e| Error::Store(format!("{}: {}", path.display(), e)))?;
        catalog.push(columns.record(&row));
    }

    Ok(catalog)
}

fn render_table(catalog: &Catalog) -> Result<Vec<u8>> {
    let mut writer = csv::WriterBuilder::new()
        .terminator(csv::Terminator::Any(b'\n'))
        .from_writer(Vec::new());

    let store_err = |e: csv::Error| Error::Store(e.to_string());

    writer.write_record(HEADER).map_err(store_err)?;
    for item in catalog {
        writer
            .write_record([
                item.image_path.as_str(),
                item.category.as_str(),
                item.color.as_str(),
                item.season.as_str(),
            ])
            .map_err(store_err)?;
    }

    writer
        .into_inner()
        .map_err(|e| Error::Store(e.to_string()))
}
