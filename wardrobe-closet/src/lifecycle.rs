//! Item lifecycle: adding and deleting wardrobe items
//!
//! Adding writes the image first and appends the row second. Deleting removes
//! the image first and the row second. There is no update; retagging an item
//! means deleting and adding it again.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};

use tracing::{debug, info, warn};
use wardrobe_common::config::RootLayout;
use wardrobe_common::{Error, ItemRecord, Result};

use crate::store::{Catalog, MetadataStore};

/// Tags supplied with a new item
#[derive(Debug, Clone, Default)]
pub struct NewItem {
    pub category: String,
    pub color: String,
    pub season: String,
}

/// A freshly stored item and its position in the catalog
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddedItem {
    pub index: usize,
    pub record: ItemRecord,
}

/// The wardrobe on disk: image folder plus metadata table
#[derive(Debug, Clone)]
pub struct Closet {
    layout: RootLayout,
    store: MetadataStore,
}

impl Closet {
    pub fn new(layout: RootLayout) -> Self {
        let store = MetadataStore::new(layout.table_path());
        Self { layout, store }
    }

    /// Open a closet, creating its folders if needed
    pub fn open(layout: RootLayout) -> Result<Self> {
        layout.ensure_directories()?;
        Ok(Self::new(layout))
    }

    pub fn layout(&self) -> &RootLayout {
        &self.layout
    }

    pub fn store(&self) -> &MetadataStore {
        &self.store
    }

    /// Load the current catalog
    pub fn load(&self) -> Result<Catalog> {
        self.store.load()
    }

    /// Filesystem location of a stored image path
    pub fn resolve_image_path(&self, stored: &str) -> PathBuf {
        self.layout.resolve(stored)
    }

    /// Store an uploaded image and record its tags
    ///
    /// Returns `Ok(None)` without touching disk when no image was supplied.
    /// An existing image with the same file name is overwritten.
    pub fn add(
        &self,
        image: Option<&[u8]>,
        filename: &str,
        tags: NewItem,
    ) -> Result<Option<AddedItem>> {
        let Some(bytes) = image else {
            debug!("No image supplied, nothing added");
            return Ok(None);
        };

        let file_name = upload_file_name(filename)?;
        std::fs::create_dir_all(self.layout.image_dir())?;
        let target = self.layout.image_dir().join(file_name);
        std::fs::write(&target, bytes)?;

        let record = ItemRecord {
            image_path: self.layout.stored_image_path(file_name),
            category: tags.category,
            color: tags.color,
            season: tags.season,
        };
        let catalog = self.store.append(record.clone())?;
        let index = catalog.len().saturating_sub(1);

        info!(
            index,
            image_path = %record.image_path,
            category = %record.category,
            color = %record.color,
            season = %record.season,
            bytes = bytes.len(),
            "Item added"
        );

        Ok(Some(AddedItem { index, record }))
    }

    /// Delete the item at `index` of a freshly loaded catalog
    ///
    /// An empty catalog makes this a no-op. The backing image is removed if it
    /// exists; a missing image is not an error.
    pub fn delete(&self, index: usize) -> Result<Option<ItemRecord>> {
        self.delete_checked(index, None)
    }

    /// Delete the item at `index` only if it still refers to `expected_path`
    ///
    /// Guards against indices captured before another modification.
    pub fn delete_checked(
        &self,
        index: usize,
        expected_path: Option<&str>,
    ) -> Result<Option<ItemRecord>> {
        let mut catalog = self.store.load()?;
        if catalog.is_empty() {
            debug!(index, "Delete requested on empty catalog");
            return Ok(None);
        }

        let Some(record) = catalog.get(index) else {
            return Err(Error::NotFound(format!(
                "No item at index {} (catalog has {} items)",
                index,
                catalog.len()
            )));
        };

        if let Some(expected) = expected_path {
            if record.image_path != expected {
                return Err(Error::Conflict(format!(
                    "Item at index {} is {}, not {}",
                    index, record.image_path, expected
                )));
            }
        }

        remove_image(&self.resolve_image_path(&record.image_path))?;

        let removed = catalog.remove(index);
        self.store.save(&catalog)?;

        if let Some(item) = &removed {
            info!(index, image_path = %item.image_path, remaining = catalog.len(), "Item deleted");
        }
        Ok(removed)
    }
}

/// Final path component of an uploaded file name
///
/// Directory parts are dropped so an upload cannot write outside the image
/// folder; both separator styles are honoured.
pub fn upload_file_name(filename: &str) -> Result<&str> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(Error::InvalidInput(format!(
            "Invalid image file name: {:?}",
            filename
        )));
    }
    Ok(name)
}

fn remove_image(path: &Path) -> Result<()> {
    match std::fs::remove_file(path) {
        Ok(()) => {
            debug!(path = %path.display(), "Image removed");
            Ok(())
        }
        Err(e) if e.kind() == ErrorKind::NotFound => {
            warn!(path = %path.display(), "Image already missing, removing row only");
            Ok(())
        }
        Err(e) => Err(e.into()),
    }
}
