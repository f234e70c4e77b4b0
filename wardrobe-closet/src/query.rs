//! Catalog filtering and facet listing

use std::collections::HashSet;

use serde::Serialize;
use wardrobe_common::ItemRecord;

use crate::store::Catalog;

/// Distinct values per filterable dimension, in first-seen order
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct Facets {
    pub colors: Vec<String>,
    pub categories: Vec<String>,
    pub seasons: Vec<String>,
}

/// Selected values per dimension; an empty set does not filter
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Selection {
    pub colors: HashSet<String>,
    pub categories: HashSet<String>,
    pub seasons: HashSet<String>,
}

impl Selection {
    /// Build a selection from repeated query pairs (`color=Red&color=Blue&season=Fall`)
    ///
    /// Unknown keys are ignored.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut selection = Self::default();
        for (key, value) in pairs {
            match key.as_ref() {
                "color" => {
                    selection.colors.insert(value.into());
                }
                "category" => {
                    selection.categories.insert(value.into());
                }
                "season" => {
                    selection.seasons.insert(value.into());
                }
                _ => {}
            }
        }
        selection
    }

    pub fn is_empty(&self) -> bool {
        self.colors.is_empty() && self.categories.is_empty() && self.seasons.is_empty()
    }

    fn matches(&self, item: &ItemRecord) -> bool {
        fn allowed(set: &HashSet<String>, value: &str) -> bool {
            set.is_empty() || set.contains(value)
        }

        allowed(&self.colors, &item.color)
            && allowed(&self.categories, &item.category)
            && allowed(&self.seasons, &item.season)
    }
}

/// A record together with its position in the unfiltered catalog
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CatalogEntry {
    pub index: usize,
    #[serde(flatten)]
    pub item: ItemRecord,
}

/// Distinct colors, categories and seasons present in the catalog
pub fn facets(catalog: &Catalog) -> Facets {
    fn push_unique(values: &mut Vec<String>, seen: &mut HashSet<String>, value: &str) {
        if seen.insert(value.to_string()) {
            values.push(value.to_string());
        }
    }

    let mut facets = Facets::default();
    let (mut colors, mut categories, mut seasons) =
        (HashSet::new(), HashSet::new(), HashSet::new());

    for item in catalog {
        push_unique(&mut facets.colors, &mut colors, &item.color);
        push_unique(&mut facets.categories, &mut categories, &item.category);
        push_unique(&mut facets.seasons, &mut seasons, &item.season);
    }

    facets
}

/// Keep records matching every non-empty dimension of the selection
pub fn filter(catalog: &Catalog, selection: &Selection) -> Vec<CatalogEntry> {
    catalog
        .iter()
        .enumerate()
        .filter(|(_, item)| selection.matches(item))
        .map(|(index, item)| CatalogEntry {
            index,
            item: item.clone(),
        })
        .collect()
}
