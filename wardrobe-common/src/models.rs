//! Wardrobe item record and tag choices
//!
//! Stored tag values are free strings. The enumerations below only describe the
//! fixed choices offered when tagging a new item; `Other` means the caller
//! supplies its own text instead.

use serde::{Deserialize, Serialize};

/// One wardrobe item as persisted in the metadata table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ItemRecord {
    /// Path of the stored image (relative to the root folder, or absolute)
    pub image_path: String,
    pub category: String,
    pub color: String,
    pub season: String,
}

impl ItemRecord {
    pub fn new(
        image_path: impl Into<String>,
        category: impl Into<String>,
        color: impl Into<String>,
        season: impl Into<String>,
    ) -> Self {
        Self {
            image_path: image_path.into(),
            category: category.into(),
            color: color.into(),
            season: season.into(),
        }
    }

    /// Image path with Windows separators turned into forward slashes
    pub fn display_path(&self) -> String {
        normalize_separators(&self.image_path)
    }
}

/// Replace every backslash with a forward slash
pub fn normalize_separators(path: &str) -> String {
    path.replace('\\', "/")
}

/// Clothing category choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Category {
    Hats,
    Shirts,
    Pants,
    Dresses,
    Jackets,
    Sweaters,
    Shorts,
    Skirts,
    Shoes,
    Accessories,
    Other,
}

impl Category {
    pub fn all() -> &'static [Category] {
        use Category::*;
        &[
            Hats, Shirts, Pants, Dresses, Jackets, Sweaters, Shorts, Skirts, Shoes, Accessories,
            Other,
        ]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Category::Hats => "Hats",
            Category::Shirts => "Shirts",
            Category::Pants => "Pants",
            Category::Dresses => "Dresses",
            Category::Jackets => "Jackets",
            Category::Sweaters => "Sweaters",
            Category::Shorts => "Shorts",
            Category::Skirts => "Skirts",
            Category::Shoes => "Shoes",
            Category::Accessories => "Accessories",
            Category::Other => "Other",
        }
    }
}

/// Color choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Color {
    White,
    Black,
    Red,
    Blue,
    Green,
    Yellow,
    Orange,
    Purple,
    Pink,
    Brown,
    Other,
}

impl Color {
    pub fn all() -> &'static [Color] {
        use Color::*;
        &[White, Black, Red, Blue, Green, Yellow, Orange, Purple, Pink, Brown, Other]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Color::White => "White",
            Color::Black => "Black",
            Color::Red => "Red",
            Color::Blue => "Blue",
            Color::Green => "Green",
            Color::Yellow => "Yellow",
            Color::Orange => "Orange",
            Color::Purple => "Purple",
            Color::Pink => "Pink",
            Color::Brown => "Brown",
            Color::Other => "Other",
        }
    }
}

/// Season choices
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Season {
    Spring,
    Summer,
    Fall,
    Winter,
    Other,
}

impl Season {
    pub fn all() -> &'static [Season] {
        use Season::*;
        &[Spring, Summer, Fall, Winter, Other]
    }

    pub fn label(&self) -> &'static str {
        match self {
            Season::Spring => "Spring",
            Season::Summer => "Summer",
            Season::Fall => "Fall",
            Season::Winter => "Winter",
            Season::Other => "Other",
        }
    }
}

/// Choice lists offered by the add-item form
#[derive(Debug, Clone, Serialize)]
pub struct TagChoices {
    pub categories: Vec<&'static str>,
    pub colors: Vec<&'static str>,
    pub seasons: Vec<&'static str>,
}

impl TagChoices {
    pub fn standard() -> Self {
        Self {
            categories: Category::all().iter().map(Category::label).collect(),
            colors: Color::all().iter().map(Color::label).collect(),
            seasons: Season::all().iter().map(Season::label).collect(),
        }
    }
}
