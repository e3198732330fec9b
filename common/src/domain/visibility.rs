//! Maps the full article set onto the public page slots.

use std::fmt;
use std::str::FromStr;

use itertools::Itertools;

use crate::domain::Category;
use crate::domain::article::{Article, Placement};

/// Interval at which featured and premium carousels auto-advance.
pub const CAROUSEL_INTERVAL_SECS: u64 = 5;

/// Articles grouped by placement. Groups are disjoint and together hold every
/// input article, each in input order.
#[derive(Debug, Default, PartialEq)]
pub struct Slots<'a> {
    pub featured: Vec<&'a Article>,
    pub premium: Vec<&'a Article>,
    pub grid: Vec<&'a Article>,
}

pub fn partition(articles: &[Article]) -> Slots<'_> {
    let mut groups = articles.iter().into_group_map_by(|article| article.placement());
    Slots {
        featured: groups.remove(&Placement::Featured).unwrap_or_default(),
        premium: groups.remove(&Placement::Premium).unwrap_or_default(),
        grid: groups.remove(&Placement::Grid).unwrap_or_default(),
    }
}

/// Filter tab of the grid section.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum GridTab {
    /// Newest first.
    #[default]
    Latest,
    /// Input order.
    All,
    Category(Category),
}

impl GridTab {
    pub fn select<'a>(&self, grid: &[&'a Article]) -> Vec<&'a Article> {
        match self {
            GridTab::Latest => grid
                .iter()
                .copied()
                .sorted_by(|a, b| b.created_at.cmp(&a.created_at))
                .collect(),
            GridTab::All => grid.to_vec(),
            GridTab::Category(category) => grid
                .iter()
                .copied()
                .filter(|article| article.category() == category)
                .collect(),
        }
    }

    /// `latest`, `all`, then each category present in the grid, first seen first.
    pub fn available(grid: &[&Article]) -> Vec<GridTab> {
        let categories = grid
            .iter()
            .map(|article| article.category().clone())
            .unique()
            .map(GridTab::Category);
        [GridTab::Latest, GridTab::All].into_iter().chain(categories).collect()
    }
}

impl FromStr for GridTab {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim() {
            "" | "latest" => Ok(GridTab::Latest),
            "all" => Ok(GridTab::All),
            other => Category::try_new(other)
                .map(GridTab::Category)
                .map_err(|err| err.to_string()),
        }
    }
}

impl fmt::Display for GridTab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            GridTab::Latest => f.write_str("latest"),
            GridTab::All => f.write_str("all"),
            GridTab::Category(category) => write!(f, "{category}"),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct Page<T> {
    pub items: Vec<T>,
    /// One-based, clamped into `1..=total_pages`.
    pub page: usize,
    /// At least 1; an empty grid is one empty page.
    pub total_pages: usize,
    pub total_items: usize,
}

pub fn paginate<T>(items: Vec<T>, page: usize, page_size: usize) -> Page<T> {
    let page_size = page_size.max(1);
    let total_items = items.len();
    let total_pages = total_items.div_ceil(page_size).max(1);
    let page = page.clamp(1, total_pages);
    let items = items
        .into_iter()
        .skip((page - 1) * page_size)
        .take(page_size)
        .collect();
    Page {
        items,
        page,
        total_pages,
        total_items,
    }
}

/// Rotation position of a featured or premium carousel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Carousel {
    len: usize,
    index: usize,
}

impl Carousel {
    pub fn new(len: usize) -> Self {
        Self { len, index: 0 }
    }

    pub fn current(&self) -> Option<usize> {
        (self.len > 0).then_some(self.index)
    }

    pub fn next(&mut self) {
        if self.len > 0 {
            self.index = (self.index + 1) % self.len;
        }
    }

    pub fn prev(&mut self) {
        if self.len > 0 {
            self.index = (self.index + self.len - 1) % self.len;
        }
    }
}
