use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

use crate::domain::{Entity, Vote};
use crate::errors::ValidationError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortColumn {
    #[default]
    CreatedAt,
    UpdatedAt,
    Score,
}

impl SortColumn {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortColumn::CreatedAt => "created_at",
            SortColumn::UpdatedAt => "updated_at",
            SortColumn::Score => "score",
        }
    }

    /// Orders two votes by this column, ascending, ties broken by id.
    pub fn compare(&self, a: &Vote, b: &Vote) -> Ordering {
        let primary = match self {
            SortColumn::CreatedAt => a.created_at.cmp(&b.created_at),
            SortColumn::UpdatedAt => a.updated_at.cmp(&b.updated_at),
            SortColumn::Score => a.score.cmp(&b.score),
        };
        primary.then_with(|| a.id.cmp(&b.id))
    }
}

impl FromStr for SortColumn {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "created_at" => Ok(SortColumn::CreatedAt),
            "updated_at" => Ok(SortColumn::UpdatedAt),
            "score" => Ok(SortColumn::Score),
            other => Err(ValidationError::InvalidParameter(format!(
                "sort_by must be one of created_at, updated_at, score, got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for SortColumn {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortOrder {
    Asc,
    #[default]
    Desc,
}

impl SortOrder {
    pub fn as_sql(&self) -> &'static str {
        match self {
            SortOrder::Asc => "ASC",
            SortOrder::Desc => "DESC",
        }
    }
}

impl FromStr for SortOrder {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "asc" => Ok(SortOrder::Asc),
            "desc" => Ok(SortOrder::Desc),
            other => Err(ValidationError::InvalidParameter(format!(
                "order must be asc or desc, got {other:?}"
            ))),
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SortOrder::Asc => f.write_str("asc"),
            SortOrder::Desc => f.write_str("desc"),
        }
    }
}

/// Paging and ordering of a vote listing. `limit: None` means every row.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct ListOptions {
    pub limit: Option<usize>,
    pub offset: usize,
    pub sort_by: SortColumn,
    pub order: SortOrder,
}

impl ListOptions {
    pub fn page(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
            ..Self::default()
        }
    }

    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn sorted(mut self, sort_by: SortColumn, order: SortOrder) -> Self {
        self.sort_by = sort_by;
        self.order = order;
        self
    }

    /// Sorts, then slices `votes` the way the SQL listing would.
    pub fn apply(&self, mut votes: Vec<Vote>) -> Vec<Vote> {
        votes.sort_by(|a, b| {
            let ordering = self.sort_by.compare(a, b);
            match self.order {
                SortOrder::Asc => ordering,
                SortOrder::Desc => ordering.reverse(),
            }
        });

        let rows = votes.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        }
    }
}

/// Filters and paging of an entity listing. The title matches as an ASCII
/// case-insensitive substring, the category as a whole label.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct EntityQuery {
    pub title: Option<String>,
    pub category: Option<String>,
    pub limit: Option<usize>,
    pub offset: usize,
}

impl EntityQuery {
    pub fn page(limit: usize, offset: usize) -> Self {
        Self {
            limit: Some(limit),
            offset,
            ..Self::default()
        }
    }

    pub fn titled(mut self, title: impl Into<String>) -> Self {
        self.title = Some(title.into());
        self
    }

    pub fn in_category(mut self, category: impl Into<String>) -> Self {
        self.category = Some(category.into());
        self
    }

    pub fn matches(&self, entity: &Entity) -> bool {
        let title_ok = self.title.as_deref().is_none_or(|title| {
            entity
                .title
                .to_ascii_lowercase()
                .contains(&title.to_ascii_lowercase())
        });
        let category_ok = self
            .category
            .as_deref()
            .is_none_or(|category| entity.category.eq_ignore_ascii_case(category));
        title_ok && category_ok
    }

    /// Filters, orders by title then id, and slices the way the SQL listing
    /// would.
    pub fn apply(&self, entities: Vec<Entity>) -> Vec<Entity> {
        let mut matching: Vec<Entity> =
            entities.into_iter().filter(|e| self.matches(e)).collect();
        matching.sort_by(|a, b| {
            a.title
                .to_ascii_lowercase()
                .cmp(&b.title.to_ascii_lowercase())
                .then_with(|| a.id.cmp(&b.id))
        });

        let rows = matching.into_iter().skip(self.offset);
        match self.limit {
            Some(limit) => rows.take(limit).collect(),
            None => rows.collect(),
        }
    }
}
