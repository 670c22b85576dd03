use serde::Deserialize;

use super::pagination::{parse_limit, parse_offset};
use crate::database::EntityQuery;
use crate::errors::ValidationError;
use crate::pagination::PaginationConfig;

#[derive(Debug, Default, Deserialize)]
pub struct EntitySearchParams {
    pub title: Option<String>,
    pub category: Option<String>,
    pub limit: Option<String>,
    pub offset: Option<String>,
}

/// Blank filters are treated as absent.
pub fn parse_entity_query(
    params: &EntitySearchParams,
    config: &PaginationConfig,
) -> Result<EntityQuery, ValidationError> {
    let limit = match params.limit.as_deref() {
        None => config.default_limit,
        Some(raw) => parse_limit(raw, config.max_limit)?,
    };
    let offset = match params.offset.as_deref() {
        None => 0,
        Some(raw) => parse_offset(raw)?,
    };

    Ok(EntityQuery {
        title: non_blank(params.title.as_deref()),
        category: non_blank(params.category.as_deref()),
        ..EntityQuery::page(limit, offset)
    })
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(String::from)
}
