use serde::Deserialize;

use crate::database::{ListOptions, SortColumn, SortOrder};
use crate::errors::ValidationError;
use crate::pagination::PaginationConfig;

/// Raw list query parameters; parsed here so malformed values get the same
/// error body as every other validation failure.
#[derive(Debug, Default, Deserialize)]
pub struct ListParams {
    pub limit: Option<String>,
    pub offset: Option<String>,
    pub sort_by: Option<String>,
    pub order: Option<String>,
}

pub fn parse_list_options(
    params: &ListParams,
    config: &PaginationConfig,
) -> Result<ListOptions, ValidationError> {
    let limit = match params.limit.as_deref() {
        None => config.default_limit,
        Some(raw) => parse_limit(raw, config.max_limit)?,
    };

    let offset = match params.offset.as_deref() {
        None => 0,
        Some(raw) => parse_offset(raw)?,
    };

    let sort_by = match params.sort_by.as_deref() {
        None => SortColumn::default(),
        Some(raw) => raw.parse()?,
    };

    let order = match params.order.as_deref() {
        None => SortOrder::default(),
        Some(raw) => raw.parse()?,
    };

    Ok(ListOptions::page(limit, offset).sorted(sort_by, order))
}

/// Offsets are handed to SQLite as `i64`, so anything larger is rejected.
pub(crate) fn parse_offset(raw: &str) -> Result<usize, ValidationError> {
    raw.trim()
        .parse::<usize>()
        .ok()
        .filter(|offset| i64::try_from(*offset).is_ok())
        .ok_or_else(|| {
            ValidationError::InvalidParameter(format!(
                "offset must be an integer between 0 and {}, got {raw:?}",
                i64::MAX
            ))
        })
}

pub(crate) fn parse_limit(raw: &str, max_limit: usize) -> Result<usize, ValidationError> {
    match raw.trim().parse::<usize>() {
        Ok(limit) if (1..=max_limit).contains(&limit) => Ok(limit),
        _ => Err(ValidationError::InvalidParameter(format!(
            "limit must be between 1 and {max_limit}, got {raw:?}"
        ))),
    }
}
