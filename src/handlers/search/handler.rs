//! Search handler implementations

use axum::{
    Json,
    extract::{Path, Query, State},
};

use crate::error::{AppError, AppResult};
use crate::files::{ContentSearch, PatternFilter};
use crate::handlers::files::request::split_patterns;
use crate::handlers::flag;
use crate::lsp::{SymbolFilter, SymbolInfo};
use crate::models::File;
use crate::state::AppState;

use super::request::{SearchQuery, SymbolsQuery, split_kinds};

/// Search file contents. Default matching is case-insensitive substring;
/// `exact` switches to case-sensitive, `regex` to compiled patterns.
pub async fn search_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SearchQuery>,
) -> AppResult<Json<Vec<File>>> {
    match query.search_type.as_deref() {
        Some("content") => {}
        Some(other) => {
            return Err(AppError::Validation(format!(
                "unsupported search type: {other}"
            )));
        }
        None => {
            return Err(AppError::Validation("type must be provided".to_string()));
        }
    }

    let text = query
        .query
        .as_deref()
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("query must be provided".to_string()))?;

    let search = if flag(&query.regex) {
        ContentSearch::regex(text)?
    } else {
        ContentSearch::literal(text, flag(&query.exact))
    };

    let filter = PatternFilter {
        include: split_patterns(&query.include),
        exclude: split_patterns(&query.exclude),
    };

    let files = state.manager().search_content(&id, search, filter).await?;

    Ok(Json(files))
}

/// Search workspace symbols through the project's language servers
pub async fn search_symbols(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<SymbolsQuery>,
) -> AppResult<Json<Vec<SymbolInfo>>> {
    let text = query
        .query
        .as_deref()
        .filter(|q| !q.is_empty())
        .ok_or_else(|| AppError::Validation("query must be provided".to_string()))?;

    let filter = SymbolFilter {
        include_kinds: split_kinds(&query.kind),
        exclude_kinds: split_kinds(&query.exclude_kind),
    };

    let symbols = state.manager().search_symbols(&id, text, filter).await?;

    Ok(Json(symbols))
}
