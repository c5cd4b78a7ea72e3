//! File handler implementations

use axum::{
    Json,
    extract::{Path, Query, State},
    http::StatusCode,
};
use validator::Validate;

use crate::constants::{DEFAULT_NUM_LINES, DEFAULT_START_LINE};
use crate::error::{AppError, AppResult};
use crate::files::{LineDiffChunk, PatternFilter};
use crate::handlers::flag;
use crate::models::File;
use crate::state::AppState;

use super::request::{
    CreateFileRequest, LINEDIFF, ListFilesQuery, OVERWRITE, ReadFileQuery, UDIFF,
    UpdateFileRequest, split_patterns,
};

/// Create a file in the project workspace
pub async fn create_file(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(payload): Json<CreateFileRequest>,
) -> AppResult<(StatusCode, Json<File>)> {
    payload.validate()?;

    let file = state
        .manager()
        .create_file(&id, &payload.path, &payload.content)
        .await?;

    Ok((StatusCode::CREATED, Json(file)))
}

/// List workspace files (paths only)
pub async fn list_files(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(query): Query<ListFilesQuery>,
) -> AppResult<Json<Vec<File>>> {
    let filter = PatternFilter {
        include: split_patterns(&query.include),
        exclude: split_patterns(&query.exclude),
    };

    let files = state
        .manager()
        .list_files(&id, flag(&query.show_hidden), filter)
        .await?;

    Ok(Json(files))
}

/// Read a file, optionally slicing a line window
pub async fn read_file(
    State(state): State<AppState>,
    Path((id, path)): Path<(String, String)>,
    Query(query): Query<ReadFileQuery>,
) -> AppResult<Json<File>> {
    let file = state.manager().read_file(&id, &path).await?;

    let start_line = query.start_line.unwrap_or(DEFAULT_START_LINE);
    let num_lines = query.num_lines.unwrap_or(DEFAULT_NUM_LINES);

    if start_line < 1 {
        return Err(AppError::Validation(
            "startLine must be greater than or equal to 1".to_string(),
        ));
    }

    if start_line > file.line_count().max(1) {
        return Err(AppError::Validation(format!(
            "startLine must be less than or equal to {}",
            file.line_count().max(1)
        )));
    }

    let diagnostics = file.diagnostics.clone();
    let mut sliced = file.with_line_range(start_line, start_line + num_lines);
    sliced.diagnostics = diagnostics;

    Ok(Json(sliced))
}

/// Update a file via unified diff, line replacement, or full overwrite
pub async fn update_file(
    State(state): State<AppState>,
    Path((id, path)): Path<(String, String)>,
    Json(payload): Json<UpdateFileRequest>,
) -> AppResult<Json<File>> {
    payload.validate()?;

    let file = match payload.update_type.as_str() {
        UDIFF => {
            let udiff = payload.udiff.expect("validated above");
            state.manager().apply_patch(&id, &path, &udiff.patch).await?
        }
        LINEDIFF => {
            let linediff = payload.linediff.expect("validated above");
            let chunk = LineDiffChunk {
                start_line: linediff.start_line,
                end_line: linediff.end_line,
                content: linediff.content,
            };
            state.manager().update_lines(&id, &path, chunk).await?
        }
        OVERWRITE => {
            let overwrite = payload.overwrite.expect("validated above");
            state
                .manager()
                .update_file(&id, &path, &overwrite.content)
                .await?
        }
        _ => unreachable!("validated above"),
    };

    Ok(Json(file))
}

/// Delete a file from the project workspace
pub async fn delete_file(
    State(state): State<AppState>,
    Path((id, path)): Path<(String, String)>,
) -> AppResult<StatusCode> {
    state.manager().delete_file(&id, &path).await?;

    Ok(StatusCode::NO_CONTENT)
}
