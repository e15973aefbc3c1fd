/**
 * Latest Works Routes
 * Public work views and the signed-in editor's create/update/delete
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};

use crate::editor::WorkForm;
use crate::error::AppError;
use crate::routes::auth::{AuthSession, MaybeSession};
use crate::routes::blog::DeleteQuery;
use crate::routes::load_view;
use crate::state::AppState;
use crate::view::{load_work_detail, load_work_list};

/// GET /api/works
pub async fn list_works(State(state): State<AppState>) -> impl IntoResponse {
    load_view(|cancel| async move { load_work_list(state.works.as_ref(), &cancel).await }).await
}

/// GET /api/works/{id}
/// Unknown ids fall back to the showcase entries.
pub async fn get_work(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    load_view(|cancel| async move {
        load_work_detail(state.works.as_ref(), &id, &state.fallback_works, &cancel).await
    })
    .await
}

/// POST /api/works
pub async fn create_work(
    State(state): State<AppState>,
    auth: MaybeSession,
    Json(form): Json<WorkForm>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .work_editor()
        .submit(auth.identity(), None, form)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// PATCH /api/works/{id}
pub async fn update_work(
    State(state): State<AppState>,
    auth: MaybeSession,
    Path(id): Path<String>,
    Json(form): Json<WorkForm>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .work_editor()
        .submit(auth.identity(), Some(&id), form)
        .await?;
    Ok(Json(outcome))
}

/// DELETE /api/works/{id}?confirm=true
pub async fn delete_work(
    State(state): State<AppState>,
    _auth: AuthSession,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.work_editor().delete(&id, query.confirm).await?;
    Ok(StatusCode::NO_CONTENT)
}
