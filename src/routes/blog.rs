/**
 * Blog Routes
 * Public blog views and the signed-in editor's create/update/delete
 */
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    response::IntoResponse,
    Json,
};
use serde::Deserialize;

use crate::editor::BlogForm;
use crate::error::AppError;
use crate::routes::auth::{AuthSession, MaybeSession};
use crate::routes::load_view;
use crate::state::AppState;
use crate::view::{load_blog_detail, load_blog_list};

#[derive(Debug, Default, Deserialize)]
pub struct DeleteQuery {
    #[serde(default)]
    pub confirm: bool,
}

/// GET /api/blogs
pub async fn list_posts(State(state): State<AppState>) -> impl IntoResponse {
    let preview_chars = state.config.preview_chars;
    load_view(|cancel| async move {
        load_blog_list(state.blogs.as_ref(), preview_chars, &cancel).await
    })
    .await
}

/// GET /api/blogs/{id}
pub async fn get_post(State(state): State<AppState>, Path(id): Path<String>) -> impl IntoResponse {
    load_view(|cancel| async move { load_blog_detail(state.blogs.as_ref(), &id, &cancel).await })
        .await
}

/// POST /api/blogs
pub async fn create_post(
    State(state): State<AppState>,
    auth: MaybeSession,
    Json(form): Json<BlogForm>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .blog_editor()
        .submit(auth.identity(), None, form)
        .await?;
    Ok((StatusCode::CREATED, Json(outcome)))
}

/// PATCH /api/blogs/{id}
pub async fn update_post(
    State(state): State<AppState>,
    auth: MaybeSession,
    Path(id): Path<String>,
    Json(form): Json<BlogForm>,
) -> Result<impl IntoResponse, AppError> {
    let outcome = state
        .blog_editor()
        .submit(auth.identity(), Some(&id), form)
        .await?;
    Ok(Json(outcome))
}

/// DELETE /api/blogs/{id}?confirm=true
pub async fn delete_post(
    State(state): State<AppState>,
    _auth: AuthSession,
    Path(id): Path<String>,
    Query(query): Query<DeleteQuery>,
) -> Result<impl IntoResponse, AppError> {
    state.blog_editor().delete(&id, query.confirm).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{bearer, login_as_admin, send_json, test_app};
    use axum::http::{Method, StatusCode};
    use serde_json::json;

    #[tokio::test]
    async fn test_empty_list_reports_empty_state() {
        let (status, body) = send_json(test_app(), Method::GET, "/api/blogs", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["state"], "empty");
    }

    #[tokio::test]
    async fn test_create_requires_sign_in() {
        let (status, body) = send_json(
            test_app(),
            Method::POST,
            "/api/blogs",
            None,
            Some(json!({ "title": "Hello", "content": "Body" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "You must be logged in to create a post.");
    }

    #[tokio::test]
    async fn test_create_rejects_blank_title() {
        let app = test_app();
        let login = login_as_admin(app.clone()).await;
        let (status, body) = send_json(
            app.clone(),
            Method::POST,
            "/api/blogs",
            Some(&bearer(&login.access_token)),
            Some(json!({ "title": "   ", "content": "Body" })),
        )
        .await;
        assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
        assert_eq!(body["field"], "title");

        let (_, body) = send_json(app, Method::GET, "/api/blogs", None, None).await;
        assert_eq!(body["state"], "empty");
    }

    #[tokio::test]
    async fn test_create_then_read_list_and_detail() {
        let app = test_app();
        let login = login_as_admin(app.clone()).await;
        let auth = bearer(&login.access_token);

        let (status, created) = send_json(
            app.clone(),
            Method::POST,
            "/api/blogs",
            Some(&auth),
            Some(json!({
                "title": "Shipping fast",
                "content": "# Intro\n\nWe **ship** often.",
                "tags": "rust, web, , axum",
            })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(created["outcome"], "created");
        let id = created["id"].as_str().unwrap().to_string();

        let (status, list) = send_json(app.clone(), Method::GET, "/api/blogs", None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(list["state"], "content");
        let card = &list["data"][0];
        assert_eq!(card["id"], id.as_str());
        assert_eq!(card["preview"], "Intro We ship often.");

        let (status, detail) =
            send_json(app, Method::GET, &format!("/api/blogs/{id}"), None, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(detail["data"]["tags"], json!(["rust", "web", "axum"]));
        assert_eq!(detail["data"]["authorName"], "Site Admin");
        let html = detail["data"]["html"].as_str().unwrap();
        assert!(html.contains("<strong"));
    }

    #[tokio::test]
    async fn test_unknown_post_is_not_found() {
        let (status, body) =
            send_json(test_app(), Method::GET, "/api/blogs/missing", None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["state"], "not-found");
    }

    #[tokio::test]
    async fn test_update_keeps_id_and_changes_content() {
        let app = test_app();
        let login = login_as_admin(app.clone()).await;
        let auth = bearer(&login.access_token);

        let (_, created) = send_json(
            app.clone(),
            Method::POST,
            "/api/blogs",
            Some(&auth),
            Some(json!({ "title": "Draft", "content": "v1" })),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, updated) = send_json(
            app.clone(),
            Method::PATCH,
            &format!("/api/blogs/{id}"),
            Some(&auth),
            Some(json!({ "title": "Final", "content": "v2" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(updated, json!({ "outcome": "updated", "id": id }));

        let (_, detail) =
            send_json(app, Method::GET, &format!("/api/blogs/{id}"), None, None).await;
        assert_eq!(detail["data"]["title"], "Final");
    }

    #[tokio::test]
    async fn test_update_missing_post_is_not_found() {
        let app = test_app();
        let login = login_as_admin(app.clone()).await;
        let (status, _) = send_json(
            app,
            Method::PATCH,
            "/api/blogs/nope",
            Some(&bearer(&login.access_token)),
            Some(json!({ "title": "T", "content": "C" })),
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_requires_confirmation() {
        let app = test_app();
        let login = login_as_admin(app.clone()).await;
        let auth = bearer(&login.access_token);

        let (_, created) = send_json(
            app.clone(),
            Method::POST,
            "/api/blogs",
            Some(&auth),
            Some(json!({ "title": "Gone soon", "content": "bye" })),
        )
        .await;
        let id = created["id"].as_str().unwrap().to_string();

        let (status, _) = send_json(
            app.clone(),
            Method::DELETE,
            &format!("/api/blogs/{id}"),
            Some(&auth),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);

        let (status, _) = send_json(
            app.clone(),
            Method::DELETE,
            &format!("/api/blogs/{id}?confirm=true"),
            Some(&auth),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, _) =
            send_json(app, Method::GET, &format!("/api/blogs/{id}"), None, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_delete_without_token_is_unauthorized() {
        let (status, _) = send_json(
            test_app(),
            Method::DELETE,
            "/api/blogs/any?confirm=true",
            None,
            None,
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
