use axum::{extract::Query, Json};
use serde::Deserialize;

use crate::admin::AdminShell;
use crate::routes::auth::AuthSession;

#[derive(Debug, Deserialize)]
pub struct ShellQuery {
    pub path: Option<String>,
}

/// GET /api/admin/shell?path=/dashboard/blogs
pub async fn shell(auth: AuthSession, Query(query): Query<ShellQuery>) -> Json<AdminShell> {
    let path = query.path.as_deref().unwrap_or("/dashboard");
    let role = auth.session.role();
    Json(AdminShell::build(path, &auth.identity, role.as_deref()))
}

#[cfg(test)]
mod tests {
    use crate::routes::test_support::{bearer, login_as_admin, send_json, test_app};
    use axum::http::{Method, StatusCode};

    #[tokio::test]
    async fn test_shell_marks_active_item() {
        let app = test_app();
        let login = login_as_admin(app.clone()).await;
        let (status, body) = send_json(
            app,
            Method::GET,
            "/api/admin/shell?path=/dashboard/blogs",
            Some(&bearer(&login.access_token)),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["topbar"]["displayName"], "Site Admin");
        assert_eq!(body["showDashboardLink"], true);

        let active: Vec<_> = body["sidebar"]
            .as_array()
            .unwrap()
            .iter()
            .filter(|item| item["active"] == true)
            .map(|item| item["label"].as_str().unwrap().to_string())
            .collect();
        assert_eq!(active, vec!["Blogs"]);
    }

    #[tokio::test]
    async fn test_shell_requires_session() {
        let (status, _) =
            send_json(test_app(), Method::GET, "/api/admin/shell", None, None).await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
    }
}
