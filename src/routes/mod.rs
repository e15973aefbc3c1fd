/**
 * Routes Module
 * API route handlers
 */

pub mod admin;
pub mod auth;
pub mod blog;
pub mod health;
pub mod upload;
pub mod works;

use tokio_util::sync::CancellationToken;

use crate::view::{Loader, ViewState};

/// Runs one view load for a request. The token is cancelled if the client
/// goes away before the load settles.
pub(crate) async fn load_view<T, F, Fut>(load: F) -> ViewState<T>
where
    T: Clone,
    F: FnOnce(CancellationToken) -> Fut,
    Fut: std::future::Future<Output = Option<ViewState<T>>>,
{
    let loader = Loader::new();
    loader
        .run(load)
        .await
        .unwrap_or_else(|| ViewState::Error("Request cancelled".to_string()))
}
