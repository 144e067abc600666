pub mod assertions;
pub mod fixtures;

use anyhow::Context as _;
use axum::{
    body::{Body, Bytes},
    http::{HeaderMap, HeaderName, HeaderValue, Method, Request, StatusCode},
    Router,
};
use quarry_server::{api::create_router, AppState, Config};
use tempfile::TempDir;
use tower::ServiceExt as _;

pub use assertions::*;
pub use fixtures::*;

pub struct TestApp {
    pub router: Router,
    pub state: AppState,
    _workspace: TempDir,
}

impl TestApp {
    pub fn new() -> anyhow::Result<Self> {
        Self::new_with_config(|_| {})
    }

    /// Templates and fixtures are written to a fresh directory, then `configure`
    /// may adjust the config before the state is built.
    pub fn new_with_config(configure: impl FnOnce(&mut Config)) -> anyhow::Result<Self> {
        let workspace = tempfile::tempdir().context("create test workspace")?;
        let mut config = fixtures::write_workspace(workspace.path())?;
        configure(&mut config);

        let state = AppState::new(config).context("initialize AppState")?;
        let router = create_router(state.clone());

        Ok(Self {
            router,
            state,
            _workspace: workspace,
        })
    }

    pub async fn get(&self, path_and_query: &str) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        self.request(Method::GET, path_and_query, &[]).await
    }

    /// GET as `user`, passed through the trusted identity header.
    pub async fn get_as(
        &self,
        user: &str,
        path_and_query: &str,
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        let header = self.state.config.server.identity_header.clone();
        self.request(Method::GET, path_and_query, &[(header.as_str(), user)])
            .await
    }

    pub async fn request(
        &self,
        method: Method,
        path_and_query: &str,
        extra_headers: &[(&str, &str)],
    ) -> anyhow::Result<(StatusCode, HeaderMap, Bytes)> {
        let mut request = Request::builder()
            .method(method)
            .uri(path_and_query)
            .header("host", "example.org")
            .header("accept", "application/json")
            .body(Body::empty())
            .context("build request")?;

        for (name, value) in extra_headers {
            request.headers_mut().insert(
                name.parse::<HeaderName>().context("parse header name")?,
                value.parse::<HeaderValue>().context("parse header value")?,
            );
        }

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .context("dispatch request")?;

        let status = response.status();
        let headers = response.headers().clone();
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .context("read response body")?;

        Ok((status, headers, body))
    }
}
