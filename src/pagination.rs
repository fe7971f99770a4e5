//! Pagination for the extraction endpoint
//!
//! The API paginates with an opaque continuation token: each response may
//! carry a `next_page` value (in the body, or optionally a response header),
//! and the token is re-sent as a query parameter until no further token
//! comes back.

use crate::extract::extract_simple_path;
use reqwest::header::HeaderMap;
use serde_json::Value;
use std::collections::HashMap;

/// Result of the next page computation
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NextPage {
    /// More pages available with these query parameters
    Continue {
        /// Query parameters to add/replace
        query_params: HashMap<String, String>,
    },
    /// No more pages
    Done,
}

impl NextPage {
    /// Create a continuation with a single parameter
    pub fn with_param(key: impl Into<String>, value: impl Into<String>) -> Self {
        let mut params = HashMap::new();
        params.insert(key.into(), value.into());
        Self::Continue {
            query_params: params,
        }
    }

    /// Check if this is a done result
    pub fn is_done(&self) -> bool {
        matches!(self, Self::Done)
    }
}

/// Tracks pagination state during one fetch-and-paginate cycle
#[derive(Debug, Clone, Default)]
pub struct PaginationState {
    /// Current continuation token
    pub token: Option<String>,
    /// Pages fetched so far
    pub pages: u32,
    /// Total records fetched so far
    pub total_fetched: u64,
    /// Is pagination complete?
    pub done: bool,
}

impl PaginationState {
    /// Create a new pagination state
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark pagination as complete
    pub fn mark_done(&mut self) {
        self.done = true;
    }
}

/// Core trait for pagination strategies
pub trait Paginator: Send + Sync {
    /// Get query parameters for the next request
    fn initial_params(&self, state: &PaginationState) -> HashMap<String, String>;

    /// Process a response and determine if there's a next page
    fn process_response(
        &self,
        body: &Value,
        headers: &HeaderMap,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage;
}

// ============================================================================
// Token Pagination
// ============================================================================

/// Continuation-token pagination.
///
/// The token comes from the response body at `token_path` (or a response
/// header when `token_header` is set) and is re-sent as the `token_param`
/// query parameter. Stops on a missing, null, or empty token, and on a token
/// identical to the previous one so a non-advancing server cannot loop the
/// cycle forever.
#[derive(Debug, Clone)]
pub struct TokenPaginator {
    /// Query parameter name the token is re-sent as
    pub token_param: String,
    /// JSONPath to the token in the response body
    pub token_path: String,
    /// Response header to read the token from instead of the body
    pub token_header: Option<String>,
}

impl TokenPaginator {
    /// Create a paginator reading the token from the response body
    pub fn new(token_param: impl Into<String>, token_path: impl Into<String>) -> Self {
        Self {
            token_param: token_param.into(),
            token_path: token_path.into(),
            token_header: None,
        }
    }

    /// Read the token from a response header instead of the body
    #[must_use]
    pub fn with_header(mut self, header: impl Into<String>) -> Self {
        self.token_header = Some(header.into());
        self
    }

    fn extract_token(&self, body: &Value, headers: &HeaderMap) -> Option<String> {
        if let Some(name) = &self.token_header {
            return headers
                .get(name.as_str())
                .and_then(|v| v.to_str().ok())
                .map(ToString::to_string);
        }

        match extract_simple_path(body, &self.token_path) {
            Some(Value::String(s)) => Some(s),
            Some(Value::Number(n)) => Some(n.to_string()),
            _ => None,
        }
    }
}

impl Paginator for TokenPaginator {
    fn initial_params(&self, state: &PaginationState) -> HashMap<String, String> {
        let mut params = HashMap::new();
        if let Some(token) = &state.token {
            params.insert(self.token_param.clone(), token.clone());
        }
        params
    }

    fn process_response(
        &self,
        body: &Value,
        headers: &HeaderMap,
        records_count: usize,
        state: &mut PaginationState,
    ) -> NextPage {
        state.pages += 1;
        state.total_fetched += records_count as u64;

        let token = match self.extract_token(body, headers) {
            Some(t) if !t.is_empty() => t,
            _ => {
                state.mark_done();
                return NextPage::Done;
            }
        };

        // A server that echoes the same token back is not advancing
        if state.token.as_deref() == Some(token.as_str()) {
            state.mark_done();
            return NextPage::Done;
        }

        state.token = Some(token.clone());
        NextPage::with_param(&self.token_param, token)
    }
}
