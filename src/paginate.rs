use reqwest::header::HeaderMap;
use serde::de::DeserializeOwned;

use crate::{
    ApiClient, PageQuery, PageResult, Pagination, RequestDescriptor, Result, RESERVED_KEYS,
};

impl ApiClient {
    /// Fetches one page of `path` with a GET request.
    pub async fn fetch_page<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &PageQuery,
    ) -> Result<PageResult<T>> {
        self.fetch_page_with(RequestDescriptor::get(path), query)
            .await
    }

    /// Fetches one page using the caller's method, headers and body.
    ///
    /// Query parameters already on `request` are kept, except those using a
    /// reserved key: paging, sorting and filtering come from `query` only.
    pub async fn fetch_page_with<T: DeserializeOwned>(
        &self,
        request: RequestDescriptor,
        query: &PageQuery,
    ) -> Result<PageResult<T>> {
        let mut request = request;
        request
            .query
            .retain(|(key, _)| !RESERVED_KEYS.contains(&key.as_str()));
        request.query.extend(query.to_pairs());

        let fetched = self.send::<Option<Vec<T>>>(&request).await?;
        let total_count = total_count(&fetched.headers, &self.options().total_count_header);

        Ok(PageResult {
            data: fetched.data.unwrap_or_default(),
            pagination: Pagination::compute(query.skip, query.limit, total_count),
        })
    }
}

/// Reads the total-count header; absent or malformed values count as 0.
pub(crate) fn total_count(headers: &HeaderMap, name: &str) -> u64 {
    headers
        .get(name)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.trim().parse::<u64>().ok())
        .unwrap_or(0)
}
