//! Pagination
//!
//! Repeats a GET with an advancing cursor and collects every page's items
//! in order.

use crate::client::http::HttpClient;
use crate::client::request::RequestOptions;
use crate::client::service::Service;
use crate::error::{Result, StacError};
use serde_json::Value;
use tracing::debug;

/// How the next page is requested
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageStrategy {
    /// Follow a URL found in each page (JSON pointer to the link)
    NextLink { next: String },

    /// Advance an offset parameter by the page size
    Offset {
        limit_param: String,
        offset_param: String,
        page_size: usize,
        /// JSON pointer to the total item count, if the API reports one
        total: Option<String>,
    },

    /// Increment a page number parameter
    PageNumber { page_param: String, first_page: u32 },
}

/// Where items live in a page and how to get the next one
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Pagination {
    /// JSON pointer to the item array; `None` when the page is the array
    pub items: Option<String>,
    pub strategy: PageStrategy,
    pub max_pages: Option<usize>,
}

impl Pagination {
    /// Follow `next` links, e.g. `Pagination::next_link("/items", "/next_page_link")`
    pub fn next_link(items: &str, next: &str) -> Self {
        Self {
            items: Some(items.to_string()),
            strategy: PageStrategy::NextLink {
                next: next.to_string(),
            },
            max_pages: None,
        }
    }

    /// `count`/`offset` paging
    pub fn offset(items: &str, page_size: usize) -> Self {
        Self {
            items: Some(items.to_string()),
            strategy: PageStrategy::Offset {
                limit_param: "count".to_string(),
                offset_param: "offset".to_string(),
                page_size,
                total: None,
            },
            max_pages: None,
        }
    }

    /// `page=1,2,...` paging
    pub fn page_number(items: &str) -> Self {
        Self {
            items: Some(items.to_string()),
            strategy: PageStrategy::PageNumber {
                page_param: "page".to_string(),
                first_page: 1,
            },
            max_pages: None,
        }
    }

    /// Pages are bare arrays
    pub fn top_level(mut self) -> Self {
        self.items = None;
        self
    }

    /// Stop once the offset reaches the count found at `pointer`
    pub fn with_total(mut self, pointer: &str) -> Self {
        if let PageStrategy::Offset { total, .. } = &mut self.strategy {
            *total = Some(pointer.to_string());
        }
        self
    }

    pub fn max_pages(mut self, max_pages: usize) -> Self {
        self.max_pages = Some(max_pages);
        self
    }

    fn first_page_options(&self, options: RequestOptions) -> RequestOptions {
        match &self.strategy {
            PageStrategy::NextLink { .. } => options,
            PageStrategy::Offset {
                limit_param,
                offset_param,
                page_size,
                ..
            } => options
                .set_param(limit_param, page_size)
                .set_param(offset_param, 0),
            PageStrategy::PageNumber {
                page_param,
                first_page,
            } => options.set_param(page_param, first_page),
        }
    }

    fn items_in(&self, page: &Value) -> Option<Vec<Value>> {
        let items = match &self.items {
            Some(pointer) => page.pointer(pointer)?,
            None => page,
        };
        items.as_array().cloned()
    }
}

impl<S: Service> HttpClient<S> {
    /// Fetch every page of `endpoint` and return all items in order
    ///
    /// Stops at the first empty or missing page, when no next link is
    /// given, when the offset passes the reported total, or at `max_pages`.
    /// An offset page size of 0 is `InvalidInput`.
    pub async fn paginate(
        &self,
        endpoint: &str,
        options: RequestOptions,
        pagination: &Pagination,
    ) -> Result<Vec<Value>> {
        if let PageStrategy::Offset { page_size: 0, .. } = pagination.strategy {
            return Err(StacError::InvalidInput(
                "offset page size must be at least 1".to_string(),
            ));
        }

        let mut all_items = Vec::new();
        let mut endpoint = endpoint.to_string();
        let mut options = pagination.first_page_options(options);
        let mut pages = 0usize;
        let mut offset = 0usize;
        let mut page_number = match &pagination.strategy {
            PageStrategy::PageNumber { first_page, .. } => *first_page,
            _ => 0,
        };

        loop {
            debug!("Fetching page {} of {}", pages + 1, endpoint);
            let response = self.get(&endpoint, options.clone()).await?;

            let items = match pagination.items_in(&response.data) {
                Some(items) if !items.is_empty() => items,
                _ => break,
            };
            all_items.extend(items);
            pages += 1;

            if pagination.max_pages.is_some_and(|max| pages >= max) {
                break;
            }

            match &pagination.strategy {
                PageStrategy::NextLink { next } => {
                    match response.data.pointer(next).and_then(Value::as_str) {
                        Some(link) if !link.is_empty() => {
                            // Links carry their own query string
                            endpoint = link.to_string();
                            options.params.clear();
                        }
                        _ => break,
                    }
                }
                PageStrategy::Offset {
                    offset_param,
                    page_size,
                    total,
                    ..
                } => {
                    offset += page_size;
                    let total = total
                        .as_deref()
                        .and_then(|pointer| response.data.pointer(pointer))
                        .and_then(Value::as_u64);
                    if total.is_some_and(|total| offset as u64 >= total) {
                        break;
                    }
                    options = options.set_param(offset_param, offset);
                }
                PageStrategy::PageNumber { page_param, .. } => {
                    page_number += 1;
                    options = options.set_param(page_param, page_number);
                }
            }
        }

        Ok(all_items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HttpSettings;
    use async_trait::async_trait;
    use mockito::Matcher;
    use serde_json::json;

    struct Plain(String);

    #[async_trait]
    impl Service for Plain {
        fn name(&self) -> &str {
            "plain"
        }

        fn base_url(&self) -> &str {
            &self.0
        }
    }

    fn client(url: String) -> HttpClient<Plain> {
        HttpClient::new(Plain(url), HttpSettings::default())
    }

    #[tokio::test]
    async fn test_page_number_concatenates_until_empty_page() {
        let mut server = mockito::Server::new_async().await;
        let p1 = server
            .mock("GET", "/people")
            .match_query(Matcher::UrlEncoded("page".into(), "1".into()))
            .with_status(200)
            .with_body(r#"{"items": [{"id": 1}, {"id": 2}]}"#)
            .create_async()
            .await;
        let p2 = server
            .mock("GET", "/people")
            .match_query(Matcher::UrlEncoded("page".into(), "2".into()))
            .with_status(200)
            .with_body(r#"{"items": [{"id": 3}]}"#)
            .create_async()
            .await;
        let p3 = server
            .mock("GET", "/people")
            .match_query(Matcher::UrlEncoded("page".into(), "3".into()))
            .with_status(200)
            .with_body(r#"{"items": []}"#)
            .create_async()
            .await;

        let items = client(server.url())
            .paginate("people", RequestOptions::new(), &Pagination::page_number("/items"))
            .await
            .unwrap();

        p1.assert_async().await;
        p2.assert_async().await;
        p3.assert_async().await;
        assert_eq!(items, vec![json!({"id": 1}), json!({"id": 2}), json!({"id": 3})]);
    }

    #[tokio::test]
    async fn test_next_link_follows_until_missing() {
        let mut server = mockito::Server::new_async().await;
        let next = format!("{}/events/page2?$top=2&$skip=2", server.url());

        server
            .mock("GET", "/events")
            .match_query(Matcher::UrlEncoded("$top".into(), "2".into()))
            .with_status(200)
            .with_body(json!({"items": ["a", "b"], "nextPageLink": next}).to_string())
            .create_async()
            .await;
        server
            .mock("GET", "/events/page2")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"items": ["c"], "nextPageLink": null}"#)
            .create_async()
            .await;

        let items = client(server.url())
            .paginate(
                "events",
                RequestOptions::new().param("$top", 2),
                &Pagination::next_link("/items", "/nextPageLink"),
            )
            .await
            .unwrap();

        assert_eq!(items, vec![json!("a"), json!("b"), json!("c")]);
    }

    #[tokio::test]
    async fn test_offset_stops_at_total() {
        let mut server = mockito::Server::new_async().await;
        let first = server
            .mock("GET", "/lists")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("count".into(), "2".into()),
                Matcher::UrlEncoded("offset".into(), "0".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"lists": [1, 2], "total_items": 3}"#)
            .expect(1)
            .create_async()
            .await;
        let second = server
            .mock("GET", "/lists")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("count".into(), "2".into()),
                Matcher::UrlEncoded("offset".into(), "2".into()),
            ]))
            .with_status(200)
            .with_body(r#"{"lists": [3], "total_items": 3}"#)
            .expect(1)
            .create_async()
            .await;

        let pagination = Pagination::offset("/lists", 2).with_total("/total_items");
        let items = client(server.url())
            .paginate("lists", RequestOptions::new(), &pagination)
            .await
            .unwrap();

        first.assert_async().await;
        second.assert_async().await;
        assert_eq!(items, vec![json!(1), json!(2), json!(3)]);
    }

    #[tokio::test]
    async fn test_zero_page_size_is_rejected() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/lists")
            .match_query(Matcher::Any)
            .expect(0)
            .create_async()
            .await;

        let err = client(server.url())
            .paginate("lists", RequestOptions::new(), &Pagination::offset("/lists", 0))
            .await
            .unwrap_err();

        mock.assert_async().await;
        assert!(matches!(err, StacError::InvalidInput(_)));
    }

    #[tokio::test]
    async fn test_top_level_arrays_and_max_pages() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/issues")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"[{"key": "A-1"}]"#)
            .expect(2)
            .create_async()
            .await;

        let pagination = Pagination::page_number("/unused").top_level().max_pages(2);
        let items = client(server.url())
            .paginate("issues", RequestOptions::new(), &pagination)
            .await
            .unwrap();

        mock.assert_async().await;
        assert_eq!(items.len(), 2);
    }

    #[tokio::test]
    async fn test_missing_items_ends_pagination() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/people")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"count": 0}"#)
            .create_async()
            .await;

        let items = client(server.url())
            .paginate("people", RequestOptions::new(), &Pagination::page_number("/items"))
            .await
            .unwrap();

        assert!(items.is_empty());
    }

    #[tokio::test]
    async fn test_error_page_propagates() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/people")
            .match_query(Matcher::Any)
            .with_status(500)
            .create_async()
            .await;

        let result = client(server.url())
            .paginate("people", RequestOptions::new(), &Pagination::page_number("/items"))
            .await;

        assert!(result.is_err());
    }
}
