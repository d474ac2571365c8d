use reqwest::header::HeaderMap;

use crate::error::{Operation, RemoteError};

pub const X_PAGE: &str = "X-Page";
pub const X_NEXT_PAGE: &str = "X-Next-Page";
pub const X_PREV_PAGE: &str = "X-Prev-Page";
pub const X_PER_PAGE: &str = "X-Per-Page";
pub const X_TOTAL_PAGES: &str = "X-Total-Pages";
pub const X_TOTAL: &str = "X-Total";

/// Offset pagination metadata reported alongside a page of flags.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub next_page: u32,
    pub prev_page: u32,
    pub per_page: u32,
    pub total_pages: u32,
    pub total: u32,
}

impl Pagination {
    /// Decodes the `X-*` pagination headers. A missing or empty header reads as 0.
    pub fn from_headers(headers: &HeaderMap, page: u32) -> Result<Self, RemoteError> {
        let parse = |header: &'static str| -> Result<u32, RemoteError> {
            let raw = match headers.get(header) {
                Some(value) => value.to_str().map_err(|_| RemoteError::Pagination {
                    op: Operation::ListPage { page },
                    header,
                    value: String::from_utf8_lossy(value.as_bytes()).into_owned(),
                })?,
                None => return Ok(0),
            };
            let raw = raw.trim();
            if raw.is_empty() {
                return Ok(0);
            }
            raw.parse().map_err(|_| RemoteError::Pagination {
                op: Operation::ListPage { page },
                header,
                value: raw.to_string(),
            })
        };

        Ok(Self {
            page: parse(X_PAGE)?,
            next_page: parse(X_NEXT_PAGE)?,
            prev_page: parse(X_PREV_PAGE)?,
            per_page: parse(X_PER_PAGE)?,
            total_pages: parse(X_TOTAL_PAGES)?,
            total: parse(X_TOTAL)?,
        })
    }
}

#[cfg(test)]
mod tests {
    use reqwest::header::{HeaderMap, HeaderValue};

    use super::*;

    #[test]
    fn test_missing_and_empty_headers_read_as_zero() {
        let mut headers = HeaderMap::new();
        headers.insert("x-page", HeaderValue::from_static("2"));
        headers.insert("x-next-page", HeaderValue::from_static(""));
        headers.insert("x-per-page", HeaderValue::from_static("20"));
        headers.insert("x-total-pages", HeaderValue::from_static("3"));

        let pagination = Pagination::from_headers(&headers, 2).unwrap();
        assert_eq!(pagination.page, 2);
        assert_eq!(pagination.next_page, 0);
        assert_eq!(pagination.prev_page, 0);
        assert_eq!(pagination.per_page, 20);
        assert_eq!(pagination.total_pages, 3);
        assert_eq!(pagination.total, 0);
    }

    #[test]
    fn test_malformed_header_is_an_error() {
        let mut headers = HeaderMap::new();
        headers.insert("x-total-pages", HeaderValue::from_static("many"));

        let err = Pagination::from_headers(&headers, 4).unwrap_err();
        match err {
            RemoteError::Pagination { op, header, value } => {
                assert_eq!(op, Operation::ListPage { page: 4 });
                assert_eq!(header, X_TOTAL_PAGES);
                assert_eq!(value, "many");
            }
            other => panic!("unexpected error: {other}"),
        }
    }
}
