pub mod error;
pub mod poster;
pub mod response;

pub mod endpoint {
    use url::Url;

    /// Default base URL of the hosted movie-search API.
    pub const DEFAULT_BASE_URL: &str = "http://api.themoviedb.org/3/search/movie";

    #[derive(Debug, Clone)]
    pub struct SearchEndpoint {
        pub base_url: Url,
        pub api_key: String,
    }

    impl SearchEndpoint {
        pub fn new(base_url: &str, api_key: impl Into<String>) -> Result<Self, url::ParseError> {
            Ok(Self { base_url: Url::parse(base_url)?, api_key: api_key.into() })
        }

        /// Build the GET url for one search/page call. The caller provides a
        /// trimmed non-empty keyword and a 1-based page number.
        pub fn search_url(&self, keyword: &str, page: u32) -> Url {
            let mut url = self.base_url.clone();
            url.query_pairs_mut()
                .append_pair("api_key", &self.api_key)
                .append_pair("page", &page.to_string())
                .append_pair("query", keyword);
            url
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn search_url_carries_key_page_and_encoded_query() {
            let ep = SearchEndpoint::new(DEFAULT_BASE_URL, "secret").unwrap();
            let url = ep.search_url("star wars", 2);
            let query = url.query().unwrap();
            assert!(query.contains("api_key=secret"));
            assert!(query.contains("page=2"));
            assert!(query.contains("query=star+wars"));
            assert_eq!(url.path(), "/3/search/movie");
        }
    }
}
