use chrono::NaiveDate;
use serde::{Deserialize, Deserializer};

/// One movie record from a search page.
///
/// Decoding is forgiving: a record missing optional fields is still included,
/// and a record missing its title decodes with an empty title rather than
/// being dropped. Only a response whose overall shape is wrong fails to parse.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchResultItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub poster_path: Option<String>,
    #[serde(default, deserialize_with = "lenient_date")]
    pub release_date: Option<NaiveDate>,
    #[serde(default)]
    pub overview: Option<String>,
}

/// One page of a paginated search. `page` and `total_pages` default to 1 when
/// the server omits them; `results` is required.
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct SearchResultPage {
    #[serde(rename = "page", default = "first_page")]
    pub page_number: u32,
    #[serde(default = "first_page")]
    pub total_pages: u32,
    #[serde(rename = "results")]
    pub items: Vec<SearchResultItem>,
}

fn first_page() -> u32 {
    1
}

/// `yyyy-MM-dd`, with missing/empty/unparseable values treated as absent.
fn lenient_date<'de, D>(de: D) -> Result<Option<NaiveDate>, D::Error>
where
    D: Deserializer<'de>,
{
    let raw: Option<String> = Option::deserialize(de)?;
    Ok(raw.and_then(|s| NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").ok()))
}

/// Single decode entry point for a search response body.
pub fn parse_search_page(body: &[u8]) -> Result<SearchResultPage, serde_json::Error> {
    serde_json::from_slice(body)
}
