use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use sqlx::sqlite::SqlitePoolOptions;
use tokio::sync::watch;
use tokio::time::{sleep, timeout};

use reel::api::error::ErrorKind;
use reel::api::response::{SearchResultItem, SearchResultPage};
use reel::remote::{FetchError, SearchBackend, SearchFuture};
use reel::session::{DisplayRow, SearchCoordinator};
use reel::store::SuggestionStore;

/// Scripted backend: pops one canned response per call, optionally after a
/// delay, and counts every request it sees.
struct FakeBackend {
    attempts: AtomicUsize,
    script: Mutex<VecDeque<Result<SearchResultPage, FetchError>>>,
    delay: Mutex<Option<Duration>>,
}

impl FakeBackend {
    fn new() -> Arc<Self> {
        Arc::new(Self {
            attempts: AtomicUsize::new(0),
            script: Mutex::new(VecDeque::new()),
            delay: Mutex::new(None),
        })
    }

    fn push(&self, response: Result<SearchResultPage, FetchError>) {
        self.script.lock().unwrap().push_back(response);
    }

    fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

impl SearchBackend for FakeBackend {
    fn search(&self, _keyword: &str, _page: u32) -> SearchFuture {
        self.attempts.fetch_add(1, Ordering::SeqCst);
        let response = self
            .script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(FetchError::Other));
        let delay = *self.delay.lock().unwrap();
        Box::pin(async move {
            if let Some(delay) = delay {
                sleep(delay).await;
            }
            response
        })
    }
}

fn page(page_number: u32, total_pages: u32, titles: &[&str]) -> SearchResultPage {
    SearchResultPage {
        page_number,
        total_pages,
        items: titles
            .iter()
            .map(|t| SearchResultItem {
                title: t.to_string(),
                poster_path: None,
                release_date: None,
                overview: None,
            })
            .collect(),
    }
}

async fn mem_store() -> SuggestionStore {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("open in-memory db");
    reel_db::MIGRATOR.run(&pool).await.expect("migrate");
    SuggestionStore::new(pool)
}

async fn wait_rows(
    rx: &mut watch::Receiver<Vec<DisplayRow>>,
    pred: impl Fn(&[DisplayRow]) -> bool,
) -> Vec<DisplayRow> {
    timeout(Duration::from_secs(2), async {
        loop {
            {
                let current = rx.borrow_and_update();
                if pred(&current) {
                    return current.clone();
                }
            }
            rx.changed().await.expect("rows channel closed");
        }
    })
    .await
    .expect("timed out waiting for rows")
}

async fn wait_error(
    rx: &mut watch::Receiver<Option<ErrorKind>>,
    expected: ErrorKind,
) {
    timeout(Duration::from_secs(2), async {
        loop {
            {
                if *rx.borrow_and_update() == Some(expected) {
                    return;
                }
            }
            rx.changed().await.expect("error channel closed");
        }
    })
    .await
    .expect("timed out waiting for error");
}

fn titles(rows: &[DisplayRow]) -> Vec<&str> {
    rows.iter()
        .map(|row| match row {
            DisplayRow::Movie(m) => m.title.as_str(),
            DisplayRow::Suggestion(s) => s.keyword.as_str(),
        })
        .collect()
}

#[tokio::test]
async fn blank_keyword_is_rejected_without_a_request() {
    let backend = FakeBackend::new();
    let store = mem_store().await;
    let coordinator = SearchCoordinator::new(backend.clone(), store.clone());

    coordinator.submit_search("   ");

    assert_eq!(*coordinator.last_error().borrow(), Some(ErrorKind::InvalidKeyword));
    assert_eq!(backend.attempts(), 0);
    assert!(store.list_all().await.expect("list").is_empty());
}

#[tokio::test]
async fn first_page_success_populates_rows_and_records_the_keyword() {
    let backend = FakeBackend::new();
    backend.push(Ok(page(1, 3, &["Batman"])));
    let store = mem_store().await;
    let coordinator = SearchCoordinator::new(backend.clone(), store.clone());
    let mut rows_rx = coordinator.rows();

    coordinator.submit_search("batman");

    let rows = wait_rows(&mut rows_rx, |rows| !rows.is_empty()).await;
    assert_eq!(titles(&rows), vec!["Batman"]);
    assert!(matches!(rows[0], DisplayRow::Movie(_)));

    let status = coordinator.page_status();
    assert_eq!(status.current_page, 1);
    assert_eq!(status.total_pages, 3);
    assert_eq!(*coordinator.last_error().borrow(), None);

    // The suggestion lands after the rows are published.
    timeout(Duration::from_secs(2), async {
        loop {
            let all = store.list_all().await.expect("list");
            if all.iter().any(|s| s.keyword == "batman") {
                return;
            }
            sleep(Duration::from_millis(10)).await;
        }
    })
    .await
    .expect("suggestion never recorded");
    assert_eq!(backend.attempts(), 1);
}

#[tokio::test]
async fn empty_results_surface_movie_not_found_and_record_nothing() {
    let backend = FakeBackend::new();
    backend.push(Ok(page(1, 1, &[])));
    let store = mem_store().await;
    let coordinator = SearchCoordinator::new(backend.clone(), store.clone());
    let mut error_rx = coordinator.last_error();

    coordinator.submit_search("obscure");

    wait_error(&mut error_rx, ErrorKind::MovieNotFound).await;
    assert!(coordinator.rows().borrow().is_empty());
    assert!(store.list_all().await.expect("list").is_empty());

    // Pagination fields still advance so the next-page guard stays truthful.
    sleep(Duration::from_millis(50)).await;
    let status = coordinator.page_status();
    assert_eq!(status.current_page, 1);
    assert_eq!(status.total_pages, 1);
    assert!(!status.is_loading_next_page);
}

#[tokio::test]
async fn double_next_page_issues_a_single_request() {
    let backend = FakeBackend::new();
    backend.push(Ok(page(1, 3, &["A"])));
    let store = mem_store().await;
    let coordinator = SearchCoordinator::new(backend.clone(), store);
    let mut rows_rx = coordinator.rows();

    coordinator.submit_search("serial");
    wait_rows(&mut rows_rx, |rows| rows.len() == 1).await;

    backend.set_delay(Duration::from_millis(100));
    backend.push(Ok(page(2, 3, &["B"])));

    coordinator.load_next_page_if_available();
    coordinator.load_next_page_if_available();

    let rows = wait_rows(&mut rows_rx, |rows| rows.len() == 2).await;
    assert_eq!(titles(&rows), vec!["A", "B"]);
    // One submit fetch plus exactly one next-page fetch.
    assert_eq!(backend.attempts(), 2);

    let status = coordinator.page_status();
    assert_eq!(status.current_page, 2);
    assert_eq!(status.total_pages, 3);
}

#[tokio::test]
async fn next_page_is_a_noop_on_the_last_page() {
    let backend = FakeBackend::new();
    backend.push(Ok(page(1, 1, &["Only"])));
    let store = mem_store().await;
    let coordinator = SearchCoordinator::new(backend.clone(), store);
    let mut rows_rx = coordinator.rows();

    coordinator.submit_search("single");
    wait_rows(&mut rows_rx, |rows| rows.len() == 1).await;

    coordinator.load_next_page_if_available();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.attempts(), 1);
}

#[tokio::test]
async fn next_page_is_a_noop_without_a_keyword() {
    let backend = FakeBackend::new();
    let store = mem_store().await;
    let coordinator = SearchCoordinator::new(backend.clone(), store);

    coordinator.load_next_page_if_available();
    sleep(Duration::from_millis(50)).await;
    assert_eq!(backend.attempts(), 0);
}

#[tokio::test]
async fn transport_failures_map_onto_the_user_taxonomy() {
    let backend = FakeBackend::new();
    backend.push(Err(FetchError::Network));
    backend.push(Err(FetchError::Decode));
    let store = mem_store().await;
    let coordinator = SearchCoordinator::new(backend.clone(), store.clone());
    let mut error_rx = coordinator.last_error();

    coordinator.submit_search("offline");
    wait_error(&mut error_rx, ErrorKind::NoInternet).await;

    coordinator.submit_search("garbled");
    wait_error(&mut error_rx, ErrorKind::UnknownError).await;

    assert!(store.list_all().await.expect("list").is_empty());
}

#[tokio::test]
async fn a_new_search_discards_accumulated_pages() {
    let backend = FakeBackend::new();
    backend.push(Ok(page(1, 2, &["A"])));
    let store = mem_store().await;
    let coordinator = SearchCoordinator::new(backend.clone(), store);
    let mut rows_rx = coordinator.rows();

    coordinator.submit_search("first");
    wait_rows(&mut rows_rx, |rows| rows.len() == 1).await;

    backend.push(Ok(page(2, 2, &["B"])));
    coordinator.load_next_page_if_available();
    wait_rows(&mut rows_rx, |rows| rows.len() == 2).await;

    backend.push(Ok(page(1, 1, &["C"])));
    coordinator.submit_search("second");
    let rows = wait_rows(&mut rows_rx, |rows| titles(rows) == vec!["C"]).await;
    assert_eq!(rows.len(), 1);

    let status = coordinator.page_status();
    assert_eq!(status.current_page, 1);
    assert_eq!(status.total_pages, 1);
}

#[tokio::test]
async fn suggestions_snapshot_then_filter_locally() {
    let backend = FakeBackend::new();
    let store = mem_store().await;
    store.record_successful_search("Batman").await.expect("seed");
    store.record_successful_search("Robin").await.expect("seed");
    let coordinator = SearchCoordinator::new(backend.clone(), store);

    coordinator.show_suggestions("").await;
    let rows = coordinator.rows().borrow().clone();
    assert_eq!(titles(&rows), vec!["Robin", "Batman"]);
    assert!(rows.iter().all(|r| matches!(r, DisplayRow::Suggestion(_))));

    coordinator.filter_suggestions("rob");
    assert_eq!(titles(&coordinator.rows().borrow()), vec!["Robin"]);

    coordinator.filter_suggestions("zzz");
    assert!(coordinator.rows().borrow().is_empty());

    // Suggestion traffic never touches the remote API.
    assert_eq!(backend.attempts(), 0);
}
