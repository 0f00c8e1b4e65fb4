use std::sync::{Arc, Mutex};

use tokio::sync::watch;
use tracing::warn;

use reel_api::error::ErrorKind;
use reel_api::response::SearchResultItem;

use crate::remote::SearchBackend;
use crate::store::{keyword_matches, Suggestion, SuggestionStore};

/// One row of the search screen. A published list is always homogeneous:
/// either all movies or all suggestions, never mixed.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayRow {
    Movie(SearchResultItem),
    Suggestion(Suggestion),
}

/// Point-in-time pagination view for the display layer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageStatus {
    pub current_page: u32,
    pub total_pages: u32,
    pub is_loading_next_page: bool,
}

/// Mutable per-search state. `current_page` of 0 means nothing loaded yet;
/// the remote API counts pages from 1.
#[derive(Default)]
struct SearchSession {
    last_keyword: Option<String>,
    current_page: u32,
    total_pages: u32,
    is_loading_next_page: bool,
    movie_rows: Vec<SearchResultItem>,
    suggestion_cache: Vec<Suggestion>,
}

struct Inner {
    backend: Arc<dyn SearchBackend>,
    store: SuggestionStore,
    session: Mutex<SearchSession>,
    rows_tx: watch::Sender<Vec<DisplayRow>>,
    error_tx: watch::Sender<Option<ErrorKind>>,
}

/// Coordinates remote paginated search, the persisted suggestion store, and
/// the rows/error state the display layer observes. Cheap to clone; all
/// clones share one session. Fetch completions are delivered through the
/// observable state, so operations must run inside a Tokio runtime.
#[derive(Clone)]
pub struct SearchCoordinator {
    inner: Arc<Inner>,
}

impl SearchCoordinator {
    pub fn new(backend: Arc<dyn SearchBackend>, store: SuggestionStore) -> Self {
        let (rows_tx, _) = watch::channel(Vec::new());
        let (error_tx, _) = watch::channel(None);
        Self {
            inner: Arc::new(Inner {
                backend,
                store,
                session: Mutex::new(SearchSession::default()),
                rows_tx,
                error_tx,
            }),
        }
    }

    /// Observable list of rows to display.
    pub fn rows(&self) -> watch::Receiver<Vec<DisplayRow>> {
        self.inner.rows_tx.subscribe()
    }

    /// Observable most-recent error. `None` again after a successful fetch.
    pub fn last_error(&self) -> watch::Receiver<Option<ErrorKind>> {
        self.inner.error_tx.subscribe()
    }

    pub fn page_status(&self) -> PageStatus {
        let session = self.inner.session.lock().unwrap();
        PageStatus {
            current_page: session.current_page,
            total_pages: session.total_pages,
            is_loading_next_page: session.is_loading_next_page,
        }
    }

    /// Start a fresh search for `raw_keyword`, discarding any accumulated
    /// pages. Returns immediately; results arrive through the observable
    /// state. An empty (after trimming) keyword surfaces `InvalidKeyword`
    /// and no request is made.
    pub fn submit_search(&self, raw_keyword: &str) {
        let keyword = raw_keyword.trim();
        if keyword.is_empty() {
            self.inner
                .error_tx
                .send_replace(Some(ErrorKind::InvalidKeyword));
            return;
        }
        let keyword = keyword.to_string();
        {
            let mut session = self.inner.session.lock().unwrap();
            session.last_keyword = Some(keyword.clone());
            session.current_page = 0;
            session.total_pages = 0;
            session.movie_rows.clear();
        }
        self.inner.rows_tx.send_replace(Vec::new());
        self.spawn_fetch(keyword, 1, true);
    }

    /// Fetch the page after the current one. A no-op unless a keyword is
    /// active, nothing is in flight, and more pages remain. The in-flight
    /// flag is taken while the session lock is held, so at most one
    /// page-advance request is outstanding at any time.
    pub fn load_next_page_if_available(&self) {
        let (keyword, next_page) = {
            let mut session = self.inner.session.lock().unwrap();
            let Some(keyword) = session.last_keyword.clone() else {
                return;
            };
            if session.is_loading_next_page || session.current_page >= session.total_pages {
                return;
            }
            session.is_loading_next_page = true;
            (keyword, session.current_page + 1)
        };
        self.spawn_fetch(keyword, next_page, false);
    }

    /// Snapshot the persisted suggestions into the session cache, then
    /// publish the ones matching `typed`. A failed store read keeps the
    /// previous snapshot.
    pub async fn show_suggestions(&self, typed: &str) {
        match self.inner.store.list_all().await {
            Ok(all) => {
                self.inner.session.lock().unwrap().suggestion_cache = all;
            }
            Err(err) => {
                warn!(target: "reel_session", "suggestion load failed: {err:#}");
            }
        }
        self.filter_suggestions(typed);
    }

    /// Publish the cached suggestions matching `typed` (all of them when
    /// `typed` is empty). Remote search state is untouched.
    pub fn filter_suggestions(&self, typed: &str) {
        let rows: Vec<DisplayRow> = {
            let session = self.inner.session.lock().unwrap();
            session
                .suggestion_cache
                .iter()
                .filter(|s| keyword_matches(&s.keyword, typed))
                .cloned()
                .map(DisplayRow::Suggestion)
                .collect()
        };
        self.inner.rows_tx.send_replace(rows);
    }

    // In-flight fetches are never cancelled: a submit_search that supersedes
    // an outstanding fetch lets both responses land, and a stale late
    // response may overwrite newer state.
    fn spawn_fetch(&self, keyword: String, page: u32, clear_current: bool) {
        let this = self.clone();
        tokio::spawn(async move {
            this.fetch_page(keyword, page, clear_current).await;
        });
    }

    async fn fetch_page(&self, keyword: String, page: u32, clear_current: bool) {
        let result = self.inner.backend.search(&keyword, page).await;

        let merged = match result {
            Ok(fetched) if !fetched.items.is_empty() => {
                let rows: Vec<DisplayRow> = {
                    let mut session = self.inner.session.lock().unwrap();
                    session.current_page = fetched.page_number;
                    session.total_pages = fetched.total_pages;
                    if clear_current {
                        session.movie_rows = fetched.items;
                    } else {
                        session.movie_rows.extend(fetched.items);
                    }
                    session
                        .movie_rows
                        .iter()
                        .cloned()
                        .map(DisplayRow::Movie)
                        .collect()
                };
                self.inner.rows_tx.send_replace(rows);
                self.inner.error_tx.send_replace(None);
                true
            }
            Ok(fetched) => {
                {
                    let mut session = self.inner.session.lock().unwrap();
                    session.current_page = fetched.page_number;
                    session.total_pages = fetched.total_pages;
                }
                self.inner
                    .error_tx
                    .send_replace(Some(ErrorKind::MovieNotFound));
                false
            }
            Err(err) => {
                self.inner.error_tx.send_replace(Some(err.into()));
                false
            }
        };

        // Recorded only after the fetched page is merged into the published
        // rows, so the store never holds a keyword whose results failed to
        // materialize. Persistence is best-effort.
        if merged {
            if let Err(err) = self.inner.store.record_successful_search(&keyword).await {
                warn!(target: "reel_session", "suggestion record failed: {err:#}");
            }
        }

        self.inner.session.lock().unwrap().is_loading_next_page = false;
    }
}
