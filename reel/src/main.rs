use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Datelike;
use dotenv::dotenv;
use tokio::io::{AsyncBufReadExt, BufReader};

use reel::api::endpoint::{SearchEndpoint, DEFAULT_BASE_URL};
use reel::api::poster::{poster_url, PosterSize, IMAGES_BASE_URL};
use reel::remote::RemoteSearchClient;
use reel::session::{DisplayRow, SearchCoordinator};
use reel::store::SuggestionStore;
use reel_db::{Db, DbConfig, HealthStatus};

#[tokio::main]
async fn main() -> Result<()> {
    dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();

    // Config via env:
    // REEL_API_KEY (required), REEL_API_BASE, REEL_IMAGES_BASE,
    // REEL_DB_* (see reel-db)
    let api_key = match std::env::var("REEL_API_KEY") {
        Ok(k) if !k.trim().is_empty() => k,
        _ => {
            eprintln!(
                "[api] missing REEL_API_KEY\n\nHint:\n- Request an API key from the movie database service\n- export REEL_API_KEY=<your key> (or put it in .env)\n"
            );
            std::process::exit(1);
        }
    };
    let api_base =
        std::env::var("REEL_API_BASE").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
    let images_base =
        std::env::var("REEL_IMAGES_BASE").unwrap_or_else(|_| IMAGES_BASE_URL.to_string());

    let pool = {
        let db_cfg = DbConfig::from_env();
        eprintln!("[db] suggestion store at {}", db_cfg.path.display());
        let db = Db::new(db_cfg);
        db.init().await.with_context(|| "database init failed")?;
        let pool = db
            .get_pool()
            .await
            .with_context(|| "database pool acquisition failed")?
            .clone();
        match db.health_check().await {
            HealthStatus::Ok => {}
            status => eprintln!("[db] health: {status:?}; suggestions may be unavailable"),
        }
        pool
    };
    eprintln!("[db] pool ready");

    let endpoint = SearchEndpoint::new(&api_base, api_key)
        .with_context(|| format!("invalid REEL_API_BASE: {api_base}"))?;
    let client = RemoteSearchClient::new(endpoint, reqwest::Client::new());
    let store = SuggestionStore::new(pool);
    let coordinator = SearchCoordinator::new(Arc::new(client), store.clone());

    eprintln!(
        "reel ready: type a keyword to search; /more next page; /suggest [text]; /forget <keyword>; /quit"
    );

    // Render task: print whatever the coordinator currently exposes.
    {
        let mut rows_rx = coordinator.rows();
        let mut error_rx = coordinator.last_error();
        let coordinator = coordinator.clone();
        let images_base = images_base.clone();
        tokio::spawn(async move {
            loop {
                tokio::select! {
                    changed = rows_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        let rows = rows_rx.borrow_and_update().clone();
                        render_rows(&rows, &images_base);
                        let status = coordinator.page_status();
                        if status.total_pages > 0 && !rows.is_empty() {
                            eprintln!("[page {}/{}]", status.current_page, status.total_pages);
                        }
                    }
                    changed = error_rx.changed() => {
                        if changed.is_err() {
                            break;
                        }
                        if let Some(kind) = *error_rx.borrow_and_update() {
                            eprintln!("! {kind}");
                        }
                    }
                }
            }
        });
    }

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        match line {
            "" => {}
            "/quit" => break,
            "/more" => coordinator.load_next_page_if_available(),
            _ if line == "/suggest" || line.starts_with("/suggest ") => {
                let typed = line.strip_prefix("/suggest").unwrap_or("").trim();
                coordinator.show_suggestions(typed).await;
            }
            _ if line.starts_with("/forget ") => {
                let keyword = line.strip_prefix("/forget ").unwrap_or("").trim();
                if let Err(err) = store.remove_exact(keyword).await {
                    eprintln!("[db] forget failed: {err:#}");
                }
            }
            _ => coordinator.submit_search(line),
        }
    }

    Ok(())
}

fn render_rows(rows: &[DisplayRow], images_base: &str) {
    for row in rows {
        match row {
            DisplayRow::Movie(movie) => {
                let year = movie
                    .release_date
                    .map(|d| d.year().to_string())
                    .unwrap_or_else(|| "----".to_string());
                println!("{year}  {}", movie.title);
                if let Some(path) = &movie.poster_path {
                    println!("      {}", poster_url(images_base, PosterSize::W185, path));
                }
                if let Some(overview) = &movie.overview {
                    println!("      {}", truncate(overview, 120));
                }
            }
            DisplayRow::Suggestion(suggestion) => println!("? {}", suggestion.keyword),
        }
    }
}

fn truncate(text: &str, max_chars: usize) -> String {
    if text.chars().count() <= max_chars {
        return text.to_string();
    }
    let mut out: String = text.chars().take(max_chars).collect();
    out.push('…');
    out
}
