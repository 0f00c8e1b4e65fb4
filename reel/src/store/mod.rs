use anyhow::Result;
use reel_db::SqlitePool;
use sqlx::Row;

/// Hard cap on remembered keywords. Recording beyond it evicts the
/// least-recently-added entry.
pub const MAX_SUGGESTIONS: i64 = 10;

/// One remembered search keyword.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Suggestion {
    pub keyword: String,
}

/// Case-insensitive substring match shared by every suggestion filter
/// surface. An empty `needle` matches everything.
pub fn keyword_matches(keyword: &str, needle: &str) -> bool {
    if needle.is_empty() {
        return true;
    }
    keyword.to_lowercase().contains(&needle.to_lowercase())
}

/// Persisted, recency-ordered, size-bounded collection of previously
/// searched keywords. At most one entry per distinct keyword text.
#[derive(Clone)]
pub struct SuggestionStore {
    pool: SqlitePool,
}

impl SuggestionStore {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Remember `keyword` as the most recent suggestion.
    /// - An existing entry for the same keyword is removed first, so a
    ///   re-submitted keyword moves to the front instead of duplicating.
    /// - At capacity the least-recently-added entry is evicted.
    /// The whole mutation is one transaction.
    pub async fn record_successful_search(&self, keyword: &str) -> Result<()> {
        let keyword = keyword.trim();
        if keyword.is_empty() {
            anyhow::bail!("empty keyword");
        }

        let mut tx = self.pool.begin().await?;

        sqlx::query("DELETE FROM suggestions WHERE keyword = ?1")
            .bind(keyword)
            .execute(&mut *tx)
            .await?;

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM suggestions")
            .fetch_one(&mut *tx)
            .await?;
        if count >= MAX_SUGGESTIONS {
            let overflow = count - MAX_SUGGESTIONS + 1;
            sqlx::query(
                "DELETE FROM suggestions WHERE id IN (
                     SELECT id FROM suggestions ORDER BY id ASC LIMIT ?1)",
            )
            .bind(overflow)
            .execute(&mut *tx)
            .await?;
        }

        sqlx::query("INSERT INTO suggestions (keyword) VALUES (?1)")
            .bind(keyword)
            .execute(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(())
    }

    /// All remembered keywords, most recently added first.
    pub async fn list_all(&self) -> Result<Vec<Suggestion>> {
        let rows = sqlx::query("SELECT keyword FROM suggestions ORDER BY id DESC")
            .fetch_all(&self.pool)
            .await?;
        let mut out = Vec::with_capacity(rows.len());
        for r in rows {
            let keyword: String = r.try_get("keyword")?;
            out.push(Suggestion { keyword });
        }
        Ok(out)
    }

    /// Remembered keywords containing `substring` (case-insensitive), most
    /// recent first. An empty `substring` returns everything.
    ///
    /// The store never holds more than MAX_SUGGESTIONS rows, so the match
    /// runs in process over `list_all` rather than through SQL LIKE.
    pub async fn filter(&self, substring: &str) -> Result<Vec<Suggestion>> {
        let mut all = self.list_all().await?;
        all.retain(|s| keyword_matches(&s.keyword, substring));
        Ok(all)
    }

    /// Forget the entry whose keyword exactly equals `keyword`, if present.
    pub async fn remove_exact(&self, keyword: &str) -> Result<()> {
        sqlx::query("DELETE FROM suggestions WHERE keyword = ?1")
            .bind(keyword)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_match_is_case_insensitive_substring() {
        assert!(keyword_matches("Batman Returns", "man re"));
        assert!(keyword_matches("Batman Returns", "BATMAN"));
        assert!(!keyword_matches("Batman Returns", "superman"));
    }

    #[test]
    fn empty_needle_matches_everything() {
        assert!(keyword_matches("anything", ""));
        assert!(keyword_matches("", ""));
    }
}
