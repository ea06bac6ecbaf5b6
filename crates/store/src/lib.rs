use std::collections::HashSet;

use chrono::{DateTime, Duration, Utc};
use rand::seq::SliceRandom;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Row};
use thiserror::Error;

use nyx_core::{MetaTag, Page, ScrapeResult};

#[derive(Error, Debug)]
pub enum StoreError {
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("malformed meta_tags for {url}: {source}")]
    MalformedMetaTags {
        url: String,
        #[source]
        source: serde_json::Error,
    },
}

/// Catalogue store adapter. Every write-path method runs inside a
/// transaction that commits on success; an early `?` return drops the
/// transaction, which rolls it back.
#[derive(Clone)]
pub struct Catalogue {
    pool: PgPool,
}

impl Catalogue {
    pub async fn connect(database_url: &str) -> Result<Self, StoreError> {
        Self::connect_with_pool_size(database_url, 20).await
    }

    pub async fn connect_with_pool_size(
        database_url: &str,
        max_connections: u32,
    ) -> Result<Self, StoreError> {
        let pool = PgPoolOptions::new()
            .max_connections(max_connections)
            .connect(database_url)
            .await?;
        tracing::info!(max_connections, "connected to postgres");
        Ok(Self { pool })
    }

    pub async fn run_migrations(&self) -> Result<(), StoreError> {
        sqlx::raw_sql(include_str!("../migrations/001_pages.sql"))
            .execute(&self.pool)
            .await?;
        tracing::info!("migrations complete");
        Ok(())
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    /// Returns URLs due for (re)crawl, shuffled to spread load across domains.
    pub async fn list_due(&self, access_day_difference: i64) -> Result<Vec<String>, StoreError> {
        let cutoff = Utc::now() - Duration::days(access_day_difference);
        let rows = sqlx::query(
            "SELECT url FROM pages
             WHERE new_url = TRUE OR date_accessed < $1
             ORDER BY date_added ASC",
        )
        .bind(cutoff)
        .fetch_all(&self.pool)
        .await?;

        let mut urls: Vec<String> = rows.into_iter().map(|r| r.get("url")).collect();
        urls.shuffle(&mut rand::thread_rng());
        Ok(urls)
    }

    /// Pages eligible for training: scraped, with non-empty title and content.
    pub async fn list_trainable(&self) -> Result<Vec<Page>, StoreError> {
        let rows = sqlx::query(
            "SELECT url, date_accessed, page_title, page_content, meta_tags, parent_url, new_url, date_added
             FROM pages
             WHERE new_url = FALSE
               AND page_title IS NOT NULL AND page_title <> ''
               AND page_content IS NOT NULL AND page_content <> ''",
        )
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_page).collect()
    }

    pub async fn get_by_url(&self, url: &str) -> Result<Option<Page>, StoreError> {
        let row = sqlx::query(
            "SELECT url, date_accessed, page_title, page_content, meta_tags, parent_url, new_url, date_added
             FROM pages WHERE url = $1",
        )
        .bind(url)
        .fetch_optional(&self.pool)
        .await?;
        row.map(row_to_page).transpose()
    }

    pub async fn get_all_urls(&self) -> Result<HashSet<String>, StoreError> {
        let rows = sqlx::query("SELECT url FROM pages").fetch_all(&self.pool).await?;
        Ok(rows.into_iter().map(|r| r.get("url")).collect())
    }

    pub async fn search_by_urls(&self, urls: &HashSet<String>) -> Result<Vec<Page>, StoreError> {
        if urls.is_empty() {
            return Ok(Vec::new());
        }
        let list: Vec<String> = urls.iter().cloned().collect();
        let rows = sqlx::query(
            "SELECT url, date_accessed, page_title, page_content, meta_tags, parent_url, new_url, date_added
             FROM pages WHERE url = ANY($1)",
        )
        .bind(&list)
        .fetch_all(&self.pool)
        .await?;
        rows.into_iter().map(row_to_page).collect()
    }

    pub async fn update_scraped(&self, result: &ScrapeResult) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let meta_tags = serde_json::to_value(&result.meta_tags).unwrap_or_default();
        sqlx::query(
            "UPDATE pages
             SET page_title = $2, page_content = $3, meta_tags = $4,
                 date_accessed = NOW(), new_url = FALSE
             WHERE url = $1",
        )
        .bind(&result.url)
        .bind(&result.page_title)
        .bind(&result.page_content)
        .bind(meta_tags)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn insert_placeholder(
        &self,
        url: &str,
        parent_url: &str,
    ) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        sqlx::query(
            "INSERT INTO pages (url, parent_url, new_url, date_added)
             VALUES ($1, $2, TRUE, NOW())
             ON CONFLICT (url) DO NOTHING",
        )
        .bind(url)
        .bind(parent_url)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }

    pub async fn insert_scraped(&self, result: &ScrapeResult) -> Result<(), StoreError> {
        let mut tx = self.pool.begin().await?;
        let meta_tags = serde_json::to_value(&result.meta_tags).unwrap_or_default();
        sqlx::query(
            "INSERT INTO pages (url, page_title, page_content, meta_tags, new_url, date_accessed, date_added)
             VALUES ($1, $2, $3, $4, FALSE, NOW(), NOW())
             ON CONFLICT (url) DO UPDATE SET
                page_title = EXCLUDED.page_title,
                page_content = EXCLUDED.page_content,
                meta_tags = EXCLUDED.meta_tags,
                date_accessed = NOW(),
                new_url = FALSE",
        )
        .bind(&result.url)
        .bind(&result.page_title)
        .bind(&result.page_content)
        .bind(meta_tags)
        .execute(&mut *tx)
        .await?;
        tx.commit().await?;
        Ok(())
    }
}

fn row_to_page(row: sqlx::postgres::PgRow) -> Result<Page, StoreError> {
    let url: String = row.get("url");
    let date_accessed: Option<DateTime<Utc>> = row.get("date_accessed");
    let page_title: Option<String> = row.get("page_title");
    let page_content: Option<String> = row.get("page_content");
    let meta_tags_json: serde_json::Value = row.get("meta_tags");
    let parent_url: Option<String> = row.get("parent_url");
    let new_url: bool = row.get("new_url");
    let date_added: DateTime<Utc> = row.get("date_added");

    let meta_tags: Vec<MetaTag> = serde_json::from_value(meta_tags_json).map_err(|e| {
        StoreError::MalformedMetaTags {
            url: url.clone(),
            source: e,
        }
    })?;

    Ok(Page {
        url,
        date_accessed,
        page_title,
        page_content,
        meta_tags,
        parent_url,
        new_url,
        date_added,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn row_to_page_rejects_malformed_meta_tags_gracefully() {
        // Exercised indirectly through insert/search round trips against a
        // live database in integration environments; here we just check the
        // error variant carries the offending URL for diagnostics.
        let err = StoreError::MalformedMetaTags {
            url: "http://abc.onion".into(),
            source: serde_json::from_str::<Vec<MetaTag>>("not json").unwrap_err(),
        };
        assert!(err.to_string().contains("abc.onion"));
    }
}
