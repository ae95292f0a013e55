use std::collections::BTreeMap;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rusqlite::types::Type;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};
use rusqlite_migration::{Migrations, M};
use tracing::debug;

use crate::app::{HoundError, Result};
use crate::domain::{Polarity, ProductDescription, ProductReviews, ReviewRecord, SearchResult};
use crate::store::Store;

const UPSERT_REVIEW: &str = "INSERT INTO reviews (review_id, asin, title, body, rating, country, review_date,
                            verified_purchase, helpful_votes, polarity, captured_at)
     VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11)
     ON CONFLICT(review_id, asin) DO UPDATE SET
        title = excluded.title,
        body = excluded.body,
        rating = excluded.rating,
        country = excluded.country,
        review_date = excluded.review_date,
        verified_purchase = excluded.verified_purchase,
        helpful_votes = excluded.helpful_votes,
        polarity = excluded.polarity,
        captured_at = excluded.captured_at";

const UPSERT_DESCRIPTION: &str = "INSERT INTO descriptions (asin, title, bullet_points, captured_at)
     VALUES (?1, ?2, ?3, ?4)
     ON CONFLICT(asin) DO UPDATE SET
        title = excluded.title,
        bullet_points = excluded.bullet_points,
        captured_at = excluded.captured_at";

pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(Duration::from_secs(5))?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let store = Self {
            conn: Mutex::new(conn),
        };
        store.run_migrations()?;
        Ok(store)
    }

    fn run_migrations(&self) -> Result<()> {
        let migrations = Migrations::new(vec![M::up(include_str!(
            "../../migrations/001-initial/up.sql"
        ))]);

        let mut conn = self.conn()?;
        migrations
            .to_latest(&mut conn)
            .map_err(|e| HoundError::Other(format!("Migration failed: {}", e)))?;

        Ok(())
    }

    fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn.lock().map_err(|e| {
            HoundError::Database(rusqlite::Error::SqliteFailure(
                rusqlite::ffi::Error::new(1),
                Some(e.to_string()),
            ))
        })
    }

    fn parse_datetime(s: &str) -> Option<DateTime<Utc>> {
        DateTime::parse_from_rfc3339(s)
            .map(|dt| dt.with_timezone(&Utc))
            .ok()
            .or_else(|| s.parse::<DateTime<Utc>>().ok())
    }

    fn json_column<T: serde::de::DeserializeOwned>(row: &Row<'_>, idx: usize) -> rusqlite::Result<T> {
        let text: String = row.get(idx)?;
        serde_json::from_str(&text)
            .map_err(|e| rusqlite::Error::FromSqlConversionFailure(idx, Type::Text, Box::new(e)))
    }

    fn review_from_row(row: &Row<'_>) -> rusqlite::Result<ReviewRecord> {
        let polarity: String = row.get(9)?;
        let polarity = polarity.parse::<Polarity>().map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(
                9,
                Type::Text,
                Box::new(std::io::Error::new(std::io::ErrorKind::InvalidData, e)),
            )
        })?;

        Ok(ReviewRecord {
            review_id: row.get(0)?,
            asin: row.get(1)?,
            title: row.get(2)?,
            body: row.get(3)?,
            rating: row.get(4)?,
            country: row.get(5)?,
            review_date: row.get(6)?,
            verified_purchase: row.get::<_, i32>(7)? != 0,
            helpful_votes: row.get(8)?,
            polarity,
        })
    }

    fn placeholders(count: usize) -> String {
        vec!["?"; count].join(", ")
    }

    fn execute_review_upsert(conn: &Connection, review: &ReviewRecord, now: &str) -> Result<usize> {
        let changed = conn.execute(
            UPSERT_REVIEW,
            params![
                review.review_id,
                review.asin,
                review.title,
                review.body,
                review.rating,
                review.country,
                review.review_date,
                review.verified_purchase as i32,
                review.helpful_votes,
                review.polarity.as_str(),
                now
            ],
        )?;
        Ok(changed)
    }

    fn execute_description_upsert(conn: &Connection, description: &ProductDescription) -> Result<()> {
        conn.execute(
            UPSERT_DESCRIPTION,
            params![
                description.asin,
                description.title,
                serde_json::to_string(&description.bullet_points)?,
                description.captured_at.to_rfc3339()
            ],
        )?;
        Ok(())
    }
}

impl Store for SqliteStore {
    fn insert_search_result(&self, result: &SearchResult) -> Result<bool> {
        let conn = self.conn()?;

        let inserted = conn.execute(
            "INSERT OR IGNORE INTO search_results (keyword, excluded_asin, competitor_asins, discovered_at)
             VALUES (?1, ?2, ?3, ?4)",
            params![
                result.keyword,
                result.excluded_asin,
                serde_json::to_string(&result.competitor_asins)?,
                result.discovered_at.to_rfc3339()
            ],
        )?;

        Ok(inserted > 0)
    }

    fn get_search_result(
        &self,
        keyword: &str,
        excluded_asin: &str,
    ) -> Result<Option<SearchResult>> {
        let conn = self.conn()?;

        let result = conn
            .query_row(
                "SELECT keyword, excluded_asin, competitor_asins, discovered_at
                 FROM search_results WHERE keyword = ?1 AND excluded_asin = ?2",
                params![keyword, excluded_asin],
                |row| {
                    Ok(SearchResult {
                        keyword: row.get(0)?,
                        excluded_asin: row.get(1)?,
                        competitor_asins: Self::json_column(row, 2)?,
                        discovered_at: row
                            .get::<_, String>(3)
                            .ok()
                            .and_then(|s| Self::parse_datetime(&s))
                            .unwrap_or_else(Utc::now),
                    })
                },
            )
            .optional()?;

        Ok(result)
    }

    fn upsert_description(&self, description: &ProductDescription) -> Result<()> {
        let conn = self.conn()?;
        Self::execute_description_upsert(&conn, description)
    }

    fn get_descriptions(&self, asins: &[String]) -> Result<BTreeMap<String, ProductDescription>> {
        if asins.is_empty() {
            return Ok(BTreeMap::new());
        }

        let conn = self.conn()?;
        let sql = format!(
            "SELECT asin, title, bullet_points, captured_at FROM descriptions WHERE asin IN ({})",
            Self::placeholders(asins.len())
        );
        let mut stmt = conn.prepare(&sql)?;

        let descriptions = stmt
            .query_map(params_from_iter(asins.iter()), |row| {
                Ok(ProductDescription {
                    asin: row.get(0)?,
                    title: row.get(1)?,
                    bullet_points: Self::json_column(row, 2)?,
                    captured_at: row
                        .get::<_, String>(3)
                        .ok()
                        .and_then(|s| Self::parse_datetime(&s))
                        .unwrap_or_else(Utc::now),
                })
            })?
            .map(|r| r.map(|d| (d.asin.clone(), d)))
            .collect::<std::result::Result<BTreeMap<_, _>, _>>()?;

        Ok(descriptions)
    }

    fn upsert_reviews(&self, reviews: &[ReviewRecord]) -> Result<usize> {
        let mut conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        let mut count = 0;
        for review in reviews {
            count += Self::execute_review_upsert(&tx, review, &now)?;
        }
        tx.commit()?;

        Ok(count)
    }

    fn get_reviews(&self, asins: &[String]) -> Result<BTreeMap<String, ProductReviews>> {
        let mut grouped: BTreeMap<String, ProductReviews> = asins
            .iter()
            .map(|a| (a.clone(), ProductReviews::default()))
            .collect();

        if asins.is_empty() {
            return Ok(grouped);
        }

        let conn = self.conn()?;
        let sql = format!(
            "SELECT review_id, asin, title, body, rating, country, review_date,
                    verified_purchase, helpful_votes, polarity
             FROM reviews WHERE asin IN ({}) ORDER BY rowid",
            Self::placeholders(asins.len())
        );
        let mut stmt = conn.prepare(&sql)?;

        let rows = stmt
            .query_map(params_from_iter(asins.iter()), Self::review_from_row)?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for review in rows {
            grouped.entry(review.asin.clone()).or_default().push(review);
        }

        Ok(grouped)
    }

    fn count_reviews(&self, asin: &str) -> Result<i64> {
        let conn = self.conn()?;

        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM reviews WHERE asin = ?1",
            params![asin],
            |row| row.get(0),
        )?;

        Ok(count)
    }

    fn save_product(
        &self,
        description: &ProductDescription,
        reviews: &[ReviewRecord],
    ) -> Result<usize> {
        let mut conn = self.conn()?;
        let now = Utc::now().to_rfc3339();

        let tx = conn.transaction()?;
        Self::execute_description_upsert(&tx, description)?;
        let mut count = 0;
        for review in reviews {
            count += Self::execute_review_upsert(&tx, review, &now)?;
        }
        tx.commit()?;

        debug!(
            "Saved description and {} reviews for {}",
            count, description.asin
        );
        Ok(count)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn review(id: &str, asin: &str, polarity: Polarity) -> ReviewRecord {
        ReviewRecord {
            review_id: id.into(),
            asin: asin.into(),
            title: Some("Title".into()),
            body: Some("Body".into()),
            rating: Some(2.0),
            country: Some("United States".into()),
            review_date: Some("May 1, 2024".into()),
            verified_purchase: true,
            helpful_votes: 4,
            polarity,
        }
    }

    #[test]
    fn test_insert_and_get_search_result() {
        let store = SqliteStore::in_memory().unwrap();
        let result = SearchResult::new("LED TV", "B000000001", vec!["B1".into(), "B2".into()]);
        assert!(store.insert_search_result(&result).unwrap());

        let found = store
            .get_search_result("LED TV", "B000000001")
            .unwrap()
            .unwrap();
        assert_eq!(found.competitor_asins, vec!["B1", "B2"]);

        assert!(store.get_search_result("LED TV", "B9").unwrap().is_none());
        assert!(store.get_search_result("OLED TV", "B000000001").unwrap().is_none());
    }

    #[test]
    fn test_search_result_is_insert_once() {
        let store = SqliteStore::in_memory().unwrap();
        let first = SearchResult::new("lamp", "B9", vec!["B1".into()]);
        let second = SearchResult::new("lamp", "B9", vec!["B7".into()]);

        assert!(store.insert_search_result(&first).unwrap());
        assert!(!store.insert_search_result(&second).unwrap());

        let found = store.get_search_result("lamp", "B9").unwrap().unwrap();
        assert_eq!(found.competitor_asins, vec!["B1"]);
    }

    #[test]
    fn test_upsert_description_overwrites() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_description(&ProductDescription::new("B1", "Old", vec!["a".into()]))
            .unwrap();
        store
            .upsert_description(&ProductDescription::new("B1", "New", vec!["b".into(), "c".into()]))
            .unwrap();

        let map = store.get_descriptions(&["B1".into()]).unwrap();
        assert_eq!(map.len(), 1);
        assert_eq!(map["B1"].title, "New");
        assert_eq!(map["B1"].bullet_points, vec!["b", "c"]);
    }

    #[test]
    fn test_placeholder_description_is_storable() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_description(&ProductDescription::placeholder("B1"))
            .unwrap();
        let map = store.get_descriptions(&["B1".into()]).unwrap();
        assert!(map["B1"].is_placeholder());
    }

    #[test]
    fn test_review_upsert_is_idempotent_with_latest_values() {
        let store = SqliteStore::in_memory().unwrap();
        let mut r = review("R1", "B1", Polarity::Critical);
        store.upsert_reviews(&[r.clone()]).unwrap();

        r.helpful_votes = 40;
        r.title = Some("Edited".into());
        store.upsert_reviews(&[r]).unwrap();

        assert_eq!(store.count_reviews("B1").unwrap(), 1);
        let grouped = store.get_reviews(&["B1".into()]).unwrap();
        let stored = &grouped["B1"].critical[0];
        assert_eq!(stored.helpful_votes, 40);
        assert_eq!(stored.title.as_deref(), Some("Edited"));
    }

    #[test]
    fn test_same_review_id_under_two_products() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_reviews(&[
                review("R1", "B1", Polarity::Critical),
                review("R1", "B2", Polarity::Critical),
            ])
            .unwrap();
        assert_eq!(store.count_reviews("B1").unwrap(), 1);
        assert_eq!(store.count_reviews("B2").unwrap(), 1);
    }

    #[test]
    fn test_get_reviews_groups_by_polarity() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .upsert_reviews(&[
                review("R1", "B1", Polarity::Critical),
                review("R2", "B1", Polarity::Positive),
                review("R3", "B1", Polarity::Positive),
            ])
            .unwrap();

        let grouped = store.get_reviews(&["B1".into(), "B2".into()]).unwrap();
        assert_eq!(grouped["B1"].critical.len(), 1);
        assert_eq!(grouped["B1"].positive.len(), 2);
        assert!(grouped["B2"].is_empty());
    }

    #[test]
    fn test_nullable_review_fields_round_trip() {
        let store = SqliteStore::in_memory().unwrap();
        let mut r = review("R1", "B1", Polarity::Positive);
        r.rating = None;
        r.review_date = None;
        r.country = None;
        store.upsert_reviews(&[r.clone()]).unwrap();

        let grouped = store.get_reviews(&["B1".into()]).unwrap();
        assert_eq!(grouped["B1"].positive[0], r);
    }

    #[test]
    fn test_save_product_batches_description_and_reviews() {
        let store = SqliteStore::in_memory().unwrap();
        let desc = ProductDescription::new("B1", "TV", vec!["4K".into()]);
        let count = store
            .save_product(
                &desc,
                &[
                    review("R1", "B1", Polarity::Critical),
                    review("R2", "B1", Polarity::Positive),
                ],
            )
            .unwrap();
        assert_eq!(count, 2);
        assert_eq!(store.get_descriptions(&["B1".into()]).unwrap()["B1"].title, "TV");
        assert_eq!(store.count_reviews("B1").unwrap(), 2);
    }

    #[test]
    fn test_lookup_job_miss_and_hit() {
        let store = SqliteStore::in_memory().unwrap();
        assert!(store.lookup_job("LED TV", "B000000001").unwrap().is_none());

        store
            .insert_search_result(&SearchResult::new("LED TV", "B000000001", vec!["B1".into()]))
            .unwrap();
        store
            .save_product(
                &ProductDescription::new("B1", "TV", vec![]),
                &[review("R1", "B1", Polarity::Critical)],
            )
            .unwrap();
        store
            .save_product(&ProductDescription::placeholder("B000000001"), &[])
            .unwrap();

        let snapshot = store.lookup_job("LED TV", "B000000001").unwrap().unwrap();
        assert_eq!(snapshot.search.competitor_asins, vec!["B1"]);
        assert_eq!(snapshot.descriptions.len(), 2);
        assert_eq!(snapshot.reviews["B1"].critical.len(), 1);
        assert!(snapshot.reviews["B000000001"].is_empty());
    }

    #[test]
    fn test_lookup_job_incomplete_is_a_miss() {
        let store = SqliteStore::in_memory().unwrap();
        store
            .insert_search_result(&SearchResult::new(
                "LED TV",
                "B000000001",
                vec!["B1".into(), "B2".into()],
            ))
            .unwrap();
        store
            .save_product(&ProductDescription::new("B1", "TV", vec![]), &[])
            .unwrap();
        store
            .save_product(&ProductDescription::placeholder("B000000001"), &[])
            .unwrap();

        // B2 never got written
        assert!(store.lookup_job("LED TV", "B000000001").unwrap().is_none());
        assert!(store.get_search_result("LED TV", "B000000001").unwrap().is_some());

        store
            .save_product(&ProductDescription::placeholder("B2"), &[])
            .unwrap();
        assert!(store.lookup_job("LED TV", "B000000001").unwrap().is_some());
    }

    #[test]
    fn test_on_disk_store_persists_across_reopen() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("hound.db");
        {
            let store = SqliteStore::new(&path).unwrap();
            store
                .insert_search_result(&SearchResult::new("lamp", "B9", vec!["B1".into()]))
                .unwrap();
        }
        let store = SqliteStore::new(&path).unwrap();
        assert!(store.get_search_result("lamp", "B9").unwrap().is_some());
    }
}
