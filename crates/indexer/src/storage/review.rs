//! Review storage operations.

use super::types::REVIEWS;
use super::{Storage, StoreError, StoreResult};
use netsepio_core::{AccountKey, Review, ReviewId};
use sqlx::sqlite::SqliteRow;
use sqlx::Row;

const SELECT_REVIEW: &str = r#"
    SELECT id, category, domain_address, site_url, site_type, site_tag,
           site_safety, metadata_uri, review_by, deleted, info_hash
    FROM reviews
"#;

impl Storage {
    /// Upsert a review, overwriting every stored field.
    pub async fn upsert_review(&self, review: &Review) -> StoreResult<()> {
        let review_by = review.review_by.to_string();

        self.bounded(
            "save_review",
            sqlx::query(
                r#"
                INSERT INTO reviews (
                    id, category, domain_address, site_url, site_type, site_tag,
                    site_safety, metadata_uri, review_by, deleted, info_hash
                )
                VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?)
                ON CONFLICT(id) DO UPDATE SET
                    category = excluded.category,
                    domain_address = excluded.domain_address,
                    site_url = excluded.site_url,
                    site_type = excluded.site_type,
                    site_tag = excluded.site_tag,
                    site_safety = excluded.site_safety,
                    metadata_uri = excluded.metadata_uri,
                    review_by = excluded.review_by,
                    deleted = excluded.deleted,
                    info_hash = excluded.info_hash
                "#,
            )
            .bind(review.id.as_str())
            .bind(&review.category)
            .bind(&review.domain_address)
            .bind(&review.site_url)
            .bind(&review.site_type)
            .bind(&review.site_tag)
            .bind(&review.site_safety)
            .bind(&review.metadata_uri)
            .bind(&review_by)
            .bind(review.deleted)
            .bind(&review.info_hash)
            .execute(&self.pool),
        )
        .await?;

        Ok(())
    }

    /// Get a review by token id.
    pub async fn fetch_review(&self, id: &ReviewId) -> StoreResult<Option<Review>> {
        let query = format!("{SELECT_REVIEW} WHERE id = ?");
        let row = self
            .bounded(
                "load_review",
                sqlx::query(&query).bind(id.as_str()).fetch_optional(&self.pool),
            )
            .await?;

        row.map(Self::row_to_review).transpose()
    }

    /// Get every review authored by `account`, in token id order.
    pub async fn fetch_reviews_by(&self, account: &AccountKey) -> StoreResult<Vec<Review>> {
        let query = format!("{SELECT_REVIEW} WHERE review_by = ? ORDER BY length(id), id");
        let account = account.to_string();
        let rows = self
            .bounded(
                "reviews_by",
                sqlx::query(&query).bind(&account).fetch_all(&self.pool),
            )
            .await?;

        rows.into_iter().map(Self::row_to_review).collect()
    }

    /// Helper function to convert a database row to a Review.
    fn row_to_review(row: SqliteRow) -> StoreResult<Review> {
        let key: String = row.try_get("id").unwrap_or_default();
        let corrupt = |reason: String| StoreError::Corrupt {
            collection: REVIEWS,
            key: key.clone(),
            reason,
        };
        let text = |column: &str| -> StoreResult<String> {
            row.try_get::<String, _>(column)
                .map_err(|e| corrupt(format!("column {column}: {e}")))
        };

        Ok(Review {
            id: key.parse().map_err(|e| corrupt(format!("{e}")))?,
            category: text("category")?,
            domain_address: text("domain_address")?,
            site_url: text("site_url")?,
            site_type: text("site_type")?,
            site_tag: text("site_tag")?,
            site_safety: text("site_safety")?,
            metadata_uri: text("metadata_uri")?,
            review_by: text("review_by")?
                .parse()
                .map_err(|e| corrupt(format!("{e}")))?,
            deleted: row
                .try_get("deleted")
                .map_err(|e| corrupt(format!("column deleted: {e}")))?,
            info_hash: text("info_hash")?,
        })
    }
}
