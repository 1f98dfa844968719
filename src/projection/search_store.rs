//! Search-index repository
//!
//! Full-text read model over shop-item titles and descriptions. Each row
//! holds the whole projection document; queries run a phrase-prefix
//! match against any item's title or description, with a
//! minimum-should-match of one field.

use sqlx::types::Json;
use sqlx::PgPool;

use crate::api::pagination::Pagination;

use super::error::ProjectionError;
use super::order_projection::OrderProjection;

#[derive(Debug, Clone)]
pub struct OrderSearchRepository {
    pool: PgPool,
    index: String,
}

impl OrderSearchRepository {
    pub fn new(pool: PgPool, index: impl Into<String>) -> Self {
        Self {
            pool,
            index: index.into(),
        }
    }

    /// Index or re-index the whole order document
    pub async fn index(&self, order: &OrderProjection) -> Result<(), ProjectionError> {
        let query = format!(
            r#"
            INSERT INTO {} (order_id, document)
            VALUES ($1, $2)
            ON CONFLICT (order_id) DO UPDATE SET
                document = EXCLUDED.document,
                updated_at = NOW()
            "#,
            self.index
        );

        sqlx::query(&query)
            .bind(&order.order_id)
            .bind(Json(order))
            .execute(&self.pool)
            .await?;

        Ok(())
    }

    /// Fetch the indexed document for a read-modify-write
    pub async fn get_by_id(
        &self,
        order_id: &str,
    ) -> Result<Option<OrderProjection>, ProjectionError> {
        let query = format!("SELECT document FROM {} WHERE order_id = $1", self.index);

        let row: Option<(Json<OrderProjection>,)> = sqlx::query_as(&query)
            .bind(order_id)
            .fetch_optional(&self.pool)
            .await?;

        Ok(row.map(|(document,)| document.0))
    }

    /// Phrase-prefix search: the query text must appear as a contiguous
    /// phrase in some item's title or in some item's description, with
    /// the trailing term matched as a prefix. One matching field is
    /// enough.
    ///
    /// Returns the page of matching documents together with the total
    /// match count for pagination.
    pub async fn search(
        &self,
        text: &str,
        pagination: &Pagination,
    ) -> Result<(Vec<OrderProjection>, i64), ProjectionError> {
        let Some((leading, boundary)) = phrase_prefix_patterns(text) else {
            return Ok((Vec::new(), 0));
        };

        let count_query = format!(
            r#"
            SELECT COUNT(*) FROM {}
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(document->'shopItems') AS item
                WHERE item->>'title' ILIKE $1 OR item->>'title' ILIKE $2
                   OR item->>'description' ILIKE $1 OR item->>'description' ILIKE $2
            )
            "#,
            self.index
        );

        let total_count: i64 = sqlx::query_scalar(&count_query)
            .bind(&leading)
            .bind(&boundary)
            .fetch_one(&self.pool)
            .await?;

        let page_query = format!(
            r#"
            SELECT document FROM {}
            WHERE EXISTS (
                SELECT 1 FROM jsonb_array_elements(document->'shopItems') AS item
                WHERE item->>'title' ILIKE $1 OR item->>'title' ILIKE $2
                   OR item->>'description' ILIKE $1 OR item->>'description' ILIKE $2
            )
            ORDER BY updated_at DESC, order_id
            OFFSET $3 LIMIT $4
            "#,
            self.index
        );

        let rows: Vec<(Json<OrderProjection>,)> = sqlx::query_as(&page_query)
            .bind(&leading)
            .bind(&boundary)
            .bind(pagination.offset())
            .bind(pagination.limit())
            .fetch_all(&self.pool)
            .await?;

        let orders = rows.into_iter().map(|(document,)| document.0).collect();
        Ok((orders, total_count))
    }
}

/// Build the two ILIKE patterns for a phrase-prefix match: the phrase at
/// the start of the field, or the phrase after a word boundary. The
/// trailing term is a prefix because neither pattern requires anything
/// after it.
///
/// Whitespace is normalized and LIKE metacharacters are escaped so user
/// input cannot widen the match. Returns None when nothing searchable
/// remains.
fn phrase_prefix_patterns(text: &str) -> Option<(String, String)> {
    let phrase = text.split_whitespace().collect::<Vec<_>>().join(" ");
    if phrase.is_empty() {
        return None;
    }

    let escaped = escape_like(&phrase);
    Some((format!("{escaped}%"), format!("% {escaped}%")))
}

fn escape_like(text: &str) -> String {
    text.replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_phrase_prefix_patterns() {
        assert_eq!(
            phrase_prefix_patterns("t"),
            Some(("t%".to_string(), "% t%".to_string()))
        );
        assert_eq!(
            phrase_prefix_patterns("blue shirt"),
            Some(("blue shirt%".to_string(), "% blue shirt%".to_string()))
        );
    }

    #[test]
    fn test_phrase_prefix_patterns_normalize_whitespace() {
        assert_eq!(
            phrase_prefix_patterns("  red \t shirt  "),
            Some(("red shirt%".to_string(), "% red shirt%".to_string()))
        );
        assert_eq!(phrase_prefix_patterns(""), None);
        assert_eq!(phrase_prefix_patterns("   "), None);
    }

    #[test]
    fn test_phrase_prefix_patterns_escape_metacharacters() {
        assert_eq!(
            phrase_prefix_patterns("100% wool_blend"),
            Some((
                "100\\% wool\\_blend%".to_string(),
                "% 100\\% wool\\_blend%".to_string()
            ))
        );
        assert_eq!(
            phrase_prefix_patterns("back\\slash"),
            Some((
                "back\\\\slash%".to_string(),
                "% back\\\\slash%".to_string()
            ))
        );
    }
}
