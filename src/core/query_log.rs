//! Query log - Append-only audit trail of searches.
//!
//! Entries are only ever inserted and listed. The search pipeline writes them
//! as a best-effort side effect, so a failed insert here never reaches the
//! person who searched.

use crate::{
    core::preference::SearchPreference,
    entities::{UserQuery, user_query},
    errors::Result,
};
use sea_orm::{QueryOrder, Set, prelude::*};

/// Appends one entry for a completed search.
///
/// # Errors
/// Returns an error if the preference snapshot cannot be serialized or the insert fails.
pub async fn append_query(
    db: &DatabaseConnection,
    query_text: &str,
    preferences: &SearchPreference,
    result_count: usize,
) -> Result<user_query::Model> {
    let entry = user_query::ActiveModel {
        query_text: Set(query_text.to_string()),
        preferences: Set(serde_json::to_value(preferences)?),
        result_count: Set(i64::try_from(result_count).unwrap_or(i64::MAX)),
        timestamp: Set(chrono::Utc::now()),
        ..Default::default()
    };
    entry.insert(db).await.map_err(Into::into)
}

/// Lists every logged query, newest first.
///
/// # Errors
/// Returns an error if the database query fails.
pub async fn list_queries(db: &DatabaseConnection) -> Result<Vec<user_query::Model>> {
    UserQuery::find()
        .order_by_desc(user_query::Column::Timestamp)
        .order_by_desc(user_query::Column::Id)
        .all(db)
        .await
        .map_err(Into::into)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::*;

    #[tokio::test]
    async fn test_append_and_list_newest_first() -> Result<()> {
        let db = setup_test_db().await?;
        let preference = SearchPreference {
            roast_level: Some("dark".to_string()),
            ..SearchPreference::default()
        };

        append_query(&db, "first", &SearchPreference::default(), 3).await?;
        let second = append_query(&db, "dark roast", &preference, 0).await?;

        let entries = list_queries(&db).await?;
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0], second);
        assert_eq!(entries[0].result_count, 0);
        assert_eq!(entries[0].preferences["roastLevel"], "dark");
        assert_eq!(entries[1].query_text, "first");
        assert_eq!(entries[1].result_count, 3);
        Ok(())
    }
}
