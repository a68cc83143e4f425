//! # Settings Repository
//!
//! Persisted key-value store configuration plus typed accessors for the
//! two keys the engine reads on every sale: the loyalty earn rate and
//! the fallback tax rate for uncategorized products.
//!
//! Unset or malformed values fall back to compiled defaults rather than
//! failing the sale; a bad setting row must not take the register down.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, warn};

use crate::error::DbResult;
use emerald_core::loyalty::{parse_points_rate, DEFAULT_POINTS_RATE_BPS};
use emerald_core::types::{Setting, TaxRate};

/// Key for the loyalty earn rate, stored as a decimal fraction
/// (e.g. `"0.05"` = 5 points per dollar x 100).
pub const KEY_LOYALTY_POINTS_RATE: &str = "loyalty_points_rate";

/// Key for the store-wide fallback tax rate, stored as a percentage
/// (e.g. `"15.5"`).
pub const KEY_DEFAULT_TAX_RATE: &str = "default_tax_rate";

/// Repository for persisted settings.
#[derive(Debug, Clone)]
pub struct SettingsRepository {
    pool: SqlitePool,
}

impl SettingsRepository {
    pub fn new(pool: SqlitePool) -> Self {
        SettingsRepository { pool }
    }

    /// Gets a setting by key.
    pub async fn get(&self, key: &str) -> DbResult<Option<Setting>> {
        let setting = sqlx::query_as::<_, Setting>(
            r#"
            SELECT key, value, category, description, updated_by, updated_at
            FROM settings
            WHERE key = ?1
            "#,
        )
        .bind(key)
        .fetch_optional(&self.pool)
        .await?;

        Ok(setting)
    }

    /// Gets just the value string for a key.
    pub async fn get_value(&self, key: &str) -> DbResult<Option<String>> {
        Ok(self.get(key).await?.map(|s| s.value))
    }

    /// Upserts a setting.
    pub async fn set(
        &self,
        key: &str,
        value: &str,
        category: Option<&str>,
        updated_by: Option<&str>,
    ) -> DbResult<()> {
        debug!(key = %key, value = %value, "Upserting setting");

        sqlx::query(
            r#"
            INSERT INTO settings (key, value, category, description, updated_by, updated_at)
            VALUES (?1, ?2, ?3, NULL, ?4, ?5)
            ON CONFLICT(key) DO UPDATE SET
                value = excluded.value,
                category = COALESCE(excluded.category, settings.category),
                updated_by = excluded.updated_by,
                updated_at = excluded.updated_at
            "#,
        )
        .bind(key)
        .bind(value)
        .bind(category)
        .bind(updated_by)
        .bind(Utc::now())
        .execute(&self.pool)
        .await?;

        Ok(())
    }

    /// Loyalty earn rate in basis points. Unset or unparseable values
    /// fall back to [`DEFAULT_POINTS_RATE_BPS`].
    pub async fn loyalty_points_rate_bps(&self) -> DbResult<u32> {
        match self.get_value(KEY_LOYALTY_POINTS_RATE).await? {
            Some(raw) => match parse_points_rate(&raw) {
                Some(bps) => Ok(bps),
                None => {
                    warn!(value = %raw, "Invalid loyalty_points_rate setting, using default");
                    Ok(DEFAULT_POINTS_RATE_BPS)
                }
            },
            None => Ok(DEFAULT_POINTS_RATE_BPS),
        }
    }

    /// Fallback tax rate for uncategorized products. Unset means no
    /// tax.
    pub async fn default_tax_rate(&self) -> DbResult<TaxRate> {
        match self.get_value(KEY_DEFAULT_TAX_RATE).await? {
            Some(raw) => match raw.parse::<f64>() {
                Ok(pct) if (0.0..=100.0).contains(&pct) => Ok(TaxRate::from_percentage(pct)),
                _ => {
                    warn!(value = %raw, "Invalid default_tax_rate setting, using zero");
                    Ok(TaxRate::zero())
                }
            },
            None => Ok(TaxRate::zero()),
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    async fn test_db() -> Database {
        Database::new(DbConfig::in_memory()).await.unwrap()
    }

    #[tokio::test]
    async fn test_set_and_get_round_trip() {
        let db = test_db().await;
        let repo = db.settings();

        repo.set("store_name", "Emerald Dispensary", Some("general"), Some("op-1"))
            .await
            .unwrap();
        assert_eq!(
            repo.get_value("store_name").await.unwrap().as_deref(),
            Some("Emerald Dispensary")
        );

        // Upsert replaces the value
        repo.set("store_name", "Emerald North", None, Some("op-2"))
            .await
            .unwrap();
        let setting = repo.get("store_name").await.unwrap().unwrap();
        assert_eq!(setting.value, "Emerald North");
        // Category survives a NULL-category upsert
        assert_eq!(setting.category.as_deref(), Some("general"));
        assert_eq!(setting.updated_by.as_deref(), Some("op-2"));
    }

    #[tokio::test]
    async fn test_loyalty_rate_defaults_when_unset() {
        let db = test_db().await;
        assert_eq!(
            db.settings().loyalty_points_rate_bps().await.unwrap(),
            DEFAULT_POINTS_RATE_BPS
        );
    }

    #[tokio::test]
    async fn test_loyalty_rate_parses_decimal_fraction() {
        let db = test_db().await;
        let repo = db.settings();

        repo.set(KEY_LOYALTY_POINTS_RATE, "0.10", Some("loyalty"), None)
            .await
            .unwrap();
        assert_eq!(repo.loyalty_points_rate_bps().await.unwrap(), 1000);
    }

    #[tokio::test]
    async fn test_malformed_loyalty_rate_falls_back() {
        let db = test_db().await;
        let repo = db.settings();

        repo.set(KEY_LOYALTY_POINTS_RATE, "lots", None, None)
            .await
            .unwrap();
        assert_eq!(
            repo.loyalty_points_rate_bps().await.unwrap(),
            DEFAULT_POINTS_RATE_BPS
        );
    }

    #[tokio::test]
    async fn test_default_tax_rate() {
        let db = test_db().await;
        let repo = db.settings();

        assert_eq!(repo.default_tax_rate().await.unwrap(), TaxRate::zero());

        repo.set(KEY_DEFAULT_TAX_RATE, "15.5", Some("tax"), None)
            .await
            .unwrap();
        assert_eq!(repo.default_tax_rate().await.unwrap().bps(), 1550);
    }
}
