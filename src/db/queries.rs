use anyhow::Result;
use chrono::{SecondsFormat, Utc};
use sqlx::{Pool, Sqlite};

use crate::{
    card::NfcCardConfig,
    db::models::{CardRow, CardStatus},
};

fn now_rfc3339() -> String {
    Utc::now().to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Persist a freshly provisioned card. Returns the new record id.
pub async fn insert_card(
    pool: &Pool<Sqlite>,
    config: &NfcCardConfig,
    card_label: Option<&str>,
) -> Result<String> {
    let id = uuid::Uuid::new_v4().to_string();

    sqlx::query(
        "INSERT INTO cards (id, uid, merchant_id, location_id, campaign_id, gmb_url,
         shortened_url, card_label, merchant_name, location_name, campaign_name,
         created_at, last_modified, encrypted_data, checksum, security_version,
         status, interactions, last_used, updated_at)
         VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, ?, 'active', 0, NULL, ?)"
    )
    .bind(&id)
    .bind(config.uid.to_string())
    .bind(&config.merchant_id)
    .bind(&config.location_id)
    .bind(&config.campaign_id)
    .bind(&config.gmb_url)
    .bind(&config.shortened_url)
    .bind(card_label)
    .bind(&config.metadata.merchant_name)
    .bind(&config.metadata.location_name)
    .bind(&config.metadata.campaign_name)
    .bind(&config.metadata.created_at)
    .bind(&config.metadata.last_modified)
    .bind(&config.security.encrypted_data)
    .bind(&config.security.checksum)
    .bind(&config.security.version)
    .bind(now_rfc3339())
    .execute(pool)
    .await?;

    Ok(id)
}

pub async fn get_card_by_id(pool: &Pool<Sqlite>, id: &str) -> Result<Option<CardRow>> {
    let card = sqlx::query_as::<_, CardRow>("SELECT * FROM cards WHERE id = ?")
        .bind(id)
        .fetch_optional(pool)
        .await?;

    Ok(card)
}

pub async fn get_card_by_uid(pool: &Pool<Sqlite>, uid: &str) -> Result<Option<CardRow>> {
    let card = sqlx::query_as::<_, CardRow>("SELECT * FROM cards WHERE uid = ?")
        .bind(uid)
        .fetch_optional(pool)
        .await?;

    Ok(card)
}

pub async fn list_cards(pool: &Pool<Sqlite>) -> Result<Vec<CardRow>> {
    let cards = sqlx::query_as::<_, CardRow>(
        "SELECT * FROM cards ORDER BY created_at DESC, rowid DESC"
    )
    .fetch_all(pool)
    .await?;

    Ok(cards)
}

pub async fn update_card_status(pool: &Pool<Sqlite>, id: &str, status: CardStatus) -> Result<bool> {
    let result = sqlx::query("UPDATE cards SET status = ?, updated_at = ? WHERE id = ?")
        .bind(status.as_str())
        .bind(now_rfc3339())
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}

/// Count a tap and stamp the last-used time.
pub async fn record_interaction(pool: &Pool<Sqlite>, id: &str) -> Result<bool> {
    let now = now_rfc3339();
    let result = sqlx::query(
        "UPDATE cards SET interactions = interactions + 1, last_used = ?, updated_at = ?
         WHERE id = ?"
    )
    .bind(&now)
    .bind(&now)
    .bind(id)
    .execute(pool)
    .await?;

    Ok(result.rows_affected() > 0)
}

pub async fn delete_card(pool: &Pool<Sqlite>, id: &str) -> Result<bool> {
    let result = sqlx::query("DELETE FROM cards WHERE id = ?")
        .bind(id)
        .execute(pool)
        .await?;

    Ok(result.rows_affected() > 0)
}
