use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use serde::{Deserialize, Serialize};

use crate::{
    app_state::AppState,
    db::{models::{CreateCardRequest, StoredCard, UpdateStatusRequest}, queries},
    handlers::{database_error, error_response, ApiFailure},
    shortener::review_url,
};

#[derive(Debug, Serialize, Deserialize)]
pub struct StatusResponse {
    pub status: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyResponse {
    pub status: String,
    pub uid: String,
    pub valid: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub reason: Option<String>,
}

async fn load_card(state: &AppState, id: &str) -> Result<StoredCard, ApiFailure> {
    let row = queries::get_card_by_id(&state.pool, id)
        .await
        .map_err(database_error)?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Card not found"))?;

    row.into_stored().map_err(|e| {
        tracing::error!(card_id = id, error = %e, "Stored card is corrupt");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Invalid stored card")
    })
}

/// POST /api/cards
/// Provisions a new sealed card and stores it
pub async fn create_card(
    State(state): State<AppState>,
    Json(req): Json<CreateCardRequest>,
) -> Result<(StatusCode, Json<StoredCard>), ApiFailure> {
    if req.merchant_id.trim().is_empty() {
        return Err(error_response(StatusCode::BAD_REQUEST, "merchantId is required"));
    }

    let request = req.provision_request(state.config.gmb_review_link.as_deref());
    let mut config = state.provisioner.provision(&request).map_err(|e| {
        tracing::error!(error = %e, "Provisioning failed");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Provisioning failed")
    })?;

    if let Some(gmb_url) = config.gmb_url.as_deref() {
        let long_url = review_url(
            gmb_url,
            config.location_id.as_deref(),
            config.campaign_id.as_deref(),
        );
        config.shortened_url = Some(state.shortener.shorten(&long_url).await);
    }

    let id = queries::insert_card(&state.pool, &config, req.card_id.as_deref())
        .await
        .map_err(database_error)?;

    Ok((StatusCode::CREATED, Json(load_card(&state, &id).await?)))
}

/// GET /api/cards
pub async fn list_cards(State(state): State<AppState>) -> Result<Json<Vec<StoredCard>>, ApiFailure> {
    let rows = queries::list_cards(&state.pool)
        .await
        .map_err(database_error)?;

    let mut cards = Vec::with_capacity(rows.len());
    for row in rows {
        match row.into_stored() {
            Ok(card) => cards.push(card),
            Err(e) => tracing::warn!(error = %e, "Skipping corrupt stored card"),
        }
    }

    Ok(Json(cards))
}

/// GET /api/cards/{id}
pub async fn get_card(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StoredCard>, ApiFailure> {
    Ok(Json(load_card(&state, &id).await?))
}

/// GET /api/cards/{id}/verify
/// Re-validates the stored card against tampering and expiry
pub async fn verify_card(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<VerifyResponse>, ApiFailure> {
    let card = load_card(&state, &id).await?;

    let verification = state.provisioner.verify(&card.config);

    Ok(Json(VerifyResponse {
        status: "OK".to_string(),
        uid: card.config.uid.to_string(),
        valid: verification.is_valid(),
        reason: verification.rejection().map(|r| r.reason().to_string()),
    }))
}

/// PATCH /api/cards/{id}/status
pub async fn update_status(
    Path(id): Path<String>,
    State(state): State<AppState>,
    Json(req): Json<UpdateStatusRequest>,
) -> Result<Json<StoredCard>, ApiFailure> {
    let updated = queries::update_card_status(&state.pool, &id, req.status)
        .await
        .map_err(database_error)?;

    if !updated {
        return Err(error_response(StatusCode::NOT_FOUND, "Card not found"));
    }

    Ok(Json(load_card(&state, &id).await?))
}

/// DELETE /api/cards/{id}
pub async fn delete_card(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Json<StatusResponse>, ApiFailure> {
    let deleted = queries::delete_card(&state.pool, &id)
        .await
        .map_err(database_error)?;

    if !deleted {
        return Err(error_response(StatusCode::NOT_FOUND, "Card not found"));
    }

    Ok(Json(StatusResponse {
        status: "OK".to_string(),
    }))
}
