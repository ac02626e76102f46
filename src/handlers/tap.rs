use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::Redirect,
};

use crate::{
    app_state::AppState,
    card::Verification,
    db::queries,
    handlers::{database_error, error_response, ApiFailure},
};

/// GET /c/{uid}
/// Customer tap: verifies the card offline and redirects to its review page
pub async fn tap_card(
    Path(uid): Path<String>,
    State(state): State<AppState>,
) -> Result<Redirect, ApiFailure> {
    let card = queries::get_card_by_uid(&state.pool, &uid)
        .await
        .map_err(database_error)?
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Card not found"))?;

    if !card.is_active() {
        return Err(error_response(StatusCode::FORBIDDEN, "Card disabled"));
    }

    let config = card.config().map_err(|e| {
        tracing::error!(uid = %uid, error = %e, "Stored card is corrupt");
        error_response(StatusCode::INTERNAL_SERVER_ERROR, "Invalid stored card")
    })?;

    if let Verification::Rejected(rejection) = state.provisioner.verify(&config) {
        return Err(error_response(StatusCode::FORBIDDEN, rejection.reason()));
    }

    let destination = config
        .destination()
        .ok_or_else(|| error_response(StatusCode::NOT_FOUND, "Card has no destination"))?
        .to_string();

    queries::record_interaction(&state.pool, &card.id)
        .await
        .map_err(database_error)?;

    tracing::debug!(uid = %uid, "Card tap redirected");

    Ok(Redirect::temporary(&destination))
}
