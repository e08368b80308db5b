use axum::{extract::State, http::StatusCode, Json};
use serde::Serialize;
use tracing::info;

use crate::contact::validation::validate_contact;
use crate::errors::AppError;
use crate::mail_client::ContactMessage;
use crate::state::AppState;

#[derive(Serialize)]
pub struct ContactAccepted {
    pub status: &'static str,
}

/// POST /api/v1/contact
pub async fn handle_contact_submit(
    State(state): State<AppState>,
    Json(req): Json<ContactMessage>,
) -> Result<(StatusCode, Json<ContactAccepted>), AppError> {
    let message = validate_contact(req).map_err(AppError::Validation)?;
    let mail = state.mail.as_ref().ok_or(AppError::MailUnavailable)?;

    mail.submit(&message)
        .await
        .map_err(|e| AppError::Mail(e.to_string()))?;
    info!("Contact message from {} delivered", message.email);

    Ok((StatusCode::ACCEPTED, Json(ContactAccepted { status: "sent" })))
}
