use axum::{
    extract::{Extension, Path, State},
    routing::{get, post},
    Json, Router,
};
use std::sync::Arc;
use tracing::info;
use uuid::Uuid;

use crate::reminders::sweep::{ContractPreview, SweepSummary};
use crate::web::models::AuthenticatedAdmin;
use crate::web::{AppError, AppState};

async fn check_reminders_handler(
    Extension(admin): Extension<AuthenticatedAdmin>,
    State(app_state): State<Arc<AppState>>,
) -> Result<Json<SweepSummary>, AppError> {
    info!(admin = %admin.username, "Manual reminder sweep requested.");
    let summary = app_state.sweep.run().await?;
    Ok(Json(summary))
}

async fn pending_reminders_handler(
    State(app_state): State<Arc<AppState>>,
    Path(contract_id): Path<Uuid>,
) -> Result<Json<ContractPreview>, AppError> {
    app_state
        .sweep
        .preview(contract_id)
        .await?
        .map(Json)
        .ok_or_else(|| AppError::NotFound(format!("Rental contract {contract_id} not found")))
}

pub fn create_rental_router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/check-reminders", post(check_reminders_handler))
        .route("/{id}/pending-reminders", get(pending_reminders_handler))
}
