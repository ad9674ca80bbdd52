//! Category route handlers.

use axum::extract::State;
use tracing::instrument;

use crate::db::CategoryRepository;
use crate::error::Result;
use crate::models::catalog::Category;
use crate::response::Envelope;
use crate::state::AppState;

/// `GET /categorias`, ordered by name.
#[instrument(skip(state))]
pub async fn index(State(state): State<AppState>) -> Result<Envelope<Vec<Category>>> {
    let categories = CategoryRepository::new(state.pool()).list().await?;
    Ok(Envelope::data(categories))
}
