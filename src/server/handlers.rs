//! Request handlers. Storage is synchronous file I/O, so every handler hops
//! onto the blocking pool.

use std::sync::Arc;

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use serde::{Deserialize, Serialize};
use serde_json::Number;
use uuid::Uuid;

use super::error::{ApiError, ApiJson, ApiPath, ApiQuery, ApiResult};
use crate::activity::{DailyActivity, HeatmapEntry, StreakSummary};
use crate::flashcards::{
    CardQuery, CardWithState, CreateCardRequest, CreateDeckRequest, Deck, DeckStats, Flashcard,
    FlashcardStorageError, InvalidQuality, PageQuery, Paginated, Quality, UpdateCardRequest,
    UpdateDeckRequest,
};
use crate::study::{self, LearningOverview, StudyService};

pub type AppState = Arc<StudyService>;

/// Default window for activity and heatmap queries
const DEFAULT_ACTIVITY_DAYS: u32 = 365;

async fn blocking<T, F>(service: AppState, f: F) -> ApiResult<T>
where
    F: FnOnce(&StudyService) -> study::Result<T> + Send + 'static,
    T: Send + 'static,
{
    tokio::task::spawn_blocking(move || f(&service))
        .await
        .map_err(|e| ApiError::internal(format!("Worker failed: {}", e)))?
        .map_err(ApiError::from)
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReviewRequest {
    /// Any JSON number; only the integers 0 to 5 are accepted
    pub quality: Number,
    #[serde(default)]
    pub expected_version: Option<u64>,
}

impl ReviewRequest {
    fn quality(&self) -> Result<Quality, InvalidQuality> {
        match self.quality.as_i64() {
            Some(value) => Quality::new(value),
            None => Err(InvalidQuality(self.quality.to_string())),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct BulkCreateRequest {
    pub cards: Vec<CreateCardRequest>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<usize>,
}

#[derive(Debug, Default, Deserialize)]
pub struct DaysQuery {
    pub days: Option<u32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct DueCount {
    pub count: usize,
}

pub async fn health() -> Json<serde_json::Value> {
    Json(serde_json::json!({ "status": "ok" }))
}

// ==================== Decks ====================

pub async fn list_public_decks(
    State(service): State<AppState>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Paginated<Deck>>> {
    blocking(service, move |s| s.public_deck_page(page, Utc::now()))
        .await
        .map(Json)
}

pub async fn list_decks(
    State(service): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiQuery(page): ApiQuery<PageQuery>,
) -> ApiResult<Json<Paginated<Deck>>> {
    blocking(service, move |s| s.deck_page(user_id, page, Utc::now()))
        .await
        .map(Json)
}

pub async fn create_deck(
    State(service): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiJson(request): ApiJson<CreateDeckRequest>,
) -> ApiResult<(StatusCode, Json<Deck>)> {
    let deck = blocking(service, move |s| Ok(s.cards().create_deck(user_id, request)?)).await?;
    Ok((StatusCode::CREATED, Json(deck)))
}

pub async fn get_deck(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<Deck>> {
    blocking(service, move |s| s.get_deck(user_id, deck_id, Utc::now())).await.map(Json)
}

pub async fn update_deck(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(request): ApiJson<UpdateDeckRequest>,
) -> ApiResult<Json<Deck>> {
    blocking(service, move |s| {
        s.cards().update_deck(user_id, deck_id, request)?;
        s.get_deck(user_id, deck_id, Utc::now())
    })
    .await
    .map(Json)
}

pub async fn delete_deck(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    blocking(service, move |s| Ok(s.cards().delete_deck(user_id, deck_id)?)).await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn due_card_count(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<DueCount>> {
    let count = blocking(service, move |s| s.due_count(user_id, deck_id, Utc::now())).await?;
    Ok(Json(DueCount { count }))
}

// ==================== Cards ====================

pub async fn list_cards(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id)): ApiPath<(Uuid, Uuid)>,
    ApiQuery(query): ApiQuery<CardQuery>,
) -> ApiResult<Json<Paginated<CardWithState>>> {
    blocking(service, move |s| Ok(s.cards().query_cards(user_id, deck_id, &query)?))
        .await
        .map(Json)
}

pub async fn create_card(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(request): ApiJson<CreateCardRequest>,
) -> ApiResult<(StatusCode, Json<CardWithState>)> {
    let card = blocking(service, move |s| Ok(s.cards().create_card(user_id, deck_id, request)?)).await?;
    Ok((StatusCode::CREATED, Json(card)))
}

pub async fn bulk_create_cards(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id)): ApiPath<(Uuid, Uuid)>,
    ApiJson(request): ApiJson<BulkCreateRequest>,
) -> ApiResult<(StatusCode, Json<Vec<CardWithState>>)> {
    let cards = blocking(service, move |s| {
        Ok(s.cards().create_cards(user_id, deck_id, request.cards)?)
    })
    .await?;
    Ok((StatusCode::CREATED, Json(cards)))
}

pub async fn due_cards(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id)): ApiPath<(Uuid, Uuid)>,
    ApiQuery(query): ApiQuery<LimitQuery>,
) -> ApiResult<Json<Vec<CardWithState>>> {
    blocking(service, move |s| {
        s.due_cards(user_id, Some(deck_id), Utc::now(), query.limit)
    })
    .await
    .map(Json)
}

pub async fn get_card(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id, card_id)): ApiPath<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<CardWithState>> {
    blocking(service, move |s| s.card_in_deck(user_id, deck_id, card_id))
        .await
        .map(Json)
}

pub async fn update_card(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id, card_id)): ApiPath<(Uuid, Uuid, Uuid)>,
    ApiJson(request): ApiJson<UpdateCardRequest>,
) -> ApiResult<Json<Flashcard>> {
    blocking(service, move |s| {
        s.card_in_deck(user_id, deck_id, card_id)?;
        Ok(s.cards().update_card(user_id, card_id, request)?)
    })
    .await
    .map(Json)
}

pub async fn delete_card(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id, card_id)): ApiPath<(Uuid, Uuid, Uuid)>,
) -> ApiResult<StatusCode> {
    blocking(service, move |s| {
        s.card_in_deck(user_id, deck_id, card_id)?;
        Ok(s.cards().delete_card(user_id, card_id)?)
    })
    .await?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn review_card(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id, card_id)): ApiPath<(Uuid, Uuid, Uuid)>,
    ApiJson(request): ApiJson<ReviewRequest>,
) -> ApiResult<Json<CardWithState>> {
    // Quality is checked before the card is looked up
    let quality = request.quality().map_err(FlashcardStorageError::from)?;
    blocking(service, move |s| {
        s.card_in_deck(user_id, deck_id, card_id)?;
        s.apply_review(
            user_id,
            card_id,
            i64::from(quality.value()),
            request.expected_version,
            Utc::now(),
        )
    })
    .await
    .map(Json)
}

pub async fn reset_card(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id, card_id)): ApiPath<(Uuid, Uuid, Uuid)>,
) -> ApiResult<Json<CardWithState>> {
    blocking(service, move |s| {
        s.card_in_deck(user_id, deck_id, card_id)?;
        s.reset_schedule(user_id, card_id, Utc::now())
    })
    .await
    .map(Json)
}

// ==================== Analytics ====================

pub async fn overview(
    State(service): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<LearningOverview>> {
    blocking(service, move |s| s.overview(user_id, Utc::now())).await.map(Json)
}

pub async fn activity(
    State(service): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<DaysQuery>,
) -> ApiResult<Json<Vec<DailyActivity>>> {
    let days = query.days.unwrap_or(DEFAULT_ACTIVITY_DAYS);
    blocking(service, move |s| {
        s.activity_history(user_id, days, Utc::now().date_naive())
    })
    .await
    .map(Json)
}

pub async fn refresh_activity(
    State(service): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<LearningOverview>> {
    blocking(service, move |s| s.refresh_activity(user_id, Utc::now()))
        .await
        .map(Json)
}

pub async fn heatmap(
    State(service): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
    ApiQuery(query): ApiQuery<DaysQuery>,
) -> ApiResult<Json<Vec<HeatmapEntry>>> {
    let days = query.days.unwrap_or(DEFAULT_ACTIVITY_DAYS);
    blocking(service, move |s| s.heatmap(user_id, days, Utc::now().date_naive()))
        .await
        .map(Json)
}

pub async fn streak(
    State(service): State<AppState>,
    ApiPath(user_id): ApiPath<Uuid>,
) -> ApiResult<Json<StreakSummary>> {
    blocking(service, move |s| s.streak(user_id, Utc::now().date_naive()))
        .await
        .map(Json)
}

pub async fn deck_stats(
    State(service): State<AppState>,
    ApiPath((user_id, deck_id)): ApiPath<(Uuid, Uuid)>,
) -> ApiResult<Json<DeckStats>> {
    blocking(service, move |s| s.deck_stats(user_id, deck_id, Utc::now()))
        .await
        .map(Json)
}
