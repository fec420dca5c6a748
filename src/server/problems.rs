use axum::Json;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use std::sync::Arc;
use tracing::info;

use crate::ocr::{self, OcrImage};
use crate::store::{NewProblem, ProblemUpdate, StoreError};

use super::error::ServerError;
use super::models::{
    FolderQuery, MessageResponse, OcrRequest, OcrResponse, ProblemsResponse, SaveProblemRequest,
    SolveRequest, SolveResponse, UpdateProblemRequest, UsernameQuery, WrongNoteUpdate,
};
use super::state::ServerState;

const PREVIEW_MISSING: &str = "OCR preview expired or not found";

pub(crate) async fn ocr_preview(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<OcrRequest>,
) -> Result<Json<OcrResponse>, ServerError> {
    let image = OcrImage::from_data_url(&payload.image_data)?;
    let raw = state.ocr.recognize(image).await?;
    let preview = ocr::parse_response(&raw)?;
    let temp_id = state.previews.insert(&payload.username, preview.clone());
    info!(
        "ocr: preview {} for {} ({} choices)",
        temp_id,
        payload.username,
        preview.choices.len()
    );
    Ok(Json(OcrResponse { temp_id, preview }))
}

/// Persists a confirmed preview. Edited text and choices replace the OCR
/// values when present and non-empty. The preview is redeemed only after the
/// folder checks pass and is put back if the write fails.
pub(crate) async fn save_problem(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<SaveProblemRequest>,
) -> Result<(StatusCode, Json<MessageResponse>), ServerError> {
    state
        .previews
        .peek(&payload.temp_id)
        .filter(|preview| preview.owner == payload.username)
        .ok_or_else(|| ServerError::not_found(PREVIEW_MISSING))?;

    let user = state.store.user(&payload.username)?;
    let folder = state.store.folder(payload.folder_id)?;
    if folder.user_id != user.id {
        return Err(StoreError::Forbidden.into());
    }

    let preview = state
        .previews
        .take(&payload.temp_id)
        .ok_or_else(|| ServerError::not_found(PREVIEW_MISSING))?;
    let problem_text = payload
        .problem_text
        .filter(|text| !text.is_empty())
        .unwrap_or_else(|| preview.problem.stem.clone());
    let choices = payload
        .choices
        .filter(|choices| !choices.is_empty())
        .unwrap_or_else(|| preview.problem.choices.clone());

    let new_problem = NewProblem {
        problem_text,
        choices,
        correct_answer: payload.correct_answer,
        memo: payload.memo,
    };
    let saved = match state.store.save_problem(folder.id, new_problem) {
        Ok(saved) => saved,
        Err(err) => {
            state.previews.restore(&payload.temp_id, preview);
            return Err(err.into());
        }
    };
    info!("problem {} saved to folder {}", saved.id, folder.id);
    Ok((
        StatusCode::CREATED,
        Json(MessageResponse::with_id("problem saved", saved.id)),
    ))
}

pub(crate) async fn list_problems(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<FolderQuery>,
) -> Result<Json<ProblemsResponse>, ServerError> {
    let problems = state.store.problems_in_folder(query.folder_id)?;
    Ok(Json(ProblemsResponse::from_problems(problems)))
}

pub(crate) async fn update_problem(
    State(state): State<Arc<ServerState>>,
    Path(problem_id): Path<String>,
    Json(payload): Json<UpdateProblemRequest>,
) -> Result<Json<MessageResponse>, ServerError> {
    state.store.update_problem(
        &problem_id,
        ProblemUpdate {
            problem_text: payload.problem_text,
            correct_answer: payload.correct_answer,
        },
    )?;
    Ok(Json(MessageResponse::new("problem updated")))
}

pub(crate) async fn delete_problem(
    State(state): State<Arc<ServerState>>,
    Path(problem_id): Path<String>,
) -> Result<StatusCode, ServerError> {
    state.store.delete_problem(&problem_id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub(crate) async fn check_answer(
    State(state): State<Arc<ServerState>>,
    Path(problem_id): Path<String>,
    Json(payload): Json<SolveRequest>,
) -> Result<Json<SolveResponse>, ServerError> {
    let is_correct = state.store.check_answer(&problem_id, &payload.user_answer)?;
    Ok(Json(SolveResponse {
        result: if is_correct { "correct" } else { "incorrect" },
        is_correct,
    }))
}

pub(crate) async fn wrong_notes(
    State(state): State<Arc<ServerState>>,
    Query(query): Query<UsernameQuery>,
) -> Result<Json<ProblemsResponse>, ServerError> {
    let problems = state.store.wrong_notes(&query.username)?;
    Ok(Json(ProblemsResponse::from_problems(problems)))
}

pub(crate) async fn bulk_update_wrong_note(
    State(state): State<Arc<ServerState>>,
    Json(payload): Json<WrongNoteUpdate>,
) -> Result<Json<MessageResponse>, ServerError> {
    let updated = state
        .store
        .set_wrong_note(&payload.problem_ids, payload.is_wrong_note)?;
    Ok(Json(MessageResponse::new(format!(
        "{} problems updated",
        updated
    ))))
}
