use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::ocr::ParsedProblem;
use crate::store::Problem;

#[derive(Debug, Deserialize)]
pub(crate) struct Credentials {
    pub(crate) username: String,
    pub(crate) password: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UsernameQuery {
    pub(crate) username: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FolderQuery {
    pub(crate) folder_id: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FolderCreateRequest {
    pub(crate) username: String,
    pub(crate) folder_name: String,
    #[serde(default)]
    pub(crate) color: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct FolderUpdateRequest {
    pub(crate) username: String,
    pub(crate) new_name: String,
    pub(crate) new_color: String,
}

#[derive(Debug, Deserialize)]
pub(crate) struct OcrRequest {
    pub(crate) username: String,
    pub(crate) image_data: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct OcrResponse {
    pub(crate) temp_id: String,
    pub(crate) preview: ParsedProblem,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SaveProblemRequest {
    pub(crate) username: String,
    pub(crate) temp_id: String,
    pub(crate) folder_id: u64,
    pub(crate) correct_answer: String,
    #[serde(default)]
    pub(crate) problem_text: Option<String>,
    #[serde(default)]
    pub(crate) choices: Option<Vec<String>>,
    #[serde(default)]
    pub(crate) memo: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct UpdateProblemRequest {
    #[serde(default)]
    pub(crate) problem_text: Option<String>,
    #[serde(default)]
    pub(crate) correct_answer: Option<String>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct SolveRequest {
    pub(crate) user_answer: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct SolveResponse {
    pub(crate) result: &'static str,
    pub(crate) is_correct: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct WrongNoteUpdate {
    pub(crate) problem_ids: Vec<String>,
    pub(crate) is_wrong_note: bool,
}

#[derive(Debug, Deserialize)]
pub(crate) struct StatsUpdate {
    pub(crate) username: String,
    pub(crate) solved_count: u64,
    pub(crate) correct_count: u64,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HistoryCreate {
    pub(crate) username: String,
    pub(crate) score: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct HistoryPoint {
    pub(crate) date: String,
    pub(crate) score: i64,
}

#[derive(Debug, Serialize)]
pub(crate) struct HistoryResponse {
    pub(crate) data: Vec<HistoryPoint>,
}

#[derive(Debug, Serialize)]
pub(crate) struct ProblemView {
    pub(crate) problem: String,
    pub(crate) choices: Vec<String>,
    pub(crate) answer: String,
    pub(crate) is_wrong_note: bool,
    pub(crate) memo: Option<String>,
}

impl From<Problem> for ProblemView {
    fn from(problem: Problem) -> Self {
        Self {
            problem: problem.problem_text,
            choices: problem.choices,
            answer: problem.correct_answer,
            is_wrong_note: problem.is_wrong_note,
            memo: problem.memo,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ProblemsResponse {
    pub(crate) problems: BTreeMap<String, ProblemView>,
}

impl ProblemsResponse {
    pub(crate) fn from_problems(problems: Vec<Problem>) -> Self {
        Self {
            problems: problems
                .into_iter()
                .map(|problem| (problem.id.clone(), ProblemView::from(problem)))
                .collect(),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct MessageResponse {
    pub(crate) message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub(crate) id: Option<serde_json::Value>,
}

impl MessageResponse {
    pub(crate) fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
            id: None,
        }
    }

    pub(crate) fn with_id(message: impl Into<String>, id: impl Into<serde_json::Value>) -> Self {
        Self {
            message: message.into(),
            id: Some(id.into()),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct LoginResponse {
    pub(crate) message: String,
    pub(crate) username: String,
}

#[derive(Debug, Serialize)]
pub(crate) struct ErrorResponse {
    pub(crate) error: String,
}
