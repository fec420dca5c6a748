use serde::{Deserialize, Serialize};

pub const DEFAULT_FOLDER_COLOR: &str = "0xFF1E2B58";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: u64,
    pub username: String,
    pub password_hash: String,
    pub created_at: u64,
    #[serde(default)]
    pub total_solved: u64,
    #[serde(default)]
    pub total_correct: u64,
}

impl User {
    /// Whole-number percentage of correct answers, 0 before any solve.
    pub fn accuracy(&self) -> u32 {
        if self.total_solved == 0 {
            return 0;
        }
        u32::try_from(self.total_correct.saturating_mul(100) / self.total_solved).unwrap_or(u32::MAX)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Folder {
    pub id: u64,
    pub user_id: u64,
    pub name: String,
    pub color: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Problem {
    pub id: String,
    pub folder_id: u64,
    pub problem_text: String,
    #[serde(default)]
    pub choices: Vec<String>,
    pub correct_answer: String,
    #[serde(default)]
    pub memo: Option<String>,
    #[serde(default)]
    pub is_wrong_note: bool,
    pub created_at: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExamHistory {
    pub id: u64,
    pub user_id: u64,
    pub score: i64,
    pub solved_at: u64,
}

#[derive(Debug, Clone)]
pub struct NewProblem {
    pub problem_text: String,
    pub choices: Vec<String>,
    pub correct_answer: String,
    pub memo: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProblemUpdate {
    pub problem_text: Option<String>,
    pub correct_answer: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderSummary {
    pub id: u64,
    pub name: String,
    pub color: String,
    pub problem_count: usize,
}

#[derive(Debug, Clone, Serialize)]
pub struct FolderOverview {
    pub folders: Vec<FolderSummary>,
    pub wrong_note_count: usize,
    pub accuracy: u32,
}
