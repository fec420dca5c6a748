mod models;
mod password;

use anyhow::{Context, anyhow};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::{Mutex, MutexGuard};
use std::time::{SystemTime, UNIX_EPOCH};
use tracing::info;

pub use models::{
    DEFAULT_FOLDER_COLOR, ExamHistory, Folder, FolderOverview, FolderSummary, NewProblem, Problem,
    ProblemUpdate, User,
};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("user not found")]
    UserNotFound,
    #[error("folder not found")]
    FolderNotFound,
    #[error("problem not found")]
    ProblemNotFound,
    #[error("username already exists")]
    UsernameTaken,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error("folder belongs to another user")]
    Forbidden,
    #[error("{0}")]
    Invalid(String),
    #[error(transparent)]
    Persist(#[from] anyhow::Error),
}

pub type StoreResult<T> = Result<T, StoreError>;

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct StoreData {
    #[serde(default)]
    next_user_id: u64,
    #[serde(default)]
    next_folder_id: u64,
    #[serde(default)]
    next_history_id: u64,
    #[serde(default)]
    users: Vec<User>,
    #[serde(default)]
    folders: Vec<Folder>,
    #[serde(default)]
    problems: Vec<Problem>,
    #[serde(default)]
    histories: Vec<ExamHistory>,
}

impl StoreData {
    fn user(&self, username: &str) -> StoreResult<&User> {
        self.users
            .iter()
            .find(|user| user.username == username)
            .ok_or(StoreError::UserNotFound)
    }

    fn user_mut(&mut self, username: &str) -> StoreResult<&mut User> {
        self.users
            .iter_mut()
            .find(|user| user.username == username)
            .ok_or(StoreError::UserNotFound)
    }

    fn folder(&self, folder_id: u64) -> StoreResult<&Folder> {
        self.folders
            .iter()
            .find(|folder| folder.id == folder_id)
            .ok_or(StoreError::FolderNotFound)
    }

    fn problem_mut(&mut self, problem_id: &str) -> StoreResult<&mut Problem> {
        self.problems
            .iter_mut()
            .find(|problem| problem.id == problem_id)
            .ok_or(StoreError::ProblemNotFound)
    }

    fn folder_ids_of(&self, user_id: u64) -> Vec<u64> {
        self.folders
            .iter()
            .filter(|folder| folder.user_id == user_id)
            .map(|folder| folder.id)
            .collect()
    }
}

/// Users, folders, problems and exam history kept as one JSON document.
///
/// Every mutation runs against a copy and is written to disk before it
/// becomes visible, so a failed write leaves the previous state in place.
pub struct Store {
    path: Option<PathBuf>,
    data: Mutex<StoreData>,
}

impl Store {
    pub fn in_memory() -> Self {
        Self {
            path: None,
            data: Mutex::new(StoreData::default()),
        }
    }

    pub fn open(path: &Path) -> anyhow::Result<Self> {
        let data = if path.exists() {
            let content = fs::read_to_string(path)
                .with_context(|| format!("failed to read store: {}", path.display()))?;
            serde_json::from_str(&content)
                .with_context(|| format!("failed to parse store: {}", path.display()))?
        } else {
            StoreData::default()
        };
        info!("store: opened {}", path.display());
        Ok(Self {
            path: Some(path.to_path_buf()),
            data: Mutex::new(data),
        })
    }

    pub fn register(&self, username: &str, password: &str) -> StoreResult<User> {
        let username = username.trim();
        if username.is_empty() || password.is_empty() {
            return Err(StoreError::Invalid(
                "username and password are required".to_string(),
            ));
        }
        let password_hash = password::hash_password(password)?;
        self.mutate(|data| {
            if data.user(username).is_ok() {
                return Err(StoreError::UsernameTaken);
            }
            data.next_user_id += 1;
            let user = User {
                id: data.next_user_id,
                username: username.to_string(),
                password_hash,
                created_at: now_unix(),
                total_solved: 0,
                total_correct: 0,
            };
            data.users.push(user.clone());
            Ok(user)
        })
    }

    /// Hash verification runs after the store lock is released.
    pub fn login(&self, username: &str, password: &str) -> StoreResult<User> {
        let user = self
            .user(username.trim())
            .map_err(|_| StoreError::InvalidCredentials)?;
        if !password::verify_password(password, &user.password_hash) {
            return Err(StoreError::InvalidCredentials);
        }
        Ok(user)
    }

    pub fn user(&self, username: &str) -> StoreResult<User> {
        self.read().user(username).cloned()
    }

    pub fn folders_overview(&self, username: &str) -> StoreResult<FolderOverview> {
        let data = self.read();
        let user = data.user(username)?;
        let mut wrong_note_count = 0;
        let folders = data
            .folders
            .iter()
            .filter(|folder| folder.user_id == user.id)
            .map(|folder| {
                let problems = data
                    .problems
                    .iter()
                    .filter(|problem| problem.folder_id == folder.id);
                let mut problem_count = 0;
                for problem in problems {
                    problem_count += 1;
                    if problem.is_wrong_note {
                        wrong_note_count += 1;
                    }
                }
                FolderSummary {
                    id: folder.id,
                    name: folder.name.clone(),
                    color: folder.color.clone(),
                    problem_count,
                }
            })
            .collect();
        Ok(FolderOverview {
            folders,
            wrong_note_count,
            accuracy: user.accuracy(),
        })
    }

    pub fn create_folder(
        &self,
        username: &str,
        name: &str,
        color: Option<&str>,
    ) -> StoreResult<Folder> {
        let name = name.trim();
        if name.is_empty() {
            return Err(StoreError::Invalid("folder name is required".to_string()));
        }
        let color = color
            .map(str::trim)
            .filter(|value| !value.is_empty())
            .unwrap_or(DEFAULT_FOLDER_COLOR);
        self.mutate(|data| {
            let user_id = data.user(username)?.id;
            data.next_folder_id += 1;
            let folder = Folder {
                id: data.next_folder_id,
                user_id,
                name: name.to_string(),
                color: color.to_string(),
            };
            data.folders.push(folder.clone());
            Ok(folder)
        })
    }

    pub fn update_folder(
        &self,
        folder_id: u64,
        username: &str,
        name: &str,
        color: &str,
    ) -> StoreResult<Folder> {
        self.mutate(|data| {
            let owner = data.folder(folder_id)?.user_id;
            let user_id = data.user(username).map_err(|_| StoreError::Forbidden)?.id;
            if owner != user_id {
                return Err(StoreError::Forbidden);
            }
            let folder = data
                .folders
                .iter_mut()
                .find(|folder| folder.id == folder_id)
                .ok_or(StoreError::FolderNotFound)?;
            folder.name = name.to_string();
            folder.color = color.to_string();
            Ok(folder.clone())
        })
    }

    pub fn delete_folder(&self, folder_id: u64, username: &str) -> StoreResult<()> {
        self.mutate(|data| {
            let owner = data.folder(folder_id)?.user_id;
            let user_id = data.user(username).map_err(|_| StoreError::Forbidden)?.id;
            if owner != user_id {
                return Err(StoreError::Forbidden);
            }
            data.folders.retain(|folder| folder.id != folder_id);
            data.problems.retain(|problem| problem.folder_id != folder_id);
            Ok(())
        })
    }

    pub fn folder(&self, folder_id: u64) -> StoreResult<Folder> {
        self.read().folder(folder_id).cloned()
    }

    pub fn save_problem(&self, folder_id: u64, new: NewProblem) -> StoreResult<Problem> {
        self.mutate(|data| {
            data.folder(folder_id)?;
            let problem = Problem {
                id: uuid::Uuid::new_v4().to_string(),
                folder_id,
                problem_text: new.problem_text,
                choices: new.choices,
                correct_answer: new.correct_answer,
                memo: new.memo,
                is_wrong_note: false,
                created_at: now_unix(),
            };
            data.problems.push(problem.clone());
            Ok(problem)
        })
    }

    pub fn problems_in_folder(&self, folder_id: u64) -> StoreResult<Vec<Problem>> {
        let data = self.read();
        data.folder(folder_id)?;
        Ok(data
            .problems
            .iter()
            .filter(|problem| problem.folder_id == folder_id)
            .cloned()
            .collect())
    }

    /// Applies the non-empty fields of `update`.
    pub fn update_problem(&self, problem_id: &str, update: ProblemUpdate) -> StoreResult<Problem> {
        self.mutate(|data| {
            let problem = data.problem_mut(problem_id)?;
            if let Some(text) = update.problem_text.filter(|value| !value.is_empty()) {
                problem.problem_text = text;
            }
            if let Some(answer) = update.correct_answer.filter(|value| !value.is_empty()) {
                problem.correct_answer = answer;
            }
            Ok(problem.clone())
        })
    }

    pub fn delete_problem(&self, problem_id: &str) -> StoreResult<()> {
        self.mutate(|data| {
            let before = data.problems.len();
            data.problems.retain(|problem| problem.id != problem_id);
            if data.problems.len() == before {
                return Err(StoreError::ProblemNotFound);
            }
            Ok(())
        })
    }

    pub fn check_answer(&self, problem_id: &str, answer: &str) -> StoreResult<bool> {
        let data = self.read();
        let problem = data
            .problems
            .iter()
            .find(|problem| problem.id == problem_id)
            .ok_or(StoreError::ProblemNotFound)?;
        Ok(problem.correct_answer == answer)
    }

    pub fn wrong_notes(&self, username: &str) -> StoreResult<Vec<Problem>> {
        let data = self.read();
        let user = data.user(username)?;
        let folder_ids = data.folder_ids_of(user.id);
        Ok(data
            .problems
            .iter()
            .filter(|problem| problem.is_wrong_note && folder_ids.contains(&problem.folder_id))
            .cloned()
            .collect())
    }

    /// Flags or unflags every listed problem; unknown ids are skipped.
    pub fn set_wrong_note(&self, problem_ids: &[String], flag: bool) -> StoreResult<usize> {
        self.mutate(|data| {
            let mut updated = 0;
            for problem in data
                .problems
                .iter_mut()
                .filter(|problem| problem_ids.contains(&problem.id))
            {
                problem.is_wrong_note = flag;
                updated += 1;
            }
            Ok(updated)
        })
    }

    pub fn record_stats(&self, username: &str, solved: u64, correct: u64) -> StoreResult<User> {
        if correct > solved {
            return Err(StoreError::Invalid(
                "correct_count cannot exceed solved_count".to_string(),
            ));
        }
        self.mutate(|data| {
            let user = data.user_mut(username)?;
            user.total_solved = user.total_solved.saturating_add(solved);
            user.total_correct = user.total_correct.saturating_add(correct);
            Ok(user.clone())
        })
    }

    pub fn add_history(&self, username: &str, score: i64) -> StoreResult<ExamHistory> {
        self.mutate(|data| {
            let user_id = data.user(username)?.id;
            data.next_history_id += 1;
            let entry = ExamHistory {
                id: data.next_history_id,
                user_id,
                score,
                solved_at: now_unix(),
            };
            data.histories.push(entry.clone());
            Ok(entry)
        })
    }

    /// The latest `limit` results, oldest first.
    pub fn recent_history(&self, username: &str, limit: usize) -> StoreResult<Vec<ExamHistory>> {
        let data = self.read();
        let user_id = data.user(username)?.id;
        let mut entries = data
            .histories
            .iter()
            .filter(|entry| entry.user_id == user_id)
            .cloned()
            .collect::<Vec<_>>();
        entries.sort_by_key(|entry| (entry.solved_at, entry.id));
        let skip = entries.len().saturating_sub(limit);
        Ok(entries.split_off(skip))
    }

    fn read(&self) -> MutexGuard<'_, StoreData> {
        self.data
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn mutate<T>(&self, apply: impl FnOnce(&mut StoreData) -> StoreResult<T>) -> StoreResult<T> {
        let mut guard = self.read();
        let mut next = guard.clone();
        let output = apply(&mut next)?;
        if let Some(path) = self.path.as_deref() {
            write_data(path, &next)?;
        }
        *guard = next;
        Ok(output)
    }
}

fn write_data(path: &Path, data: &StoreData) -> anyhow::Result<()> {
    let dir = path
        .parent()
        .filter(|dir| !dir.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."));
    fs::create_dir_all(dir)
        .with_context(|| format!("failed to create store dir: {}", dir.display()))?;
    let content = serde_json::to_vec_pretty(data)?;
    let mut file = tempfile::Builder::new()
        .prefix(".snapsolve-store-")
        .tempfile_in(dir)
        .with_context(|| "failed to create store temp file")?;
    file.write_all(&content)
        .with_context(|| "failed to write store temp file")?;
    file.persist(path)
        .map_err(|err| anyhow!("failed to replace store {}: {}", path.display(), err))?;
    Ok(())
}

fn now_unix() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_secs()
}
