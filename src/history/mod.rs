//! Conversation history: one append-only JSONL file per conversation id.
//!
//! An exchange is two adjacent records (user, then assistant). Appends for a
//! given conversation id are serialized through a per-id mutex so concurrent
//! submissions cannot interleave the pair.

use std::collections::HashMap;
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;

use crate::core::errors::PipelineError;

pub const ROLE_USER: &str = "user";
pub const ROLE_ASSISTANT: &str = "assistant";

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationTurn {
    pub role: String,
    pub content: String,
    pub created_at: String,
}

#[derive(Clone)]
pub struct HistoryStore {
    dir: PathBuf,
    locks: Arc<Mutex<HashMap<String, Arc<Mutex<()>>>>>,
}

impl HistoryStore {
    pub fn new(dir: PathBuf) -> Result<Self, PipelineError> {
        fs::create_dir_all(&dir).map_err(PipelineError::history)?;
        Ok(Self {
            dir,
            locks: Arc::new(Mutex::new(HashMap::new())),
        })
    }

    /// Conversation ids double as file names; anything outside this set is
    /// rejected before it reaches the filesystem.
    pub fn is_valid_id(conversation_id: &str) -> bool {
        !conversation_id.is_empty()
            && conversation_id.len() <= 128
            && conversation_id
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }

    fn file_path(&self, conversation_id: &str) -> Result<PathBuf, PipelineError> {
        if !Self::is_valid_id(conversation_id) {
            return Err(PipelineError::History(format!(
                "invalid conversation id: {:?}",
                conversation_id
            )));
        }
        Ok(self.dir.join(format!("{}.jsonl", conversation_id)))
    }

    /// Whether any exchange has been logged under this id.
    pub async fn has_conversation(&self, conversation_id: &str) -> Result<bool, PipelineError> {
        Ok(self.file_path(conversation_id)?.exists())
    }

    async fn lock_for(&self, conversation_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.locks.lock().await;
        locks
            .entry(conversation_id.to_string())
            .or_insert_with(|| Arc::new(Mutex::new(())))
            .clone()
    }

    /// Returns the turns for a conversation in append order. `limit > 0`
    /// keeps only the most recent `limit` turns; `0` returns everything.
    pub async fn load(
        &self,
        conversation_id: &str,
        limit: usize,
    ) -> Result<Vec<ConversationTurn>, PipelineError> {
        let path = self.file_path(conversation_id)?;
        if !path.exists() {
            return Ok(Vec::new());
        }

        let text = fs::read_to_string(&path).map_err(PipelineError::history)?;
        let mut turns = Vec::new();
        for line in text.lines() {
            if line.trim().is_empty() {
                continue;
            }
            let turn: ConversationTurn =
                serde_json::from_str(line).map_err(PipelineError::history)?;
            turns.push(turn);
        }

        if limit > 0 && turns.len() > limit {
            turns.drain(..turns.len() - limit);
        }
        Ok(turns)
    }

    /// Appends the user question and the produced answer as two adjacent
    /// records, in that order, under the per-conversation lock.
    pub async fn append_exchange(
        &self,
        conversation_id: &str,
        question: &str,
        answer: &str,
    ) -> Result<(), PipelineError> {
        let path = self.file_path(conversation_id)?;
        let lock = self.lock_for(conversation_id).await;
        let _guard = lock.lock().await;

        let user_turn = ConversationTurn {
            role: ROLE_USER.to_string(),
            content: question.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };
        let assistant_turn = ConversationTurn {
            role: ROLE_ASSISTANT.to_string(),
            content: answer.to_string(),
            created_at: chrono::Utc::now().to_rfc3339(),
        };

        let mut buf = String::new();
        for turn in [&user_turn, &assistant_turn] {
            buf.push_str(&serde_json::to_string(turn).map_err(PipelineError::history)?);
            buf.push('\n');
        }

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .map_err(PipelineError::history)?;
        file.write_all(buf.as_bytes())
            .map_err(PipelineError::history)?;

        Ok(())
    }

    /// Conversation ids with a history file, in name order.
    pub async fn list_conversations(&self) -> Result<Vec<String>, PipelineError> {
        let entries = fs::read_dir(&self.dir).map_err(PipelineError::history)?;
        let mut ids: Vec<String> = entries
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|path| path.extension().map(|ext| ext == "jsonl").unwrap_or(false))
            .filter_map(|path| path.file_stem().map(|s| s.to_string_lossy().to_string()))
            .collect();
        ids.sort();
        Ok(ids)
    }

    /// Total number of logged turns across all conversations.
    pub async fn total_message_count(&self) -> Result<usize, PipelineError> {
        let mut total = 0;
        for id in self.list_conversations().await? {
            total += self.load(&id, 0).await?.len();
        }
        Ok(total)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn store() -> (tempfile::TempDir, HistoryStore) {
        let dir = tempfile::tempdir().unwrap();
        let store = HistoryStore::new(dir.path().join("history")).unwrap();
        (dir, store)
    }

    #[tokio::test]
    async fn exchanges_append_in_order() {
        let (_dir, store) = store();

        store.append_exchange("conv-1", "q1", "a1").await.unwrap();
        store.append_exchange("conv-1", "q2", "a2").await.unwrap();

        let turns = store.load("conv-1", 0).await.unwrap();
        assert_eq!(turns.len(), 4);
        assert_eq!(
            turns.iter().map(|t| t.role.as_str()).collect::<Vec<_>>(),
            vec![ROLE_USER, ROLE_ASSISTANT, ROLE_USER, ROLE_ASSISTANT]
        );
        assert_eq!(turns[2].content, "q2");
        assert_eq!(turns[3].content, "a2");
    }

    #[tokio::test]
    async fn conversations_are_isolated_by_id() {
        let (_dir, store) = store();

        store.append_exchange("conv-a", "qa", "aa").await.unwrap();
        store.append_exchange("conv-b", "qb", "ab").await.unwrap();

        assert_eq!(store.load("conv-a", 0).await.unwrap().len(), 2);
        assert_eq!(store.load("conv-b", 0).await.unwrap().len(), 2);
        assert_eq!(
            store.list_conversations().await.unwrap(),
            vec!["conv-a".to_string(), "conv-b".to_string()]
        );
    }

    #[tokio::test]
    async fn load_limit_keeps_most_recent_turns() {
        let (_dir, store) = store();

        store.append_exchange("conv-1", "q1", "a1").await.unwrap();
        store.append_exchange("conv-1", "q2", "a2").await.unwrap();

        let turns = store.load("conv-1", 2).await.unwrap();
        assert_eq!(turns.len(), 2);
        assert_eq!(turns[0].content, "q2");
        assert_eq!(turns[1].content, "a2");
    }

    #[tokio::test]
    async fn rejects_path_like_conversation_ids() {
        let (_dir, store) = store();

        let err = store.load("../etc/passwd", 0).await.unwrap_err();
        assert!(matches!(err, PipelineError::History(_)));

        let err = store.append_exchange("", "q", "a").await.unwrap_err();
        assert!(matches!(err, PipelineError::History(_)));

        assert!(!HistoryStore::is_valid_id("../etc/passwd"));
        assert!(!HistoryStore::is_valid_id("bad.id"));
        assert!(HistoryStore::is_valid_id("conv-1"));
    }

    #[tokio::test]
    async fn has_conversation_tracks_logged_ids() {
        let (_dir, store) = store();

        assert!(!store.has_conversation("conv-1").await.unwrap());
        store.append_exchange("conv-1", "q", "a").await.unwrap();
        assert!(store.has_conversation("conv-1").await.unwrap());
    }
}
