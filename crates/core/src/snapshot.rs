//! Persisted view of a call

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::{CallContext, ConversationState, EndReason, StructuredData, Transcript};

/// Everything the storage collaborator needs after an utterance
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CallSnapshot {
    pub call: CallContext,
    pub transcript: Transcript,
    pub structured_data: StructuredData,
    pub state: ConversationState,
    #[serde(default)]
    pub ended: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub end_reason: Option<EndReason>,
    pub updated_at: DateTime<Utc>,
}

impl CallSnapshot {
    pub fn call_id(&self) -> &str {
        self.call.call_id()
    }
}
