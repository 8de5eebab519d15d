use serde::{Deserialize, Serialize};

/// Conversation id paired with the counterpart user, used for redirection only.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
pub struct ConversationRef {
    pub conversation_id: String,
    pub counterpart_id: String,
}

impl ConversationRef {
    pub fn route(&self) -> String {
        format!("/conversation/{}/{}", self.conversation_id, self.counterpart_id)
    }
}
