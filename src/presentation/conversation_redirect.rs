use crate::helpers::route_params::RouteParams;
use crate::models::conversation::ConversationRef;
use crate::models::reservation::validate_identifier;

pub const MESSAGES_ROUTE: &str = "/messages";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RedirectState {
    Resolving,
    Terminal,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RedirectTarget {
    Conversation(ConversationRef),
    Messages,
}

impl RedirectTarget {
    pub fn path(&self) -> String {
        match self {
            RedirectTarget::Conversation(conversation) => conversation.route(),
            RedirectTarget::Messages => MESSAGES_ROUTE.to_string(),
        }
    }
}

/// Sends a freshly mounted conversation screen to its canonical route, or to
/// the message list when either identifier is missing. Redirects at most once.
#[derive(Debug)]
pub struct ConversationRedirect {
    state: RedirectState,
}

impl Default for ConversationRedirect {
    fn default() -> Self {
        Self::new()
    }
}

impl ConversationRedirect {
    pub fn new() -> Self {
        Self {
            state: RedirectState::Resolving,
        }
    }

    pub fn state(&self) -> RedirectState {
        self.state
    }

    pub fn on_mount(&mut self, params: &RouteParams) -> Option<RedirectTarget> {
        if self.state == RedirectState::Terminal {
            return None;
        }
        self.state = RedirectState::Terminal;
        Some(resolve(params))
    }
}

fn resolve(params: &RouteParams) -> RedirectTarget {
    let conversation_id = params.non_blank("id").and_then(path_segment);
    let counterpart_id = params.non_blank("userId").and_then(path_segment);

    match (conversation_id, counterpart_id) {
        (Some(conversation_id), Some(counterpart_id)) => {
            RedirectTarget::Conversation(ConversationRef {
                conversation_id,
                counterpart_id,
            })
        }
        _ => RedirectTarget::Messages,
    }
}

/// The id ends up in a `Location` header: ASCII only, and never a dot segment.
fn path_segment(raw: &str) -> Option<String> {
    validate_identifier(raw)
        .ok()
        .filter(|id| id.is_ascii() && id != "." && id != "..")
}
