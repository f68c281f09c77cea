use crate::types::*;
use serde::{Deserialize, Serialize};

/// A chat message forwarded by the platform bridge
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InboundMessage {
    pub message_id: MessageId,
    pub group_id: GroupId,
    pub author_id: UserId,
    pub author_name: String,
    #[serde(default)]
    pub author_is_bot: bool,
    pub content: String,
}

/// Side effect the bridge should perform in response to a message.
///
/// `Reply`, `Card` and `Attachment` go to the channel the message came from,
/// `React` and `Delete` target the message itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "t", rename_all = "snake_case")]
pub enum Action {
    Reply {
        text: String,
    },
    Card {
        title: String,
        description: String,
        #[serde(skip_serializing_if = "Option::is_none")]
        color: Option<Color>,
        #[serde(skip_serializing_if = "Option::is_none")]
        thumbnail_url: Option<String>,
    },
    React {
        emoji: String,
    },
    Delete,
    Attachment {
        filename: String,
        content: String,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ActionBatch {
    pub actions: Vec<Action>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
}
