use serde::{Deserialize, Serialize};

/// Opaque ID types handed to us by the chat platform
pub type UserId = String;
pub type GroupId = String;
pub type MessageId = String;

/// Embed accent color as a 24-bit RGB value
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Color(pub u32);

impl Color {
    /// Accent used when the author of a solve holds first place
    pub const GOLD: Color = Color(0xF1C40F);
}

/// Marker appended to first-place leaderboard lines
pub const CROWN: &str = ":crown:";

/// Reaction added to announcements whose proof image failed to render
pub const REJECTED_REACTION: &str = "\u{1F6AB}";
