use serde::{Deserialize, Serialize};

/// Contact entry as delivered by the game client
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Contact {
    #[serde(default)]
    pub id: i64,
    pub display: String,
    pub number: String,
    #[serde(default)]
    pub avatar: Option<String>,
}

/// What the call screen shows for a resolved number
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ContactDisplay {
    #[serde(rename = "displayName")]
    pub display_name: String,
    #[serde(rename = "avatarUrl")]
    pub avatar_url: Option<String>,
}

impl From<&Contact> for ContactDisplay {
    fn from(contact: &Contact) -> Self {
        Self {
            display_name: contact.display.clone(),
            avatar_url: contact.avatar.clone().filter(|a| !a.is_empty()),
        }
    }
}

/// Strip everything but digits and a leading `+` so lookups ignore formatting
pub fn normalize_number(number: &str) -> String {
    let trimmed = number.trim();
    let mut out: String = trimmed.chars().filter(|c| c.is_ascii_digit()).collect();
    if trimmed.starts_with('+') {
        out.insert(0, '+');
    }
    out
}
