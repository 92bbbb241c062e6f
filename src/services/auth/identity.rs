/*
 * Responsibility
 * - 検証済みトークンから得られる「認証済み主体」の型
 * - middleware が request extensions に格納し、authorize / dispatch / handler が参照する
 */
use std::fmt;

use serde::{Deserialize, Serialize};

/// User id as minted by the user service.
///
/// The user service issues integer ids; string ids are accepted so that a
/// differently-keyed identity backend can be plugged in without a gateway change.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UserId {
    Number(i64),
    Text(String),
}

impl fmt::Display for UserId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UserId::Number(n) => write!(f, "{n}"),
            UserId::Text(s) => f.write_str(s),
        }
    }
}

/// Request-scoped identity `{id, username, role}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Identity {
    pub id: UserId,
    pub username: String,
    pub role: String,
}

impl Identity {
    pub fn has_role(&self, role: &str) -> bool {
        self.role == role
    }
}
