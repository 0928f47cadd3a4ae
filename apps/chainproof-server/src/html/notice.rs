//! Notices (flash messages) passed through redirects

use axum::response::Redirect;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    #[default]
    Info,
    Success,
    Error,
}

impl Level {
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Info => "info",
            Level::Success => "success",
            Level::Error => "error",
        }
    }
}

/// A message shown at the top of a page
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notice {
    pub level: Level,
    pub text: String,
}

impl Notice {
    pub fn new(level: Level, text: impl Into<String>) -> Self {
        Self {
            level,
            text: text.into(),
        }
    }

    pub fn error(text: impl Into<String>) -> Self {
        Self::new(Level::Error, text)
    }
}

/// Query parameters a redirected page may carry
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NoticeQuery {
    #[serde(default)]
    pub notice: Option<String>,
    #[serde(default)]
    pub level: Option<Level>,
}

impl NoticeQuery {
    pub fn into_notice(self) -> Option<Notice> {
        self.notice
            .filter(|text| !text.is_empty())
            .map(|text| Notice::new(self.level.unwrap_or_default(), text))
    }
}

/// 303 redirect to `path` carrying one notice
pub fn redirect_with_notice(path: &str, notice: &Notice) -> Redirect {
    Redirect::to(&format!(
        "{}?notice={}&level={}",
        path,
        urlencoding::encode(&notice.text),
        notice.level.as_str()
    ))
}
