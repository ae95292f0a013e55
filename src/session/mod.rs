//! Captured browsing-session state.
//!
//! The cookies file is produced out of band by [`login::capture_session`]
//! and read every time a driver is acquired. Writers are not coordinated;
//! the last one wins.

pub mod login;

use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

use crate::app::Result;

/// Same-site policies a browser accepts when a cookie is injected.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SameSite {
    Strict,
    Lax,
    None,
}

impl SameSite {
    pub fn as_str(&self) -> &'static str {
        match self {
            SameSite::Strict => "Strict",
            SameSite::Lax => "Lax",
            SameSite::None => "None",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "Strict" => Some(SameSite::Strict),
            "Lax" => Some(SameSite::Lax),
            "None" => Some(SameSite::None),
            _ => None,
        }
    }
}

/// One cookie record in the session file.
///
/// Fields this crate does not interpret are kept in `extra` and written back
/// untouched.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionCookie {
    pub name: String,
    #[serde(default)]
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default = "default_path")]
    pub path: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expires: Option<f64>,
    #[serde(default)]
    pub http_only: bool,
    #[serde(default)]
    pub secure: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub same_site: Option<String>,
    #[serde(flatten)]
    pub extra: serde_json::Map<String, serde_json::Value>,
}

fn default_path() -> String {
    "/".to_string()
}

impl SessionCookie {
    pub fn new(name: impl Into<String>, value: impl Into<String>, domain: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: value.into(),
            domain: domain.into(),
            path: default_path(),
            expires: None,
            http_only: false,
            secure: false,
            same_site: Some(SameSite::Lax.as_str().to_string()),
            extra: serde_json::Map::new(),
        }
    }

    /// The parsed policy, or `None` when missing or not one of Strict/Lax/None
    pub fn same_site_policy(&self) -> Option<SameSite> {
        self.same_site.as_deref().and_then(SameSite::parse)
    }

    /// Session cookies are written with a negative expiry by some browsers.
    pub fn is_session(&self) -> bool {
        self.expires.is_none_or(|e| e <= 0.0)
    }
}

/// Ordered set of cookies making up an authenticated session.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionState {
    pub cookies: Vec<SessionCookie>,
}

impl SessionState {
    pub fn new(cookies: Vec<SessionCookie>) -> Self {
        Self { cookies }
    }

    /// Normalize every missing or invalid same-site value to `Lax`.
    ///
    /// Returns the number of records changed; valid records are left alone.
    pub fn repair(&mut self) -> usize {
        let mut repaired = 0;
        for cookie in &mut self.cookies {
            if cookie.same_site_policy().is_none() {
                cookie.same_site = Some(SameSite::Lax.as_str().to_string());
                repaired += 1;
            }
        }
        repaired
    }

    /// A state is usable once every record carries a valid policy
    pub fn is_usable(&self) -> bool {
        self.cookies.iter().all(|c| c.same_site_policy().is_some())
    }

    pub fn len(&self) -> usize {
        self.cookies.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cookies.is_empty()
    }
}

/// File-backed session state.
#[derive(Debug, Clone)]
pub struct SessionStore {
    path: PathBuf,
}

impl SessionStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    pub fn exists(&self) -> bool {
        self.path.exists()
    }

    /// Read the file and repair it in memory
    pub fn load(&self) -> Result<SessionState> {
        let content = fs::read_to_string(&self.path)?;
        let cookies: Vec<SessionCookie> = serde_json::from_str(&content)?;
        let mut state = SessionState::new(cookies);

        let repaired = state.repair();
        if repaired > 0 {
            warn!(
                "Repaired sameSite on {} of {} cookies from {:?}",
                repaired,
                state.len(),
                self.path
            );
        }
        debug!("Loaded {} cookies from {:?}", state.len(), self.path);

        Ok(state)
    }

    pub fn save(&self, cookies: &[SessionCookie]) -> Result<usize> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                fs::create_dir_all(parent)?;
            }
        }

        let json = serde_json::to_string_pretty(cookies)?;
        fs::write(&self.path, json)?;

        info!("Saved {} cookies to {:?}", cookies.len(), self.path);
        Ok(cookies.len())
    }

    /// Repair the file on disk, rewriting it only when something changed
    pub fn repair_file(&self) -> Result<usize> {
        let content = fs::read_to_string(&self.path)?;
        let cookies: Vec<SessionCookie> = serde_json::from_str(&content)?;
        let mut state = SessionState::new(cookies);

        let repaired = state.repair();
        if repaired > 0 {
            self.save(&state.cookies)?;
        }
        Ok(repaired)
    }
}
