use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::config::{self, ROOT_UID};

/// A shell account.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct User {
    pub name: String,
    #[serde(rename = "UID")]
    pub uid: u32,
    pub home: String,
    #[serde(default)]
    pub password: String,
}

impl User {
    pub fn is_root(&self) -> bool {
        self.uid == ROOT_UID
    }

    /// `true` when no password is set (switching needs no prompt).
    pub fn has_password(&self) -> bool {
        !self.password.is_empty()
    }
}

/// Accounts and identity of the session.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Settings {
    pub users: Vec<User>,
    /// Active identity.
    pub current_user: u32,
    /// Identity before the last `su`, restored by `exit`.
    pub last_user: u32,
    #[serde(default)]
    pub colors: bool,
}

impl Default for Settings {
    fn default() -> Self {
        let users = config::DEFAULT_USERS
            .iter()
            .map(|u| User {
                name: u.name.to_string(),
                uid: u.uid,
                home: u.home.to_string(),
                password: u.password.to_string(),
            })
            .collect();
        Self {
            users,
            current_user: config::DEFAULT_UID,
            last_user: config::DEFAULT_UID,
            colors: true,
        }
    }
}

impl Settings {
    pub fn user(&self, uid: u32) -> Option<&User> {
        self.users.iter().find(|u| u.uid == uid)
    }

    pub fn user_mut(&mut self, uid: u32) -> Option<&mut User> {
        self.users.iter_mut().find(|u| u.uid == uid)
    }

    pub fn find_by_name(&self, name: &str) -> Option<&User> {
        self.users.iter().find(|u| u.name == name)
    }

    pub fn current(&self) -> Option<&User> {
        self.user(self.current_user)
    }

    /// Name of a user, falling back to the numeric id.
    pub fn name_of(&self, uid: u32) -> String {
        self.user(uid)
            .map_or_else(|| uid.to_string(), |u| u.name.clone())
    }

    /// Home of a user, falling back to `/`.
    pub fn home_of(&self, uid: u32) -> String {
        self.user(uid)
            .map_or_else(|| "/".to_string(), |u| u.home.clone())
    }
}

/// A handler failure recorded by the dispatcher.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorRecord {
    pub message: String,
    pub timestamp: String,
}

/// Usage counters shown by `stats`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct Stats {
    /// Invocations per command name.
    pub commands: BTreeMap<String, u64>,
    pub files: u64,
    pub directories: u64,
    pub sudo: u64,
    /// Screenshots taken per day (`YYYY-MM-DD`).
    pub screenshots: BTreeMap<String, u64>,
    /// Session uptime in milliseconds at the time of the last save.
    pub uptime: u64,
    pub errors: Vec<ErrorRecord>,
}

impl Stats {
    pub fn record_command(&mut self, name: &str) {
        *self.commands.entry(name.to_string()).or_insert(0) += 1;
    }

    pub fn record_error(&mut self, message: impl Into<String>, timestamp: impl Into<String>) {
        self.errors.push(ErrorRecord {
            message: message.into(),
            timestamp: timestamp.into(),
        });
        if self.errors.len() > config::MAX_ERROR_LOG {
            let excess = self.errors.len() - config::MAX_ERROR_LOG;
            self.errors.drain(..excess);
        }
    }

    pub fn record_screenshot(&mut self, day: impl Into<String>) {
        *self.screenshots.entry(day.into()).or_insert(0) += 1;
    }

    pub fn total_commands(&self) -> u64 {
        self.commands.values().sum()
    }

    /// Commands sorted by usage, most used first (ties by name).
    pub fn top_commands(&self, limit: usize) -> Vec<(&str, u64)> {
        let mut items: Vec<_> = self
            .commands
            .iter()
            .map(|(name, count)| (name.as_str(), *count))
            .collect();
        items.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(b.0)));
        items.truncate(limit);
        items
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_settings_have_root() {
        let settings = Settings::default();
        let root = settings.find_by_name("root").unwrap();
        assert!(root.is_root());
        assert_eq!(root.home, "/root");
        assert_eq!(settings.name_of(config::DEFAULT_UID), "user");
    }

    #[test]
    fn test_unknown_user_fallbacks() {
        let settings = Settings::default();
        assert_eq!(settings.name_of(4242), "4242");
        assert_eq!(settings.home_of(4242), "/");
    }

    #[test]
    fn test_settings_serde_uses_uid_key() {
        let json = serde_json::to_value(Settings::default()).unwrap();
        assert_eq!(json["users"][0]["UID"], 0);
        assert_eq!(json["currentUser"], config::DEFAULT_UID);
    }

    #[test]
    fn test_settings_ignore_permission_maps() {
        let json = r#"{
            "users": [{"name": "root", "UID": 0, "home": "/root", "password": "x",
                       "permissions": {"/": ["read", "write"]}}],
            "currentUser": 0,
            "lastUser": 0
        }"#;
        let settings: Settings = serde_json::from_str(json).unwrap();
        assert_eq!(settings.users.len(), 1);
        assert!(!settings.colors);
    }

    #[test]
    fn test_top_commands_order() {
        let mut stats = Stats::default();
        for name in ["ls", "cd", "ls", "pwd", "cd", "ls"] {
            stats.record_command(name);
        }
        assert_eq!(stats.top_commands(2), vec![("ls", 3), ("cd", 2)]);
        assert_eq!(stats.total_commands(), 6);
    }

    #[test]
    fn test_error_log_is_bounded() {
        let mut stats = Stats::default();
        for i in 0..config::MAX_ERROR_LOG + 5 {
            stats.record_error(format!("e{}", i), "t");
        }
        assert_eq!(stats.errors.len(), config::MAX_ERROR_LOG);
        assert_eq!(stats.errors[0].message, "e5");
    }
}
