//! Shell variables and name validation.
//!
//! Variables are derived from the session state on demand; there is no
//! `export`, so the set is fixed.

use crate::config;

/// Check if a variable or alias name is valid.
///
/// Valid names start with a letter or underscore and contain only ASCII
/// alphanumerics and underscores.
pub fn is_valid_var_name(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };

    if !first.is_ascii_alphabetic() && first != '_' {
        return false;
    }

    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Snapshot of the values `$VAR` can expand to.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Environment {
    pub user: String,
    pub uid: u32,
    pub home: String,
    pub pwd: String,
}

impl Environment {
    pub fn get(&self, name: &str) -> Option<String> {
        match name {
            "HOME" => Some(self.home.clone()),
            "USER" | "LOGNAME" => Some(self.user.clone()),
            "UID" => Some(self.uid.to_string()),
            "PWD" => Some(self.pwd.clone()),
            "SHELL" => Some(config::SHELL_PATH.to_string()),
            "HOSTNAME" => Some(config::HOST_NAME.to_string()),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_names() {
        assert!(is_valid_var_name("ll"));
        assert!(is_valid_var_name("_x9"));
        assert!(!is_valid_var_name(""));
        assert!(!is_valid_var_name("9lives"));
        assert!(!is_valid_var_name("a-b"));
        assert!(!is_valid_var_name("é"));
    }

    #[test]
    fn test_environment_lookup() {
        let env = Environment {
            user: "user".to_string(),
            uid: 1001,
            home: "/home/user".to_string(),
            pwd: "/tmp".to_string(),
        };
        assert_eq!(env.get("HOME").as_deref(), Some("/home/user"));
        assert_eq!(env.get("UID").as_deref(), Some("1001"));
        assert_eq!(env.get("SHELL").as_deref(), Some(config::SHELL_PATH));
        assert_eq!(env.get("PATH"), None);
    }
}
