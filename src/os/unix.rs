// OS abstraction layer for scpush - Unix implementation
// (c) 2024 Ross Younger

use std::path::PathBuf;

use super::AbstractPlatform;
use crate::config::BASE_CONFIG_FILENAME;

#[derive(Debug, Clone, Copy)]
/// OS abstraction layer for Unix-like platforms
pub struct Platform {}

impl AbstractPlatform for Platform {
    fn user_config_dir() -> Option<PathBuf> {
        // home directory for now
        dirs::home_dir()
    }

    fn user_config_path() -> Option<PathBuf> {
        // ~/.<filename> for now
        let mut d = Self::user_config_dir()?;
        d.push(format!(".{BASE_CONFIG_FILENAME}"));
        Some(d)
    }

    fn system_config_path() -> Option<PathBuf> {
        // /etc/<filename> for now
        let mut p = PathBuf::from("/etc");
        p.push(BASE_CONFIG_FILENAME);
        Some(p)
    }

    fn local_user() -> Option<String> {
        ["USER", "LOGNAME"]
            .iter()
            .filter_map(|v| std::env::var(v).ok())
            .find(|s| !s.is_empty())
    }
}

#[cfg(test)]
mod test {
    use super::Platform;
    use crate::os::AbstractPlatform as _;

    #[test]
    fn config_paths() {
        assert_eq!(
            Platform::system_config_path().unwrap().to_string_lossy(),
            "/etc/scpush.toml"
        );
        if let Some(p) = Platform::user_config_path() {
            assert!(p.ends_with(".scpush.toml"));
        }
        if let Some(u) = std::env::var("USER").ok().filter(|u| !u.is_empty()) {
            assert_eq!(Platform::local_user(), Some(u));
        }
    }
}
