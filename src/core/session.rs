use serde::{Deserialize, Serialize};

use crate::core::{now_millis, ProvId};

/// Identity of the process performing graph mutations.
///
/// Built once per attach and never mutated afterwards; objects, versions and
/// bundles reference it by id.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Session {
    pub id: ProvId,
    pub mac_address: Option<String>,
    pub user: String,
    pub program: String,
    pub cmdline: String,
    pub pid: u32,
    pub start_time: u64,
}

impl Session {
    /// A session with explicit identity fields and a fresh id
    pub fn new(user: impl Into<String>, program: impl Into<String>, cmdline: impl Into<String>) -> Self {
        Session {
            id: ProvId::generate(),
            mac_address: None,
            user: user.into(),
            program: program.into(),
            cmdline: cmdline.into(),
            pid: std::process::id(),
            start_time: now_millis(),
        }
    }

    /// Record the identity of the current process
    pub fn capture() -> Self {
        let user = std::env::var("USER")
            .or_else(|_| std::env::var("USERNAME"))
            .unwrap_or_else(|_| "unknown".to_string());
        let args: Vec<String> = std::env::args().collect();
        let program = std::env::current_exe()
            .ok()
            .map(|p| p.display().to_string())
            .or_else(|| args.first().cloned())
            .unwrap_or_default();
        let mac_address = std::env::var("CPL_MAC_ADDRESS").ok().filter(|m| !m.is_empty());

        Session { mac_address, ..Session::new(user, program, args.join(" ")) }
    }

    pub fn with_mac_address(mut self, mac: impl Into<String>) -> Self {
        self.mac_address = Some(mac.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_capture_fills_process_identity() {
        let session = Session::capture();
        assert!(!session.id.is_none());
        assert_eq!(session.pid, std::process::id());
        assert!(session.start_time > 0);
        assert!(!session.user.is_empty());
    }

    #[test]
    fn test_sessions_get_distinct_ids() {
        let a = Session::new("alice", "convert", "convert a b");
        let b = Session::new("alice", "convert", "convert a b");
        assert_ne!(a.id, b.id);
        assert_eq!(a.with_mac_address("00:11:22:33:44:55").mac_address.as_deref(), Some("00:11:22:33:44:55"));
    }
}
