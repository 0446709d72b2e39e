//! 4-letter words: `mntr`, `stat`, `conf`, `ruok`, etc. bypass
//! the replicated log entirely and answer from local in-memory state.

use crate::coordination::node_store::NodeStore;
use crate::coordination::session::SessionManager;

pub struct ServerStats {
    pub is_leader: bool,
    pub min_session_timeout_ms: u64,
    pub max_session_timeout_ms: u64,
    pub tick_time_ms: u64,
}

pub fn ruok() -> &'static str {
    "imok"
}

pub fn mntr(sessions: &SessionManager, nodes: &NodeStore, stats: &ServerStats) -> String {
    let live_sessions = sessions.expired_sessions(u64::MAX).len();
    format!(
        "zk_version\t1.0\n\
         zk_server_state\t{}\n\
         zk_znode_count\t{}\n\
         zk_watch_count\t0\n\
         zk_ephemerals_count\t{}\n\
         zk_outstanding_expirations\t{}\n",
        if stats.is_leader { "leader" } else { "follower" },
        nodes.list("/").map(|c| c.len()).unwrap_or(0),
        0,
        live_sessions,
    )
}

pub fn conf(stats: &ServerStats) -> String {
    format!(
        "minSessionTimeout={}\nmaxSessionTimeout={}\ntickTime={}\n",
        stats.min_session_timeout_ms, stats.max_session_timeout_ms, stats.tick_time_ms
    )
}

pub fn stat(sessions: &SessionManager, stats: &ServerStats) -> String {
    format!(
        "Mode: {}\nConnections: {}\n",
        if stats.is_leader { "leader" } else { "follower" },
        sessions.expired_sessions(u64::MAX).len(),
    )
}

/// Dispatches a raw 4-letter command word to the matching handler, or
/// `None` if the word isn't recognized (callers fall through to the normal
/// client protocol in that case).
pub fn dispatch(word: &str, sessions: &SessionManager, nodes: &NodeStore, stats: &ServerStats) -> Option<String> {
    match word {
        "ruok" => Some(ruok().to_string()),
        "mntr" => Some(mntr(sessions, nodes, stats)),
        "conf" => Some(conf(stats)),
        "stat" => Some(stat(sessions, stats)),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn stats() -> ServerStats {
        ServerStats { is_leader: true, min_session_timeout_ms: 1_000, max_session_timeout_ms: 60_000, tick_time_ms: 2_000 }
    }

    #[test]
    fn ruok_always_answers_imok() {
        assert_eq!(ruok(), "imok");
    }

    #[test]
    fn unknown_word_falls_through_to_none() {
        let sessions = SessionManager::new();
        let nodes = NodeStore::new();
        assert!(dispatch("xyz", &sessions, &nodes, &stats()).is_none());
    }

    #[test]
    fn mntr_reports_leader_state() {
        let sessions = SessionManager::new();
        let nodes = NodeStore::new();
        let out = dispatch("mntr", &sessions, &nodes, &stats()).unwrap();
        assert!(out.contains("zk_server_state\tleader"));
    }
}
