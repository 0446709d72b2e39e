//! The ReplicatedMergeTree queue log: `<zk_path>/log/log-<10-digit-index>`
//! entries, each a command a replica replays to converge its
//! local part set (insert/merge/drop). Distinct from the coordination
//! service's own Raft log (`crate::coordination`), which replicates this
//! log's writes across the cluster.

#[derive(Debug, Clone, PartialEq)]
pub enum LogCommand {
    GetPart { part_name: String },
    MergeParts { source_parts: Vec<String>, result_part: String },
    DropRange { partition: String },
}

#[derive(Debug, Clone, PartialEq)]
pub struct LogEntry {
    pub index: u64,
    pub command: LogCommand,
}

impl LogEntry {
    /// `log-<10-digit-padded-index>` node layout.
    pub fn node_name(&self) -> String {
        format!("log-{:010}", self.index)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn node_name_is_zero_padded_to_ten_digits() {
        let e = LogEntry { index: 42, command: LogCommand::DropRange { partition: "p".into() } };
        assert_eq!(e.node_name(), "log-0000000042");
    }
}
