//! Cluster topology: shards, each with one or more replicas.

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Replica {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone)]
pub struct Shard {
    pub replicas: Vec<Replica>,
    pub weight: u32,
}

#[derive(Debug, Clone, Default)]
pub struct Cluster {
    pub shards: Vec<Shard>,
}

impl Cluster {
    pub fn single_shard_single_replica(host: impl Into<String>, port: u16) -> Self {
        Self { shards: vec![Shard { replicas: vec![Replica { host: host.into(), port }], weight: 1 }] }
    }

    pub fn total_replica_count(&self) -> usize {
        self.shards.iter().map(|s| s.replicas.len()).sum()
    }
}
