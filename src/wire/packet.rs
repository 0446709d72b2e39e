//! Typed packet ids. Each message begins with a varint packet type, the
//! same framing the ClickHouse native protocol uses.

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum ServerPacketId {
    Hello = 0,
    Data = 1,
    Exception = 2,
    Progress = 3,
    Pong = 4,
    EndOfStream = 5,
    ProfileInfo = 6,
    Totals = 7,
    Extremes = 8,
}

impl ServerPacketId {
    pub fn from_u64(v: u64) -> Option<Self> {
        Some(match v {
            0 => Self::Hello,
            1 => Self::Data,
            2 => Self::Exception,
            3 => Self::Progress,
            4 => Self::Pong,
            5 => Self::EndOfStream,
            6 => Self::ProfileInfo,
            7 => Self::Totals,
            8 => Self::Extremes,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u64)]
pub enum ClientPacketId {
    Hello = 0,
    Query = 1,
    Data = 2,
    Cancel = 3,
    Ping = 4,
}

impl ClientPacketId {
    pub fn from_u64(v: u64) -> Option<Self> {
        Some(match v {
            0 => Self::Hello,
            1 => Self::Query,
            2 => Self::Data,
            3 => Self::Cancel,
            4 => Self::Ping,
            _ => return None,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessingStage {
    FetchColumns = 0,
    WithMergeableState = 1,
    Complete = 2,
}

#[derive(Debug, Clone)]
pub struct HelloRequest {
    pub client_name: String,
    pub version_major: u64,
    pub version_minor: u64,
    pub revision: u64,
    pub default_database: String,
    pub user: String,
    pub password: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct HelloResponse {
    pub server_name: String,
    pub version_major: u64,
    pub version_minor: u64,
    pub revision: u64,
}

#[derive(Debug, Clone)]
pub struct QueryRequest {
    pub query_id: String,
    pub settings: Option<String>,
    pub stage: ProcessingStage,
    pub compression_enabled: bool,
    pub query: String,
}

#[derive(Debug, Clone)]
pub struct ExceptionInfo {
    pub code: i32,
    pub name: String,
    pub message: String,
    pub stack_trace: Option<String>,
}

#[derive(Debug, Clone, Default)]
pub struct ProgressInfo {
    pub rows: u64,
    pub bytes: u64,
    pub total_rows: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn server_packet_ids_round_trip() {
        for id in [0u64, 1, 2, 3, 4, 5, 6, 7, 8] {
            assert_eq!(ServerPacketId::from_u64(id).unwrap() as u64, id);
        }
        assert!(ServerPacketId::from_u64(9).is_none());
    }

    #[test]
    fn client_packet_ids_round_trip() {
        for id in [0u64, 1, 2, 3, 4] {
            assert_eq!(ClientPacketId::from_u64(id).unwrap() as u64, id);
        }
    }
}
