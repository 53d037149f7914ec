//! Inbound requests to the controller.
//!
//! A closed set of shapes, decoded once from the wire by
//! [`rpc::codec`](crate::rpc::codec) and matched exhaustively by the
//! [`CommandEngine`](crate::rpc::engine::CommandEngine).

/// Read-only queries (`"OPERATION":"GET"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Query {
    /// What is running right now and how deep is the queue.
    Status,
    /// Zone id → description map.
    Stations,
}

/// State-changing commands (`"OPERATION":"SET"`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Queue one activation of `zone` for `duration_secs`.
    Operate { zone: String, duration_secs: u32 },
    /// Stop the running activation; queued jobs still run.
    Cancel,
    /// Drop every queued job, then stop the running activation.
    CancelAll,
}

/// Everything a client can ask for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Request {
    Get(Query),
    Set(Command),
}
