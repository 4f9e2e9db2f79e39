//! Status codes for Detour operations

/// Result type for Detour operations
pub type Result<T> = std::result::Result<T, Status>;

/// Why a Detour operation did not produce a complete answer
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Status {
    /// Operation failed due to an unknown reason
    Failure,
    /// Provided parameter was invalid
    InvalidParam,
    /// The node pool ran out while searching
    OutOfNodes,
    /// Pathfinding failed; no valid path found
    PathInvalid,
    /// Navigation mesh data is invalid
    NavMeshInvalid,
    /// Result does not fit the caller's size limit
    BufferTooSmall,
    /// Nothing matched the query
    NotFound,
    /// The poly ref belongs to another bake
    StaleReference,
}

impl Status {
    /// Converts an optional value into a result, failing with `self`
    pub fn or_none<T>(self, value: Option<T>) -> Result<T> {
        value.ok_or(self)
    }
}

impl std::error::Error for Status {}

impl std::fmt::Display for Status {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Status::Failure => write!(f, "Failure"),
            Status::InvalidParam => write!(f, "Invalid parameter"),
            Status::OutOfNodes => write!(f, "Out of search nodes"),
            Status::PathInvalid => write!(f, "Invalid path"),
            Status::NavMeshInvalid => write!(f, "Invalid navigation mesh"),
            Status::BufferTooSmall => write!(f, "Buffer too small"),
            Status::NotFound => write!(f, "Value not found"),
            Status::StaleReference => write!(f, "Stale polygon reference"),
        }
    }
}

impl From<Status> for navgeom_common::Error {
    fn from(status: Status) -> Self {
        match status {
            Status::NavMeshInvalid | Status::InvalidParam => {
                navgeom_common::Error::NavMeshGeneration(status.to_string())
            }
            _ => navgeom_common::Error::Pathfinding(status.to_string()),
        }
    }
}
