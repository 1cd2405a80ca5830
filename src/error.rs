use thiserror::Error;

/// Errors reported by the registry and the physics manager mutators.
///
/// The per-tick driver never returns these; it logs and carries on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum CollideError {
    /// The collision box handle was destroyed (or never belonged to this world).
    #[error("stale collision box handle")]
    StaleBox,
    /// The physical object handle was destroyed.
    #[error("stale physical object handle")]
    StaleBody,
    /// The obstacle handle was destroyed.
    #[error("stale obstacle handle")]
    StaleObstacle,
    /// The rect does not fit inside the spatial index root boundary.
    /// The box keeps its rect but is not reachable by queries.
    #[error("rect outside spatial index bounds")]
    OutOfBounds,
}
