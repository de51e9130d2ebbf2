//! Command abstractions.

use uuid::Uuid;

/// Trait that all commands implement.
///
/// Every command acts on behalf of exactly one subject; the API layer uses
/// `subject_id` to serialize work per subject.
pub trait Command: Send + Sync + std::fmt::Debug {
    /// The type name for this command (for logging/routing).
    fn command_type(&self) -> &'static str;

    /// Correlation ID to trace this command through the system.
    fn correlation_id(&self) -> Uuid;

    /// The subject (player or other tracked actor) the command acts for.
    fn subject_id(&self) -> Uuid;
}
