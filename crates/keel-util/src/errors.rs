use miette::Diagnostic;
use thiserror::Error;

/// Unified error type for all Keel operations.
#[derive(Debug, Error, Diagnostic)]
pub enum KeelError {
    /// I/O operation failed.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Invalid or malformed manifest (e.g. Keel.toml).
    #[error("Manifest error: {message}")]
    #[diagnostic(help("Check your Keel.toml for syntax errors"))]
    Manifest { message: String },

    /// No version is declared for a dependency anywhere in scope.
    #[error("Unresolved dependency {coordinate}: {message}")]
    #[diagnostic(
        code(keel::unresolved_dependency),
        help("Give the dependency a version, add it to [catalog], or force one with [[force]]")
    )]
    UnresolvedDependency { coordinate: String, message: String },

    /// Two forced-version rules of equal specificity disagree.
    #[error("Conflicting forced versions for {coordinate} in scope `{scope}`: {versions}")]
    #[diagnostic(
        code(keel::conflict),
        help("Forced versions never win silently; remove one rule or make them agree")
    )]
    Conflict {
        coordinate: String,
        scope: String,
        versions: String,
    },

    /// An authored and a generated source tree declare the same file.
    #[error("Source overlap in module `{module}`: `{file}` exists in both {authored} and {generated}")]
    #[diagnostic(
        code(keel::source_overlap),
        help("Generated sources must not shadow authored ones; delete one of the copies")
    )]
    SourceOverlap {
        module: String,
        file: String,
        authored: String,
        generated: String,
    },

    /// Publishing to one target failed.
    #[error("Publishing to `{target}` failed: {message}")]
    Publish { target: String, message: String },

    /// One or more targets failed while the rest were published.
    #[error("{failed} of {total} publication(s) failed")]
    #[diagnostic(help("See the per-target summary above for the reasons"))]
    PublishIncomplete { failed: usize, total: usize },

    /// Modules or tasks depend on each other in a loop.
    #[error("Dependency cycle detected: {path}")]
    Cycle { path: String },

    /// The build plan could not be assembled (unknown plugin, bad task reference).
    #[error("Build plan error: {message}")]
    Plan { message: String },

    /// Network request failed.
    #[error("Network error: {message}")]
    Network { message: String },

    /// Catch-all for miscellaneous errors.
    #[error("{message}")]
    Generic { message: String },
}

impl KeelError {
    /// Whether this error belongs to the resolution phase and must abort
    /// the build before any task is planned.
    pub fn is_resolution_error(&self) -> bool {
        matches!(
            self,
            Self::UnresolvedDependency { .. } | Self::Conflict { .. } | Self::SourceOverlap { .. }
        )
    }
}

/// Convenience alias for `miette::Result<T>`.
pub type KeelResult<T> = miette::Result<T>;
