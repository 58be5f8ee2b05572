//! Recoverable problems accumulated over a run.

use std::{fmt, sync::Mutex};

use serde::Serialize;
use tracing::warn;

use crate::identity::DeclarationId;

/// A recoverable problem. Diagnostics degrade output but never abort a run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Diagnostic {
    /// A link target could not be resolved and was rendered as plain text.
    UnresolvedReference {
        /// Target that failed to resolve.
        target: DeclarationId,
        /// Page on which the link appeared.
        page: String,
    },
    /// An external link index could not be fetched; that base resolves nothing.
    ExternalIndexFetchFailure {
        /// Base URL of the external documentation.
        url: String,
        /// Description of the failure.
        reason: String,
    },
    /// A supertype traversal ran into a cycle and stopped.
    CyclicSupertype {
        /// Declaration whose ancestors were being walked.
        origin: DeclarationId,
        /// Declaration reached a second time.
        repeated: DeclarationId,
    },
    /// A declaration had no analysable platform and was dropped.
    DroppedDeclaration {
        /// The dropped declaration.
        id: DeclarationId,
        /// Platform pass that reported it.
        pass: String,
    },
    /// A line in an external link index did not match the expected schema.
    SkippedIndexLine {
        /// Base URL of the index.
        url: String,
        /// 1-based line number.
        line: usize,
        /// The raw line content.
        content: String,
    },
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::UnresolvedReference { target, page } => {
                write!(f, "unresolved reference to {target} on page {page}")
            }
            Self::ExternalIndexFetchFailure { url, reason } => {
                write!(f, "could not load external index for {url}: {reason}")
            }
            Self::CyclicSupertype { origin, repeated } => write!(
                f,
                "cyclic supertype chain from {origin}: {repeated} reached twice"
            ),
            Self::DroppedDeclaration { id, pass } => write!(
                f,
                "dropped {id} from pass '{pass}': no analysable platform"
            ),
            Self::SkippedIndexLine { url, line, content } => {
                write!(f, "skipped line {line} of index {url}: {content:?}")
            }
        }
    }
}

/// Thread-safe collector for the diagnostics of a single run.
///
/// Every reported diagnostic is also emitted as a `tracing` warning.
#[derive(Debug, Default)]
pub struct Diagnostics {
    /// Reported diagnostics, in report order.
    entries: Mutex<Vec<Diagnostic>>,
}

impl Diagnostics {
    /// Create an empty collector.
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a diagnostic.
    pub fn report(&self, diagnostic: Diagnostic) {
        warn!("{diagnostic}");
        self.lock().push(diagnostic);
    }

    /// Snapshot of every diagnostic reported so far, in report order.
    pub fn entries(&self) -> Vec<Diagnostic> {
        self.lock().clone()
    }

    /// Number of diagnostics reported so far.
    pub fn len(&self) -> usize {
        self.lock().len()
    }

    /// Whether nothing has been reported.
    pub fn is_empty(&self) -> bool {
        self.lock().is_empty()
    }

    /// Acquire the entry list, recovering from a poisoned lock.
    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Diagnostic>> {
        self.entries
            .lock()
            .unwrap_or_else(std::sync::PoisonError::into_inner)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn collects_in_report_order() {
        let diagnostics = Diagnostics::new();
        assert!(diagnostics.is_empty());
        diagnostics.report(Diagnostic::DroppedDeclaration {
            id: DeclarationId::new("a.B"),
            pass: "js".into(),
        });
        diagnostics.report(Diagnostic::ExternalIndexFetchFailure {
            url: "https://example.com/".into(),
            reason: "timeout".into(),
        });
        let entries = diagnostics.entries();
        assert_eq!(entries.len(), 2);
        assert_eq!(
            entries[0].to_string(),
            "dropped a.B from pass 'js': no analysable platform"
        );
    }
}
