//! Source positions and diagnostic rendering shared by the tag parser and
//! compiler crates.

mod render;
mod span;

pub use render::Diagnostic;
pub use render::DiagnosticAnnotation;
pub use render::DiagnosticRenderer;
pub use render::Severity;
pub use span::ByteOffset;
pub use span::LineCol;
pub use span::LineIndex;
pub use span::Span;
