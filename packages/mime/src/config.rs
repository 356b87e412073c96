//! Configuration constants for the decomposer.

/// Content type assumed for an entity without a `Content-Type` header (RFC 2045 §5.2).
pub const DEFAULT_CONTENT_TYPE: &str = "text/plain";

/// Content type assumed for leaves of a `multipart/digest` container.
pub const DIGEST_CONTENT_TYPE: &str = "message/rfc822";

/// Content type used when an attachment declares nothing usable.
pub const FALLBACK_CONTENT_TYPE: &str = "application/octet-stream";

/// Suggested filename stem for the body part.
pub const BODY_FILE_STEM: &str = "text";

/// Suggested filename stem for an attachment that carries no name.
pub const ATTACHMENT_FILE_STEM: &str = "attachment";

/// Suggested filename stem for a nested message without a subject.
pub const NESTED_MESSAGE_FILE_STEM: &str = "message";

/// Extension given to nested messages.
pub const NESTED_MESSAGE_EXTENSION: &str = "eml";

/// Maximum length, in characters, of a suggested filename.
///
/// Output names are prefixed with the source name and a role tag, so the
/// part filename is kept well under common 255-byte filesystem limits.
pub const MAX_FILENAME_CHARS: usize = 120;

/// Maximum multipart nesting depth followed by the parser.
///
/// Deeper entities are kept as opaque leaves.
pub const MAX_NESTING_DEPTH: usize = 32;
