//! MailSplit MIME - Decompose an email message into a body and its attachments.
//!
//! This crate turns the raw bytes of an RFC 5322 / MIME message into an
//! ordered, single-pass sequence of [`Part`]s: the body first, followed by
//! every attachment in the order it appears in the message.
//!
//! # Example
//!
//! ```
//! use mailsplit_mime::{decompose, PartRole};
//!
//! let raw = b"Subject: hi\r\nContent-Type: text/plain\r\n\r\nHello.";
//! let parts: Vec<_> = decompose(raw).unwrap().collect();
//!
//! assert_eq!(parts.len(), 1);
//! assert_eq!(parts[0].role, PartRole::Body);
//! assert_eq!(parts[0].filename, "text.txt");
//! ```
//!
//! # Architecture
//!
//! - [`config`]: Constants shared by the decomposer and filename handling
//! - [`error`]: Error types and Result alias
//! - [`header`]: Header unfolding and structured header values
//! - [`rfc2047`]: Encoded-word decoding for header text
//! - [`encoding`]: Content-Transfer-Encoding and charset decoding
//! - [`parser`]: MIME entity tree parser
//! - [`filename`]: Filename sanitising and extension lookup
//! - [`types`]: The [`Part`] produced by decomposition
//! - [`decomposer`]: Body selection and attachment collection
//! - [`cli`]: Command-line interface

pub mod cli;
pub mod config;
pub mod decomposer;
pub mod encoding;
pub mod error;
pub mod filename;
pub mod header;
pub mod parser;
pub mod rfc2047;
pub mod types;

pub use decomposer::{decompose, Decomposition};
pub use error::{MimeError, Result};
pub use parser::{parse_entity, Entity};
pub use types::{BodyFormat, Part, PartRole};
