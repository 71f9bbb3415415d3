//! Query understanding: free text → [`ParsedQuery`](crate::types::ParsedQuery).
//!
//! Recognises file-extension hints, size and date phrases, and count
//! phrasing. Parsing never fails; unrecognised words become keywords.

pub mod parser;
pub mod units;

pub use parser::{parse, parse_request};
