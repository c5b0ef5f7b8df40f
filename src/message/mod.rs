//! Frame parsing and encoding for the chat wire protocol

mod parser;

pub use parser::{encode_outbound, parse_frame};
