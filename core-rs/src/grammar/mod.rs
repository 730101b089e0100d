//! Line grammar of the registry state file
//!
//! One service per line, fields separated by whitespace:
//!
//! ```text
//! pald    1001    127.0.0.1,::1    # optional comment
//! billing 49201
//! ```
//!
//! The tokenizer reports blank and comment-only lines separately from
//! malformed ones so that loaders can decide what to do with them.

mod line;

pub use line::{
    format_line, is_recordable_name, is_valid_address, is_valid_name, parse_service,
    split_addresses, tokenize, ParsedLine,
};
