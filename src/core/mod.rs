//! Core XML parsing primitives
//!
//! - Scanner: SIMD-accelerated delimiter detection using memchr
//! - Tokenizer: single-pass XML token extraction
//! - Entities: predefined entity and character-reference decoding with Cow

pub mod entities;
pub mod scanner;
pub mod tokenizer;
