//! Backend wire formats
//!
//! Plain serde structs mirroring each backend's JSON. They exist only at the
//! HTTP boundary; everything else works on the canonical types.

pub mod anthropic;
pub mod google;
pub mod openai;
