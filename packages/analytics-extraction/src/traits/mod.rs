//! Core trait abstractions for the extraction library.
//!
//! These traits define the collaborators the engine consumes: a transport
//! that issues page requests and a store that persists bookmarks.

pub mod state;
pub mod transport;
