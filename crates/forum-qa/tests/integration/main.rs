//! Integration tests for forum-qa
//!
//! Exercise the managers and the vote engine against an in-memory SQLite
//! database with every migration applied.

mod cascade_delete_test;
mod concurrent_vote_test;
mod fixtures;
mod vote_toggle_test;
