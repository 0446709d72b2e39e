//! Storage engines. MergeTree is the only engine in scope (spec Non-goals
//! exclude other table engines).

pub mod mergetree;
