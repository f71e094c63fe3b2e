//! # jmodel
//!
//! An in-memory Java element model: immutable handles, cached bodies,
//! a documentation comment parser and element deltas.
//!
//! ## Architecture
//!
//! - **element**: Immutable, value-equal handles for every element kind
//! - **memento**: Handle serialization to and from delimiter-escaped strings
//! - **info**: Mutable bodies kept per open handle
//! - **cache**: Tiered LRU caches of bodies plus the jar type side cache
//! - **manager**: Open/close lifecycle, the body funnel and structure building
//! - **structure**: Bodies of compilation units (tree-sitter) and class files
//! - **classfile**: Constant-pool reader for `.class` files
//! - **archive**: Jar/zip package fragment roots via memory maps
//! - **scan**: Folder root walks
//! - **buffer**: Open buffers, dirty tracking and the eviction veto
//! - **workspace**: Projects, roots, content providers and the workspace lock
//! - **javadoc**: Documentation comment parser and its problem reporting
//! - **delta**: Element delta trees and simple deltas
//! - **delta_builder**: Tree diff between two recordings of a subtree
//! - **doc_fetch**: Attached Javadoc retrieval with location validity caching
//! - **snapshot**: Persistent snapshots (LMDB) for the `diff` command
//! - **context** / **config**: Process-wide state and cache sizing

pub mod archive;
pub mod buffer;
pub mod cache;
pub mod classfile;
pub mod cli;
pub mod config;
pub mod context;
pub mod delta;
pub mod delta_builder;
pub mod doc_fetch;
pub mod element;
pub mod error;
pub mod info;
pub mod javadoc;
pub mod manager;
pub mod memento;
pub mod modifiers;
pub mod scan;
pub mod signature;
pub mod snapshot;
pub mod structure;
pub mod workspace;
