//! # RowDB CLI Module
//!
//! An interactive shell for poking at a table: inserting, removing, and
//! querying rows, plus introspection of the underlying index. It consumes
//! only the public `Table` surface.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────┐
//! │                   CLI Entry Point                       │
//! │                   (bin/rowdb.rs)                        │
//! ├─────────────────────────────────────────────────────────┤
//! │                      REPL Loop                          │
//! │  - Reads input via rustyline                            │
//! │  - Dispatches to the command handler                    │
//! │  - Prints results and errors                            │
//! ├─────────────────────────────────────────────────────────┤
//! │     Commands                        │      History      │
//! │  insert / remove / search / range / │  XDG state dir,   │
//! │  list, and dot commands (.tree,     │  ROWDB_HISTORY    │
//! │  .check, .help, .quit)              │  override         │
//! └─────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//!
//! ```bash
//! # Create a table with two fields of 10 and 20 characters
//! rowdb --create --fields 10,20 ./people.rdb
//!
//! # Open it again later
//! rowdb ./people.rdb
//! ```

pub mod commands;
pub mod history;
pub mod repl;

pub use repl::Repl;
