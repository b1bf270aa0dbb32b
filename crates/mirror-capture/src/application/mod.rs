//! Application layer use cases for the capture application.
//!
//! # What is the "application" layer? (for beginners)
//!
//! In Clean Architecture the *application* layer sits between the domain
//! (pure rules in `mirror_core`) and the infrastructure (OS hooks, sockets,
//! files, the terminal).
//!
//! Use cases in this layer:
//!
//! - **Orchestrate** domain objects to fulfil a user goal (e.g., "mirror the
//!   pressed keys to the remote table").
//! - **Depend on abstractions** (the `Publisher` and `StatusSink` traits)
//!   rather than concrete implementations, so tests can swap in recorders.
//! - **Contain no OS calls, no network I/O, no file system access**.
//!
//! # Sub-modules
//!
//! - **`translate_input`** – Applies each raw input event to the input state
//!   and publishes what changed.  Runs on every keystroke and mouse movement.
//!
//! - **`tick`** – The fixed-rate loop: drain events, decay idle signals,
//!   render the status, repeat until shutdown.

pub mod tick;
pub mod translate_input;
