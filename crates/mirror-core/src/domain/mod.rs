//! Domain entities for Input-Mirror.
//!
//! This module contains pure business logic with no infrastructure
//! dependencies: no OS input APIs, no sockets, no terminal.  Everything here
//! can be compiled and tested on any platform.
//!
//! # How the pieces fit together (for beginners)
//!
//! - [`signals`] names what is tracked: keys, modifiers, mouse buttons, and
//!   the three continuous velocities.
//! - [`normalize`] turns a raw delta plus elapsed time into a value in
//!   `[-1, 1]`.
//! - [`state`] holds the current value of every tracked signal.
//! - [`decay`] zeroes velocities once the device has been idle for a while.
//! - [`capture_mode`] is the pause/resume switch; pausing resets the state.
//! - [`channels`] maps every signal onto the named channel it is published on.
//!
//! The application layer (in `mirror-capture`) wires these together into the
//! event translator.

pub mod capture_mode;
pub mod channels;
pub mod decay;
pub mod normalize;
pub mod signals;
pub mod state;
