//! Infrastructure layer for the capture application.
//!
//! Contains OS-facing adapters: input capture hooks and device readers, the
//! TCP publisher, file-system config storage, and the terminal status view.
//!
//! **Dependency rule**: this layer may depend on `application` and
//! `mirror_core`; the domain in `mirror_core` never imports it.

pub mod input_capture;
pub mod publish;
pub mod status;
pub mod storage;
