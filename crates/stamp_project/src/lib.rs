//! # stamp_project
//!
//! Post-materialization integration for stamp: wiring a freshly rendered
//! project into version control and into a surrounding multi-package
//! workspace.
//!
//! Both integrators follow a best-effort contract: they return structured
//! results with boolean outcome flags plus warning and error lists, and
//! callers are expected to keep going (and tell the user) rather than
//! treat an integrator failure as overall failure.

pub mod git;
pub mod workspace;

pub use git::{GitIntegrator, GitResult};
pub use workspace::{WorkspaceIntegrator, WorkspaceResult};
