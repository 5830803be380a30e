//! burnbox: provisioning and operations for a GPU tensor-compute
//! development image.
//!
//! Provisioning installs the toolchain and prebuilt tools, writes a compute
//! server workspace, declares supervisor units and hooks interactive logins
//! into a multiplexer session. The same crate then backs the operations CLI
//! used inside the running container.

pub mod cache;
pub mod compute;
pub mod layout;
pub mod logging;
pub mod materialize;
pub mod options;
pub mod pipeline;
pub mod provision;
pub mod services;
pub mod session;
pub mod templates;
pub mod util;

pub use burnbox_shared::errors::{BurnboxError, BurnboxResult};
pub use layout::{SystemLayout, WorkspaceLayout};
pub use options::{ConfigSource, ProvisionOptions};
pub use provision::{ProvisionMode, ProvisionReport, Provisioner};
