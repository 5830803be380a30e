//! Compute server crate: manifest, entrypoint, start routine.

pub(super) const MANIFEST: &str = r#"[package]
name = "@@project_name@@"
version = "0.1.0"
edition = "2021"

[dependencies]
burn = { version = "@@burn_version@@", default-features = false, features = ["std", "server"] }

# Exactly one backend per build.
[features]
default = ["@@default_backend@@"]
cuda = ["burn/cuda"]
wgpu = ["burn/wgpu"]

[profile.release]
opt-level = 3
"#;

pub(super) const MAIN_RS: &str = r#"fn main() {
    @@crate_ident@@::start();
}
"#;

pub(super) const LIB_RS: &str = r#"//! Burn remote-backend server.
//!
//! Listens on `@@port_var@@` (default @@default_port@@) and serves tensor
//! operations on the backend chosen at build time.

#[cfg(all(feature = "cuda", feature = "wgpu"))]
compile_error!("features `cuda` and `wgpu` are mutually exclusive: build with exactly one backend");

const PORT_VAR: &str = "@@port_var@@";
const DEFAULT_PORT: u16 = @@default_port@@;

/// Listen port from the environment, or the default when unset.
///
/// Panics when the variable is set to anything but a valid port number.
pub fn port() -> u16 {
    match std::env::var(PORT_VAR) {
        Ok(value) => value.parse().unwrap_or_else(|_| {
            panic!(
                "{} must be a valid port number (0-65535), got: {:?}",
                PORT_VAR, value
            )
        }),
        Err(std::env::VarError::NotPresent) => DEFAULT_PORT,
        Err(e) => panic!("{} is not readable: {}", PORT_VAR, e),
    }
}

pub fn start() {
    let port = port();

    #[cfg(feature = "cuda")]
    {
        println!("Starting Burn server (cuda backend) on port {}", port);
        burn::server::start::<burn::backend::Cuda>(Default::default(), port);
    }

    #[cfg(feature = "wgpu")]
    {
        println!("Starting Burn server (wgpu backend) on port {}", port);
        burn::server::start::<burn::backend::Wgpu>(Default::default(), port);
    }

    #[cfg(not(any(feature = "cuda", feature = "wgpu")))]
    panic!(
        "no compute backend selected (port {}): build with `--features cuda` or `--features wgpu`",
        port
    );
}
"#;
