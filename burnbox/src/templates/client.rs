//! Example client crate that drives the compute server remotely.

pub(super) const MANIFEST: &str = r#"[package]
name = "remote-client"
version = "0.1.0"
edition = "2021"

[dependencies]
burn = { version = "@@burn_version@@", default-features = false, features = ["std", "remote"] }
"#;

pub(super) const MAIN_RS: &str = r#"//! Runs a few tensor operations on a remote Burn server.
//!
//! Start the server (`@@root@@/start-burn-server.sh @@default_port@@`), then:
//!
//! ```bash
//! export @@remote_url_var@@=ws://<server-ip>:@@default_port@@
//! cargo run --release
//! ```

use burn::backend::RemoteBackend;
use burn::backend::remote::RemoteDevice;
use burn::tensor::{Distribution, Tensor};

type B = RemoteBackend;

fn main() {
    let url = std::env::var("@@remote_url_var@@")
        .unwrap_or_else(|_| "ws://localhost:@@default_port@@".to_string());
    println!("Connecting to {}", url);

    let device = RemoteDevice::new(&url);

    let ones: Tensor<B, 2> = Tensor::ones([3, 3], &device);
    let noise: Tensor<B, 2> = Tensor::random([3, 3], Distribution::Uniform(-1.0, 1.0), &device);
    println!("ones:\n{}", ones);
    println!("noise:\n{}", noise);

    println!("sum:\n{}", ones.clone() + noise.clone());
    println!("matmul:\n{}", ones.matmul(noise));
}
"#;
