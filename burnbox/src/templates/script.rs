pub(super) const START_SCRIPT: &str = r#"#!/bin/sh
# Build and run the compute server with the default backend (@@default_backend@@).
#
# Usage: start-burn-server.sh [PORT]    (default @@default_port@@)
set -eu

PORT="${1:-@@default_port@@}"
export @@port_var@@="$PORT"

cd "@@project_dir@@"
echo "Starting Burn server on port $PORT"
exec cargo run --release
"#;
