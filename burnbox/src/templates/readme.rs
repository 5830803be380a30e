pub(super) const README: &str = r#"# Burn GPU workspace

| Path | Contents |
|---|---|
| `@@project_dir@@` | compute server (`cargo run --release`) |
| `@@client_dir@@` | example remote client |
| `@@notebooks_dir@@` | notebooks (Rust kernel) |
| `@@cache_dir@@` | shared build cache |

## Environment variables

| Variable | Default | Used by |
|---|---|---|
| `@@port_var@@` | `@@default_port@@` | compute server listen port |
| `@@cache_dir_var@@` | `@@cache_dir@@` | build cache location |
| `@@cache_size_var@@` | `@@cache_size@@` | build cache size limit |
| `@@wrapper_var@@` | `sccache` | routes every compile through the cache |
| `@@remote_url_var@@` | `ws://localhost:@@default_port@@` | remote client |

## Services

Two supervisor programs are declared in `@@conf_dir@@`:

- `@@compute_service@@`: compute server on port `@@default_port@@`
- `@@notebook_service@@`: JupyterLab on port `@@notebook_port@@` (no token, no password)

```bash
supervisorctl status
supervisorctl restart @@notebook_service@@
tail -f @@log_dir@@/@@compute_service@@.out.log @@log_dir@@/@@compute_service@@.err.log
```

A unit named `<name>.conf.disabled` is installed but ignored. To enable the
compute server at container start:

```bash
burnbox service enable @@compute_service@@    # or:
mv @@conf_dir@@/@@compute_service@@.conf.disabled @@conf_dir@@/@@compute_service@@.conf
supervisorctl reread && supervisorctl update
```

`burnbox service disable @@compute_service@@` reverses it.

## Running the server by hand

```bash
@@root@@/start-burn-server.sh 8080
```

## Switching backend

The default build uses `@@default_backend@@`. Backends are mutually exclusive:

```bash
cd @@project_dir@@
cargo run --release                                                  # @@default_backend@@
cargo run --release --no-default-features --features @@alt_backend@@ # @@alt_backend@@
burnbox compute check                                                # show the selected backend
```

## Build cache

```bash
burnbox cache stats
burnbox cache usage
```
"#;
