//! Containerfile that provisions the image with burnbox.

use super::{TemplateContext, fill};
use burnbox_shared::constants::{env, paths};
use burnbox_shared::errors::BurnboxResult;

// Cache routing is declared after `burnbox provision`: the cache tool has to
// exist before any later RUN compiles through it.
const CONTAINERFILE: &str = r#"FROM @@base_image@@

ENV DEBIAN_FRONTEND=noninteractive
ENV PATH=/root/.cargo/bin:$PATH

COPY burnbox /usr/local/bin/burnbox
@@config_lines@@
RUN burnbox provision

ENV @@cache_dir_var@@=@@cache_dir@@ \
    @@cache_size_var@@=@@cache_size@@ \
    @@wrapper_var@@=sccache \
    @@port_var@@=@@default_port@@

WORKDIR @@root@@
EXPOSE @@default_port@@ @@notebook_port@@

CMD ["supervisord", "-n", "-c", "/etc/supervisor/supervisord.conf"]
"#;

/// Render the Containerfile.
///
/// With `with_config`, the image copies `burnbox.toml` from the build context
/// and points `BURNBOX_CONFIG` at it; the caller must write that file next to
/// the Containerfile. Without it, provisioning inside the image uses defaults.
pub fn render_containerfile(ctx: &TemplateContext, with_config: bool) -> BurnboxResult<String> {
    let mut vars = ctx.vars();
    let config_lines = if with_config {
        format!(
            "COPY {file} {image}\nENV {var}={image}\n",
            file = paths::CONFIG_FILE,
            image = paths::IMAGE_CONFIG,
            var = env::CONFIG_PATH
        )
    } else {
        String::new()
    };
    vars.push(("config_lines", config_lines));
    fill(CONTAINERFILE, &vars)
}
