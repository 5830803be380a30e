//! Example notebook for the Rust kernel.

use super::{BURN_VERSION, TemplateContext};
use burnbox_shared::errors::BurnboxResult;
use serde_json::{Value, json};

fn code_cell(source: &str) -> Value {
    json!({
        "cell_type": "code",
        "execution_count": null,
        "metadata": {},
        "outputs": [],
        "source": source_lines(source),
    })
}

fn markdown_cell(source: &str) -> Value {
    json!({
        "cell_type": "markdown",
        "metadata": {},
        "source": source_lines(source),
    })
}

/// nbformat stores sources as lines that keep their trailing newline.
fn source_lines(source: &str) -> Vec<String> {
    source.split_inclusive('\n').map(String::from).collect()
}

pub(super) fn render(ctx: &TemplateContext) -> BurnboxResult<String> {
    let backend = ctx.default_backend;

    let dep_cell = format!(
        ":sccache 1\n:dep burn = {{ version = \"{}\", features = [\"{}\"] }}",
        BURN_VERSION,
        backend.feature()
    );
    let tensor_cell = format!(
        "use burn::tensor::Tensor;\n\
         type B = {};\n\
         \n\
         let device = Default::default();\n\
         let t: Tensor<B, 2> = Tensor::ones([2, 3], &device);\n\
         println!(\"{{}}\", t);",
        backend.type_path()
    );

    let notebook = json!({
        "cells": [
            markdown_cell(&format!(
                "# Burn on the {} backend\n\nThe first cell compiles the tensor library through the shared build cache; later runs reuse it.",
                backend.feature()
            )),
            code_cell(&dep_cell),
            code_cell(&tensor_cell),
        ],
        "metadata": {
            "kernelspec": {
                "display_name": "Rust",
                "language": "rust",
                "name": "rust",
            },
            "language_info": {
                "codemirror_mode": "rust",
                "file_extension": ".rs",
                "mimetype": "text/rust",
                "name": "Rust",
                "pygment_lexer": "rust",
                "version": "",
            },
        },
        "nbformat": 4,
        "nbformat_minor": 4,
    });

    let mut text = serde_json::to_string_pretty(&notebook)?;
    text.push('\n');
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::compute::Backend;
    use crate::templates::tests::test_context;
    use std::path::Path;

    #[test]
    fn test_notebook_declares_backend_dependency_then_uses_it() {
        let mut ctx = test_context(Path::new("/tmp/t"));
        ctx.default_backend = Backend::Wgpu;
        let nb: Value = serde_json::from_str(&render(&ctx).unwrap()).unwrap();

        let cells = nb["cells"].as_array().unwrap();
        assert_eq!(cells.len(), 3);

        let dep: String = cells[1]["source"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l.as_str().unwrap())
            .collect();
        assert!(dep.contains(":dep burn = { version = \"0.17\", features = [\"wgpu\"] }"));

        let tensor: String = cells[2]["source"]
            .as_array()
            .unwrap()
            .iter()
            .map(|l| l.as_str().unwrap())
            .collect();
        assert!(tensor.contains("type B = burn::backend::Wgpu;"));
        assert!(tensor.contains("println!(\"{}\", t);"));

        assert_eq!(nb["metadata"]["kernelspec"]["name"], "rust");
        assert_eq!(nb["nbformat"], 4);
    }

    #[test]
    fn test_source_lines_keep_newlines() {
        assert_eq!(source_lines("a\nb"), vec!["a\n", "b"]);
    }
}
