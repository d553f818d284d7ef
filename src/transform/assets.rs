// src/transform/assets.rs

use crate::transform::{OutputFile, Transform, TransformFuture, TransformInput, TransformOutput};

/// Copies entries byte for byte.
#[derive(Debug, Clone, Copy, Default)]
pub struct AssetCopy;

impl Transform for AssetCopy {
    fn name(&self) -> &str {
        "assets"
    }

    fn transform<'a>(&'a self, input: &'a TransformInput) -> TransformFuture<'a> {
        Box::pin(async move {
            let files = input
                .entries
                .iter()
                .map(|entry| OutputFile::new(entry.output.clone(), entry.contents.clone()))
                .collect();
            Ok(TransformOutput {
                files,
                diagnostics: Vec::new(),
            })
        })
    }
}
