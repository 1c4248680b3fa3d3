use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use crate::artifacts::ArtifactPaths;
use crate::error::{Result, ExplainerError};

/// Textual rewrites applied to generated code before it is rendered.
/// Older manim names that models still emit, mapped to their current form.
pub const COMPATIBILITY_SHIMS: &[(&str, &str)] = &[
    ("ShowCreation", "Create"),
];

/// Scene source written to disk for the renderer
#[derive(Debug, Clone)]
pub struct SourceFile {
    pub path: PathBuf,
    pub contents: String,
}

impl SourceFile {
    pub fn path(&self) -> &Path {
        &self.path
    }
}

/// Apply every compatibility rewrite in order.
pub fn apply_compatibility_shims(code: &str) -> String {
    COMPATIBILITY_SHIMS
        .iter()
        .fold(code.to_string(), |acc, (old, new)| acc.replace(old, new))
}

/// Embed a construct body in the fixed scene template.
///
/// The body is expected to carry its own indentation, exactly as it followed the
/// construct signature in the model reply.
pub fn render_template(scene_name: &str, body: &str) -> String {
    format!(
        "# Manim code generated with OpenAI GPT\n\
         # Command to generate animation: manim {scene}.py {scene} --format=mp4 --media_dir . --custom_folders video_dir\n\
         \n\
         from manim import *\n\
         from math import *\n\
         \n\
         class {scene}(Scene):\n    def construct(self):\n{body}",
        scene = scene_name,
        body = apply_compatibility_shims(body),
    )
}

/// Write the scene source for this run. Callers clear stale artifacts first.
pub async fn materialize(body: &str, paths: &ArtifactPaths) -> Result<SourceFile> {
    let path = paths.source_file();
    let contents = render_template(paths.scene_name(), body);

    fs::write(&path, &contents).await.map_err(|e| ExplainerError::Write {
        path: path.display().to_string(),
        details: e.to_string(),
    })?;

    info!("Scene source written: {}", path.display());
    Ok(SourceFile { path, contents })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn shims_rename_deprecated_animation() {
        assert_eq!(
            apply_compatibility_shims("self.play(ShowCreation(c), ShowCreation(s))"),
            "self.play(Create(c), Create(s))"
        );
        assert_eq!(apply_compatibility_shims("self.play(Write(t))"), "self.play(Write(t))");
    }

    #[test]
    fn template_wraps_body() {
        let body = "\n        c = Circle()\n        self.play(ShowCreation(c))";
        let source = render_template("GenScene", body);
        assert!(source.starts_with("# Manim code generated with OpenAI GPT\n"));
        assert!(source.contains("from manim import *\nfrom math import *\n"));
        assert!(source.ends_with(
            "class GenScene(Scene):\n    def construct(self):\n\n        c = Circle()\n        self.play(Create(c))"
        ));
    }

    #[tokio::test]
    async fn materialize_writes_source_file() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path(), "GenScene");

        let source = materialize("\n        s = Square()\n        self.play(FadeIn(s))", &paths)
            .await
            .unwrap();

        assert_eq!(source.path(), paths.source_file());
        let on_disk = std::fs::read_to_string(paths.source_file()).unwrap();
        assert_eq!(on_disk, source.contents);
        assert!(on_disk.contains("        s = Square()"));
    }

    #[tokio::test]
    async fn materialize_reports_write_failure() {
        let dir = tempfile::tempdir().unwrap();
        let paths = ArtifactPaths::new(dir.path().join("missing"), "GenScene");

        let result = materialize("\n        pass", &paths).await;
        assert!(matches!(result, Err(ExplainerError::Write { .. })));
    }
}
