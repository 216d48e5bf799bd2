//! The build pipeline: paths, sources, compile, export.

pub mod export;
pub(crate) mod feedback;
pub mod orchestrator;
pub mod paths;
pub mod walker;

pub use export::export_artifacts;
pub use orchestrator::{CompileOutcome, CompileRequest, compile_sketch};
pub use paths::{BuildDir, BuildPathResolver, BuildPaths, PathRequest, ephemeral_build_dir};
pub use walker::{SketchWalker, SourceFile, SourceKind};
