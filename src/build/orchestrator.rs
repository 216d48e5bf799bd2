use colored::*;
use std::path::PathBuf;

use super::export::export_artifacts;
use super::paths::{BuildPathResolver, BuildPaths, PathRequest};
use super::walker::{SketchWalker, SourceFile};
use crate::errors::{BuildError, Result};
use crate::props::{DEPRECATION_NOTICE, PropertySource, PropertyTable, merge};
use crate::sketch::Sketch;
use crate::toolchain::{ArtifactSet, CompileJob, Compiler, Fqbn, PackageManager, resolve_board};

/// Inputs of one `compile` invocation.
#[derive(Debug, Clone, Default)]
pub struct CompileRequest {
    pub sketch_path: PathBuf,
    /// Falls back to the board attached in `sketch.json`.
    pub fqbn: Option<String>,
    /// Both property flags, in command-line order.
    pub properties: Vec<PropertySource>,
    pub build_path: Option<PathBuf>,
    pub output_dir: Option<PathBuf>,
    pub export_binaries: bool,
    pub always_export: bool,
    pub libraries: Vec<PathBuf>,
    pub clean: bool,
    pub dry_run: bool,
    pub verbose: bool,
}

#[derive(Debug, Clone)]
pub struct CompileOutcome {
    pub sketch: Sketch,
    pub fqbn: Fqbn,
    pub paths: BuildPaths,
    pub properties: PropertyTable,
    pub sources: Vec<SourceFile>,
    pub command: Vec<String>,
    /// `None` for dry runs.
    pub artifacts: Option<ArtifactSet>,
    pub exported: Vec<PathBuf>,
    pub warnings: Vec<String>,
}

/// Runs the whole pipeline. Any stage failure aborts the build.
pub fn compile_sketch(
    request: &CompileRequest,
    resolver: &BuildPathResolver,
    compiler: &dyn Compiler,
    packages: &dyn PackageManager,
) -> Result<CompileOutcome> {
    let mut warnings = Vec::new();

    // 1. Sketch and target
    let sketch = Sketch::load(&request.sketch_path)?;
    let raw_fqbn = request
        .fqbn
        .as_deref()
        .filter(|f| !f.trim().is_empty())
        .or(sketch.attached_fqbn())
        .ok_or(BuildError::MissingTarget)?;
    let fqbn = Fqbn::parse(raw_fqbn)?;

    // 2. Build paths
    let paths = resolver.resolve(
        &sketch,
        &fqbn,
        &PathRequest {
            build_path: request.build_path.as_deref(),
            output_dir: request.output_dir.as_deref(),
            export_binaries: request.export_binaries,
            always_export: request.always_export,
        },
    );
    paths.check_sketch_root(sketch.root())?;

    // 3. Properties
    let merged = merge(&request.properties)?;
    if merged.deprecated_form_used {
        eprintln!("{} {}", "⚠".yellow(), DEPRECATION_NOTICE.yellow());
        warnings.push(DEPRECATION_NOTICE.to_string());
    }

    // 4. Sources
    let mut walker = SketchWalker::new(sketch.root()).exclude(paths.primary_dir());
    if let Some(export) = paths.export_dir() {
        walker = walker.exclude(export);
    }
    let sources = walker.walk()?;
    tracing::debug!(count = sources.len(), "collected sources");

    let job = CompileJob {
        sketch: &sketch,
        fqbn: &fqbn,
        sources: &sources,
        properties: &merged.table,
        build_dir: paths.primary_dir(),
        libraries: &request.libraries,
        verbose: request.verbose,
    };
    let command = compiler.command_line(&job);

    if request.dry_run {
        return Ok(CompileOutcome {
            sketch,
            fqbn,
            paths,
            properties: merged.table,
            sources,
            command,
            artifacts: None,
            exported: Vec::new(),
            warnings,
        });
    }

    // 5. Compile
    resolve_board(&fqbn, packages)?;
    paths.prepare(request.clean)?;
    let artifacts = compiler.compile(&job)?;

    // 6. Export
    let exported = match paths.export_dir() {
        Some(dir) => export_artifacts(&artifacts, dir)?,
        None => Vec::new(),
    };

    Ok(CompileOutcome {
        sketch,
        fqbn,
        paths,
        properties: merged.table,
        sources,
        command,
        artifacts: Some(artifacts),
        exported,
        warnings,
    })
}
