//! Source discovery under a sketch root.
//!
//! The walk is lazy and deterministic: entries are visited in file-name
//! order and symlinks are never followed by `walkdir` itself. Directory
//! symlinks are entered explicitly as new frames, after checking their
//! canonical target against every directory already on the chain.

use std::collections::HashSet;
use std::ffi::OsStr;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};
use walkdir::{DirEntry, WalkDir};

use crate::errors::{BuildError, Result};

/// Directory names pruned during traversal. Never matched against files.
pub const IGNORED_DIRS: &[&str] = &[".git", ".svn", ".hg", ".bzr", "CVS", "RCS", "SCCS"];

const MAX_LINK_HOPS: usize = 40;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Sketch,
    C,
    Cpp,
    Header,
    Assembly,
}

impl SourceKind {
    pub fn from_path(path: &Path) -> Option<Self> {
        match path.extension()?.to_str()? {
            "ino" | "pde" => Some(Self::Sketch),
            "c" => Some(Self::C),
            "cpp" | "cc" | "cxx" => Some(Self::Cpp),
            "h" | "hh" | "hpp" => Some(Self::Header),
            "S" => Some(Self::Assembly),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceFile {
    pub path: PathBuf,
    pub kind: SourceKind,
}

impl SourceFile {
    fn from_path(path: &Path) -> Option<Self> {
        SourceKind::from_path(path).map(|kind| Self {
            path: path.to_path_buf(),
            kind,
        })
    }
}

#[derive(Debug, Clone)]
struct Excluded {
    path: PathBuf,
    canonical: PathBuf,
}

#[derive(Debug, Clone)]
pub struct SketchWalker {
    root: PathBuf,
    excluded: Vec<Excluded>,
}

impl SketchWalker {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            excluded: Vec::new(),
        }
    }

    /// Prunes `dir` (typically a build directory inside the sketch).
    pub fn exclude(mut self, dir: impl Into<PathBuf>) -> Self {
        let path = dir.into();
        let canonical = fs::canonicalize(&path).unwrap_or_else(|_| path.clone());
        self.excluded.push(Excluded { path, canonical });
        self
    }

    pub fn iter(&self) -> SourceFiles<'_> {
        SourceFiles {
            walker: self,
            stack: Vec::new(),
            started: false,
            done: false,
        }
    }

    /// Runs the whole walk, stopping at the first error.
    pub fn walk(&self) -> Result<Vec<SourceFile>> {
        self.iter().collect()
    }

    fn is_excluded(&self, canonical: &Path) -> bool {
        self.excluded.iter().any(|x| x.canonical == canonical)
    }

    fn frame(&self, dir: &Path, canonical_root: PathBuf) -> Frame {
        let excluded: Vec<PathBuf> = self.excluded.iter().map(|x| x.path.clone()).collect();
        let entries = WalkDir::new(dir)
            .min_depth(1)
            .follow_links(false)
            .sort_by_file_name()
            .into_iter()
            .filter_entry(move |e: &DirEntry| keep_entry(e, &excluded));
        Frame {
            entries: Box::new(entries),
            canonical_root,
        }
    }
}

fn is_ignored_dir_name(name: &OsStr) -> bool {
    name.to_str().is_some_and(|n| IGNORED_DIRS.contains(&n))
}

fn keep_entry(entry: &DirEntry, excluded: &[PathBuf]) -> bool {
    if !entry.file_type().is_dir() {
        return true;
    }
    if is_ignored_dir_name(entry.file_name()) {
        tracing::debug!(dir = %entry.path().display(), "skipping ignored directory");
        return false;
    }
    !excluded.iter().any(|x| x == entry.path())
}

struct Frame {
    entries: Box<dyn Iterator<Item = walkdir::Result<DirEntry>>>,
    canonical_root: PathBuf,
}

/// Lazy sequence of source files. Fused after the first error.
pub struct SourceFiles<'a> {
    walker: &'a SketchWalker,
    stack: Vec<Frame>,
    started: bool,
    done: bool,
}

impl SourceFiles<'_> {
    fn open_root(&self) -> Result<Frame> {
        let root = &self.walker.root;
        let canonical = fs::canonicalize(root).map_err(|source| read_error(root, source))?;
        Ok(self.walker.frame(root, canonical))
    }

    fn visit(&mut self, item: walkdir::Result<DirEntry>) -> Result<Option<SourceFile>> {
        let entry = item.map_err(walk_error)?;
        if entry.path_is_symlink() {
            return self.visit_link(&entry);
        }
        if entry.file_type().is_file() {
            return Ok(SourceFile::from_path(entry.path()));
        }
        Ok(None)
    }

    fn visit_link(&mut self, entry: &DirEntry) -> Result<Option<SourceFile>> {
        let link = entry.path();
        let Some(target) = resolve_link(link)? else {
            tracing::debug!(link = %link.display(), "skipping dangling symlink");
            return Ok(None);
        };

        if target.is_file() {
            return Ok(SourceFile::from_path(link));
        }
        if !target.is_dir()
            || is_ignored_dir_name(entry.file_name())
            || target.file_name().is_some_and(is_ignored_dir_name)
            || self.walker.is_excluded(&target)
        {
            return Ok(None);
        }

        let parent = match link.parent() {
            Some(parent) => {
                Some(fs::canonicalize(parent).map_err(|source| read_error(parent, source))?)
            }
            None => None,
        };
        let loops = parent.as_ref().is_some_and(|p| p.starts_with(&target))
            || self
                .stack
                .iter()
                .any(|frame| frame.canonical_root.starts_with(&target));
        if loops {
            return Err(BuildError::CyclicPath {
                link: link.to_path_buf(),
                target,
            });
        }

        tracing::debug!(link = %link.display(), target = %target.display(), "entering linked directory");
        let frame = self.walker.frame(link, target);
        self.stack.push(frame);
        Ok(None)
    }
}

impl Iterator for SourceFiles<'_> {
    type Item = Result<SourceFile>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        if !self.started {
            self.started = true;
            match self.open_root() {
                Ok(frame) => self.stack.push(frame),
                Err(e) => {
                    self.done = true;
                    return Some(Err(e));
                }
            }
        }

        loop {
            let frame = self.stack.last_mut()?;
            let Some(item) = frame.entries.next() else {
                self.stack.pop();
                continue;
            };
            match self.visit(item) {
                Ok(Some(file)) => return Some(Ok(file)),
                Ok(None) => continue,
                Err(e) => {
                    self.done = true;
                    self.stack.clear();
                    return Some(Err(e));
                }
            }
        }
    }
}

/// Follows `link` one hop at a time. `Ok(None)` means the chain dangles.
pub fn resolve_link(link: &Path) -> Result<Option<PathBuf>> {
    let mut seen = HashSet::new();
    let mut current = link.to_path_buf();

    for _ in 0..MAX_LINK_HOPS {
        if !seen.insert(current.clone()) {
            return Err(BuildError::CyclicPath {
                link: link.to_path_buf(),
                target: current,
            });
        }

        let meta = match fs::symlink_metadata(&current) {
            Ok(meta) => meta,
            Err(e) if e.kind() == io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(read_error(&current, e)),
        };
        if !meta.file_type().is_symlink() {
            return fs::canonicalize(&current)
                .map(Some)
                .map_err(|source| read_error(&current, source));
        }

        let target = fs::read_link(&current).map_err(|source| read_error(&current, source))?;
        current = match current.parent() {
            Some(parent) => parent.join(target),
            None => target,
        };
    }

    Err(BuildError::CyclicPath {
        link: link.to_path_buf(),
        target: current,
    })
}

fn read_error(path: &Path, source: io::Error) -> BuildError {
    BuildError::SketchRead {
        path: path.to_path_buf(),
        source,
    }
}

fn walk_error(err: walkdir::Error) -> BuildError {
    let path = err.path().map(Path::to_path_buf).unwrap_or_default();
    read_error(&path, err.into())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::errors::ErrorKind;
    use tempfile::TempDir;

    fn sketch(tmp: &TempDir, name: &str) -> PathBuf {
        let root = tmp.path().join(name);
        fs::create_dir_all(&root).unwrap();
        fs::write(root.join(format!("{}.ino", name)), "void setup(){}\n").unwrap();
        root
    }

    fn names(files: &[SourceFile], root: &Path) -> Vec<String> {
        files
            .iter()
            .map(|f| {
                f.path
                    .strip_prefix(root)
                    .unwrap()
                    .to_string_lossy()
                    .replace('\\', "/")
            })
            .collect()
    }

    #[test]
    fn test_collects_sources_only() {
        let tmp = TempDir::new().unwrap();
        let root = sketch(&tmp, "Blink");
        fs::write(root.join("helper.cpp"), "").unwrap();
        fs::write(root.join("notes.txt"), "").unwrap();
        fs::create_dir_all(root.join("src")).unwrap();
        fs::write(root.join("src").join("util.h"), "").unwrap();

        let files = SketchWalker::new(&root).walk().unwrap();
        assert_eq!(
            names(&files, &root),
            vec!["Blink.ino", "helper.cpp", "src/util.h"]
        );
        assert_eq!(files[0].kind, SourceKind::Sketch);
    }

    #[test]
    fn test_rcs_directory_pruned_but_rcs_sketch_kept() {
        let tmp = TempDir::new().unwrap();
        let root = sketch(&tmp, "RCS");
        fs::create_dir_all(root.join("RCS")).unwrap();
        fs::write(root.join("RCS").join("old.c"), "").unwrap();
        fs::create_dir_all(root.join(".git")).unwrap();
        fs::write(root.join(".git").join("hook.c"), "").unwrap();

        let files = SketchWalker::new(&root).walk().unwrap();
        assert_eq!(names(&files, &root), vec!["RCS.ino"]);
    }

    #[test]
    fn test_walk_is_deterministic() {
        let tmp = TempDir::new().unwrap();
        let root = sketch(&tmp, "Order");
        for name in ["z.c", "a.cpp", "m.h"] {
            fs::write(root.join(name), "").unwrap();
        }
        let walker = SketchWalker::new(&root);
        assert_eq!(walker.walk().unwrap(), walker.walk().unwrap());
    }

    #[test]
    fn test_excluded_dir_pruned() {
        let tmp = TempDir::new().unwrap();
        let root = sketch(&tmp, "Export");
        let build = root.join("build");
        fs::create_dir_all(&build).unwrap();
        fs::write(build.join("sketch.cpp"), "").unwrap();

        let files = SketchWalker::new(&root).exclude(&build).walk().unwrap();
        assert_eq!(names(&files, &root), vec!["Export.ino"]);
    }

    #[test]
    fn test_missing_root_is_sketch_error() {
        let tmp = TempDir::new().unwrap();
        let err = SketchWalker::new(tmp.path().join("gone")).walk().unwrap_err();
        assert_eq!(err.kind(), ErrorKind::InvalidSketch);
        assert!(err.to_string().contains("Error during sketch processing"));
    }

    #[cfg(unix)]
    mod links {
        use super::*;
        use std::os::unix::fs::symlink;

        #[test]
        fn test_self_loop() {
            let tmp = TempDir::new().unwrap();
            let root = sketch(&tmp, "SelfLoop");
            let link = root.join("loop");
            symlink(&link, &link).unwrap();

            let err = SketchWalker::new(&root).walk().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CyclicPath);
            assert!(err.to_string().contains("Error during sketch processing"));
        }

        #[test]
        fn test_link_to_ancestor() {
            let tmp = TempDir::new().unwrap();
            let root = sketch(&tmp, "UpLoop");
            fs::create_dir_all(root.join("sub")).unwrap();
            symlink(&root, root.join("sub").join("up")).unwrap();

            let err = SketchWalker::new(&root).walk().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CyclicPath);
        }

        #[test]
        fn test_mutual_links_terminate() {
            let tmp = TempDir::new().unwrap();
            let root = sketch(&tmp, "Mutual");
            fs::create_dir_all(root.join("a")).unwrap();
            fs::create_dir_all(root.join("b")).unwrap();
            symlink(root.join("b"), root.join("a").join("to_b")).unwrap();
            symlink(root.join("a"), root.join("b").join("to_a")).unwrap();

            let err = SketchWalker::new(&root).walk().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CyclicPath);
        }

        #[test]
        fn test_link_chain_loop() {
            let tmp = TempDir::new().unwrap();
            let root = sketch(&tmp, "Chain");
            symlink(root.join("two"), root.join("one")).unwrap();
            symlink(root.join("one"), root.join("two")).unwrap();

            let err = SketchWalker::new(&root).walk().unwrap_err();
            assert_eq!(err.kind(), ErrorKind::CyclicPath);
        }

        #[test]
        fn test_dangling_link_skipped() {
            let tmp = TempDir::new().unwrap();
            let root = sketch(&tmp, "Dangling");
            symlink(root.join("nowhere.cpp"), root.join("ghost.cpp")).unwrap();

            let files = SketchWalker::new(&root).walk().unwrap();
            assert_eq!(names(&files, &root), vec!["Dangling.ino"]);
        }

        #[test]
        fn test_link_to_ignored_directory_skipped() {
            let tmp = TempDir::new().unwrap();
            let root = sketch(&tmp, "Vcs");
            let repo = tmp.path().join(".git");
            fs::create_dir_all(&repo).unwrap();
            fs::write(repo.join("hook.c"), "").unwrap();
            symlink(&repo, root.join("lib")).unwrap();

            let files = SketchWalker::new(&root).walk().unwrap();
            assert_eq!(names(&files, &root), vec!["Vcs.ino"]);
        }

        #[test]
        fn test_linked_directory_outside_sketch_followed() {
            let tmp = TempDir::new().unwrap();
            let root = sketch(&tmp, "Linked");
            let shared = tmp.path().join("shared");
            fs::create_dir_all(&shared).unwrap();
            fs::write(shared.join("lib.cpp"), "").unwrap();
            symlink(&shared, root.join("ext")).unwrap();

            let files = SketchWalker::new(&root).walk().unwrap();
            assert_eq!(names(&files, &root), vec!["Linked.ino", "ext/lib.cpp"]);
        }
    }
}
