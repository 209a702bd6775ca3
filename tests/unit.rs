use cwalk::{Visit, WalkBuilder, WalkError, Walker, walk};
use std::collections::HashSet;
use std::fs::{self, Metadata};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tempfile::tempdir;

fn build_tree(root: &Path) -> HashSet<PathBuf> {
    let dirs = ["a", "a/b", "a/b/c", "d", "d/e", "f", "f/g", "f/g/h", "f/g/h/i"];
    let files = [
        "top.txt", "a/1", "a/2", "a/b/3", "a/b/c/4", "a/b/c/5", "d/6", "d/e/7", "f/g/h/i/8",
    ];
    let mut expected = HashSet::from([root.to_path_buf()]);
    for d in dirs {
        fs::create_dir(root.join(d)).unwrap();
        expected.insert(root.join(d));
    }
    for f in files {
        fs::write(root.join(f), f).unwrap();
        expected.insert(root.join(f));
    }
    expected
}

fn visited_with(root: &Path, workers: usize, buffer: usize) -> Vec<PathBuf> {
    let seen = Mutex::new(Vec::new());
    let mut walker = Walker::new(
        WalkBuilder::new(root)
            .workers(workers)
            .buffer_size(buffer)
            .build(),
    );
    walker
        .run(|path: &Path, _: io::Result<Metadata>| {
            seen.lock().unwrap().push(path.to_path_buf());
            Visit::Continue
        })
        .unwrap();
    seen.into_inner().unwrap()
}

#[test]
fn test_visits_every_path_once() {
    let dir = tempdir().unwrap();
    let expected = build_tree(dir.path());
    for (workers, buffer) in [(1, 1), (2, 0), (4, 4), (8, 1), (16, 64)] {
        let visited = visited_with(dir.path(), workers, buffer);
        let unique: HashSet<_> = visited.iter().cloned().collect();
        assert_eq!(visited.len(), unique.len(), "duplicate visit with {} workers", workers);
        assert_eq!(unique, expected, "workers={} buffer={}", workers, buffer);
    }
}

#[test]
fn test_small_buffer_runs_inline() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let mut walker = Walker::new(WalkBuilder::new(dir.path()).workers(1).buffer_size(0).build());
    walker
        .run(|_: &Path, _: io::Result<Metadata>| Visit::Continue)
        .unwrap();
    let stats = walker.stats();
    assert_eq!(stats.directories, 10);
    assert_eq!(stats.queued + stats.inline, 10);
    assert!(stats.inline > 0);
}

#[test]
fn test_skip_subtree() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let skipped = dir.path().join("a");
    let seen = Mutex::new(Vec::new());
    walk(dir.path(), |path: &Path, _: io::Result<Metadata>| {
        seen.lock().unwrap().push(path.to_path_buf());
        if path == skipped {
            Visit::SkipSubtree
        } else {
            Visit::Continue
        }
    })
    .unwrap();
    let seen = seen.into_inner().unwrap();
    assert!(seen.contains(&skipped));
    assert!(!seen.iter().any(|p| p.starts_with(&skipped) && *p != skipped));
    assert!(seen.contains(&dir.path().join("f/g/h/i/8")));
}

#[test]
fn test_skip_on_file_is_ignored() {
    let dir = tempdir().unwrap();
    let expected = build_tree(dir.path());
    let seen = Mutex::new(HashSet::new());
    walk(dir.path(), |path: &Path, metadata: io::Result<Metadata>| {
        seen.lock().unwrap().insert(path.to_path_buf());
        match metadata {
            Ok(m) if m.is_file() => Visit::SkipSubtree,
            _ => Visit::Continue,
        }
    })
    .unwrap();
    assert_eq!(seen.into_inner().unwrap(), expected);
}

#[test]
fn test_file_root_is_not_a_directory() {
    let dir = tempdir().unwrap();
    let file = dir.path().join("plain.txt");
    fs::write(&file, "x").unwrap();
    let calls = Mutex::new(Vec::new());
    let err = walk(&file, |path: &Path, _: io::Result<Metadata>| {
        calls.lock().unwrap().push(path.to_path_buf());
        Visit::Continue
    })
    .unwrap_err();
    assert!(matches!(err, WalkError::NotADirectory { ref path } if *path == file));
    assert_eq!(calls.into_inner().unwrap(), vec![file]);
}

#[test]
fn test_abort_on_root() {
    let dir = tempdir().unwrap();
    build_tree(dir.path());
    let calls = Mutex::new(0);
    let err = walk(dir.path(), |_: &Path, _: io::Result<Metadata>| {
        *calls.lock().unwrap() += 1;
        Visit::abort("stop")
    })
    .unwrap_err();
    assert!(matches!(err, WalkError::Aborted { .. }));
    assert_eq!(err.to_string(), format!("Walk aborted at {}: stop", dir.path().display()));
    assert_eq!(calls.into_inner().unwrap(), 1);
}
