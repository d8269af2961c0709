use std::collections::hash_map::DefaultHasher;
use std::fs;
use std::hash::{Hash, Hasher};
use std::path::PathBuf;

// Hashes every file under static/ so templates can cache-bust `/static` links.
fn main() {
    println!("cargo:rerun-if-changed=static/");

    let mut files: Vec<PathBuf> = fs::read_dir("static")
        .expect("static/ directory is missing")
        .filter_map(|e| e.ok())
        .map(|e| e.path())
        .filter(|p| p.is_file())
        .collect();
    files.sort();

    let mut hasher = DefaultHasher::new();
    for path in files {
        let contents = fs::read(&path).expect("unreadable static asset");
        path.file_name().hash(&mut hasher);
        contents.hash(&mut hasher);
    }

    let hash = format!("{:016x}", hasher.finish());
    println!("cargo:rustc-env=STATIC_HASH={}", &hash[..8]);
}
