// Shared build script helper: embed each crate's README.md as rustdoc.
// Include from a crate's build.rs with: include!("../build_common.rs");
//
// Required imports in the including file:
//   use std::env;
//   use std::fs;
//   use std::path::Path;

/// Copy the crate's README.md into OUT_DIR so `lib.rs` can pull it in with
/// `#![doc = include_str!(...)]`.
///
/// Intra-repo links of the form `](src/foo.rs)` are rewritten to `](foo)` so
/// rustdoc resolves them as module links instead of dead file paths.
fn embed_readme_as_rustdoc(crate_dir: &str) {
    println!("cargo:rerun-if-changed=README.md");

    let readme_path = Path::new(crate_dir).join("README.md");
    let content = fs::read_to_string(&readme_path)
        .unwrap_or_else(|_| panic!("missing README.md in {crate_dir}"));

    let rustdoc_content = content.replace("](src/", "](").replace(".rs)", ")");

    let out_dir = env::var("OUT_DIR").unwrap();
    fs::write(Path::new(&out_dir).join("README_GENERATED.md"), rustdoc_content).unwrap();
}
