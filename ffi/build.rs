use std::env;
use std::path::PathBuf;

/// Generate `webreq.h` into `OUT_DIR`. Header generation is best effort: a
/// parse failure is reported as a warning and never fails the build.
fn main() {
    println!("cargo:rerun-if-changed=src/lib.rs");
    println!("cargo:rerun-if-changed=src/types.rs");

    let (Ok(crate_dir), Ok(out_dir)) = (env::var("CARGO_MANIFEST_DIR"), env::var("OUT_DIR")) else {
        return;
    };
    let src = PathBuf::from(crate_dir).join("src");

    let generated = cbindgen::Builder::new()
        .with_src(src.join("lib.rs"))
        .with_src(src.join("types.rs"))
        .with_language(cbindgen::Language::C)
        .with_include_guard("WEBREQ_H")
        .with_sys_include("stdbool.h")
        .with_sys_include("stdint.h")
        .generate();

    match generated {
        Ok(bindings) => {
            bindings.write_to_file(PathBuf::from(out_dir).join("webreq.h"));
        }
        Err(err) => println!("cargo:warning=skipping C header generation: {err}"),
    }
}
