//! Build script for storefront crate.
//!
//! Computes a content hash of the stylesheet so templates can append it as a
//! cache-busting query parameter.

use std::env;
use std::fs;
use std::path::Path;

use sha2::{Digest, Sha256};

fn main() {
    hash_css();
}

/// Hash `static/css/main.css` and expose the first 8 hex chars as `CSS_HASH`.
fn hash_css() {
    let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") else {
        println!("cargo:rustc-env=CSS_HASH=dev");
        return;
    };
    let css_path = Path::new(&manifest_dir).join("static/css/main.css");

    println!("cargo:rerun-if-changed={}", css_path.display());

    let hash = match fs::read(&css_path) {
        Ok(content) => {
            let digest = format!("{:x}", Sha256::digest(&content));
            digest.chars().take(8).collect::<String>()
        }
        Err(e) => {
            println!("cargo:warning=Could not read main.css: {e}");
            "dev".to_owned()
        }
    };

    println!("cargo:rustc-env=CSS_HASH={hash}");
}
