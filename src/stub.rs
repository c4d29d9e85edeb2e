//! Generated source stubs.
//!
//! Some build outputs are tiny generated modules that re-export the
//! locations of vendored assets extracted from an upstream archive: a
//! worker script, a main script, and a binary payload. The stub carries a
//! comment naming its autogenerated origin so nobody edits it by hand.

use crate::error::{Error, Result};
use crate::fs_utils;
use minijinja::context;
use std::path::Path;

/// Resource locators re-exported by a generated stub module.
#[derive(Debug, Clone)]
pub struct AssetStub {
    /// URL of the upstream archive the assets came from.
    pub source_url: String,
    /// Locator for the worker script.
    pub worker: String,
    /// Locator for the main script.
    pub script: String,
    /// Locator for the binary payload.
    pub binary: String,
}

const TEMPLATE: &str = "\
// this file is autogenerated from {{ source_url }}
export * as WORKER_URL from '{{ worker }}';
export * as SCRIPT_URL from '{{ script }}';
export * as BINARY_URL from '{{ binary }}';
";

/// Render the stub module and write it to `dest`, creating parents.
pub fn write_asset_stub(dest: &Path, stub: &AssetStub) -> Result<()> {
    let mut env = minijinja::Environment::new();
    env.set_keep_trailing_newline(true);
    let rendered = env
        .render_str(
            TEMPLATE,
            context! {
                source_url => stub.source_url,
                worker => stub.worker,
                script => stub.script,
                binary => stub.binary,
            },
        )
        .map_err(|e| Error::Template {
            name: "asset stub".to_string(),
            source: e,
        })?;

    fs_utils::ensure_parent_dir(dest)?;
    std::fs::write(dest, rendered)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_stub_content() {
        let temp = tempdir().unwrap();
        let dest = temp.path().join("src/_asset_urls.ts");

        write_asset_stub(
            &dest,
            &AssetStub {
                source_url: "https://example.com/tarball/app.tar.gz".to_string(),
                worker: "vendor/app/worker.js".to_string(),
                script: "vendor/app/app.js".to_string(),
                binary: "vendor/app/app.wasm".to_string(),
            },
        )
        .unwrap();

        let content = std::fs::read_to_string(&dest).unwrap();
        assert_eq!(
            content,
            "// this file is autogenerated from https://example.com/tarball/app.tar.gz\n\
             export * as WORKER_URL from 'vendor/app/worker.js';\n\
             export * as SCRIPT_URL from 'vendor/app/app.js';\n\
             export * as BINARY_URL from 'vendor/app/app.wasm';\n"
        );
    }
}
