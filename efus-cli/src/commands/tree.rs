use anyhow::{Context, Result};
use efus_core::parse_file;
use std::path::Path;

/// Print the instruction tree of `path`
pub fn print_tree(path: &Path) -> Result<()> {
    let program =
        parse_file(path).with_context(|| format!("Failed to parse {}", path.display()))?;
    print!("{}", program.root.dump());
    Ok(())
}
