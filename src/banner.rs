// src/banner.rs
use std::io::Write;
use std::path::Path;

/// Writes the startup banner: what is being run and from where.
pub fn write_banner<W: Write>(
    out: &mut W,
    repo_root: &Path,
    filter: Option<&str>,
) -> std::io::Result<()> {
    writeln!(out, "🧪 Answer Eval Runner")?;
    writeln!(out, "📂 Repo: {}", repo_root.display())?;
    match filter {
        Some(id) => writeln!(out, "🎯 Testing specific answer: {}", id),
        None => writeln!(out, "🔍 Running all evals..."),
    }
}
