use std::path::Path;

use anyhow::Context;
use bstr::ByteSlice;

/// Name of the result artifact consulted for convergence.
pub const VASPRUN: &str = "vasprun.xml";

const DEFAULT_NELM: u64 = 60;
const DEFAULT_NSW: u64 = 0;

/// Convergence flags of a finished (or interrupted) VASP run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Convergence {
    /// The last ionic step reached self-consistency before hitting `NELM`.
    pub electronic: bool,
    /// The relaxation stopped before exhausting `NSW` ionic steps.
    pub ionic: bool,
}

impl Convergence {
    pub fn is_converged(&self) -> bool {
        self.electronic && self.ionic
    }
}

pub fn read_convergence(path: &Path) -> anyhow::Result<Convergence> {
    let content =
        std::fs::read(path).with_context(|| format!("Cannot read {}", path.display()))?;
    parse_convergence(&content).with_context(|| format!("Cannot parse {}", path.display()))
}

/// Extracts the two convergence flags from `vasprun.xml` contents.
///
/// Only a complete document is accepted; a run killed while writing leaves
/// the closing `</modeling>` tag out.
pub fn parse_convergence(content: &[u8]) -> anyhow::Result<Convergence> {
    if !content.trim_end().ends_with(b"</modeling>") {
        anyhow::bail!("Document is truncated (missing </modeling>)");
    }
    let calculations = content.find_iter(b"<calculation>").count() as u64;
    if calculations == 0 {
        anyhow::bail!("Document contains no ionic steps");
    }
    let last = content
        .rfind(b"<calculation>")
        .map(|start| &content[start..])
        .unwrap_or_default();
    let last = match last.find(b"</calculation>") {
        Some(end) => &last[..end],
        None => anyhow::bail!("Last ionic step is not closed"),
    };
    let electronic_steps = last.find_iter(b"<scstep>").count() as u64;

    let nelm = parameter(content, "NELM")?.unwrap_or(DEFAULT_NELM);
    let nsw = parameter(content, "NSW")?.unwrap_or(DEFAULT_NSW);

    Ok(Convergence {
        electronic: electronic_steps < nelm,
        ionic: nsw <= 1 || calculations < nsw,
    })
}

/// Reads an integer `<i name="...">` entry. The `<parameters>` block comes after
/// `<incar>`, so the last occurrence holds the effective value.
fn parameter(content: &[u8], name: &str) -> anyhow::Result<Option<u64>> {
    let needle = format!("name=\"{name}\"");
    let Some(start) = content.rfind(needle.as_bytes()) else {
        return Ok(None);
    };
    let rest = &content[start + needle.len()..];
    let value = rest
        .find_byte(b'>')
        .map(|open| &rest[open + 1..])
        .and_then(|value| value.find_byte(b'<').map(|close| &value[..close]))
        .ok_or_else(|| anyhow::anyhow!("Malformed {name} parameter"))?;
    let value = value.to_str_lossy();
    value
        .trim()
        .parse::<u64>()
        .map(Some)
        .map_err(|e| anyhow::anyhow!("Invalid {name} value {value:?}: {e}"))
}
