use std::collections::BTreeMap;
use std::path::Path;

use crate::common::utils::fs::read_text;

/// Name of the VASP control file.
pub const INCAR: &str = "INCAR";

/// Parsed `INCAR` control file.
///
/// Keys are case-insensitive in VASP, so they are stored upper-cased.
/// Values are kept as written (without trailing comments).
#[derive(Debug, Default, Clone)]
pub struct Incar {
    tags: BTreeMap<String, String>,
}

impl Incar {
    pub fn from_file(path: &Path) -> std::io::Result<Self> {
        Ok(Self::parse(&read_text(path)?))
    }

    pub fn parse(content: &str) -> Self {
        let mut tags = BTreeMap::new();
        for line in content.lines() {
            let line = match line.find(|c: char| c == '#' || c == '!') {
                Some(index) => &line[..index],
                None => line,
            };
            for statement in line.split(';') {
                if let Some((key, value)) = statement.split_once('=') {
                    let key = key.trim();
                    if key.is_empty() {
                        continue;
                    }
                    tags.insert(key.to_uppercase(), value.trim().to_string());
                }
            }
        }
        Self { tags }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.tags.get(&key.to_uppercase()).map(|v| v.as_str())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.tags.contains_key(&key.to_uppercase())
    }

    pub fn get_int(&self, key: &str) -> Option<i64> {
        self.get(key).and_then(|value| {
            value
                .split_whitespace()
                .next()
                .and_then(|v| v.parse().ok())
        })
    }

    /// VASP logicals: `.TRUE.`, `T`, `.FALSE.`, `F` (case-insensitive).
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.get(key).and_then(parse_logical)
    }

    /// `SYSTEM` tag, used as a human readable job name.
    pub fn system_name(&self) -> Option<&str> {
        self.get("SYSTEM").filter(|name| !name.is_empty())
    }

    /// Multi-stage (nudged elastic band) runs declare the number of images and
    /// keep each stage in a numbered subdirectory.
    pub fn is_multi_stage(&self) -> bool {
        self.contains("IMAGES")
    }

    /// `IBRION = 0` selects molecular dynamics.
    pub fn is_molecular_dynamics(&self) -> bool {
        self.get_int("IBRION") == Some(0)
    }

    pub fn is_noncollinear(&self) -> bool {
        self.get_bool("LSORBIT").unwrap_or(false) || self.get_bool("LNONCOLLINEAR").unwrap_or(false)
    }

    pub fn uses_vdw_kernel(&self) -> bool {
        self.get_bool("LUSE_VDW").unwrap_or(false)
    }
}

fn parse_logical(value: &str) -> Option<bool> {
    let value = value.trim().trim_start_matches('.').to_ascii_uppercase();
    if value.starts_with('T') {
        Some(true)
    } else if value.starts_with('F') {
        Some(false)
    } else {
        None
    }
}
