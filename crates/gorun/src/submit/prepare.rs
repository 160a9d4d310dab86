//! Per-directory input preparation and log cleanup done before each submission.

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::common::config::ServerConfig;
use crate::common::env::VASP_PP_PATH;
use crate::common::error::GorunError;
use crate::common::utils::fs::is_non_empty_file;
use crate::job::incar::{INCAR, Incar};
use crate::output::{Output, StatusKind};

const POSCAR: &str = "POSCAR";
const CONTCAR: &str = "CONTCAR";
const POTCAR: &str = "POTCAR";
const KPOINTS: &str = "KPOINTS";
const VDW_KERNEL: &str = "vdw_kernel.bindat";

/// Makes the inputs of one run directory ready for a (re)start.
pub trait InputPreparer {
    fn prepare(&self, dir: &Path, output: &dyn Output) -> crate::Result<()>;
}

/// Removes scheduler logs left behind by previous runs of one directory.
pub trait LogCleaner {
    fn clean(&self, dir: &Path, output: &dyn Output) -> crate::Result<()>;
}

pub struct VaspInputPreparer {
    /// Pseudopotential library; only needed when a POTCAR is generated.
    pp_root: Option<PathBuf>,
    /// Element -> pseudopotential set overrides.
    potcar: BTreeMap<String, String>,
    vdw_kernel: Option<PathBuf>,
    keep_potcar: bool,
}

impl VaspInputPreparer {
    pub fn new(
        pp_root: Option<PathBuf>,
        potcar: BTreeMap<String, String>,
        vdw_kernel: Option<PathBuf>,
        keep_potcar: bool,
    ) -> Self {
        Self {
            pp_root,
            potcar,
            vdw_kernel,
            keep_potcar,
        }
    }

    pub fn from_server(server: &ServerConfig, keep_potcar: bool) -> Self {
        Self::new(
            std::env::var_os(VASP_PP_PATH).map(PathBuf::from),
            server.potcar.clone(),
            server.vdw_kernel.clone(),
            keep_potcar,
        )
    }

    fn restart_from_contcar(&self, dir: &Path, output: &dyn Output) -> crate::Result<()> {
        if is_non_empty_file(&dir.join(CONTCAR)) {
            std::fs::copy(dir.join(CONTCAR), dir.join(POSCAR))?;
            output.print_status(
                StatusKind::Progress,
                &format!("Found CONTCAR in {}. Copying over to POSCAR", dir.display()),
            );
        }
        Ok(())
    }

    fn normalize_inputs(&self, dir: &Path, output: &dyn Output) -> crate::Result<()> {
        for name in [POSCAR, INCAR, KPOINTS] {
            let path = dir.join(name);
            if !path.is_file() {
                continue;
            }
            let content = std::fs::read_to_string(&path)?;
            let normalized = normalize_input(&content);
            if normalized != content {
                std::fs::write(&path, normalized)?;
                output.print_status(
                    StatusKind::Progress,
                    &format!("Cleaned file: {}", path.display()),
                );
            }
        }
        Ok(())
    }

    fn generate_potcar(&self, dir: &Path, output: &dyn Output) -> crate::Result<()> {
        let poscar = dir.join(POSCAR);
        if !is_non_empty_file(&poscar) {
            return Ok(());
        }
        let potcar = dir.join(POTCAR);
        if self.keep_potcar && is_non_empty_file(&potcar) {
            output.print_status(
                StatusKind::Progress,
                &format!("Keeping existing {}", potcar.display()),
            );
            return Ok(());
        }
        let pp_root = self
            .pp_root
            .as_deref()
            .ok_or_else(|| GorunError::MissingEnvironment(VASP_PP_PATH.to_string()))?;

        let species = poscar_species(&std::fs::read_to_string(&poscar)?).ok_or_else(|| {
            GorunError::GenericError(format!(
                "{} does not list the atomic species on its sixth line",
                poscar.display()
            ))
        })?;
        let mut content = String::new();
        let mut setups = Vec::with_capacity(species.len());
        for element in &species {
            let setup = self
                .potcar
                .get(element)
                .map(|s| s.as_str())
                .unwrap_or(element);
            let source = pp_root.join(setup).join(POTCAR);
            let data = std::fs::read_to_string(&source).map_err(|error| {
                GorunError::GenericError(format!(
                    "Cannot read pseudopotential {}: {error}",
                    source.display()
                ))
            })?;
            content.push_str(&data);
            if !content.ends_with('\n') {
                content.push('\n');
            }
            setups.push(setup);
        }
        std::fs::write(&potcar, content)?;
        output.print_status(
            StatusKind::Progress,
            &format!("Generated {} ({})", potcar.display(), setups.join(" ")),
        );
        Ok(())
    }

    fn stage_vdw_kernel(&self, dir: &Path, output: &dyn Output) -> crate::Result<()> {
        let Ok(incar) = Incar::from_file(&dir.join(INCAR)) else {
            return Ok(());
        };
        if !incar.uses_vdw_kernel() || dir.join(VDW_KERNEL).exists() {
            return Ok(());
        }
        match &self.vdw_kernel {
            Some(kernel) => {
                std::fs::copy(kernel, dir.join(VDW_KERNEL))?;
                output.print_status(
                    StatusKind::Progress,
                    &format!("Copied {} into {}", VDW_KERNEL, dir.display()),
                );
            }
            None => output.print_status(
                StatusKind::Warning,
                &format!(
                    "LUSE_VDW is set but no vdW kernel is configured; {} is missing in {}",
                    VDW_KERNEL,
                    dir.display()
                ),
            ),
        }
        Ok(())
    }
}

impl InputPreparer for VaspInputPreparer {
    fn prepare(&self, dir: &Path, output: &dyn Output) -> crate::Result<()> {
        self.restart_from_contcar(dir, output)?;
        self.normalize_inputs(dir, output)?;
        self.generate_potcar(dir, output)?;
        self.stage_vdw_kernel(dir, output)
    }
}

/// Drops the UTF-8 byte order mark, converts CRLF line endings and blanks
/// lines that contain only tabs (VASP misreads them).
pub fn normalize_input(content: &str) -> String {
    let content = content.replace('\u{feff}', "").replace("\r\n", "\n");
    content
        .split('\n')
        .map(|line| {
            if !line.is_empty() && line.bytes().all(|b| b == b'\t') {
                ""
            } else {
                line
            }
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Element symbols from the species line (line 6) of a VASP 5 POSCAR.
pub fn poscar_species(poscar: &str) -> Option<Vec<String>> {
    let line = poscar.lines().nth(5)?;
    let species: Vec<String> = line
        .split_whitespace()
        .map(|token| token.split('/').next().unwrap_or(token).to_string())
        .collect();
    let valid = !species.is_empty()
        && species
            .iter()
            .all(|s| s.chars().next().is_some_and(|c| c.is_ascii_alphabetic()));
    valid.then_some(species)
}

pub struct SlurmLogCleaner;

impl LogCleaner for SlurmLogCleaner {
    fn clean(&self, dir: &Path, output: &dyn Output) -> crate::Result<()> {
        let mut logs = Vec::new();
        for entry in std::fs::read_dir(dir)? {
            let entry = entry?;
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if name.starts_with("slurm-") && name.ends_with(".out") && entry.file_type()?.is_file()
            {
                logs.push(entry.path());
            }
        }
        logs.sort();
        for log in logs {
            match std::fs::remove_file(&log) {
                Ok(()) => output.print_status(
                    StatusKind::Progress,
                    &format!("Deleted old Slurm log: {}", log.display()),
                ),
                Err(error) => output.print_status(
                    StatusKind::Warning,
                    &format!("Error deleting Slurm log {}: {error}", log.display()),
                ),
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{
        InputPreparer, LogCleaner, SlurmLogCleaner, VaspInputPreparer, normalize_input,
        poscar_species,
    };
    use crate::common::error::GorunError;
    use crate::tests::utils::{RecordingOutput, write_file};
    use std::collections::BTreeMap;
    use std::path::Path;
    use tempfile::TempDir;

    const POSCAR: &str = "Li2O\n1.0\n4 0 0\n0 4 0\n0 0 4\nLi O\n2 1\nDirect\n0 0 0\n0.5 0.5 0\n0.5 0 0.5\n";

    fn read(dir: &Path, name: &str) -> String {
        std::fs::read_to_string(dir.join(name)).unwrap()
    }

    fn pp_library() -> TempDir {
        let dir = TempDir::with_prefix("gorun-pp").unwrap();
        for (setup, content) in [("Li_sv", "PAW Li_sv\n"), ("O", "PAW O"), ("Li", "PAW Li\n")] {
            std::fs::create_dir(dir.path().join(setup)).unwrap();
            write_file(&dir.path().join(setup), "POTCAR", content);
        }
        dir
    }

    fn preparer(pp: &TempDir, keep_potcar: bool) -> VaspInputPreparer {
        let potcar: BTreeMap<String, String> = [("Li".to_string(), "Li_sv".to_string())].into();
        VaspInputPreparer::new(Some(pp.path().to_path_buf()), potcar, None, keep_potcar)
    }

    #[test]
    fn test_normalize_input() {
        assert_eq!(
            normalize_input("\u{feff}ISTART = 0\r\n\t\t\r\nNSW = 10\r\n"),
            "ISTART = 0\n\nNSW = 10\n"
        );
        assert_eq!(normalize_input("A = 1\n\tB = 2\n"), "A = 1\n\tB = 2\n");
    }

    #[test]
    fn test_poscar_species() {
        assert_eq!(
            poscar_species(POSCAR).unwrap(),
            vec!["Li".to_string(), "O".to_string()]
        );
        assert_eq!(
            poscar_species("x\n1\n1 0 0\n0 1 0\n0 0 1\nFe/3ef2a\n1\n").unwrap(),
            vec!["Fe".to_string()]
        );
        assert!(poscar_species("x\n1\n1 0 0\n0 1 0\n0 0 1\n2 1\n").is_none());
        assert!(poscar_species("x\n").is_none());
    }

    #[test]
    fn test_prepare_directory() {
        let pp = pp_library();
        let dir = TempDir::with_prefix("gorun").unwrap();
        write_file(dir.path(), "POSCAR", "old");
        write_file(dir.path(), "CONTCAR", &POSCAR.replace('\n', "\r\n"));
        write_file(dir.path(), "INCAR", "ISTART = 0\r\n");
        let output = RecordingOutput::default();

        preparer(&pp, false).prepare(dir.path(), &output).unwrap();
        assert_eq!(read(dir.path(), "POSCAR"), POSCAR);
        assert_eq!(read(dir.path(), "INCAR"), "ISTART = 0\n");
        assert_eq!(read(dir.path(), "POTCAR"), "PAW Li_sv\nPAW O\n");
        assert!(!output.statuses().is_empty());
    }

    #[test]
    fn test_keep_potcar() {
        let pp = pp_library();
        let dir = TempDir::with_prefix("gorun").unwrap();
        write_file(dir.path(), "POSCAR", POSCAR);
        write_file(dir.path(), "POTCAR", "custom");
        let output = RecordingOutput::default();

        preparer(&pp, true).prepare(dir.path(), &output).unwrap();
        assert_eq!(read(dir.path(), "POTCAR"), "custom");

        preparer(&pp, false).prepare(dir.path(), &output).unwrap();
        assert_eq!(read(dir.path(), "POTCAR"), "PAW Li_sv\nPAW O\n");
    }

    #[test]
    fn test_potcar_needs_library() {
        let dir = TempDir::with_prefix("gorun").unwrap();
        write_file(dir.path(), "POSCAR", POSCAR);
        let preparer = VaspInputPreparer::new(None, BTreeMap::new(), None, false);
        assert!(matches!(
            preparer.prepare(dir.path(), &RecordingOutput::default()),
            Err(GorunError::MissingEnvironment(_))
        ));
    }

    #[test]
    fn test_stage_vdw_kernel() {
        let kernel_dir = TempDir::with_prefix("gorun-vdw").unwrap();
        write_file(kernel_dir.path(), "kernel", "KERNEL");
        let dir = TempDir::with_prefix("gorun").unwrap();
        write_file(dir.path(), "INCAR", "LUSE_VDW = .TRUE.\n");
        let preparer = VaspInputPreparer::new(
            None,
            BTreeMap::new(),
            Some(kernel_dir.path().join("kernel")),
            false,
        );
        preparer
            .prepare(dir.path(), &RecordingOutput::default())
            .unwrap();
        assert_eq!(read(dir.path(), "vdw_kernel.bindat"), "KERNEL");
    }

    #[test]
    fn test_clean_slurm_logs() {
        let dir = TempDir::with_prefix("gorun").unwrap();
        write_file(dir.path(), "slurm-1.out", "log");
        write_file(dir.path(), "slurm-22.out", "log");
        write_file(dir.path(), "slurm.conf", "keep");
        write_file(dir.path(), "OUTCAR", "keep");
        let output = RecordingOutput::default();

        SlurmLogCleaner.clean(dir.path(), &output).unwrap();
        assert!(!dir.path().join("slurm-1.out").exists());
        assert!(!dir.path().join("slurm-22.out").exists());
        assert!(dir.path().join("slurm.conf").exists());
        assert!(dir.path().join("OUTCAR").exists());
        assert_eq!(output.statuses().len(), 2);
    }
}
