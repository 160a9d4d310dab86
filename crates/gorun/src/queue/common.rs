use bstr::ByteSlice;
use std::path::Path;
use std::process::Output;
use tokio::process::Command;

pub fn create_command(arguments: Vec<&str>, workdir: &Path) -> Command {
    let mut command = Command::new(arguments[0]);
    command.args(&arguments[1..]);
    command.current_dir(workdir);
    command
}

pub fn check_command_output(output: Output) -> anyhow::Result<Output> {
    let status = output.status;
    if !status.success() {
        return Err(anyhow::anyhow!(
            "Exit code: {}\nStderr: {}\nStdout: {}",
            status.code().unwrap_or(-1),
            output.stderr.to_str_lossy().trim(),
            output.stdout.to_str_lossy().trim()
        ));
    }
    Ok(output)
}

/// Stdout followed by stderr, as a single text.
pub fn combined_output(output: &Output) -> String {
    let mut text = output.stdout.to_str_lossy().into_owned();
    let stderr = output.stderr.to_str_lossy();
    if !stderr.is_empty() {
        if !text.is_empty() && !text.ends_with('\n') {
            text.push('\n');
        }
        text.push_str(&stderr);
    }
    text
}

/// Parses the job id from `Submitted batch job <id>`.
pub fn parse_submitted_job_id(output: &str) -> anyhow::Result<String> {
    output
        .lines()
        .map(|l| l.trim())
        .find(|l| l.to_lowercase().starts_with("submitted batch job"))
        .and_then(|l| l.split(' ').nth(3))
        .map(|l| l.to_string())
        .ok_or_else(|| anyhow::anyhow!("Missing job id in sbatch output\n{output}"))
}

#[cfg(test)]
mod tests {
    use super::{combined_output, parse_submitted_job_id};
    use std::os::unix::process::ExitStatusExt;
    use std::process::{ExitStatus, Output};

    #[test]
    fn test_parse_job_id() {
        assert_eq!(
            parse_submitted_job_id("Submitted batch job 4641914\n").unwrap(),
            "4641914"
        );
        assert!(parse_submitted_job_id("sbatch: error: nope").is_err());
    }

    #[test]
    fn test_combined_output() {
        let output = Output {
            status: ExitStatus::from_raw(0),
            stdout: b"out".to_vec(),
            stderr: b"err\n".to_vec(),
        };
        assert_eq!(combined_output(&output), "out\nerr\n");
    }
}
