use std::fmt::Write;

use crate::queue::request::ResourceRequest;

/// File name under which the chosen script is stored in the working directory.
pub const SCRIPT_NAME: &str = "sub";

/// Builds a batch script: shebang, one `#SBATCH --<key>="<value>"` line per
/// directive, then the body.
pub fn build_batch_script(shebang: &str, request: &ResourceRequest, body: &str) -> String {
    let mut script = format!("{}\n", shebang.trim_end());
    for (key, value) in request.iter() {
        writeln!(script, "#SBATCH --{key}=\"{}\"", value.replace('"', "\\\"")).unwrap();
    }
    push_body(&mut script, body);
    script
}

/// Builds a script for running directly in the current shell session, without directives.
pub fn build_local_script(shebang: &str, body: &str) -> String {
    let mut script = format!("{}\n", shebang.trim_end());
    push_body(&mut script, body);
    script
}

fn push_body(script: &mut String, body: &str) {
    script.push_str(body);
    if !script.ends_with('\n') {
        script.push('\n');
    }
}
