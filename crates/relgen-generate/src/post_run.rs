use std::path::Path;
use std::process::Command;

use relgen_core::expand_env;

use crate::errors::GenerationError;

/// Name of the variable carrying the written file's path.
pub const FILE_VAR: &str = "RELGEN_FILE";

/// Expand `argv` for `path`: `$RELGEN_FILE` is the written file, other
/// variables come from the process environment.
pub fn expand_args(argv: &[String], path: &Path) -> Vec<String> {
    let file = path.display().to_string();
    argv.iter()
        .map(|arg| {
            expand_env(arg, |name| {
                if name == FILE_VAR {
                    Some(file.clone())
                } else {
                    std::env::var(name).ok()
                }
            })
        })
        .collect()
}

/// Run the post-run command for `path` and wait for it.
pub fn run(argv: &[String], path: &Path) -> Result<(), GenerationError> {
    let args = expand_args(argv, path);
    let Some((program, rest)) = args.split_first() else {
        return Ok(());
    };

    let output = Command::new(program)
        .args(rest)
        .env(FILE_VAR, path)
        .output()
        .map_err(|err| GenerationError::PostRun {
            path: path.to_path_buf(),
            message: format!("failed to start {program}: {err}"),
        })?;

    if output.status.success() {
        return Ok(());
    }

    let stderr = String::from_utf8_lossy(&output.stderr);
    Err(GenerationError::PostRun {
        path: path.to_path_buf(),
        message: format!("{program} exited with {}: {}", output.status, stderr.trim()),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn file_variable_expands_to_written_path() {
        let args = expand_args(
            &["fmt".to_string(), "--file=${RELGEN_FILE}".to_string(), "$RELGEN_FILE".to_string()],
            Path::new("out/users.rs"),
        );
        assert_eq!(args, vec!["fmt", "--file=out/users.rs", "out/users.rs"]);
    }

    #[test]
    fn empty_command_is_a_no_op() {
        run(&[], Path::new("out/users.rs")).unwrap();
    }

    #[test]
    fn missing_program_is_reported() {
        let err = run(
            &["relgen-definitely-missing-program".to_string()],
            Path::new("x.rs"),
        )
        .unwrap_err();
        assert!(matches!(err, GenerationError::PostRun { .. }));
    }
}
