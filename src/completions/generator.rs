use anyhow::{anyhow, Result};
use clap::Command;
use clap_complete::{generate, shells};
use std::io::Write;
use std::str::FromStr;

/// Shells a completion script can be generated for
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Shell {
    Bash,
    Zsh,
    Fish,
    PowerShell,
}

impl FromStr for Shell {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "bash" => Ok(Shell::Bash),
            "zsh" => Ok(Shell::Zsh),
            "fish" => Ok(Shell::Fish),
            "powershell" | "pwsh" => Ok(Shell::PowerShell),
            _ => Err(anyhow!(
                "Unsupported shell: {s}. Supported shells: bash, zsh, fish, powershell"
            )),
        }
    }
}

/// Write the completion script for `cmd` to `out`.
///
/// ```no_run
/// use clap::Command;
/// use credlock::completions::{generate_completions, Shell};
///
/// let mut cmd = Command::new("credlock");
/// generate_completions(&mut cmd, Shell::Bash, &mut std::io::stdout());
/// ```
pub fn generate_completions(cmd: &mut Command, shell: Shell, out: &mut dyn Write) {
    let bin_name = cmd.get_name().to_string();

    match shell {
        Shell::Bash => generate(shells::Bash, cmd, bin_name, out),
        Shell::Zsh => generate(shells::Zsh, cmd, bin_name, out),
        Shell::Fish => generate(shells::Fish, cmd, bin_name, out),
        Shell::PowerShell => generate(shells::PowerShell, cmd, bin_name, out),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shell_from_str_ignores_case() {
        assert_eq!(Shell::from_str("Bash").unwrap(), Shell::Bash);
        assert_eq!(Shell::from_str("ZSH").unwrap(), Shell::Zsh);
        assert_eq!(Shell::from_str("fish").unwrap(), Shell::Fish);
        assert_eq!(Shell::from_str("pwsh").unwrap(), Shell::PowerShell);
    }

    #[test]
    fn test_shell_from_str_error_message() {
        let err = Shell::from_str("cmd").unwrap_err().to_string();
        assert!(err.contains("Unsupported shell: cmd"));
        assert!(err.contains("bash, zsh, fish, powershell"));
    }

    #[test]
    fn test_generate_mentions_subcommands() {
        let mut cmd = Command::new("credlock").subcommand(Command::new("acquire"));
        let mut out = Vec::new();
        generate_completions(&mut cmd, Shell::Bash, &mut out);

        let script = String::from_utf8(out).unwrap();
        assert!(script.contains("credlock"));
        assert!(script.contains("acquire"));
    }
}
