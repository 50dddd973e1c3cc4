//! completions command - Print a shell completion script for anypath

use clap::CommandFactory;
use clap_complete::Shell;

use super::Cli;
use crate::exit_code::ExitCode;

const BIN_NAME: &str = "anypath";

/// Arguments for the completions command
#[derive(clap::Args, Debug)]
pub struct CompletionsArgs {
    /// Shell to generate completions for
    #[arg(value_enum)]
    pub shell: Shell,
}

/// Print the completion script; needs no configuration or backends
pub fn execute(args: CompletionsArgs) -> ExitCode {
    print!("{}", render(args.shell));
    ExitCode::Success
}

fn render(shell: Shell) -> String {
    let mut buf = Vec::new();
    clap_complete::generate(shell, &mut Cli::command(), BIN_NAME, &mut buf);
    String::from_utf8_lossy(&buf).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_bash_script_covers_commands() {
        let script = render(Shell::Bash);
        assert!(script.contains("complete"));
        for name in ["copy", "exists", "listdir", "remove"] {
            assert!(script.contains(name), "missing {name}");
        }
    }

    #[test]
    fn test_zsh_script_registers_binary() {
        let script = render(Shell::Zsh);
        assert!(script.contains(&format!("#compdef {BIN_NAME}")));
    }

    #[test]
    fn test_copy_flags_are_completed() {
        let script = render(Shell::Fish);
        assert!(script.contains("no-force"));
        assert!(script.contains("strict"));
    }

    #[test]
    fn test_powershell_script() {
        let script = render(Shell::PowerShell);
        assert!(script.contains("Register-ArgumentCompleter"));
        assert!(script.contains(BIN_NAME));
    }
}
