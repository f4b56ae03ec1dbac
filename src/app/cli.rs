#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CliVerb {
    Compile,
    Help,
    Unknown,
}

pub fn parse_cli_verb(input: &str) -> CliVerb {
    match input {
        "compile" => CliVerb::Compile,
        "help" | "--help" | "-h" => CliVerb::Help,
        _ => CliVerb::Unknown,
    }
}

pub fn cli_help_lines() -> Vec<String> {
    vec![
        "Commands:".to_string(),
        "  compile <file> [options]             Compile a workflow into its lock file".to_string(),
        "  help                                 Show this help".to_string(),
        String::new(),
        "Compile options:".to_string(),
        "  --release <version>                  Reference the published setup action at <version>"
            .to_string(),
        "  --workflows-dir <dir>                Directory used to resolve dispatch-workflow targets"
            .to_string(),
        "  --output <path>                      Write the lock file to <path> (`-` for stdout)"
            .to_string(),
    ]
}

pub(crate) fn help_text() -> String {
    cli_help_lines().join("\n")
}
