use camino::Utf8PathBuf;
use miette::Diagnostic;
use thiserror::Error;

fn display_paths(paths: &[Utf8PathBuf]) -> String {
    paths
        .iter()
        .map(|p| p.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

#[derive(Error, Debug, Diagnostic)]
pub enum CliError {
    #[error("Configuration file not found (looked in: {})", display_paths(.searched))]
    #[diagnostic(
        code(config::not_found),
        help(
            "Create {file_name} in the current directory or next to the executable, or pass --config <path>. It needs:\n\n\
             install_dir = \"~/Documents/My Games/FarmingSimulator2017/mods\"\n\
             game_dir = \"C:/Program Files (x86)/Farming Simulator 2017\"\n\
             vault_dir = \"../Mods\"\n\
             output_file = \"_FS17_Mod_List.html\""
        )
    )]
    ConfigNotFound {
        file_name: String,
        searched: Vec<Utf8PathBuf>,
    },

    #[error("Failed to read configuration file: {path}")]
    #[diagnostic(code(config::read_failed))]
    ConfigReadFailed {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Configuration file error: {path}")]
    #[diagnostic(
        code(config::parse_error),
        help("install_dir, game_dir, vault_dir and output_file are all required")
    )]
    ConfigParseError {
        path: Utf8PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Mod vault directory not found: {path}")]
    #[diagnostic(
        code(vault::not_found),
        help("Check vault_dir in your configuration; relative paths are resolved against the configuration file's directory")
    )]
    VaultMissing { path: Utf8PathBuf },

    #[error("Failed to write mod list: {path}")]
    #[diagnostic(
        code(output::write_failed),
        help("Check file permissions and available disk space in the vault directory")
    )]
    OutputWriteFailed {
        path: Utf8PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Mod list generation failed")]
    #[diagnostic(code(catalog::failed))]
    Catalog {
        #[source]
        source: fsm_catalog::Error,
    },
}

impl CliError {
    pub fn config_not_found(file_name: impl Into<String>, searched: Vec<Utf8PathBuf>) -> Self {
        Self::ConfigNotFound {
            file_name: file_name.into(),
            searched,
        }
    }

    pub fn config_read_failed(path: Utf8PathBuf, source: std::io::Error) -> Self {
        Self::ConfigReadFailed { path, source }
    }

    pub fn config_parse_error(path: Utf8PathBuf, source: toml::de::Error) -> Self {
        Self::ConfigParseError { path, source }
    }
}

impl From<fsm_catalog::Error> for CliError {
    fn from(error: fsm_catalog::Error) -> Self {
        match error {
            fsm_catalog::Error::VaultMissing(path) => Self::VaultMissing { path },
            fsm_catalog::Error::OutputWrite { path, source } => {
                Self::OutputWriteFailed { path, source }
            }
            source => Self::Catalog { source },
        }
    }
}
