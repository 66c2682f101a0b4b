//! Deploy configuration and the command-line shapes that produce it.
//!
//! The binary accepts three invocation shapes and exactly one of them is
//! used, with no merging between them:
//!
//! * no arguments: [`DeployArguments::default`]
//! * a single `*.json` argument: the whole configuration read from that file
//! * anything else: named flags such as `--max_seq_length 128`

use std::ffi::OsString;
use std::fs::File;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};

use clap::{Parser, ValueEnum};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};

/// How the demo server is exposed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum DeployMode {
    /// Served to a browser on the same machine; CORS is opened up.
    #[default]
    Local,
    /// Served as-is on the configured address.
    Public,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct DeployArguments {
    pub pretrained_model_name: String,
    pub downstream_model_checkpoint_path: PathBuf,
    pub downstream_task_name: Option<String>,
    pub max_seq_length: usize,
    pub bind_address: SocketAddr,
    pub mode: DeployMode,
}

impl Default for DeployArguments {
    fn default() -> Self {
        Self {
            pretrained_model_name: "beomi/kcbert-base".to_string(),
            downstream_model_checkpoint_path: PathBuf::from("checkpoint/paircls/epoch=0.ckpt"),
            downstream_task_name: None,
            max_seq_length: 128,
            bind_address: SocketAddr::from(([127, 0, 0, 1], 5000)),
            mode: DeployMode::Local,
        }
    }
}

impl DeployArguments {
    /// Reads a complete configuration from a JSON file. Fields left out of
    /// the file keep their defaults; unknown fields are rejected.
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let reader = File::open(path.as_ref())?;
        let args: Self = serde_json::from_reader(reader)?;
        args.validate()
    }

    fn validate(self) -> Result<Self> {
        if self.max_seq_length == 0 {
            return Err(Error::InvalidConfig(
                "max_seq_length must be greater than 0".to_string(),
            ));
        }
        if self.pretrained_model_name.is_empty() {
            return Err(Error::InvalidConfig(
                "pretrained_model_name must not be empty".to_string(),
            ));
        }
        Ok(self)
    }
}

/// Flag form of [`DeployArguments`]. Flags that are not given fall back to
/// the defaults.
#[derive(Debug, Parser)]
#[command(
    name = "pair-classifier-deploy",
    version,
    about = "Serve a fine-tuned sentence-pair classifier behind a small web demo."
)]
struct DeployFlags {
    /// Hugging Face model id or local directory holding config.json and the vocabulary.
    #[arg(long = "pretrained_model_name")]
    pretrained_model_name: Option<String>,

    /// Fine-tuned checkpoint (.ckpt, .pt, .pth or .safetensors).
    #[arg(long = "downstream_model_checkpoint_path")]
    downstream_model_checkpoint_path: Option<PathBuf>,

    /// Name of the downstream task the checkpoint was trained on.
    #[arg(long = "downstream_task_name")]
    downstream_task_name: Option<String>,

    /// Fixed token length every premise/hypothesis pair is padded or truncated to.
    #[arg(long = "max_seq_length")]
    max_seq_length: Option<usize>,

    /// Address the web demo listens on.
    #[arg(long = "bind_address")]
    bind_address: Option<SocketAddr>,

    #[arg(long = "mode", value_enum)]
    mode: Option<DeployMode>,
}

impl From<DeployFlags> for DeployArguments {
    fn from(flags: DeployFlags) -> Self {
        let defaults = DeployArguments::default();
        Self {
            pretrained_model_name: flags
                .pretrained_model_name
                .unwrap_or(defaults.pretrained_model_name),
            downstream_model_checkpoint_path: flags
                .downstream_model_checkpoint_path
                .unwrap_or(defaults.downstream_model_checkpoint_path),
            downstream_task_name: flags.downstream_task_name.or(defaults.downstream_task_name),
            max_seq_length: flags.max_seq_length.unwrap_or(defaults.max_seq_length),
            bind_address: flags.bind_address.unwrap_or(defaults.bind_address),
            mode: flags.mode.unwrap_or(defaults.mode),
        }
    }
}

/// Picks the configuration source from the shape of `argv` (program name
/// included) and loads it.
pub fn resolve<I, T>(argv: I) -> Result<DeployArguments>
where
    I: IntoIterator<Item = T>,
    T: Into<OsString>,
{
    let argv: Vec<OsString> = argv.into_iter().map(Into::into).collect();
    if argv.len() <= 1 {
        return Ok(DeployArguments::default());
    }
    if argv.len() == 2 && is_json_path(&argv[1]) {
        return DeployArguments::from_json_file(&argv[1]);
    }
    let flags = DeployFlags::try_parse_from(argv)?;
    DeployArguments::from(flags).validate()
}

fn is_json_path(arg: &OsString) -> bool {
    arg.to_str().is_some_and(|s| s.ends_with(".json"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn json_file(content: &str) -> NamedTempFile {
        let mut file = tempfile::Builder::new()
            .suffix(".json")
            .tempfile()
            .unwrap_or_else(|e| panic!("create temp file: {e}"));
        write!(file, "{content}").unwrap_or_else(|e| panic!("write config: {e}"));
        file
    }

    #[rstest]
    fn no_arguments_use_defaults() {
        let args = resolve(["deploy"]).unwrap();
        assert_eq!(args, DeployArguments::default());
        assert_eq!(args.pretrained_model_name, "beomi/kcbert-base");
        assert_eq!(args.max_seq_length, 128);
    }

    #[rstest]
    fn single_json_argument_loads_file() {
        let file = json_file(
            r#"{
                "pretrained_model_name": "models/kcbert",
                "downstream_model_checkpoint_path": "ckpt/epoch=3.ckpt",
                "max_seq_length": 64
            }"#,
        );
        let path = file.path().to_str().unwrap().to_string();

        let args = resolve(["deploy", path.as_str()]).unwrap();
        assert_eq!(args.pretrained_model_name, "models/kcbert");
        assert_eq!(
            args.downstream_model_checkpoint_path,
            PathBuf::from("ckpt/epoch=3.ckpt")
        );
        assert_eq!(args.max_seq_length, 64);
        assert_eq!(args.mode, DeployMode::Local);
    }

    #[rstest]
    #[case(r#"{"max_seq_length": 64, "learning_rate": 0.1}"#)]
    #[case(r#"{"max_seq_length": "long"}"#)]
    #[case(r#"{"max_seq_length": 0}"#)]
    #[case("not json")]
    fn malformed_json_fails(#[case] content: &str) {
        let file = json_file(content);
        let path = file.path().to_str().unwrap().to_string();
        assert!(resolve(["deploy", path.as_str()]).is_err());
    }

    #[rstest]
    fn shipped_deploy_config_matches_defaults() {
        let path = concat!(env!("CARGO_MANIFEST_DIR"), "/deploy_config.json");
        let args = resolve(["deploy", path]).unwrap();
        assert_eq!(
            args,
            DeployArguments {
                downstream_task_name: Some("pair-classification".to_string()),
                ..DeployArguments::default()
            }
        );
    }

    #[rstest]
    fn missing_json_file_fails() {
        let err = resolve(["deploy", "/nonexistent/deploy_config.json"]).unwrap_err();
        assert!(matches!(err, Error::IOError(_)));
    }

    #[rstest]
    fn flags_override_defaults() {
        let args = resolve([
            "deploy",
            "--pretrained_model_name",
            "beomi/kcbert-large",
            "--downstream_model_checkpoint_path",
            "checkpoint/paircls/epoch=10.ckpt",
            "--downstream_task_name",
            "pair-classification",
            "--max_seq_length",
            "256",
        ])
        .unwrap();
        assert_eq!(args.pretrained_model_name, "beomi/kcbert-large");
        assert_eq!(
            args.downstream_model_checkpoint_path,
            PathBuf::from("checkpoint/paircls/epoch=10.ckpt")
        );
        assert_eq!(args.downstream_task_name.as_deref(), Some("pair-classification"));
        assert_eq!(args.max_seq_length, 256);
        assert_eq!(args.bind_address, DeployArguments::default().bind_address);
    }

    #[rstest]
    fn partial_flags_keep_remaining_defaults() {
        let args = resolve(["deploy", "--max_seq_length", "32", "--mode", "public"]).unwrap();
        assert_eq!(args.max_seq_length, 32);
        assert_eq!(args.mode, DeployMode::Public);
        assert_eq!(args.pretrained_model_name, "beomi/kcbert-base");
    }

    #[rstest]
    #[case(&["deploy", "--max_seq_length", "many"])]
    #[case(&["deploy", "--max_seq_length", "0"])]
    #[case(&["deploy", "--unknown_flag", "1"])]
    #[case(&["deploy", "config.yaml"])]
    #[case(&["deploy", "a.json", "b.json"])]
    fn bad_flags_fail(#[case] argv: &[&str]) {
        assert!(resolve(argv.iter().copied()).is_err());
    }

    #[rstest]
    fn clap_rejection_is_reported_as_cli_error() {
        let err = resolve(["deploy", "--max_seq_length", "many"]).unwrap_err();
        assert!(matches!(err, Error::Cli(_)));
    }
}
