pub mod run;

use secrecy::SecretString;
use std::path::PathBuf;
use std::time::Duration;

#[derive(Debug)]
pub enum Action {
    Run {
        port: u16,
        listen: Option<String>,
        url: SecretString,
        timeout: Duration,
        collectors: Vec<String>,
        queries_dir: Option<PathBuf>,
    },
}
