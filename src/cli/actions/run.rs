use crate::cli::actions::Action;
use crate::exporter::{ExporterOptions, new};
use anyhow::Result;

/// Handle the run action
///
/// # Errors
///
/// Returns an error if the exporter fails to start
pub async fn handle(action: Action) -> Result<()> {
    match action {
        Action::Run {
            port,
            listen,
            url,
            timeout,
            collectors,
            queries_dir,
        } => {
            new(ExporterOptions {
                port,
                listen,
                url,
                timeout,
                collectors,
                queries_dir,
            })
            .await?;
        }
    }

    Ok(())
}
