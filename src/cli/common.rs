//! Wiring of concrete components from the configuration.

use anyhow::Result;
use std::sync::Arc;

use crate::config::{ToolPaths, UpdaterConfig};
use crate::feed::FeedClient;
use crate::install::{Hdiutil, HttpFetcher, InstallTools, InstallTransaction, Pgrep};
use crate::notify::{CommandNotifier, LogNotifier, Messages, Notifier};
use crate::probe::BundleProbe;
use crate::workflow::UpdateWorkflow;

/// Build a workflow for one run.
///
/// Tool locations are resolved by the caller and only passed down here.
pub fn build_workflow(
    config: &UpdaterConfig,
    tools: &ToolPaths,
    run_id: &str,
) -> Result<UpdateWorkflow> {
    let notifier: Arc<dyn Notifier> = if config.notify.enabled {
        Arc::new(CommandNotifier::from_tools(tools))
    } else {
        Arc::new(LogNotifier)
    };
    let messages = Messages::new(config.notification_title(), config.app.name.clone());

    let install_tools = InstallTools {
        fetcher: Arc::new(HttpFetcher::new(config.download_timeout())?),
        disk_image: Arc::new(Hdiutil::new(tools.hdiutil.clone())),
        processes: Arc::new(Pgrep::new(tools.pgrep.clone())),
    };
    let transaction = InstallTransaction::new(
        config.install_settings(),
        config.run_paths(run_id)?,
        install_tools,
        notifier.clone(),
        messages.clone(),
    );

    Ok(UpdateWorkflow::new(
        Arc::new(BundleProbe::new(config.bundle_path(), config.app.version_key.clone())),
        Arc::new(FeedClient::new(config.feed.url.clone(), config.feed_timeout())?),
        notifier,
        transaction,
        messages,
    ))
}
