use std::sync::Arc;

use anyhow::Context;
use burnbox::{
    config::MailerConfig,
    logging,
    shutdown::shutdown_signal,
    worker::{MailService, MailerWorker, MailgunProvider, TemplateRenderer},
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = MailerConfig::from_env().context("failed to load mailer configuration")?;
    logging::init_tracing(config.log_format);

    let client = async_nats::connect(&config.nats_url)
        .await
        .context("failed to connect to NATS")?;
    tracing::info!(url = %config.nats_url, "connected to NATS");

    let provider = MailgunProvider::new(&config).context("failed to build Mailgun client")?;
    let service = MailService::new(
        Arc::new(provider),
        TemplateRenderer::new(config.app_url.clone(), config.frontend_url.clone()),
    );

    MailerWorker::new(client, service)
        .run(shutdown_signal())
        .await
        .context("mailer stopped with error")?;

    Ok(())
}
