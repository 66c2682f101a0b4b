use std::sync::Arc;

use anyhow::{Context, Result};
use tracing_subscriber::EnvFilter;

use pair_classifier_deploy::classifier::{Device, PairClassifier};
use pair_classifier_deploy::error::Error;
use pair_classifier_deploy::{args, web};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::from_default_env().add_directive("pair_classifier_deploy=info".parse()?),
        )
        .init();

    let args = match args::resolve(std::env::args_os()) {
        Ok(args) => args,
        Err(Error::Cli(err)) => err.exit(),
        Err(err) => return Err(err).context("cannot resolve deploy arguments"),
    };
    tracing::info!(
        pretrained_model_name = %args.pretrained_model_name,
        checkpoint = %args.downstream_model_checkpoint_path.display(),
        task = args.downstream_task_name.as_deref().unwrap_or("-"),
        max_seq_length = args.max_seq_length,
        "resolved deploy arguments"
    );

    let classifier = PairClassifier::load(&args, Device::Cpu).with_context(|| {
        format!(
            "cannot load checkpoint {}",
            args.downstream_model_checkpoint_path.display()
        )
    })?;
    tracing::info!("model ready");

    let router = web::app(Arc::new(classifier), args.mode);
    web::serve(router, args.bind_address)
        .await
        .context("web demo stopped")?;
    Ok(())
}
