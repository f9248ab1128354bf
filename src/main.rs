use std::{path::PathBuf, process::ExitCode};

use ::tracing::{error, info_span};
use clap::Parser;
use pipelines::InvocationResponse;
use serde_json::Value;
use service::{PipelineKind, Service};

mod config;
mod keys;
mod pipelines;
mod retention;
mod service;
mod tracing;
use crate::tracing::setup_tracing;
mod weather_client;

#[cfg(test)]
mod testing;

#[derive(Parser)]
#[command(version, about, long_about = None)]
struct Cli {
    #[arg(short, long, value_name = "config file", help = "Path to config file")]
    config: Option<PathBuf>,

    #[arg(
        short,
        long,
        value_name = "json",
        default_value = "{}",
        help = "Trigger event passed to the pipeline"
    )]
    event: String,

    #[command(subcommand)]
    pipeline: PipelineKind,
}

fn emit(response: &InvocationResponse) -> ExitCode {
    match serde_json::to_string(response) {
        Ok(out) => println!("{}", out),
        Err(e) => error!("Error encoding response: {:?}", e),
    }
    if response.is_success() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();
    let config = match &cli.config {
        Some(path) => config::PipelineConfig::from_path(&path.to_string_lossy()),
        None => Ok(config::PipelineConfig::default()),
    };
    let config = match config {
        Ok(config) => config,
        Err(e) => {
            eprintln!("Error loading config: {:#}", e);
            let response = InvocationResponse::internal_error(
                format!("{:#}", e),
                cli.pipeline.failure_message(),
            );
            return emit(&response);
        }
    };

    let tracing_provider = match setup_tracing(&config) {
        Ok(provider) => provider,
        Err(e) => {
            eprintln!("Error setting up tracing: {:?}", e);
            None
        }
    };

    let root_span = info_span!("weather-pipeline", pipeline = ?cli.pipeline);
    let _guard = root_span.enter();

    // The event is opaque; anything that isn't JSON is passed on as a string.
    let event = serde_json::from_str::<Value>(&cli.event).unwrap_or(Value::String(cli.event));

    let response = match Service::new(config) {
        Ok(service) => service.handle(cli.pipeline, &event).await,
        Err(e) => {
            error!("Error creating service: {:?}", e);
            InvocationResponse::internal_error(format!("{:#}", e), cli.pipeline.failure_message())
        }
    };

    // export traces before shutdown
    if let Some(tracer_provider) = tracing_provider {
        if let Err(err) = tracer_provider.force_flush() {
            error!("Error flushing traces: {:?}", err);
        }
        if let Err(err) = tracer_provider.shutdown() {
            error!("Error shutting down tracer provider: {:?}", err);
        }
    }

    emit(&response)
}
