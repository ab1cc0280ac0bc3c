use std::{sync::Arc, time::Duration};

use actix_web::HttpServer;
use anyhow::Context;
use clap::Parser;
use database::{
    collection::OperationContext,
    database::{database::Database, options::DatabaseOptions},
};
use people_api::{
    clients::server::{build_app, ApiState},
    config::Cli,
    middleware::metrics::RequestMetrics,
};
use tokio::sync::watch;

const DATABASE_SHUTDOWN_TIMEOUT: Duration = Duration::from_secs(5);

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    env_logger::init_from_env(env_logger::Env::new().default_filter_or("info"));

    let args = Cli::parse();

    let database_options = DatabaseOptions::default().set_batch_size(args.cursor_batch_size);

    let request_manager = Database::new(database_options)
        .run()
        .context("Failed to start the database")?;

    // Set up Ctrl-C handler, in flight store operations are cancelled, actix drains the server
    let (shutdown_sender, shutdown_receiver) = watch::channel(false);

    ctrlc::set_handler(move || {
        log::info!("Received Ctrl-C, cancelling in flight operations");
        shutdown_sender.send_replace(true);
    })
    .context("Error setting Ctrl-C handler")?;

    let state = ApiState::new(Arc::new(request_manager.clone()))
        .set_read_timeout(args.read_timeout())
        .set_write_timeout(args.write_timeout())
        .set_shutdown(shutdown_receiver)
        .set_metrics(RequestMetrics::new(&args.metrics_endpoint))
        .set_log_http(args.log_http);

    log::info!(
        "Starting HTTP server on http://{}:{} [Metrics: {}]",
        args.address,
        args.port,
        args.metrics_endpoint
    );

    HttpServer::new(move || build_app(state.clone()))
        .workers(args.http_workers)
        .client_request_timeout(args.client_request_timeout())
        .client_disconnect_timeout(args.client_disconnect_timeout())
        .keep_alive(args.keep_alive())
        .bind((args.address.clone(), args.port))?
        .run()
        .await?;

    let ctx = OperationContext::with_timeout(DATABASE_SHUTDOWN_TIMEOUT);

    match request_manager.send_shutdown_request(&ctx).await {
        Ok(status) => log::info!("{}", status),
        Err(err) => log::error!("Error shutting down the database: {}", err),
    }

    Ok(())
}
