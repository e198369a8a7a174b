use clap::Parser;
use engine::{EventSink, Scheduler, TracingSink};
use procfd::{
    cli::Cli,
    signals::{SignalEvent, wait_for_signal},
    sink::StdoutSink,
};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

#[cfg(feature = "jemalloc")]
#[global_allocator]
static GLOBAL: tikv_jemallocator::Jemalloc = tikv_jemallocator::Jemalloc;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // NOTE: The verbosity flag takes precedence over the environment variable
    // for log control. `PROCFD_LOG` can only tune the level per crate, e.g.
    // `PROCFD_LOG=engine=trace procfd -v` traces the engine and logs
    // everything else at the info level.
    let env_filter = EnvFilter::builder()
        .with_env_var("PROCFD_LOG")
        .from_env()?
        .add_directive(cli.verbosity.log_level_filter().as_str().parse()?);

    // stdout carries the events, logs go to stderr.
    let layer = tracing_subscriber::fmt::layer()
        .with_writer(std::io::stderr)
        .with_level(true)
        .with_file(false)
        .with_line_number(false);

    tracing_subscriber::registry()
        .with(layer)
        .with(env_filter)
        .init();

    let config = cli.load_config()?;
    debug!(?config, ?cli);

    let sink: Box<dyn EventSink> = if cli.dry_run {
        Box::new(TracingSink)
    } else {
        Box::new(StdoutSink)
    };

    let mut scheduler = Scheduler::from_config(&config)?;
    if scheduler.checks().is_empty() {
        warn!("no instances configured");
    }

    if cli.once {
        scheduler.run_once(sink.as_ref()).await;
        return Ok(());
    }

    let (signals_tx, mut signals_rx) = mpsc::unbounded_channel();
    let mut signal_handle = tokio::spawn(wait_for_signal(signals_tx));

    loop {
        let round = CancellationToken::new();
        let event = {
            let run = scheduler.run_until(round.clone(), sink.as_ref());
            tokio::pin!(run);

            tokio::select! {
                _ = &mut run => None,

                // bubble up any errors from the signal handlers
                res = &mut signal_handle => {
                    res??;
                    None
                }

                Some(event) = signals_rx.recv() => {
                    round.cancel();
                    run.await;
                    Some(event)
                }
            }
        };

        match event {
            None => break,
            Some(SignalEvent::Shutdown) => {
                info!("shutdown requested");
                break;
            }
            Some(SignalEvent::Reload) => {
                match cli
                    .load_config()
                    .and_then(|config| Ok(Scheduler::from_config(&config)?))
                {
                    Ok(next) => {
                        scheduler = next;
                        info!(checks = scheduler.checks().len(), "config reloaded");
                    }
                    Err(err) => warn!(%err, "config reload failed, keeping current config"),
                }
            }
        }
    }

    Ok(())
}
