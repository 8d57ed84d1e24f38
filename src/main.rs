mod auction;
mod config;
mod event;
mod event_log;
mod service;
mod snapshot;
mod view;

use anyhow::Result;
use clap::Parser;
use tracing::info;
use tracing_subscriber::EnvFilter;

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let opts = config::Opts::parse();

    let view = match &opts.team {
        Some(team) => view::AuctionViewState::new_manager(team.clone(), opts.access_token.clone()),
        None => view::AuctionViewState::new_presenter(),
    }
    .into_shared();

    let (event_writer, event_reader) = event_log::new_in_memory_shared();
    let refresh = service::RefreshSignal::new_shared();
    let snapshot_source = snapshot::FileSnapshotSource::new_shared(&opts.snapshot);
    let server_link = service::ReplayServerLink::open(&opts.events, opts.pace())?.into_shared();

    let svc_ctr = service::ServiceControl::new();

    ctrlc::set_handler({
        let svc_ctr = svc_ctr.clone();
        move || {
            eprintln!("Stopping all services...");
            svc_ctr.stop_all();
        }
    })?;

    info!(team = ?opts.team, events = %opts.events.display(), "starting");

    for handle in vec![
        svc_ctr.spawn_log_follower(
            service::ViewSync::new(view.clone(), refresh.clone(), event_writer.clone()),
            event_reader.clone(),
        ),
        svc_ctr.spawn_loop(service::SnapshotFetcher::new(
            view.clone(),
            snapshot_source,
            refresh,
        )),
        svc_ctr.spawn_loop(service::ServerReceiver::new(
            event_writer.clone(),
            server_link.clone(),
        )),
        svc_ctr.spawn_log_follower(service::ServerSender::new(server_link), event_reader),
        svc_ctr.spawn_loop(service::Ui::new(opts.listen, view, event_writer)?),
    ] {
        handle.join()?
    }

    Ok(())
}

#[cfg(test)]
mod tests;
