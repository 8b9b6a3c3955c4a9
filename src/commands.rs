use std::io::{self, IsTerminal};

use anyhow::{Context, Result};

use crate::{
    config::{AppConfig, Command},
    filter::{FileFilter, FilterExpr},
    flatten::{flatten_torrents, NameStyle},
    model::{Priority, TorrentFiles},
    rpc::TransmissionClient,
    table::{print_table, Cells},
};

/// Runs a CLI command. `Ok(false)` means nothing matched and the process
/// should exit with a failure status.
pub fn run(config: &AppConfig, command: Command) -> Result<bool> {
    let client = TransmissionClient::new(config.rpc.clone())
        .context("failed to construct Transmission RPC client")?;
    match command {
        Command::Ls { filter, torrents } => {
            list_files(&client, config, filter.as_deref(), torrents.as_deref())
        }
        Command::Priority {
            level,
            filter,
            torrents,
        } => set_priority(&client, level, filter.as_deref(), torrents.as_deref()),
    }
}

fn list_files(
    client: &TransmissionClient,
    config: &AppConfig,
    filter: Option<&str>,
    torrent_filter: Option<&str>,
) -> Result<bool> {
    let filter = FilterExpr::parse_optional(filter).context("invalid file filter")?;
    let torrents = fetch_torrents(client, torrent_filter)?;
    if torrents.is_empty() {
        log::error!("{}", no_torrents_message(torrent_filter));
        return Ok(false);
    }

    let width = terminal_width();
    let flat = flatten_torrents(&torrents, as_filter(&filter), NameStyle::for_width(width))?;
    if flat.rows.is_empty() {
        log::error!("{}", no_files_message(torrent_filter, filter.as_ref()));
        return Ok(false);
    }

    let mut cells = Cells::new();
    let mut out = io::stdout().lock();
    match print_table(&mut out, &flat.rows, &config.columns, width, &mut cells) {
        Ok(()) => Ok(true),
        // Reader went away, e.g. piped into `head`.
        Err(err) if err.kind() == io::ErrorKind::BrokenPipe => Ok(true),
        Err(err) => Err(err).context("failed to write file list"),
    }
}

fn set_priority(
    client: &TransmissionClient,
    level: Priority,
    filter: Option<&str>,
    torrent_filter: Option<&str>,
) -> Result<bool> {
    let filter = FilterExpr::parse_optional(filter).context("invalid file filter")?;
    let torrents = fetch_torrents(client, torrent_filter)?;
    if torrents.is_empty() {
        log::error!("{}", no_torrents_message(torrent_filter));
        return Ok(false);
    }

    let targets = priority_targets(&torrents, as_filter(&filter));
    if targets.is_empty() {
        log::error!("{}", no_files_message(torrent_filter, filter.as_ref()));
        return Ok(false);
    }
    for (torrent, indices) in targets {
        client
            .set_file_priority(torrent.torrent_id, &indices, level)
            .with_context(|| format!("failed to change priority in {}", torrent.name))?;
        log::info!(
            "{}: priority of {} file(s) set to {}",
            torrent.name,
            indices.len(),
            level
        );
    }
    Ok(true)
}

fn fetch_torrents(
    client: &TransmissionClient,
    torrent_filter: Option<&str>,
) -> Result<Vec<TorrentFiles>> {
    let torrents = client
        .fetch_torrent_files()
        .context("failed to fetch torrent files")?;
    Ok(select_torrents(torrents, torrent_filter))
}

fn as_filter(filter: &Option<FilterExpr>) -> Option<&dyn FileFilter> {
    filter.as_ref().map(|expr| expr as &dyn FileFilter)
}

fn select_torrents(torrents: Vec<TorrentFiles>, name_filter: Option<&str>) -> Vec<TorrentFiles> {
    let needle = match name_filter.map(str::trim) {
        None | Some("all") => String::new(),
        Some(text) => text.to_lowercase(),
    };
    torrents
        .into_iter()
        .filter(|torrent| torrent.matches_name(&needle))
        .collect()
}

fn priority_targets<'a>(
    torrents: &'a [TorrentFiles],
    filter: Option<&dyn FileFilter>,
) -> Vec<(&'a TorrentFiles, Vec<usize>)> {
    torrents
        .iter()
        .map(|torrent| {
            let indices = torrent
                .files
                .iter()
                .filter(|file| filter.map_or(true, |f| f.matches(file)))
                .map(|file| file.index)
                .collect::<Vec<_>>();
            (torrent, indices)
        })
        .filter(|(_, indices)| !indices.is_empty())
        .collect()
}

fn terminal_width() -> Option<usize> {
    if !io::stdout().is_terminal() {
        return None;
    }
    crossterm::terminal::size()
        .ok()
        .map(|(columns, _)| columns as usize)
        .filter(|columns| *columns > 0)
}

fn no_torrents_message(torrent_filter: Option<&str>) -> String {
    match torrent_filter {
        Some(name) => format!("No matching torrents: {name}"),
        None => "No torrents".to_string(),
    }
}

fn no_files_message(torrent_filter: Option<&str>, filter: Option<&FilterExpr>) -> String {
    let filter = filter.map_or_else(|| "all".to_string(), |expr| expr.to_string());
    match torrent_filter {
        Some(name) if name.trim() != "all" => {
            format!("No matching files in {name} torrents: {filter}")
        }
        _ => format!("No matching files: {filter}"),
    }
}
