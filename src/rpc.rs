use std::sync::{
    atomic::{AtomicU64, Ordering},
    Mutex,
};

use anyhow::Result;
use reqwest::{blocking::Client, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};
use serde_with::{serde_as, DefaultOnNull};
use thiserror::Error;

use crate::{
    config::RpcConfig,
    model::{FileSnapshot, Priority, TorrentFile, TorrentFiles},
};

#[derive(Debug, Error)]
pub enum TransmissionError {
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),
    #[error("authentication failed")]
    Authentication,
    #[error("session negotiation failed")]
    Session,
    #[error("unexpected http status {0}")]
    HttpStatus(StatusCode),
    #[error("rpc error: {0}")]
    Rpc(String),
    #[error("response parse error: {0}")]
    Parse(#[from] serde_json::Error),
}

pub type RpcResult<T> = std::result::Result<T, TransmissionError>;

pub struct TransmissionClient {
    http: Client,
    endpoint: String,
    auth: Option<(String, Option<String>)>,
    session_id: Mutex<Option<String>>,
    counter: AtomicU64,
}

impl TransmissionClient {
    pub fn new(config: RpcConfig) -> Result<Self> {
        let endpoint = config.endpoint();
        let RpcConfig {
            username,
            password,
            timeout,
            verify_ssl,
            user_agent,
            ..
        } = config;
        let mut builder = Client::builder().timeout(timeout).user_agent(user_agent);
        if !verify_ssl {
            builder = builder.danger_accept_invalid_certs(true);
        }
        let http = builder.build()?;
        let auth = username.map(|user| (user, password));
        Ok(Self {
            http,
            endpoint,
            auth,
            session_id: Mutex::new(None),
            counter: AtomicU64::new(1),
        })
    }

    pub fn fetch_torrent_files(&self) -> RpcResult<Vec<TorrentFiles>> {
        let args = json!({ "fields": ["id", "name", "files", "fileStats"] });
        let response: TorrentGetResponse = self.call("torrent-get", Some(args))?;
        let torrents: Vec<TorrentFiles> = response
            .torrents
            .into_iter()
            .map(TorrentFiles::from)
            .collect();
        log::debug!("fetched file lists of {} torrents", torrents.len());
        Ok(torrents)
    }

    pub fn fetch_snapshot(&self) -> RpcResult<FileSnapshot> {
        Ok(FileSnapshot {
            torrents: self.fetch_torrent_files()?,
        })
    }

    pub fn set_file_priority(
        &self,
        torrent_id: i64,
        indices: &[usize],
        priority: Priority,
    ) -> RpcResult<()> {
        if indices.is_empty() {
            return Ok(());
        }
        self.call_raw("torrent-set", Some(priority_arguments(torrent_id, indices, priority)))?;
        Ok(())
    }

    fn call<T>(&self, method: &str, arguments: Option<Value>) -> RpcResult<T>
    where
        T: for<'de> Deserialize<'de>,
    {
        let value = self.call_raw(method, arguments)?;
        serde_json::from_value(value).map_err(TransmissionError::from)
    }

    fn call_raw(&self, method: &str, arguments: Option<Value>) -> RpcResult<Value> {
        let payload = RpcRequest {
            method,
            arguments,
            tag: self.counter.fetch_add(1, Ordering::Relaxed),
        };
        loop {
            let mut request = self
                .http
                .post(&self.endpoint)
                .header("Content-Type", "application/json")
                .json(&payload);
            if let Some((user, pass)) = &self.auth {
                request = request.basic_auth(user, pass.as_ref());
            }
            let session_header = match self.session_id.lock() {
                Ok(guard) => (*guard).clone(),
                Err(_) => None,
            };
            if let Some(session) = session_header {
                request = request.header("X-Transmission-Session-Id", session);
            }
            let response = request.send()?;
            match response.status() {
                StatusCode::CONFLICT => {
                    if let Some(id) = response.headers().get("X-Transmission-Session-Id") {
                        let value = id
                            .to_str()
                            .map_err(|_| TransmissionError::Session)?
                            .to_string();
                        log::debug!("{method}: renegotiated session id");
                        if let Ok(mut guard) = self.session_id.lock() {
                            *guard = Some(value);
                        }
                        continue;
                    }
                    return Err(TransmissionError::Session);
                }
                StatusCode::UNAUTHORIZED => return Err(TransmissionError::Authentication),
                status if !status.is_success() => {
                    return Err(TransmissionError::HttpStatus(status));
                }
                _ => {
                    let body: RpcResponse = response.json()?;
                    if body.result != "success" {
                        return Err(TransmissionError::Rpc(body.result));
                    }
                    return Ok(body.arguments.unwrap_or(Value::Null));
                }
            }
        }
    }
}

#[derive(Debug, Serialize)]
struct RpcRequest<'a> {
    method: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    arguments: Option<Value>,
    tag: u64,
}

#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    arguments: Option<Value>,
    result: String,
}

fn priority_arguments(torrent_id: i64, indices: &[usize], priority: Priority) -> Value {
    let mut args = Map::new();
    args.insert("ids".to_string(), json!([torrent_id]));
    match priority {
        Priority::Off => {
            args.insert("files-unwanted".to_string(), json!(indices));
        }
        level => {
            args.insert("files-wanted".to_string(), json!(indices));
            args.insert(format!("priority-{}", level.label()), json!(indices));
        }
    }
    Value::Object(args)
}

#[derive(Debug, Deserialize)]
struct TorrentGetResponse {
    #[serde(default)]
    torrents: Vec<TorrentWire>,
}

#[serde_as]
#[derive(Debug, Deserialize)]
struct TorrentWire {
    id: i64,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    name: String,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default)]
    files: Vec<FileWire>,
    #[serde_as(deserialize_as = "DefaultOnNull")]
    #[serde(default, alias = "file_stats", rename = "fileStats")]
    file_stats: Vec<FileStatWire>,
}

#[derive(Debug, Deserialize)]
struct FileWire {
    #[serde(default)]
    name: String,
    #[serde(default)]
    length: u64,
    #[serde(default, alias = "bytes_completed", rename = "bytesCompleted")]
    bytes_completed: u64,
}

#[derive(Debug, Deserialize)]
struct FileStatWire {
    #[serde(default, alias = "bytes_completed", rename = "bytesCompleted")]
    bytes_completed: u64,
    #[serde(default = "default_wanted")]
    wanted: bool,
    #[serde(default)]
    priority: i64,
}

fn default_wanted() -> bool {
    true
}

// Transmission reports "Torrent/dir/file"; single-file torrents have no directory.
fn split_file_name(full: &str) -> (String, String) {
    match full.rsplit_once('/') {
        Some((dir, base)) => (dir.trim_matches('/').to_string(), base.to_string()),
        None => (String::new(), full.to_string()),
    }
}

impl From<TorrentWire> for TorrentFiles {
    fn from(wire: TorrentWire) -> Self {
        let torrent_id = wire.id;
        let files = wire
            .files
            .into_iter()
            .enumerate()
            .map(|(index, file)| {
                let stats = wire.file_stats.get(index);
                let (path, name) = split_file_name(&file.name);
                TorrentFile {
                    torrent_id,
                    index,
                    name,
                    path,
                    size: file.length,
                    downloaded: stats.map_or(file.bytes_completed, |s| s.bytes_completed),
                    priority: stats.map_or(Priority::Normal, |s| {
                        Priority::from_rpc(s.wanted, s.priority)
                    }),
                }
            })
            .collect();
        TorrentFiles {
            torrent_id,
            name: wire.name,
            files,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn torrent_get_response_decodes_into_files() {
        let value = json!({
            "torrents": [{
                "id": 4,
                "name": "Album",
                "files": [
                    {"name": "Album/CD1/01.flac", "length": 100, "bytesCompleted": 10},
                    {"name": "Album/cover.jpg", "length": 5, "bytesCompleted": 5}
                ],
                "fileStats": [
                    {"bytesCompleted": 20, "wanted": true, "priority": 1},
                    {"bytesCompleted": 5, "wanted": false, "priority": 0}
                ]
            }]
        });
        let response: TorrentGetResponse = serde_json::from_value(value).unwrap();
        let torrent = TorrentFiles::from(response.torrents.into_iter().next().unwrap());

        assert_eq!(torrent.torrent_id, 4);
        assert_eq!(torrent.name, "Album");
        assert_eq!(torrent.files.len(), 2);
        let first = &torrent.files[0];
        assert_eq!(first.path, "Album/CD1");
        assert_eq!(first.name, "01.flac");
        assert_eq!(first.downloaded, 20);
        assert_eq!(first.priority, Priority::High);
        assert_eq!(torrent.files[1].index, 1);
        assert_eq!(torrent.files[1].priority, Priority::Off);
    }

    #[test]
    fn missing_stats_and_nulls_fall_back_to_defaults() {
        let value = json!({
            "torrents": [{
                "id": 9,
                "name": null,
                "files": [{"name": "single.iso", "length": 7, "bytesCompleted": 3}],
                "fileStats": null
            }]
        });
        let response: TorrentGetResponse = serde_json::from_value(value).unwrap();
        let torrent = TorrentFiles::from(response.torrents.into_iter().next().unwrap());

        assert_eq!(torrent.name, "");
        let file = &torrent.files[0];
        assert_eq!(file.path, "");
        assert_eq!(file.name, "single.iso");
        assert_eq!(file.downloaded, 3);
        assert_eq!(file.priority, Priority::Normal);
    }

    #[test]
    fn priority_arguments_mark_files_wanted_or_unwanted() {
        assert_eq!(
            priority_arguments(3, &[0, 2], Priority::High),
            json!({"ids": [3], "files-wanted": [0, 2], "priority-high": [0, 2]})
        );
        assert_eq!(
            priority_arguments(3, &[1], Priority::Off),
            json!({"ids": [3], "files-unwanted": [1]})
        );
    }
}
