//! Remote registry cache tier (read-only)
//!
//! Speaks the registry's JSON envelope over HTTP: every structured
//! response is `{result: bool, response: payload | error string}`. A
//! `false` result flag is a non-fatal miss, except for runtime-release
//! downloads where the registry's "No such erlang" marker is classified
//! as a fatal unknown-runtime error.
//!
//! The HTTP client is blocking, so every request runs on the blocking
//! thread pool; a tier call may block its worker (one worker owns one
//! subtree, so this is acceptable).

use crate::cache::{CacheTier, Fetched};
use crate::error::{ErmineError, ErmineResult};
use crate::package::Package;
use async_trait::async_trait;
use semver::Version;
use serde::Deserialize;
use serde_json::json;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
use ureq::Agent;

/// Registry miss marker for package downloads
const NO_SUCH_BUILD: &str = "No such build";
/// Registry miss marker for runtime-release downloads
const NO_SUCH_ERLANG: &str = "No such erlang";

/// Bodies at most this long are inspected for miss markers
const MARKER_SCAN_LIMIT: usize = 256;
/// Download size cap for archives and runtime releases
const DOWNLOAD_LIMIT: u64 = 1024 * 1024 * 1024;

/// One version record from a `/versions` lookup
#[derive(Debug, Clone, Deserialize, PartialEq)]
pub struct VersionRecord {
    /// Version-control ref of the build
    #[serde(rename = "ref")]
    pub ref_: String,
    /// Erlang/OTP version the build was made with
    pub erl_version: String,
}

/// Remote registry cache
#[derive(Clone)]
pub struct RegistryCache {
    name: String,
    base_url: String,
    temp_dir: PathBuf,
    erlang_version: String,
    agent: Agent,
}

impl RegistryCache {
    /// Create a registry tier against `base_url`
    pub fn new(
        name: impl Into<String>,
        base_url: impl Into<String>,
        temp_dir: PathBuf,
        erlang_version: impl Into<String>,
    ) -> Self {
        // Non-2xx responses carry envelope/marker bodies we must read
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .build()
            .new_agent();

        Self {
            name: name.into(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            temp_dir,
            erlang_version: erlang_version.into(),
            agent,
        }
    }

    /// Registry display name
    pub fn name(&self) -> &str {
        &self.name
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path)
    }

    /// Look up the version records for a package, optionally filtered by ref.
    /// A `false` result flag is a miss: logged, empty result, no error.
    pub async fn get_versions(
        &self,
        fullname: &str,
        ref_filter: Option<&str>,
    ) -> ErmineResult<Vec<VersionRecord>> {
        let url = self.url("versions");
        let mut payload = json!({ "full_name": fullname });
        if let Some(r) = ref_filter {
            payload["versions"] = json!({ "ref": r });
        }

        let agent = self.agent.clone();
        let request_url = url.clone();
        let envelope: serde_json::Value = tokio::task::spawn_blocking(move || {
            let mut response = agent
                .post(&request_url)
                .send_json(&payload)
                .map_err(|e| registry_err(&request_url, e))?;
            response
                .body_mut()
                .read_json()
                .map_err(|e| registry_err(&request_url, e))
        })
        .await
        .map_err(|e| ErmineError::Internal(format!("registry task panicked: {}", e)))??;

        if envelope["result"].as_bool() != Some(true) {
            warn!(
                "registry miss at {}: {}",
                url,
                envelope["response"].as_str().unwrap_or("unknown error")
            );
            return Ok(Vec::new());
        }

        let mut records: Vec<VersionRecord> =
            serde_json::from_value(envelope["response"].clone())?;
        // Newest runtime builds first; lenient on non-semver versions
        records.sort_by(|a, b| {
            match (Version::parse(&b.erl_version), Version::parse(&a.erl_version)) {
                (Ok(vb), Ok(va)) => vb.cmp(&va),
                _ => b.erl_version.cmp(&a.erl_version),
            }
        });
        Ok(records)
    }

    /// Download a package archive. `Ok(None)` when the registry has no
    /// such build.
    pub async fn download_package(
        &self,
        name: &str,
        fullname: &str,
        version: &str,
    ) -> ErmineResult<Option<PathBuf>> {
        // Prefer a build made with our own runtime version
        let records = self.get_versions(fullname, Some(version)).await?;
        let erl_version = records
            .iter()
            .find(|r| r.ref_ == version && r.erl_version == self.erlang_version)
            .or_else(|| records.iter().find(|r| r.ref_ == version))
            .map(|r| r.erl_version.clone())
            .unwrap_or_else(|| self.erlang_version.clone());

        let url = self.url("get");
        let payload = json!({
            "full_name": fullname,
            "versions": [{ "ref": version, "erl_version": erl_version }],
        });

        let agent = self.agent.clone();
        let request_url = url.clone();
        let body: Vec<u8> = tokio::task::spawn_blocking(move || {
            let mut response = agent
                .post(&request_url)
                .send_json(&payload)
                .map_err(|e| registry_err(&request_url, e))?;
            response
                .body_mut()
                .with_config()
                .limit(DOWNLOAD_LIMIT)
                .read_to_vec()
                .map_err(|e| registry_err(&request_url, e))
        })
        .await
        .map_err(|e| ErmineError::Internal(format!("registry task panicked: {}", e)))??;

        if has_marker(&body, NO_SUCH_BUILD) {
            debug!("registry has no build for {}:{}", fullname, version);
            return Ok(None);
        }

        let write_path = self.temp_dir.join(format!("{}.ep", name));
        std::fs::write(&write_path, &body)
            .map_err(|e| ErmineError::io(format!("writing {}", write_path.display()), e))?;
        info!("downloaded {}:{} from registry", fullname, version);
        Ok(Some(write_path))
    }

    /// Download a full Erlang runtime release tar by version string.
    /// An unknown runtime version is fatal, not a miss.
    pub async fn fetch_erts(&self, erlang_version: &str) -> ErmineResult<PathBuf> {
        let url = self.url(&format!("download_erts/{}", erlang_version));

        let agent = self.agent.clone();
        let request_url = url.clone();
        let body: Vec<u8> = tokio::task::spawn_blocking(move || {
            let mut response = agent
                .get(&request_url)
                .call()
                .map_err(|e| registry_err(&request_url, e))?;
            response
                .body_mut()
                .with_config()
                .limit(DOWNLOAD_LIMIT)
                .read_to_vec()
                .map_err(|e| registry_err(&request_url, e))
        })
        .await
        .map_err(|e| ErmineError::Internal(format!("registry task panicked: {}", e)))??;

        if has_marker(&body, NO_SUCH_ERLANG) {
            return Err(ErmineError::NoSuchRuntime(erlang_version.to_string()));
        }

        let write_path = self.temp_dir.join(format!("{}.tar", erlang_version));
        std::fs::write(&write_path, &body)
            .map_err(|e| ErmineError::io(format!("writing {}", write_path.display()), e))?;
        Ok(write_path)
    }
}

fn registry_err(url: &str, e: impl std::fmt::Display) -> ErmineError {
    ErmineError::Registry {
        url: url.to_string(),
        reason: e.to_string(),
    }
}

fn has_marker(body: &[u8], marker: &str) -> bool {
    body.len() <= MARKER_SCAN_LIMIT && String::from_utf8_lossy(body).contains(marker)
}

#[async_trait]
impl CacheTier for RegistryCache {
    fn tier_name(&self) -> &'static str {
        "registry"
    }

    async fn exists(&self, fullname: &str, version: &str) -> ErmineResult<bool> {
        let records = self.get_versions(fullname, None).await?;
        Ok(records.iter().any(|r| r.ref_ == version))
    }

    async fn fetch(&self, package: &Package, workspace: &Path) -> ErmineResult<Option<Fetched>> {
        let Some((fullname, version)) = package.cache_key() else {
            return Ok(None);
        };

        let Some(archive_path) = self
            .download_package(&package.name, fullname, version)
            .await?
        else {
            return Ok(None);
        };

        let dest = workspace.join(&package.name);
        let unpacked =
            Package::from_archive(&archive_path, &dest, package.fullname.as_deref())?;
        let config = unpacked.config().cloned().ok_or_else(|| {
            ErmineError::Internal(format!("unpacked {} has no config", package.name))
        })?;
        Ok(Some(Fetched {
            local_path: dest,
            config,
        }))
    }

    async fn publish(&self, _package: &Package, _overwrite: bool) -> ErmineResult<bool> {
        warn!("registry tier is read-only, refusing publish");
        Ok(false)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::{Read, Write};
    use std::net::{TcpListener, TcpStream};
    use tempfile::TempDir;

    /// One-shot HTTP server: serves the canned bodies, one connection per
    /// body, each with `Connection: close` so the client never pools.
    fn mock_registry(bodies: Vec<&'static str>) -> (String, std::thread::JoinHandle<()>) {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let base = format!("http://{}", listener.local_addr().unwrap());
        let handle = std::thread::spawn(move || {
            for body in bodies {
                let (mut stream, _) = listener.accept().unwrap();
                drain_request(&mut stream);
                let response = format!(
                    "HTTP/1.1 200 OK\r\nContent-Type: application/json\r\n\
                     Content-Length: {}\r\nConnection: close\r\n\r\n{}",
                    body.len(),
                    body
                );
                stream.write_all(response.as_bytes()).unwrap();
            }
        });
        (base, handle)
    }

    fn drain_request(stream: &mut TcpStream) {
        let mut head = Vec::new();
        let mut byte = [0u8; 1];
        while !head.ends_with(b"\r\n\r\n") {
            if stream.read(&mut byte).unwrap() == 0 {
                return;
            }
            head.push(byte[0]);
        }
        let head = String::from_utf8_lossy(&head).to_ascii_lowercase();
        let length = head
            .lines()
            .find_map(|line| line.strip_prefix("content-length:"))
            .and_then(|v| v.trim().parse::<usize>().ok())
            .unwrap_or(0);
        let mut body = vec![0u8; length];
        if length > 0 {
            stream.read_exact(&mut body).unwrap();
        }
    }

    fn registry_at(base: &str, temp: &TempDir) -> RegistryCache {
        RegistryCache::new("official", base, temp.path().to_path_buf(), "22.3.0")
    }

    #[tokio::test]
    async fn false_envelope_is_an_empty_version_list() {
        let temp = TempDir::new().unwrap();
        let (base, server) =
            mock_registry(vec![r#"{"result": false, "response": "No such package"}"#]);
        let registry = registry_at(&base, &temp);

        let records = registry.get_versions("x/ghost", None).await.unwrap();
        assert!(records.is_empty());
        server.join().unwrap();
    }

    #[tokio::test]
    async fn exists_is_false_on_envelope_miss() {
        let temp = TempDir::new().unwrap();
        let (base, server) =
            mock_registry(vec![r#"{"result": false, "response": "No such package"}"#]);
        let registry = registry_at(&base, &temp);

        assert!(!registry.exists("x/ghost", "1.0").await.unwrap());
        server.join().unwrap();
    }

    #[tokio::test]
    async fn download_miss_marker_is_none() {
        let temp = TempDir::new().unwrap();
        let (base, server) = mock_registry(vec![
            r#"{"result": true, "response": [{"ref": "1.0", "erl_version": "22.3.0"}]}"#,
            "No such build",
        ]);
        let registry = registry_at(&base, &temp);

        let archive = registry
            .download_package("ghost", "x/ghost", "1.0")
            .await
            .unwrap();
        assert!(archive.is_none());
        server.join().unwrap();
    }

    #[tokio::test]
    async fn download_writes_archive_to_temp_dir() {
        let temp = TempDir::new().unwrap();
        let (base, server) = mock_registry(vec![
            r#"{"result": true, "response": [{"ref": "1.0", "erl_version": "22.3.0"}]}"#,
            "pretend-archive-bytes",
        ]);
        let registry = registry_at(&base, &temp);

        let archive = registry
            .download_package("ghost", "x/ghost", "1.0")
            .await
            .unwrap()
            .unwrap();
        assert_eq!(archive, temp.path().join("ghost.ep"));
        assert_eq!(std::fs::read(&archive).unwrap(), b"pretend-archive-bytes");
        server.join().unwrap();
    }

    #[tokio::test]
    async fn unknown_runtime_version_is_fatal() {
        let temp = TempDir::new().unwrap();
        let (base, server) = mock_registry(vec!["No such erlang"]);
        let registry = registry_at(&base, &temp);

        let err = registry.fetch_erts("99.9.9").await.unwrap_err();
        assert!(matches!(err, ErmineError::NoSuchRuntime(ref v) if v == "99.9.9"));
        server.join().unwrap();
    }

    #[test]
    fn marker_detected_in_short_bodies_only() {
        assert!(has_marker(b"No such build", NO_SUCH_BUILD));
        assert!(has_marker(b"{\"error\": \"No such build\"}", NO_SUCH_BUILD));

        // A real archive that happens to be large never scans positive
        let mut big = vec![0u8; 4096];
        big.extend_from_slice(NO_SUCH_BUILD.as_bytes());
        assert!(!has_marker(&big, NO_SUCH_BUILD));
    }

    #[test]
    fn version_record_deserializes() {
        let record: VersionRecord =
            serde_json::from_value(json!({"ref": "2.9.0", "erl_version": "22.3.0"})).unwrap();
        assert_eq!(record.ref_, "2.9.0");
        assert_eq!(record.erl_version, "22.3.0");
    }

    #[test]
    fn base_url_trailing_slash_trimmed() {
        let cache = RegistryCache::new(
            "official",
            "https://pkg.example.com/",
            PathBuf::from("/tmp"),
            "22.3.0",
        );
        assert_eq!(cache.url("versions"), "https://pkg.example.com/versions");
    }
}
