//! Fetching attached Javadoc pages.
//!
//! Locations are `file:` URLs, plain paths or `http(s)` URLs. A page that is
//! missing makes the fetcher probe the documentation base location; bases
//! that cannot be reached are remembered in the context's
//! [`UrlValidityCache`](crate::context::UrlValidityCache) and never fetched
//! again.

use std::fs;
use std::io::{self, Read};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;
use url::Url;

use crate::context::ModelContext;
use crate::error::{ModelError, Result};

const DEFAULT_TIMEOUT: Duration = Duration::from_secs(10);
const MAX_REDIRECTS: u32 = 5;

enum Location {
    File(PathBuf),
    Http(Url),
}

pub struct DocFetcher {
    context: Arc<ModelContext>,
    agent: ureq::Agent,
}

impl DocFetcher {
    pub fn new(context: Arc<ModelContext>) -> Self {
        Self::with_timeout(context, DEFAULT_TIMEOUT)
    }

    pub fn with_timeout(context: Arc<ModelContext>, timeout: Duration) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(timeout)
            .timeout_read(timeout)
            .redirects(MAX_REDIRECTS)
            .build();
        Self { context, agent }
    }

    /// Contents of the page at `doc`, which lives below the documentation
    /// root `base`. `Ok(None)` when the page is missing but the base is
    /// reachable.
    pub fn fetch(&self, base: &str, doc: &str) -> Result<Option<String>> {
        let urls = self.context.urls();
        if urls.is_known_invalid(base) {
            return Err(ModelError::AttachedJavadoc {
                url: base.to_string(),
                message: "documentation location is known to be unreachable".to_string(),
            });
        }

        let location = parse_location(doc)?;
        match self.read(&location, doc) {
            Ok((bytes, content_type)) => {
                urls.mark_valid(base);
                Ok(Some(decode(&bytes, content_type.as_deref())))
            }
            Err(Failure::NotFound) => {
                self.validate_base(base)?;
                Ok(None)
            }
            Err(Failure::Error(err)) => Err(err),
        }
    }

    fn read(&self, location: &Location, doc: &str) -> std::result::Result<(Vec<u8>, Option<String>), Failure> {
        match location {
            Location::File(path) => match fs::read(path) {
                Ok(bytes) => Ok((bytes, None)),
                Err(err) if err.kind() == io::ErrorKind::NotFound => Err(Failure::NotFound),
                Err(err) => Err(Failure::Error(classify_io(doc, err))),
            },
            Location::Http(url) => {
                let response = self.agent.request_url("GET", url).call().map_err(|err| match err {
                    ureq::Error::Status(404 | 410, _) => Failure::NotFound,
                    ureq::Error::Status(code, _) => Failure::Error(ModelError::AttachedJavadoc {
                        url: doc.to_string(),
                        message: format!("server returned status {code}"),
                    }),
                    ureq::Error::Transport(transport) => Failure::Error(classify_transport(doc, transport)),
                })?;
                let content_type = response.header("Content-Type").map(str::to_string);
                let mut bytes = Vec::new();
                response
                    .into_reader()
                    .read_to_end(&mut bytes)
                    .map_err(|err| Failure::Error(classify_io(doc, err)))?;
                Ok((bytes, content_type))
            }
        }
    }

    /// Probes the base location after a missing page and records the answer.
    fn validate_base(&self, base: &str) -> Result<()> {
        let urls = self.context.urls();
        if urls.is_known_valid(base) {
            return Ok(());
        }
        let reachable = match parse_location(base) {
            Ok(Location::File(path)) => path.exists(),
            Ok(Location::Http(url)) => self.agent.request_url("GET", &url).call().is_ok(),
            Err(_) => false,
        };
        if reachable {
            urls.mark_valid(base);
            Ok(())
        } else {
            urls.mark_invalid(base);
            Err(ModelError::AttachedJavadoc {
                url: base.to_string(),
                message: "documentation location cannot be reached".to_string(),
            })
        }
    }
}

enum Failure {
    NotFound,
    Error(ModelError),
}

fn parse_location(location: &str) -> Result<Location> {
    match Url::parse(location) {
        Ok(url) if url.scheme() == "file" => url
            .to_file_path()
            .map(Location::File)
            .map_err(|_| malformed(location, "not a local file URL")),
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Location::Http(url)),
        Ok(url) if url.scheme().len() == 1 => Ok(Location::File(PathBuf::from(location))),
        Ok(url) => Err(malformed(location, &format!("unsupported scheme {}", url.scheme()))),
        Err(url::ParseError::RelativeUrlWithoutBase) if Path::new(location).is_absolute() => {
            Ok(Location::File(PathBuf::from(location)))
        }
        Err(err) => Err(malformed(location, &err.to_string())),
    }
}

fn malformed(location: &str, message: &str) -> ModelError {
    ModelError::AttachedJavadoc {
        url: location.to_string(),
        message: message.to_string(),
    }
}

fn is_timeout(err: &io::Error) -> bool {
    matches!(err.kind(), io::ErrorKind::TimedOut | io::ErrorKind::WouldBlock)
}

fn classify_io(location: &str, err: io::Error) -> ModelError {
    if is_timeout(&err) {
        ModelError::AttachedJavadocTimeout {
            url: location.to_string(),
        }
    } else {
        ModelError::io(location, err)
    }
}

fn classify_transport(location: &str, transport: ureq::Transport) -> ModelError {
    let io_source = std::error::Error::source(&transport).and_then(|e| e.downcast_ref::<io::Error>());
    if io_source.is_some_and(is_timeout) {
        return ModelError::AttachedJavadocTimeout {
            url: location.to_string(),
        };
    }
    match transport.kind() {
        ureq::ErrorKind::Io => {
            let kind = io_source.map_or(io::ErrorKind::Other, io::Error::kind);
            ModelError::io(location, io::Error::new(kind, transport.to_string()))
        }
        _ => ModelError::AttachedJavadoc {
            url: location.to_string(),
            message: transport.to_string(),
        },
    }
}

/// Decodes page bytes using the charset from the Content-Type header or,
/// failing that, from a `<meta>` tag. UTF-8 otherwise.
fn decode(bytes: &[u8], content_type: Option<&str>) -> String {
    let charset = content_type
        .and_then(charset_param)
        .or_else(|| meta_charset(bytes))
        .unwrap_or_else(|| "utf-8".to_string());
    match charset.to_ascii_lowercase().as_str() {
        "iso-8859-1" | "latin1" | "latin-1" | "us-ascii" | "windows-1252" => {
            bytes.iter().map(|&b| b as char).collect()
        }
        "utf-8" | "utf8" => String::from_utf8_lossy(bytes).into_owned(),
        other => {
            debug!(target: "jmodel.model", charset = other, "unsupported charset, decoding as utf-8");
            String::from_utf8_lossy(bytes).into_owned()
        }
    }
}

fn charset_param(content_type: &str) -> Option<String> {
    content_type.split(';').skip(1).find_map(|param| {
        let (key, value) = param.split_once('=')?;
        key.trim()
            .eq_ignore_ascii_case("charset")
            .then(|| value.trim().trim_matches('"').to_string())
    })
}

/// `<meta charset="x">` or `<meta ... content="text/html; charset=x">`.
fn meta_charset(bytes: &[u8]) -> Option<String> {
    let head = String::from_utf8_lossy(&bytes[..bytes.len().min(4096)]).to_ascii_lowercase();
    let mut rest = head.as_str();
    while let Some(start) = rest.find("<meta") {
        let tag = &rest[start..];
        let end = tag.find('>').unwrap_or(tag.len());
        let tag = &tag[..end];
        if let Some(pos) = tag.find("charset=") {
            let value = tag[pos + "charset=".len()..].trim_start_matches(['"', '\'']);
            let value: String = value
                .chars()
                .take_while(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | ':' | '.'))
                .collect();
            if !value.is_empty() {
                return Some(value);
            }
        }
        rest = &rest[start + end..];
    }
    None
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::CacheConfig;
    use crate::error::ModelStatus;
    use anyhow::Result;
    use std::net::TcpListener;

    fn fetcher() -> (Arc<ModelContext>, DocFetcher) {
        let context = Arc::new(ModelContext::new(CacheConfig::default()));
        let fetcher = DocFetcher::with_timeout(context.clone(), Duration::from_millis(300));
        (context, fetcher)
    }

    #[test]
    fn reads_file_pages_with_their_meta_charset() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let page = dir.path().join("A.html");
        let mut bytes = b"<html><head><meta http-equiv=\"Content-Type\" content=\"text/html; charset=ISO-8859-1\"></head>".to_vec();
        bytes.extend_from_slice(&[b'c', b'a', b'f', 0xE9]);
        fs::write(&page, &bytes)?;

        let (context, fetcher) = fetcher();
        let base = Url::from_directory_path(dir.path()).map_err(|_| anyhow::anyhow!("bad dir"))?;
        let doc = Url::from_file_path(&page).map_err(|_| anyhow::anyhow!("bad file"))?;
        let text = fetcher.fetch(base.as_str(), doc.as_str())?.unwrap_or_default();
        assert!(text.ends_with("café"));
        assert!(context.urls().is_known_valid(base.as_str()));
        Ok(())
    }

    #[test]
    fn missing_page_under_a_valid_base_is_none() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let (context, fetcher) = fetcher();
        let base = dir.path().to_string_lossy().to_string();
        let doc = dir.path().join("Missing.html").to_string_lossy().to_string();
        assert_eq!(fetcher.fetch(&base, &doc)?, None);
        assert!(context.urls().is_known_valid(&base));
        Ok(())
    }

    #[test]
    fn unreachable_base_is_never_fetched_again() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let base_dir = dir.path().join("docs");
        let base = base_dir.to_string_lossy().to_string();
        let doc = base_dir.join("A.html").to_string_lossy().to_string();
        let (context, fetcher) = fetcher();

        let err = fetcher.fetch(&base, &doc).unwrap_err();
        assert_eq!(err.status(), ModelStatus::CannotRetrieveAttachedJavadoc);
        assert!(context.urls().is_known_invalid(&base));

        fs::create_dir_all(&base_dir)?;
        fs::write(base_dir.join("A.html"), "<html></html>")?;
        let err = fetcher.fetch(&base, &doc).unwrap_err();
        assert_eq!(err.status(), ModelStatus::CannotRetrieveAttachedJavadoc);

        context.reset();
        assert_eq!(fetcher.fetch(&base, &doc)?.as_deref(), Some("<html></html>"));
        Ok(())
    }

    #[test]
    fn malformed_locations_are_classified() {
        let (_context, fetcher) = fetcher();
        let err = fetcher.fetch("docs", "ftp://example.org/A.html").unwrap_err();
        assert_eq!(err.status(), ModelStatus::CannotRetrieveAttachedJavadoc);
        let err = fetcher.fetch("docs", "relative/A.html").unwrap_err();
        assert_eq!(err.status(), ModelStatus::CannotRetrieveAttachedJavadoc);
    }

    #[test]
    fn silent_server_times_out() -> Result<()> {
        let listener = TcpListener::bind("127.0.0.1:0")?;
        let address = listener.local_addr()?;
        let (_context, fetcher) = fetcher();
        let url = format!("http://{address}/A.html");
        let err = fetcher.fetch(&format!("http://{address}/"), &url).unwrap_err();
        assert_eq!(err.status(), ModelStatus::CannotRetrieveAttachedJavadocTimeout);
        drop(listener);
        Ok(())
    }

    #[test]
    fn charset_sources() {
        assert_eq!(charset_param("text/html; charset=\"UTF-8\""), Some("UTF-8".to_string()));
        assert_eq!(charset_param("text/html"), None);
        assert_eq!(meta_charset(b"<head><meta charset=\"latin1\"></head>"), Some("latin1".to_string()));
        assert_eq!(decode(&[0x41, 0xE9], Some("text/html; charset=iso-8859-1")), "Aé");
    }
}
