//! SFTP-backed [`Mailbox`]

use std::fs;
use std::io::{Read, Write};
use std::net::{TcpStream, ToSocketAddrs};
use std::path::{Path, PathBuf};
use std::time::Duration;

use edi_pipeline::{InboundDocument, Mailbox};
use ssh2::{Session, Sftp};
use tracing::{debug, info};

use crate::{Error, Result};

const DEFAULT_PORT: u16 = 22;
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);

/// Where and as whom to log in
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SftpConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub private_key_path: PathBuf,
    /// Remote directory the partner drops purchase orders into
    pub inbound_dir: String,
    /// Remote directory acknowledgments and feeds are written to
    pub outbound_dir: String,
    /// Bound on connecting and on every blocking SSH call
    pub timeout: Duration,
}

impl Default for SftpConfig {
    fn default() -> Self {
        Self {
            host: String::new(),
            port: DEFAULT_PORT,
            username: String::new(),
            private_key_path: PathBuf::new(),
            inbound_dir: "download".to_string(),
            outbound_dir: "upload".to_string(),
            timeout: CONNECT_TIMEOUT,
        }
    }
}

impl SftpConfig {
    pub fn address(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// Join a remote directory and a file name with `/`.
///
/// Directories are used as given, so a relative one resolves against the
/// login directory on the server.
pub fn remote_path(dir: &str, name: &str) -> String {
    let dir = dir.trim_end_matches('/');
    if dir.is_empty() {
        name.to_string()
    } else {
        format!("{dir}/{name}")
    }
}

/// Mailbox over one authenticated SFTP session
pub struct SftpMailbox {
    config: SftpConfig,
    sftp: Sftp,
    _session: Session,
}

impl SftpMailbox {
    /// Connect, authenticate with the private key and open the SFTP channel.
    ///
    /// The server host key is not checked against a known-hosts file.
    pub fn connect(config: SftpConfig) -> Result<Self> {
        fs::metadata(&config.private_key_path).map_err(|e| Error::Key {
            path: config.private_key_path.display().to_string(),
            message: e.to_string(),
        })?;

        let address = config.address();
        let connect_error = |message: String| Error::Connect {
            address: address.clone(),
            message,
        };

        let socket = address
            .to_socket_addrs()
            .map_err(|e| connect_error(e.to_string()))?
            .next()
            .ok_or_else(|| connect_error("host did not resolve".to_string()))?;
        let tcp = TcpStream::connect_timeout(&socket, config.timeout)
            .map_err(|e| connect_error(e.to_string()))?;

        let mut session = Session::new().map_err(|e| connect_error(e.to_string()))?;
        session.set_timeout(u32::try_from(config.timeout.as_millis()).unwrap_or(u32::MAX));
        session.set_tcp_stream(tcp);
        session
            .handshake()
            .map_err(|e| connect_error(format!("SSH handshake failed: {e}")))?;

        let auth_error = |message: String| Error::Auth {
            username: config.username.clone(),
            message,
        };
        session
            .userauth_pubkey_file(&config.username, None, &config.private_key_path, None)
            .map_err(|e| auth_error(e.to_string()))?;
        if !session.authenticated() {
            return Err(auth_error("key was not accepted".to_string()));
        }

        let sftp = session
            .sftp()
            .map_err(|e| Error::sftp("open channel", address.as_str(), e.to_string()))?;

        info!(address = %address, username = %config.username, "Opened SFTP session");
        Ok(Self {
            config,
            sftp,
            _session: session,
        })
    }

    pub fn config(&self) -> &SftpConfig {
        &self.config
    }

    fn read_remote(&self, path: &str) -> Result<Vec<u8>> {
        let mut file = self
            .sftp
            .open(Path::new(path))
            .map_err(|e| Error::sftp("get", path, e.to_string()))?;
        let mut content = Vec::new();
        file.read_to_end(&mut content)
            .map_err(|e| Error::sftp("get", path, e.to_string()))?;
        Ok(content)
    }

    fn list_remote(&self) -> Result<Vec<InboundDocument>> {
        let dir = self.config.inbound_dir.as_str();
        let entries = self
            .sftp
            .readdir(Path::new(dir))
            .map_err(|e| Error::sftp("list", dir, e.to_string()))?;

        let mut names: Vec<String> = entries
            .into_iter()
            .filter(|(_, stat)| stat.is_file())
            .filter_map(|(path, _)| {
                path.file_name()
                    .map(|name| name.to_string_lossy().into_owned())
            })
            .collect();
        names.sort();

        let mut documents = Vec::with_capacity(names.len());
        for name in names {
            let content = self.read_remote(&remote_path(dir, &name))?;
            documents.push(InboundDocument::new(name, content));
        }

        debug!(dir, count = documents.len(), "Listed remote mailbox");
        Ok(documents)
    }

    fn put_remote(&self, name: &str, content: &[u8]) -> Result<()> {
        let path = remote_path(&self.config.outbound_dir, name);
        let mut file = self
            .sftp
            .create(Path::new(&path))
            .map_err(|e| Error::sftp("put", path.as_str(), e.to_string()))?;
        file.write_all(content)
            .map_err(|e| Error::sftp("put", path.as_str(), e.to_string()))?;

        debug!(path = %path, bytes = content.len(), "Put remote file");
        Ok(())
    }

    fn delete_remote(&self, name: &str) -> Result<()> {
        let path = remote_path(&self.config.inbound_dir, name);
        self.sftp
            .unlink(Path::new(&path))
            .map_err(|e| Error::sftp("delete", path.as_str(), e.to_string()))?;
        debug!(path = %path, "Deleted remote file");
        Ok(())
    }
}

impl Mailbox for SftpMailbox {
    /// Regular files of the remote inbound directory, sorted by name
    fn list_inbound(&self) -> edi_pipeline::Result<Vec<InboundDocument>> {
        Ok(self.list_remote()?)
    }

    fn put_outbound(&self, name: &str, content: &[u8]) -> edi_pipeline::Result<()> {
        Ok(self.put_remote(name, content)?)
    }

    fn delete_inbound(&self, name: &str) -> edi_pipeline::Result<()> {
        Ok(self.delete_remote(name)?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let config = SftpConfig::default();
        assert_eq!(config.port, 22);
        assert_eq!(config.inbound_dir, "download");
        assert_eq!(config.outbound_dir, "upload");
        assert_eq!(config.timeout, Duration::from_secs(10));
    }

    #[test]
    fn test_remote_path() {
        assert_eq!(remote_path("download", "PO_1.edi"), "download/PO_1.edi");
        assert_eq!(remote_path("/upload/", "PO_1.edi.997"), "/upload/PO_1.edi.997");
        assert_eq!(remote_path("", "PO_1.edi"), "PO_1.edi");
    }

    #[test]
    fn test_missing_key_fails_before_dialing() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("id_ed25519");

        let result = SftpMailbox::connect(SftpConfig {
            host: "sftp.invalid".to_string(),
            username: "vendor".to_string(),
            private_key_path: key.clone(),
            ..SftpConfig::default()
        });

        match result {
            Err(Error::Key { path, .. }) => assert_eq!(path, key.display().to_string()),
            Err(other) => panic!("expected key error, got {other:?}"),
            Ok(_) => panic!("expected key error, got a session"),
        }
    }

    #[test]
    fn test_refused_connection_is_connect_error() {
        let dir = TempDir::new().unwrap();
        let key = dir.path().join("id_ed25519");
        fs::write(&key, "not a real key").unwrap();

        // Reserve a local port, then free it so nothing is listening
        let port = {
            let listener = TcpListener::bind("127.0.0.1:0").unwrap();
            listener.local_addr().unwrap().port()
        };

        let result = SftpMailbox::connect(SftpConfig {
            host: "127.0.0.1".to_string(),
            port,
            username: "vendor".to_string(),
            private_key_path: key,
            timeout: Duration::from_secs(2),
            ..SftpConfig::default()
        });

        match result {
            Err(Error::Connect { address, .. }) => {
                assert_eq!(address, format!("127.0.0.1:{port}"));
            }
            Err(other) => panic!("expected connect error, got {other:?}"),
            Ok(_) => panic!("expected connect error, got a session"),
        }
    }
}
