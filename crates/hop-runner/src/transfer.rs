//! File transfer over a double hop
//!
//! There is no scp through two relays here: a `tar` stream is piped through
//! the composed ssh invocation instead. Uploads pack locally and unpack on
//! the node; downloads do the reverse.

use std::path::{Path, PathBuf};

use hop_core::{shell_quote, Composer, Invocation, Node, Relay, ValidationError};

use crate::pipe::Pipeline;

/// Archiver used on both ends
pub const TAR_PROGRAM: &str = "tar";

/// Which way the bytes flow
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Direction {
    /// Local path → directory on the node
    Upload { local: PathBuf, remote: String },
    /// Path on the node → local directory
    Download { remote: String, local: PathBuf },
}

/// A parsed `cp` request
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TransferSpec {
    /// Alias of the node on the remote side
    pub alias: String,
    pub direction: Direction,
}

/// Split `alias:/path` into its parts; anything else is a local path
pub fn parse_remote(arg: &str) -> Option<(&str, &str)> {
    match arg.split_once(':') {
        Some((alias, path)) if !alias.is_empty() && !path.is_empty() => Some((alias, path)),
        _ => None,
    }
}

impl TransferSpec {
    /// Parse source and destination; exactly one must be remote
    pub fn parse(source: &str, destination: &str) -> Result<Self, ValidationError> {
        match (parse_remote(source), parse_remote(destination)) {
            (None, Some((alias, remote))) => Ok(Self {
                alias: alias.to_string(),
                direction: Direction::Upload {
                    local: PathBuf::from(source),
                    remote: remote.to_string(),
                },
            }),
            (Some((alias, remote)), None) => Ok(Self {
                alias: alias.to_string(),
                direction: Direction::Download {
                    remote: remote.to_string(),
                    local: PathBuf::from(destination),
                },
            }),
            _ => Err(ValidationError::TransferPaths),
        }
    }

    /// Build the process pair for this transfer
    pub fn pipeline(&self, relay: &Relay, node: &Node) -> Pipeline {
        match &self.direction {
            Direction::Upload { local, remote } => upload_pipeline(relay, node, local, remote),
            Direction::Download { remote, local } => download_pipeline(relay, node, remote, local),
        }
    }
}

/// `tar` packing `local` on this machine, unpacked into `remote_dir` on the node
pub fn upload_pipeline(relay: &Relay, node: &Node, local: &Path, remote_dir: &str) -> Pipeline {
    let (dir, name) = split_local(local);
    let producer = local_pack(&dir, &name);

    let dest = remote_path_word(remote_dir);
    let unpack = format!("mkdir -p {dest} && {TAR_PROGRAM} xf - -C {dest}");
    let consumer = Composer::new(relay, node).exec(&unpack);

    Pipeline::new(producer, consumer)
}

/// `tar` packing `remote` on the node, unpacked into `local` here.
///
/// `local` is used when it is an existing directory, otherwise the archive
/// is unpacked into the current directory.
pub fn download_pipeline(relay: &Relay, node: &Node, remote: &str, local: &Path) -> Pipeline {
    let (dir, name) = split_remote(remote);
    let pack = format!(
        "{TAR_PROGRAM} cf - -C {} {}",
        remote_path_word(&dir),
        shell_quote(&name)
    );
    let producer = Composer::new(relay, node).exec(&pack);

    let dest = if local.is_dir() {
        local.to_path_buf()
    } else {
        PathBuf::from(".")
    };
    let consumer = Invocation::new(TAR_PROGRAM).args([
        "xf".to_string(),
        "-".to_string(),
        "-C".to_string(),
        dest.display().to_string(),
    ]);

    Pipeline::new(producer, consumer)
}

/// Local `tar` writing an archive of `dir/name` to stdout
fn local_pack(dir: &str, name: &str) -> Invocation {
    let mut tar = Invocation::new(TAR_PROGRAM);
    // bsdtar on macOS warns about extended attributes otherwise
    if cfg!(target_os = "macos") {
        tar = tar.arg("--no-xattr");
    }
    tar.args(["cf", "-", "-C", dir, name])
}

fn split_local(path: &Path) -> (String, String) {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    let dir = path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ".".to_string());
    (dir, name)
}

/// Directory to `tar -C` into and the entry to pack there.
///
/// The home directory and `/` have no parent to pack them from, so their
/// contents are packed as `.`.
fn split_remote(path: &str) -> (String, String) {
    let trimmed = path.trim_end_matches('/');
    match trimmed {
        "" if path.starts_with('/') => return ("/".to_string(), ".".to_string()),
        "~" => return ("~".to_string(), ".".to_string()),
        _ => {}
    }
    match trimmed.rsplit_once('/') {
        Some(("", name)) => ("/".to_string(), name.to_string()),
        Some((dir, name)) => (dir.to_string(), name.to_string()),
        None => (".".to_string(), trimmed.to_string()),
    }
}

/// Quote a path for the node's shell, leaving a leading `~` expandable
fn remote_path_word(path: &str) -> String {
    if path == "~" {
        return path.to_string();
    }
    match path.strip_prefix("~/") {
        Some("") => "~/".to_string(),
        Some(rest) => format!("~/{}", shell_quote(rest)),
        None => shell_quote(path).into_owned(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pair() -> (Relay, Node) {
        (
            Relay::new("bastion", "jump").with_identity_file("/keys/jump"),
            Node::new("web1", "10.0.0.5", "root"),
        )
    }

    #[test]
    fn test_parse_upload_and_download() {
        let spec = TransferSpec::parse("./build/app.tar", "web1:/opt/app").unwrap();
        assert_eq!(spec.alias, "web1");
        assert_eq!(
            spec.direction,
            Direction::Upload {
                local: PathBuf::from("./build/app.tar"),
                remote: "/opt/app".into()
            }
        );

        let spec = TransferSpec::parse("web1:/var/log/syslog", "logs").unwrap();
        assert_eq!(
            spec.direction,
            Direction::Download {
                remote: "/var/log/syslog".into(),
                local: PathBuf::from("logs")
            }
        );
    }

    #[test]
    fn test_parse_rejects_two_locals_or_two_remotes() {
        assert_eq!(
            TransferSpec::parse("a.txt", "b.txt").unwrap_err(),
            ValidationError::TransferPaths
        );
        assert_eq!(
            TransferSpec::parse("web1:/a", "web2:/b").unwrap_err(),
            ValidationError::TransferPaths
        );
        // Empty alias or path is not remote
        assert!(parse_remote(":/tmp").is_none());
        assert!(parse_remote("web1:").is_none());
    }

    #[test]
    fn test_upload_pipeline() {
        let (relay, node) = pair();
        let pipeline = upload_pipeline(&relay, &node, Path::new("/home/me/site"), "/srv/www");

        let producer = pipeline.producer();
        assert_eq!(producer.program, "tar");
        assert!(producer
            .args
            .ends_with(&["cf", "-", "-C", "/home/me", "site"].map(String::from)));
        assert_eq!(
            producer.args.contains(&"--no-xattr".to_string()),
            cfg!(target_os = "macos")
        );

        let consumer = pipeline.consumer();
        assert_eq!(consumer.program, "ssh");
        assert_eq!(
            consumer.args,
            vec![
                "-i",
                "/keys/jump",
                "jump@bastion",
                "ssh root@10.0.0.5 'mkdir -p /srv/www && tar xf - -C /srv/www'",
            ]
        );
    }

    #[test]
    fn test_upload_relative_file() {
        let (relay, node) = pair();
        let pipeline = upload_pipeline(&relay, &node, Path::new("notes.txt"), "~/inbox");
        assert!(pipeline
            .producer()
            .args
            .ends_with(&["-C", ".", "notes.txt"].map(String::from)));
        assert!(pipeline
            .consumer()
            .args
            .last()
            .unwrap()
            .contains("mkdir -p ~/inbox && tar xf - -C ~/inbox"));
    }

    #[test]
    fn test_download_pipeline_into_existing_dir() {
        let (relay, node) = pair();
        let dir = tempfile::TempDir::new().unwrap();
        let pipeline = download_pipeline(&relay, &node, "/var/log/nginx/", dir.path());

        assert_eq!(
            pipeline.producer().args.last().unwrap(),
            "ssh root@10.0.0.5 'tar cf - -C /var/log nginx'"
        );
        let consumer = pipeline.consumer();
        assert_eq!(consumer.program, "tar");
        assert_eq!(
            consumer.args,
            vec!["xf", "-", "-C", dir.path().to_str().unwrap()]
        );
    }

    #[test]
    fn test_download_to_missing_dir_uses_cwd() {
        let (relay, node) = pair();
        let pipeline = download_pipeline(
            &relay,
            &node,
            "/etc/hosts",
            Path::new("/nonexistent/hopgate/dest"),
        );
        assert_eq!(pipeline.consumer().args, vec!["xf", "-", "-C", "."]);
    }

    #[test]
    fn test_paths_with_spaces_are_quoted_for_the_node() {
        let (relay, node) = pair();
        let pipeline = download_pipeline(&relay, &node, "/data/my files/report 1.pdf", Path::new("."));
        // Quoted once for the node, then the whole command once for the relay
        assert_eq!(
            pipeline.producer().args.last().unwrap(),
            r"ssh root@10.0.0.5 'tar cf - -C '\''/data/my files'\'' '\''report 1.pdf'\'''"
        );
    }

    #[test]
    fn test_split_remote() {
        assert_eq!(split_remote("/etc/hosts"), ("/etc".into(), "hosts".into()));
        assert_eq!(split_remote("/etc"), ("/".into(), "etc".into()));
        assert_eq!(split_remote("file.txt"), (".".into(), "file.txt".into()));
        assert_eq!(split_remote("~/dir/"), ("~".into(), "dir".into()));
        assert_eq!(split_remote("~"), ("~".into(), ".".into()));
        assert_eq!(split_remote("~/"), ("~".into(), ".".into()));
        assert_eq!(split_remote("/"), ("/".into(), ".".into()));
    }

    #[test]
    fn test_download_home_directory() {
        let (relay, node) = pair();
        for home in ["~", "~/"] {
            let pipeline = download_pipeline(&relay, &node, home, Path::new("."));
            // ~ must reach the node unquoted so its shell expands it
            assert_eq!(
                pipeline.producer().args.last().unwrap(),
                "ssh root@10.0.0.5 'tar cf - -C ~ .'"
            );
        }
    }

    #[test]
    fn test_remote_path_word() {
        assert_eq!(remote_path_word("~"), "~");
        assert_eq!(remote_path_word("~/my dir"), "~/'my dir'");
        assert_eq!(remote_path_word("/opt/app"), "/opt/app");
    }
}
