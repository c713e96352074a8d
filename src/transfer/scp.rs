// SCP 文件复制
use crate::ssh::SshClient;
use crate::transfer::progress::ProgressTracker;
use crate::utils::file::ensure_parent_dir;
use anyhow::{Context, Result};
use std::fs::File;
use std::io::{Read, Write};
use std::path::Path;

const CHUNK_SIZE: usize = 1024 * 1024;

/// Copies single files across an established session.
pub trait FileCopier {
    /// Pushes the local file `local` to `remote`. Returns the bytes written.
    fn copy_to(&self, local: &str, remote: &str) -> Result<u64>;
    /// Pulls the remote file `remote` into `local`. Returns the bytes written.
    fn copy_from(&self, remote: &str, local: &str) -> Result<u64>;
}

impl FileCopier for SshClient {
    fn copy_to(&self, local: &str, remote: &str) -> Result<u64> {
        let mut local_file =
            File::open(local).with_context(|| format!("Failed to open local file: {}", local))?;
        let metadata = local_file.metadata()?;
        if !metadata.is_file() {
            anyhow::bail!("{} is not a regular file", local);
        }
        let file_size = metadata.len();

        let mut channel = self
            .session()
            .scp_send(Path::new(remote), file_mode(&metadata), file_size, None)
            .with_context(|| format!("Failed to start SCP upload to {}", remote))?;

        let progress = ProgressTracker::new(file_size, &format!("Uploading {}", local));
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut transferred = 0u64;
        loop {
            let n = match local_file.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    progress.finish_with_error(&e.to_string());
                    return Err(e).with_context(|| format!("Failed to read {}", local));
                }
            };
            if let Err(e) = channel.write_all(&buffer[..n]) {
                progress.finish_with_error(&e.to_string());
                return Err(e).context("Failed to write to remote file");
            }
            transferred += n as u64;
            progress.update(transferred);
        }

        // 发送 EOF 并等待远端确认
        channel.send_eof().context("Failed to send EOF")?;
        channel.wait_eof().context("Failed waiting for EOF")?;
        channel.close().context("Failed to close channel")?;
        channel.wait_close().context("Failed waiting for close")?;

        progress.finish();
        Ok(transferred)
    }

    fn copy_from(&self, remote: &str, local: &str) -> Result<u64> {
        let (channel, stat) = self
            .session()
            .scp_recv(Path::new(remote))
            .with_context(|| format!("Failed to start SCP download of {}", remote))?;
        let file_size = stat.size();

        ensure_parent_dir(local)?;
        let mut local_file =
            File::create(local).with_context(|| format!("Failed to create local file: {}", local))?;

        let progress = ProgressTracker::new(file_size, &format!("Downloading {}", remote));
        let mut buffer = vec![0u8; CHUNK_SIZE];
        let mut transferred = 0u64;
        let mut reader = channel.take(file_size);
        loop {
            let n = match reader.read(&mut buffer) {
                Ok(0) => break,
                Ok(n) => n,
                Err(e) => {
                    progress.finish_with_error(&e.to_string());
                    return Err(e).context("Failed to read from remote file");
                }
            };
            local_file
                .write_all(&buffer[..n])
                .with_context(|| format!("Failed to write {}", local))?;
            transferred += n as u64;
            progress.update(transferred);
        }
        local_file.flush()?;

        if transferred < file_size {
            progress.finish_with_error("unexpected end of stream");
            anyhow::bail!(
                "remote file {} ended after {} of {} bytes",
                remote,
                transferred,
                file_size
            );
        }

        let mut channel = reader.into_inner();
        channel.send_eof().context("Failed to send EOF")?;
        channel.wait_eof().context("Failed waiting for EOF")?;
        channel.close().context("Failed to close channel")?;
        channel.wait_close().context("Failed waiting for close")?;

        progress.finish();
        Ok(transferred)
    }
}

#[cfg(unix)]
fn file_mode(metadata: &std::fs::Metadata) -> i32 {
    use std::os::unix::fs::PermissionsExt;
    (metadata.permissions().mode() & 0o777) as i32
}

#[cfg(not(unix))]
fn file_mode(_metadata: &std::fs::Metadata) -> i32 {
    0o644
}
