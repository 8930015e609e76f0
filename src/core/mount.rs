use crate::domain::ports::MountSession;
use crate::utils::error::Result;
use std::fmt;
use std::path::Path;
use tempfile::TempDir;

/// Owns a started mount session and, for offline runs, the temporary directory
/// it was mounted into. The session is stopped and the directory removed when
/// the handle is dropped or `unmount` is called.
pub struct MountHandle {
    session: Box<dyn MountSession>,
    temp_dir: Option<TempDir>,
}

impl MountHandle {
    pub fn new(session: Box<dyn MountSession>, temp_dir: Option<TempDir>) -> Self {
        Self { session, temp_dir }
    }

    pub fn path(&self) -> &Path {
        self.session.mount_point()
    }

    pub fn is_active(&self) -> bool {
        self.session.is_started()
    }

    pub fn unmount(mut self) -> Result<()> {
        tracing::debug!("Stopping mount at {}", self.path().display());
        self.session.stop()?;
        if let Some(dir) = self.temp_dir.take() {
            dir.close()?;
        }
        Ok(())
    }
}

impl Drop for MountHandle {
    fn drop(&mut self) {
        if let Err(e) = self.session.stop() {
            tracing::warn!("Failed to stop mount at {}: {}", self.path().display(), e);
        }
    }
}

impl fmt::Debug for MountHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MountHandle")
            .field("path", &self.path())
            .field("active", &self.is_active())
            .field("temporary", &self.temp_dir.is_some())
            .finish()
    }
}
