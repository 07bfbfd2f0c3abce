//! File open options.

use std::fs;

/// Options for opening a [`FileStore`](crate::FileStore).
///
/// # Example
///
/// ```rust
/// use pagebuf_store::OpenOptions;
///
/// let options = OpenOptions::new()
///     .read(true)
///     .write(true)
///     .create(true);
/// assert!(options.is_writable());
/// ```
#[derive(Debug, Clone, Default)]
pub struct OpenOptions {
    pub(crate) read: bool,
    pub(crate) write: bool,
    pub(crate) truncate: bool,
    pub(crate) create: bool,
    pub(crate) create_new: bool,
    /// Use `sync_all` instead of `sync_data` on flush.
    pub(crate) sync_metadata: bool,
}

impl OpenOptions {
    /// Creates a new set of options with everything disabled.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the option for read access.
    #[must_use]
    pub fn read(mut self, read: bool) -> Self {
        self.read = read;
        self
    }

    /// Sets the option for write access.
    #[must_use]
    pub fn write(mut self, write: bool) -> Self {
        self.write = write;
        self
    }

    /// Sets the option for truncating an existing file.
    #[must_use]
    pub fn truncate(mut self, truncate: bool) -> Self {
        self.truncate = truncate;
        self
    }

    /// Sets the option to create the file if it doesn't exist.
    #[must_use]
    pub fn create(mut self, create: bool) -> Self {
        self.create = create;
        self
    }

    /// Sets the option to create a new file, failing if it exists.
    #[must_use]
    pub fn create_new(mut self, create_new: bool) -> Self {
        self.create_new = create_new;
        self
    }

    /// Flushes file metadata as well as data.
    #[must_use]
    pub fn sync_metadata(mut self, sync_metadata: bool) -> Self {
        self.sync_metadata = sync_metadata;
        self
    }

    /// Returns true if the options grant write access.
    #[must_use]
    pub fn is_writable(&self) -> bool {
        self.write
    }

    /// Read-only access to an existing file.
    #[must_use]
    pub fn for_read() -> Self {
        Self::new().read(true)
    }

    /// Read-write access, creating the file if needed.
    #[must_use]
    pub fn for_create() -> Self {
        Self::new().read(true).write(true).create(true)
    }

    /// Read-write access to an existing file.
    #[must_use]
    pub fn for_existing() -> Self {
        Self::new().read(true).write(true)
    }

    pub(crate) fn to_std_options(&self) -> fs::OpenOptions {
        let mut opts = fs::OpenOptions::new();
        opts.read(self.read)
            .write(self.write)
            .truncate(self.truncate)
            .create(self.create)
            .create_new(self.create_new);
        opts
    }
}
