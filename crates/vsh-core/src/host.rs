//! Requests to and events from the host embedding the shell.
//!
//! The shell never blocks on the host: requests are queued and drained by
//! the host loop, and the outcome of asynchronous work comes back as a
//! [`HostEvent`] whenever it finishes.

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostRequest {
    /// Capture the visible terminal
    Screenshot,
    /// Offer `contents` to the user as a file download
    Download { filename: String, contents: String },
    /// Let the user pick a snapshot file to import
    PickStateFile,
    /// Reload the whole session from scratch
    Restart,
    /// Close the terminal window
    Close,
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum HostEvent {
    ScreenshotSaved { filename: String },
    ScreenshotFailed { reason: String },
    /// Snapshot text chosen through [`HostRequest::PickStateFile`]
    StateFileLoaded { contents: String },
    DownloadDone { filename: String },
}
