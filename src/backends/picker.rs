// SPDX-License-Identifier: GPL-3.0-only

//! Gallery image pickers

use crate::constants::IMAGE_EXTENSIONS;
use crate::scanner::{ImagePicker, PickOutcome, PickReply, PickedImage};
use std::path::{Path, PathBuf};
use tokio::runtime::Handle;
use tracing::{debug, warn};

/// Native file dialog via rfd (xdg-desktop-portal or GTK)
pub struct RfdPicker {
    runtime: Handle,
    directory: PathBuf,
}

impl RfdPicker {
    pub fn new(runtime: Handle, directory: PathBuf) -> Self {
        Self { runtime, directory }
    }
}

impl ImagePicker for RfdPicker {
    fn pick_image(&self, reply: PickReply) {
        let directory = self.directory.clone();
        // The dialog blocks until dismissed; keep it off the UI thread
        self.runtime.spawn_blocking(move || {
            let picked = rfd::FileDialog::new()
                .set_title("Choose an image")
                .add_filter("Images", IMAGE_EXTENSIONS)
                .set_directory(&directory)
                .pick_file();

            match picked {
                Some(path) => reply(load_picked(&path)),
                None => {
                    debug!("File dialog dismissed");
                    reply(PickOutcome::Cancelled);
                }
            }
        });
    }
}

/// Picker that always returns one file; backs the `image` command
pub struct PathPicker {
    path: PathBuf,
}

impl PathPicker {
    pub fn new(path: PathBuf) -> Self {
        Self { path }
    }
}

impl ImagePicker for PathPicker {
    fn pick_image(&self, reply: PickReply) {
        reply(load_picked(&self.path));
    }
}

fn load_picked(path: &Path) -> PickOutcome {
    match PickedImage::open(path) {
        Ok(image) => {
            debug!(path = %path.display(), width = image.pixels.width(), height = image.pixels.height(), "Loaded picked image");
            PickOutcome::Picked(image)
        }
        Err(e) => {
            warn!(path = %path.display(), error = %e, "Failed to load picked image");
            PickOutcome::Failed(e.to_string())
        }
    }
}
