// SPDX-License-Identifier: GPL-3.0-only

//! Camera authorization
//!
//! Inside a Flatpak sandbox access is mediated by the desktop portal's Camera
//! interface. On the host the device nodes' permissions decide.

use crate::config::{Config, SettingsLink};
use crate::constants::{APP_ID, portal};
use crate::scanner::{AccessReply, AuthorizationState, CameraAuthority};
use futures::StreamExt;
use std::collections::HashMap;
use std::ffi::CString;
use std::os::unix::ffi::OsStrExt;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::runtime::Handle;
use tracing::{debug, info, warn};

static REQUEST_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Pick the authority for the environment the app runs in
pub fn system_authority(runtime: Handle, config: &Config) -> Arc<dyn CameraAuthority> {
    if Path::new(portal::FLATPAK_INFO).exists() {
        info!("Running sandboxed, using the camera portal");
        Arc::new(PortalAuthority::new(runtime, config.settings_link.clone()))
    } else {
        debug!("Running on the host, checking video device permissions");
        Arc::new(DeviceNodeAuthority::new(config.settings_link.clone()))
    }
}

fn open_settings_link(link: &SettingsLink) -> Result<(), String> {
    info!(app = %link.app, target = %link.target, "Opening privacy settings");
    open::with_detached(&link.target, link.app.clone()).map_err(|e| e.to_string())
}

/// `org.freedesktop.portal.Camera`
///
/// The portal does not expose a stored decision, so a reachable portal always
/// reports `NotDetermined` and every attempt goes through `AccessCamera`.
/// Previously granted or denied access is answered without a dialog.
pub struct PortalAuthority {
    runtime: Handle,
    settings: SettingsLink,
}

impl PortalAuthority {
    pub fn new(runtime: Handle, settings: SettingsLink) -> Self {
        Self { runtime, settings }
    }
}

impl CameraAuthority for PortalAuthority {
    fn authorization_status(&self) -> AuthorizationState {
        match pollster::block_on(is_camera_present()) {
            Ok(present) => {
                debug!(present, "Camera portal reachable");
                AuthorizationState::NotDetermined
            }
            Err(e) => {
                warn!(error = %e, "Camera portal unavailable");
                AuthorizationState::Unknown
            }
        }
    }

    fn request_access(&self, reply: AccessReply) {
        self.runtime.spawn(async move {
            let granted = match access_camera().await {
                Ok(granted) => granted,
                Err(e) => {
                    warn!(error = %e, "Camera portal request failed");
                    false
                }
            };
            reply(granted);
        });
    }

    fn open_settings(&self) -> Result<(), String> {
        open_settings_link(&self.settings)
    }
}

async fn camera_proxy(connection: &zbus::Connection) -> zbus::Result<zbus::Proxy<'static>> {
    zbus::Proxy::new(
        connection,
        portal::BUS_NAME,
        portal::OBJECT_PATH,
        portal::CAMERA_INTERFACE,
    )
    .await
}

async fn is_camera_present() -> zbus::Result<bool> {
    let connection = zbus::Connection::session().await?;
    let proxy = camera_proxy(&connection).await?;
    proxy.get_property::<bool>("IsCameraPresent").await
}

/// Call `AccessCamera` and wait for the request's `Response` signal
async fn access_camera() -> zbus::Result<bool> {
    let connection = zbus::Connection::session().await?;
    let proxy = camera_proxy(&connection).await?;

    let token = format!(
        "{}_{}_{}",
        APP_ID.replace('-', "_"),
        std::process::id(),
        REQUEST_COUNTER.fetch_add(1, Ordering::Relaxed)
    );
    let sender = connection
        .unique_name()
        .map(|name| name.as_str().trim_start_matches(':').replace('.', "_"))
        .ok_or_else(|| zbus::Error::Failure("Connection has no unique name".to_string()))?;
    let request_path = format!("{}/{}/{}", portal::REQUEST_PATH_PREFIX, sender, token);

    // Subscribe before calling so the response cannot be missed
    let request = zbus::Proxy::new(
        &connection,
        portal::BUS_NAME,
        request_path.as_str(),
        portal::REQUEST_INTERFACE,
    )
    .await?;
    let mut responses = request.receive_signal("Response").await?;

    let mut options: HashMap<&str, zbus::zvariant::Value<'_>> = HashMap::new();
    options.insert("handle_token", zbus::zvariant::Value::from(token.as_str()));
    let handle: zbus::zvariant::OwnedObjectPath = proxy.call("AccessCamera", &(options,)).await?;
    debug!(handle = %handle.as_str(), "Camera access requested");

    let message = responses
        .next()
        .await
        .ok_or_else(|| zbus::Error::Failure("Portal request closed without response".to_string()))?;
    let (response, _results): (u32, HashMap<String, zbus::zvariant::OwnedValue>) =
        message.body().deserialize()?;

    // 0 = granted, 1 = cancelled, 2 = other
    Ok(response == 0)
}

/// Host authority: read/write access to the `/dev/video*` nodes
pub struct DeviceNodeAuthority {
    dev_dir: PathBuf,
    settings: SettingsLink,
}

impl DeviceNodeAuthority {
    pub fn new(settings: SettingsLink) -> Self {
        Self::with_dev_dir(PathBuf::from("/dev"), settings)
    }

    pub fn with_dev_dir(dev_dir: PathBuf, settings: SettingsLink) -> Self {
        Self { dev_dir, settings }
    }
}

impl CameraAuthority for DeviceNodeAuthority {
    fn authorization_status(&self) -> AuthorizationState {
        node_authorization(&self.dev_dir)
    }

    fn request_access(&self, reply: AccessReply) {
        // Device permissions cannot be granted interactively
        reply(self.authorization_status() == AuthorizationState::Authorized);
    }

    fn open_settings(&self) -> Result<(), String> {
        open_settings_link(&self.settings)
    }
}

/// Authorization from the first inaccessible video node
///
/// No nodes at all counts as authorized; the capture path reports the
/// missing device itself.
pub fn node_authorization(dev_dir: &Path) -> AuthorizationState {
    let Ok(entries) = std::fs::read_dir(dev_dir) else {
        return AuthorizationState::Authorized;
    };

    let mut nodes: Vec<PathBuf> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| {
            entry
                .file_name()
                .to_str()
                .and_then(|name| name.strip_prefix("video"))
                .is_some_and(|index| !index.is_empty() && index.chars().all(|c| c.is_ascii_digit()))
        })
        .map(|entry| entry.path())
        .collect();
    nodes.sort();

    for node in &nodes {
        let state = access_state(node);
        if state != AuthorizationState::Authorized {
            debug!(node = %node.display(), ?state, "Video node not accessible");
            return state;
        }
    }
    AuthorizationState::Authorized
}

fn access_state(node: &Path) -> AuthorizationState {
    let Ok(path) = CString::new(node.as_os_str().as_bytes()) else {
        return AuthorizationState::Unknown;
    };
    // SAFETY: `path` is a valid NUL-terminated string for the duration of the call
    let result = unsafe { libc::access(path.as_ptr(), libc::R_OK | libc::W_OK) };
    if result == 0 {
        return AuthorizationState::Authorized;
    }
    match std::io::Error::last_os_error().raw_os_error() {
        Some(libc::EACCES) => AuthorizationState::Denied,
        Some(libc::EPERM) | Some(libc::EROFS) => AuthorizationState::Restricted,
        _ => AuthorizationState::Unknown,
    }
}
