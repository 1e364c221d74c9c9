// SPDX-License-Identifier: GPL-3.0-only

//! Camera discovery for the PipeWire and V4L2 source elements

use super::types::{CameraBackendType, CameraDevice};
use std::path::Path;
use tracing::{debug, info, warn};

/// Whether GStreamer can build the source element for `backend`
pub fn is_backend_available(backend: CameraBackendType) -> bool {
    if let Err(e) = gstreamer::init() {
        warn!(error = %e, "GStreamer init failed");
        return false;
    }
    gstreamer::ElementFactory::find(backend.source_element()).is_some()
}

/// List cameras reachable through `backend`
///
/// PipeWire always yields at least its auto-selected default camera when
/// `pipewiresrc` is installed.
pub fn enumerate_cameras(backend: CameraBackendType) -> Vec<CameraDevice> {
    if !is_backend_available(backend) {
        debug!(%backend, element = backend.source_element(), "Source element not available");
        return Vec::new();
    }

    let cameras = match backend {
        CameraBackendType::PipeWire => {
            let mut cameras = enumerate_with_pw_cli().unwrap_or_default();
            if cameras.is_empty() {
                info!("Using PipeWire auto-selection (default camera)");
                cameras.push(CameraDevice::pipewire_default());
            }
            cameras
        }
        CameraBackendType::V4l2 => enumerate_video_nodes(Path::new("/dev")),
    };

    debug!(%backend, count = cameras.len(), "Enumerated cameras");
    cameras
}

fn enumerate_with_pw_cli() -> Option<Vec<CameraDevice>> {
    let output = std::process::Command::new("pw-cli")
        .args(["ls", "Node"])
        .output()
        .ok()?;

    if !output.status.success() {
        debug!("pw-cli command failed");
        return None;
    }

    Some(parse_pw_cli_nodes(&String::from_utf8_lossy(&output.stdout)))
}

#[derive(Default)]
struct NodeEntry {
    id: Option<String>,
    serial: Option<String>,
    description: Option<String>,
    nick: Option<String>,
    video_source: bool,
}

impl NodeEntry {
    fn into_device(self) -> Option<CameraDevice> {
        if !self.video_source {
            return None;
        }
        let id = self.id?;
        let name = self.description.or(self.nick)?;
        let path = match self.serial {
            Some(serial) => format!("pipewire-serial-{}", serial),
            None => format!("pipewire-{}", id),
        };
        Some(CameraDevice {
            name,
            path,
            backend: CameraBackendType::PipeWire,
        })
    }
}

/// Extract video sources from `pw-cli ls Node` output
pub fn parse_pw_cli_nodes(output: &str) -> Vec<CameraDevice> {
    let mut cameras = Vec::new();
    let mut current = NodeEntry::default();

    for line in output.lines() {
        let trimmed = line.trim();

        // "id 76, type PipeWire:Interface:Node/3"
        if let Some(rest) = trimmed.strip_prefix("id ")
            && trimmed.contains("type PipeWire:Interface:Node")
        {
            cameras.extend(std::mem::take(&mut current).into_device());
            current.id = rest.split(',').next().map(|id| id.trim().to_string());
            continue;
        }

        let Some((key, _)) = trimmed.split_once('=') else {
            continue;
        };
        match key.trim() {
            "media.class" => {
                current.video_source = extract_quoted_value(trimmed).as_deref() == Some("Video/Source")
            }
            "object.serial" => current.serial = extract_quoted_value(trimmed),
            "node.description" => current.description = extract_quoted_value(trimmed),
            "node.nick" => current.nick = extract_quoted_value(trimmed),
            _ => {}
        }
    }
    cameras.extend(current.into_device());

    cameras
}

fn extract_quoted_value(line: &str) -> Option<String> {
    let start = line.find('"')?;
    let end = line[start + 1..].find('"')?;
    Some(line[start + 1..start + 1 + end].to_string())
}

/// `/dev/videoN` nodes in numeric order, named from sysfs when possible
pub fn enumerate_video_nodes(dev_dir: &Path) -> Vec<CameraDevice> {
    let Ok(entries) = std::fs::read_dir(dev_dir) else {
        return Vec::new();
    };

    let mut nodes: Vec<(u32, String)> = entries
        .filter_map(|entry| entry.ok())
        .filter_map(|entry| {
            let name = entry.file_name().to_string_lossy().into_owned();
            let index = name.strip_prefix("video")?.parse::<u32>().ok()?;
            Some((index, name))
        })
        .collect();
    nodes.sort();

    nodes
        .into_iter()
        .map(|(index, node)| {
            let name = std::fs::read_to_string(format!("/sys/class/video4linux/{}/name", node))
                .map(|s| s.trim().to_string())
                .ok()
                .filter(|s| !s.is_empty())
                .unwrap_or_else(|| format!("Video device {}", index));
            CameraDevice {
                name,
                path: dev_dir.join(&node).to_string_lossy().into_owned(),
                backend: CameraBackendType::V4l2,
            }
        })
        .collect()
}
