// SPDX-License-Identifier: GPL-3.0-only

//! Camera list normalisation shared by all backends

use super::types::CameraDevice;

/// Fill in missing labels and move rear-facing cameras to the front
///
/// Devices with an empty label get `Camera <id>`. The sort is stable, so
/// cameras keep their backend order within the rear and non-rear groups.
pub fn order_devices(mut devices: Vec<CameraDevice>) -> Vec<CameraDevice> {
    for device in &mut devices {
        if device.label.trim().is_empty() {
            device.label = format!("Camera {}", device.id);
        }
    }

    devices.sort_by_key(|device| !device.is_rear_facing());
    devices
}

/// Default selection: the first camera after ordering
pub fn default_camera(devices: &[CameraDevice]) -> Option<&CameraDevice> {
    devices.first()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(devices: &[CameraDevice]) -> Vec<&str> {
        devices.iter().map(|d| d.id.as_str()).collect()
    }

    #[test]
    fn test_back_camera_first() {
        let devices = vec![
            CameraDevice::new("a", "Front Camera"),
            CameraDevice::new("b", "Back Camera"),
        ];
        assert_eq!(ids(&order_devices(devices)), vec!["b", "a"]);
    }

    #[test]
    fn test_relative_order_preserved() {
        let devices = vec![
            CameraDevice::new("1", "USB webcam"),
            CameraDevice::new("2", "rear ultra wide"),
            CameraDevice::new("3", "Front"),
            CameraDevice::new("4", "BACK main"),
            CameraDevice::new("5", "Capture card"),
        ];
        assert_eq!(ids(&order_devices(devices)), vec!["2", "4", "1", "3", "5"]);
    }

    #[test]
    fn test_synthetic_label_from_id() {
        let ordered = order_devices(vec![CameraDevice::new("/dev/video2", "  ")]);
        assert_eq!(ordered[0].label, "Camera /dev/video2");
    }

    #[test]
    fn test_default_camera() {
        assert!(default_camera(&[]).is_none());
        let ordered = order_devices(vec![
            CameraDevice::new("front", "Front"),
            CameraDevice::new("rear", "Rear"),
        ]);
        assert_eq!(default_camera(&ordered).map(|d| d.id.as_str()), Some("rear"));
    }
}
