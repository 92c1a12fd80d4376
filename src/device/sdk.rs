//! Dynamic bindings to the ZWO `ASICamera2` SDK.
//!
//! The library is located at runtime by trying a list of candidate paths in
//! order; the first that loads and exports every required symbol wins.
//! Functions here return the SDK's raw integer codes; mapping them to
//! [`AsiCode`](crate::error::AsiCode) happens in [`super::real`].
#![allow(unsafe_code)]

use std::ffi::{c_char, c_double, c_float, c_int, c_long, c_uchar};
use std::path::{Path, PathBuf};

use libloading::Library;
use tracing::{debug, info, warn};

use crate::error::{CamError, Result};

/// `ASI_CAMERA_INFO` as laid out in `ASICamera2.h`.
#[repr(C)]
pub(super) struct AsiCameraInfo {
    pub name: [c_char; 64],
    pub camera_id: c_int,
    pub max_height: c_long,
    pub max_width: c_long,
    pub is_color_cam: c_int,
    pub bayer_pattern: c_int,
    pub supported_bins: [c_int; 16],
    pub supported_video_format: [c_int; 8],
    pub pixel_size: c_double,
    pub mechanical_shutter: c_int,
    pub st4_port: c_int,
    pub is_cooler_cam: c_int,
    pub is_usb3_host: c_int,
    pub is_usb3_camera: c_int,
    pub elec_per_adu: c_float,
    pub bit_depth: c_int,
    pub is_trigger_cam: c_int,
    pub unused: [c_char; 16],
}

impl AsiCameraInfo {
    pub(super) const fn zeroed() -> Self {
        Self {
            name: [0; 64],
            camera_id: 0,
            max_height: 0,
            max_width: 0,
            is_color_cam: 0,
            bayer_pattern: 0,
            supported_bins: [0; 16],
            supported_video_format: [0; 8],
            pixel_size: 0.0,
            mechanical_shutter: 0,
            st4_port: 0,
            is_cooler_cam: 0,
            is_usb3_host: 0,
            is_usb3_camera: 0,
            elec_per_adu: 0.0,
            bit_depth: 0,
            is_trigger_cam: 0,
            unused: [0; 16],
        }
    }

    /// Sensor name up to the first NUL.
    pub(super) fn name(&self) -> String {
        let bytes: Vec<u8> = self
            .name
            .iter()
            .take_while(|&&c| c != 0)
            .map(|&c| c as u8)
            .collect();
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

type GetNumOfConnectedCameras = unsafe extern "C" fn() -> c_int;
type GetCameraProperty = unsafe extern "C" fn(info: *mut AsiCameraInfo, index: c_int) -> c_int;
type CameraCall = unsafe extern "C" fn(camera_id: c_int) -> c_int;
type SetRoiFormat = unsafe extern "C" fn(
    camera_id: c_int,
    width: c_int,
    height: c_int,
    bin: c_int,
    img_type: c_int,
) -> c_int;
type SetControlValue =
    unsafe extern "C" fn(camera_id: c_int, control: c_int, value: c_long, auto: c_int) -> c_int;
type GetControlValue = unsafe extern "C" fn(
    camera_id: c_int,
    control: c_int,
    value: *mut c_long,
    auto: *mut c_int,
) -> c_int;
type GetVideoData =
    unsafe extern "C" fn(camera_id: c_int, buffer: *mut c_uchar, size: c_long, wait_ms: c_int) -> c_int;
type StartExposure = unsafe extern "C" fn(camera_id: c_int, is_dark: c_int) -> c_int;
type GetExpStatus = unsafe extern "C" fn(camera_id: c_int, status: *mut c_int) -> c_int;
type GetDataAfterExp =
    unsafe extern "C" fn(camera_id: c_int, buffer: *mut c_uchar, size: c_long) -> c_int;

/// Loaded SDK function table.
pub struct AsiSdk {
    get_num_of_connected_cameras: GetNumOfConnectedCameras,
    get_camera_property: GetCameraProperty,
    open_camera: CameraCall,
    init_camera: CameraCall,
    close_camera: CameraCall,
    set_roi_format: SetRoiFormat,
    set_control_value: SetControlValue,
    get_control_value: GetControlValue,
    start_video_capture: CameraCall,
    stop_video_capture: CameraCall,
    get_video_data: GetVideoData,
    start_exposure: StartExposure,
    stop_exposure: CameraCall,
    get_exp_status: GetExpStatus,
    get_data_after_exp: GetDataAfterExp,
    // Keeps the function pointers above valid.
    _library: Library,
}

// SAFETY: the table only holds immutable function pointers into a library
// that lives as long as the struct; the SDK itself is thread-safe across
// cameras and callers serialize access per camera.
unsafe impl Send for AsiSdk {}
unsafe impl Sync for AsiSdk {}

fn symbol<T: Copy>(library: &Library, name: &[u8]) -> Result<T> {
    // SAFETY: every `T` used with this helper is the exact C signature from
    // ASICamera2.h for the symbol being looked up.
    unsafe { library.get::<T>(name) }
        .map(|sym| *sym)
        .map_err(|e| {
            CamError::SdkUnavailable(format!(
                "missing symbol {}: {e}",
                String::from_utf8_lossy(name.strip_suffix(b"\0").unwrap_or(name))
            ))
        })
}

impl AsiSdk {
    /// Load the SDK from one specific path.
    pub fn load(path: &Path) -> Result<Self> {
        // SAFETY: loading runs the library's initializers; libASICamera2 has
        // no initialization side effects beyond its own globals.
        let library = unsafe { Library::new(path) }
            .map_err(|e| CamError::SdkUnavailable(format!("{}: {e}", path.display())))?;

        Ok(Self {
            get_num_of_connected_cameras: symbol(&library, b"ASIGetNumOfConnectedCameras\0")?,
            get_camera_property: symbol(&library, b"ASIGetCameraProperty\0")?,
            open_camera: symbol(&library, b"ASIOpenCamera\0")?,
            init_camera: symbol(&library, b"ASIInitCamera\0")?,
            close_camera: symbol(&library, b"ASICloseCamera\0")?,
            set_roi_format: symbol(&library, b"ASISetROIFormat\0")?,
            set_control_value: symbol(&library, b"ASISetControlValue\0")?,
            get_control_value: symbol(&library, b"ASIGetControlValue\0")?,
            start_video_capture: symbol(&library, b"ASIStartVideoCapture\0")?,
            stop_video_capture: symbol(&library, b"ASIStopVideoCapture\0")?,
            get_video_data: symbol(&library, b"ASIGetVideoData\0")?,
            start_exposure: symbol(&library, b"ASIStartExposure\0")?,
            stop_exposure: symbol(&library, b"ASIStopExposure\0")?,
            get_exp_status: symbol(&library, b"ASIGetExpStatus\0")?,
            get_data_after_exp: symbol(&library, b"ASIGetDataAfterExp\0")?,
            _library: library,
        })
    }

    /// Try each candidate in order and keep the first library that loads.
    pub fn discover(candidates: &[PathBuf]) -> Result<Self> {
        let mut failures = Vec::new();
        for path in candidates {
            debug!(path = %path.display(), "Trying camera SDK");
            match Self::load(path) {
                Ok(sdk) => {
                    info!(path = %path.display(), "Loaded camera SDK");
                    return Ok(sdk);
                }
                Err(e) => {
                    warn!(path = %path.display(), error = %e, "Camera SDK not loadable");
                    failures.push(path.display().to_string());
                }
            }
        }
        Err(CamError::SdkUnavailable(format!(
            "no loadable libASICamera2 (tried: {})",
            failures.join(", ")
        )))
    }

    pub(super) fn num_connected(&self) -> c_int {
        // SAFETY: no arguments.
        unsafe { (self.get_num_of_connected_cameras)() }
    }

    pub(super) fn property(&self, index: c_int, info: &mut AsiCameraInfo) -> c_int {
        // SAFETY: `info` is a valid, exclusively borrowed ASI_CAMERA_INFO.
        unsafe { (self.get_camera_property)(info, index) }
    }

    pub(super) fn open(&self, id: c_int) -> c_int {
        // SAFETY: plain integer argument.
        unsafe { (self.open_camera)(id) }
    }

    pub(super) fn init(&self, id: c_int) -> c_int {
        // SAFETY: plain integer argument.
        unsafe { (self.init_camera)(id) }
    }

    pub(super) fn close(&self, id: c_int) -> c_int {
        // SAFETY: plain integer argument.
        unsafe { (self.close_camera)(id) }
    }

    pub(super) fn roi_format(&self, id: c_int, w: c_int, h: c_int, bin: c_int, kind: c_int) -> c_int {
        // SAFETY: plain integer arguments.
        unsafe { (self.set_roi_format)(id, w, h, bin, kind) }
    }

    pub(super) fn set_control(&self, id: c_int, control: c_int, value: c_long, auto: c_int) -> c_int {
        // SAFETY: plain integer arguments.
        unsafe { (self.set_control_value)(id, control, value, auto) }
    }

    pub(super) fn get_control(&self, id: c_int, control: c_int) -> (c_int, c_long, c_int) {
        let mut value: c_long = 0;
        let mut auto: c_int = 0;
        // SAFETY: both out-pointers reference live locals.
        let rc = unsafe { (self.get_control_value)(id, control, &mut value, &mut auto) };
        (rc, value, auto)
    }

    pub(super) fn start_video(&self, id: c_int) -> c_int {
        // SAFETY: plain integer argument.
        unsafe { (self.start_video_capture)(id) }
    }

    pub(super) fn stop_video(&self, id: c_int) -> c_int {
        // SAFETY: plain integer argument.
        unsafe { (self.stop_video_capture)(id) }
    }

    pub(super) fn video_data(&self, id: c_int, buffer: &mut [u8], wait_ms: c_int) -> c_int {
        // SAFETY: the SDK writes at most `len` bytes into `buffer`.
        unsafe { (self.get_video_data)(id, buffer.as_mut_ptr(), buffer.len() as c_long, wait_ms) }
    }

    pub(super) fn begin_exposure(&self, id: c_int, dark: c_int) -> c_int {
        // SAFETY: plain integer arguments.
        unsafe { (self.start_exposure)(id, dark) }
    }

    pub(super) fn abort_exposure(&self, id: c_int) -> c_int {
        // SAFETY: plain integer argument.
        unsafe { (self.stop_exposure)(id) }
    }

    pub(super) fn exposure_status(&self, id: c_int) -> (c_int, c_int) {
        let mut status: c_int = 0;
        // SAFETY: out-pointer references a live local.
        let rc = unsafe { (self.get_exp_status)(id, &mut status) };
        (rc, status)
    }

    pub(super) fn exposure_data(&self, id: c_int, buffer: &mut [u8]) -> c_int {
        // SAFETY: the SDK writes at most `len` bytes into `buffer`.
        unsafe { (self.get_data_after_exp)(id, buffer.as_mut_ptr(), buffer.len() as c_long) }
    }
}

/// Standard install locations for the SDK on this platform, in search order.
pub fn default_library_paths() -> Vec<PathBuf> {
    let names: &[&str] = if cfg!(target_os = "macos") {
        &[
            "/usr/local/lib/libASICamera2.dylib",
            "/opt/homebrew/lib/libASICamera2.dylib",
            "libASICamera2.dylib",
        ]
    } else if cfg!(target_os = "windows") {
        &["ASICamera2.dll"]
    } else {
        &[
            "/usr/local/lib/libASICamera2.so",
            "/usr/lib/libASICamera2.so",
            "libASICamera2.so",
        ]
    };
    names.iter().map(PathBuf::from).collect()
}
