//! Device registry
//!
//! Owns the set of multitouch devices for the lifetime of a session.
//! The registration semantics (enumerate, register, unregister, refresh)
//! are generic over a narrow [`MultitouchApi`] capability so they can be
//! exercised without hardware; the macOS binding to the private
//! MultitouchSupport framework lives in [`macos`].

use tracing::{debug, info};

use crate::{Error, Result};

/// Narrow capability over the platform's multitouch API.
///
/// The registry only needs to list devices, start frame delivery on a
/// handle, and stop/release a handle. The contact-frame observer itself is
/// fixed by the implementation (it writes the finger count to the shared
/// [`TouchState`](crate::TouchState) and nothing else).
pub trait MultitouchApi {
    /// Opaque reference to one physical multitouch device.
    type Handle: Copy + PartialEq + std::fmt::Debug;

    /// Enumerate attached devices.
    ///
    /// `None` means list creation itself failed; `Some(vec)` may be empty
    /// when no devices are attached. Both are fatal to the caller.
    fn create_list(&self) -> Option<Vec<Self::Handle>>;

    /// Whether the platform handed back a null/invalid handle.
    fn is_null(&self, handle: Self::Handle) -> bool;

    /// Install the contact-frame observer and start frame delivery.
    fn start_frames(&self, handle: Self::Handle);

    /// Remove the observer, stop delivery, and release the handle.
    fn stop_and_release(&self, handle: Self::Handle);
}

/// Registry of multitouch devices with contact-frame observers installed.
///
/// The device set is replaced wholesale on every refresh: the old set is
/// fully torn down before the new one registers, so the touch-state writer
/// never references a released device for more than one refresh cycle.
pub struct DeviceRegistry<A: MultitouchApi> {
    api: A,
    devices: Vec<A::Handle>,
}

impl<A: MultitouchApi> DeviceRegistry<A> {
    /// Create an empty registry. No devices are enumerated until
    /// [`init`](Self::init) runs.
    pub fn new(api: A) -> Self {
        Self {
            api,
            devices: Vec::new(),
        }
    }

    /// Enumerate devices and register the initial set.
    ///
    /// Fails with [`Error::Devices`] when the platform reports zero devices
    /// or enumeration itself fails; this is a hard dependency absence, not
    /// a retryable condition.
    pub fn init(&mut self) -> Result<usize> {
        let set = self.enumerate()?;
        self.register(set);
        Ok(self.devices.len())
    }

    fn enumerate(&self) -> Result<Vec<A::Handle>> {
        let set = self
            .api
            .create_list()
            .ok_or_else(|| Error::Devices("failed to create device list".into()))?;
        if set.is_empty() {
            return Err(Error::Devices("no multitouch devices found".into()));
        }
        Ok(set)
    }

    fn register(&mut self, set: Vec<A::Handle>) {
        for &handle in &set {
            // Null handles are skipped silently, matching the platform's
            // own tolerance for sparse device arrays.
            if !self.api.is_null(handle) {
                self.api.start_frames(handle);
                debug!(?handle, "registered contact-frame observer");
            }
        }
        self.devices = set;
    }

    /// Remove observers, stop frame delivery, and release every handle.
    ///
    /// Safe on an empty or partially-initialized set, and safe to call
    /// more than once: the set is drained so a second call is a no-op.
    pub fn unregister_all(&mut self) {
        for handle in self.devices.drain(..) {
            if !self.api.is_null(handle) {
                self.api.stop_and_release(handle);
            }
        }
    }

    /// Tear down the current set, re-enumerate, and register the new set.
    ///
    /// The caller serializes refresh against session setup/teardown (the
    /// registry lives behind a mutex), so there is no window in which a
    /// released device still feeds the touch state.
    pub fn refresh(&mut self) -> Result<usize> {
        self.unregister_all();
        let count = self.init()?;
        info!(devices = count, "device set refreshed");
        Ok(count)
    }

    /// Number of devices currently registered.
    pub fn device_count(&self) -> usize {
        self.devices.len()
    }

    /// The currently registered handles, in enumeration order.
    pub fn devices(&self) -> &[A::Handle] {
        &self.devices
    }
}

/// Binding to the private MultitouchSupport framework.
#[cfg(target_os = "macos")]
pub mod macos {
    use super::MultitouchApi;
    use crate::touch::state::TouchState;
    use std::ffi::c_void;
    use std::ptr;
    use std::sync::atomic::{AtomicPtr, Ordering};
    use std::sync::Arc;

    // The multitouch API is private and undocumented. The types below are
    // based on reverse-engineered information; they may change or break
    // without notice and are not allowed on the Mac App Store.

    /// Normalized point reported per finger.
    #[repr(C)]
    #[derive(Copy, Clone, Debug)]
    pub struct MtPoint {
        pub x: f32,
        pub y: f32,
    }

    /// Position plus velocity readout.
    #[repr(C)]
    #[derive(Copy, Clone, Debug)]
    pub struct MtReadout {
        pub pos: MtPoint,
        pub vel: MtPoint,
    }

    /// Per-finger state in a contact frame.
    ///
    /// Only the frame-level finger count is consumed; the full layout is
    /// reproduced because the callback ABI requires it.
    #[repr(C)]
    #[derive(Copy, Clone, Debug)]
    pub struct Finger {
        pub frame: i32,
        pub timestamp: f64,
        pub identifier: i32,
        pub state: i32,
        pub unknown3: i32,
        pub unknown4: i32,
        pub normalized: MtReadout,
        pub size: f32,
        pub zero1: i32,
        pub angle: f32,
        pub major_axis: f32,
        pub minor_axis: f32,
        pub mm: MtReadout,
        pub zero2: [i32; 2],
        pub unknown2: f32,
    }

    type MTDeviceRef = *mut c_void;
    type MTContactCallback = extern "C" fn(i32, *mut Finger, i32, f64, i32) -> i32;
    type CFMutableArrayRef = *mut c_void;
    type CFIndex = isize;

    #[link(name = "MultitouchSupport", kind = "framework")]
    extern "C" {
        fn MTDeviceCreateList() -> CFMutableArrayRef;
        fn MTRegisterContactFrameCallback(device: MTDeviceRef, callback: MTContactCallback);
        fn MTDeviceStart(device: MTDeviceRef, mode: i32);
        fn MTDeviceStop(device: MTDeviceRef);
        fn MTUnregisterContactFrameCallback(device: MTDeviceRef, callback: MTContactCallback);
        fn MTDeviceRelease(device: MTDeviceRef);
    }

    #[link(name = "CoreFoundation", kind = "framework")]
    extern "C" {
        fn CFArrayGetCount(array: CFMutableArrayRef) -> CFIndex;
        fn CFArrayGetValueAtIndex(array: CFMutableArrayRef, idx: CFIndex) -> *const c_void;
        fn CFRetain(cf: *const c_void) -> *const c_void;
        fn CFRelease(cf: *const c_void);
    }

    /// Shared touch-state pointer for the contact-frame callback.
    ///
    /// MTRegisterContactFrameCallback carries no refcon, so the callback
    /// reads the state through this pointer. It is bound by
    /// [`MacMultitouch::new`] and cleared (and the Arc released) on drop.
    static TOUCH_PTR: AtomicPtr<TouchState> = AtomicPtr::new(ptr::null_mut());

    /// Contact-frame observer installed on every registered device.
    ///
    /// Runs on the framework's delivery context: O(1), no allocation, no
    /// I/O. Only the finger count is extracted.
    extern "C" fn contact_frame_callback(
        _device: i32,
        _fingers: *mut Finger,
        finger_count: i32,
        _timestamp: f64,
        _frame: i32,
    ) -> i32 {
        let state = TOUCH_PTR.load(Ordering::Relaxed);
        if !state.is_null() {
            // Safety: the pointer came from Arc::into_raw and stays alive
            // until drop clears TOUCH_PTR before releasing the Arc.
            unsafe { (*state).record_frame(finger_count) };
        }
        0
    }

    /// [`MultitouchApi`] over the MultitouchSupport framework.
    ///
    /// One instance per session; constructing it binds the shared touch
    /// state for the process-wide contact callback.
    pub struct MacMultitouch {
        _touch: Arc<TouchState>,
    }

    // Safety: the raw device handles this API hands out are only touched
    // through the registry, whose access is serialized by the session's
    // mutex. The framework itself delivers frames on its own context.
    unsafe impl Send for MacMultitouch {}

    impl MacMultitouch {
        pub fn new(touch: Arc<TouchState>) -> Self {
            let raw = Arc::into_raw(Arc::clone(&touch)) as *mut TouchState;
            let previous = TOUCH_PTR.swap(raw, Ordering::SeqCst);
            if !previous.is_null() {
                // A prior session left its binding in place; release it.
                unsafe { drop(Arc::from_raw(previous)) };
            }
            Self { _touch: touch }
        }
    }

    impl Drop for MacMultitouch {
        fn drop(&mut self) {
            let raw = TOUCH_PTR.swap(ptr::null_mut(), Ordering::SeqCst);
            if !raw.is_null() {
                unsafe { drop(Arc::from_raw(raw)) };
            }
        }
    }

    impl MultitouchApi for MacMultitouch {
        type Handle = MTDeviceRef;

        fn create_list(&self) -> Option<Vec<Self::Handle>> {
            // Safety: MTDeviceCreateList returns an owned CFArray or null.
            let array = unsafe { MTDeviceCreateList() };
            if array.is_null() {
                return None;
            }

            let count = unsafe { CFArrayGetCount(array) };
            let mut handles = Vec::with_capacity(count.max(0) as usize);
            for i in 0..count {
                let device = unsafe { CFArrayGetValueAtIndex(array, i) } as MTDeviceRef;
                if !device.is_null() {
                    // The array owns its elements; take an extra reference
                    // so each handle survives the array release below and
                    // balances the MTDeviceRelease in stop_and_release.
                    unsafe { CFRetain(device as *const c_void) };
                }
                handles.push(device);
            }

            unsafe { CFRelease(array as *const c_void) };
            Some(handles)
        }

        fn is_null(&self, handle: Self::Handle) -> bool {
            handle.is_null()
        }

        fn start_frames(&self, handle: Self::Handle) {
            unsafe {
                MTRegisterContactFrameCallback(handle, contact_frame_callback);
                MTDeviceStart(handle, 0);
            }
        }

        fn stop_and_release(&self, handle: Self::Handle) {
            unsafe {
                MTUnregisterContactFrameCallback(handle, contact_frame_callback);
                MTDeviceStop(handle);
                MTDeviceRelease(handle);
            }
        }
    }
}
