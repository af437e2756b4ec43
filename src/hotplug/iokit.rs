//! IOKit first-match subscription
//!
//! One notification port on the main run loop, matched against the
//! multitouch device class. The arrival callback drains its iterator
//! (IOKit re-arms the notification only once the iterator is empty) and
//! then refreshes the registry under its mutex.

use core_foundation::base::CFTypeRef;
use core_foundation::runloop::kCFRunLoopCommonModes;
use parking_lot::Mutex;
use std::ffi::c_void;
use std::os::raw::c_char;
use std::sync::Arc;

use tracing::{debug, info, warn};

use crate::session::HotplugWatch;
use crate::touch::devices::macos::MacMultitouch;
use crate::touch::devices::DeviceRegistry;
use crate::{Error, Result};

type IoObject = u32;
type KernReturn = i32;
type IoNotificationPortRef = *mut c_void;
type IoServiceMatchingCallback = extern "C" fn(*mut c_void, IoObject);

const KERN_SUCCESS: KernReturn = 0;
/// Default main port; valid on macOS 12+ and equal to the legacy
/// kIOMasterPortDefault value on older systems.
const IO_MAIN_PORT_DEFAULT: u32 = 0;

const FIRST_MATCH_NOTIFICATION: &[u8] = b"IOServiceFirstMatch\0";
const MULTITOUCH_DEVICE_CLASS: &[u8] = b"AppleMultitouchDevice\0";

#[link(name = "IOKit", kind = "framework")]
extern "C" {
    fn IONotificationPortCreate(main_port: u32) -> IoNotificationPortRef;
    fn IONotificationPortGetRunLoopSource(port: IoNotificationPortRef) -> CFTypeRef;
    fn IONotificationPortDestroy(port: IoNotificationPortRef);

    fn IOServiceMatching(name: *const c_char) -> *mut c_void;
    fn IOServiceAddMatchingNotification(
        port: IoNotificationPortRef,
        notification_type: *const c_char,
        matching: *mut c_void,
        callback: IoServiceMatchingCallback,
        refcon: *mut c_void,
        iterator: *mut IoObject,
    ) -> KernReturn;

    fn IOIteratorNext(iterator: IoObject) -> IoObject;
    fn IOObjectRelease(object: IoObject) -> KernReturn;
}

#[link(name = "CoreFoundation", kind = "framework")]
extern "C" {
    fn CFRunLoopGetMain() -> CFTypeRef;
    fn CFRunLoopAddSource(rl: CFTypeRef, source: CFTypeRef, mode: CFTypeRef);
    fn CFRunLoopRemoveSource(rl: CFTypeRef, source: CFTypeRef, mode: CFTypeRef);
}

/// Refcon handed to the arrival callback.
struct RefreshTarget {
    registry: Arc<Mutex<DeviceRegistry<MacMultitouch>>>,
}

/// Arrival callback: drain the iterator, then refresh the device set.
///
/// Draining is mandatory even though the objects themselves are unused;
/// IOKit only delivers the next notification once the iterator is empty.
extern "C" fn device_arrived(refcon: *mut c_void, iterator: IoObject) {
    let mut drained = 0u32;
    loop {
        let object = unsafe { IOIteratorNext(iterator) };
        if object == 0 {
            break;
        }
        unsafe { IOObjectRelease(object) };
        drained += 1;
    }

    if refcon.is_null() {
        return;
    }
    // Safety: refcon is the Box<RefreshTarget> installed by subscribe();
    // unsubscribe() destroys the notification port before freeing it, so
    // no further callbacks can observe a dangling pointer.
    let target = unsafe { &*(refcon as *const RefreshTarget) };

    info!(arrived = drained, "multitouch device attached, refreshing");
    if let Err(e) = target.registry.lock().refresh() {
        // Arrival races against removal; an empty enumeration here is not
        // fatal to the session, the next arrival will refresh again.
        warn!(error = %e, "device refresh after hot-plug failed");
    }
}

/// Live subscription state, torn down as a unit.
struct Subscription {
    port: IoNotificationPortRef,
    source: CFTypeRef,
    iterator: IoObject,
    refcon: *mut RefreshTarget,
}

/// [`HotplugWatch`] over IOKit matching notifications.
pub struct IoKitWatcher {
    registry: Arc<Mutex<DeviceRegistry<MacMultitouch>>>,
    subscription: Option<Subscription>,
}

// Safety: the raw subscription pointers are only created and destroyed
// through &mut self; the callback runs on the main run loop and touches
// the registry only through its mutex.
unsafe impl Send for IoKitWatcher {}

impl IoKitWatcher {
    pub fn new(registry: Arc<Mutex<DeviceRegistry<MacMultitouch>>>) -> Self {
        Self {
            registry,
            subscription: None,
        }
    }
}

impl HotplugWatch for IoKitWatcher {
    fn subscribe(&mut self) -> Result<()> {
        if self.subscription.is_some() {
            return Ok(());
        }

        let port = unsafe { IONotificationPortCreate(IO_MAIN_PORT_DEFAULT) };
        if port.is_null() {
            return Err(Error::Notification(
                "failed to create IOKit notification port".into(),
            ));
        }

        // Ownership of the matching dictionary transfers to
        // IOServiceAddMatchingNotification.
        let matching =
            unsafe { IOServiceMatching(MULTITOUCH_DEVICE_CLASS.as_ptr() as *const c_char) };
        if matching.is_null() {
            unsafe { IONotificationPortDestroy(port) };
            return Err(Error::Notification(
                "failed to create device matching dictionary".into(),
            ));
        }

        let refcon = Box::into_raw(Box::new(RefreshTarget {
            registry: Arc::clone(&self.registry),
        }));

        let mut iterator: IoObject = 0;
        let kr = unsafe {
            IOServiceAddMatchingNotification(
                port,
                FIRST_MATCH_NOTIFICATION.as_ptr() as *const c_char,
                matching,
                device_arrived,
                refcon as *mut c_void,
                &mut iterator,
            )
        };
        if kr != KERN_SUCCESS {
            unsafe {
                IONotificationPortDestroy(port);
                drop(Box::from_raw(refcon));
            }
            return Err(Error::Notification(format!(
                "IOServiceAddMatchingNotification failed: kern return {kr}"
            )));
        }

        // Drain the already-attached devices; this arms the notification.
        let mut present = 0u32;
        loop {
            let object = unsafe { IOIteratorNext(iterator) };
            if object == 0 {
                break;
            }
            unsafe { IOObjectRelease(object) };
            present += 1;
        }
        debug!(present, "armed device arrival notification");

        let source = unsafe { IONotificationPortGetRunLoopSource(port) };
        unsafe {
            CFRunLoopAddSource(
                CFRunLoopGetMain(),
                source,
                kCFRunLoopCommonModes as CFTypeRef,
            );
        }

        self.subscription = Some(Subscription {
            port,
            source,
            iterator,
            refcon,
        });
        Ok(())
    }

    fn unsubscribe(&mut self) {
        let Some(sub) = self.subscription.take() else {
            return;
        };
        unsafe {
            CFRunLoopRemoveSource(
                CFRunLoopGetMain(),
                sub.source,
                kCFRunLoopCommonModes as CFTypeRef,
            );
            IOObjectRelease(sub.iterator);
            // Destroying the port also invalidates its run loop source and
            // guarantees no further callbacks before the refcon is freed.
            IONotificationPortDestroy(sub.port);
            drop(Box::from_raw(sub.refcon));
        }
        debug!("device arrival notification removed");
    }
}

impl Drop for IoKitWatcher {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}
