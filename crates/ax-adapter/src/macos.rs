//! macOS backend: `AXUIElement` for the tree, `NSWorkspace` for the
//! application list, `CGDisplay` for display geometry.
//!
//! Every attribute read is a copy out of the target process; failures are
//! normal (the element may be gone) and map to `None`. Only perform-action
//! and set-attribute calls surface host error codes.

use std::any::Any;
use std::ffi::c_void;
use std::sync::Arc;

use accessibility_sys::{
    kAXErrorSuccess, kAXTrustedCheckOptionPrompt, kAXValueTypeCGPoint, kAXValueTypeCGSize,
    AXIsProcessTrustedWithOptions, AXUIElementCopyActionNames, AXUIElementCopyAttributeValue,
    AXUIElementCopyElementAtPosition, AXUIElementCreateApplication, AXUIElementCreateSystemWide,
    AXUIElementGetPid, AXUIElementPerformAction, AXUIElementRef, AXUIElementSetAttributeValue,
    AXValueGetValue, AXValueRef,
};
use core_foundation::array::CFArray;
use core_foundation::base::{CFType, TCFType};
use core_foundation::boolean::CFBoolean;
use core_foundation::dictionary::CFDictionary;
use core_foundation::number::CFNumber;
use core_foundation::string::CFString;
use core_foundation_sys::base::{CFHash, CFRelease, CFRetain, CFTypeRef};
use core_graphics::display::CGDisplay;
use core_graphics::geometry::{CGPoint, CGSize};
use objc2_app_kit::{
    NSApplicationActivationOptions, NSApplicationActivationPolicy, NSRunningApplication,
    NSWorkspace,
};
use tracing::debug;

use axdriver_core_types::{DriverError, NodeHandle, NodeRef, Point, Rect, RunningApp, Size};

use crate::ports::{attr, AxPort, WorkspacePort};

/// Retained `AXUIElementRef` wrapper.
struct AxNode {
    element: AXUIElementRef,
}

// AXUIElement calls are thread-safe per the accessibility framework; the
// wrapper only carries an owned CF reference.
unsafe impl Send for AxNode {}
unsafe impl Sync for AxNode {}

impl AxNode {
    /// Take ownership of an element returned under the create rule.
    fn from_create(element: AXUIElementRef) -> NodeRef {
        Arc::new(AxNode { element })
    }

    /// Retain an element observed under the get rule.
    fn from_get(element: AXUIElementRef) -> NodeRef {
        unsafe { CFRetain(element as CFTypeRef) };
        Arc::new(AxNode { element })
    }
}

impl Drop for AxNode {
    fn drop(&mut self) {
        unsafe { CFRelease(self.element as CFTypeRef) };
    }
}

impl std::fmt::Debug for AxNode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "AxNode({:p})", self.element)
    }
}

impl NodeHandle for AxNode {
    fn identity(&self) -> u64 {
        // CFHash on AXUIElement hashes the remote token, so the same logical
        // element hashes equal across distinct wrapper reads.
        unsafe { CFHash(self.element as CFTypeRef) as u64 }
    }

    fn as_any(&self) -> &(dyn Any + Send + Sync) {
        self
    }
}

fn raw(node: &NodeRef) -> Option<AXUIElementRef> {
    node.as_any()
        .downcast_ref::<AxNode>()
        .map(|n| n.element)
}

/// Accessibility port backed by the live `AXUIElement` API.
#[derive(Default)]
pub struct MacAxPort;

impl MacAxPort {
    pub fn new() -> Self {
        Self
    }

    fn copy_attribute(&self, node: &NodeRef, name: &str) -> Option<CFType> {
        let element = raw(node)?;
        let cf_name = CFString::new(name);
        let mut value: CFTypeRef = std::ptr::null();
        let err = unsafe {
            AXUIElementCopyAttributeValue(element, cf_name.as_concrete_TypeRef(), &mut value)
        };
        if err != kAXErrorSuccess || value.is_null() {
            return None;
        }
        Some(unsafe { CFType::wrap_under_create_rule(value) })
    }

    fn element_list(&self, value: CFType) -> Vec<NodeRef> {
        let Some(array) = value.downcast_into::<CFArray<CFType>>() else {
            return Vec::new();
        };
        array
            .iter()
            .map(|item| AxNode::from_get(item.as_CFTypeRef() as AXUIElementRef))
            .collect()
    }
}

impl AxPort for MacAxPort {
    fn is_trusted(&self, prompt: bool) -> bool {
        let key = unsafe { CFString::wrap_under_get_rule(kAXTrustedCheckOptionPrompt) };
        let options = CFDictionary::from_CFType_pairs(&[(
            key.as_CFType(),
            CFBoolean::from(prompt).as_CFType(),
        )]);
        unsafe { AXIsProcessTrustedWithOptions(options.as_concrete_TypeRef()) }
    }

    fn string_attribute(&self, node: &NodeRef, attribute: &str) -> Option<String> {
        self.copy_attribute(node, attribute)?
            .downcast_into::<CFString>()
            .map(|s| s.to_string())
    }

    fn string_list_attribute(&self, node: &NodeRef, attribute: &str) -> Option<Vec<String>> {
        let array = self
            .copy_attribute(node, attribute)?
            .downcast_into::<CFArray<CFType>>()?;
        Some(
            array
                .iter()
                .filter_map(|item| item.downcast::<CFString>().map(|s| s.to_string()))
                .collect(),
        )
    }

    fn number_attribute(&self, node: &NodeRef, attribute: &str) -> Option<f64> {
        self.copy_attribute(node, attribute)?
            .downcast_into::<CFNumber>()?
            .to_f64()
    }

    fn point_attribute(&self, node: &NodeRef, attribute: &str) -> Option<Point> {
        let value = self.copy_attribute(node, attribute)?;
        let mut point = CGPoint::new(0.0, 0.0);
        let ok = unsafe {
            AXValueGetValue(
                value.as_CFTypeRef() as AXValueRef,
                kAXValueTypeCGPoint,
                &mut point as *mut CGPoint as *mut c_void,
            )
        };
        ok.then(|| Point::new(point.x, point.y))
    }

    fn size_attribute(&self, node: &NodeRef, attribute: &str) -> Option<Size> {
        let value = self.copy_attribute(node, attribute)?;
        let mut size = CGSize::new(0.0, 0.0);
        let ok = unsafe {
            AXValueGetValue(
                value.as_CFTypeRef() as AXValueRef,
                kAXValueTypeCGSize,
                &mut size as *mut CGSize as *mut c_void,
            )
        };
        ok.then(|| Size::new(size.width, size.height))
    }

    fn children(&self, node: &NodeRef) -> Vec<NodeRef> {
        match self.copy_attribute(node, attr::CHILDREN) {
            Some(value) => self.element_list(value),
            None => Vec::new(),
        }
    }

    fn parent(&self, node: &NodeRef) -> Option<NodeRef> {
        let value = self.copy_attribute(node, attr::PARENT)?;
        Some(AxNode::from_get(value.as_CFTypeRef() as AXUIElementRef))
    }

    fn node_list_attribute(&self, node: &NodeRef, attribute: &str) -> Vec<NodeRef> {
        match self.copy_attribute(node, attribute) {
            Some(value) => self.element_list(value),
            None => Vec::new(),
        }
    }

    fn action_names(&self, node: &NodeRef) -> Vec<String> {
        let Some(element) = raw(node) else {
            return Vec::new();
        };
        let mut names: core_foundation_sys::array::CFArrayRef = std::ptr::null();
        let err = unsafe { AXUIElementCopyActionNames(element, &mut names) };
        if err != kAXErrorSuccess || names.is_null() {
            return Vec::new();
        }
        let array: CFArray<CFType> = unsafe { CFArray::wrap_under_create_rule(names) };
        array
            .iter()
            .filter_map(|item| item.downcast::<CFString>().map(|s| s.to_string()))
            .collect()
    }

    fn perform_action(&self, node: &NodeRef, name: &str) -> Result<(), DriverError> {
        let element = raw(node).ok_or_else(|| DriverError::ActionFailed {
            action: name.to_string(),
            code: -1,
        })?;
        let cf_name = CFString::new(name);
        let err = unsafe { AXUIElementPerformAction(element, cf_name.as_concrete_TypeRef()) };
        if err != kAXErrorSuccess {
            debug!(action = name, code = err, "perform action rejected");
            return Err(DriverError::ActionFailed {
                action: name.to_string(),
                code: err,
            });
        }
        Ok(())
    }

    fn set_string_attribute(
        &self,
        node: &NodeRef,
        attribute: &str,
        value: &str,
    ) -> Result<(), DriverError> {
        let element = raw(node).ok_or_else(|| DriverError::ActionFailed {
            action: format!("set {}", attribute),
            code: -1,
        })?;
        let cf_name = CFString::new(attribute);
        let cf_value = CFString::new(value);
        let err = unsafe {
            AXUIElementSetAttributeValue(
                element,
                cf_name.as_concrete_TypeRef(),
                cf_value.as_CFTypeRef(),
            )
        };
        if err != kAXErrorSuccess {
            return Err(DriverError::ActionFailed {
                action: format!("set {}", attribute),
                code: err,
            });
        }
        Ok(())
    }

    fn set_focused(&self, node: &NodeRef, focused: bool) -> Result<(), DriverError> {
        let element = raw(node).ok_or_else(|| DriverError::ActionFailed {
            action: "set AXFocused".to_string(),
            code: -1,
        })?;
        let cf_name = CFString::new(attr::FOCUSED);
        let cf_value = CFBoolean::from(focused);
        let err = unsafe {
            AXUIElementSetAttributeValue(
                element,
                cf_name.as_concrete_TypeRef(),
                cf_value.as_CFTypeRef(),
            )
        };
        if err != kAXErrorSuccess {
            return Err(DriverError::ActionFailed {
                action: "set AXFocused".to_string(),
                code: err,
            });
        }
        Ok(())
    }

    fn application_root(&self, pid: i32) -> Option<NodeRef> {
        if !self.is_trusted(false) {
            return None;
        }
        let element = unsafe { AXUIElementCreateApplication(pid) };
        if element.is_null() {
            return None;
        }
        Some(AxNode::from_create(element))
    }

    fn element_at(&self, x: f64, y: f64) -> Option<NodeRef> {
        let system = unsafe { AXUIElementCreateSystemWide() };
        if system.is_null() {
            return None;
        }
        let mut out: AXUIElementRef = std::ptr::null_mut();
        let err =
            unsafe { AXUIElementCopyElementAtPosition(system, x as f32, y as f32, &mut out) };
        unsafe { CFRelease(system as CFTypeRef) };
        if err != kAXErrorSuccess || out.is_null() {
            return None;
        }
        Some(AxNode::from_create(out))
    }

    fn focused_node(&self) -> Option<NodeRef> {
        let system = unsafe { AXUIElementCreateSystemWide() };
        if system.is_null() {
            return None;
        }
        let holder = AxNode::from_create(system);
        let value = self.copy_attribute(&holder, "AXFocusedUIElement")?;
        Some(AxNode::from_get(value.as_CFTypeRef() as AXUIElementRef))
    }

    fn pid_of(&self, node: &NodeRef) -> Option<i32> {
        let element = raw(node)?;
        let mut pid: i32 = 0;
        let err = unsafe { AXUIElementGetPid(element, &mut pid) };
        (err == kAXErrorSuccess).then_some(pid)
    }
}

/// Workspace port backed by `NSWorkspace` and `CGDisplay`.
#[derive(Default)]
pub struct MacWorkspace;

impl MacWorkspace {
    pub fn new() -> Self {
        Self
    }
}

impl WorkspacePort for MacWorkspace {
    fn running_applications(&self) -> Vec<RunningApp> {
        let workspace = unsafe { NSWorkspace::sharedWorkspace() };
        let apps = unsafe { workspace.runningApplications() };
        apps.iter()
            .map(|app| unsafe {
                RunningApp {
                    pid: app.processIdentifier(),
                    name: app
                        .localizedName()
                        .map(|s| s.to_string())
                        .unwrap_or_default(),
                    bundle_id: app.bundleIdentifier().map(|s| s.to_string()),
                    regular: app.activationPolicy() == NSApplicationActivationPolicy::Regular,
                    frontmost: app.isActive(),
                    hidden: app.isHidden(),
                }
            })
            .collect()
    }

    fn activate(&self, pid: i32) -> Result<(), DriverError> {
        let app = unsafe { NSRunningApplication::runningApplicationWithProcessIdentifier(pid) }
            .ok_or_else(|| DriverError::AppNotRunning(format!("pid {}", pid)))?;
        unsafe {
            app.activateWithOptions(
                NSApplicationActivationOptions::NSApplicationActivationActivateIgnoringOtherApps,
            )
        };
        Ok(())
    }

    fn frontmost_application(&self) -> Option<RunningApp> {
        self.running_applications().into_iter().find(|a| a.frontmost)
    }

    fn primary_display_frame(&self) -> Option<Rect> {
        let display = CGDisplay::main();
        let bounds = display.bounds();
        Some(Rect::new(
            bounds.origin.x,
            bounds.origin.y,
            bounds.size.width,
            bounds.size.height,
        ))
    }
}
