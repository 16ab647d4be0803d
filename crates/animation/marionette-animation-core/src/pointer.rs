//! Pointer input for gaze tracking.
//!
//! The engine never registers listeners on a display surface itself. Hosts hand it a
//! [`PointerSource`]; installing one is "registering", dropping it is "unregistering".
//! [`PointerQueue`] is the stock source: clone it, feed it from the host's mouse/touch
//! handlers, and give the other clone to the avatar.

use serde::{Deserialize, Serialize};
use std::cell::RefCell;
use std::collections::VecDeque;
use std::rc::Rc;

use crate::tracking::Vec2;

#[derive(Copy, Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PointerKind {
    Mouse,
    Touch,
    Pen,
}

/// A pointer position in device (client) coordinates.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct PointerEvent {
    pub x: f32,
    pub y: f32,
    pub kind: PointerKind,
}

impl PointerEvent {
    pub fn mouse(x: f32, y: f32) -> Self {
        Self {
            x,
            y,
            kind: PointerKind::Mouse,
        }
    }

    /// First touch point of a multi-touch event; `None` when no finger is down.
    pub fn first_touch(touches: &[(f32, f32)]) -> Option<Self> {
        touches.first().map(|&(x, y)| Self {
            x,
            y,
            kind: PointerKind::Touch,
        })
    }
}

/// Bounds of the rendering surface in the same coordinate space as pointer events.
#[derive(Copy, Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SurfaceRect {
    pub left: f32,
    pub top: f32,
    pub width: f32,
    pub height: f32,
}

impl SurfaceRect {
    pub fn new(left: f32, top: f32, width: f32, height: f32) -> Self {
        Self {
            left,
            top,
            width,
            height,
        }
    }

    pub fn center(&self) -> (f32, f32) {
        (self.left + self.width * 0.5, self.top + self.height * 0.5)
    }

    /// Offset of `event` from the surface center in half-extents, clamped to [-1, 1].
    /// Screen-down is negative Y. A degenerate surface yields the center.
    pub fn normalize(&self, event: &PointerEvent) -> Vec2 {
        let half_w = self.width * 0.5;
        let half_h = self.height * 0.5;
        if half_w <= 0.0 || half_h <= 0.0 {
            return Vec2::ZERO;
        }
        let (cx, cy) = self.center();
        Vec2::new(
            ((event.x - cx) / half_w).clamp(-1.0, 1.0),
            (-(event.y - cy) / half_h).clamp(-1.0, 1.0),
        )
    }
}

/// Injectable source of pointer movement.
pub trait PointerSource {
    /// Surface the events are relative to.
    fn surface(&self) -> SurfaceRect;
    /// Move every pending event into `out`, oldest first.
    fn drain(&mut self, out: &mut Vec<PointerEvent>);
}

#[derive(Debug)]
struct QueueInner {
    surface: SurfaceRect,
    events: VecDeque<PointerEvent>,
}

/// Shared single-threaded event queue implementing [`PointerSource`].
#[derive(Clone, Debug)]
pub struct PointerQueue {
    inner: Rc<RefCell<QueueInner>>,
}

impl PointerQueue {
    pub fn new(surface: SurfaceRect) -> Self {
        Self {
            inner: Rc::new(RefCell::new(QueueInner {
                surface,
                events: VecDeque::new(),
            })),
        }
    }

    pub fn push(&self, event: PointerEvent) {
        self.inner.borrow_mut().events.push_back(event);
    }

    /// Queue the first touch point, if any.
    pub fn push_touches(&self, touches: &[(f32, f32)]) {
        if let Some(event) = PointerEvent::first_touch(touches) {
            self.push(event);
        }
    }

    /// Update the surface bounds, e.g. after a resize.
    pub fn set_surface(&self, surface: SurfaceRect) {
        self.inner.borrow_mut().surface = surface;
    }

    pub fn pending(&self) -> usize {
        self.inner.borrow().events.len()
    }
}

impl PointerSource for PointerQueue {
    fn surface(&self) -> SurfaceRect {
        self.inner.borrow().surface
    }

    fn drain(&mut self, out: &mut Vec<PointerEvent>) {
        out.extend(self.inner.borrow_mut().events.drain(..));
    }
}
