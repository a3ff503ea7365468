//! Host input for the ripple background.
//!
//! Window events are translated into host-neutral [`InteractionEvent`]s by a
//! [`WindowEventTranslator`], so the controller never sees `winit` types and
//! can be driven directly in tests. Positions in interaction events are in
//! logical pixels from the top-left corner of the surface.
//!
//! The background listens to one family of events decided at mount time
//! ([`InputMode`]). The [`Listeners`] registry records which kinds are
//! attached; everything is detached on dispose and events of a detached kind
//! are ignored.

use std::collections::HashSet;

use glam::Vec2;
use winit::dpi::PhysicalPosition;
use winit::event::{ElementState, MouseButton, MouseScrollDelta, Touch, TouchPhase, WindowEvent};

/// Which family of input events drives the background.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum InputMode {
    /// Mouse or trackpad: moves inject, leaving stops injecting, a button
    /// release randomizes the colors.
    #[default]
    Pointer,
    /// Touch screen: injects while a finger is down.
    Touch,
}

/// An input event as the background consumes it.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum InteractionEvent {
    PointerMove { x: f32, y: f32 },
    PointerLeave,
    PointerUp,
    TouchStart { x: f32, y: f32 },
    TouchMove { x: f32, y: f32 },
    TouchEnd,
    TouchCancel,
    /// New surface size in logical pixels.
    Resize { width: f32, height: f32 },
    /// New device pixel ratio.
    ScaleFactor(f64),
    /// Scroll position `offset` within `0..=max`.
    Scroll { offset: f32, max: f32 },
}

/// A kind of listener the background can attach.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ListenerKind {
    PointerMove,
    PointerLeave,
    PointerUp,
    TouchStart,
    TouchMove,
    TouchEnd,
    TouchCancel,
    Resize,
    Scroll,
}

impl InteractionEvent {
    /// The listener that receives this event.
    pub fn kind(&self) -> ListenerKind {
        match self {
            InteractionEvent::PointerMove { .. } => ListenerKind::PointerMove,
            InteractionEvent::PointerLeave => ListenerKind::PointerLeave,
            InteractionEvent::PointerUp => ListenerKind::PointerUp,
            InteractionEvent::TouchStart { .. } => ListenerKind::TouchStart,
            InteractionEvent::TouchMove { .. } => ListenerKind::TouchMove,
            InteractionEvent::TouchEnd => ListenerKind::TouchEnd,
            InteractionEvent::TouchCancel => ListenerKind::TouchCancel,
            InteractionEvent::Resize { .. } | InteractionEvent::ScaleFactor(_) => {
                ListenerKind::Resize
            }
            InteractionEvent::Scroll { .. } => ListenerKind::Scroll,
        }
    }
}

/// Registry of attached listeners.
#[derive(Debug, Default)]
pub struct Listeners {
    attached: HashSet<ListenerKind>,
}

impl Listeners {
    pub fn new() -> Self {
        Self::default()
    }

    /// Attach every listener used in `mode`.
    pub fn attach(&mut self, mode: InputMode) {
        let kinds: &[ListenerKind] = match mode {
            InputMode::Pointer => &[
                ListenerKind::PointerMove,
                ListenerKind::PointerLeave,
                ListenerKind::PointerUp,
            ],
            InputMode::Touch => &[
                ListenerKind::TouchStart,
                ListenerKind::TouchMove,
                ListenerKind::TouchEnd,
                ListenerKind::TouchCancel,
            ],
        };
        self.attached.extend(kinds.iter().copied());
        self.attached.insert(ListenerKind::Resize);
        self.attached.insert(ListenerKind::Scroll);
        log::debug!("attached {} listeners for {:?}", self.attached.len(), mode);
    }

    /// Detach everything. Returns how many listeners were removed.
    pub fn detach_all(&mut self) -> usize {
        let count = self.attached.len();
        self.attached.clear();
        count
    }

    pub fn is_attached(&self, kind: ListenerKind) -> bool {
        self.attached.contains(&kind)
    }

    /// Whether `event` reaches an attached listener.
    pub fn accepts(&self, event: &InteractionEvent) -> bool {
        self.is_attached(event.kind())
    }

    pub fn len(&self) -> usize {
        self.attached.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attached.is_empty()
    }
}

/// Map a surface position to `[-1, 1]` field coordinates.
///
/// The position goes to NDC first (+y up), then the shorter axis is scaled
/// into the band of the field the mesh samples on that axis, so a drop lands
/// under the pointer. Returns `None` for an empty viewport.
pub fn pointer_to_field(x: f32, y: f32, width: f32, height: f32) -> Option<Vec2> {
    if !(width > 0.0 && height > 0.0) {
        return None;
    }
    let mut ndc = Vec2::new(x / width * 2.0 - 1.0, (1.0 - y / height) * 2.0 - 1.0);
    let ratio = width / height;
    if ratio >= 1.0 {
        ndc.y /= ratio;
    } else {
        ndc.x *= ratio;
    }
    Some(ndc)
}

/// Tracks whether something is interacting with the surface.
#[derive(Debug, Default)]
pub struct PointerTracker {
    over: bool,
    touch_active: bool,
    last: Option<Vec2>,
}

impl PointerTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// True while a pointer hovers the surface or a touch is down.
    pub fn is_over(&self) -> bool {
        self.over
    }

    pub fn is_touch_active(&self) -> bool {
        self.touch_active
    }

    /// Last position in field coordinates.
    pub fn last_position(&self) -> Option<Vec2> {
        self.last
    }

    pub fn pointer_moved(&mut self, field_position: Vec2) {
        self.over = true;
        self.last = Some(field_position);
    }

    pub fn pointer_left(&mut self) {
        self.over = false;
    }

    pub fn touch_started(&mut self, field_position: Vec2) {
        self.touch_active = true;
        self.over = true;
        self.last = Some(field_position);
    }

    /// Record a touch move. Returns false if no touch is active.
    pub fn touch_moved(&mut self, field_position: Vec2) -> bool {
        if !self.touch_active {
            return false;
        }
        self.last = Some(field_position);
        true
    }

    pub fn touch_ended(&mut self) {
        self.touch_active = false;
        self.over = false;
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }
}

/// Turns `winit` window events into [`InteractionEvent`]s.
///
/// A desktop window has no page to scroll, so mouse wheel input moves a
/// virtual scroll position over `0..=scroll_range` logical pixels.
#[derive(Debug)]
pub struct WindowEventTranslator {
    scale_factor: f64,
    scroll_offset: f32,
    scroll_range: f32,
    touch_id: Option<u64>,
}

/// Logical pixels scrolled per wheel line.
const LINE_HEIGHT: f32 = 40.0;

impl WindowEventTranslator {
    pub fn new(scale_factor: f64, scroll_range: f32) -> Self {
        Self {
            scale_factor,
            scroll_offset: 0.0,
            scroll_range: scroll_range.max(0.0),
            touch_id: None,
        }
    }

    pub fn scale_factor(&self) -> f64 {
        self.scale_factor
    }

    fn logical(&self, position: PhysicalPosition<f64>) -> (f32, f32) {
        let logical = position.to_logical::<f64>(self.scale_factor);
        (logical.x as f32, logical.y as f32)
    }

    /// Translate one window event. Most events map to nothing.
    pub fn translate(&mut self, event: &WindowEvent) -> Option<InteractionEvent> {
        match event {
            WindowEvent::CursorMoved { position, .. } => {
                let (x, y) = self.logical(*position);
                Some(InteractionEvent::PointerMove { x, y })
            }

            WindowEvent::CursorLeft { .. } => Some(InteractionEvent::PointerLeave),

            WindowEvent::MouseInput {
                state: ElementState::Released,
                button: MouseButton::Left,
                ..
            } => Some(InteractionEvent::PointerUp),

            WindowEvent::MouseWheel { delta, .. } => {
                let dy = match delta {
                    MouseScrollDelta::LineDelta(_, y) => *y * LINE_HEIGHT,
                    MouseScrollDelta::PixelDelta(pos) => {
                        (pos.y / self.scale_factor) as f32
                    }
                };
                // Wheel up scrolls towards the top.
                self.scroll_offset = (self.scroll_offset - dy).clamp(0.0, self.scroll_range);
                Some(InteractionEvent::Scroll {
                    offset: self.scroll_offset,
                    max: self.scroll_range,
                })
            }

            WindowEvent::Touch(touch) => self.translate_touch(touch),

            WindowEvent::Resized(size) => {
                let logical = size.to_logical::<f64>(self.scale_factor);
                Some(InteractionEvent::Resize {
                    width: logical.width as f32,
                    height: logical.height as f32,
                })
            }

            WindowEvent::ScaleFactorChanged { scale_factor, .. } => {
                self.scale_factor = *scale_factor;
                Some(InteractionEvent::ScaleFactor(*scale_factor))
            }

            _ => None,
        }
    }

    fn translate_touch(&mut self, touch: &Touch) -> Option<InteractionEvent> {
        // Only the first finger down is followed.
        if let Some(id) = self.touch_id {
            if id != touch.id {
                return None;
            }
        }
        let (x, y) = self.logical(touch.location);
        match touch.phase {
            TouchPhase::Started => {
                if self.touch_id.is_some() {
                    return None;
                }
                self.touch_id = Some(touch.id);
                Some(InteractionEvent::TouchStart { x, y })
            }
            TouchPhase::Moved => self.touch_id.map(|_| InteractionEvent::TouchMove { x, y }),
            TouchPhase::Ended => self.touch_id.take().map(|_| InteractionEvent::TouchEnd),
            TouchPhase::Cancelled => self.touch_id.take().map(|_| InteractionEvent::TouchCancel),
        }
    }
}
