//! Queue-backed render host with no window
//!
//! Frame requests are queued until the driver calls
//! [`FrameScheduler::pump`], which plays the role a display's vsync plays
//! for a windowed host.

use crate::error::RenderError;
use crate::scheduler::{
    DrawList, FrameHandle, FrameOutcome, FrameScheduler, RenderHost, SurfaceGeometry,
};
use rand::Rng;

pub struct HeadlessHost {
    geometry: SurfaceGeometry,
    next_handle: u64,
    queued: Vec<FrameHandle>,
    last_frame: Option<DrawList>,
    submitted: u64,
    cancelled: u64,
    reject_submissions: bool,
}

impl HeadlessHost {
    pub fn new(width: f32, height: f32, scale: f32) -> Self {
        Self {
            geometry: SurfaceGeometry::new(width, height, scale),
            next_handle: 0,
            queued: Vec::new(),
            last_frame: None,
            submitted: 0,
            cancelled: 0,
            reject_submissions: false,
        }
    }

    /// Change the surface. The scheduler notices on its next frame; call
    /// [`FrameScheduler::on_resize`] as well to apply it immediately.
    pub fn set_surface(&mut self, geometry: SurfaceGeometry) {
        self.geometry = geometry;
    }

    /// Handles waiting to be fired
    pub fn queued(&self) -> &[FrameHandle] {
        &self.queued
    }

    /// Remove and return every queued handle
    pub fn take_queued(&mut self) -> Vec<FrameHandle> {
        std::mem::take(&mut self.queued)
    }

    pub fn last_frame(&self) -> Option<&DrawList> {
        self.last_frame.as_ref()
    }

    /// Draw lists accepted so far
    pub fn submitted(&self) -> u64 {
        self.submitted
    }

    /// Registrations dropped through `cancel_frame`
    pub fn cancelled(&self) -> u64 {
        self.cancelled
    }

    /// Make `submit` fail, as a lost graphics context would
    pub fn set_reject_submissions(&mut self, reject: bool) {
        self.reject_submissions = reject;
    }
}

impl RenderHost for HeadlessHost {
    fn request_frame(&mut self) -> FrameHandle {
        self.next_handle += 1;
        let handle = FrameHandle(self.next_handle);
        self.queued.push(handle);
        handle
    }

    fn cancel_frame(&mut self, handle: FrameHandle) {
        let before = self.queued.len();
        self.queued.retain(|h| *h != handle);
        if self.queued.len() < before {
            self.cancelled += 1;
        }
    }

    fn surface(&self) -> SurfaceGeometry {
        self.geometry
    }

    fn submit(&mut self, frame: &DrawList) -> Result<(), RenderError> {
        if self.reject_submissions {
            return Err(RenderError::Submit("surface lost".to_string()));
        }
        self.last_frame = Some(frame.clone());
        self.submitted += 1;
        Ok(())
    }
}

impl<R: Rng> FrameScheduler<HeadlessHost, R> {
    /// Fire every queued frame callback at `timestamp` (seconds)
    pub fn pump(&mut self, timestamp: f64) -> Vec<FrameOutcome> {
        let due = self.host_mut().take_queued();
        due.into_iter()
            .map(|handle| self.on_frame(handle, timestamp))
            .collect()
    }
}
