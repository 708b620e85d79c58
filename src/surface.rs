// SPDX-License-Identifier: GPL-3.0-only

//! Shared display surface
//!
//! The surface is the single point where the camera session and its readers
//! meet: the session binds a stream's frame feed to it, while the capture
//! loop and the terminal preview read whatever frame is currently decoded.

use crate::backends::camera::{CameraFrame, FrameReceiver};
use std::sync::{Arc, PoisonError, RwLock};

/// Cloneable handle to the currently displayed frame feed
#[derive(Debug, Clone, Default)]
pub struct VideoSurface {
    source: Arc<RwLock<Option<FrameReceiver>>>,
}

impl VideoSurface {
    pub fn new() -> Self {
        Self::default()
    }

    /// Bind a frame feed, or unbind with `None`
    pub fn set_source(&self, source: Option<FrameReceiver>) {
        let mut guard = self.source.write().unwrap_or_else(PoisonError::into_inner);
        *guard = source;
    }

    pub fn has_source(&self) -> bool {
        self.source
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some()
    }

    /// Latest decoded frame, if a source is bound and has produced one
    pub fn current_frame(&self) -> Option<Arc<CameraFrame>> {
        let guard = self.source.read().unwrap_or_else(PoisonError::into_inner);
        guard.as_ref().and_then(|rx| rx.borrow().clone())
    }

    /// Native width of the current frame, 0 before the first frame
    pub fn video_width(&self) -> u32 {
        self.current_frame().map(|f| f.width).unwrap_or(0)
    }

    /// Native height of the current frame, 0 before the first frame
    pub fn video_height(&self) -> u32 {
        self.current_frame().map(|f| f.height).unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backends::camera::frame_channel;

    #[test]
    fn test_unbound_surface_reports_zero_size() {
        let surface = VideoSurface::new();
        assert!(!surface.has_source());
        assert!(surface.current_frame().is_none());
        assert_eq!((surface.video_width(), surface.video_height()), (0, 0));
    }

    #[test]
    fn test_bound_surface_follows_feed() {
        let surface = VideoSurface::new();
        let (tx, rx) = frame_channel();
        surface.set_source(Some(rx));

        assert!(surface.has_source());
        assert_eq!(surface.video_width(), 0);

        tx.send_replace(Some(Arc::new(CameraFrame::from_rgba(
            2,
            1,
            vec![0; 8],
        ))));
        assert_eq!((surface.video_width(), surface.video_height()), (2, 1));

        surface.set_source(None);
        assert!(surface.current_frame().is_none());
    }

    #[test]
    fn test_clones_share_binding() {
        let surface = VideoSurface::new();
        let reader = surface.clone();
        let (_tx, rx) = frame_channel();
        surface.set_source(Some(rx));
        assert!(reader.has_source());
    }
}
