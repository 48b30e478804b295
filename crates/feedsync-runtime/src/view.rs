//! View position control.
//!
//! [`ViewPositionController`] owns the host's scrollable page surface and is
//! the only thing in the sync loop that moves it. It keeps its own record of
//! the page index so that jumps to the current page never reach the surface;
//! some page views flicker or error when asked to jump where they already are.

use feedsync_core::{FeedError, FeedResult};

/// The host's scrollable page primitive.
///
/// Surfaces are expected to keep the on-screen item in place when the list
/// underneath them changes (keyed children).
#[cfg_attr(test, mockall::automock)]
pub trait ScrollSurface: Send {
    /// Move to `index` instantly. Must settle once, without page-changed
    /// callbacks for the pages in between.
    fn jump_to_page(&mut self, index: usize);

    fn animate_to_page(&mut self, index: usize);
}

pub struct ViewPositionController {
    initial_index: usize,
    position: usize,
    surface: Option<Box<dyn ScrollSurface>>,
}

impl ViewPositionController {
    /// Create a controller whose view opens at `initial_index`. The initial
    /// index cannot be changed later; use [`Self::jump_to`].
    pub fn new(initial_index: usize) -> Self {
        Self {
            initial_index,
            position: initial_index,
            surface: None,
        }
    }

    pub fn initial_index(&self) -> usize {
        self.initial_index
    }

    /// Hand over the live surface. It opens at the initial index and is
    /// brought to the recorded position if that moved in the meantime.
    pub fn attach(&mut self, mut surface: Box<dyn ScrollSurface>) {
        if self.position != self.initial_index {
            surface.jump_to_page(self.position);
        }
        self.surface = Some(surface);
        tracing::debug!("View attached at page {}", self.position);
    }

    pub fn detach(&mut self) -> Option<Box<dyn ScrollSurface>> {
        self.surface.take()
    }

    pub fn is_attached(&self) -> bool {
        self.surface.is_some()
    }

    /// `None` until a surface is attached.
    pub fn current_index(&self) -> Option<usize> {
        self.surface.as_ref().map(|_| self.position)
    }

    /// Jump without animation. Returns whether the surface was moved.
    pub fn jump_to(&mut self, index: usize) -> FeedResult<bool> {
        self.move_to(index, false)
    }

    /// Animated move. Returns whether the surface was moved.
    pub fn animate_to(&mut self, index: usize) -> FeedResult<bool> {
        self.move_to(index, true)
    }

    /// Record that the view is at `index` without driving the surface.
    ///
    /// Used when the user's own swipe settled there, or when the list moved
    /// under the on-screen item.
    pub fn sync_to(&mut self, index: usize) {
        self.position = index;
    }

    /// While detached the target is still recorded, so the next
    /// [`attach`](Self::attach) lands on it.
    fn move_to(&mut self, index: usize, animate: bool) -> FeedResult<bool> {
        let Some(surface) = self.surface.as_mut() else {
            tracing::warn!("Deferring move to page {}: view is not attached", index);
            self.position = index;
            return Err(FeedError::ViewDetached);
        };
        if self.position == index {
            return Ok(false);
        }
        if animate {
            surface.animate_to_page(index);
        } else {
            surface.jump_to_page(index);
        }
        tracing::debug!("View moved from page {} to {}", self.position, index);
        self.position = index;
        Ok(true)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockall::predicate::eq;

    #[test]
    fn test_unattached_has_no_index() {
        let view = ViewPositionController::new(3);
        assert_eq!(view.current_index(), None);
        assert_eq!(view.initial_index(), 3);
    }

    #[test]
    fn test_jump_while_detached_is_rejected() {
        let mut view = ViewPositionController::new(0);
        assert!(matches!(view.jump_to(2), Err(FeedError::ViewDetached)));
        assert!(matches!(view.animate_to(2), Err(FeedError::ViewDetached)));
    }

    #[test]
    fn test_jump_to_current_page_never_reaches_surface() {
        let mut surface = MockScrollSurface::new();
        surface.expect_jump_to_page().times(0);
        surface.expect_animate_to_page().times(0);

        let mut view = ViewPositionController::new(4);
        view.attach(Box::new(surface));

        assert!(!view.jump_to(4).unwrap());
        assert!(!view.animate_to(4).unwrap());
        assert_eq!(view.current_index(), Some(4));
    }

    #[test]
    fn test_jump_moves_surface_once() {
        let mut surface = MockScrollSurface::new();
        surface
            .expect_jump_to_page()
            .with(eq(7))
            .times(1)
            .return_const(());

        let mut view = ViewPositionController::new(1);
        view.attach(Box::new(surface));

        assert!(view.jump_to(7).unwrap());
        assert!(!view.jump_to(7).unwrap());
        assert_eq!(view.current_index(), Some(7));
    }

    #[test]
    fn test_animate_uses_animated_path() {
        let mut surface = MockScrollSurface::new();
        surface.expect_jump_to_page().times(0);
        surface
            .expect_animate_to_page()
            .with(eq(2))
            .times(1)
            .return_const(());

        let mut view = ViewPositionController::new(0);
        view.attach(Box::new(surface));
        assert!(view.animate_to(2).unwrap());
    }

    #[test]
    fn test_sync_to_does_not_drive_surface() {
        let mut surface = MockScrollSurface::new();
        surface.expect_jump_to_page().times(0);

        let mut view = ViewPositionController::new(2);
        view.attach(Box::new(surface));
        view.sync_to(5);

        assert_eq!(view.current_index(), Some(5));
        // Jumping to the synced page is a no-op
        assert!(!view.jump_to(5).unwrap());
    }

    #[test]
    fn test_attach_catches_up_with_recorded_position() {
        let mut surface = MockScrollSurface::new();
        surface
            .expect_jump_to_page()
            .with(eq(6))
            .times(1)
            .return_const(());

        let mut view = ViewPositionController::new(2);
        view.sync_to(6);
        view.attach(Box::new(surface));
        assert_eq!(view.current_index(), Some(6));
        assert_eq!(view.initial_index(), 2);
    }

    #[test]
    fn test_jump_while_detached_is_applied_on_attach() {
        let mut surface = MockScrollSurface::new();
        surface
            .expect_jump_to_page()
            .with(eq(2))
            .times(1)
            .return_const(());

        let mut view = ViewPositionController::new(1);
        assert!(matches!(view.jump_to(2), Err(FeedError::ViewDetached)));
        view.attach(Box::new(surface));

        assert_eq!(view.current_index(), Some(2));
        assert_eq!(view.initial_index(), 1);
    }

    #[test]
    fn test_detach_clears_index() {
        let mut surface = MockScrollSurface::new();
        surface.expect_jump_to_page().times(0);

        let mut view = ViewPositionController::new(0);
        view.attach(Box::new(surface));
        assert!(view.detach().is_some());
        assert_eq!(view.current_index(), None);
    }
}
