//! Decoded screen snapshot.

/// The most recent decoded image of the remote screen.
///
/// Pixel data is opaque to the bridge: it is whatever the transport decoded
/// (typically packed RGBA, `width × height × 4` bytes).  Only the latest frame
/// is kept; frames are shared behind an `Arc` so handing one to a consumer
/// never copies pixels.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Frame {
    pub width: u16,
    pub height: u16,
    pub pixels: Vec<u8>,
}

impl Frame {
    pub fn new(width: u16, height: u16, pixels: Vec<u8>) -> Self {
        Self {
            width,
            height,
            pixels,
        }
    }

    /// Screen centre in pixel coordinates.
    pub fn center(&self) -> (u16, u16) {
        (self.width / 2, self.height / 2)
    }

    /// Whether the pointer may be moved to `(x, y)`.  The far edge is
    /// inclusive, so `(width, height)` parks the cursor in the corner.
    pub fn admits_pointer(&self, x: u16, y: u16) -> bool {
        x <= self.width && y <= self.height
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_center_of_1080p() {
        let frame = Frame::new(1920, 1080, Vec::new());
        assert_eq!(frame.center(), (960, 540));
    }

    #[test]
    fn test_pointer_bounds_include_far_edge() {
        let frame = Frame::new(800, 600, Vec::new());
        assert!(frame.admits_pointer(0, 0));
        assert!(frame.admits_pointer(800, 600));
        assert!(!frame.admits_pointer(801, 0));
        assert!(!frame.admits_pointer(0, 601));
    }
}
