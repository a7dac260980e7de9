//! Type-dispatch routing boundary
//!
//! Routers pick an output path for each frame of a byte buffer. Only the
//! shared plumbing lives here: the byte-size lookup for the element types a
//! frame may carry, and the frame walk of [`Router::route`]. The per-frame
//! decision is left to implementors.

use core::any::{type_name, TypeId};

use serde::{Deserialize, Serialize};

use crate::error::DecoderError;

/// Element types a routed frame may carry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ElementType {
    /// `i8`
    I8,
    /// `i16`
    I16,
    /// `i32`
    I32,
    /// `i64`
    I64,
    /// `f32`
    F32,
    /// `f64`
    F64,
}

impl ElementType {
    /// Tag of the Rust type `T`
    ///
    /// Any type outside the six supported ones is a wiring error and yields
    /// [`DecoderError::UnsupportedElementType`].
    pub fn of<T: 'static>() -> Result<Self, DecoderError> {
        let id = TypeId::of::<T>();
        let tag = if id == TypeId::of::<i8>() {
            Self::I8
        } else if id == TypeId::of::<i16>() {
            Self::I16
        } else if id == TypeId::of::<i32>() {
            Self::I32
        } else if id == TypeId::of::<i64>() {
            Self::I64
        } else if id == TypeId::of::<f32>() {
            Self::F32
        } else if id == TypeId::of::<f64>() {
            Self::F64
        } else {
            return Err(DecoderError::UnsupportedElementType(type_name::<T>()));
        };
        Ok(tag)
    }

    /// Size of one element in bytes
    pub const fn byte_width(self) -> usize {
        match self {
            Self::I8 => 1,
            Self::I16 => 2,
            Self::I32 | Self::F32 => 4,
            Self::I64 | Self::F64 => 8,
        }
    }

    /// Size of `n_elements` elements in bytes
    pub const fn bytes(self, n_elements: usize) -> usize {
        n_elements * self.byte_width()
    }
}

/// Size in bytes of `n_elements` values of type `T`
pub fn compute_bytes<T: 'static>(n_elements: usize) -> Result<usize, DecoderError> {
    Ok(ElementType::of::<T>()?.bytes(n_elements))
}

/// Frame-by-frame route selection over a byte buffer of `n_frames` frames
pub trait Router {
    /// Number of frames per routed buffer
    fn n_frames(&self) -> usize;

    /// Size of one frame in bytes
    fn frame_bytes(&self) -> usize;

    /// Choose the route of one frame
    fn route_frame(&mut self, frame: &[u8], frame_id: usize) -> Result<usize, DecoderError>;

    /// Merge the routes of two frames of the same buffer
    ///
    /// Routers that handle more than one frame per buffer must override this.
    fn select_route_inter(&self, _a: usize, _b: usize) -> Result<usize, DecoderError> {
        Err(DecoderError::NotImplemented("select_route_inter"))
    }

    /// Route a buffer
    ///
    /// With `Some(id)` only frame `id % n_frames` is routed; with `None`
    /// every frame is routed and the results are merged left to right with
    /// [`select_route_inter`](Self::select_route_inter).
    fn route(&mut self, input: &[u8], frame_id: Option<usize>) -> Result<usize, DecoderError> {
        let n_frames = self.n_frames();
        let bytes = self.frame_bytes();
        if n_frames == 0 {
            return Err(DecoderError::UnsupportedFrameCount(0));
        }
        if input.len() != n_frames * bytes {
            return Err(DecoderError::LengthMismatch {
                expected: n_frames * bytes,
                actual: input.len(),
            });
        }

        let (f_start, f_stop) = match frame_id {
            Some(id) => (id % n_frames, id % n_frames + 1),
            None => (0, n_frames),
        };

        let frame = move |f: usize| &input[f * bytes..(f + 1) * bytes];
        let mut route = self.route_frame(frame(f_start), f_start)?;
        for f in f_start + 1..f_stop {
            let next = self.route_frame(frame(f), f)?;
            route = self.select_route_inter(route, next)?;
        }
        Ok(route)
    }

    /// Forget any per-buffer state
    fn reset(&mut self) {}
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Routes a frame of `f32` soft values to 1 when any value is negative
    struct SignRouter {
        n_frames: usize,
        n_elements: usize,
        calls: usize,
    }

    impl Router for SignRouter {
        fn n_frames(&self) -> usize {
            self.n_frames
        }

        fn frame_bytes(&self) -> usize {
            compute_bytes::<f32>(self.n_elements).unwrap()
        }

        fn route_frame(&mut self, frame: &[u8], _frame_id: usize) -> Result<usize, DecoderError> {
            self.calls += 1;
            let negative = frame
                .chunks_exact(4)
                .map(|b| f32::from_le_bytes([b[0], b[1], b[2], b[3]]))
                .any(|v| v < 0.0);
            Ok(negative as usize)
        }
    }

    struct MaxSignRouter(SignRouter);

    impl Router for MaxSignRouter {
        fn n_frames(&self) -> usize {
            self.0.n_frames()
        }

        fn frame_bytes(&self) -> usize {
            self.0.frame_bytes()
        }

        fn route_frame(&mut self, frame: &[u8], frame_id: usize) -> Result<usize, DecoderError> {
            self.0.route_frame(frame, frame_id)
        }

        fn select_route_inter(&self, a: usize, b: usize) -> Result<usize, DecoderError> {
            Ok(a.max(b))
        }
    }

    fn encode(values: &[f32]) -> Vec<u8> {
        values.iter().flat_map(|v| v.to_le_bytes()).collect()
    }

    #[test]
    fn test_byte_widths() {
        assert_eq!(compute_bytes::<i8>(10).unwrap(), 10);
        assert_eq!(compute_bytes::<i16>(10).unwrap(), 20);
        assert_eq!(compute_bytes::<i32>(10).unwrap(), 40);
        assert_eq!(compute_bytes::<i64>(10).unwrap(), 80);
        assert_eq!(compute_bytes::<f32>(10).unwrap(), 40);
        assert_eq!(compute_bytes::<f64>(10).unwrap(), 80);
        assert_eq!(ElementType::of::<f64>().unwrap(), ElementType::F64);
    }

    #[test]
    fn test_unsupported_type_is_rejected() {
        assert!(matches!(
            compute_bytes::<u8>(4),
            Err(DecoderError::UnsupportedElementType(_))
        ));
        assert!(ElementType::of::<String>().is_err());
    }

    #[test]
    fn test_route_single_frame() {
        let mut router = SignRouter {
            n_frames: 2,
            n_elements: 3,
            calls: 0,
        };
        let input = encode(&[1.0, 2.0, 3.0, 1.0, -2.0, 3.0]);

        assert_eq!(router.route(&input, Some(0)).unwrap(), 0);
        assert_eq!(router.route(&input, Some(1)).unwrap(), 1);
        assert_eq!(router.route(&input, Some(3)).unwrap(), 1);
        assert_eq!(router.calls, 3);
    }

    #[test]
    fn test_route_all_frames_needs_merge() {
        let mut router = SignRouter {
            n_frames: 2,
            n_elements: 3,
            calls: 0,
        };
        let input = encode(&[1.0, 2.0, 3.0, 1.0, -2.0, 3.0]);
        assert_eq!(
            router.route(&input, None),
            Err(DecoderError::NotImplemented("select_route_inter"))
        );

        let mut merged = MaxSignRouter(router);
        assert_eq!(merged.route(&input, None).unwrap(), 1);
    }

    #[test]
    fn test_route_rejects_wrong_length() {
        let mut router = SignRouter {
            n_frames: 2,
            n_elements: 3,
            calls: 0,
        };
        assert!(matches!(
            router.route(&[0u8; 20], None),
            Err(DecoderError::LengthMismatch {
                expected: 24,
                actual: 20
            })
        ));
        router.reset();
    }
}
