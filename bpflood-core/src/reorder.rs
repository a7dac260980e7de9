//! Frame reordering between per-frame and lane-major layouts
//!
//! Decoding several frames at once needs their soft values interleaved so
//! that position `i` of frame `f` sits at `i * F + f`. [`Reorderer`] builds
//! that layout from `F` separate frames ([`Reorderer::apply`]) and splits it
//! back ([`Reorderer::apply_rev`]).
//!
//! When `F` is a power of two no larger than the register width (in
//! elements), values move a register-sized block at a time through a
//! butterfly of pairwise zip steps: `log2(F)` stages, each pairing register
//! `jump + l` with register `jump + l_size + l`. Every stage reads one
//! register file and writes the other, so a pair is zipped straight into its
//! destination. Positions past the last full block, and every other frame
//! count, go through the scalar loop. Both paths produce the same layout.
//!
//! [`StaticReorderer`] runs the same network with `F` and the register width
//! as compile-time constants, over fixed-size register arrays.

use core::mem::{size_of, swap};

use crate::constants::{MAX_STATIC_FRAMES, REGISTER_BYTES};
use crate::error::DecoderError;

/// Number of `T` elements filling one register
pub fn register_width<T>() -> usize {
    let lanes = (REGISTER_BYTES / size_of::<T>().max(1)).max(1);
    // Round down to a power of two for odd-sized element types
    1 << (usize::BITS - 1 - lanes.leading_zeros())
}

/// Common length of a non-empty set of frames
fn frame_length(mut lengths: impl Iterator<Item = usize>) -> Result<usize, DecoderError> {
    let n = lengths.next().ok_or(DecoderError::UnsupportedFrameCount(0))?;
    match lengths.find(|&len| len != n) {
        Some(actual) => Err(DecoderError::LengthMismatch { expected: n, actual }),
        None => Ok(n),
    }
}

fn check_len(expected: usize, actual: usize) -> Result<(), DecoderError> {
    if expected != actual {
        return Err(DecoderError::LengthMismatch { expected, actual });
    }
    Ok(())
}

/// `lo || hi <- (a0 b0 a1 b1 ...)`
#[inline(always)]
fn zip<T: Copy>(a: &[T], b: &[T], lo: &mut [T], hi: &mut [T]) {
    let pairs = lo.chunks_exact_mut(2).chain(hi.chunks_exact_mut(2));
    for ((pair, &x), &y) in pairs.zip(a).zip(b) {
        pair[0] = x;
        pair[1] = y;
    }
}

/// Inverse of [`zip`]: `a, b <- even and odd elements of (lo || hi)`
#[inline(always)]
fn unzip<T: Copy>(lo: &[T], hi: &[T], a: &mut [T], b: &mut [T]) {
    let pairs = lo.chunks_exact(2).chain(hi.chunks_exact(2));
    for ((pair, x), y) in pairs.zip(a.iter_mut()).zip(b.iter_mut()) {
        *x = pair[0];
        *y = pair[1];
    }
}

/// Borrow registers `x < y` of a flat register file at the same time
#[inline(always)]
fn register_pair<T>(regs: &mut [T], w: usize, x: usize, y: usize) -> (&mut [T], &mut [T]) {
    let (lo, hi) = regs.split_at_mut(y * w);
    (&mut lo[x * w..(x + 1) * w], &mut hi[..w])
}

/// Registers `(jump + l, jump + l_size + l)` of one butterfly stage
fn stage_pairs(n_regs: usize, l_size: usize) -> impl Iterator<Item = (usize, usize)> {
    (0..n_regs)
        .step_by(2 * l_size)
        .flat_map(move |jump| (jump..jump + l_size).map(move |x| (x, x + l_size)))
}

/// Forward network over flat register files; returns the file holding the result
fn interleave_network<'a, T: Copy>(
    mut src: &'a mut [T],
    mut dst: &'a mut [T],
    n_regs: usize,
    w: usize,
) -> &'a [T] {
    let mut l_size = n_regs / 2;
    while l_size > 0 {
        for (x, y) in stage_pairs(n_regs, l_size) {
            let (lo, hi) = register_pair(dst, w, x, y);
            zip(&src[x * w..(x + 1) * w], &src[y * w..(y + 1) * w], lo, hi);
        }
        swap(&mut src, &mut dst);
        l_size >>= 1;
    }
    src
}

fn deinterleave_network<'a, T: Copy>(
    mut src: &'a mut [T],
    mut dst: &'a mut [T],
    n_regs: usize,
    w: usize,
) -> &'a [T] {
    let mut l_size = 1;
    while l_size < n_regs {
        for (x, y) in stage_pairs(n_regs, l_size) {
            let (a, b) = register_pair(dst, w, x, y);
            unzip(&src[x * w..(x + 1) * w], &src[y * w..(y + 1) * w], a, b);
        }
        swap(&mut src, &mut dst);
        l_size <<= 1;
    }
    src
}

/// Forward network with the frame count and register width fixed
#[inline(always)]
fn interleave_network_fixed<'a, T: Copy, const F: usize, const W: usize>(
    mut src: &'a mut [[T; W]; F],
    mut dst: &'a mut [[T; W]; F],
) -> &'a [[T; W]; F] {
    let mut l_size = F / 2;
    while l_size > 0 {
        for (x, y) in stage_pairs(F, l_size) {
            let (low, high) = dst.split_at_mut(y);
            zip(&src[x], &src[y], &mut low[x], &mut high[0]);
        }
        swap(&mut src, &mut dst);
        l_size >>= 1;
    }
    src
}

#[inline(always)]
fn deinterleave_network_fixed<'a, T: Copy, const F: usize, const W: usize>(
    mut src: &'a mut [[T; W]; F],
    mut dst: &'a mut [[T; W]; F],
) -> &'a [[T; W]; F] {
    let mut l_size = 1;
    while l_size < F {
        for (x, y) in stage_pairs(F, l_size) {
            let (low, high) = dst.split_at_mut(y);
            unzip(&src[x], &src[y], &mut low[x], &mut high[0]);
        }
        swap(&mut src, &mut dst);
        l_size <<= 1;
    }
    src
}

fn scalar_forward<T: Copy>(frames: &[&[T]], out: &mut [T], from: usize) {
    let n_frames = frames.len();
    for (f, frame) in frames.iter().enumerate() {
        for (i, &value) in frame.iter().enumerate().skip(from) {
            out[i * n_frames + f] = value;
        }
    }
}

fn scalar_reverse<T: Copy>(input: &[T], frames: &mut [&mut [T]], from: usize) {
    let n_frames = frames.len();
    for (f, frame) in frames.iter_mut().enumerate() {
        for (i, value) in frame.iter_mut().enumerate().skip(from) {
            *value = input[i * n_frames + f];
        }
    }
}

/// Emulated register files of the dynamic reorderer
#[derive(Debug, Clone)]
struct Registers<T> {
    width: usize,
    data: Vec<T>,
    spare: Vec<T>,
}

impl<T: Copy + Default> Registers<T> {
    fn new(width: usize) -> Self {
        assert!(
            width.is_power_of_two(),
            "register width must be a power of two, got {}",
            width
        );
        Self {
            width,
            data: Vec::new(),
            spare: Vec::new(),
        }
    }

    fn vectorized(&self, n_frames: usize) -> bool {
        n_frames >= 2 && n_frames.is_power_of_two() && n_frames <= self.width
    }

    fn files(&mut self, n_frames: usize) -> (&mut [T], &mut [T]) {
        let needed = n_frames * self.width;
        if self.data.len() < needed {
            self.data.resize(needed, T::default());
            self.spare.resize(needed, T::default());
        }
        (&mut self.data[..needed], &mut self.spare[..needed])
    }

    fn forward(&mut self, frames: &[&[T]], out: &mut [T]) -> Result<(), DecoderError> {
        let n_frames = frames.len();
        let n = frame_length(frames.iter().map(|frame| frame.len()))?;
        check_len(n * n_frames, out.len())?;

        let mut done = 0;
        if self.vectorized(n_frames) {
            let w = self.width;
            let block = n_frames * w;
            let (regs, spare) = self.files(n_frames);
            for i in 0..n / w {
                for (reg, frame) in regs.chunks_exact_mut(w).zip(frames) {
                    reg.copy_from_slice(&frame[i * w..(i + 1) * w]);
                }
                let lanes = interleave_network(regs, spare, n_frames, w);
                out[i * block..(i + 1) * block].copy_from_slice(lanes);
            }
            done = n / w * w;
        }

        scalar_forward(frames, out, done);
        Ok(())
    }

    fn reverse(&mut self, input: &[T], frames: &mut [&mut [T]]) -> Result<(), DecoderError> {
        let n_frames = frames.len();
        let n = frame_length(frames.iter().map(|frame| frame.len()))?;
        check_len(n * n_frames, input.len())?;

        let mut done = 0;
        if self.vectorized(n_frames) {
            let w = self.width;
            let block = n_frames * w;
            let (regs, spare) = self.files(n_frames);
            for i in 0..n / w {
                regs.copy_from_slice(&input[i * block..(i + 1) * block]);
                let split = deinterleave_network(regs, spare, n_frames, w);
                for (frame, reg) in frames.iter_mut().zip(split.chunks_exact(w)) {
                    frame[i * w..(i + 1) * w].copy_from_slice(reg);
                }
            }
            done = n / w * w;
        }

        scalar_reverse(input, frames, done);
        Ok(())
    }
}

/// Reorderer for a frame count chosen at run time
#[derive(Debug, Clone)]
pub struct Reorderer<T> {
    registers: Registers<T>,
}

impl<T: Copy + Default> Default for Reorderer<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default> Reorderer<T> {
    /// Reorderer using the natural register width for `T`
    pub fn new() -> Self {
        Self::with_width(register_width::<T>())
    }

    /// Reorderer using registers of `width` elements
    ///
    /// # Panics
    ///
    /// Panics if `width` is not a power of two.
    pub fn with_width(width: usize) -> Self {
        Self {
            registers: Registers::new(width),
        }
    }

    /// Register width in elements
    pub fn width(&self) -> usize {
        self.registers.width
    }

    /// Whether `n_frames` frames take the register path
    pub fn is_vectorized(&self, n_frames: usize) -> bool {
        self.registers.vectorized(n_frames)
    }

    /// Interleave equally long `frames` into `out` (`out[i * F + f] = frames[f][i]`)
    pub fn apply(&mut self, frames: &[&[T]], out: &mut [T]) -> Result<(), DecoderError> {
        self.registers.forward(frames, out)
    }

    /// Split a lane-major buffer back into `frames`
    pub fn apply_rev(&mut self, input: &[T], frames: &mut [&mut [T]]) -> Result<(), DecoderError> {
        self.registers.reverse(input, frames)
    }

    /// Allocating form of [`apply`](Self::apply)
    pub fn reorder(&mut self, frames: &[&[T]]) -> Result<Vec<T>, DecoderError> {
        let n = frames.first().map_or(0, |frame| frame.len());
        let mut out = vec![T::default(); n * frames.len()];
        self.apply(frames, &mut out)?;
        Ok(out)
    }

    /// Allocating form of [`apply_rev`](Self::apply_rev)
    pub fn reorder_rev(&mut self, input: &[T], n_frames: usize) -> Result<Vec<Vec<T>>, DecoderError> {
        if n_frames == 0 {
            return Err(DecoderError::UnsupportedFrameCount(0));
        }
        if input.len() % n_frames != 0 {
            return Err(DecoderError::LengthMismatch {
                expected: input.len() / n_frames * n_frames,
                actual: input.len(),
            });
        }

        let n = input.len() / n_frames;
        let mut frames = vec![vec![T::default(); n]; n_frames];
        let mut views: Vec<&mut [T]> = frames.iter_mut().map(|frame| frame.as_mut_slice()).collect();
        self.apply_rev(input, &mut views)?;
        Ok(frames)
    }
}

/// Register widths the static reorderer is compiled for
const STATIC_WIDTHS: [usize; 6] = [2, 4, 8, 16, 32, 64];

/// Forward blocks of `W` positions with fixed-size registers; returns positions done
fn forward_fixed<T: Copy + Default, const F: usize, const W: usize>(
    frames: &[&[T]; F],
    out: &mut [T],
    n: usize,
) -> usize {
    if F < 2 || F > W {
        return 0;
    }
    let mut regs = [[T::default(); W]; F];
    let mut spare = [[T::default(); W]; F];
    for i in 0..n / W {
        for (reg, frame) in regs.iter_mut().zip(frames) {
            reg.copy_from_slice(&frame[i * W..(i + 1) * W]);
        }
        let lanes = interleave_network_fixed(&mut regs, &mut spare);
        let block = &mut out[i * F * W..(i + 1) * F * W];
        for (chunk, reg) in block.chunks_exact_mut(W).zip(lanes) {
            chunk.copy_from_slice(reg);
        }
    }
    n / W * W
}

fn reverse_fixed<T: Copy + Default, const F: usize, const W: usize>(
    input: &[T],
    frames: &mut [&mut [T]; F],
    n: usize,
) -> usize {
    if F < 2 || F > W {
        return 0;
    }
    let mut regs = [[T::default(); W]; F];
    let mut spare = [[T::default(); W]; F];
    for i in 0..n / W {
        let block = &input[i * F * W..(i + 1) * F * W];
        for (reg, chunk) in regs.iter_mut().zip(block.chunks_exact(W)) {
            reg.copy_from_slice(chunk);
        }
        let split = deinterleave_network_fixed(&mut regs, &mut spare);
        for (frame, reg) in frames.iter_mut().zip(split) {
            frame[i * W..(i + 1) * W].copy_from_slice(reg);
        }
    }
    n / W * W
}

/// Reorderer for a frame count fixed at compile time
///
/// `F` must be a power of two no larger than [`MAX_STATIC_FRAMES`]; other
/// values fail to compile. The butterfly is instantiated per register width
/// with both constants known, over stack register arrays. Widths above 64
/// elements take the scalar loop. Results are identical to [`Reorderer`].
#[derive(Debug, Clone, Copy)]
pub struct StaticReorderer<T, const F: usize> {
    width: usize,
    _elements: core::marker::PhantomData<T>,
}

impl<T: Copy + Default, const F: usize> Default for StaticReorderer<T, F> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Copy + Default, const F: usize> StaticReorderer<T, F> {
    const VALID: () = assert!(
        F.is_power_of_two() && F <= MAX_STATIC_FRAMES,
        "StaticReorderer needs a power-of-two frame count up to MAX_STATIC_FRAMES"
    );

    /// Reorderer using the natural register width for `T`
    pub fn new() -> Self {
        Self::with_width(register_width::<T>())
    }

    /// Reorderer using registers of `width` elements
    ///
    /// # Panics
    ///
    /// Panics if `width` is not a power of two.
    pub fn with_width(width: usize) -> Self {
        let () = Self::VALID;
        assert!(
            width.is_power_of_two(),
            "register width must be a power of two, got {}",
            width
        );
        Self {
            width,
            _elements: core::marker::PhantomData,
        }
    }

    /// Register width in elements
    pub fn width(&self) -> usize {
        self.width
    }

    /// Whether the fixed-size register path is taken
    pub fn is_vectorized(&self) -> bool {
        F >= 2 && F <= self.width && STATIC_WIDTHS.contains(&self.width)
    }

    /// Interleave `F` equally long frames into `out`
    pub fn apply(&self, frames: &[&[T]; F], out: &mut [T]) -> Result<(), DecoderError> {
        let n = frame_length(frames.iter().map(|frame| frame.len()))?;
        check_len(n * F, out.len())?;

        let done = match self.width {
            2 => forward_fixed::<T, F, 2>(frames, out, n),
            4 => forward_fixed::<T, F, 4>(frames, out, n),
            8 => forward_fixed::<T, F, 8>(frames, out, n),
            16 => forward_fixed::<T, F, 16>(frames, out, n),
            32 => forward_fixed::<T, F, 32>(frames, out, n),
            64 => forward_fixed::<T, F, 64>(frames, out, n),
            _ => 0,
        };
        scalar_forward(frames, out, done);
        Ok(())
    }

    /// Split a lane-major buffer back into `F` frames
    pub fn apply_rev(&self, input: &[T], frames: &mut [&mut [T]; F]) -> Result<(), DecoderError> {
        let n = frame_length(frames.iter().map(|frame| frame.len()))?;
        check_len(n * F, input.len())?;

        let done = match self.width {
            2 => reverse_fixed::<T, F, 2>(input, frames, n),
            4 => reverse_fixed::<T, F, 4>(input, frames, n),
            8 => reverse_fixed::<T, F, 8>(input, frames, n),
            16 => reverse_fixed::<T, F, 16>(input, frames, n),
            32 => reverse_fixed::<T, F, 32>(input, frames, n),
            64 => reverse_fixed::<T, F, 64>(input, frames, n),
            _ => 0,
        };
        scalar_reverse(input, frames, done);
        Ok(())
    }
}
