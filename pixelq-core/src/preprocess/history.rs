//! Sliding window over the most recent processed frames.
use crate::{
    error::PixelqError,
    {NetFrame, StackedState},
};
use anyhow::Result;
use ndarray::{s, Array3};
use std::collections::VecDeque;

/// Holds the last `length` processed frames, oldest first.
///
/// A rollout drives two independently sized instances with the same frame
/// sequence: one sized to what the network consumes, one wider for
/// movement-difference reward shaping.
pub struct HistoryStack {
    length: usize,
    frame_height: usize,
    frame_width: usize,
    frames: VecDeque<NetFrame>,
}

impl HistoryStack {
    /// Constructs a stack holding `length` frames of the given size.
    pub fn new(length: usize, frame_height: usize, frame_width: usize) -> Result<Self> {
        if length == 0 {
            return Err(PixelqError::InvalidArgument("history length must be positive".into()).into());
        }
        Ok(Self {
            length,
            frame_height,
            frame_width,
            frames: VecDeque::with_capacity(length),
        })
    }

    /// Appends `frame`, dropping the oldest when exceeding the window
    /// length, and returns the current window as a `(length, h, w)` tensor.
    /// Slots before the first seen frames are the zero frame.
    pub fn process_state_for_network(&mut self, frame: NetFrame) -> StackedState {
        self.frames.push_back(frame);
        if self.frames.len() > self.length {
            self.frames.pop_front();
        }
        self.stacked()
    }

    /// Returns the current window without pushing a new frame.
    pub fn stacked(&self) -> StackedState {
        let mut out = Array3::<f32>::zeros((self.length, self.frame_height, self.frame_width));
        let pad = self.length - self.frames.len();
        for (k, f) in self.frames.iter().enumerate() {
            out.slice_mut(s![pad + k, .., ..]).assign(f);
        }
        out
    }

    /// Number of frames the window holds when full.
    pub fn length(&self) -> usize {
        self.length
    }

    /// Clears all held frames.
    pub fn reset(&mut self) {
        self.frames.clear();
    }
}
