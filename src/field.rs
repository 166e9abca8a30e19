//! Grid storage for the solver: single fields and read/write pairs.

use glam::Vec2;
use rayon::prelude::*;

/// Number and meaning of the components stored per texel.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ChannelLayout {
    /// Scalar fields: pressure, divergence, curl.
    R,
    /// Velocity.
    Rg,
    /// Dye color, alpha kept at 1.
    Rgba,
}

impl ChannelLayout {
    pub fn channels(self) -> usize {
        match self {
            ChannelLayout::R => 1,
            ChannelLayout::Rg => 2,
            ChannelLayout::Rgba => 4,
        }
    }
}

/// A 2D grid of samples, row-major with row 0 at the bottom (UV origin bottom-left).
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    width: usize,
    height: usize,
    layout: ChannelLayout,
    data: Vec<f32>,
}

impl Field {
    pub fn new(width: usize, height: usize, layout: ChannelLayout) -> Self {
        let width = width.max(1);
        let height = height.max(1);
        Self {
            width,
            height,
            layout,
            data: vec![0.0; width * height * layout.channels()],
        }
    }

    pub fn width(&self) -> usize {
        self.width
    }

    pub fn height(&self) -> usize {
        self.height
    }

    pub fn layout(&self) -> ChannelLayout {
        self.layout
    }

    pub fn channels(&self) -> usize {
        self.layout.channels()
    }

    /// Reciprocal of the grid dimensions: one texel step in UV space.
    pub fn texel_size(&self) -> Vec2 {
        Vec2::new(1.0 / self.width as f32, 1.0 / self.height as f32)
    }

    pub fn data(&self) -> &[f32] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [f32] {
        &mut self.data
    }

    pub fn clear(&mut self) {
        self.data.fill(0.0);
    }

    /// UV coordinate of the center of texel `(x, y)`.
    pub fn texel_center(&self, x: usize, y: usize) -> Vec2 {
        Vec2::new(
            (x as f32 + 0.5) / self.width as f32,
            (y as f32 + 0.5) / self.height as f32,
        )
    }

    pub fn get(&self, x: usize, y: usize, channel: usize) -> f32 {
        self.data[(y * self.width + x) * self.channels() + channel]
    }

    pub fn set(&mut self, x: usize, y: usize, channel: usize, value: f32) {
        let channels = self.channels();
        self.data[(y * self.width + x) * channels + channel] = value;
    }

    /// Texel value with coordinates clamped to the edge. Missing channels read as zero.
    pub fn fetch(&self, x: isize, y: isize) -> [f32; 4] {
        let x = x.clamp(0, self.width as isize - 1) as usize;
        let y = y.clamp(0, self.height as isize - 1) as usize;
        let channels = self.channels();
        let start = (y * self.width + x) * channels;

        let mut out = [0.0; 4];
        out[..channels].copy_from_slice(&self.data[start..start + channels]);
        out
    }

    /// Bilinear sample at a UV coordinate with clamp-to-edge addressing.
    pub fn sample(&self, uv: Vec2) -> [f32; 4] {
        let x = uv.x * self.width as f32 - 0.5;
        let y = uv.y * self.height as f32 - 0.5;

        let x0 = x.floor();
        let y0 = y.floor();
        let sx = x - x0;
        let sy = y - y0;
        let x0 = x0 as isize;
        let y0 = y0 as isize;

        let v00 = self.fetch(x0, y0);
        let v10 = self.fetch(x0 + 1, y0);
        let v01 = self.fetch(x0, y0 + 1);
        let v11 = self.fetch(x0 + 1, y0 + 1);

        let mut out = [0.0; 4];
        for c in 0..self.channels() {
            out[c] = (1.0 - sx) * (1.0 - sy) * v00[c]
                + sx * (1.0 - sy) * v10[c]
                + (1.0 - sx) * sy * v01[c]
                + sx * sy * v11[c];
        }
        out
    }

    /// Overwrites every texel with `f(x, y)`, one row per rayon task.
    /// Only the first `channels()` components of the returned value are stored.
    pub fn par_fill<F>(&mut self, f: F)
    where
        F: Fn(usize, usize) -> [f32; 4] + Sync + Send,
    {
        let width = self.width;
        let channels = self.channels();

        self.data
            .par_chunks_mut(width * channels)
            .enumerate()
            .for_each(|(y, row)| {
                for (x, texel) in row.chunks_mut(channels).enumerate() {
                    let value = f(x, y);
                    texel.copy_from_slice(&value[..channels]);
                }
            });
    }

    pub fn channel_sum(&self, channel: usize) -> f32 {
        self.data
            .iter()
            .skip(channel)
            .step_by(self.channels())
            .sum()
    }

    pub fn max_abs(&self) -> f32 {
        self.data.iter().fold(0.0f32, |acc, v| acc.max(v.abs()))
    }
}

/// Two same-shaped fields where one is read and the other written.
///
/// `swap` flips which buffer is current; it never moves or allocates data.
#[derive(Debug, Clone)]
pub struct DoubleField {
    buffers: [Field; 2],
    read_index: usize,
}

impl DoubleField {
    pub fn new(width: usize, height: usize, layout: ChannelLayout) -> Self {
        Self {
            buffers: [
                Field::new(width, height, layout),
                Field::new(width, height, layout),
            ],
            read_index: 0,
        }
    }

    pub fn width(&self) -> usize {
        self.buffers[0].width()
    }

    pub fn height(&self) -> usize {
        self.buffers[0].height()
    }

    pub fn layout(&self) -> ChannelLayout {
        self.buffers[0].layout()
    }

    pub fn texel_size(&self) -> Vec2 {
        self.buffers[0].texel_size()
    }

    pub fn read_index(&self) -> usize {
        self.read_index
    }

    pub fn read(&self) -> &Field {
        &self.buffers[self.read_index]
    }

    pub fn read_mut(&mut self) -> &mut Field {
        &mut self.buffers[self.read_index]
    }

    pub fn write(&self) -> &Field {
        &self.buffers[1 - self.read_index]
    }

    pub fn write_mut(&mut self) -> &mut Field {
        &mut self.buffers[1 - self.read_index]
    }

    /// Borrows the current buffer for sampling and the other for output.
    pub fn split(&mut self) -> (&Field, &mut Field) {
        let (first, second) = self.buffers.split_at_mut(1);
        if self.read_index == 0 {
            (&first[0], &mut second[0])
        } else {
            (&second[0], &mut first[0])
        }
    }

    /// Commits the last write as the new read buffer.
    pub fn swap(&mut self) {
        self.read_index = 1 - self.read_index;
    }

    /// Reallocates both buffers. Previous contents are discarded, not resampled.
    pub fn resize(&mut self, width: usize, height: usize) {
        let layout = self.layout();
        *self = Self::new(width, height, layout);
    }

    pub fn clear(&mut self) {
        self.buffers[0].clear();
        self.buffers[1].clear();
    }
}
