//! Adaptive per-pixel background model.
//!
//! Each pixel keeps a running Gaussian (mean, variance) of its grey level.
//! A pixel is foreground when its squared distance to the mean exceeds
//! `variance_threshold` times the variance. The learning rate starts high so
//! the model settles within a few frames and decays to `1 / history`.

use image::GrayImage;

use super::morphology::Mask;

const INITIAL_VARIANCE: f32 = 15.0;
const MIN_VARIANCE: f32 = 4.0;
const MAX_VARIANCE: f32 = 75.0;

#[derive(Debug, Clone)]
pub struct BackgroundModel {
    history: u32,
    variance_threshold: f32,
    width: u32,
    height: u32,
    mean: Vec<f32>,
    variance: Vec<f32>,
    frames_seen: u32,
}

impl BackgroundModel {
    pub fn new(history: u32, variance_threshold: f32) -> Self {
        Self {
            history: history.max(1),
            variance_threshold,
            width: 0,
            height: 0,
            mean: Vec::new(),
            variance: Vec::new(),
            frames_seen: 0,
        }
    }

    pub fn frames_seen(&self) -> u32 {
        self.frames_seen
    }

    /// Classifies `frame` against the model, then folds it into the model.
    pub fn apply(&mut self, frame: &GrayImage) -> Mask {
        let (width, height) = frame.dimensions();
        if width != self.width || height != self.height || self.frames_seen == 0 {
            self.seed(frame);
            return Mask::empty(width, height);
        }

        self.frames_seen = self.frames_seen.saturating_add(1);
        let rate = 1.0 / self.frames_seen.saturating_mul(2).min(self.history) as f32;
        let mut mask = Mask::empty(width, height);

        for (index, pixel) in frame.as_raw().iter().enumerate() {
            let value = *pixel as f32;
            let mean = &mut self.mean[index];
            let variance = &mut self.variance[index];
            let delta = value - *mean;
            let distance = delta * delta;

            if distance > self.variance_threshold * *variance {
                mask.set_index(index, true);
            }

            *mean += rate * delta;
            *variance = (*variance + rate * (distance - *variance)).clamp(MIN_VARIANCE, MAX_VARIANCE);
        }
        mask
    }

    fn seed(&mut self, frame: &GrayImage) {
        let (width, height) = frame.dimensions();
        self.width = width;
        self.height = height;
        self.mean = frame.as_raw().iter().map(|p| *p as f32).collect();
        self.variance = vec![INITIAL_VARIANCE; self.mean.len()];
        self.frames_seen = 1;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::Luma;

    #[test]
    fn test_static_scene_has_no_foreground() {
        let mut model = BackgroundModel::new(500, 16.0);
        let frame = GrayImage::from_pixel(40, 30, Luma([90]));
        for _ in 0..10 {
            let mask = model.apply(&frame);
            assert_eq!(mask.count(), 0);
        }
        assert_eq!(model.frames_seen(), 10);
    }

    #[test]
    fn test_change_is_foreground_then_absorbed() {
        let mut model = BackgroundModel::new(20, 16.0);
        let dark = GrayImage::from_pixel(10, 10, Luma([10]));
        let bright = GrayImage::from_pixel(10, 10, Luma([200]));
        for _ in 0..5 {
            model.apply(&dark);
        }
        assert_eq!(model.apply(&bright).count(), 100);
        for _ in 0..200 {
            model.apply(&bright);
        }
        assert_eq!(model.apply(&bright).count(), 0);
    }

    #[test]
    fn test_resolution_change_reseeds() {
        let mut model = BackgroundModel::new(500, 16.0);
        model.apply(&GrayImage::from_pixel(10, 10, Luma([10])));
        model.apply(&GrayImage::from_pixel(10, 10, Luma([10])));
        let mask = model.apply(&GrayImage::from_pixel(20, 10, Luma([250])));
        assert_eq!(mask.count(), 0);
        assert_eq!(model.frames_seen(), 1);
    }

    #[test]
    fn test_long_running_model_keeps_learning() {
        let mut model = BackgroundModel::new(500, 16.0);
        let frame = GrayImage::from_pixel(8, 8, Luma([60]));
        model.apply(&frame);
        model.frames_seen = u32::MAX / 2 + 1;
        assert_eq!(model.apply(&frame).count(), 0);
        model.frames_seen = u32::MAX;
        assert_eq!(model.apply(&frame).count(), 0);
        assert_eq!(model.frames_seen(), u32::MAX);
    }
}
