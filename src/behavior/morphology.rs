//! Binary foreground masks: noise suppression and connected regions.

/// Binary image, row-major.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Mask {
    width: u32,
    height: u32,
    data: Vec<bool>,
}

/// A connected foreground region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Region {
    pub area: u32,
    pub centroid_x: f64,
    pub centroid_y: f64,
}

impl Mask {
    pub fn empty(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            data: vec![false; width as usize * height as usize],
        }
    }

    pub fn width(&self) -> u32 {
        self.width
    }

    pub fn height(&self) -> u32 {
        self.height
    }

    pub fn get(&self, x: u32, y: u32) -> bool {
        self.data[self.index(x, y)]
    }

    pub fn set(&mut self, x: u32, y: u32, value: bool) {
        let index = self.index(x, y);
        self.data[index] = value;
    }

    pub(crate) fn set_index(&mut self, index: usize, value: bool) {
        self.data[index] = value;
    }

    pub fn count(&self) -> usize {
        self.data.iter().filter(|v| **v).count()
    }

    /// Fraction of foreground pixels; 0 for an empty mask.
    pub fn ratio(&self) -> f64 {
        if self.data.is_empty() {
            0.0
        } else {
            self.count() as f64 / self.data.len() as f64
        }
    }

    fn index(&self, x: u32, y: u32) -> usize {
        y as usize * self.width as usize + x as usize
    }

    /// 3x3 erosion; pixels outside the image do not count against a pixel.
    pub fn erode(&self) -> Mask {
        self.sweep(true)
    }

    /// 3x3 dilation.
    pub fn dilate(&self) -> Mask {
        self.sweep(false)
    }

    /// Separable 3x3 min (erode) or max (dilate) filter.
    fn sweep(&self, erode: bool) -> Mask {
        let (w, h) = (self.width as usize, self.height as usize);
        let combine = |a: bool, b: bool| if erode { a && b } else { a || b };

        let mut horizontal = vec![false; self.data.len()];
        for y in 0..h {
            let row = y * w;
            for x in 0..w {
                let mut value = self.data[row + x];
                if x > 0 {
                    value = combine(value, self.data[row + x - 1]);
                }
                if x + 1 < w {
                    value = combine(value, self.data[row + x + 1]);
                }
                horizontal[row + x] = value;
            }
        }

        let mut data = vec![false; self.data.len()];
        for y in 0..h {
            for x in 0..w {
                let index = y * w + x;
                let mut value = horizontal[index];
                if y > 0 {
                    value = combine(value, horizontal[index - w]);
                }
                if y + 1 < h {
                    value = combine(value, horizontal[index + w]);
                }
                data[index] = value;
            }
        }

        Mask {
            width: self.width,
            height: self.height,
            data,
        }
    }

    /// Erode once, dilate twice: removes speckle and closes small gaps.
    pub fn denoise(&self) -> Mask {
        self.erode().dilate().dilate()
    }

    /// Largest 8-connected foreground region, if any.
    pub fn largest_region(&self) -> Option<Region> {
        let (w, h) = (self.width as usize, self.height as usize);
        let mut visited = vec![false; self.data.len()];
        let mut stack = Vec::new();
        let mut best: Option<Region> = None;

        for start in 0..self.data.len() {
            if !self.data[start] || visited[start] {
                continue;
            }
            visited[start] = true;
            stack.push(start);

            let (mut area, mut sum_x, mut sum_y) = (0u32, 0f64, 0f64);
            while let Some(index) = stack.pop() {
                let (x, y) = (index % w, index / w);
                area += 1;
                sum_x += x as f64;
                sum_y += y as f64;

                for ny in y.saturating_sub(1)..=(y + 1).min(h - 1) {
                    for nx in x.saturating_sub(1)..=(x + 1).min(w - 1) {
                        let neighbour = ny * w + nx;
                        if self.data[neighbour] && !visited[neighbour] {
                            visited[neighbour] = true;
                            stack.push(neighbour);
                        }
                    }
                }
            }

            if best.map_or(true, |b| area > b.area) {
                best = Some(Region {
                    area,
                    centroid_x: sum_x / area as f64,
                    centroid_y: sum_y / area as f64,
                });
            }
        }
        best
    }
}
