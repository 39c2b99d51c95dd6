use std::collections::VecDeque;
use std::fmt;
use std::time::{Duration, Instant};

use image::{imageops, RgbImage};
use log::{debug, trace};
use serde::{Deserialize, Serialize};
use serde_json::json;

use crate::alerting::types::Details;
use crate::configuration::types::BehaviorConfig;

use super::background::BackgroundModel;

/// Behavior classes the analyzer can emit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BehaviorCategory {
    Idle,
    Wandering,
    Absence,
}

impl BehaviorCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            BehaviorCategory::Idle => "idle",
            BehaviorCategory::Wandering => "wandering",
            BehaviorCategory::Absence => "absence",
        }
    }
}

impl fmt::Display for BehaviorCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct BehaviorFinding {
    pub category: BehaviorCategory,
    pub confidence: f64,
    pub details: Details,
}

/// Centroid and area of the largest foreground region.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PersonProxy {
    pub x: f64,
    pub y: f64,
    pub area: u32,
}

/// What one frame contributed to the analyzer state.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub motion_ratio: f64,
    pub person: Option<PersonProxy>,
}

/// Per-camera motion and position detector.
///
/// Each call folds one frame into a background model, records the motion
/// ratio and the person proxy position, and then classifies the recent
/// history as idle, wandering or absent. A single cooldown covers every
/// category: once anything fires, nothing else fires until it expires.
pub struct BehaviorAnalyzer {
    config: BehaviorConfig,
    background: BackgroundModel,
    motion: VecDeque<f64>,
    positions: VecDeque<(f64, f64)>,
    last_fired: Option<Instant>,
}

impl BehaviorAnalyzer {
    pub fn new(config: &BehaviorConfig) -> Self {
        Self {
            config: config.clone(),
            background: BackgroundModel::new(config.background_history, config.variance_threshold),
            motion: VecDeque::with_capacity(config.motion_history),
            positions: VecDeque::with_capacity(config.position_history),
            last_fired: None,
        }
    }

    pub fn analyze(&mut self, frame: &RgbImage) -> Option<BehaviorFinding> {
        self.analyze_at(frame, Instant::now())
    }

    pub fn analyze_at(&mut self, frame: &RgbImage, now: Instant) -> Option<BehaviorFinding> {
        let observation = self.observe(frame);
        self.classify(observation, now)
    }

    /// Extracts the motion ratio and person proxy from a frame.
    pub fn observe(&mut self, frame: &RgbImage) -> Observation {
        let gray = imageops::grayscale(frame);
        let mask = self.background.apply(&gray).denoise();
        let person = mask
            .largest_region()
            .filter(|region| region.area >= self.config.min_person_area)
            .map(|region| PersonProxy {
                x: region.centroid_x,
                y: region.centroid_y,
                area: region.area,
            });
        Observation {
            motion_ratio: mask.ratio(),
            person,
        }
    }

    /// Records `observation` and classifies the accumulated history.
    pub fn classify(&mut self, observation: Observation, now: Instant) -> Option<BehaviorFinding> {
        push_bounded(&mut self.motion, observation.motion_ratio, self.config.motion_history);
        if let Some(person) = observation.person {
            push_bounded(
                &mut self.positions,
                (person.x, person.y),
                self.config.position_history,
            );
        }
        trace!(
            "motion={:.4} person={:?} samples={}",
            observation.motion_ratio,
            observation.person,
            self.motion.len()
        );

        if let Some(last) = self.last_fired {
            if now.saturating_duration_since(last) < self.config.alert_cooldown() {
                return None;
            }
        }
        if self.motion.len() < self.config.warmup_samples {
            return None;
        }

        let finding = self
            .idle()
            .or_else(|| self.wandering())
            .or_else(|| self.absence(observation.person.is_none()))?;

        debug!(
            "Behavior {} detected (confidence {:.2})",
            finding.category, finding.confidence
        );
        self.last_fired = Some(now);
        Some(finding)
    }

    /// Clears all history and starts a fresh background model.
    pub fn reset(&mut self) {
        self.background =
            BackgroundModel::new(self.config.background_history, self.config.variance_threshold);
        self.motion.clear();
        self.positions.clear();
        self.last_fired = None;
    }

    pub fn samples(&self) -> usize {
        self.motion.len()
    }

    pub fn positions(&self) -> usize {
        self.positions.len()
    }

    pub fn cooldown_remaining(&self, now: Instant) -> Duration {
        match self.last_fired {
            Some(last) => self
                .config
                .alert_cooldown()
                .saturating_sub(now.saturating_duration_since(last)),
            None => Duration::ZERO,
        }
    }

    fn recent_motion(&self) -> impl Iterator<Item = f64> + '_ {
        let window = self.config.warmup_samples.min(self.motion.len());
        self.motion.iter().skip(self.motion.len() - window).copied()
    }

    fn average_motion(&self) -> f64 {
        let (sum, count) = self
            .recent_motion()
            .fold((0.0, 0usize), |(sum, count), m| (sum + m, count + 1));
        if count == 0 {
            0.0
        } else {
            sum / count as f64
        }
    }

    fn idle(&self) -> Option<BehaviorFinding> {
        let average = self.average_motion();
        if average >= self.config.idle_motion_ratio {
            return None;
        }
        let quiet = self
            .recent_motion()
            .filter(|m| *m < self.config.idle_motion_ratio)
            .count();
        let idle_seconds = quiet as f64 / self.config.nominal_fps;
        if idle_seconds <= self.config.idle_seconds {
            return None;
        }

        let mut details = Details::new();
        details.insert("avg_motion".into(), json!(average));
        details.insert("idle_seconds".into(), json!(idle_seconds));
        Some(BehaviorFinding {
            category: BehaviorCategory::Idle,
            confidence: 0.85,
            details,
        })
    }

    fn wandering(&self) -> Option<BehaviorFinding> {
        let needed = self.config.wander_min_positions;
        if needed == 0 || self.positions.len() < needed {
            return None;
        }
        let recent: Vec<(f64, f64)> = self
            .positions
            .iter()
            .skip(self.positions.len() - needed)
            .copied()
            .collect();
        let distance: f64 = recent
            .windows(2)
            .map(|pair| {
                let (dx, dy) = (pair[1].0 - pair[0].0, pair[1].1 - pair[0].1);
                (dx * dx + dy * dy).sqrt()
            })
            .sum();
        let average = self.average_motion();
        if distance <= self.config.wander_distance_px || average <= self.config.wander_motion_ratio {
            return None;
        }

        let mut details = Details::new();
        details.insert("movement_distance".into(), json!(distance));
        details.insert("avg_motion".into(), json!(average));
        details.insert("positions".into(), json!(recent.len()));
        Some(BehaviorFinding {
            category: BehaviorCategory::Wandering,
            confidence: 0.80,
            details,
        })
    }

    /// A person was seen earlier and the scene has since gone still.
    fn absence(&self, no_person: bool) -> Option<BehaviorFinding> {
        if !no_person || self.positions.is_empty() {
            return None;
        }
        let quiet = self
            .motion
            .iter()
            .rev()
            .take(self.config.absence_window)
            .filter(|m| **m < self.config.absence_motion_ratio)
            .count();
        if quiet < self.config.absence_min_quiet {
            return None;
        }

        let mut details = Details::new();
        details.insert("quiet_samples".into(), json!(quiet));
        details.insert("window".into(), json!(self.config.absence_window));
        Some(BehaviorFinding {
            category: BehaviorCategory::Absence,
            confidence: 0.75,
            details,
        })
    }
}

fn push_bounded<T>(queue: &mut VecDeque<T>, value: T, capacity: usize) {
    if capacity == 0 {
        return;
    }
    while queue.len() >= capacity {
        queue.pop_front();
    }
    queue.push_back(value);
}
