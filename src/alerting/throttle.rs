use std::collections::HashMap;
use std::time::{Duration, Instant};

use log::debug;

use super::types::Alert;

/// Per-camera repeat suppression, keyed by [`Alert::throttle_key`].
///
/// Independent of the behavior analyzer's own cooldown; both limits apply.
#[derive(Debug)]
pub struct AlertThrottle {
    window: Duration,
    last_fired: HashMap<String, Instant>,
}

impl AlertThrottle {
    pub fn new(window: Duration) -> Self {
        Self {
            window,
            last_fired: HashMap::new(),
        }
    }

    pub fn admit(&mut self, alert: &Alert) -> bool {
        self.admit_at(alert, Instant::now())
    }

    /// Returns whether `alert` may be delivered at `now`, and if so records it.
    pub fn admit_at(&mut self, alert: &Alert, now: Instant) -> bool {
        if alert.is_throttle_exempt() {
            return true;
        }
        let key = alert.throttle_key();
        if let Some(last) = self.last_fired.get(&key) {
            if now.saturating_duration_since(*last) < self.window {
                debug!("[{}] {} alert throttled", alert.camera_id, key);
                return false;
            }
        }
        self.last_fired.insert(key, now);
        true
    }

    pub fn clear(&mut self) {
        self.last_fired.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::alerting::types::{AlertCategory, Details};
    use crate::configuration::types::CameraRole;

    fn idle() -> Alert {
        Alert::behavior(
            AlertCategory::Idle,
            0.85,
            Details::new(),
            "cam-1",
            CameraRole::Activity,
        )
    }

    #[test]
    fn test_repeat_within_window_suppressed() {
        let mut throttle = AlertThrottle::new(Duration::from_secs(60));
        let start = Instant::now();
        assert!(throttle.admit_at(&idle(), start));
        assert!(!throttle.admit_at(&idle(), start + Duration::from_secs(10)));
    }

    #[test]
    fn test_repeat_after_window_delivered() {
        let mut throttle = AlertThrottle::new(Duration::from_secs(60));
        let start = Instant::now();
        assert!(throttle.admit_at(&idle(), start));
        assert!(throttle.admit_at(&idle(), start + Duration::from_secs(61)));
    }

    #[test]
    fn test_categories_throttled_independently() {
        let mut throttle = AlertThrottle::new(Duration::from_secs(60));
        let start = Instant::now();
        let wandering = Alert::behavior(
            AlertCategory::Wandering,
            0.8,
            Details::new(),
            "cam-1",
            CameraRole::Activity,
        );
        assert!(throttle.admit_at(&idle(), start));
        assert!(throttle.admit_at(&wandering, start + Duration::from_secs(1)));
    }

    #[test]
    fn test_attendance_repeats_suppressed_across_employees() {
        use crate::collaborators::types::AttendanceDirection;

        let mut throttle = AlertThrottle::new(Duration::from_secs(60));
        let start = Instant::now();
        let first = Alert::attendance("E1", "Asha", AttendanceDirection::Entry, 0.9, "door-1");
        let second = Alert::attendance("E2", "Ravi", AttendanceDirection::Entry, 0.9, "door-1");
        assert!(throttle.admit_at(&first, start));
        assert!(!throttle.admit_at(&second, start + Duration::from_secs(10)));
        assert!(throttle.admit_at(&second, start + Duration::from_secs(61)));
    }

    #[test]
    fn test_unauthorized_on_door_never_suppressed() {
        let mut throttle = AlertThrottle::new(Duration::from_secs(60));
        let start = Instant::now();
        for i in 0..20 {
            let alert = Alert::unauthorized(1, "door-1");
            assert!(throttle.admit_at(&alert, start + Duration::from_millis(i * 100)));
        }
    }
}
