use std::time::{Duration, Instant};
use tracing::info;

/// How long the locked-proceed shake lasts
pub const SHAKE_DURATION: Duration = Duration::from_millis(600);

/// Page the proceed action navigates to
pub const NEXT_PAGE: u8 = 2;

/// Notified after every countdown tick with the freshly rendered text
pub trait TickObserver {
    fn on_tick(&mut self, text: &str);
}

/// Countdown towards a deadline; the observer is fixed at construction
#[derive(Debug)]
pub struct Countdown<O: TickObserver> {
    deadline: Instant,
    text: String,
    observer: Option<O>,
}

impl<O: TickObserver> Countdown<O> {
    pub fn with_observer(deadline: Instant, observer: Option<O>) -> Self {
        Self {
            deadline,
            text: format_remaining(Duration::ZERO),
            observer,
        }
    }

    pub fn tick(&mut self, now: Instant) {
        self.text = format_remaining(self.deadline.saturating_duration_since(now));
        if let Some(observer) = self.observer.as_mut() {
            observer.on_tick(&self.text);
        }
    }

    pub fn text(&self) -> &str {
        &self.text
    }

    pub fn observer(&self) -> Option<&O> {
        self.observer.as_ref()
    }

    pub fn observer_mut(&mut self) -> Option<&mut O> {
        self.observer.as_mut()
    }
}

/// "1d 02h 03m 04s"
pub fn format_remaining(remaining: Duration) -> String {
    let total = remaining.as_secs();
    let days = total / 86_400;
    let hours = (total % 86_400) / 3_600;
    let minutes = (total % 3_600) / 60;
    let seconds = total % 60;
    format!("{}d {:02}h {:02}m {:02}s", days, hours, minutes, seconds)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProceedAction {
    /// Locked: acknowledge with a shake
    Shake,
    /// Go to the given page
    Navigate(u8),
}

/// State behind the "proceed" button
#[derive(Debug, Default)]
pub struct ProceedGate {
    locked: bool,
    aria_label: String,
    shake_until: Option<Instant>,
}

impl ProceedGate {
    pub fn new(locked: bool) -> Self {
        Self {
            locked,
            ..Self::default()
        }
    }

    pub fn set_locked(&mut self, locked: bool) {
        self.locked = locked;
    }

    pub fn is_locked(&self) -> bool {
        self.locked
    }

    /// `aria-disabled` mirror
    pub fn aria_disabled(&self) -> &'static str {
        if self.locked {
            "true"
        } else {
            "false"
        }
    }

    pub fn aria_label(&self) -> &str {
        &self.aria_label
    }

    pub fn try_proceed(&mut self, now: Instant) -> ProceedAction {
        if self.locked {
            // Restarts the animation if one is already running
            self.shake_until = Some(now + SHAKE_DURATION);
            return ProceedAction::Shake;
        }
        info!(page = NEXT_PAGE, "proceeding");
        ProceedAction::Navigate(NEXT_PAGE)
    }

    pub fn is_shaking(&self, now: Instant) -> bool {
        self.shake_until.is_some_and(|until| now < until)
    }
}

impl TickObserver for ProceedGate {
    fn on_tick(&mut self, text: &str) {
        self.aria_label = format!("Time remaining: {}", text);
        self.set_locked(false);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_remaining() {
        assert_eq!(format_remaining(Duration::ZERO), "0d 00h 00m 00s");
        assert_eq!(
            format_remaining(Duration::from_secs(86_400 + 2 * 3_600 + 3 * 60 + 4)),
            "1d 02h 03m 04s"
        );
        assert_eq!(format_remaining(Duration::from_millis(59_999)), "0d 00h 00m 59s");
    }

    #[test]
    fn test_tick_notifies_observer() {
        let start = Instant::now();
        let deadline = start + Duration::from_secs(90);
        let mut countdown = Countdown::with_observer(deadline, Some(ProceedGate::new(true)));

        countdown.tick(start);
        assert_eq!(countdown.text(), "0d 00h 01m 30s");
        let gate = countdown.observer().unwrap();
        assert_eq!(gate.aria_label(), "Time remaining: 0d 00h 01m 30s");
        assert!(!gate.is_locked());
        assert_eq!(gate.aria_disabled(), "false");

        // Past the deadline the count stays at zero
        countdown.tick(start + Duration::from_secs(600));
        assert_eq!(countdown.text(), "0d 00h 00m 00s");
    }

    #[test]
    fn test_tick_without_observer() {
        let start = Instant::now();
        let mut countdown: Countdown<ProceedGate> =
            Countdown::with_observer(start + Duration::from_secs(5), None);
        countdown.tick(start);
        assert_eq!(countdown.text(), "0d 00h 00m 05s");
        assert!(countdown.observer().is_none());
    }

    #[test]
    fn test_locked_gate_shakes() {
        let now = Instant::now();
        let mut gate = ProceedGate::new(true);
        assert_eq!(gate.aria_disabled(), "true");

        assert_eq!(gate.try_proceed(now), ProceedAction::Shake);
        assert!(gate.is_shaking(now + Duration::from_millis(599)));
        assert!(!gate.is_shaking(now + SHAKE_DURATION));

        // A second press restarts the shake
        let later = now + Duration::from_millis(500);
        gate.try_proceed(later);
        assert!(gate.is_shaking(now + Duration::from_millis(900)));
    }

    #[test]
    fn test_unlocked_gate_navigates() {
        let mut gate = ProceedGate::new(false);
        assert_eq!(gate.try_proceed(Instant::now()), ProceedAction::Navigate(2));
        assert!(!gate.is_shaking(Instant::now()));
    }
}
