//! Human approval gate for proposed actions.
//!
//! Three FIFO queues (pending, approved, rejected) move together under
//! one mutex; the executor thread blocks on a condvar in
//! [`ApprovalQueue::pop_approved`]. Urgent actions can bypass the queue
//! entirely depending on the mode - `submit` returning `true` means
//! "not queued, execute where you stand", which is what makes every
//! action execute at most once.
//!
//! Pending entries expire into the *approved* queue, not into
//! rejection: they had their chance. Implementers of the UI see the
//! `expired` flag and can render them differently.

use std::collections::VecDeque;
use std::sync::{Condvar, Mutex};
use std::time::{Duration, Instant};

use crate::action::schema::{MixAction, Urgency};

/// What needs human sign-off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ApprovalMode {
    /// Every action needs approval
    ApproveAll,
    /// Auto-approve Immediate/Fast urgency
    #[default]
    AutoUrgent,
    /// Auto-approve everything (demo/testing)
    AutoAll,
    /// Reject everything (safe mode)
    DenyAll,
}

impl ApprovalMode {
    pub fn from_config(s: &str) -> ApprovalMode {
        match s {
            "approve_all" => ApprovalMode::ApproveAll,
            "auto_all" => ApprovalMode::AutoAll,
            "deny_all" => ApprovalMode::DenyAll,
            _ => ApprovalMode::AutoUrgent,
        }
    }
}

/// A pending or resolved queue entry.
#[derive(Debug, Clone)]
pub struct QueuedAction {
    pub action: MixAction,
    pub queued_at: Instant,
    pub timeout: Duration,
    /// True when this entry was approved by timeout rather than a human
    pub expired: bool,
}

type RejectionCallback = Box<dyn Fn(&MixAction) + Send + Sync>;

#[derive(Default)]
struct Queues {
    mode: ApprovalMode,
    pending: VecDeque<QueuedAction>,
    approved: VecDeque<QueuedAction>,
    rejected: VecDeque<QueuedAction>,
}

#[derive(Default)]
pub struct ApprovalQueue {
    inner: Mutex<Queues>,
    cv: Condvar,
    on_rejected: Mutex<Option<RejectionCallback>>,
}

fn timeout_for(urgency: Urgency) -> Duration {
    match urgency {
        Urgency::Immediate => Duration::from_millis(500),
        Urgency::Fast => Duration::from_secs(2),
        Urgency::Normal => Duration::from_secs(10),
        Urgency::Low => Duration::from_secs(30),
    }
}

impl ApprovalQueue {
    pub fn new(mode: ApprovalMode) -> Self {
        Self {
            inner: Mutex::new(Queues { mode, ..Queues::default() }),
            cv: Condvar::new(),
            on_rejected: Mutex::new(None),
        }
    }

    pub fn set_mode(&self, mode: ApprovalMode) {
        self.inner.lock().unwrap().mode = mode;
    }

    pub fn mode(&self) -> ApprovalMode {
        self.inner.lock().unwrap().mode
    }

    /// Invoked with every rejected action (the preference learner
    /// counts rejections through this).
    pub fn set_rejection_callback(&self, cb: RejectionCallback) {
        *self.on_rejected.lock().unwrap() = Some(cb);
    }

    /// Submit an action. Returns `true` if it was auto-approved - the
    /// caller must validate and execute it; it was NOT enqueued.
    /// Returns `false` when it went to pending (or straight to
    /// rejected in DenyAll).
    pub fn submit(&self, action: MixAction) -> bool {
        let rejected = {
            let mut inner = self.inner.lock().unwrap();
            match inner.mode {
                ApprovalMode::AutoAll => return true,
                ApprovalMode::AutoUrgent
                    if matches!(action.urgency, Urgency::Immediate | Urgency::Fast) =>
                {
                    return true;
                }
                ApprovalMode::DenyAll => {
                    inner.rejected.push_back(QueuedAction {
                        action: action.clone(),
                        queued_at: Instant::now(),
                        timeout: Duration::ZERO,
                        expired: false,
                    });
                    Some(action)
                }
                _ => {
                    let timeout = timeout_for(action.urgency);
                    inner.pending.push_back(QueuedAction {
                        action,
                        queued_at: Instant::now(),
                        timeout,
                        expired: false,
                    });
                    self.cv.notify_all();
                    None
                }
            }
        };

        if let Some(action) = rejected {
            self.notify_rejected(&action);
        }
        false
    }

    /// Snapshot of the pending queue for UI display.
    pub fn pending(&self) -> Vec<QueuedAction> {
        self.inner.lock().unwrap().pending.iter().cloned().collect()
    }

    pub fn pending_count(&self) -> usize {
        self.inner.lock().unwrap().pending.len()
    }

    pub fn rejected_count(&self) -> usize {
        self.inner.lock().unwrap().rejected.len()
    }

    /// Manually approve the pending entry at `index`.
    pub fn approve(&self, index: usize) -> bool {
        let mut inner = self.inner.lock().unwrap();
        if index >= inner.pending.len() {
            return false;
        }
        let entry = inner.pending.remove(index).unwrap();
        inner.approved.push_back(entry);
        self.cv.notify_all();
        true
    }

    /// Manually reject the pending entry at `index`.
    pub fn reject(&self, index: usize) -> bool {
        let action = {
            let mut inner = self.inner.lock().unwrap();
            if index >= inner.pending.len() {
                return false;
            }
            let entry = inner.pending.remove(index).unwrap();
            let action = entry.action.clone();
            inner.rejected.push_back(entry);
            action
        };
        self.notify_rejected(&action);
        true
    }

    pub fn approve_all(&self) {
        let mut inner = self.inner.lock().unwrap();
        while let Some(entry) = inner.pending.pop_front() {
            inner.approved.push_back(entry);
        }
        self.cv.notify_all();
    }

    pub fn reject_all(&self) {
        let actions: Vec<MixAction> = {
            let mut inner = self.inner.lock().unwrap();
            let mut actions = Vec::new();
            while let Some(entry) = inner.pending.pop_front() {
                actions.push(entry.action.clone());
                inner.rejected.push_back(entry);
            }
            actions
        };
        for action in &actions {
            self.notify_rejected(action);
        }
    }

    /// Pop the next approved entry, waiting up to `timeout` for one.
    /// The expiry sweep runs first so timed-out pending entries surface
    /// here in the order they expired.
    pub fn pop_approved(&self, timeout: Duration) -> Option<QueuedAction> {
        let mut inner = self.inner.lock().unwrap();
        expire_old(&mut inner);

        if let Some(entry) = inner.approved.pop_front() {
            return Some(entry);
        }

        let (mut inner, _wait) = self.cv.wait_timeout(inner, timeout).unwrap();
        expire_old(&mut inner);
        inner.approved.pop_front()
    }

    fn notify_rejected(&self, action: &MixAction) {
        if let Some(cb) = self.on_rejected.lock().unwrap().as_ref() {
            cb(action);
        }
    }
}

/// Move timed-out pending entries into approved, stamped `expired`.
fn expire_old(inner: &mut Queues) {
    let now = Instant::now();
    let mut i = 0;
    while i < inner.pending.len() {
        if now.duration_since(inner.pending[i].queued_at) > inner.pending[i].timeout {
            let mut entry = inner.pending.remove(i).unwrap();
            entry.expired = true;
            inner.approved.push_back(entry);
        } else {
            i += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::action::schema::ActionKind;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    fn action(urgency: Urgency) -> MixAction {
        MixAction {
            kind: ActionKind::SetFader,
            channel: 1,
            value: 0.5,
            urgency,
            ..MixAction::default()
        }
    }

    #[test]
    fn test_auto_urgent_gating() {
        let q = ApprovalQueue::new(ApprovalMode::AutoUrgent);

        assert!(q.submit(action(Urgency::Immediate)));
        assert_eq!(q.pending_count(), 0);

        assert!(q.submit(action(Urgency::Fast)));
        assert_eq!(q.pending_count(), 0);

        assert!(!q.submit(action(Urgency::Normal)));
        assert_eq!(q.pending_count(), 1);

        assert!(!q.submit(action(Urgency::Low)));
        assert_eq!(q.pending_count(), 2);
    }

    #[test]
    fn test_auto_all_and_approve_all_modes() {
        let q = ApprovalQueue::new(ApprovalMode::AutoAll);
        assert!(q.submit(action(Urgency::Low)));
        assert_eq!(q.pending_count(), 0);

        let q = ApprovalQueue::new(ApprovalMode::ApproveAll);
        assert!(!q.submit(action(Urgency::Immediate)));
        assert_eq!(q.pending_count(), 1);
    }

    #[test]
    fn test_deny_all_rejects_and_fires_callback() {
        let q = ApprovalQueue::new(ApprovalMode::DenyAll);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        q.set_rejection_callback(Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        assert!(!q.submit(action(Urgency::Immediate)));
        assert_eq!(q.pending_count(), 0);
        assert_eq!(q.rejected_count(), 1);
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_manual_approve_flows_to_executor() {
        let q = ApprovalQueue::new(ApprovalMode::ApproveAll);
        q.submit(action(Urgency::Normal));
        assert!(q.approve(0));
        assert_eq!(q.pending_count(), 0);

        let popped = q.pop_approved(Duration::from_millis(10)).unwrap();
        assert!(!popped.expired);
        assert_eq!(popped.action.channel, 1);
    }

    #[test]
    fn test_manual_reject_fires_callback() {
        let q = ApprovalQueue::new(ApprovalMode::ApproveAll);
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        q.set_rejection_callback(Box::new(move |_| {
            c.fetch_add(1, Ordering::SeqCst);
        }));

        q.submit(action(Urgency::Normal));
        assert!(q.reject(0));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(q.pop_approved(Duration::from_millis(10)).is_none());
    }

    #[test]
    fn test_invalid_index_is_refused() {
        let q = ApprovalQueue::new(ApprovalMode::ApproveAll);
        assert!(!q.approve(0));
        assert!(!q.reject(3));
    }

    #[test]
    fn test_expiry_converts_to_approved() {
        let q = ApprovalQueue::new(ApprovalMode::ApproveAll);
        // Immediate urgency has the shortest timeout (500ms)
        q.submit(action(Urgency::Immediate));
        assert_eq!(q.pending_count(), 1);

        std::thread::sleep(Duration::from_millis(600));
        let popped = q.pop_approved(Duration::from_millis(10)).unwrap();
        assert!(popped.expired);
        assert_eq!(q.pending_count(), 0);
    }

    #[test]
    fn test_pop_wakes_on_approval_from_other_thread() {
        let q = Arc::new(ApprovalQueue::new(ApprovalMode::ApproveAll));
        q.submit(action(Urgency::Normal));

        let q2 = q.clone();
        let handle = std::thread::spawn(move || {
            std::thread::sleep(Duration::from_millis(50));
            q2.approve(0);
        });

        let popped = q.pop_approved(Duration::from_secs(2));
        handle.join().unwrap();
        assert!(popped.is_some());
    }

    #[test]
    fn test_approve_all_preserves_fifo() {
        let q = ApprovalQueue::new(ApprovalMode::ApproveAll);
        for ch in 1..=3 {
            let mut a = action(Urgency::Normal);
            a.channel = ch;
            q.submit(a);
        }
        q.approve_all();
        for ch in 1..=3 {
            assert_eq!(q.pop_approved(Duration::from_millis(10)).unwrap().action.channel, ch);
        }
    }
}
