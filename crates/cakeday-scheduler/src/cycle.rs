use std::fmt;
use std::sync::Arc;

use cakeday_core::{recurrence, Employee, NotificationWindow, Subscriber};
use cakeday_notify::Notifier;
use cakeday_store::{DeliveryLedger, EventStore, SubscriptionResolver};
use chrono::Datelike;
use tracing::{debug, error, info, info_span, warn, Instrument};
use uuid::Uuid;

use crate::message::Notice;

/// What happened to one matched employee.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ItemOutcome {
    /// The notifier accepted a message for this many recipients.
    Delivered { recipients: usize },
    /// Nobody follows this employee.
    NoSubscribers,
    /// Every subscriber was already told about this year's birthday.
    Suppressed,
    /// Subscriber lookup failed; the employee was skipped.
    ResolveFailed,
    /// The notifier rejected or failed the message.
    DeliveryFailed,
}

/// Tally of one cycle, logged at the end of every pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub matched: usize,
    pub delivered: usize,
    pub recipients: usize,
    pub no_subscribers: usize,
    pub suppressed: usize,
    pub resolve_failures: usize,
    pub delivery_failures: usize,
    /// The event store query failed and nothing else was attempted.
    pub aborted: bool,
}

impl CycleReport {
    fn tally(&mut self, outcome: ItemOutcome) {
        match outcome {
            ItemOutcome::Delivered { recipients } => {
                self.delivered += 1;
                self.recipients += recipients;
            }
            ItemOutcome::NoSubscribers => self.no_subscribers += 1,
            ItemOutcome::Suppressed => self.suppressed += 1,
            ItemOutcome::ResolveFailed => self.resolve_failures += 1,
            ItemOutcome::DeliveryFailed => self.delivery_failures += 1,
        }
    }

    pub fn failures(&self) -> usize {
        self.resolve_failures + self.delivery_failures
    }
}

impl fmt::Display for CycleReport {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.aborted {
            return write!(f, "aborted: upcoming birthdays could not be read");
        }
        write!(
            f,
            "matched {}, delivered {} ({} recipients), no subscribers {}, \
             already notified {}, lookup failures {}, delivery failures {}",
            self.matched,
            self.delivered,
            self.recipients,
            self.no_subscribers,
            self.suppressed,
            self.resolve_failures,
            self.delivery_failures
        )
    }
}

/// One scan → resolve → deliver pass over the upcoming birthdays.
///
/// Failures are confined to the employee they happen on: a broken lookup or
/// a rejected message never stops the rest of the pass. Only a failed
/// event-store query ends the cycle early. `run` itself cannot fail.
pub struct NotificationCycle {
    events: Arc<dyn EventStore>,
    subscriptions: Arc<dyn SubscriptionResolver>,
    notifier: Arc<dyn Notifier>,
    /// When set, subscribers already told about an occurrence are skipped.
    ledger: Option<Arc<dyn DeliveryLedger>>,
}

impl NotificationCycle {
    pub fn new(
        events: Arc<dyn EventStore>,
        subscriptions: Arc<dyn SubscriptionResolver>,
        notifier: Arc<dyn Notifier>,
    ) -> Self {
        Self {
            events,
            subscriptions,
            notifier,
            ledger: None,
        }
    }

    /// Enable duplicate suppression through `ledger`.
    pub fn with_ledger(mut self, ledger: Arc<dyn DeliveryLedger>) -> Self {
        self.ledger = Some(ledger);
        self
    }

    /// Run one full pass for `window`.
    pub async fn run(&self, window: NotificationWindow) -> CycleReport {
        let span = info_span!("notification_cycle", cycle_id = %Uuid::new_v4(), %window);
        self.run_inner(window).instrument(span).await
    }

    async fn run_inner(&self, window: NotificationWindow) -> CycleReport {
        let mut report = CycleReport::default();

        let employees = match self.events.upcoming_recurring(window).await {
            Ok(employees) => employees,
            Err(e) => {
                error!(error = %e, "failed to get upcoming birthdays; cycle aborted");
                report.aborted = true;
                return report;
            }
        };
        report.matched = employees.len();
        debug!(matched = report.matched, "upcoming birthdays found");

        for employee in &employees {
            let outcome = self.notify_employee(employee, window).await;
            report.tally(outcome);
        }

        if report.failures() > 0 {
            warn!(%report, "notification cycle finished with failures");
        } else {
            info!(%report, "notification cycle finished");
        }
        report
    }

    async fn notify_employee(&self, employee: &Employee, window: NotificationWindow) -> ItemOutcome {
        let subscribers = match self.subscriptions.subscribers_of(employee.id).await {
            Ok(subscribers) => subscribers,
            Err(e) => {
                error!(employee_id = employee.id, error = %e, "failed to get subscribers");
                return ItemOutcome::ResolveFailed;
            }
        };
        if subscribers.is_empty() {
            debug!(employee_id = employee.id, "no subscribers");
            return ItemOutcome::NoSubscribers;
        }

        let occurrence_year = recurrence::next_occurrence(employee.birthday, window.start).year();
        let pending = self.pending(employee.id, occurrence_year, subscribers).await;
        if pending.is_empty() {
            debug!(employee_id = employee.id, occurrence_year, "all subscribers already notified");
            return ItemOutcome::Suppressed;
        }

        let notice = Notice::compose(employee, window.start);
        let addresses: Vec<String> = pending.iter().map(|s| s.email.clone()).collect();

        match self
            .notifier
            .deliver(&addresses, &notice.subject, &notice.body)
            .await
        {
            Ok(()) => {
                info!(
                    employee_id = employee.id,
                    recipients = addresses.len(),
                    notifier = self.notifier.name(),
                    "birthday notification sent"
                );
                self.remember(employee.id, occurrence_year, &pending).await;
                ItemOutcome::Delivered {
                    recipients: addresses.len(),
                }
            }
            Err(e) => {
                error!(
                    employee_id = employee.id,
                    recipients = addresses.len(),
                    notifier = self.notifier.name(),
                    error = %e,
                    "failed to send birthday notification"
                );
                ItemOutcome::DeliveryFailed
            }
        }
    }

    /// Drop subscribers the ledger says were already notified. A ledger that
    /// cannot be read filters nothing: a repeat mail beats a missed one.
    async fn pending(
        &self,
        employee_id: i64,
        occurrence_year: i32,
        subscribers: Vec<Subscriber>,
    ) -> Vec<Subscriber> {
        let Some(ledger) = &self.ledger else {
            return subscribers;
        };
        match ledger.notified(employee_id, occurrence_year).await {
            Ok(seen) => subscribers
                .into_iter()
                .filter(|s| !seen.contains(&s.user_id))
                .collect(),
            Err(e) => {
                warn!(employee_id, error = %e, "delivery ledger unreadable; not filtering");
                subscribers
            }
        }
    }

    async fn remember(&self, employee_id: i64, occurrence_year: i32, delivered: &[Subscriber]) {
        let Some(ledger) = &self.ledger else {
            return;
        };
        let ids: Vec<i64> = delivered.iter().map(|s| s.user_id).collect();
        if let Err(e) = ledger.record(employee_id, occurrence_year, &ids).await {
            warn!(employee_id, error = %e, "failed to record delivery; may notify again");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::collections::{HashMap, HashSet};
    use std::sync::Mutex;

    use async_trait::async_trait;
    use cakeday_notify::NotifyError;
    use cakeday_store::StoreError;
    use chrono::NaiveDate;

    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn employee(id: i64, name: &str, m: u32, d: u32) -> Employee {
        Employee {
            id,
            name: name.to_string(),
            birthday: date(1990, m, d),
        }
    }

    fn subscriber(user_id: i64, email: &str) -> Subscriber {
        Subscriber {
            user_id,
            email: email.to_string(),
        }
    }

    fn query_failed() -> StoreError {
        StoreError::QueryFailed(rusqlite::Error::InvalidQuery)
    }

    fn window() -> NotificationWindow {
        NotificationWindow::new(date(2024, 6, 1), 7)
    }

    struct FakeEvents {
        employees: Vec<Employee>,
        fail: bool,
    }

    #[async_trait]
    impl EventStore for FakeEvents {
        async fn upcoming_recurring(
            &self,
            _window: NotificationWindow,
        ) -> cakeday_store::Result<Vec<Employee>> {
            if self.fail {
                return Err(query_failed());
            }
            Ok(self.employees.clone())
        }
    }

    #[derive(Default)]
    struct FakeResolver {
        subscribers: HashMap<i64, Vec<Subscriber>>,
        failing: HashSet<i64>,
    }

    #[async_trait]
    impl SubscriptionResolver for FakeResolver {
        async fn subscribers_of(&self, employee_id: i64) -> cakeday_store::Result<Vec<Subscriber>> {
            if self.failing.contains(&employee_id) {
                return Err(query_failed());
            }
            Ok(self.subscribers.get(&employee_id).cloned().unwrap_or_default())
        }
    }

    #[derive(Debug, Clone)]
    struct Sent {
        addresses: Vec<String>,
        subject: String,
        body: String,
    }

    /// Records every call; fails calls whose subject mentions `fail_for`.
    #[derive(Default)]
    struct RecordingNotifier {
        sent: Mutex<Vec<Sent>>,
        fail_for: Option<String>,
    }

    impl RecordingNotifier {
        fn sent(&self) -> Vec<Sent> {
            self.sent.lock().unwrap().clone()
        }
    }

    #[async_trait]
    impl Notifier for RecordingNotifier {
        fn name(&self) -> &str {
            "recording"
        }

        async fn deliver(
            &self,
            addresses: &[String],
            subject: &str,
            body: &str,
        ) -> cakeday_notify::error::Result<()> {
            self.sent.lock().unwrap().push(Sent {
                addresses: addresses.to_vec(),
                subject: subject.to_string(),
                body: body.to_string(),
            });
            match &self.fail_for {
                Some(name) if subject.contains(name.as_str()) => {
                    Err(NotifyError::DeliveryFailed("relay said no".to_string()))
                }
                _ => Ok(()),
            }
        }
    }

    #[derive(Default)]
    struct MemoryLedger {
        seen: Mutex<HashSet<(i64, i64, i32)>>,
        unreadable: bool,
    }

    #[async_trait]
    impl DeliveryLedger for MemoryLedger {
        async fn notified(
            &self,
            employee_id: i64,
            occurrence_year: i32,
        ) -> cakeday_store::Result<HashSet<i64>> {
            if self.unreadable {
                return Err(query_failed());
            }
            Ok(self
                .seen
                .lock()
                .unwrap()
                .iter()
                .filter(|(e, _, y)| *e == employee_id && *y == occurrence_year)
                .map(|(_, u, _)| *u)
                .collect())
        }

        async fn record(
            &self,
            employee_id: i64,
            occurrence_year: i32,
            user_ids: &[i64],
        ) -> cakeday_store::Result<()> {
            let mut seen = self.seen.lock().unwrap();
            for u in user_ids {
                seen.insert((employee_id, *u, occurrence_year));
            }
            Ok(())
        }
    }

    fn cycle(
        events: FakeEvents,
        resolver: FakeResolver,
        notifier: Arc<RecordingNotifier>,
    ) -> NotificationCycle {
        NotificationCycle::new(Arc::new(events), Arc::new(resolver), notifier)
    }

    fn two_employees() -> FakeEvents {
        FakeEvents {
            employees: vec![employee(1, "Eve", 6, 3), employee(2, "Finn", 6, 5)],
            fail: false,
        }
    }

    #[tokio::test]
    async fn fans_out_once_per_employee_with_subscribers() {
        let resolver = FakeResolver {
            subscribers: HashMap::from([(
                1,
                vec![subscriber(10, "u1@x.com"), subscriber(11, "u2@x.com")],
            )]),
            ..Default::default()
        };
        let notifier = Arc::new(RecordingNotifier::default());
        let report = cycle(two_employees(), resolver, notifier.clone())
            .run(window())
            .await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert_eq!(sent[0].addresses, ["u1@x.com", "u2@x.com"]);
        assert!(sent[0].subject.contains("Eve"));
        assert_eq!(report.matched, 2);
        assert_eq!(report.delivered, 1);
        assert_eq!(report.recipients, 2);
        assert_eq!(report.no_subscribers, 1);
    }

    #[tokio::test]
    async fn resolver_failure_does_not_block_other_employees() {
        let resolver = FakeResolver {
            subscribers: HashMap::from([
                (1, vec![subscriber(10, "u1@x.com")]),
                (2, vec![subscriber(11, "u2@x.com")]),
            ]),
            failing: HashSet::from([1]),
        };
        let notifier = Arc::new(RecordingNotifier::default());
        let report = cycle(two_employees(), resolver, notifier.clone())
            .run(window())
            .await;

        let sent = notifier.sent();
        assert_eq!(sent.len(), 1);
        assert!(sent[0].subject.contains("Finn"));
        assert_eq!(report.resolve_failures, 1);
        assert_eq!(report.delivered, 1);
        assert!(!report.aborted);
    }

    #[tokio::test]
    async fn delivery_failure_does_not_block_other_employees() {
        let resolver = FakeResolver {
            subscribers: HashMap::from([
                (1, vec![subscriber(10, "u1@x.com")]),
                (2, vec![subscriber(11, "u2@x.com")]),
            ]),
            ..Default::default()
        };
        let notifier = Arc::new(RecordingNotifier {
            fail_for: Some("Eve".to_string()),
            ..Default::default()
        });
        let report = cycle(two_employees(), resolver, notifier.clone())
            .run(window())
            .await;

        let subjects: Vec<String> = notifier.sent().into_iter().map(|s| s.subject).collect();
        assert_eq!(subjects.len(), 2);
        assert!(subjects[1].contains("Finn"));
        assert_eq!(report.delivery_failures, 1);
        assert_eq!(report.delivered, 1);
    }

    #[tokio::test]
    async fn event_store_failure_aborts_without_deliveries() {
        let resolver = FakeResolver {
            subscribers: HashMap::from([(1, vec![subscriber(10, "u1@x.com")])]),
            ..Default::default()
        };
        let notifier = Arc::new(RecordingNotifier::default());
        let events = FakeEvents {
            employees: vec![employee(1, "Eve", 6, 3)],
            fail: true,
        };
        let report = cycle(events, resolver, notifier.clone()).run(window()).await;

        assert!(notifier.sent().is_empty());
        assert!(report.aborted);
        assert_eq!(report.matched, 0);
    }

    #[tokio::test]
    async fn message_mentions_day_and_month_only() {
        let resolver = FakeResolver {
            subscribers: HashMap::from([(1, vec![subscriber(10, "a@x.com")])]),
            ..Default::default()
        };
        let notifier = Arc::new(RecordingNotifier::default());
        let events = FakeEvents {
            employees: vec![employee(1, "Alex", 6, 4)],
            fail: false,
        };
        cycle(events, resolver, notifier.clone()).run(window()).await;

        let sent = notifier.sent();
        assert_eq!(sent[0].addresses, ["a@x.com"]);
        assert!(sent[0].body.contains("Alex"));
        assert!(sent[0].body.contains("04 June"));
        assert!(!sent[0].body.contains("1990"));
    }

    #[tokio::test]
    async fn ledger_suppresses_repeat_notifications() {
        let resolver = FakeResolver {
            subscribers: HashMap::from([(1, vec![subscriber(10, "u1@x.com")])]),
            ..Default::default()
        };
        let events = FakeEvents {
            employees: vec![employee(1, "Eve", 6, 3)],
            fail: false,
        };
        let notifier = Arc::new(RecordingNotifier::default());
        let ledger = Arc::new(MemoryLedger::default());
        let cycle = cycle(events, resolver, notifier.clone()).with_ledger(ledger.clone());

        let first = cycle.run(window()).await;
        let second = cycle.run(window()).await;

        assert_eq!(notifier.sent().len(), 1);
        assert_eq!(first.delivered, 1);
        assert_eq!(second.suppressed, 1);
        assert!(ledger.seen.lock().unwrap().contains(&(1, 10, 2024)));
    }

    #[tokio::test]
    async fn ledger_only_filters_already_notified_subscribers() {
        let resolver = FakeResolver {
            subscribers: HashMap::from([(
                1,
                vec![subscriber(10, "old@x.com"), subscriber(11, "new@x.com")],
            )]),
            ..Default::default()
        };
        let events = FakeEvents {
            employees: vec![employee(1, "Eve", 6, 3)],
            fail: false,
        };
        let ledger = Arc::new(MemoryLedger::default());
        ledger.seen.lock().unwrap().insert((1, 10, 2024));
        let notifier = Arc::new(RecordingNotifier::default());
        cycle(events, resolver, notifier.clone())
            .with_ledger(ledger)
            .run(window())
            .await;

        assert_eq!(notifier.sent()[0].addresses, ["new@x.com"]);
    }

    #[tokio::test]
    async fn failed_delivery_is_not_recorded() {
        let resolver = FakeResolver {
            subscribers: HashMap::from([(1, vec![subscriber(10, "u1@x.com")])]),
            ..Default::default()
        };
        let events = FakeEvents {
            employees: vec![employee(1, "Eve", 6, 3)],
            fail: false,
        };
        let ledger = Arc::new(MemoryLedger::default());
        let notifier = Arc::new(RecordingNotifier {
            fail_for: Some("Eve".to_string()),
            ..Default::default()
        });
        let cycle = cycle(events, resolver, notifier.clone()).with_ledger(ledger.clone());
        cycle.run(window()).await;
        cycle.run(window()).await;

        // no record, so the second cycle tries again
        assert_eq!(notifier.sent().len(), 2);
        assert!(ledger.seen.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn unreadable_ledger_still_delivers() {
        let resolver = FakeResolver {
            subscribers: HashMap::from([(1, vec![subscriber(10, "u1@x.com")])]),
            ..Default::default()
        };
        let events = FakeEvents {
            employees: vec![employee(1, "Eve", 6, 3)],
            fail: false,
        };
        let notifier = Arc::new(RecordingNotifier::default());
        let ledger = Arc::new(MemoryLedger {
            unreadable: true,
            ..Default::default()
        });
        let report = cycle(events, resolver, notifier.clone())
            .with_ledger(ledger)
            .run(window())
            .await;

        assert_eq!(report.delivered, 1);
        assert_eq!(notifier.sent().len(), 1);
    }

    #[tokio::test]
    async fn january_birthday_seen_in_december_keys_next_year() {
        let resolver = FakeResolver {
            subscribers: HashMap::from([(1, vec![subscriber(10, "u1@x.com")])]),
            ..Default::default()
        };
        let events = FakeEvents {
            employees: vec![employee(1, "Jan", 1, 2)],
            fail: false,
        };
        let ledger = Arc::new(MemoryLedger::default());
        let notifier = Arc::new(RecordingNotifier::default());
        cycle(events, resolver, notifier.clone())
            .with_ledger(ledger.clone())
            .run(NotificationWindow::new(date(2024, 12, 28), 7))
            .await;

        assert!(ledger.seen.lock().unwrap().contains(&(1, 10, 2025)));
        assert!(notifier.sent()[0].body.contains("(in 5 days)"));
    }

    #[test]
    fn report_display_summarises_counts() {
        let mut report = CycleReport::default();
        report.tally(ItemOutcome::Delivered { recipients: 3 });
        report.tally(ItemOutcome::DeliveryFailed);
        let text = report.to_string();
        assert!(text.contains("delivered 1 (3 recipients)"));
        assert!(text.contains("delivery failures 1"));
        assert_eq!(report.failures(), 1);

        let aborted = CycleReport {
            aborted: true,
            ..Default::default()
        };
        assert!(aborted.to_string().starts_with("aborted"));
    }
}
