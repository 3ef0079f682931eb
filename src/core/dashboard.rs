//! Event dashboard aggregation.
//!
//! [`EventDashboard`] keeps one event's budget, expense, task and vendor
//! figures current from four live feeds. Each feed is applied by its own
//! callback; every callback recomputes the derived totals and publishes the
//! whole [`DashboardState`] to observers registered through
//! [`EventDashboard::watch`].
//!
//! The pure aggregation helpers are exported separately so they can be used
//! on lists fetched without a dashboard.

use crate::{
    auth::Session,
    errors::{Error, Result},
    models::{Event, Expense, Task, Vendor, records_from_snapshot},
    store::{Collection, Document, DocumentStore, Query, Subscription},
};
use std::collections::{BTreeMap, HashSet};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Everything the dashboard screen shows.
///
/// Fields keep their defaults (zero, empty) until the corresponding feed has
/// delivered its first snapshot.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct DashboardState {
    /// Event document, once loaded
    pub event: Option<Event>,
    /// Budget of the event
    pub total_budget: f64,
    /// Expenses of the event
    pub expenses: Vec<Expense>,
    /// Sum of all expense amounts
    pub total_spent: f64,
    /// `total_budget - total_spent`; negative when over budget
    pub remaining_budget: f64,
    /// Spending per category label (exact, case-sensitive)
    pub category_totals: BTreeMap<String, f64>,
    /// Tasks of the event
    pub tasks: Vec<Task>,
    /// Completed tasks / all tasks, 0 with no tasks
    pub completed_ratio: f64,
    /// Vendors booked for the event
    pub selected_vendors: Vec<Vendor>,
}

impl DashboardState {
    /// Share of the budget spent, in percent.
    #[must_use]
    pub fn budget_used_percent(&self) -> f64 {
        budget_used_percent(self.total_spent, self.total_budget)
    }
}

/// Sum of expense amounts.
#[must_use]
pub fn total_spent(expenses: &[Expense]) -> f64 {
    expenses.iter().map(|e| e.amount).sum()
}

/// Groups expense amounts by category label.
#[must_use]
pub fn category_totals(expenses: &[Expense]) -> BTreeMap<String, f64> {
    let mut totals = BTreeMap::new();
    for expense in expenses {
        *totals.entry(expense.category.clone()).or_insert(0.0) += expense.amount;
    }
    totals
}

/// Fraction of completed tasks.
#[must_use]
pub fn completed_ratio(tasks: &[Task]) -> f64 {
    if tasks.is_empty() {
        return 0.0;
    }
    let done = tasks.iter().filter(|t| t.is_completed).count();
    // Cast safety: task counts are far below 2^52.
    #[allow(clippy::cast_precision_loss)]
    let ratio = done as f64 / tasks.len() as f64;
    ratio
}

/// Calculates how much of the budget has been spent.
///
/// - 0% = nothing spent
/// - 100% = budget fully spent
/// - above 100% = over budget
///
/// A zero budget reports 0%.
#[must_use]
pub fn budget_used_percent(spent: f64, budget: f64) -> f64 {
    if budget == 0.0 {
        return 0.0;
    }

    (spent / budget) * 100.0
}

/// Generates a progress bar string for visual representation.
///
/// Creates a text-based progress bar like: `[████████░░] 80.0%`
///
/// # Arguments
/// * `progress_percent` - Progress percentage (0-100)
/// * `bar_length` - Length of the progress bar in characters (default 10)
#[must_use]
pub fn format_progress_bar(progress_percent: f64, bar_length: Option<usize>) -> String {
    let length = bar_length.unwrap_or(10);
    let clamped_progress = progress_percent.clamp(0.0, 100.0);

    // Cast safety: clamped_progress ∈ [0, 100], length is small (10-20).
    #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss, clippy::cast_precision_loss)]
    let filled = ((clamped_progress / 100.0) * length as f64).round() as usize;
    let empty = length.saturating_sub(filled);

    let filled_str = "█".repeat(filled);
    let empty_str = "░".repeat(empty);

    format!("[{filled_str}{empty_str}] {progress_percent:.1}%")
}

/// The four live feeds of one dashboard. Dropping the handle cancels all of them.
#[derive(Debug)]
pub struct DashboardSubscriptions {
    /// Event document
    pub event: Subscription,
    /// Expenses by `eventId`
    pub expenses: Subscription,
    /// Tasks by `eventId`
    pub tasks: Subscription,
    /// Event-vendor links by `eventId`
    pub vendor_links: Subscription,
}

/// View-model of a single event's dashboard.
pub struct EventDashboard<S> {
    store: S,
    session: Session,
    event_id: String,
    state: DashboardState,
    publisher: watch::Sender<DashboardState>,
}

impl<S: DocumentStore> EventDashboard<S> {
    /// Creates a dashboard for `event_id`. Requires a signed-in session.
    pub fn new(store: S, session: Session, event_id: &str) -> Result<Self> {
        session.require_user()?;
        let (publisher, _) = watch::channel(DashboardState::default());
        Ok(Self {
            store,
            session,
            event_id: event_id.to_string(),
            state: DashboardState::default(),
            publisher,
        })
    }

    /// Event this dashboard follows.
    #[must_use]
    pub fn event_id(&self) -> &str {
        &self.event_id
    }

    /// Current derived state.
    #[must_use]
    pub const fn state(&self) -> &DashboardState {
        &self.state
    }

    /// Observer on the derived state. Sees a new value after every callback.
    #[must_use]
    pub fn watch(&self) -> watch::Receiver<DashboardState> {
        self.publisher.subscribe()
    }

    fn publish(&self) {
        self.publisher.send_replace(self.state.clone());
    }

    fn recompute_remaining(&mut self) {
        self.state.remaining_budget = self.state.total_budget - self.state.total_spent;
    }

    /// Applies the event document. `None` means the event no longer exists.
    ///
    /// # Errors
    /// [`Error::NotFound`] when the document is gone; the dashboard cannot
    /// continue.
    pub fn on_event_snapshot(&mut self, doc: Option<Document>) -> Result<()> {
        let Some(doc) = doc else {
            warn!(event_id = %self.event_id, "Event document disappeared");
            return Err(Error::not_found("Event", &self.event_id));
        };

        match records_from_snapshot::<Event>(std::slice::from_ref(&doc)).pop() {
            Some(event) => {
                self.state.total_budget = event.budget;
                self.state.event = Some(event);
                self.recompute_remaining();
            }
            None => debug!(event_id = %self.event_id, "Keeping previous event fields"),
        }
        self.publish();
        Ok(())
    }

    /// Replaces the expense list and recomputes the budget figures.
    pub fn on_expenses_snapshot(&mut self, docs: &[Document]) {
        let expenses: Vec<Expense> = records_from_snapshot(docs);
        self.state.total_spent = total_spent(&expenses);
        self.state.category_totals = category_totals(&expenses);
        self.state.expenses = expenses;
        self.recompute_remaining();
        self.publish();
    }

    /// Replaces the task list and recomputes the completion ratio.
    pub fn on_tasks_snapshot(&mut self, docs: &[Document]) {
        let tasks: Vec<Task> = records_from_snapshot(docs);
        self.state.completed_ratio = completed_ratio(&tasks);
        self.state.tasks = tasks;
        self.publish();
    }

    /// Resolves the booked vendors with one batched id lookup.
    ///
    /// No links means no lookup. A failed lookup is logged and the previous
    /// vendor list stays in place.
    pub async fn on_vendor_links_snapshot(&mut self, docs: &[Document]) {
        let mut seen = HashSet::new();
        let ids: Vec<String> = docs
            .iter()
            .filter_map(|doc| doc.str_field("vendorId"))
            .filter(|id| seen.insert(*id))
            .map(str::to_string)
            .collect();

        if ids.is_empty() {
            self.state.selected_vendors.clear();
            self.publish();
            return;
        }

        match self
            .store
            .query(Collection::Vendors, &Query::new().id_in(ids))
            .await
        {
            Ok(vendors) => self.state.selected_vendors = records_from_snapshot(&vendors),
            Err(e) => {
                error!(event_id = %self.event_id, "Failed to fetch booked vendors: {e}");
            }
        }
        self.publish();
    }

    /// Opens the four feeds for this event.
    pub async fn attach(&self) -> Result<DashboardSubscriptions> {
        let by_event = || Query::new().eq("eventId", self.event_id.as_str());
        let subscriptions = DashboardSubscriptions {
            event: self
                .store
                .subscribe(Collection::Events, Query::new().id_in(vec![self.event_id.clone()]))
                .await?,
            expenses: self.store.subscribe(Collection::Expenses, by_event()).await?,
            tasks: self.store.subscribe(Collection::Tasks, by_event()).await?,
            vendor_links: self
                .store
                .subscribe(Collection::EventVendors, by_event())
                .await?,
        };
        debug!(event_id = %self.event_id, "Dashboard attached");
        Ok(subscriptions)
    }

    /// Drives the dashboard until the event is deleted, the session signs out,
    /// or every feed is closed. The feeds are cancelled on return.
    ///
    /// # Errors
    /// [`Error::NotFound`] when the event document disappears.
    pub async fn run(mut self, mut subscriptions: DashboardSubscriptions) -> Result<()> {
        let mut auth = self.session.watcher();
        let mut auth_open = true;
        let mut event_open = true;
        let mut expenses_open = true;
        let mut tasks_open = true;
        let mut links_open = true;

        while event_open || expenses_open || tasks_open || links_open {
            tokio::select! {
                snapshot = subscriptions.event.next(), if event_open => match snapshot {
                    Some(docs) => self.on_event_snapshot(docs.into_iter().next())?,
                    None => event_open = false,
                },
                snapshot = subscriptions.expenses.next(), if expenses_open => match snapshot {
                    Some(docs) => self.on_expenses_snapshot(&docs),
                    None => expenses_open = false,
                },
                snapshot = subscriptions.tasks.next(), if tasks_open => match snapshot {
                    Some(docs) => self.on_tasks_snapshot(&docs),
                    None => tasks_open = false,
                },
                snapshot = subscriptions.vendor_links.next(), if links_open => match snapshot {
                    Some(docs) => self.on_vendor_links_snapshot(&docs).await,
                    None => links_open = false,
                },
                changed = auth.changed(), if auth_open => {
                    if changed.is_err() {
                        // Provider gone; the last known user stays signed in.
                        auth_open = false;
                    } else if auth.borrow_and_update().is_none() {
                        info!(event_id = %self.event_id, "Signed out, closing dashboard");
                        return Ok(());
                    }
                }
            }
        }

        debug!(event_id = %self.event_id, "All dashboard feeds closed");
        Ok(())
    }
}
