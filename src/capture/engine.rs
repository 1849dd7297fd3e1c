use std::time::Duration;
use tokio::time::{Instant, sleep};
use tracing::{debug, error, info, instrument, trace, warn};
use uuid::Uuid;

use crate::capture::{
    driver::ScrollDriver,
    errors::DriverError,
    ledger::DedupLedger,
    types::{CaptureReport, CapturedItem, RenderedBlock, StopReason},
};
use crate::extractor::ItemExtractor;

/// Strategy run on every newly admitted item, before it is stored.
pub type ItemHook = Box<dyn Fn(CapturedItem) -> anyhow::Result<CapturedItem> + Send + Sync>;

/// Caller-supplied knobs for one capture run.
#[derive(Debug, Clone)]
pub struct CaptureSettings {
    /// Maximum number of items to return.
    pub budget: usize,
    /// Consecutive passes without a new item before giving up.
    pub stall_limit: u32,
    /// Pause after every scroll so the page can render the next batch.
    pub settle: Duration,
    /// Regular scroll step, in viewport heights. Below 1.0 so boundary blocks overlap.
    pub advance_fraction: f64,
    /// Scroll step used when the feed looks stuck.
    pub jump_fraction: f64,
    /// Time without progress after which a jump is forced.
    pub liveness_window: Duration,
    pub max_forced_jumps: u32,
}

impl Default for CaptureSettings {
    fn default() -> Self {
        Self {
            budget: 50,
            stall_limit: 8,
            settle: Duration::from_millis(1500),
            advance_fraction: 0.8,
            jump_fraction: 3.0,
            liveness_window: Duration::from_secs(10),
            max_forced_jumps: 3,
        }
    }
}

impl CaptureSettings {
    /// Whether a stalled feed can reach the liveness window before the stall
    /// limit ends the run. The last pass that can still jump is the one with
    /// `stall_limit - 1` empty passes behind it.
    pub fn can_force_jump(&self) -> bool {
        let longest_stall = self.settle * self.stall_limit.saturating_sub(1);
        self.max_forced_jumps > 0 && longest_stall > self.liveness_window
    }
}

struct CaptureRunState {
    ledger: DedupLedger,
    items: Vec<CapturedItem>,
    stall_counter: u32,
    pass_counter: u32,
    forced_jumps: u32,
    last_progress: Instant,
}

impl CaptureRunState {
    fn new() -> Self {
        Self {
            ledger: DedupLedger::new(),
            items: Vec::new(),
            stall_counter: 0,
            pass_counter: 0,
            forced_jumps: 0,
            last_progress: Instant::now(),
        }
    }
}

/// Incremental scroll-and-harvest loop over a single feed session.
pub struct CaptureLoop<E> {
    extractor: E,
    settings: CaptureSettings,
    hook: Option<ItemHook>,
}

impl<E: ItemExtractor> CaptureLoop<E> {
    pub fn new(extractor: E, settings: CaptureSettings) -> Self {
        Self {
            extractor,
            settings,
            hook: None,
        }
    }

    pub fn with_hook<F>(mut self, hook: F) -> Self
    where
        F: Fn(CapturedItem) -> anyhow::Result<CapturedItem> + Send + Sync + 'static,
    {
        self.hook = Some(Box::new(hook));
        self
    }

    /// Run until the budget is met, the feed stalls, or the driver fails.
    ///
    /// Never returns an error: a driver fault ends the run with whatever was
    /// accumulated and `StopReason::DriverFault`.
    #[instrument(skip_all, fields(budget = self.settings.budget, stall_limit = self.settings.stall_limit))]
    pub async fn capture<D>(&self, driver: &mut D) -> CaptureReport
    where
        D: ScrollDriver + ?Sized,
    {
        let run_id = Uuid::new_v4();
        let mut state = CaptureRunState::new();
        info!(%run_id, "Starting capture run");
        if !self.settings.can_force_jump() {
            warn!(
                "Stall limit {} with settle {:?} ends the run before the {:?} liveness window, forced jumps disabled",
                self.settings.stall_limit, self.settings.settle, self.settings.liveness_window
            );
        }

        let stop_reason = if self.settings.budget == 0 {
            StopReason::BudgetReached
        } else {
            self.run_passes(driver, &mut state).await
        };

        let resume_url = match stop_reason {
            StopReason::DriverFault(_) => None,
            _ => driver.current_location().await.ok(),
        };

        info!(
            %run_id,
            items = state.items.len(),
            passes = state.pass_counter,
            forced_jumps = state.forced_jumps,
            "Capture run finished: {:?}",
            stop_reason
        );

        CaptureReport {
            run_id,
            items: state.items,
            stop_reason,
            passes: state.pass_counter,
            forced_jumps: state.forced_jumps,
            resume_url,
        }
    }

    async fn run_passes<D>(&self, driver: &mut D, state: &mut CaptureRunState) -> StopReason
    where
        D: ScrollDriver + ?Sized,
    {
        loop {
            state.pass_counter += 1;

            let blocks = match driver.enumerate_visible_items().await {
                Ok(blocks) => blocks,
                Err(e) => return driver_fault("enumerate", state.pass_counter, e),
            };

            let admitted = self.harvest(state, &blocks);
            if admitted == 0 {
                state.stall_counter += 1;
            } else {
                state.stall_counter = 0;
                state.last_progress = Instant::now();
            }

            debug!(
                pass = state.pass_counter,
                visible = blocks.len(),
                admitted,
                total = state.items.len(),
                stall = state.stall_counter,
                "Pass complete"
            );

            if state.items.len() >= self.settings.budget {
                return StopReason::BudgetReached;
            }
            if state.stall_counter >= self.settings.stall_limit {
                return StopReason::Stalled;
            }

            let fraction = if self.needs_forced_jump(state) {
                state.forced_jumps += 1;
                state.stall_counter = 0;
                state.last_progress = Instant::now();
                info!(
                    "No progress for {:?}, forcing jump {} of {}",
                    self.settings.liveness_window,
                    state.forced_jumps,
                    self.settings.max_forced_jumps
                );
                self.settings.jump_fraction
            } else {
                self.settings.advance_fraction
            };

            if let Err(e) = driver.advance(fraction).await {
                return driver_fault("advance", state.pass_counter, e);
            }

            sleep(self.settings.settle).await;
        }
    }

    fn needs_forced_jump(&self, state: &CaptureRunState) -> bool {
        state.stall_counter > 0
            && state.forced_jumps < self.settings.max_forced_jumps
            && state.last_progress.elapsed() > self.settings.liveness_window
    }

    fn harvest(&self, state: &mut CaptureRunState, blocks: &[RenderedBlock]) -> usize {
        let mut admitted = 0;

        for block in blocks {
            if state.items.len() >= self.settings.budget {
                break;
            }

            let Some(item) = self.extractor.extract(block) else {
                trace!("Skipping block without identifier");
                continue;
            };

            if !state.ledger.admit(&item.identifier) {
                continue;
            }

            state.items.push(self.apply_hook(item));
            admitted += 1;
        }

        admitted
    }

    fn apply_hook(&self, item: CapturedItem) -> CapturedItem {
        let Some(hook) = &self.hook else {
            return item;
        };

        match hook(item.clone()) {
            Ok(processed) if processed.identifier == item.identifier => processed,
            Ok(_) => {
                warn!(
                    "Item hook changed identifier of {}, keeping original",
                    item.identifier
                );
                item
            }
            Err(e) => {
                warn!("Item hook failed for {}: {}", item.identifier, e);
                item
            }
        }
    }
}

fn driver_fault(operation: &str, pass: u32, e: DriverError) -> StopReason {
    if e.is_session_fatal() {
        error!("Session lost during {} on pass {}: {}", operation, pass, e);
    } else {
        warn!("{} failed on pass {}: {}", operation, pass, e);
    }
    StopReason::DriverFault(e.to_string())
}
