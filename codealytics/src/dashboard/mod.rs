//! A live terminal view of a [`Registry`].
//!
//! The dashboard renders on its own thread at a fixed frame rate. When the
//! registry's structure changed (a visible metric was added, or a metric's
//! visibility flipped) it clears and redraws everything; otherwise it only
//! rewrites the values that changed since the last frame.

use std::{
    fmt::Display,
    io,
    sync::{
        atomic::{AtomicBool, Ordering},
        Arc, Mutex, MutexGuard, PoisonError,
    },
    thread::{self, JoinHandle},
};

use crate::{
    error::{AnalyticsError, Result},
    registry::Registry,
};

mod configuration;
mod frame;
mod terminal;

pub use configuration::{
    DashboardConfiguration, DEFAULT_PREFIX, DEFAULT_SUFFIX, DEFAULT_UPDATES_PER_SECOND,
};
pub use frame::UNRESOLVABLE_PLACEHOLDER;
pub use terminal::{CrosstermTerminal, MemoryTerminal, Terminal};

use frame::{resolve_rows, Frame, Painter};

/// Renders a registry's visible metrics to a terminal, either live on a
/// background thread or on demand with [`Dashboard::snapshot`].
///
/// ```
/// # use std::sync::Arc;
/// # use codealytics::{Dashboard, DashboardConfiguration, MemoryTerminal, Registry};
/// let registry = Arc::new(Registry::new());
/// registry.add_provider("answer", || 42, false)?;
///
/// let dashboard = Dashboard::with_terminal(
///     registry.clone(),
///     DashboardConfiguration::new(),
///     MemoryTerminal::new(),
/// );
/// dashboard.set_enabled(true)?;
/// // ... the process runs, the dashboard repaints ...
/// dashboard.set_enabled(false)?;
///
/// assert!(dashboard.snapshot().contains("answer: 42\n"));
/// # Ok::<(), codealytics::AnalyticsError>(())
/// ```
pub struct Dashboard {
    registry: Arc<Registry>,
    state: Mutex<DashboardState>,
}

struct DashboardState {
    configuration: DashboardConfiguration,
    // Lent to the render thread while it runs.
    terminal: Option<Box<dyn Terminal>>,
    worker: Option<RenderWorker>,
}

struct RenderWorker {
    running: Arc<AtomicBool>,
    handle: JoinHandle<Box<dyn Terminal>>,
}

impl Dashboard {
    /// A dashboard with the default configuration, drawing to standard output.
    pub fn new(registry: Arc<Registry>) -> Self {
        Self::with_terminal(
            registry,
            DashboardConfiguration::default(),
            CrosstermTerminal::stdout(),
        )
    }

    /// A dashboard drawing to `terminal`.
    pub fn with_terminal(
        registry: Arc<Registry>,
        configuration: DashboardConfiguration,
        terminal: impl Terminal + 'static,
    ) -> Self {
        Self {
            registry,
            state: Mutex::new(DashboardState {
                configuration,
                terminal: Some(Box::new(terminal)),
                worker: None,
            }),
        }
    }

    /// Start or stop live rendering.
    ///
    /// Starting spawns the render thread. Stopping signals it, waits for it to
    /// finish its current frame, clear the terminal and exit; that takes at
    /// most one frame interval plus however long your providers take.
    /// Enabling a running dashboard, or disabling a stopped one, does nothing.
    pub fn set_enabled(&self, enabled: bool) -> Result<()> {
        let mut state = self.state();
        match (enabled, state.worker.is_some()) {
            (true, false) => self.start(&mut state),
            (false, true) => {
                Self::stop(&mut state);
                Ok(())
            }
            _ => Ok(()),
        }
    }

    /// Whether the render thread is running
    pub fn is_enabled(&self) -> bool {
        self.state().worker.is_some()
    }

    /// Replace the banner above the metrics. Fails while the dashboard is
    /// enabled.
    pub fn set_prefix(&self, prefix: impl Into<String>) -> Result<()> {
        let mut state = self.state();
        Self::ensure_stopped(&state)?;
        state.configuration.prefix(prefix);
        Ok(())
    }

    /// Replace the banner below the metrics. Fails while the dashboard is
    /// enabled.
    pub fn set_suffix(&self, suffix: impl Into<String>) -> Result<()> {
        let mut state = self.state();
        Self::ensure_stopped(&state)?;
        state.configuration.suffix(suffix);
        Ok(())
    }

    /// The banner above the metrics
    pub fn prefix(&self) -> String {
        self.state().configuration.prefix.clone()
    }

    /// The banner below the metrics
    pub fn suffix(&self) -> String {
        self.state().configuration.suffix.clone()
    }

    /// The text of a full repaint, without any cursor control: the prefix,
    /// one `id: value` line per visible metric in identifier order, and the
    /// suffix. Line breaks inside a value are drawn as spaces.
    ///
    /// Providers are invoked on the calling thread.
    pub fn snapshot(&self) -> String {
        let configuration = self.state().configuration.clone();
        Frame::new(&configuration, resolve_rows(&self.registry)).into_text()
    }

    fn start(&self, state: &mut DashboardState) -> Result<()> {
        let terminal = state.terminal.take().ok_or(AnalyticsError::InvalidState(
            "the terminal was lost when a previous render thread panicked",
        ))?;
        let running = Arc::new(AtomicBool::new(true));
        let registry = self.registry.clone();
        let configuration = state.configuration.clone();
        let thread_running = running.clone();

        // The closure owns the terminal, so a failed spawn loses it.
        let handle = thread::Builder::new()
            .name("codealytics-dashboard".to_string())
            .spawn(move || render_forever(registry, configuration, terminal, thread_running))?;
        log::debug!("dashboard enabled");
        state.worker = Some(RenderWorker { running, handle });
        Ok(())
    }

    fn stop(state: &mut DashboardState) {
        let Some(worker) = state.worker.take() else {
            return;
        };
        worker.running.store(false, Ordering::Release);
        match worker.handle.join() {
            Ok(terminal) => state.terminal = Some(terminal),
            Err(_) => log::error!("dashboard render thread panicked, its terminal is gone"),
        }
        log::debug!("dashboard disabled");
    }

    fn ensure_stopped(state: &DashboardState) -> Result<()> {
        if state.worker.is_some() {
            return Err(AnalyticsError::InvalidState(
                "banners cannot change while the dashboard is enabled",
            ));
        }
        Ok(())
    }

    fn state(&self) -> MutexGuard<'_, DashboardState> {
        // The render thread never takes this lock, so poison only comes from a caller's panic.
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Display for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.snapshot())
    }
}

impl std::fmt::Debug for Dashboard {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Dashboard")
            .field("enabled", &self.is_enabled())
            .finish_non_exhaustive()
    }
}

impl Drop for Dashboard {
    fn drop(&mut self) {
        Self::stop(self.state.get_mut().unwrap_or_else(PoisonError::into_inner));
    }
}

/// The render loop. Returns the terminal once `running` is cleared.
fn render_forever(
    registry: Arc<Registry>,
    configuration: DashboardConfiguration,
    mut terminal: Box<dyn Terminal>,
    running: Arc<AtomicBool>,
) -> Box<dyn Terminal> {
    let frame_interval = configuration.frame_interval();
    let mut painter = Painter::default();
    if let Err(e) = terminal.set_cursor_visible(false) {
        log::error!("could not hide the cursor: {e}");
    }
    loop {
        let full = registry.take_dashboard_dirty();
        let frame = Frame::new(&configuration, resolve_rows(&registry));
        if let Err(e) = painter.paint(terminal.as_mut(), frame, full) {
            log::error!("could not paint the dashboard: {e}");
        }
        if !running.load(Ordering::Acquire) {
            break;
        }
        thread::sleep(frame_interval);
    }
    if let Err(e) = restore(terminal.as_mut()) {
        log::error!("could not restore the terminal: {e}");
    }
    terminal
}

fn restore(terminal: &mut dyn Terminal) -> io::Result<()> {
    terminal.clear()?;
    terminal.set_cursor_visible(true)?;
    terminal.flush()
}

#[cfg(test)]
mod test {
    use std::{
        sync::Arc,
        time::{Duration, Instant},
    };

    use crate::{AnalyticsError, Registry};

    use super::{
        Dashboard, DashboardConfiguration, MemoryTerminal, DEFAULT_PREFIX, DEFAULT_SUFFIX,
        UNRESOLVABLE_PLACEHOLDER,
    };

    fn dashboard(registry: &Arc<Registry>) -> (Dashboard, MemoryTerminal) {
        let terminal = MemoryTerminal::new();
        let mut configuration = DashboardConfiguration::new();
        configuration.updates_per_second(200);
        (
            Dashboard::with_terminal(registry.clone(), configuration, terminal.clone()),
            terminal,
        )
    }

    #[test_log::test]
    fn snapshot_matches_the_full_repaint_text() {
        let registry = Arc::new(Registry::new());
        registry
            .add_value("varString", "World!", false)
            .expect("valid identifier");
        registry.add_value("varInt", 3, false).expect("valid identifier");
        registry.add_value("varDouble", 14.0, true).expect("valid identifier");
        registry
            .add_provider("varStringFunc", || "Hello!", false)
            .expect("valid identifier");
        registry
            .add_provider("varIntFunc", || 1 + 3, false)
            .expect("valid identifier");
        let (dashboard, _terminal) = dashboard(&registry);

        let expected = format!(
            "{DEFAULT_PREFIX}varInt: 3\nvarIntFunc: 4\nvarString: World!\nvarStringFunc: Hello!\n{DEFAULT_SUFFIX}"
        );
        assert_eq!(expected, dashboard.snapshot());
        assert_eq!(expected, dashboard.to_string());
    }

    #[test_log::test]
    fn snapshot_leaves_the_dirty_flag_alone() {
        let registry = Arc::new(Registry::new());
        registry.add_value("shown", 1, false).expect("valid identifier");
        let (dashboard, _terminal) = dashboard(&registry);
        let _ = dashboard.snapshot();
        assert!(registry.take_dashboard_dirty());
    }

    #[test_log::test]
    fn banners_are_frozen_while_enabled() {
        let registry = Arc::new(Registry::new());
        let (dashboard, _terminal) = dashboard(&registry);

        dashboard.set_prefix("Test\n").expect("stopped dashboards accept banners");
        dashboard.set_enabled(true).expect("render thread starts");
        assert!(dashboard.is_enabled());
        assert!(matches!(
            dashboard.set_prefix("Other\n"),
            Err(AnalyticsError::InvalidState(_))
        ));
        assert!(matches!(
            dashboard.set_suffix("Other\n"),
            Err(AnalyticsError::InvalidState(_))
        ));

        dashboard.set_enabled(false).expect("render thread stops");
        assert!(!dashboard.is_enabled());
        dashboard.set_suffix("End\n").expect("stopped dashboards accept banners");
        assert_eq!("Test\n", dashboard.prefix());
        assert_eq!("End\n", dashboard.suffix());
    }

    #[test_log::test]
    fn enabling_twice_is_harmless() {
        let registry = Arc::new(Registry::new());
        let (dashboard, _terminal) = dashboard(&registry);
        dashboard.set_enabled(false).expect("already stopped");
        dashboard.set_enabled(true).expect("render thread starts");
        dashboard.set_enabled(true).expect("already running");
        dashboard.set_enabled(false).expect("render thread stops");
        dashboard.set_enabled(true).expect("terminal was handed back");
    }

    #[test_log::test]
    fn stopping_clears_the_terminal() {
        let registry = Arc::new(Registry::new());
        registry.add_value("shown", 1, false).expect("valid identifier");
        let (dashboard, terminal) = dashboard(&registry);

        dashboard.set_enabled(true).expect("render thread starts");
        dashboard.set_enabled(false).expect("render thread stops");

        assert_eq!("", terminal.text());
        assert!(terminal.cursor_visible());
        assert!(2 <= terminal.clear_count(), "painted at least once, then cleared");
    }

    #[test_log::test]
    fn hidden_metrics_leave_the_snapshot() {
        let registry = Arc::new(Registry::new());
        registry.add_value("shown", 1, false).expect("valid identifier");
        registry.add_value("secret", 2, false).expect("valid identifier");
        let (dashboard, _terminal) = dashboard(&registry);

        registry
            .update_value("secret", 3, Some(true))
            .expect("uncontended update");
        assert_eq!(
            format!("{DEFAULT_PREFIX}shown: 1\n{DEFAULT_SUFFIX}"),
            dashboard.snapshot()
        );
        assert_eq!(3, registry.get::<i32>("secret").expect("hidden metrics still resolve"));
    }

    #[test_log::test]
    fn snapshot_matches_the_screen_for_bare_banners() {
        let registry = Arc::new(Registry::new());
        registry.add_value("a", 1, false).expect("valid identifier");
        let (dashboard, terminal) = dashboard(&registry);
        dashboard.set_prefix("Top").expect("stopped dashboards accept banners");
        dashboard.set_suffix("End").expect("stopped dashboards accept banners");
        let snapshot = dashboard.snapshot();
        assert_eq!("Topa: 1\nEnd", snapshot);

        dashboard.set_enabled(true).expect("render thread starts");
        let deadline = Instant::now() + Duration::from_secs(5);
        while terminal.lines() != snapshot.lines().collect::<Vec<_>>() {
            assert!(Instant::now() < deadline, "screen shows {:?}", terminal.lines());
            std::thread::sleep(Duration::from_millis(2));
        }
        dashboard.set_enabled(false).expect("render thread stops");
    }

    #[test_log::test]
    fn a_panicking_display_does_not_kill_the_render_thread() {
        struct Overflowing;
        impl std::fmt::Display for Overflowing {
            fn fmt(&self, _: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                panic!("attempt to add with overflow")
            }
        }

        let registry = Arc::new(Registry::new());
        registry.add_value("total", Overflowing, false).expect("valid identifier");
        let (dashboard, terminal) = dashboard(&registry);

        dashboard.set_enabled(true).expect("render thread starts");
        let deadline = Instant::now() + Duration::from_secs(5);
        while !terminal.text().contains(UNRESOLVABLE_PLACEHOLDER) {
            assert!(Instant::now() < deadline, "screen shows {:?}", terminal.text());
            std::thread::sleep(Duration::from_millis(2));
        }
        dashboard.set_enabled(false).expect("render thread stops");
        dashboard.set_enabled(true).expect("the terminal came back");
        dashboard.set_enabled(false).expect("render thread stops");
    }
}
