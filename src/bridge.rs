//! The bridge context object.
//!
//! Owns every shared resource explicitly (transport, correlation registry,
//! dispatcher, scheduler, scene and chrome state) so nothing in the crate
//! lives in ambient module-level globals. One `UiBridge` is one channel to
//! one render host.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use parking_lot::{Mutex, RwLock};
use tracing::{debug, trace};
use uuid::Uuid;

use crate::config::{BridgeConfig, RenderMode};
use crate::dispatch::Dispatcher;
use crate::error::BridgeError;
use crate::protocol::{Hotkey, Message, StatusBarConfig, UiEvent, WindowConfig};
use crate::registry::PendingRequests;
use crate::scheduler::RenderScheduler;
use crate::transport::{MessageSink, Transport};
use crate::tree::{assign_identities, diff, flatten, Element, Snapshot};
use crate::value::Value;

pub type SceneFn = Arc<dyn Fn() -> Element + Send + Sync>;

/// Non-tree UI state sent alongside every snapshot.
#[derive(Debug, Clone, Default)]
pub struct Chrome {
    pub status_bar: StatusBarConfig,
    pub window: Option<WindowConfig>,
    pub menu: Option<Value>,
    pub hotkeys: Vec<Hotkey>,
    pub fonts: Vec<String>,
}

struct SharedState {
    scene: RwLock<Option<SceneFn>>,
    chrome: RwLock<Chrome>,
    /// Comparison baseline for the next diff; retained across renders.
    last_snapshot: Mutex<Option<Snapshot>>,
}

pub struct UiBridge {
    config: BridgeConfig,
    transport: Arc<Transport>,
    requests: Arc<PendingRequests>,
    dispatcher: Arc<Dispatcher>,
    scheduler: RenderScheduler,
    state: Arc<SharedState>,
    shut_down: AtomicBool,
}

impl UiBridge {
    pub fn new(config: BridgeConfig) -> Self {
        let transport = Arc::new(Transport::new(config.max_frame_bytes));
        let requests = Arc::new(PendingRequests::new());
        let dispatcher = Arc::new(Dispatcher::new(Arc::clone(&requests)));
        let state = Arc::new(SharedState {
            scene: RwLock::new(None),
            chrome: RwLock::new(Chrome::default()),
            last_snapshot: Mutex::new(None),
        });

        let render_transport = Arc::clone(&transport);
        let render_state = Arc::clone(&state);
        let render_config = config.clone();
        let scheduler = RenderScheduler::spawn(
            config.poll_interval(),
            config.min_frame_interval(),
            Arc::new(move || render_pass(&render_config, &render_transport, &render_state)),
        );

        Self {
            config,
            transport,
            requests,
            dispatcher,
            scheduler,
            state,
            shut_down: AtomicBool::new(false),
        }
    }

    /// Connects to the host's socket, retrying while the host starts up.
    pub fn connect(&self, path: &Path) -> Result<(), BridgeError> {
        self.transport.connect(
            path,
            self.config.connect_retries,
            self.config.connect_retry_delay(),
            Arc::clone(&self.dispatcher) as Arc<dyn MessageSink>,
        )
    }

    pub fn is_connected(&self) -> bool {
        self.transport.is_connected()
    }

    /// Installs the function that produces the current UI graph. Called
    /// once per render pass; the graph is rebuilt fresh every time.
    pub fn set_scene(&self, scene: impl Fn() -> Element + Send + Sync + 'static) {
        *self.state.scene.write() = Some(Arc::new(scene));
    }

    pub fn set_event_handler(&self, handler: impl Fn(UiEvent) + Send + Sync + 'static) {
        self.dispatcher.set_event_handler(Arc::new(handler));
    }

    /// Signals that state changed and a render should follow. Cheap and
    /// non-blocking; any number of calls coalesce into one pass.
    pub fn request_render(&self) {
        self.scheduler.request_render();
    }

    /// Renders synchronously, excluded against the scheduler loop. Used
    /// for the initial render after `connect`.
    pub fn render_now(&self) -> Result<(), BridgeError> {
        self.scheduler.render_now()
    }

    pub fn set_status_bar(&self, status_bar: StatusBarConfig) {
        self.state.chrome.write().status_bar = status_bar;
        self.request_render();
    }

    pub fn set_window(&self, window: Option<WindowConfig>) {
        self.state.chrome.write().window = window;
        self.request_render();
    }

    pub fn set_menu(&self, menu: Option<Value>) {
        self.state.chrome.write().menu = menu;
        self.request_render();
    }

    pub fn set_hotkeys(&self, hotkeys: Vec<Hotkey>) {
        self.state.chrome.write().hotkeys = hotkeys;
        self.request_render();
    }

    pub fn set_fonts(&self, fonts: Vec<String>) {
        self.state.chrome.write().fonts = fonts;
        self.request_render();
    }

    /// Asks the host for its clipboard text.
    pub fn clipboard_text(&self) -> Option<String> {
        match self.issue_request(|request_id| Message::ClipboardQuery { request_id })? {
            Value::Str(text) => Some(text),
            _ => None,
        }
    }

    /// Opens the host's file dialog; empty when cancelled or timed out.
    pub fn choose_files(&self, options: Value) -> Vec<String> {
        let result = self.issue_request(|request_id| Message::FileDialogQuery {
            request_id,
            options,
        });
        match result {
            Some(Value::List(paths)) => paths
                .into_iter()
                .filter_map(|path| match path {
                    Value::Str(path) => Some(path),
                    _ => None,
                })
                .collect(),
            _ => Vec::new(),
        }
    }

    /// Reads a user preference from the host.
    pub fn preference(&self, key: &str) -> Option<Value> {
        let key = key.to_string();
        self.issue_request(|request_id| Message::PreferenceQuery { request_id, key })
            .filter(|value| !value.is_null())
    }

    /// Generic host service call.
    pub fn service_call(&self, service: &str, payload: Value) -> Option<Value> {
        let service = service.to_string();
        self.issue_request(|request_id| Message::ServiceQuery {
            request_id,
            service,
            payload,
        })
    }

    /// Tells the host to terminate gracefully.
    pub fn quit(&self) {
        self.transport.send(&Message::Quit);
    }

    /// Tears the bridge down: stops the scheduler, wakes every pending
    /// waiter empty-handed, and closes the channel. Idempotent.
    pub fn shutdown(&self) {
        if self.shut_down.swap(true, Ordering::SeqCst) {
            return;
        }
        debug!("bridge shutting down");
        self.scheduler.shutdown();
        self.requests.clear();
        self.transport.disconnect();
    }

    /// Registers a request id, sends the query, and blocks for the
    /// correlated response up to the configured timeout. Degrades to
    /// `None` on disconnect or timeout rather than surfacing a transport
    /// failure into application code.
    fn issue_request(&self, build: impl FnOnce(String) -> Message) -> Option<Value> {
        if !self.transport.is_connected() {
            trace!("request skipped, channel disconnected");
            return None;
        }
        let id = Uuid::new_v4().to_string();
        self.requests.create(&id);
        self.transport.send(&build(id.clone()));
        self.requests.wait(&id, self.config.request_timeout())
    }
}

impl Drop for UiBridge {
    fn drop(&mut self) {
        self.shutdown();
    }
}

/// One full render pass: rebuild the graph, flatten it, and put either a
/// full snapshot or a patch set on the wire.
fn render_pass(
    config: &BridgeConfig,
    transport: &Transport,
    state: &SharedState,
) -> Result<(), BridgeError> {
    let scene = state.scene.read().clone();
    let Some(scene) = scene else {
        trace!("render requested before a scene was installed");
        return Ok(());
    };

    let mut root = scene();
    assign_identities(&mut root, config.max_depth)?;
    let snapshot = flatten(&root, config.max_depth)?;
    let chrome = state.chrome.read().clone();

    let message = match config.render_mode {
        RenderMode::FullSnapshot => {
            *state.last_snapshot.lock() = Some(snapshot.clone());
            Message::FlatRender {
                nodes: snapshot.nodes,
                root_id: snapshot.root_id,
                status_bar: chrome.status_bar,
                window: chrome.window,
                menu: chrome.menu,
                hotkeys: chrome.hotkeys,
                fonts: chrome.fonts,
            }
        }
        RenderMode::LegacyNested => {
            let root = crate::tree::to_nested(&snapshot, config.max_depth)?;
            *state.last_snapshot.lock() = Some(snapshot);
            Message::Render {
                root,
                status_bar: chrome.status_bar,
                window: chrome.window,
            }
        }
        RenderMode::Patch => {
            let mut baseline = state.last_snapshot.lock();
            let patches = diff(baseline.as_ref(), Some(&snapshot), config.max_depth)?;
            *baseline = Some(snapshot);
            Message::ApplyPatch {
                patches,
                status_bar: chrome.status_bar,
                window: chrome.window,
            }
        }
    };

    transport.send(&message);
    Ok(())
}
