#![allow(dead_code)]

use std::collections::{HashMap, HashSet, VecDeque};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tokio::sync::Notify;

use config_center::client::{ClientError, ConfigApi};
use config_center::dashboard::{Dashboard, DashboardSettings};
use config_center::models::{Module, RegisterModuleInput, ScanReport};
use config_center::notify::{Notice, NoticeKind, Notifier};
use config_center::store::MemoryStore;

/// In-memory stand-in for the Config Center service.
#[derive(Default)]
pub struct FakeService {
    modules: Mutex<Vec<Module>>,
    texts: Mutex<HashMap<String, String>>,
    puts: Mutex<Vec<(String, String)>>,
    registered: Mutex<Vec<RegisterModuleInput>>,
    scan_added: Mutex<Vec<Module>>,
    failing_raw: Mutex<HashSet<String>>,
    raw_gate: Mutex<Option<Arc<Notify>>>,
    structured_gate: Mutex<Option<Arc<Notify>>>,
    put_gates: Mutex<VecDeque<Arc<Notify>>>,
    pub raw_entered: Notify,
    pub structured_entered: Notify,
    pub put_entered: Notify,
    pub raw_gets: AtomicUsize,
    pub structured_gets: AtomicUsize,
    pub fail_list: AtomicBool,
    pub fail_put: AtomicBool,
    pub fail_scan: AtomicBool,
}

impl FakeService {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Add a module with raw text made of `key: value` lines.
    pub fn with_module(self: Arc<Self>, name: &str, text: &str) -> Arc<Self> {
        self.modules
            .lock()
            .push(Module::new(name, format!("/etc/modules/{}.yaml", name)));
        self.texts.lock().insert(name.to_string(), text.to_string());
        self
    }

    pub fn with_tagged_module(self: Arc<Self>, module: Module, text: &str) -> Arc<Self> {
        self.texts.lock().insert(module.name.clone(), text.to_string());
        self.modules.lock().push(module);
        self
    }

    /// Modules the next scan reports. Their text becomes available at once.
    pub fn discover(&self, name: &str, text: &str) {
        self.texts.lock().insert(name.to_string(), text.to_string());
        self.scan_added.lock().push(Module::new(name, ""));
    }

    pub fn fail_raw_for(&self, name: &str) {
        self.failing_raw.lock().insert(name.to_string());
    }

    /// Replace a module's text on the service side.
    pub fn set_text(&self, name: &str, text: &str) {
        self.texts.lock().insert(name.to_string(), text.to_string());
    }

    /// Hold the next raw read until the returned gate is notified. The
    /// response text is captured before waiting; later reads answer at once.
    pub fn gate_raw(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.raw_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Hold the next structured read, like [`FakeService::gate_raw`].
    pub fn gate_structured(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        *self.structured_gate.lock() = Some(Arc::clone(&gate));
        gate
    }

    /// Hold one more write. Writes take gates in the order they arrive and
    /// are recorded before waiting.
    pub fn gate_put(&self) -> Arc<Notify> {
        let gate = Arc::new(Notify::new());
        self.put_gates.lock().push_back(Arc::clone(&gate));
        gate
    }

    pub fn text(&self, name: &str) -> Option<String> {
        self.texts.lock().get(name).cloned()
    }

    pub fn puts(&self) -> Vec<(String, String)> {
        self.puts.lock().clone()
    }

    pub fn registered(&self) -> Vec<RegisterModuleInput> {
        self.registered.lock().clone()
    }

    fn lookup(&self, name: &str) -> Result<String, ClientError> {
        self.texts
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| ClientError::NotFound(format!("unknown module: {}", name)))
    }
}

fn to_structured(text: &str) -> Value {
    let mut map = Map::new();
    for line in text.lines() {
        if let Some((key, value)) = line.split_once(':') {
            map.insert(
                key.trim().to_string(),
                Value::String(value.trim().to_string()),
            );
        }
    }
    Value::Object(map)
}

#[async_trait]
impl ConfigApi for FakeService {
    async fn list_modules(&self) -> Result<Vec<Module>, ClientError> {
        if self.fail_list.load(Ordering::SeqCst) {
            return Err(ClientError::Unauthorized("listing requires a key".to_string()));
        }
        Ok(self.modules.lock().clone())
    }

    async fn get_structured(&self, name: &str) -> Result<Value, ClientError> {
        self.structured_gets.fetch_add(1, Ordering::SeqCst);
        let value = self.lookup(name).map(|text| to_structured(&text))?;
        let gate = self.structured_gate.lock().take();
        if let Some(gate) = gate {
            self.structured_entered.notify_one();
            gate.notified().await;
        }
        Ok(value)
    }

    async fn get_raw(&self, name: &str) -> Result<String, ClientError> {
        self.raw_gets.fetch_add(1, Ordering::SeqCst);
        if self.failing_raw.lock().contains(name) {
            return Err(ClientError::NotFound(format!("unreadable module: {}", name)));
        }
        let text = self.lookup(name)?;
        let gate = self.raw_gate.lock().take();
        if let Some(gate) = gate {
            self.raw_entered.notify_one();
            gate.notified().await;
        }
        Ok(text)
    }

    async fn put_raw(&self, name: &str, text: &str) -> Result<(), ClientError> {
        if self.fail_put.load(Ordering::SeqCst) {
            return Err(ClientError::BadRequest("invalid yaml at line 1".to_string()));
        }
        self.puts.lock().push((name.to_string(), text.to_string()));
        self.texts.lock().insert(name.to_string(), text.to_string());
        let gate = self.put_gates.lock().pop_front();
        if let Some(gate) = gate {
            self.put_entered.notify_one();
            gate.notified().await;
        }
        Ok(())
    }

    async fn scan(&self) -> Result<ScanReport, ClientError> {
        if self.fail_scan.load(Ordering::SeqCst) {
            return Err(ClientError::Forbidden("scan disabled".to_string()));
        }
        let added: Vec<Module> = std::mem::take(&mut *self.scan_added.lock());
        let mut modules = self.modules.lock();
        for module in &added {
            if !modules.iter().any(|m| m.name == module.name) {
                modules.push(module.clone());
            }
        }
        Ok(ScanReport {
            added,
            total: Some(modules.len()),
        })
    }

    async fn register(&self, input: &RegisterModuleInput) -> Result<(), ClientError> {
        self.registered.lock().push(input.clone());
        self.texts.lock().entry(input.name.clone()).or_default();
        self.modules
            .lock()
            .push(Module::new(input.name.clone(), input.path.clone()));
        Ok(())
    }
}

/// Notifier that keeps every notice for inspection.
#[derive(Default)]
pub struct RecordingNotifier {
    notices: Mutex<Vec<Notice>>,
}

impl RecordingNotifier {
    pub fn notices(&self) -> Vec<Notice> {
        self.notices.lock().clone()
    }

    pub fn errors(&self) -> Vec<String> {
        self.notices
            .lock()
            .iter()
            .filter(|n| n.kind == NoticeKind::Error)
            .map(|n| n.message.clone())
            .collect()
    }
}

impl Notifier for RecordingNotifier {
    fn notify(&self, notice: Notice) {
        self.notices.lock().push(notice);
    }
}

pub fn setup(fake: &Arc<FakeService>) -> (Dashboard, Arc<RecordingNotifier>) {
    setup_with(fake, DashboardSettings::default())
}

pub fn setup_with(
    fake: &Arc<FakeService>,
    settings: DashboardSettings,
) -> (Dashboard, Arc<RecordingNotifier>) {
    let notifier = Arc::new(RecordingNotifier::default());
    let dashboard = Dashboard::new(
        Arc::clone(fake) as Arc<dyn ConfigApi>,
        Box::new(MemoryStore::new()),
        Arc::clone(&notifier) as Arc<dyn Notifier>,
        settings,
    );
    (dashboard, notifier)
}
