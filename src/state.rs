// state.rs

use std::{
    net::Ipv4Addr,
    sync::{Mutex, PoisonError},
};

use tokio::sync::{watch, RwLock};

use crate::*;

/// Temperature/humidity pair shared between the sampler and any reader.
/// Both fields are only ever written and read together under one lock.
pub struct ClimateCell {
    inner: Mutex<Climate>,
}

impl ClimateCell {
    pub fn new(initial: Climate) -> Self {
        Self {
            inner: Mutex::new(initial),
        }
    }

    pub fn store(&self, climate: Climate) {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner) = climate;
    }

    pub fn load(&self) -> Climate {
        *self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for ClimateCell {
    fn default() -> Self {
        Self::new(Climate::UNKNOWN)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SamplerState {
    NotStarted,
    Started,
}

/// One-way NotStarted -> Started switch for a lazily started sampler.
pub struct SamplerGate {
    tx: watch::Sender<SamplerState>,
}

impl SamplerGate {
    pub fn new() -> Self {
        let (tx, _rx) = watch::channel(SamplerState::NotStarted);
        Self { tx }
    }

    /// Returns true only for the call that performed the transition.
    pub fn start(&self) -> bool {
        self.tx.send_if_modified(|s| match s {
            SamplerState::NotStarted => {
                *s = SamplerState::Started;
                true
            }
            SamplerState::Started => false,
        })
    }

    pub fn state(&self) -> SamplerState {
        *self.tx.borrow()
    }

    /// Resolves once the gate has been opened.
    pub async fn started(&self) {
        let mut rx = self.tx.subscribe();
        // the sender lives in self, so the channel cannot close under us
        let _ = rx.wait_for(|s| *s == SamplerState::Started).await;
    }
}

impl Default for SamplerGate {
    fn default() -> Self {
        Self::new()
    }
}

pub struct MyState {
    pub config: MyConfig,
    pub wifi_up: RwLock<bool>,
    pub ip_addr: RwLock<Ipv4Addr>,
    pub myid: RwLock<String>,
    pub climate: ClimateCell,
    pub sampler: SamplerGate,
}

impl MyState {
    pub fn new(config: MyConfig) -> Self {
        MyState {
            config,
            wifi_up: RwLock::new(false),
            ip_addr: RwLock::new(Ipv4Addr::new(0, 0, 0, 0)),
            myid: RwLock::new("esp32station".into()),
            climate: ClimateCell::default(),
            sampler: SamplerGate::new(),
        }
    }
}


// EOF
