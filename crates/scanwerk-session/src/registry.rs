// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Device registry: attached devices, their profiles, and open sessions.
//
// A device is attached with a transport, either with a known profile or by
// probing: INQUIRY identifies the product and the quirk table supplies the
// profile. Opening a device moves its transport into a session; closing the
// session moves it back.

use std::collections::HashMap;

use scanwerk_core::error::{Result, ScanwerkError};
use scanwerk_core::quirks::{DeviceProfile, QuirkTable};
use scanwerk_core::types::SessionId;
use scanwerk_protocol::channel::CommandChannel;
use scanwerk_protocol::command::InquiryData;
use scanwerk_protocol::transport::Transport;
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::session::ScanSession;

/// Sessions opened through the registry own a boxed transport.
pub type DynSession = ScanSession<Box<dyn Transport>>;

/// Summary of an attached device.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeviceInfo {
    pub name: String,
    pub vendor: String,
    pub model: String,
    pub family: String,
    /// A session currently holds the device.
    pub open: bool,
}

struct Attached {
    profile: DeviceProfile,
    vendor: String,
    model: String,
    /// `None` while a session holds the transport.
    transport: Option<Box<dyn Transport>>,
    session: Option<SessionId>,
}

/// All devices known to this process.
pub struct DeviceRegistry {
    quirks: QuirkTable,
    devices: HashMap<String, Attached>,
    sessions: HashMap<SessionId, (String, DynSession)>,
}

impl Default for DeviceRegistry {
    fn default() -> Self {
        Self::new(QuirkTable::builtin())
    }
}

impl DeviceRegistry {
    pub fn new(quirks: QuirkTable) -> Self {
        Self {
            quirks,
            devices: HashMap::new(),
            sessions: HashMap::new(),
        }
    }

    pub fn quirks(&self) -> &QuirkTable {
        &self.quirks
    }

    /// Attach a device whose profile is already known.
    pub fn attach(
        &mut self,
        name: &str,
        transport: Box<dyn Transport>,
        profile: DeviceProfile,
    ) -> Result<()> {
        self.insert(name, transport, profile, String::new(), String::new())
    }

    /// Attach a device, identifying it with INQUIRY.
    #[instrument(skip(self, transport))]
    pub fn identify(&mut self, name: &str, transport: Box<dyn Transport>) -> Result<DeviceProfile> {
        let mut channel = CommandChannel::new(transport);
        let inq: InquiryData = channel.inquiry()?;
        if !inq.is_scanner() {
            return Err(ScanwerkError::UnknownDevice(format!(
                "{name}: device type {:#04x} is not a scanner",
                inq.device_type
            )));
        }
        let profile = self.quirks.lookup(&inq.product);
        if profile.model_patterns.is_empty() {
            warn!(product = %inq.product, "no quirks known, using generic profile");
        }
        info!(vendor = %inq.vendor, product = %inq.product, family = %profile.family, "device identified");
        self.insert(
            name,
            channel.into_transport(),
            profile.clone(),
            inq.vendor,
            inq.product,
        )?;
        Ok(profile)
    }

    fn insert(
        &mut self,
        name: &str,
        transport: Box<dyn Transport>,
        profile: DeviceProfile,
        vendor: String,
        model: String,
    ) -> Result<()> {
        if self.devices.contains_key(name) {
            return Err(ScanwerkError::InvalidRequest(format!("{name} is already attached")));
        }
        debug!(name, family = %profile.family, "device attached");
        self.devices.insert(
            name.to_string(),
            Attached {
                profile,
                vendor,
                model,
                transport: Some(transport),
                session: None,
            },
        );
        Ok(())
    }

    /// Attached devices, sorted by name.
    pub fn devices(&self) -> Vec<DeviceInfo> {
        let mut list: Vec<DeviceInfo> = self
            .devices
            .iter()
            .map(|(name, d)| DeviceInfo {
                name: name.clone(),
                vendor: d.vendor.clone(),
                model: d.model.clone(),
                family: d.profile.family.clone(),
                open: d.session.is_some(),
            })
            .collect();
        list.sort_by(|a, b| a.name.cmp(&b.name));
        list
    }

    /// Open a session on a device. A device holds one session at a time.
    #[instrument(skip(self))]
    pub fn open(&mut self, name: &str) -> Result<SessionId> {
        let dev = self
            .devices
            .get_mut(name)
            .ok_or_else(|| ScanwerkError::UnknownDevice(name.to_string()))?;
        let transport = dev.transport.take().ok_or(ScanwerkError::Busy)?;
        let session = ScanSession::new(transport, dev.profile.clone());
        let id = session.id();
        dev.session = Some(id);
        self.sessions.insert(id, (name.to_string(), session));
        info!(%id, name, "session opened");
        Ok(id)
    }

    pub fn session_mut(&mut self, id: SessionId) -> Result<&mut DynSession> {
        self.sessions
            .get_mut(&id)
            .map(|(_, s)| s)
            .ok_or_else(|| ScanwerkError::UnknownSession(id.to_string()))
    }

    /// Close a session, stopping any scan and returning the device to the
    /// registry.
    #[instrument(skip(self))]
    pub fn close(&mut self, id: SessionId) -> Result<()> {
        let (name, session) = self
            .sessions
            .remove(&id)
            .ok_or_else(|| ScanwerkError::UnknownSession(id.to_string()))?;
        let transport = session.close();
        if let Some(dev) = self.devices.get_mut(&name) {
            dev.transport = Some(transport);
            dev.session = None;
        }
        Ok(())
    }

    /// Close every session and forget all devices.
    pub fn shutdown(mut self) {
        let ids: Vec<SessionId> = self.sessions.keys().copied().collect();
        for id in ids {
            if let Err(e) = self.close(id) {
                debug!(error = %e, "close during shutdown failed");
            }
        }
        info!(devices = self.devices.len(), "registry shut down");
    }
}
