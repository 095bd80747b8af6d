//! Interface name to CoDel queue mapping.
//!
//! Each attached interface owns one bounded queue and the controller managing
//! it, behind its own lock: calls on one interface are serialized, distinct
//! interfaces proceed independently.
use std::{collections::HashMap, fmt, sync::Arc, time::Duration};

use parking_lot::{Mutex, RwLock};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::{debug, info, trace};

use crate::{
    codel::{CoDel, CoDelStats, PacketCounter},
    config::{CoDelConfig, CoDelDefaults, RegistryConfig},
    error::{Error, Result},
    packet::Packet,
    queue::{FifoQueue, FifoQueueConfig, PacketQueue},
    time::Clock,
};

/// A CoDel queue attached to one interface.
#[derive(Debug)]
pub struct CoDelInterface<P, C> {
    name: String,
    codel: CoDel<C>,
    queue: FifoQueue<P>,
    enabled: bool,
    purged: PacketCounter,
}

impl<P, C> CoDelInterface<P, C>
where
    P: Packet,
    C: Clock,
{
    fn new(name: String, codel: CoDel<C>, limit: usize) -> Self {
        Self {
            name,
            codel,
            queue: FifoQueue::new(FifoQueueConfig::new(limit)),
            enabled: false,
            purged: PacketCounter::default(),
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    pub fn codel(&self) -> &CoDel<C> {
        &self.codel
    }

    pub fn queue(&self) -> &FifoQueue<P> {
        &self.queue
    }

    pub fn enqueue(&mut self, packet: P) -> Result<()> {
        if !self.enabled {
            return Err(Error::InterfaceDisabled(self.name.clone()));
        }
        self.codel.enqueue(&mut self.queue, packet)
    }

    pub fn dequeue(&mut self) -> Option<P> {
        if !self.enabled || self.queue.is_empty() {
            return None;
        }
        self.codel.dequeue(&mut self.queue)
    }

    pub fn poll(&self) -> Option<&P> {
        if !self.enabled {
            return None;
        }
        self.codel.poll(&self.queue)
    }

    /// Discards everything queued, returning the number of packets removed.
    pub fn purge(&mut self) -> usize {
        let mut purged = 0;
        while let Some(packet) = self.queue.pop() {
            self.purged.add(packet.length());
            purged += 1;
        }
        trace!(interface = self.name, purged, "Purge queue");
        purged
    }

    /// Hands the remaining packets to the caller.
    pub fn into_packets(mut self) -> Vec<P> {
        std::iter::from_fn(|| self.queue.pop()).collect()
    }

    pub fn stats(&self) -> InterfaceStats {
        let clock = self.codel.clock();
        let params = self.codel.params();
        InterfaceStats {
            name: self.name.clone(),
            queue_length: self.queue.length(),
            queue_limit: self.queue.limit(),
            stats: self.codel.stats(),
            purged: self.purged,
            target: clock.duration_from_ticks(params.target),
            interval: clock.duration_from_ticks(params.interval),
            ecn: params.ecn,
        }
    }

    fn effective_config(&self) -> CoDelConfig {
        let stats = self.stats();
        CoDelConfig::new(stats.target, stats.interval, stats.ecn, stats.queue_limit)
    }
}

/// Report for one interface. Target and interval are converted back from
/// clock ticks.
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InterfaceStats {
    pub name: String,
    pub queue_length: usize,
    pub queue_limit: usize,
    pub stats: CoDelStats,
    pub purged: PacketCounter,
    pub target: Duration,
    pub interval: Duration,
    pub ecn: bool,
}

impl fmt::Display for InterfaceStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(
            f,
            "{}: codel target:{:?} interval:{:?} ecn:{}",
            self.name, self.target, self.interval, self.ecn
        )?;
        writeln!(f, "     qlen:{} qlimit:{}", self.queue_length, self.queue_limit)?;
        write!(f, "{}", self.stats)?;
        if self.purged.packets > 0 {
            write!(f, "\n     purged:{}", self.purged)?;
        }
        Ok(())
    }
}

#[cfg(feature = "serde")]
impl InterfaceStats {
    /// The report as JSON, for monitoring tools.
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self> {
        Ok(serde_json::from_str(json)?)
    }
}

type SharedInterface<P, C> = Arc<Mutex<CoDelInterface<P, C>>>;

pub struct CoDelRegistry<P, C> {
    clock: C,
    defaults: RwLock<CoDelDefaults>,
    interfaces: RwLock<HashMap<String, SharedInterface<P, C>>>,
}

impl<P, C> CoDelRegistry<P, C>
where
    P: Packet,
    C: Clock + Clone,
{
    pub fn new(clock: C) -> Self {
        Self {
            clock,
            defaults: RwLock::new(CoDelDefaults::default()),
            interfaces: RwLock::new(HashMap::new()),
        }
    }

    /// Attaches, configures and enables every interface in `config`.
    pub fn from_config(config: RegistryConfig, clock: C) -> Result<Self> {
        let registry = Self::new(clock);
        registry.set_defaults(config.defaults);
        let mut interfaces: Vec<_> = config.interfaces.into_iter().collect();
        interfaces.sort_by(|a, b| a.0.cmp(&b.0));
        for (name, interface_config) in interfaces {
            registry.attach(&name)?;
            registry.configure(&name, &interface_config)?;
            registry.enable(&name)?;
        }
        Ok(registry)
    }

    pub fn defaults(&self) -> CoDelDefaults {
        *self.defaults.read()
    }

    /// Replaces the defaults for controllers created from now on.
    pub fn set_defaults(&self, defaults: CoDelDefaults) {
        debug!(?defaults, "Set CoDel defaults");
        *self.defaults.write() = defaults;
    }

    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<_> = self.interfaces.read().keys().cloned().collect();
        names.sort();
        names
    }

    pub fn interface(&self, name: &str) -> Result<SharedInterface<P, C>> {
        self.interfaces
            .read()
            .get(name)
            .cloned()
            .ok_or_else(|| Error::UnknownInterface(name.to_string()))
    }

    /// Attaches a disabled CoDel queue with default parameters.
    pub fn attach(&self, name: &str) -> Result<()> {
        let codel = CoDel::with_defaults(
            &CoDelConfig::default(),
            &self.defaults(),
            self.clock.clone(),
        )?;
        let mut interfaces = self.interfaces.write();
        if interfaces.contains_key(name) {
            return Err(Error::AlreadyAttached(name.to_string()));
        }
        let interface = CoDelInterface::new(name.to_string(), codel, CoDelConfig::default().limit);
        interfaces.insert(name.to_string(), Arc::new(Mutex::new(interface)));
        info!(interface = name, "CoDel attached");
        Ok(())
    }

    /// Removes the interface. Packets still queued travel with the returned
    /// value; the registry keeps nothing.
    pub fn detach(&self, name: &str) -> Result<CoDelInterface<P, C>> {
        let shared = self
            .interfaces
            .write()
            .remove(name)
            .ok_or_else(|| Error::UnknownInterface(name.to_string()))?;
        let mut interface = match Arc::try_unwrap(shared) {
            Ok(interface) => interface.into_inner(),
            Err(shared) => {
                // Someone still holds a handle: move the state out under the lock.
                let mut guard = shared.lock();
                let codel = CoDel::from_params(*guard.codel.params(), self.clock.clone());
                let replacement = CoDelInterface::new(guard.name.clone(), codel, 0);
                std::mem::replace(&mut *guard, replacement)
            }
        };
        interface.enabled = false;
        info!(
            interface = name,
            queued = interface.queue.length(),
            "CoDel detached"
        );
        Ok(interface)
    }

    pub fn enable(&self, name: &str) -> Result<()> {
        self.interface(name)?.lock().enabled = true;
        debug!(interface = name, "CoDel enabled");
        Ok(())
    }

    pub fn disable(&self, name: &str) -> Result<()> {
        self.interface(name)?.lock().enabled = false;
        debug!(interface = name, "CoDel disabled");
        Ok(())
    }

    /// Installs a new controller and queue limit.
    ///
    /// The controller is built before the interface is locked, so an invalid
    /// config leaves the old one in place. Queued packets are kept: their
    /// enqueue timestamps stay meaningful under the new parameters. Returns
    /// the configuration in effect.
    pub fn configure(&self, name: &str, config: &CoDelConfig) -> Result<CoDelConfig> {
        let shared = self.interface(name)?;
        let codel = CoDel::with_defaults(config, &self.defaults(), self.clock.clone())?;
        let mut interface = shared.lock();
        interface.codel = codel;
        interface.queue.set_limit(config.limit);
        let effective = interface.effective_config();
        debug!(interface = name, ?effective, "CoDel configured");
        Ok(effective)
    }

    pub fn get_stats(&self, name: &str) -> Result<InterfaceStats> {
        Ok(self.interface(name)?.lock().stats())
    }

    pub fn purge(&self, name: &str) -> Result<usize> {
        Ok(self.interface(name)?.lock().purge())
    }

    pub fn enqueue(&self, name: &str, packet: P) -> Result<()> {
        self.interface(name)?.lock().enqueue(packet)
    }

    pub fn dequeue(&self, name: &str) -> Result<Option<P>> {
        Ok(self.interface(name)?.lock().dequeue())
    }

    /// A copy of the head packet, leaving the queue and control state alone.
    pub fn poll(&self, name: &str) -> Result<Option<P>>
    where
        P: Clone,
    {
        Ok(self.interface(name)?.lock().poll().cloned())
    }
}

impl<P, C> fmt::Debug for CoDelRegistry<P, C> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names: Vec<_> = self.interfaces.read().keys().cloned().collect();
        names.sort();
        f.debug_struct("CoDelRegistry")
            .field("defaults", &*self.defaults.read())
            .field("interfaces", &names)
            .finish()
    }
}
