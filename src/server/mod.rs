//! Server/RTU endpoint: accepts a client connection, drives the
//! dispatcher against it, and runs the hydropower simulator on a
//! 1-second tick. A single active connection suffices; this crate
//! does not fan a listener out to a pool of concurrently served
//! clients.

pub mod dispatcher;
pub mod simulator;

use std::net::{TcpListener, ToSocketAddrs};
use std::sync::Arc;
use std::thread;

use rand::thread_rng;

use crate::constant::hydropower::*;
use crate::error::Error;
use crate::registry::Registry;
use crate::types::{Measurement, TypeId};

use dispatcher::Dispatcher;
use simulator::{Simulator, TICK_INTERVAL};

/// Default IEC 60870-5-104 TCP port.
pub const DEFAULT_PORT: u16 = 2404;

/// Register the fixed hydropower point set: seven single points at
/// rest, four float measurements at rest (bearing temperature starts
/// at ambient), and the seven command IOAs mirroring into them.
pub fn register_hydropower_points(registry: &Registry) {
    for &ioa in SINGLE_POINTS.iter() {
        registry.register_measurement(ioa, Measurement::Bool(false));
    }
    registry.register_measurement(ANA_TURBINE_RPM, Measurement::Float32(0.0));
    registry.register_measurement(ANA_GENERATOR_VOLTAGE, Measurement::Float32(0.0));
    registry.register_measurement(ANA_GRID_POWER, Measurement::Float32(0.0));
    registry.register_measurement(ANA_BEARING_TEMP, Measurement::Float32(AMBIENT_TEMPERATURE_C));

    registry.register_command(CMD_WATER_INLET, TypeId::SingleCommand, SP_WATER_INLET);
    registry.register_command(CMD_EXCITER, TypeId::SingleCommand, SP_EXCITER);
    registry.register_command(CMD_TRANSFORMER, TypeId::SingleCommand, SP_TRANSFORMER);
    registry.register_command(CMD_GRID, TypeId::SingleCommand, SP_GRID);
    registry.register_command(CMD_COOLING, TypeId::SingleCommand, SP_COOLING);
    registry.register_command(CMD_START, TypeId::SingleCommand, SP_START);
    registry.register_command(CMD_SHUTDOWN, TypeId::SingleCommand, SP_SHUTDOWN);
}

pub struct ServerBuilder {
    addr: String,
}

impl ServerBuilder {
    pub fn new() -> Self {
        ServerBuilder {
            addr: format!("0.0.0.0:{}", DEFAULT_PORT),
        }
    }

    /// Override the bind address (default `0.0.0.0:2404`). Accepts
    /// `127.0.0.1:0` for tests that need an ephemeral port.
    pub fn bind_addr(mut self, addr: impl Into<String>) -> Self {
        self.addr = addr.into();
        self
    }

    pub fn build(self) -> Result<Server, Error> {
        let listener = TcpListener::bind(self.addr.as_str().to_socket_addrs()?.next().ok_or(Error::Timeout)?)?;
        let registry = Arc::new(Registry::new());
        register_hydropower_points(&registry);
        Ok(Server { listener, registry })
    }
}

impl Default for ServerBuilder {
    fn default() -> Self {
        ServerBuilder::new()
    }
}

pub struct Server {
    listener: TcpListener,
    registry: Arc<Registry>,
}

impl Server {
    pub fn builder() -> ServerBuilder {
        ServerBuilder::new()
    }

    pub fn local_addr(&self) -> std::io::Result<std::net::SocketAddr> {
        self.listener.local_addr()
    }

    /// Run the simulator thread and accept loop. Blocks the calling
    /// thread forever; connections are served one at a time.
    pub fn run(&self) -> Result<(), Error> {
        let sim_registry = self.registry.clone();
        thread::spawn(move || {
            let mut sim = Simulator::new(sim_registry);
            let mut rng = thread_rng();
            loop {
                sim.tick(&mut rng);
                thread::sleep(TICK_INTERVAL);
            }
        });

        let dispatcher = Dispatcher::new(self.registry.clone());
        for stream in self.listener.incoming() {
            let stream = stream?;
            log::debug!("accepted connection from {:?}", stream.peer_addr());
            if let Err(e) = dispatcher.run(stream) {
                log::warn!("connection ended: {}", e);
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fresh_registry_has_eleven_points() {
        let registry = Registry::new();
        register_hydropower_points(&registry);
        let snapshot = registry.interrogation_snapshot().unwrap();
        assert_eq!(snapshot.len(), 11);
    }
}
