//! Client core: connect, handshake, issue write/setpoint/interrogation
//! commands, and collect a snapshot map of the server's points.

use std::collections::BTreeMap;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

use crate::apci::Apci;
use crate::asdu::{Asdu, Payload};
use crate::constant::STARTDT_CON;
use crate::error::Error;
use crate::link::{read_frame, write_frame, Link};
use crate::types::{Cot, Measurement, TypeId};

const DEFAULT_CASDU: u16 = 1;

/// How long `request_data` waits for the interrogation burst to go
/// quiet before it considers the response complete.
pub const INTERROGATION_QUIESCENCE: Duration = Duration::from_secs(2);

/// Builds a `Session`, mirroring this crate's other builder-style
/// constructors (`ServerBuilder`, `tcp::Options`).
///
/// # Examples
///
/// ```no_run
/// use iec104::client::ConnectionBuilder;
/// use std::time::Duration;
///
/// let mut session = ConnectionBuilder::new("127.0.0.1")
///     .port(2404)
///     .timeout(Duration::from_secs(5))
///     .connect()
///     .unwrap();
/// session.write_single(15100, true).unwrap();
/// ```
pub struct ConnectionBuilder {
    host: String,
    port: u16,
    timeout: Duration,
}

impl ConnectionBuilder {
    pub fn new(host: impl Into<String>) -> Self {
        ConnectionBuilder {
            host: host.into(),
            port: crate::server::DEFAULT_PORT,
            timeout: Duration::from_secs(5),
        }
    }

    pub fn port(mut self, port: u16) -> Self {
        self.port = port;
        self
    }

    pub fn timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn connect(self) -> Result<Session, Error> {
        Session::connect((self.host.as_str(), self.port), self.timeout)
    }
}

/// A connected session: owns the socket and the link state machine
/// driving it.
pub struct Session {
    stream: TcpStream,
    link: Link,
    timeout: Duration,
}

impl Session {
    /// Open TCP, send STARTDT_ACT, and wait up to `timeout` for
    /// STARTDT_CON.
    pub fn connect<A: ToSocketAddrs>(addr: A, timeout: Duration) -> Result<Self, Error> {
        let sock_addr = addr.to_socket_addrs()?.next().ok_or(Error::Timeout)?;
        let stream = TcpStream::connect_timeout(&sock_addr, timeout)?;
        stream.set_read_timeout(Some(timeout))?;
        stream.set_write_timeout(Some(timeout))?;

        let mut session = Session {
            stream,
            link: Link::new(),
            timeout,
        };
        write_frame(&mut session.stream, &Apci::startdt_act())?;
        match read_frame(&mut session.stream)? {
            Apci::U(ctrl) if ctrl == STARTDT_CON => {
                session.link.start();
                Ok(session)
            }
            _ => Err(Error::Timeout),
        }
    }

    /// Send a C_SC_NA_1 ASDU with COT=6; returns `true` iff the reply
    /// carries COT=7 for the same TypeID.
    pub fn write_single(&mut self, ioa: u32, value: bool) -> Result<bool, Error> {
        self.send_command(TypeId::SingleCommand, ioa, Measurement::Bool(value))
    }

    /// Send a C_SE_NC_1 ASDU with COT=6; returns `true` iff the reply
    /// carries COT=7 for the same TypeID.
    pub fn write_setpoint(&mut self, ioa: u32, value: f32) -> Result<bool, Error> {
        self.send_command(TypeId::SetpointCommand, ioa, Measurement::Float32(value))
    }

    fn send_command(&mut self, type_id: TypeId, ioa: u32, value: Measurement) -> Result<bool, Error> {
        self.link.require_started()?;
        let asdu = Asdu::new(type_id, Cot::Activation, DEFAULT_CASDU, ioa, value.into());
        let frame = Apci::i(self.link.send_seq(), self.link.recv_seq(), asdu.encode());
        write_frame(&mut self.stream, &frame)?;
        self.link.note_sent();

        match read_frame(&mut self.stream)? {
            Apci::I { asdu: bytes, .. } => {
                self.link.note_received();
                let reply = Asdu::decode(&bytes)?;
                Ok(reply.type_id == type_id && reply.cot() == Some(Cot::ActivationConfirm))
            }
            _ => Ok(false),
        }
    }

    /// Send a C_IC_NA_1 interrogation; collect frames until a
    /// quiescence timeout expires, then decode each ASDU into
    /// `(ioa, value)`. Returns `Timeout` iff nothing was received
    /// within the quiescence window.
    pub fn request_data(&mut self) -> Result<BTreeMap<u32, Measurement>, Error> {
        self.link.require_started()?;
        let asdu = Asdu::new(
            TypeId::Interrogation,
            Cot::Activation,
            DEFAULT_CASDU,
            0,
            Payload::Interrogation,
        );
        let frame = Apci::i(self.link.send_seq(), self.link.recv_seq(), asdu.encode());
        write_frame(&mut self.stream, &frame)?;
        self.link.note_sent();

        self.stream.set_read_timeout(Some(INTERROGATION_QUIESCENCE))?;
        let mut map = BTreeMap::new();
        loop {
            match read_frame(&mut self.stream) {
                Ok(Apci::I { asdu: bytes, .. }) => {
                    self.link.note_received();
                    if let Ok(reply) = Asdu::decode(&bytes) {
                        if let Some(value) = reply.payload.as_measurement() {
                            map.insert(reply.ioa, value);
                        }
                    }
                }
                Ok(_) => continue,
                Err(Error::Timeout) => break,
                Err(Error::BadFrame(reason)) => {
                    log::warn!("dropping malformed frame during interrogation: {}", reason);
                    continue;
                }
                Err(e) => return Err(e),
            }
        }
        self.stream.set_read_timeout(Some(self.timeout))?;

        if map.is_empty() {
            return Err(Error::Timeout);
        }
        Ok(map)
    }

    /// Send STOPDT_ACT, wait briefly for STOPDT_CON, and close.
    pub fn close(mut self) -> Result<(), Error> {
        write_frame(&mut self.stream, &Apci::stopdt_act())?;
        let _ = self.stream.set_read_timeout(Some(Duration::from_millis(500)));
        let _ = read_frame(&mut self.stream); // best-effort; absence is not an error
        self.link.stop();
        Ok(())
    }
}

/// Convenience free function equivalent to
/// `ConnectionBuilder::new(host).port(port).timeout(timeout).connect()`.
pub fn connect(host: impl Into<String>, port: u16, timeout: Duration) -> Result<Session, Error> {
    ConnectionBuilder::new(host).port(port).timeout(timeout).connect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::apci::Apci as ApciFrame;
    use crate::asdu::Asdu as AsduFrame;
    use crate::link::{read_frame as read, write_frame as write};
    use std::net::TcpListener;
    use std::thread;

    #[test]
    fn write_single_returns_true_on_activation_confirm() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap();

        let server = thread::spawn(move || {
            let (mut stream, _) = listener.accept().unwrap();
            assert_eq!(read(&mut stream).unwrap(), ApciFrame::startdt_act());
            write(&mut stream, &ApciFrame::startdt_con()).unwrap();

            match read(&mut stream).unwrap() {
                ApciFrame::I { asdu, .. } => {
                    let decoded = AsduFrame::decode(&asdu).unwrap();
                    let mut reply = decoded;
                    reply.cot_raw = Cot::ActivationConfirm.as_raw();
                    write(&mut stream, &ApciFrame::i(0, 1, reply.encode())).unwrap();
                }
                other => panic!("unexpected frame: {:?}", other),
            }
        });

        let mut session = Session::connect(addr, Duration::from_secs(1)).unwrap();
        let confirmed = session.write_single(15100, true).unwrap();
        assert!(confirmed);
        server.join().unwrap();
    }
}
